//! Progression Executor - Asynchronous On-Chain Convergence
//!
//! Drives the eventually-consistent mirror toward the authoritative store:
//!
//! - [`AssetResolver`]: turns a creation receipt into a stable asset id
//! - [`UpdateProtocol`]: the per-attempt state machine
//!   `FETCH_PROOF -> BUILD_TX -> SUBMIT` with bounded stale-proof retries
//!   and a compare-and-swap pending-clear
//! - [`ReconciliationRunner`]: the background loop scanning pending tasks
//!   oldest first, with per-task backoff and failure isolation
//!
//! Everything here is asynchronous with respect to the caller who granted
//! experience; no failure in this crate ever propagates back to that caller.

pub mod attempt;
pub mod resolver;
pub mod runner;
pub mod update;

pub use attempt::BackoffConfig;
pub use resolver::{AssetResolver, ResolverConfig};
pub use runner::{ReconciliationRunner, RunnerConfig, RunnerHandle, ScanStats};
pub use update::{UpdateOutcome, UpdateProtocol, UpdateProtocolConfig};
