//! Progression Bridge - Outbound Collaborator Contracts
//!
//! Every external dependency of the progression mirror sits behind a trait
//! here, so implementations can be swapped between a real client, a direct
//! in-process stub, and a mock for tests:
//!
//! - [`ChainClient`]: signed state-transition submission with a structured
//!   (tagged) outcome for every rejection class
//! - [`ProofIndexClient`]: membership proofs and the eventually-consistent
//!   receipt-to-asset read index
//! - [`ReceiptLookupClient`]: best-effort push-style receipt lookup
//! - [`ContentStore`]: durable blobs in exchange for stable reference URIs
//! - [`SignerContext`]: the explicit, rate-limited signing credential (never
//!   an ambient singleton)
//! - [`ensure_capabilities`]: one-time startup compatibility check, failing
//!   fast instead of discovering incompatibilities per request

pub mod capability;
pub mod chain_client;
pub mod content_store;
pub mod error;
pub mod proof_client;
pub mod receipt_lookup;
pub mod signer;

pub use capability::ensure_capabilities;
pub use chain_client::{
    ChainCapabilities, ChainClient, ChainHealth, SubmitOutcome, UpdateTransaction,
};
pub use content_store::ContentStore;
pub use error::{BridgeError, BridgeResult};
pub use proof_client::{ProofIndexClient, ProofLookup};
pub use receipt_lookup::ReceiptLookupClient;
pub use signer::SignerContext;
