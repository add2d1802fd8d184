//! Progression Core - Domain Model for the Character Progression Mirror
//!
//! An authoritative off-chain store holds every character's skill experience
//! and levels; a compressed on-chain asset mirrors that state asynchronously.
//! This crate holds the pieces shared by every layer:
//!
//! - **Types**: identifier newtypes and the 32-byte digest
//! - **Curve**: the deterministic experience-to-level curve
//! - **Canon**: sorted-key canonical serialization for deterministic digests
//! - **Proof**: the ephemeral membership proof an update must carry
//! - **Metadata**: size-bounded, deterministic on-chain payload rendering
//!
//! # Consistency Invariants
//!
//! | Invariant | Core Requirement |
//! |-----------|------------------|
//! | **Monotonic XP** | Experience never decreases |
//! | **Derived Level** | Level is always recomputable from experience |
//! | **Versioned State** | `state_version` increments exactly once per committed mutation |
//! | **CAS Clear** | The pending flag clears only when no newer mutation intervened |
//! | **At-Most-Once** | An idempotency key yields at most one effective award |

pub mod canon;
pub mod curve;
pub mod error;
pub mod metadata;
pub mod proof;
pub mod types;

pub use canon::Canonicalizer;
pub use curve::{level_from_xp, progress_pct, xp_for_level, MAX_LEVEL};
pub use error::{ProgressionError, ProgressionResult};
pub use metadata::{DetailLevel, MetadataBuilder, MetadataPayload, ProgressionSnapshot, SkillSnapshot};
pub use proof::AssetProof;
pub use types::{AssetId, CharacterId, Digest32, IdempotencyKey, ReceiptSignature, SkillName, StateVersion};
