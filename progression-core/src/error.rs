//! Progression Error Registry
//!
//! Error code format: PROG-{module}-{sequence}
//! - PROG-LEDGER: experience ledger errors
//! - PROG-PROOF: membership proof errors
//! - PROG-META: metadata payload errors
//! - PROG-RESOLVE: asset resolution errors
//! - PROG-SYNC: update protocol / reconciliation errors
//!
//! Transient classes are absorbed inside the update protocol and the
//! reconciliation loop; only `ExhaustedRetries` and `PayloadTooLarge` escape
//! the subsystem.

use thiserror::Error;

/// Progression Result type
pub type ProgressionResult<T> = Result<T, ProgressionError>;

/// Progression Error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressionError {
    // ============================================================
    // Ledger Errors (PROG-LEDGER-*)
    // ============================================================
    // A replayed idempotency key is not an error at all: the ledger answers
    // it with the recorded outcome, flagged as a duplicate.
    /// [PROG-LEDGER-001] Experience gain must be positive
    #[error("[PROG-LEDGER-001] Invalid experience gain {gain}, must be > 0")]
    InvalidGain { gain: u64 },

    // ============================================================
    // Proof Errors (PROG-PROOF-*)
    // ============================================================
    /// [PROG-PROOF-001] The backing tree mutated between proof fetch and
    /// submission; the proof must be refetched
    #[error("[PROG-PROOF-001] Membership proof stale: tree root changed")]
    StaleProof,

    /// [PROG-PROOF-002] Digest could not be parsed
    #[error("[PROG-PROOF-002] Invalid digest encoding")]
    InvalidDigest,

    // ============================================================
    // Metadata Errors (PROG-META-*)
    // ============================================================
    /// [PROG-META-001] Even the smallest payload rendering exceeds the
    /// ledger's transaction-size ceiling. Not retryable as-is.
    #[error("[PROG-META-001] Payload of {size} bytes exceeds ceiling of {ceiling} bytes")]
    PayloadTooLarge { size: usize, ceiling: usize },

    // ============================================================
    // Resolution Errors (PROG-RESOLVE-*)
    // ============================================================
    /// [PROG-RESOLVE-001] The indexer has not derived an asset id yet.
    /// Deferred, not fatal: creation already succeeded.
    #[error("[PROG-RESOLVE-001] Asset id unresolved for character {character_id}")]
    UnresolvedAsset { character_id: String },

    // ============================================================
    // Sync Errors (PROG-SYNC-*)
    // ============================================================
    /// [PROG-SYNC-001] Network or collaborator failure, retried transparently
    #[error("[PROG-SYNC-001] Transient failure: {reason}")]
    TransientNetwork { reason: String },

    /// [PROG-SYNC-002] Retry budget exhausted; the task stays pending and is
    /// surfaced to operators
    #[error("[PROG-SYNC-002] Exhausted {attempts} attempts: {reason}")]
    ExhaustedRetries { attempts: u32, reason: String },

    /// [PROG-SYNC-003] Collaborator incompatibility detected at startup
    #[error("[PROG-SYNC-003] Incompatible collaborator: {reason}")]
    Incompatible { reason: String },

    // ============================================================
    // General Errors
    // ============================================================
    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invalid state for the requested operation
    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProgressionError {
    /// Create a not-found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a transient error
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientNetwork {
            reason: reason.into(),
        }
    }

    /// Create an invalid-state error
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Whether a later attempt may succeed without upstream changes
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork { .. }
                | Self::StaleProof
                | Self::UnresolvedAsset { .. }
                | Self::ExhaustedRetries { .. }
        )
    }
}

impl From<serde_json::Error> for ProgressionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
