//! Chain Submission Client
//!
//! Contract for submitting signed state-transitions against the compressed
//! asset. The chain's answer is a tagged outcome, never an exception: every
//! caller has to handle stale roots and oversized payloads explicitly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use progression_core::{AssetId, AssetProof, Digest32};
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;
use crate::signer::SignerContext;

/// A state-transition ready for signing and broadcast
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateTransaction {
    /// Target asset
    pub asset_id: AssetId,
    /// Membership proof fetched for this attempt
    pub proof: AssetProof,
    /// Data hash the transition moves the leaf to
    pub new_data_hash: Digest32,
    /// Canonical metadata bytes embedded in the transition
    pub payload: Vec<u8>,
    /// Content-store reference to the full metadata document
    pub metadata_uri: String,
}

impl UpdateTransaction {
    /// Encoded transaction size: payload plus the proof's contribution.
    pub fn encoded_size(&self) -> usize {
        self.payload.len() + self.proof.encoded_size()
    }
}

/// Structured submission outcome
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The transition landed; the signature is the commitment record
    Confirmed { signature: String },
    /// The tree root changed between proof fetch and submission
    StaleRoot,
    /// The encoded transaction exceeds the chain's hard ceiling
    PayloadTooLarge { max_bytes: usize },
    /// Funding, partition or other retryable submission failure
    Transient { reason: String },
}

/// Limits and features the chain client reports at startup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainCapabilities {
    /// Hard ceiling on encoded transaction size in bytes
    pub max_transaction_bytes: usize,
    /// Maximum proof depth the client can carry
    pub max_proof_depth: usize,
    /// Whether the client supports replacing a leaf in place
    pub supports_leaf_replace: bool,
}

/// Chain health report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHealth {
    /// Whether the endpoint is reachable and synced
    pub available: bool,
    /// Status message
    pub message: String,
    /// Checked at
    pub checked_at: DateTime<Utc>,
}

impl ChainHealth {
    /// Healthy status
    pub fn healthy() -> Self {
        Self {
            available: true,
            message: "OK".to_string(),
            checked_at: Utc::now(),
        }
    }

    /// Unavailable status
    pub fn unavailable(message: &str) -> Self {
        Self {
            available: false,
            message: message.to_string(),
            checked_at: Utc::now(),
        }
    }
}

/// Ledger submission endpoint
///
/// Implementations: a real RPC client, a direct in-process stub, or a mock
/// for testing. Signing uses the explicit [`SignerContext`]; there is no
/// ambient credential.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Sign and broadcast a state-transition, await confirmation.
    ///
    /// Errors are transport failures only; chain-level rejections come back
    /// as [`SubmitOutcome`] variants.
    async fn submit_update(
        &self,
        signer: &SignerContext,
        transaction: &UpdateTransaction,
    ) -> BridgeResult<SubmitOutcome>;

    /// Limits and features, queried once at startup
    async fn capabilities(&self) -> BridgeResult<ChainCapabilities>;

    /// Health check
    async fn health_check(&self) -> BridgeResult<ChainHealth>;
}
