//! Proof / Read-Index Client
//!
//! The indexer that serves membership proofs for compressed assets and the
//! eventually-consistent mapping from creation receipts to derived asset ids.

use async_trait::async_trait;
use progression_core::{AssetId, AssetProof, ReceiptSignature};

use crate::error::BridgeResult;

/// Tagged proof lookup result
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofLookup {
    /// Current proof and root for the asset
    Found(AssetProof),
    /// The index does not know the asset (yet)
    NotFound,
}

/// Proof/read-index service
#[async_trait]
pub trait ProofIndexClient: Send + Sync {
    /// Fetch the current membership proof for an asset. The proof is valid
    /// only until the backing tree's root changes.
    async fn asset_proof(&self, asset_id: &AssetId) -> BridgeResult<ProofLookup>;

    /// Eventually-consistent lookup of the asset id derived from a creation
    /// receipt. `None` until the indexer catches up.
    async fn find_asset_by_receipt(
        &self,
        receipt: &ReceiptSignature,
    ) -> BridgeResult<Option<AssetId>>;

    /// Whether the index is reachable
    async fn health_check(&self) -> BridgeResult<bool>;
}
