//! Fast Receipt Lookup
//!
//! Push-style lookup keyed by the submission receipt: the indexer notifies
//! this service as soon as it derives an asset id, so a hit here resolves
//! immediately without polling. Best-effort; a miss is normal and the caller
//! falls back to polling the read index.

use async_trait::async_trait;
use progression_core::{AssetId, ReceiptSignature};

use crate::error::BridgeResult;

/// Best-effort receipt-to-asset lookup
#[async_trait]
pub trait ReceiptLookupClient: Send + Sync {
    /// Asset id for a creation receipt, if already derived
    async fn asset_for_receipt(
        &self,
        receipt: &ReceiptSignature,
    ) -> BridgeResult<Option<AssetId>>;
}
