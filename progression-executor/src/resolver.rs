//! Asset Resolver
//!
//! Asset creation returns a receipt, not the asset id; the id only exists
//! once the read index derives it. This resolver tries the push-style fast
//! lookup first, falls back to polling the index a bounded number of times,
//! and on exhaustion leaves the character unresolved. Exhaustion is never an
//! error for the caller: creation already succeeded and the reconciliation
//! loop retries resolution-dependent work later.

use std::sync::Arc;
use std::time::Duration;

use progression_bridge::{ProofIndexClient, ReceiptLookupClient};
use progression_core::{AssetId, CharacterId, ProgressionResult, ReceiptSignature};
use progression_store::ProgressionStore;
use tracing::{debug, info, warn};

/// Resolver tuning
#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Bounded number of read-index polls after a fast-lookup miss
    pub poll_attempts: u32,
    /// Fixed interval between polls
    pub poll_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 5,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Receipt-to-asset resolution
pub struct AssetResolver<S: ProgressionStore> {
    store: Arc<S>,
    fast_lookup: Arc<dyn ReceiptLookupClient>,
    index: Arc<dyn ProofIndexClient>,
    config: ResolverConfig,
}

impl<S: ProgressionStore> AssetResolver<S> {
    /// Create a resolver over a store and the two lookup paths
    pub fn new(
        store: Arc<S>,
        fast_lookup: Arc<dyn ReceiptLookupClient>,
        index: Arc<dyn ProofIndexClient>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            fast_lookup,
            index,
            config,
        }
    }

    /// Resolve the asset id behind a creation receipt and record it against
    /// the character. Returns `None` when the index has not caught up within
    /// the poll budget; the character stays unresolved and callers treat the
    /// miss as a deferral, not a failure.
    pub async fn resolve(
        &self,
        character_id: &CharacterId,
        receipt: &ReceiptSignature,
    ) -> ProgressionResult<Option<AssetId>> {
        if let Some(character) = self.store.get_character(character_id).await? {
            if let Some(existing) = character.asset_id {
                return Ok(Some(existing));
            }
        }

        // Fast path: the indexer may have pushed the mapping already. Misses
        // and transport failures both fall through to polling.
        match self.fast_lookup.asset_for_receipt(receipt).await {
            Ok(Some(asset_id)) => {
                return self.record(character_id, asset_id).await.map(Some);
            }
            Ok(None) => {}
            Err(e) => {
                debug!(
                    character_id = %character_id,
                    error = %e,
                    "Fast receipt lookup unavailable, falling back to polling"
                );
            }
        }

        for attempt in 1..=self.config.poll_attempts {
            match self.index.find_asset_by_receipt(receipt).await {
                Ok(Some(asset_id)) => {
                    return self.record(character_id, asset_id).await.map(Some);
                }
                Ok(None) => {
                    debug!(
                        character_id = %character_id,
                        attempt,
                        "Read index has not derived the asset id yet"
                    );
                }
                Err(e) => {
                    debug!(
                        character_id = %character_id,
                        attempt,
                        error = %e,
                        "Read index poll failed"
                    );
                }
            }
            if attempt < self.config.poll_attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        warn!(
            character_id = %character_id,
            attempts = self.config.poll_attempts,
            "Asset id unresolved after poll budget, leaving character unresolved"
        );
        Ok(None)
    }

    /// Conditionally record the resolved id. A concurrent resolution may win
    /// the race; the id already in the row is returned in that case.
    async fn record(
        &self,
        character_id: &CharacterId,
        asset_id: AssetId,
    ) -> ProgressionResult<AssetId> {
        let written = self
            .store
            .set_asset_id_if_unset(character_id, &asset_id)
            .await?;
        if written {
            info!(
                character_id = %character_id,
                asset_id = %asset_id,
                "Resolved asset id for character"
            );
            return Ok(asset_id);
        }

        let character = self
            .store
            .get_character(character_id)
            .await?
            .ok_or_else(|| {
                progression_core::ProgressionError::not_found("character", character_id.as_str())
            })?;
        character.asset_id.ok_or_else(|| {
            progression_core::ProgressionError::invalid_state(
                "conditional asset-id write lost the race but the row is still unresolved",
            )
        })
    }
}
