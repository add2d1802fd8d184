//! Proof-Gated Update Protocol
//!
//! One reconciliation attempt for one character:
//!
//! ```text
//! FETCH_PROOF -> BUILD_TX -> SUBMIT -> CONFIRMED
//!      ^                        |
//!      +---- stale root --------+   (bounded, jittered backoff)
//! ```
//!
//! The snapshot's `state_version` is captured once at the start of the
//! attempt; completion is a compare-and-swap against it, so a mutation
//! landing mid-flight leaves the row pending and a later attempt mirrors the
//! newer state. Transient failures surface as retryable errors for the
//! runner to schedule; only `PayloadTooLarge` escapes as non-retryable.

use std::sync::Arc;

use progression_bridge::{
    ChainCapabilities, ChainClient, ContentStore, ProofIndexClient, ProofLookup, SignerContext,
    SubmitOutcome, UpdateTransaction,
};
use progression_core::{CharacterId, MetadataBuilder, ProgressionError, ProgressionResult};
use progression_store::ProgressionStore;
use tracing::{debug, info, warn};

use crate::attempt::BackoffConfig;

/// Update protocol tuning
#[derive(Clone, Debug)]
pub struct UpdateProtocolConfig {
    /// Bounded stale-proof refetches within one attempt
    pub max_proof_refreshes: u32,
    /// Backoff between stale-proof refetches
    pub proof_backoff: BackoffConfig,
}

impl Default for UpdateProtocolConfig {
    fn default() -> Self {
        Self {
            max_proof_refreshes: 5,
            proof_backoff: BackoffConfig::default()
                .with_initial_delay_ms(200)
                .with_max_delay_ms(5_000),
        }
    }
}

/// Outcome of one protocol run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The chain confirmed the transition. `superseded` is true when a newer
    /// mutation landed mid-flight, in which case the row stays pending.
    Confirmed { signature: String, superseded: bool },
    /// Nothing to mirror; the row was not pending
    Clean,
}

/// The per-character update state machine
pub struct UpdateProtocol<S: ProgressionStore> {
    store: Arc<S>,
    chain: Arc<dyn ChainClient>,
    index: Arc<dyn ProofIndexClient>,
    content: Arc<dyn ContentStore>,
    signer: Arc<SignerContext>,
    capabilities: ChainCapabilities,
    builder: MetadataBuilder,
    config: UpdateProtocolConfig,
}

impl<S: ProgressionStore> UpdateProtocol<S> {
    /// Create a protocol instance. `capabilities` comes from the startup
    /// capability check so payloads are sized against the real ceiling.
    pub fn new(
        store: Arc<S>,
        chain: Arc<dyn ChainClient>,
        index: Arc<dyn ProofIndexClient>,
        content: Arc<dyn ContentStore>,
        signer: Arc<SignerContext>,
        capabilities: ChainCapabilities,
        config: UpdateProtocolConfig,
    ) -> Self {
        Self {
            store,
            chain,
            index,
            content,
            signer,
            capabilities,
            builder: MetadataBuilder::new(),
            config,
        }
    }

    /// Run one full reconciliation attempt for a character.
    pub async fn run_once(&self, character_id: &CharacterId) -> ProgressionResult<UpdateOutcome> {
        let character = self
            .store
            .get_character(character_id)
            .await?
            .ok_or_else(|| ProgressionError::not_found("character", character_id.as_str()))?;

        if !character.pending_onchain_update {
            return Ok(UpdateOutcome::Clean);
        }

        let Some(asset_id) = character.asset_id else {
            // Resolution has not completed; defer without counting against
            // the stale-proof budget.
            return Err(ProgressionError::UnresolvedAsset {
                character_id: character_id.as_str().to_string(),
            });
        };

        let snapshot = self
            .store
            .snapshot(character_id)
            .await?
            .ok_or_else(|| ProgressionError::not_found("character", character_id.as_str()))?;
        let observed_version = snapshot.state_version;

        let mut ceiling_override: Option<usize> = None;
        let mut refreshes = 0u32;
        loop {
            let proof = match self.index.asset_proof(&asset_id).await? {
                ProofLookup::Found(proof) => proof,
                ProofLookup::NotFound => {
                    return Err(ProgressionError::transient(format!(
                        "asset {} not present in the read index yet",
                        asset_id
                    )));
                }
            };

            let max_bytes = ceiling_override.unwrap_or(self.capabilities.max_transaction_bytes);
            let ceiling = max_bytes.saturating_sub(proof.encoded_size());
            let payload = self.builder.build_within(&snapshot, ceiling)?;

            let metadata_uri = self
                .content
                .put(&payload.canonical_bytes, "application/json")
                .await?;

            let transaction = UpdateTransaction {
                asset_id: asset_id.clone(),
                new_data_hash: payload.data_hash,
                payload: payload.canonical_bytes,
                metadata_uri: metadata_uri.clone(),
                proof,
            };

            debug!(
                character_id = %character_id,
                asset_id = %asset_id,
                state_version = observed_version,
                detail = ?payload.detail,
                tx_bytes = transaction.encoded_size(),
                "Submitting state-transition"
            );

            match self.chain.submit_update(&self.signer, &transaction).await? {
                SubmitOutcome::Confirmed { signature } => {
                    let cleared = self
                        .store
                        .complete_update(character_id, observed_version, &signature, &metadata_uri)
                        .await?;
                    if cleared {
                        info!(
                            character_id = %character_id,
                            asset_id = %asset_id,
                            state_version = observed_version,
                            signature = %signature,
                            "On-chain mirror converged"
                        );
                    } else {
                        info!(
                            character_id = %character_id,
                            state_version = observed_version,
                            "Update confirmed but superseded by a newer mutation, row stays pending"
                        );
                    }
                    return Ok(UpdateOutcome::Confirmed {
                        signature,
                        superseded: !cleared,
                    });
                }
                SubmitOutcome::StaleRoot => {
                    refreshes += 1;
                    if refreshes >= self.config.max_proof_refreshes {
                        return Err(ProgressionError::ExhaustedRetries {
                            attempts: refreshes,
                            reason: "tree root kept changing under the proof".to_string(),
                        });
                    }
                    let delay = self.config.proof_backoff.calculate_delay(refreshes);
                    warn!(
                        character_id = %character_id,
                        asset_id = %asset_id,
                        refresh = refreshes,
                        delay_ms = delay.num_milliseconds(),
                        "Stale proof, refetching after backoff"
                    );
                    tokio::time::sleep(delay.to_std().unwrap_or_default()).await;
                }
                SubmitOutcome::PayloadTooLarge { max_bytes } => {
                    // The chain disagrees with its advertised ceiling; rebuild
                    // once against the enforced one.
                    if ceiling_override == Some(max_bytes) {
                        return Err(ProgressionError::PayloadTooLarge {
                            size: transaction.encoded_size(),
                            ceiling: max_bytes,
                        });
                    }
                    warn!(
                        character_id = %character_id,
                        advertised = self.capabilities.max_transaction_bytes,
                        enforced = max_bytes,
                        "Chain rejected transaction size, rebuilding against enforced ceiling"
                    );
                    ceiling_override = Some(max_bytes);
                }
                SubmitOutcome::Transient { reason } => {
                    return Err(ProgressionError::transient(reason));
                }
            }
        }
    }
}
