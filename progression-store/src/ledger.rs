//! Skill Ledger
//!
//! The authoritative experience/level service. Awards commit synchronously
//! here; on-chain convergence is someone else's job (the reconciliation
//! loop) and never blocks or fails the caller.
//!
//! Concurrency: a key-scoped lock spans the duplicate check, the skill
//! mutation and the award insert, so one idempotency key can never commit
//! two mutations, whichever skills its deliveries name. Within that, awards
//! to the same (character, skill) pair serialize on a per-row lock; awards
//! to different skills of the same character may interleave. The relational
//! collaborator provides the equivalent by running the whole award inside
//! one transaction with row-level locking.

use std::collections::HashMap;
use std::sync::Arc;

use progression_core::{
    progress_pct, CharacterId, IdempotencyKey, ProgressionError, ProgressionResult, SkillName,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::entities::{AwardOutcome, SkillRecordEntity, XpAwardEntity};
use crate::repos::ProgressionStore;

/// Caller-facing result of one award
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AwardResponse {
    /// Level after the award
    pub level: u8,
    /// Experience after the award
    pub experience: u64,
    /// Whether the award crossed a level threshold
    pub leveled_up: bool,
    /// Progress toward the next level, 0.0..=100.0
    pub progress_pct: f64,
    /// Whether this was a replay of an already-recorded idempotency key
    pub duplicate: bool,
}

impl AwardResponse {
    fn from_outcome(outcome: &AwardOutcome, duplicate: bool) -> Self {
        Self {
            level: outcome.level,
            experience: outcome.experience,
            leveled_up: outcome.leveled_up,
            progress_pct: outcome.progress_pct,
            duplicate,
        }
    }
}

/// Caller-facing asset status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStatus {
    /// Whether the compressed-asset id has been resolved
    pub resolved: bool,
    /// Whether the on-chain mirror lags the store
    pub pending: bool,
    /// Signature of the last confirmed on-chain update
    pub last_signature: Option<String>,
}

/// Skill Ledger service
pub struct SkillLedger<S: ProgressionStore> {
    store: Arc<S>,
    key_locks: Mutex<HashMap<IdempotencyKey, Arc<Mutex<()>>>>,
    row_locks: Mutex<HashMap<(CharacterId, SkillName), Arc<Mutex<()>>>>,
}

impl<S: ProgressionStore> SkillLedger<S> {
    /// Create a ledger over a store
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            key_locks: Mutex::new(HashMap::new()),
            row_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Access the underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Apply an experience gain idempotently.
    ///
    /// A previously recorded idempotency key replays the original outcome
    /// unchanged; at-least-once delivery is expected and a duplicate is not
    /// a failure. A zero gain is rejected.
    pub async fn apply_experience(
        &self,
        character_id: &CharacterId,
        skill: &SkillName,
        idempotency_key: &IdempotencyKey,
        gain: u64,
    ) -> ProgressionResult<AwardResponse> {
        if gain == 0 {
            return Err(ProgressionError::InvalidGain { gain });
        }

        // Fast check, no locks held.
        if let Some(existing) = self.store.get_award(idempotency_key).await? {
            debug!(
                idempotency_key = %idempotency_key,
                character_id = %character_id,
                "Replaying recorded award"
            );
            return Ok(AwardResponse::from_outcome(&existing.outcome, true));
        }

        // The key lock spans the re-check, the mutation and the award
        // insert: concurrent deliveries of one key serialize here even when
        // they name different skills, so the loser replays instead of
        // committing a second mutation. Always acquired before any row lock.
        let key_lock = self.lock_for_key(idempotency_key).await;
        let _key_guard = key_lock.lock().await;

        if let Some(existing) = self.store.get_award(idempotency_key).await? {
            return Ok(AwardResponse::from_outcome(&existing.outcome, true));
        }

        if self.store.get_character(character_id).await?.is_none() {
            return Err(ProgressionError::not_found(
                "CharacterAsset",
                character_id.as_str(),
            ));
        }

        let row_lock = self.lock_for_row(character_id, skill).await;
        let _row_guard = row_lock.lock().await;

        let mut record = match self.store.get_skill(character_id, skill).await? {
            Some(record) => record,
            None => SkillRecordEntity::new(character_id.clone(), skill.clone()),
        };

        let leveled_up = record.apply_gain(gain);
        let outcome = AwardOutcome {
            level: record.level,
            experience: record.experience,
            leveled_up,
            progress_pct: progress_pct(record.experience),
        };
        self.store.upsert_skill(record).await?;

        // Derived totals are recomputed from the skill rows inside the
        // store's atomic write, so interleaved awards to other skills cannot
        // pin stale totals to a newer version.
        let state_version = self.store.commit_mutation(character_id).await?;

        self.store
            .insert_award(XpAwardEntity::new(
                idempotency_key.clone(),
                character_id.clone(),
                skill.clone(),
                gain,
                outcome.clone(),
            ))
            .await?;

        info!(
            character_id = %character_id,
            skill = %skill,
            gain,
            level = outcome.level,
            leveled_up,
            state_version,
            "Experience applied"
        );

        Ok(AwardResponse::from_outcome(&outcome, false))
    }

    /// Report resolution and mirror status for one character
    pub async fn asset_status(&self, character_id: &CharacterId) -> ProgressionResult<AssetStatus> {
        let entity = self
            .store
            .get_character(character_id)
            .await?
            .ok_or_else(|| {
                ProgressionError::not_found("CharacterAsset", character_id.as_str())
            })?;

        Ok(AssetStatus {
            resolved: entity.is_resolved(),
            pending: entity.pending_onchain_update,
            last_signature: entity.last_committed_signature,
        })
    }

    async fn lock_for_key(&self, key: &IdempotencyKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn lock_for_row(&self, character_id: &CharacterId, skill: &SkillName) -> Arc<Mutex<()>> {
        let mut locks = self.row_locks.lock().await;
        locks
            .entry((character_id.clone(), skill.clone()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
