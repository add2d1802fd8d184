//! Repository Traits
//!
//! The relational collaborator behind these traits must provide row-level
//! locking and a uniqueness constraint on the idempotency key. `MemoryStore`
//! implements them in-process for tests and single-node deployments.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use progression_core::{
    level_from_xp, AssetId, CharacterId, IdempotencyKey, ProgressionSnapshot, SkillName,
    SkillSnapshot, StateVersion,
};

use crate::entities::{CharacterAssetEntity, PendingUpdateTask, SkillRecordEntity, XpAwardEntity};
use crate::error::StoreResult;

/// Character asset repository
#[async_trait]
pub trait CharacterAssetRepository: Send + Sync {
    /// Insert a new character row (duplicate id is an error)
    async fn create_character(&self, entity: CharacterAssetEntity) -> StoreResult<()>;

    /// Fetch one character
    async fn get_character(&self, character_id: &CharacterId)
        -> StoreResult<Option<CharacterAssetEntity>>;

    /// Conditional write of the asset id: succeeds only while `asset_id` is
    /// still null (`WHERE asset_id IS NULL`), so duplicate-resolution races
    /// can never overwrite. Returns whether this call performed the write.
    async fn set_asset_id_if_unset(
        &self,
        character_id: &CharacterId,
        asset_id: &AssetId,
    ) -> StoreResult<bool>;

    /// Record one committed off-chain mutation: bump `state_version` exactly
    /// once, set the pending flag, and recompute the derived levels
    /// (`combat_level`, `total_level`) from the skill rows inside the same
    /// atomic write, so interleaved awards can never persist stale totals at
    /// a newer version. Returns the new version.
    async fn commit_mutation(&self, character_id: &CharacterId) -> StoreResult<StateVersion>;

    /// Compare-and-swap completion of a confirmed on-chain update: only if
    /// `state_version` still equals `observed_version` does the pending flag
    /// clear (together with every skill's pending flag), the signature and
    /// metadata URI get recorded, and the backoff bookkeeping reset. Returns
    /// whether the swap happened; `false` means a newer mutation landed
    /// mid-flight and the row stays pending.
    async fn complete_update(
        &self,
        character_id: &CharacterId,
        observed_version: StateVersion,
        signature: &str,
        metadata_uri: &str,
    ) -> StoreResult<bool>;

    /// Record a failed or deferred reconciliation attempt; returns the new
    /// attempt count.
    async fn record_attempt(
        &self,
        character_id: &CharacterId,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> StoreResult<u32>;

    /// Mark the task exhausted for operator visibility. The row remains
    /// pending but the pending scan skips it.
    async fn mark_exhausted(&self, character_id: &CharacterId) -> StoreResult<()>;

    /// Pending-update tasks, oldest mutation first, excluding exhausted rows.
    /// `limit` caps scan latency.
    async fn list_pending(&self, limit: usize) -> StoreResult<Vec<PendingUpdateTask>>;
}

/// Skill record repository
#[async_trait]
pub trait SkillRecordRepository: Send + Sync {
    /// Fetch one skill row
    async fn get_skill(
        &self,
        character_id: &CharacterId,
        skill: &SkillName,
    ) -> StoreResult<Option<SkillRecordEntity>>;

    /// Create or replace one skill row
    async fn upsert_skill(&self, entity: SkillRecordEntity) -> StoreResult<()>;

    /// All skill rows for one character
    async fn list_skills(&self, character_id: &CharacterId)
        -> StoreResult<Vec<SkillRecordEntity>>;
}

/// Experience award repository (append-only)
#[async_trait]
pub trait XpAwardRepository: Send + Sync {
    /// Insert an award; the idempotency key is unique, a second insert with
    /// the same key fails with `Duplicate`.
    async fn insert_award(&self, entity: XpAwardEntity) -> StoreResult<()>;

    /// Fetch an award by idempotency key
    async fn get_award(&self, key: &IdempotencyKey) -> StoreResult<Option<XpAwardEntity>>;
}

/// Combined store contract with a snapshot read built on the parts
#[async_trait]
pub trait ProgressionStore:
    CharacterAssetRepository + SkillRecordRepository + XpAwardRepository
{
    /// Point-in-time snapshot of one character's committed state, the input
    /// to the metadata builder. Levels are re-derived from experience here so
    /// the payload can never carry a stale mapping.
    async fn snapshot(
        &self,
        character_id: &CharacterId,
    ) -> StoreResult<Option<ProgressionSnapshot>> {
        let Some(character) = self.get_character(character_id).await? else {
            return Ok(None);
        };
        let skills = self
            .list_skills(character_id)
            .await?
            .into_iter()
            .map(|record| SkillSnapshot {
                level: level_from_xp(record.experience),
                experience: record.experience,
                dirty: record.pending_onchain_update,
                skill: record.skill,
            })
            .collect();

        Ok(Some(ProgressionSnapshot {
            character_id: character.character_id,
            name: character.name,
            combat_level: character.combat_level,
            total_level: character.total_level,
            state_version: character.state_version,
            portrait_uri: character.portrait_uri,
            skills,
        }))
    }
}

impl<T> ProgressionStore for T where
    T: CharacterAssetRepository + SkillRecordRepository + XpAwardRepository
{
}
