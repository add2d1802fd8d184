//! In-Memory Store
//!
//! Thread-safe in-memory repository implementation behind tokio RwLocks,
//! for tests and single-process deployments. Write paths that must be
//! atomic (version bump, CAS completion, conditional asset-id write) hold
//! the write lock across the whole read-modify-write.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use progression_core::{AssetId, CharacterId, IdempotencyKey, SkillName, StateVersion};
use tokio::sync::RwLock;

use crate::entities::{
    combat_level_for, total_level_for, CharacterAssetEntity, PendingUpdateTask,
    SkillRecordEntity, XpAwardEntity,
};
use crate::error::{StoreError, StoreResult};
use crate::repos::{CharacterAssetRepository, SkillRecordRepository, XpAwardRepository};

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    characters: RwLock<HashMap<CharacterId, CharacterAssetEntity>>,
    skills: RwLock<HashMap<(CharacterId, SkillName), SkillRecordEntity>>,
    awards: RwLock<HashMap<IdempotencyKey, XpAwardEntity>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data
    pub async fn clear(&self) {
        self.characters.write().await.clear();
        self.skills.write().await.clear();
        self.awards.write().await.clear();
    }
}

#[async_trait]
impl CharacterAssetRepository for MemoryStore {
    async fn create_character(&self, entity: CharacterAssetEntity) -> StoreResult<()> {
        let mut characters = self.characters.write().await;
        if characters.contains_key(&entity.character_id) {
            return Err(StoreError::duplicate(
                "CharacterAsset",
                entity.character_id.as_str(),
            ));
        }
        characters.insert(entity.character_id.clone(), entity);
        Ok(())
    }

    async fn get_character(
        &self,
        character_id: &CharacterId,
    ) -> StoreResult<Option<CharacterAssetEntity>> {
        let characters = self.characters.read().await;
        Ok(characters.get(character_id).cloned())
    }

    async fn set_asset_id_if_unset(
        &self,
        character_id: &CharacterId,
        asset_id: &AssetId,
    ) -> StoreResult<bool> {
        let mut characters = self.characters.write().await;
        let entity = characters
            .get_mut(character_id)
            .ok_or_else(|| StoreError::not_found("CharacterAsset", character_id.as_str()))?;

        if entity.asset_id.is_some() {
            return Ok(false);
        }
        entity.asset_id = Some(asset_id.clone());
        entity.updated_at = Utc::now();
        Ok(true)
    }

    async fn commit_mutation(&self, character_id: &CharacterId) -> StoreResult<StateVersion> {
        // Lock order: characters before skills, as in complete_update.
        let mut characters = self.characters.write().await;
        let skills = self.skills.read().await;
        let entity = characters
            .get_mut(character_id)
            .ok_or_else(|| StoreError::not_found("CharacterAsset", character_id.as_str()))?;

        let rows: Vec<SkillRecordEntity> = skills
            .values()
            .filter(|r| &r.character_id == character_id)
            .cloned()
            .collect();

        entity.state_version += 1;
        entity.pending_onchain_update = true;
        entity.combat_level = combat_level_for(&rows);
        entity.total_level = total_level_for(&rows);
        // A fresh mutation supersedes any exhaustion verdict.
        entity.update_exhausted = false;
        entity.updated_at = Utc::now();
        Ok(entity.state_version)
    }

    async fn complete_update(
        &self,
        character_id: &CharacterId,
        observed_version: StateVersion,
        signature: &str,
        metadata_uri: &str,
    ) -> StoreResult<bool> {
        let mut characters = self.characters.write().await;
        let entity = characters
            .get_mut(character_id)
            .ok_or_else(|| StoreError::not_found("CharacterAsset", character_id.as_str()))?;

        // The signature is recorded either way: the chain accepted the
        // transition built from the observed snapshot.
        entity.last_committed_signature = Some(signature.to_string());
        entity.last_metadata_uri = Some(metadata_uri.to_string());

        if entity.state_version != observed_version {
            // A newer mutation landed mid-flight; leave pending set so the
            // next run converges on the latest state.
            return Ok(false);
        }

        entity.pending_onchain_update = false;
        entity.attempt_count = 0;
        entity.next_retry_at = None;
        entity.update_exhausted = false;

        let mut skills = self.skills.write().await;
        for record in skills.values_mut() {
            if &record.character_id == character_id {
                record.pending_onchain_update = false;
            }
        }
        Ok(true)
    }

    async fn record_attempt(
        &self,
        character_id: &CharacterId,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> StoreResult<u32> {
        let mut characters = self.characters.write().await;
        let entity = characters
            .get_mut(character_id)
            .ok_or_else(|| StoreError::not_found("CharacterAsset", character_id.as_str()))?;

        entity.attempt_count += 1;
        entity.next_retry_at = next_retry_at;
        Ok(entity.attempt_count)
    }

    async fn mark_exhausted(&self, character_id: &CharacterId) -> StoreResult<()> {
        let mut characters = self.characters.write().await;
        let entity = characters
            .get_mut(character_id)
            .ok_or_else(|| StoreError::not_found("CharacterAsset", character_id.as_str()))?;

        entity.update_exhausted = true;
        entity.next_retry_at = None;
        Ok(())
    }

    async fn list_pending(&self, limit: usize) -> StoreResult<Vec<PendingUpdateTask>> {
        let characters = self.characters.read().await;
        let mut tasks: Vec<PendingUpdateTask> = characters
            .values()
            .filter(|e| e.pending_onchain_update && !e.update_exhausted)
            .map(|e| e.as_task())
            .collect();
        tasks.sort_by_key(|t| t.updated_at);
        tasks.truncate(limit);
        Ok(tasks)
    }
}

#[async_trait]
impl SkillRecordRepository for MemoryStore {
    async fn get_skill(
        &self,
        character_id: &CharacterId,
        skill: &SkillName,
    ) -> StoreResult<Option<SkillRecordEntity>> {
        let skills = self.skills.read().await;
        Ok(skills.get(&(character_id.clone(), skill.clone())).cloned())
    }

    async fn upsert_skill(&self, entity: SkillRecordEntity) -> StoreResult<()> {
        let mut skills = self.skills.write().await;
        skills.insert(
            (entity.character_id.clone(), entity.skill.clone()),
            entity,
        );
        Ok(())
    }

    async fn list_skills(
        &self,
        character_id: &CharacterId,
    ) -> StoreResult<Vec<SkillRecordEntity>> {
        let skills = self.skills.read().await;
        Ok(skills
            .values()
            .filter(|r| &r.character_id == character_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl XpAwardRepository for MemoryStore {
    async fn insert_award(&self, entity: XpAwardEntity) -> StoreResult<()> {
        let mut awards = self.awards.write().await;
        if awards.contains_key(&entity.idempotency_key) {
            return Err(StoreError::duplicate(
                "XpAward",
                entity.idempotency_key.as_str(),
            ));
        }
        awards.insert(entity.idempotency_key.clone(), entity);
        Ok(())
    }

    async fn get_award(&self, key: &IdempotencyKey) -> StoreResult<Option<XpAwardEntity>> {
        let awards = self.awards.read().await;
        Ok(awards.get(key).cloned())
    }
}
