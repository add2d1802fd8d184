//! Progression Store - Authoritative Off-Chain State
//!
//! The relational side of the progression mirror: entities, repository
//! traits, an in-memory repository for tests and single-process deployments,
//! and the Skill Ledger service that applies experience idempotently.
//!
//! The store is authoritative for level and experience; the on-chain asset is
//! an eventually-consistent mirror driven by the executor crate. Callers get
//! a synchronous answer as soon as the off-chain mutation commits here.

pub mod entities;
pub mod error;
pub mod ledger;
pub mod repos;

pub use entities::{
    combat_level_for, total_level_for, AwardOutcome, CharacterAssetEntity, PendingUpdateTask,
    SkillRecordEntity, XpAwardEntity,
};
pub use error::{StoreError, StoreResult};
pub use ledger::{AssetStatus, AwardResponse, SkillLedger};
pub use repos::{
    CharacterAssetRepository, MemoryStore, ProgressionStore, SkillRecordRepository,
    XpAwardRepository,
};
