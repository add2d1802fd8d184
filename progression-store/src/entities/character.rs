//! Character Asset Entity

use chrono::{DateTime, Utc};
use progression_core::{AssetId, CharacterId, StateVersion};
use serde::{Deserialize, Serialize};

/// Character asset entity
///
/// One row per character. `asset_id` stays null until the external indexer
/// derives the compressed-asset identifier; once set it is immutable. The
/// pending flag plus `state_version` drive the reconciliation loop, and the
/// backoff fields make the row double as its own pending-update task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterAssetEntity {
    /// Character ID (primary key, assigned at creation)
    pub character_id: CharacterId,
    /// Compressed asset id, null until resolved, immutable once set
    pub asset_id: Option<AssetId>,
    /// Display name
    pub name: String,
    /// Combat level, derived from combat skill levels
    pub combat_level: u8,
    /// Sum of all skill levels
    pub total_level: u16,
    /// Monotonic counter, incremented exactly once per committed mutation
    pub state_version: StateVersion,
    /// Whether the on-chain mirror lags this row
    pub pending_onchain_update: bool,
    /// Signature of the last confirmed on-chain update
    pub last_committed_signature: Option<String>,
    /// Metadata URI recorded with the last confirmed update
    pub last_metadata_uri: Option<String>,
    /// Reconciliation attempts since the last confirmed update
    pub attempt_count: u32,
    /// Earliest time the next reconciliation attempt may run
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Set when the retry budget ran out; the row stays pending but the scan
    /// skips it until an operator intervenes
    pub update_exhausted: bool,
    /// Content-store reference to portrait art
    pub portrait_uri: Option<String>,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Updated at
    pub updated_at: DateTime<Utc>,
}

impl CharacterAssetEntity {
    /// Create a fresh character row (level 1 everywhere, nothing pending)
    pub fn new(character_id: CharacterId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            character_id,
            asset_id: None,
            name: name.into(),
            combat_level: 3,
            total_level: 0,
            state_version: 0,
            pending_onchain_update: false,
            last_committed_signature: None,
            last_metadata_uri: None,
            attempt_count: 0,
            next_retry_at: None,
            update_exhausted: false,
            portrait_uri: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the asset id has been resolved
    pub fn is_resolved(&self) -> bool {
        self.asset_id.is_some()
    }

    /// Derived pending-update task view
    pub fn as_task(&self) -> PendingUpdateTask {
        PendingUpdateTask {
            character_id: self.character_id.clone(),
            asset_id: self.asset_id.clone(),
            state_version: self.state_version,
            attempt_count: self.attempt_count,
            next_retry_at: self.next_retry_at,
            updated_at: self.updated_at,
        }
    }
}

/// Derived view of one pending on-chain update
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingUpdateTask {
    /// Character ID
    pub character_id: CharacterId,
    /// Asset id, if resolved
    pub asset_id: Option<AssetId>,
    /// State version at scan time
    pub state_version: StateVersion,
    /// Attempts since the last confirmed update
    pub attempt_count: u32,
    /// Backoff gate
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Last mutation time (scan orders oldest first)
    pub updated_at: DateTime<Utc>,
}

impl PendingUpdateTask {
    /// Whether the task's backoff window has elapsed
    pub fn is_due(&self, now: &DateTime<Utc>) -> bool {
        match self.next_retry_at {
            Some(at) => *now >= at,
            None => true,
        }
    }
}
