//! Experience Award Entity

use chrono::{DateTime, Utc};
use progression_core::{CharacterId, IdempotencyKey, SkillName};
use serde::{Deserialize, Serialize};

/// The outcome of one effective award, persisted so a retried delivery of
/// the same idempotency key replays the original response unchanged even if
/// later awards moved the skill further.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AwardOutcome {
    /// Level after the award
    pub level: u8,
    /// Experience after the award
    pub experience: u64,
    /// Whether the award crossed a level threshold
    pub leveled_up: bool,
    /// Progress toward the next level, 0.0..=100.0
    pub progress_pct: f64,
}

/// Append-only experience award event: dedupe guard and audit trail
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct XpAwardEntity {
    /// Globally unique idempotency key
    pub idempotency_key: IdempotencyKey,
    /// Character ID
    pub character_id: CharacterId,
    /// Skill name
    pub skill: SkillName,
    /// Experience gained (always > 0)
    pub experience_gain: u64,
    /// Outcome at the time the award applied
    pub outcome: AwardOutcome,
    /// Created at
    pub created_at: DateTime<Utc>,
}

impl XpAwardEntity {
    /// Create an award event
    pub fn new(
        idempotency_key: IdempotencyKey,
        character_id: CharacterId,
        skill: SkillName,
        experience_gain: u64,
        outcome: AwardOutcome,
    ) -> Self {
        Self {
            idempotency_key,
            character_id,
            skill,
            experience_gain,
            outcome,
            created_at: Utc::now(),
        }
    }
}
