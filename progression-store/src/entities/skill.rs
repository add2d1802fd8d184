//! Skill Record Entity

use chrono::{DateTime, Utc};
use progression_core::{level_from_xp, CharacterId, SkillName};
use serde::{Deserialize, Serialize};

/// Skill record entity, keyed by (character, skill)
///
/// `experience` is monotonically non-decreasing; `level` is a pure function
/// of experience and is recomputed on every write, never trusted as
/// independently authoritative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillRecordEntity {
    /// Character ID
    pub character_id: CharacterId,
    /// Skill name
    pub skill: SkillName,
    /// Experience total
    pub experience: u64,
    /// Level derived from experience
    pub level: u8,
    /// Whether this skill mutated since the last confirmed on-chain update
    pub pending_onchain_update: bool,
    /// Updated at
    pub updated_at: DateTime<Utc>,
}

/// Skills feeding the combat-level derivation
pub const COMBAT_SKILLS: [&str; 4] = ["attack", "strength", "defence", "hitpoints"];

/// Combat level derived from the combat skill levels (missing skills count
/// as level 1), floored at the starting combat level of 3.
pub fn combat_level_for(skills: &[SkillRecordEntity]) -> u8 {
    let sum: u32 = COMBAT_SKILLS
        .iter()
        .map(|name| {
            skills
                .iter()
                .find(|s| s.skill.as_str() == *name)
                .map(|s| s.level as u32)
                .unwrap_or(1)
        })
        .sum();
    ((sum / 4) as u8).max(3)
}

/// Sum of all skill levels
pub fn total_level_for(skills: &[SkillRecordEntity]) -> u16 {
    skills.iter().map(|s| s.level as u16).sum()
}

impl SkillRecordEntity {
    /// Create a fresh skill record at 0 xp
    pub fn new(character_id: CharacterId, skill: SkillName) -> Self {
        Self {
            character_id,
            skill,
            experience: 0,
            level: 1,
            pending_onchain_update: false,
            updated_at: Utc::now(),
        }
    }

    /// Apply a gain, recomputing level. Returns whether the level rose.
    pub fn apply_gain(&mut self, gain: u64) -> bool {
        let previous = self.level;
        self.experience = self.experience.saturating_add(gain);
        self.level = level_from_xp(self.experience);
        self.pending_onchain_update = true;
        self.updated_at = Utc::now();
        self.level > previous
    }
}
