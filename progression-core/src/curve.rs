//! Experience Curve
//!
//! The deterministic, monotonic curve mapping experience to level. Level is
//! never stored authoritatively anywhere; every consumer re-derives it from
//! experience through this module, so the off-chain store and the on-chain
//! mirror can never disagree on the mapping.
//!
//! The curve is the classic quarter-sum: the threshold for level `L` is the
//! running total of `floor(n + 300 * 2^(n/7))` over `n in 1..L`, floored by 4.
//! Level 2 sits at 83 xp, level 99 at 13,034,431 xp.

use std::sync::OnceLock;

/// Level cap
pub const MAX_LEVEL: u8 = 99;

/// Threshold table indexed by level; `TABLE[level]` is the minimum
/// experience for that level. Index 0 is unused, `TABLE[1] == 0`.
fn thresholds() -> &'static [u64; MAX_LEVEL as usize + 1] {
    static TABLE: OnceLock<[u64; MAX_LEVEL as usize + 1]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; MAX_LEVEL as usize + 1];
        let mut points: u64 = 0;
        for level in 2..=MAX_LEVEL as usize {
            let n = (level - 1) as f64;
            points += (n + 300.0 * 2f64.powf(n / 7.0)).floor() as u64;
            table[level] = points / 4;
        }
        table
    })
}

/// Minimum experience required for a level (clamped to 1..=MAX_LEVEL)
pub fn xp_for_level(level: u8) -> u64 {
    let level = level.clamp(1, MAX_LEVEL);
    thresholds()[level as usize]
}

/// Level reached at a given experience total
pub fn level_from_xp(experience: u64) -> u8 {
    let table = thresholds();
    for level in (1..=MAX_LEVEL).rev() {
        if experience >= table[level as usize] {
            return level;
        }
    }
    1
}

/// Percent progress from the current level threshold toward the next,
/// 0.0..=100.0. Reports 100.0 at the cap.
pub fn progress_pct(experience: u64) -> f64 {
    let level = level_from_xp(experience);
    if level >= MAX_LEVEL {
        return 100.0;
    }
    let floor = xp_for_level(level);
    let ceiling = xp_for_level(level + 1);
    let span = (ceiling - floor) as f64;
    ((experience - floor) as f64 / span * 100.0).clamp(0.0, 100.0)
}
