//! Retry Backoff
//!
//! Exponential backoff with a cap and jitter, shared by the stale-proof
//! retry loop and the reconciliation loop's per-task scheduling.

use chrono::{Duration, Utc};

/// Backoff configuration
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Initial retry delay in milliseconds
    pub initial_delay_ms: i64,
    /// Maximum retry delay in milliseconds
    pub max_delay_ms: i64,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 300_000, // 5 minutes
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffConfig {
    /// Set the initial delay
    pub fn with_initial_delay_ms(mut self, ms: i64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    /// Set the delay cap
    pub fn with_max_delay_ms(mut self, ms: i64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Delay before the given attempt number (1-indexed; attempt 0 has no
    /// delay). Grows exponentially, capped, with additive jitter.
    pub fn calculate_delay(&self, attempt_number: u32) -> Duration {
        if attempt_number == 0 {
            return Duration::zero();
        }

        let base = self.initial_delay_ms as f64
            * self.multiplier.powi(attempt_number.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay_ms as f64);

        let jitter_range = capped * self.jitter_factor;
        let jittered = capped + (jitter_range * rand_factor());

        Duration::milliseconds(jittered as i64)
    }
}

/// Simple pseudo-random factor in 0.0..1.0 for jitter
fn rand_factor() -> f64 {
    let nanos = Utc::now().timestamp_subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
