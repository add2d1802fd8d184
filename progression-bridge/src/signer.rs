//! Signer Context
//!
//! The submission signing credential is a shared, rate-limited resource. It
//! is passed explicitly into the update protocol, never read from an ambient
//! singleton, and spaces submissions to respect the external ledger's rate
//! limits.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Explicit signing context with a minimum-interval throttle
pub struct SignerContext {
    signer_id: String,
    min_submit_interval: Duration,
    last_submit: Mutex<Option<Instant>>,
}

impl SignerContext {
    /// Create a context for a signing identity
    pub fn new(signer_id: impl Into<String>) -> Self {
        Self {
            signer_id: signer_id.into(),
            min_submit_interval: Duration::from_millis(200),
            last_submit: Mutex::new(None),
        }
    }

    /// Set the minimum spacing between submissions
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_submit_interval = interval;
        self
    }

    /// Signing identity
    pub fn signer_id(&self) -> &str {
        &self.signer_id
    }

    /// Wait until the throttle window allows another submission. Chain
    /// clients call this immediately before signing; holding the slot lock
    /// across the wait keeps concurrent submitters spaced too.
    pub async fn acquire_submit_slot(&self) {
        let mut last = self.last_submit.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_submit_interval {
                tokio::time::sleep(self.min_submit_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
