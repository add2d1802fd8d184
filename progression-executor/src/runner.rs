//! Reconciliation Runner
//!
//! Background loop converging every pending character toward the chain.
//! Each tick scans pending tasks oldest-mutation-first under a batch bound,
//! skips tasks still inside their backoff window, and runs the update
//! protocol for the rest sequentially, so per-asset attempts never overlap.
//! One task's failure never aborts the scan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use progression_core::ProgressionError;
use progression_store::{PendingUpdateTask, ProgressionStore};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::attempt::BackoffConfig;
use crate::update::{UpdateOutcome, UpdateProtocol};

/// Runner tuning
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Interval between scans
    pub scan_interval: Duration,
    /// Batch bound per scan
    pub max_tasks_per_scan: usize,
    /// Attempt budget before a task is marked exhausted
    pub max_task_attempts: u32,
    /// Backoff between attempts on the same task
    pub task_backoff: BackoffConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(5),
            max_tasks_per_scan: 16,
            max_task_attempts: 10,
            task_backoff: BackoffConfig::default(),
        }
    }
}

/// Counters from one scan
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Tasks returned by the pending scan
    pub scanned: usize,
    /// Tasks whose update confirmed and cleared the pending flag
    pub confirmed: usize,
    /// Tasks whose update confirmed but was superseded mid-flight
    pub superseded: usize,
    /// Tasks skipped as not yet due or already clean
    pub skipped: usize,
    /// Tasks deferred with a recorded attempt and backoff
    pub deferred: usize,
    /// Tasks marked exhausted this scan
    pub exhausted: usize,
}

/// Handle to a spawned runner
pub struct RunnerHandle {
    shutdown_tx: mpsc::Sender<()>,
    running: Arc<AtomicBool>,
}

impl RunnerHandle {
    /// Request shutdown; the loop exits after the current scan.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    /// Whether the loop is still alive
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// The background reconciliation loop
pub struct ReconciliationRunner<S: ProgressionStore + 'static> {
    store: Arc<S>,
    protocol: Arc<UpdateProtocol<S>>,
    config: RunnerConfig,
}

impl<S: ProgressionStore + 'static> ReconciliationRunner<S> {
    /// Create a runner over a store and the update protocol
    pub fn new(store: Arc<S>, protocol: Arc<UpdateProtocol<S>>, config: RunnerConfig) -> Self {
        Self {
            store,
            protocol,
            config,
        }
    }

    /// Spawn the loop. Scans run inline on the loop task, so a long scan
    /// delays the next tick instead of overlapping it.
    pub fn start(self) -> RunnerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = running.clone();
        let scan_interval = self.config.scan_interval;

        tokio::spawn(async move {
            info!(
                scan_interval_ms = scan_interval.as_millis() as u64,
                max_tasks_per_scan = self.config.max_tasks_per_scan,
                "Reconciliation runner started"
            );
            let mut ticker = tokio::time::interval(scan_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let stats = self.scan_once().await;
                        if stats.scanned > 0 {
                            debug!(?stats, "Reconciliation scan complete");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Reconciliation runner stopping");
                        break;
                    }
                }
            }
            running_flag.store(false, Ordering::SeqCst);
        });

        RunnerHandle {
            shutdown_tx,
            running,
        }
    }

    /// One scan over the pending set. Public so deployments without a
    /// background task (and tests) can drive reconciliation directly.
    pub async fn scan_once(&self) -> ScanStats {
        let mut stats = ScanStats::default();
        let now = Utc::now();

        let tasks = match self.store.list_pending(self.config.max_tasks_per_scan).await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "Pending scan failed, retrying next tick");
                return stats;
            }
        };
        stats.scanned = tasks.len();

        for task in tasks {
            if !task.is_due(&now) {
                stats.skipped += 1;
                continue;
            }

            match self.protocol.run_once(&task.character_id).await {
                Ok(UpdateOutcome::Confirmed { superseded, .. }) => {
                    if superseded {
                        stats.superseded += 1;
                    } else {
                        stats.confirmed += 1;
                    }
                }
                Ok(UpdateOutcome::Clean) => {
                    stats.skipped += 1;
                }
                Err(e) => {
                    self.handle_failure(&task, e, &mut stats).await;
                }
            }
        }

        stats
    }

    /// Record the failure against the task: retryable errors get a backoff
    /// slot, non-retryable ones exhaust immediately. A task past its attempt
    /// budget is marked for operator visibility and excluded from scans.
    async fn handle_failure(
        &self,
        task: &PendingUpdateTask,
        error: ProgressionError,
        stats: &mut ScanStats,
    ) {
        if !error.is_retryable() {
            error!(
                character_id = %task.character_id,
                error = %error,
                "Non-retryable reconciliation failure, marking task exhausted"
            );
            if let Err(e) = self.store.mark_exhausted(&task.character_id).await {
                warn!(character_id = %task.character_id, error = %e, "Failed to mark task exhausted");
            }
            stats.exhausted += 1;
            return;
        }

        let delay = self
            .config
            .task_backoff
            .calculate_delay(task.attempt_count + 1);
        let next_retry_at = Utc::now() + delay;

        let attempts = match self
            .store
            .record_attempt(&task.character_id, Some(next_retry_at))
            .await
        {
            Ok(attempts) => attempts,
            Err(e) => {
                warn!(character_id = %task.character_id, error = %e, "Failed to record attempt");
                return;
            }
        };

        if attempts >= self.config.max_task_attempts {
            error!(
                character_id = %task.character_id,
                attempts,
                error = %error,
                "Task exceeded its attempt budget, marking exhausted"
            );
            if let Err(e) = self.store.mark_exhausted(&task.character_id).await {
                warn!(character_id = %task.character_id, error = %e, "Failed to mark task exhausted");
            }
            stats.exhausted += 1;
        } else {
            debug!(
                character_id = %task.character_id,
                attempts,
                delay_ms = delay.num_milliseconds(),
                error = %error,
                "Reconciliation attempt deferred"
            );
            stats.deferred += 1;
        }
    }
}
