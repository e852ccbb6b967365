use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::StoreError;
use crate::credential_store::{CredentialStore, PurgeReport};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub cutoff: DateTime<Utc>,
    pub purged: PurgeReport,
    /// Active access credentials flipped to `Expired` after the purge.
    pub lapsed: u64,
}

/// Handle to stop a running sweeper task and wait for it.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Request graceful shutdown and wait for the task to stop.
    ///
    /// A sweep already in progress finishes first.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

/// Deletes long-terminal credential rows on a fixed interval.
///
/// Every pass is idempotent and never touches an `Active` row, so it is safe
/// to run next to live traffic and to run more than once.
#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn CredentialStore>,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn CredentialStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Run one pass: purge rows terminal before `now - retention`, then mark
    /// lapsed active access credentials as expired.
    ///
    /// Purging first means a row is never flipped and deleted in the same pass.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let cutoff = now - self.retention;
        let purged = self.store.purge_terminal(cutoff).await?;
        let lapsed = self.store.expire_lapsed_access(now).await?;

        let report = SweepReport {
            cutoff,
            purged,
            lapsed,
        };
        info!(
            cutoff = %report.cutoff,
            purged_access = report.purged.access,
            purged_refresh = report.purged.refresh,
            lapsed = report.lapsed,
            "retention sweep finished"
        );
        Ok(report)
    }

    /// Spawn the periodic task on the current tokio runtime.
    ///
    /// The first pass runs one `interval` after spawning.
    pub fn spawn(self, interval: StdDuration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        if let Err(err) = self.sweep_once(Utc::now()).await {
                            // Next tick retries; nothing is half-applied.
                            warn!(error = %err, "retention sweep failed");
                        }
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            join: Some(join),
        }
    }
}
