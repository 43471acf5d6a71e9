//! Expiry Sweeper
//!
//! Reconciles the durable store: LOCKED rows past their expiry become
//! CANCELLED. The cache drops those entries on its own via TTL.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::locks::LockManager;

/// Handle used to stop the sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops scheduling new ticks and waits for an in-flight tick to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            warn!("Sweeper task ended abnormally: {}", e);
        }
        info!("Expiry sweeper stopped");
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Spawns the periodic expiry sweeper.
///
/// A failed tick is logged and the next tick proceeds normally.
pub fn spawn_sweeper_task(manager: Arc<LockManager>, interval_secs: u64) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let period = Duration::from_secs(interval_secs.max(1));

    let join = tokio::spawn(async move {
        info!("Starting expiry sweeper with interval of {} seconds", interval_secs);

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so startup is quiet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            // Not raced against shutdown: a started tick runs to completion.
            match manager.sweep_expired().await {
                Ok(report) if report.cancelled > 0 => {
                    info!("Expiry sweep: cancelled {} lapsed locks", report.cancelled)
                }
                Ok(_) => debug!("Expiry sweep: nothing to cancel"),
                Err(e) => warn!("Expiry sweep failed, will retry next tick: {}", e),
            }
        }
    });

    SweeperHandle { shutdown_tx, join }
}
