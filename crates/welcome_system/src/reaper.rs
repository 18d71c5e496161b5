//! Periodic eviction of expired join and cooldown entries.

use crate::state::PlayerStateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Handle to the background sweep task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct ExpiryReaper {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ExpiryReaper {
    /// Spawns the sweep loop. The first sweep runs one `period` from now.
    pub fn spawn(store: Arc<PlayerStateStore>, period: Duration, cooldown_retention: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let stats = store.sweep_expired(cooldown_retention);
                        if stats.expired_joins > 0 || stats.expired_cooldowns > 0 {
                            debug!(
                                "🧹 Reaper evicted {} join entries and {} cooldown entries",
                                stats.expired_joins, stats.expired_cooldowns
                            );
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        info!(
            "🧹 Expiry reaper started (every {}s, cooldown retention {}s)",
            period.as_secs(),
            cooldown_retention.as_secs()
        );

        Self {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Stops the sweep loop and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Expiry reaper ended abnormally: {}", e);
            }
        }
        info!("🧹 Expiry reaper stopped");
    }
}

impl Drop for ExpiryReaper {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
