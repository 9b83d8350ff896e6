use crate::services::dedup::DedupStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Periodically evicts expired submission tokens until shutdown is signalled.
pub struct DedupSweeper {
    store: Arc<dyn DedupStore>,
    window: Duration,
    interval: std::time::Duration,
    shutdown: watch::Receiver<bool>,
}

impl DedupSweeper {
    pub fn new(
        store: Arc<dyn DedupStore>,
        window: Duration,
        interval: std::time::Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            window,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Submission token sweeper started (every {:?})",
            self.interval
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Submission token sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    pub async fn sweep_once(&self) -> usize {
        let cutoff = Utc::now() - self.window;
        let removed = self.store.sweep(cutoff).await;
        if removed > 0 {
            tracing::info!("🧹 Evicted {} expired submission tokens", removed);
        } else {
            tracing::debug!("🧹 No expired submission tokens");
        }
        removed
    }
}
