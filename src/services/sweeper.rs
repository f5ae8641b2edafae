use crate::services::SystemService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Periodically removes expired cache entries that no lookup has touched.
#[derive(Clone)]
pub struct CacheSweeper {
    system: Arc<dyn SystemService>,
    interval: Duration,
}

impl CacheSweeper {
    #[must_use]
    pub fn new(system: Arc<dyn SystemService>, interval_minutes: u64) -> Self {
        Self {
            system,
            interval: Duration::from_secs(interval_minutes.saturating_mul(60)),
        }
    }

    /// Spawns the sweep loop; `None` when sweeping is disabled.
    #[must_use]
    pub fn start(self) -> Option<tokio::task::JoinHandle<()>> {
        if self.interval.is_zero() {
            info!("Cache sweeper disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            self.sweep_loop().await;
        }))
    }

    async fn sweep_loop(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            interval_secs = self.interval.as_secs(),
            "Cache sweeper loop started"
        );

        loop {
            interval.tick().await;
            self.sweep_once().await;
        }
    }

    pub async fn sweep_once(&self) -> u64 {
        match self.system.purge_expired().await {
            Ok(0) => {
                debug!("No expired cache entries");
                0
            }
            Ok(removed) => {
                info!(removed, "Purged expired cache entries");
                removed
            }
            Err(e) => {
                error!("Cache sweep failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::services::SeaOrmSystemService;

    #[tokio::test]
    async fn test_sweep_once_removes_expired() {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap()
            .with_cache_ttl(chrono::Duration::seconds(-1));
        store.cache_results("old", "old", &[], 10).await.unwrap();

        let system: Arc<dyn SystemService> = Arc::new(SeaOrmSystemService::new(store, true));
        let sweeper = CacheSweeper::new(system, 30);
        assert_eq!(sweeper.sweep_once().await, 1);
        assert_eq!(sweeper.sweep_once().await, 0);
    }

    #[tokio::test]
    async fn test_zero_interval_disables() {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        let system: Arc<dyn SystemService> = Arc::new(SeaOrmSystemService::new(store, true));
        assert!(CacheSweeper::new(system, 0).start().is_none());
    }
}
