//! Background cache housekeeping.
//!
//! One periodic task sweeps every registered cache for TTL-expired entries
//! (persisting write-back victims as a side effect) and emits the
//! rate-limited human-readable summary log. Shutdown drains every cache so
//! deferred write-back entries are not silently lost.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, Instant};
use tracing::{debug, info};

use crate::cache::CacheMaintenance;

/// Settings for the maintenance task
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Time between expiry sweeps
    pub sweep_interval: Duration,

    /// Time between summary log lines; None disables the summary
    pub log_period: Option<Duration>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            log_period: Some(Duration::from_secs(300)),
        }
    }
}

/// Periodic sweeper over every cache adapter in the process.
pub struct MaintenanceJob {
    caches: Vec<Arc<dyn CacheMaintenance>>,
    config: MaintenanceConfig,
}

impl MaintenanceJob {
    pub fn new(caches: Vec<Arc<dyn CacheMaintenance>>, config: MaintenanceConfig) -> Self {
        Self { caches, config }
    }

    /// Runs one sweep pass over all caches, returning entries reclaimed
    pub async fn sweep_once(&self) -> usize {
        let mut reclaimed = 0;
        for cache in &self.caches {
            let swept = cache.sweep().await;
            if swept > 0 {
                debug!("cache '{}': swept {} expired entries", cache.name(), swept);
            }
            reclaimed += swept;
        }
        reclaimed
    }

    /// Logs one summary line per cache
    pub fn log_summaries(&self) {
        for cache in &self.caches {
            cache.log_summary();
        }
    }

    /// Starts the background task
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.sweep_interval);
            let mut last_log = Instant::now();

            loop {
                ticker.tick().await;
                self.sweep_once().await;

                if let Some(period) = self.config.log_period {
                    if last_log.elapsed() >= period {
                        self.log_summaries();
                        last_log = Instant::now();
                    }
                }
            }
        })
    }
}

/// Drains every cache, flushing write-back entries to the store.
///
/// Must run once at shutdown.
pub async fn drain_all(caches: &[Arc<dyn CacheMaintenance>]) -> usize {
    let mut drained = 0;
    for cache in caches {
        let count = cache.drain().await;
        info!("cache '{}': drained {} entries at shutdown", cache.name(), count);
        drained += count;
    }
    drained
}
