//! Platform-level configuration.

#![allow(dead_code)]

use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_BATCH_THRESHOLD};
use crate::groups::ShortIdConfig;

/// A log period of 24h or more disables the periodic cache summary
pub const LOG_PERIOD_DISABLE_SENTINEL: Duration = Duration::from_secs(24 * 3600);

/// Everything the core consumes from the environment.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// HTTP bind address
    pub bind_addr: String,

    /// Invalidation bus implementation (`noop` or `log`)
    pub bus: String,

    /// Per-entity cache settings; capacity 0 disables a cache
    pub users_cache: CacheConfig,
    pub tokens_cache: CacheConfig,
    pub groups_cache: CacheConfig,
    pub hierarchies_cache: CacheConfig,
    pub devices_cache: CacheConfig,
    pub endpoints_cache: CacheConfig,
    pub locations_cache: CacheConfig,
    pub protocols_cache: CacheConfig,

    /// Dirty entries that trigger a write-back batch flush
    pub batch_threshold: usize,

    /// Depth bound for hierarchy materialization and cascades
    pub hierarchy_max_depth: usize,

    /// Short-id alphabet and length
    pub short_ids: ShortIdConfig,

    /// How often the maintenance job sweeps for expired entries
    pub sweep_interval: Duration,

    /// How often the cache summary is logged; >= 24h disables it
    pub log_period: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            bus: "noop".to_string(),
            users_cache: CacheConfig::default(),
            tokens_cache: CacheConfig::default(),
            groups_cache: CacheConfig::default(),
            hierarchies_cache: CacheConfig::with_capacity(500),
            devices_cache: CacheConfig::with_capacity(5000),
            endpoints_cache: CacheConfig::with_capacity(5000),
            locations_cache: CacheConfig::with_capacity(10000),
            protocols_cache: CacheConfig::with_capacity(100),
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            hierarchy_max_depth: 8,
            short_ids: ShortIdConfig::default(),
            sweep_interval: Duration::from_secs(60),
            log_period: Duration::from_secs(300),
        }
    }
}

impl PlatformConfig {
    /// Loads configuration from environment variables, falling back to the
    /// defaults above.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_string("DEVICEGRID_BIND", &defaults.bind_addr),
            bus: env_string("DEVICEGRID_BUS", &defaults.bus),
            users_cache: cache_from_env("DEVICEGRID_CACHE_USERS", &defaults.users_cache),
            tokens_cache: cache_from_env("DEVICEGRID_CACHE_TOKENS", &defaults.tokens_cache),
            groups_cache: cache_from_env("DEVICEGRID_CACHE_GROUPS", &defaults.groups_cache),
            hierarchies_cache: cache_from_env(
                "DEVICEGRID_CACHE_HIERARCHIES",
                &defaults.hierarchies_cache,
            ),
            devices_cache: cache_from_env("DEVICEGRID_CACHE_DEVICES", &defaults.devices_cache),
            endpoints_cache: cache_from_env(
                "DEVICEGRID_CACHE_ENDPOINTS",
                &defaults.endpoints_cache,
            ),
            locations_cache: cache_from_env(
                "DEVICEGRID_CACHE_LOCATIONS",
                &defaults.locations_cache,
            ),
            protocols_cache: cache_from_env(
                "DEVICEGRID_CACHE_PROTOCOLS",
                &defaults.protocols_cache,
            ),
            batch_threshold: env_usize("DEVICEGRID_BATCH_THRESHOLD", defaults.batch_threshold),
            hierarchy_max_depth: env_usize(
                "DEVICEGRID_HIERARCHY_MAX_DEPTH",
                defaults.hierarchy_max_depth,
            ),
            short_ids: ShortIdConfig {
                alphabet: env_string("DEVICEGRID_SHORT_ID_ALPHABET", &defaults.short_ids.alphabet),
                length: env_usize("DEVICEGRID_SHORT_ID_LENGTH", defaults.short_ids.length),
            },
            sweep_interval: Duration::from_secs(env_u64(
                "DEVICEGRID_SWEEP_INTERVAL_SECONDS",
                defaults.sweep_interval.as_secs(),
            )),
            log_period: Duration::from_secs(env_u64(
                "DEVICEGRID_CACHE_LOG_PERIOD_SECONDS",
                defaults.log_period.as_secs(),
            )),
        }
    }

    /// Whether the periodic summary log is enabled at all
    pub fn summary_log_enabled(&self) -> bool {
        self.log_period < LOG_PERIOD_DISABLE_SENTINEL
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads `{prefix}_CAPACITY` and `{prefix}_TTL_SECONDS` for one cache.
///
/// A TTL of 0 means no expiration.
fn cache_from_env(prefix: &str, default: &CacheConfig) -> CacheConfig {
    let capacity = env_usize(&format!("{}_CAPACITY", prefix), default.capacity);
    let ttl_secs = env_u64(
        &format!("{}_TTL_SECONDS", prefix),
        default.ttl.map(|d| d.as_secs()).unwrap_or(0),
    );

    CacheConfig {
        capacity,
        ttl: if ttl_secs > 0 {
            Some(Duration::from_secs(ttl_secs))
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::default();
        assert!(config.users_cache.enabled());
        assert_eq!(config.hierarchy_max_depth, 8);
        assert!(config.summary_log_enabled());
    }

    #[test]
    fn test_log_period_sentinel_disables_summary() {
        let config = PlatformConfig {
            log_period: Duration::from_secs(24 * 3600),
            ..Default::default()
        };
        assert!(!config.summary_log_enabled());
    }

    #[test]
    fn test_cache_overrides_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        std::env::set_var("DEVICEGRID_CACHE_USERS_CAPACITY", "0");
        std::env::set_var("DEVICEGRID_CACHE_GROUPS_TTL_SECONDS", "120");

        let config = PlatformConfig::from_env();
        assert!(!config.users_cache.enabled());
        assert_eq!(config.groups_cache.ttl, Some(Duration::from_secs(120)));

        std::env::remove_var("DEVICEGRID_CACHE_USERS_CAPACITY");
        std::env::remove_var("DEVICEGRID_CACHE_GROUPS_TTL_SECONDS");
    }
}
