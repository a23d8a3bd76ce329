//! Configuration and counters for the cache module.

#![allow(dead_code)]

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one cache instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries. 0 disables the cache entirely: the owning
    /// adapter becomes a pass-through to the backing store.
    pub capacity: usize,

    /// Time-to-live for entries (None = no expiration)
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Some(Duration::from_secs(3600)),
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Creates a configuration without expiration
    pub fn no_expiration(capacity: usize) -> Self {
        Self {
            capacity,
            ttl: None,
        }
    }

    /// Creates a disabled configuration (capacity 0)
    pub fn disabled() -> Self {
        Self {
            capacity: 0,
            ttl: None,
        }
    }

    /// Sets the TTL for entries
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Disables TTL
    pub fn no_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Whether this configuration enables caching at all
    pub fn enabled(&self) -> bool {
        self.capacity > 0
    }
}

/// Counters exported by a cache instance.
///
/// All counters are monotonic; `size` is a point-in-time gauge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Total `get` attempts
    pub tries: u64,

    /// Lookups that found nothing usable (absent or expired)
    pub misses: u64,

    /// Entries evicted by capacity pressure
    pub evictions: u64,

    /// Entries reclaimed after their TTL ran out
    pub expirations: u64,

    /// Cumulative time spent inside cache operations, in nanoseconds
    pub cumulative_time_ns: u64,

    /// Current number of entries
    pub size: usize,
}

impl CacheStats {
    /// Hit rate over all tries (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.tries == 0 {
            0.0
        } else {
            (self.tries - self.misses) as f64 / self.tries as f64
        }
    }

    /// Average time per operation in nanoseconds
    pub fn avg_op_time_ns(&self) -> u64 {
        if self.tries == 0 {
            0
        } else {
            self.cumulative_time_ns / self.tries
        }
    }
}
