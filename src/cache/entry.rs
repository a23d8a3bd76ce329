//! Cache entry with expiry and access metadata.

#![allow(dead_code)]

use std::time::{Duration, Instant};

/// A cached value plus the bookkeeping needed for TTL and LRU decisions.
///
/// Entries are owned exclusively by the engine; callers only ever see clones
/// of `value`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,

    /// When the entry was inserted
    pub created_at: Instant,

    /// When the entry was last read
    pub last_accessed: Instant,

    /// Time-to-live for this entry (None = no expiration)
    pub ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    /// Creates a new entry
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_accessed: now,
            ttl,
        }
    }

    /// Creates an entry that never expires
    pub fn permanent(value: V) -> Self {
        Self::new(value, None)
    }

    /// Whether the entry's age exceeds its TTL
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.created_at.elapsed() > ttl,
            None => false,
        }
    }

    /// Marks the entry as read now
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    /// Age since insertion
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the last read
    pub fn idle_time(&self) -> Duration {
        self.last_accessed.elapsed()
    }

    /// Remaining TTL (None if no TTL or already expired)
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.ttl.and_then(|ttl| {
            let elapsed = self.created_at.elapsed();
            if elapsed < ttl {
                Some(ttl - elapsed)
            } else {
                None
            }
        })
    }

    /// Consumes the entry and returns the value
    pub fn into_value(self) -> V {
        self.value
    }
}
