//! Generic bounded, expiring key/value engine with an eviction hook.

#![allow(dead_code)]

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use lru::LruCache;

use super::config::{CacheConfig, CacheStats};
use super::entry::CacheEntry;

/// Receives every entry the engine destroys.
///
/// `batch` is true when the removal is part of a bulk sweep (TTL sweep or
/// `drain`), and `last` marks the final item of such a sweep, giving
/// write-back adapters a guaranteed flush point. Hooks run inside the
/// engine's lock and must only buffer, never block or perform I/O.
pub trait EvictionHook<K, V>: Send + Sync {
    fn on_evict(&self, key: &K, value: V, batch: bool, last: bool);
}

/// Default hook that drops evicted entries
pub struct DiscardHook;

impl<K, V> EvictionHook<K, V> for DiscardHook {
    fn on_evict(&self, _key: &K, _value: V, _batch: bool, _last: bool) {}
}

/// Thread-safe bounded cache with TTL expiry, LRU capacity eviction and
/// operation metrics.
///
/// Entries are owned by the engine; every read hands out an independent
/// clone. Eviction has two triggers: inserting past capacity removes the
/// least-recently-accessed entry, and an entry older than its TTL is
/// invisible to `get` (counted as a miss, reclaimed on the spot). Destroyed
/// entries pass through the eviction hook so adapters can persist them.
///
/// A miss followed by a backing-store load and `put` is deliberately not
/// single-flighted: duplicate concurrent loads of the same key are tolerated
/// and the last `put` wins.
pub struct CacheEngine<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    cache: RwLock<LruCache<K, CacheEntry<V>>>,
    config: CacheConfig,
    hook: Arc<dyn EvictionHook<K, V>>,

    tries: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    op_time_ns: AtomicU64,
}

impl<K, V> CacheEngine<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates an engine that discards evicted entries
    pub fn new(config: CacheConfig) -> Self {
        Self::with_hook(config, Arc::new(DiscardHook))
    }

    /// Creates an engine with an eviction hook
    pub fn with_hook(config: CacheConfig, hook: Arc<dyn EvictionHook<K, V>>) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
            config,
            hook,
            tries: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            op_time_ns: AtomicU64::new(0),
        }
    }

    /// Gets a clone of the value for a key.
    ///
    /// An expired entry counts as a miss and is reclaimed through the hook
    /// before returning.
    pub fn get(&self, key: &K) -> Option<V> {
        let started = Instant::now();
        self.tries.fetch_add(1, Ordering::Relaxed);

        let result = {
            let mut cache = self.cache.write().ok()?;

            let expired = cache.peek(key).is_some_and(|entry| entry.is_expired());
            if expired {
                if let Some(entry) = cache.pop(key) {
                    self.expirations.fetch_add(1, Ordering::Relaxed);
                    self.hook.on_evict(key, entry.into_value(), false, false);
                }
                None
            } else if let Some(entry) = cache.get_mut(key) {
                entry.touch();
                Some(entry.value.clone())
            } else {
                None
            }
        };

        if result.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        self.account(started);
        result
    }

    /// Inserts a value, evicting at most one LRU victim past capacity.
    ///
    /// Re-inserting an existing key replaces the entry in place without an
    /// eviction.
    pub fn put(&self, key: K, value: V) {
        let started = Instant::now();
        let entry = CacheEntry::new(value, self.config.ttl);

        if let Ok(mut cache) = self.cache.write() {
            if let Some((victim_key, victim)) = cache.push(key.clone(), entry) {
                // push returns the displaced pair: same key means an in-place
                // replacement, a different key is a capacity eviction
                if victim_key != key {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    self.hook.on_evict(&victim_key, victim.into_value(), false, false);
                }
            }
        }

        self.account(started);
    }

    /// Removes a key, handing the value to the hook when `persist_now` is
    /// set. Returns the removed value either way.
    pub fn remove(&self, key: &K, persist_now: bool) -> Option<V> {
        let started = Instant::now();

        let removed = {
            let mut cache = self.cache.write().ok()?;
            cache.pop(key).map(CacheEntry::into_value)
        };

        if persist_now {
            if let Some(ref value) = removed {
                self.hook.on_evict(key, value.clone(), false, false);
            }
        }

        self.account(started);
        removed
    }

    /// Snapshot of the currently cached keys
    pub fn keys(&self) -> Vec<K> {
        self.cache
            .read()
            .map(|cache| cache.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether a key is present, without touching LRU order or metrics
    pub fn contains(&self, key: &K) -> bool {
        self.cache
            .read()
            .map(|cache| cache.contains(key))
            .unwrap_or(false)
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Reclaims every expired entry, reporting them to the hook as a batch.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let started = Instant::now();

        let victims: Vec<(K, V)> = match self.cache.write() {
            Ok(mut cache) => {
                let expired_keys: Vec<K> = cache
                    .iter()
                    .filter(|(_, entry)| entry.is_expired())
                    .map(|(key, _)| key.clone())
                    .collect();

                expired_keys
                    .into_iter()
                    .filter_map(|key| {
                        cache.pop(&key).map(|entry| (key, entry.into_value()))
                    })
                    .collect()
            }
            Err(_) => return 0,
        };

        let count = victims.len();
        self.expirations.fetch_add(count as u64, Ordering::Relaxed);

        for (index, (key, value)) in victims.into_iter().enumerate() {
            self.hook.on_evict(&key, value, true, index + 1 == count);
        }

        self.account(started);
        count
    }

    /// Flushes every entry through the hook, used at shutdown.
    ///
    /// The final entry is reported with `last = true` so write-back adapters
    /// get their terminal flush signal even mid-batch.
    pub fn drain(&self) -> usize {
        let started = Instant::now();

        let victims: Vec<(K, V)> = match self.cache.write() {
            Ok(mut cache) => {
                let mut drained = Vec::with_capacity(cache.len());
                while let Some((key, entry)) = cache.pop_lru() {
                    drained.push((key, entry.into_value()));
                }
                drained
            }
            Err(_) => return 0,
        };

        let count = victims.len();
        for (index, (key, value)) in victims.into_iter().enumerate() {
            self.hook.on_evict(&key, value, true, index + 1 == count);
        }

        self.account(started);
        count
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            tries: self.tries.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            cumulative_time_ns: self.op_time_ns.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    /// The configuration this engine was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn account(&self, started: Instant) {
        self.op_time_ns
            .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }
}
