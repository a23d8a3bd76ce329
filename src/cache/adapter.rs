//! Per-entity cache adapters over the generic engine.
//!
//! One `EntityCache` instance exists per entity type. Each wraps a
//! [`CacheEngine`](super::engine::CacheEngine) with get-or-load from the
//! backing store, clone-on-read, and one of two write policies:
//!
//! - **Read-through-invalidate** (users, groups, protocol metadata): writes
//!   go to the store first, then the stale cache entry is removed. A reader
//!   can never observe a hit that predates an in-flight write.
//! - **Write-back** (capture-endpoint counters, geolocation records):
//!   mutations land only in the cache; persistence is deferred to eviction
//!   time and batched through `save_all`.
//!
//! Caching is a performance layer, never a correctness dependency: capacity
//! 0 turns the adapter into a pure pass-through to the store.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cluster::InvalidationBus;

use super::config::{CacheConfig, CacheStats};
use super::engine::{CacheEngine, EvictionHook};

/// An entity with a natural key usable as its cache key
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn cache_key(&self) -> String;
}

/// Backing store failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("backing store failure: {0}")]
    Backend(String),
}

/// Errors surfaced by an entity cache adapter
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent in both the cache and the backing store. Never retried
    /// automatically.
    #[error("'{key}' not found")]
    NotFound { key: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load/save contract the cache consumes; the document-store repositories
/// and the in-memory store implement it.
#[async_trait]
pub trait EntityStore<E>: Send + Sync {
    /// Loads an entity by its natural key
    async fn load(&self, key: &str) -> Result<Option<E>, StoreError>;

    /// Persists one entity
    async fn save(&self, entity: &E) -> Result<(), StoreError>;

    /// Persists a batch of entities
    async fn save_all(&self, entities: &[E]) -> Result<(), StoreError>;
}

/// How writes reach the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Persist first, then drop the stale cache entry
    ReadThroughInvalidate,

    /// Mutate the cache only; persist evicted entries in batches
    WriteBack,
}

/// Evicted-but-dirty entities awaiting a batch flush
struct PendingWrites<E> {
    buffer: Mutex<Vec<E>>,
    flush_due: AtomicBool,
}

impl<E> PendingWrites<E> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            buffer: Mutex::new(Vec::new()),
            flush_due: AtomicBool::new(false),
        })
    }

    fn len(&self) -> usize {
        self.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }
}

/// Eviction hook that buffers victims for write-back persistence.
///
/// Runs inside the engine lock, so it only pushes; the owning adapter does
/// the actual store I/O afterwards.
struct BufferHook<E> {
    pending: Arc<PendingWrites<E>>,
}

impl<E: Cacheable> EvictionHook<String, E> for BufferHook<E> {
    fn on_evict(&self, _key: &String, value: E, _batch: bool, last: bool) {
        if let Ok(mut buffer) = self.pending.buffer.lock() {
            buffer.push(value);
        }
        if last {
            self.pending.flush_due.store(true, Ordering::SeqCst);
        }
    }
}

/// Cache adapter for one entity type.
pub struct EntityCache<E: Cacheable> {
    /// Module id used in logs and bus broadcasts
    name: String,

    /// None when the configured capacity is 0 (adapter disabled)
    engine: Option<CacheEngine<String, E>>,

    store: Arc<dyn EntityStore<E>>,
    bus: Arc<dyn InvalidationBus>,
    policy: WritePolicy,

    pending: Arc<PendingWrites<E>>,
    batch_threshold: usize,
}

/// Default number of dirty entries that triggers a write-back batch flush
pub const DEFAULT_BATCH_THRESHOLD: usize = 2048;

impl<E: Cacheable> EntityCache<E> {
    pub fn new(
        name: impl Into<String>,
        config: CacheConfig,
        policy: WritePolicy,
        store: Arc<dyn EntityStore<E>>,
        bus: Arc<dyn InvalidationBus>,
    ) -> Self {
        let name = name.into();
        let pending = PendingWrites::new();

        let engine = if config.enabled() {
            info!(
                "cache '{}': capacity {}, ttl {:?}, policy {:?}",
                name, config.capacity, config.ttl, policy
            );
            let hook: Arc<dyn EvictionHook<String, E>> = Arc::new(BufferHook {
                pending: Arc::clone(&pending),
            });
            Some(match policy {
                WritePolicy::WriteBack => CacheEngine::with_hook(config, hook),
                WritePolicy::ReadThroughInvalidate => CacheEngine::new(config),
            })
        } else {
            info!("cache '{}': disabled, passing through to the store", name);
            None
        };

        Self {
            name,
            engine,
            store,
            bus,
            policy,
            pending,
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
        }
    }

    /// Overrides the write-back batch flush threshold
    pub fn with_batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold.max(1);
        self
    }

    /// Returns the entity for a key: cache hit, or loaded from the store and
    /// cached. The load blocks the caller; concurrent misses for the same
    /// key may each load, the last insert wins.
    pub async fn get_or_load(&self, key: &str) -> Result<E, CacheError> {
        if let Some(engine) = &self.engine {
            if let Some(value) = engine.get(&key.to_string()) {
                return Ok(value);
            }
        }

        debug!("cache '{}': loading '{}' from the store", self.name, key);
        let entity = self
            .store
            .load(key)
            .await?
            .ok_or_else(|| CacheError::NotFound {
                key: key.to_string(),
            })?;

        if let Some(engine) = &self.engine {
            engine.put(key.to_string(), entity.clone());
            self.flush_pending(false).await;
        }

        Ok(entity)
    }

    /// Cached value for a key, if any; never consults the store
    pub fn cached(&self, key: &str) -> Option<E> {
        self.engine.as_ref()?.get(&key.to_string())
    }

    /// Persists an entity according to the adapter's write policy.
    pub async fn save(&self, entity: &E) -> Result<(), CacheError> {
        let key = entity.cache_key();
        match self.policy {
            WritePolicy::ReadThroughInvalidate => {
                // Store first, invalidate second: a reader racing this write
                // either sees the old entry or misses and reloads the new
                // state, never a resurrected stale copy.
                self.store.save(entity).await?;
                if let Some(engine) = &self.engine {
                    engine.remove(&key, false);
                }
                self.bus.broadcast(&self.name, "flush", &key);
            }
            WritePolicy::WriteBack => match &self.engine {
                Some(engine) => {
                    engine.put(key, entity.clone());
                    self.flush_pending(false).await;
                }
                None => self.store.save(entity).await?,
            },
        }
        Ok(())
    }

    /// Drops a key from the local cache; optionally tells sibling instances
    /// to do the same. Write-back adapters persist the dropped entry.
    pub async fn flush(&self, key: &str, broadcast: bool) {
        if let Some(engine) = &self.engine {
            let persist = self.policy == WritePolicy::WriteBack;
            engine.remove(&key.to_string(), persist);
            if persist {
                self.flush_pending(false).await;
            }
        }
        if broadcast {
            self.bus.broadcast(&self.name, "flush", key);
        }
    }

    /// Reclaims expired entries and flushes any write-back batch that
    /// became due. Called by the maintenance job.
    pub async fn sweep(&self) -> usize {
        let swept = self
            .engine
            .as_ref()
            .map(|engine| engine.sweep_expired())
            .unwrap_or(0);
        self.flush_pending(false).await;
        swept
    }

    /// Empties the cache, persisting every write-back entry. Must run at
    /// shutdown so deferred writes are not silently lost.
    pub async fn drain(&self) -> usize {
        let drained = self
            .engine
            .as_ref()
            .map(|engine| engine.drain())
            .unwrap_or(0);
        self.flush_pending(true).await;
        drained
    }

    /// Pushes the dirty buffer to the store when it is due.
    ///
    /// Due means: forced (shutdown), the engine signalled the end of a bulk
    /// sweep, or the buffer reached the batch threshold. Store failures are
    /// logged and the batch is dropped; there is no retry or dead-letter
    /// path.
    async fn flush_pending(&self, force: bool) {
        if self.policy != WritePolicy::WriteBack {
            return;
        }

        let due = self.pending.flush_due.swap(false, Ordering::SeqCst);
        let batch: Vec<E> = {
            let mut buffer = match self.pending.buffer.lock() {
                Ok(buffer) => buffer,
                Err(_) => return,
            };
            if !force && !due && buffer.len() < self.batch_threshold {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        if batch.is_empty() {
            return;
        }

        debug!(
            "cache '{}': flushing {} write-back entries",
            self.name,
            batch.len()
        );
        if let Err(err) = self.store.save_all(&batch).await {
            warn!(
                "cache '{}': write-back flush of {} entries failed, entries dropped: {}",
                self.name,
                batch.len(),
                err
            );
        }
    }

    /// Counters for scraping; None when the adapter is disabled
    pub fn stats(&self) -> Option<CacheStats> {
        self.engine.as_ref().map(|engine| engine.stats())
    }

    /// One human-readable summary line, rate-limited by the caller
    pub fn log_summary(&self) {
        match &self.engine {
            Some(engine) => {
                let stats = engine.stats();
                info!(
                    "cache '{}': {} entries, {} tries, {} misses ({:.1}% hit), {} evictions, avg op {}ns",
                    self.name,
                    stats.size,
                    stats.tries,
                    stats.misses,
                    stats.hit_rate() * 100.0,
                    stats.evictions,
                    stats.avg_op_time_ns(),
                );
            }
            None => debug!("cache '{}': disabled", self.name),
        }
    }

    /// Module id of this adapter
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether caching is active (capacity > 0)
    pub fn enabled(&self) -> bool {
        self.engine.is_some()
    }

    /// Current entry count
    pub fn len(&self) -> usize {
        self.engine.as_ref().map(|engine| engine.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of dirty entries awaiting a write-back flush
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }
}

/// Type-erased view of an adapter for the maintenance job: TTL sweeps,
/// shutdown drains and the periodic summary log work across entity types.
#[async_trait]
pub trait CacheMaintenance: Send + Sync {
    fn name(&self) -> &str;
    async fn sweep(&self) -> usize;
    async fn drain(&self) -> usize;
    fn stats(&self) -> Option<CacheStats>;
    fn log_summary(&self);
}

#[async_trait]
impl<E: Cacheable> CacheMaintenance for EntityCache<E> {
    fn name(&self) -> &str {
        EntityCache::name(self)
    }

    async fn sweep(&self) -> usize {
        EntityCache::sweep(self).await
    }

    async fn drain(&self) -> usize {
        EntityCache::drain(self).await
    }

    fn stats(&self) -> Option<CacheStats> {
        EntityCache::stats(self)
    }

    fn log_summary(&self) {
        EntityCache::log_summary(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::RecordingBus;
    use crate::db::memory::MemoryStore;
    use crate::models::CaptureEndpoint;
    use crate::models::User;
    use std::time::Duration;

    fn user(login: &str) -> User {
        User::new(login, format!("{}@example.org", login))
    }

    fn rti_cache(store: Arc<MemoryStore<User>>, capacity: usize) -> EntityCache<User> {
        EntityCache::new(
            "users",
            CacheConfig::no_expiration(capacity),
            WritePolicy::ReadThroughInvalidate,
            store,
            RecordingBus::new(),
        )
    }

    #[tokio::test]
    async fn test_get_or_load_populates_from_store() {
        let store = Arc::new(MemoryStore::with_records(vec![user("alice")]));
        let cache = rti_cache(store.clone(), 10);

        let loaded = cache.get_or_load("alice").await.unwrap();
        assert_eq!(loaded.login, "alice");
        assert_eq!(store.load_count(), 1);

        // Second read is a hit, the store is not consulted again
        let again = cache.get_or_load("alice").await.unwrap();
        assert_eq!(again.login, "alice");
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_get_or_load_absent_key_is_not_found() {
        let store = Arc::new(MemoryStore::<User>::new());
        let cache = rti_cache(store, 10);

        let err = cache.get_or_load("ghost").await.unwrap_err();
        assert!(matches!(err, CacheError::NotFound { key } if key == "ghost"));
    }

    #[tokio::test]
    async fn test_read_through_save_persists_then_invalidates() {
        let store = Arc::new(MemoryStore::with_records(vec![user("alice")]));
        let bus = RecordingBus::new();
        let cache = EntityCache::new(
            "users",
            CacheConfig::no_expiration(10),
            WritePolicy::ReadThroughInvalidate,
            store.clone(),
            bus.clone(),
        );

        cache.get_or_load("alice").await.unwrap();
        assert_eq!(cache.len(), 1);

        let updated = user("alice").with_display_name("Alice A.");
        cache.save(&updated).await.unwrap();

        // Entry invalidated, store updated, flush broadcast
        assert_eq!(cache.len(), 0);
        assert_eq!(store.save_count(), 1);
        assert_eq!(
            store.get("alice").unwrap().display_name,
            "Alice A.".to_string()
        );
        assert_eq!(
            bus.messages(),
            vec![("users".to_string(), "flush".to_string(), "alice".to_string())]
        );

        // Next read reloads the new state
        let reloaded = cache.get_or_load("alice").await.unwrap();
        assert_eq!(reloaded.display_name, "Alice A.");
        assert_eq!(store.load_count(), 2);
    }

    #[tokio::test]
    async fn test_write_back_save_touches_only_the_cache() {
        let store = Arc::new(MemoryStore::<CaptureEndpoint>::new());
        let cache = EntityCache::new(
            "endpoints",
            CacheConfig::no_expiration(10),
            WritePolicy::WriteBack,
            store.clone(),
            RecordingBus::new(),
        );

        let mut endpoint = CaptureEndpoint::new("ep-1", "dev-1", "mqtt");
        endpoint.record_capture(64);
        cache.save(&endpoint).await.unwrap();

        assert_eq!(store.save_count(), 0);
        assert_eq!(store.batch_save_count(), 0);
        assert_eq!(cache.cached("ep-1").unwrap().request_count, 1);
    }

    #[tokio::test]
    async fn test_write_back_eviction_batches_until_threshold() {
        let store = Arc::new(MemoryStore::<CaptureEndpoint>::new());
        let cache = EntityCache::new(
            "endpoints",
            CacheConfig::no_expiration(2),
            WritePolicy::WriteBack,
            store.clone(),
            RecordingBus::new(),
        )
        .with_batch_threshold(3);

        // Capacity 2: each save past the second evicts one dirty entry into
        // the pending buffer
        for i in 0..5 {
            let endpoint = CaptureEndpoint::new(format!("ep-{}", i), "dev-1", "mqtt");
            cache.save(&endpoint).await.unwrap();
        }

        // 3 evictions crossed the threshold: one batch flush happened
        assert_eq!(store.batch_save_count(), 1);
        assert_eq!(store.len(), 3);
        assert_eq!(cache.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_drain_persists_every_write_back_entry() {
        let store = Arc::new(MemoryStore::<CaptureEndpoint>::new());
        let cache = EntityCache::new(
            "endpoints",
            CacheConfig::no_expiration(10),
            WritePolicy::WriteBack,
            store.clone(),
            RecordingBus::new(),
        );

        for i in 0..4 {
            let endpoint = CaptureEndpoint::new(format!("ep-{}", i), "dev-1", "mqtt");
            cache.save(&endpoint).await.unwrap();
        }
        assert_eq!(store.len(), 0);

        let drained = cache.drain().await;
        assert_eq!(drained, 4);
        assert_eq!(store.len(), 4);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_expired_write_back_entry_is_persisted_on_sweep() {
        let store = Arc::new(MemoryStore::<CaptureEndpoint>::new());
        let cache = EntityCache::new(
            "endpoints",
            CacheConfig::with_capacity(10).ttl(Duration::from_millis(10)),
            WritePolicy::WriteBack,
            store.clone(),
            RecordingBus::new(),
        );

        let endpoint = CaptureEndpoint::new("ep-1", "dev-1", "mqtt");
        cache.save(&endpoint).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let swept = cache.sweep().await;

        assert_eq!(swept, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_zero_is_a_pure_pass_through() {
        let store = Arc::new(MemoryStore::with_records(vec![user("alice")]));
        let cache = rti_cache(store.clone(), 0);

        assert!(!cache.enabled());
        assert!(cache.stats().is_none());

        cache.get_or_load("alice").await.unwrap();
        cache.get_or_load("alice").await.unwrap();
        assert_eq!(store.load_count(), 2);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_capacity_zero_write_back_saves_directly() {
        let store = Arc::new(MemoryStore::<CaptureEndpoint>::new());
        let cache = EntityCache::new(
            "endpoints",
            CacheConfig::disabled(),
            WritePolicy::WriteBack,
            store.clone(),
            RecordingBus::new(),
        );

        let endpoint = CaptureEndpoint::new("ep-1", "dev-1", "mqtt");
        cache.save(&endpoint).await.unwrap();
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_flush_broadcasts_when_asked() {
        let store = Arc::new(MemoryStore::with_records(vec![user("alice")]));
        let bus = RecordingBus::new();
        let cache = EntityCache::new(
            "users",
            CacheConfig::no_expiration(10),
            WritePolicy::ReadThroughInvalidate,
            store,
            bus.clone(),
        );

        cache.get_or_load("alice").await.unwrap();
        cache.flush("alice", true).await;

        assert_eq!(cache.len(), 0);
        assert_eq!(bus.messages().len(), 1);

        // A flush triggered by a received broadcast stays local
        cache.flush("alice", false).await;
        assert_eq!(bus.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_ttl_expiry_reloads_from_store() {
        let store = Arc::new(MemoryStore::with_records(vec![user("alice")]));
        let cache = EntityCache::new(
            "users",
            CacheConfig::with_capacity(10).ttl(Duration::from_millis(10)),
            WritePolicy::ReadThroughInvalidate,
            store.clone(),
            RecordingBus::new(),
        );

        cache.get_or_load("alice").await.unwrap();
        assert_eq!(store.load_count(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.get_or_load("alice").await.unwrap();
        assert_eq!(store.load_count(), 2);
    }
}
