//! In-memory store implementation.
//!
//! Backs the `memory` database mode and the test suites; counts every call
//! so tests can assert exactly when the backing store was consulted.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::cache::{Cacheable, EntityStore, StoreError};
use crate::groups::GroupStore;
use crate::models::Group;

/// In-memory entity store keyed by the entity's cache key.
pub struct MemoryStore<E: Cacheable> {
    records: RwLock<HashMap<String, E>>,
    loads: AtomicU64,
    saves: AtomicU64,
    batch_saves: AtomicU64,
}

impl<E: Cacheable> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            loads: AtomicU64::new(0),
            saves: AtomicU64::new(0),
            batch_saves: AtomicU64::new(0),
        }
    }

    /// Creates a store pre-seeded with records
    pub fn with_records(records: Vec<E>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.records.write() {
            for record in records {
                map.insert(record.cache_key(), record);
            }
        }
        store
    }

    /// Inserts a record directly, bypassing the counters
    pub fn insert(&self, record: E) {
        if let Ok(mut map) = self.records.write() {
            map.insert(record.cache_key(), record);
        }
    }

    /// Reads a record directly, bypassing the counters
    pub fn get(&self, key: &str) -> Option<E> {
        self.records.read().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `load` calls served
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Number of single `save` calls served
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    /// Number of `save_all` calls served
    pub fn batch_save_count(&self) -> u64 {
        self.batch_saves.load(Ordering::Relaxed)
    }
}

impl<E: Cacheable> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Cacheable> EntityStore<E> for MemoryStore<E> {
    async fn load(&self, key: &str) -> Result<Option<E>, StoreError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.records.read().ok().and_then(|map| map.get(key).cloned()))
    }

    async fn save(&self, entity: &E) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::Relaxed);
        self.insert(entity.clone());
        Ok(())
    }

    async fn save_all(&self, entities: &[E]) -> Result<(), StoreError> {
        self.batch_saves.fetch_add(1, Ordering::Relaxed);
        for entity in entities {
            self.insert(entity.clone());
        }
        Ok(())
    }
}

/// In-memory group store with the hierarchy query.
pub struct MemoryGroupStore {
    inner: MemoryStore<Group>,
    exists_checks: AtomicU64,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            exists_checks: AtomicU64::new(0),
        }
    }

    pub fn with_groups(groups: Vec<Group>) -> Self {
        Self {
            inner: MemoryStore::with_records(groups),
            exists_checks: AtomicU64::new(0),
        }
    }

    pub fn insert(&self, group: Group) {
        self.inner.insert(group);
    }

    pub fn get(&self, short_id: &str) -> Option<Group> {
        self.inner.get(short_id)
    }

    pub fn load_count(&self) -> u64 {
        self.inner.load_count()
    }

    pub fn save_count(&self) -> u64 {
        self.inner.save_count()
    }

    /// Number of `short_id_exists` calls served
    pub fn exists_check_count(&self) -> u64 {
        self.exists_checks.load(Ordering::Relaxed)
    }
}

impl Default for MemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore<Group> for MemoryGroupStore {
    async fn load(&self, key: &str) -> Result<Option<Group>, StoreError> {
        self.inner.load(key).await
    }

    async fn save(&self, entity: &Group) -> Result<(), StoreError> {
        self.inner.save(entity).await
    }

    async fn save_all(&self, entities: &[Group]) -> Result<(), StoreError> {
        self.inner.save_all(entities).await
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn find_hierarchy_rows(&self, head_short_id: &str) -> Result<Vec<Group>, StoreError> {
        let rows = self
            .inner
            .records
            .read()
            .map(|map| {
                map.values()
                    .filter(|group| {
                        group.short_id == head_short_id
                            || group
                                .referring_groups
                                .iter()
                                .any(|r| r == head_short_id)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn short_id_exists(&self, short_id: &str) -> Result<bool, StoreError> {
        self.exists_checks.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .inner
            .records
            .read()
            .map(|map| map.contains_key(short_id))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    #[tokio::test]
    async fn test_memory_store_counts_calls() {
        let store = MemoryStore::with_records(vec![User::new("alice", "alice@example.org")]);

        assert!(store.load("alice").await.unwrap().is_some());
        assert!(store.load("bob").await.unwrap().is_none());
        assert_eq!(store.load_count(), 2);

        store.save(&User::new("bob", "bob@example.org")).await.unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_group_store_hierarchy_query() {
        let head = Group::new("head", "head", "tester");
        let child = Group::new("child", "child", "tester")
            .with_referring_groups(vec!["head".to_string()]);
        let other = Group::new("other", "other", "tester");

        let store = MemoryGroupStore::with_groups(vec![head, child, other]);
        let rows = store.find_hierarchy_rows("head").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert!(store.short_id_exists("other").await.unwrap());
        assert!(!store.short_id_exists("missing").await.unwrap());
    }
}
