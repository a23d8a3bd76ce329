//! Consistency coordination between the two cached views of the group graph.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{CacheError, EntityCache, EntityStore};
use crate::cluster::InvalidationBus;
use crate::models::{Group, GroupHierarchy, User};

use super::short_id::{random_short_id, ShortIdConfig};
use super::{GroupError, GroupStore, MAX_ATTEMPTS};

/// Module id used in bus broadcasts for group flushes
pub const MODULE_GROUPS: &str = "groups";

/// Orchestrates the single-Group cache and the hierarchy-view cache so a
/// write to a group never leaves either view stale.
///
/// All writes in this process funnel through one coarse lock: group
/// mutation rate is assumed low relative to read rate, so write concurrency
/// is traded for the guarantee that a write and its cascading flush are
/// atomic with respect to other local writers. The lock has no effect
/// across cluster instances; those converge through the invalidation
/// broadcast and per-entry TTL.
pub struct GroupCoordinator {
    groups: Arc<EntityCache<Group>>,
    hierarchies: Arc<EntityCache<GroupHierarchy>>,
    store: Arc<dyn GroupStore>,
    users: Arc<dyn EntityStore<User>>,
    bus: Arc<dyn InvalidationBus>,
    write_lock: Mutex<()>,
    short_ids: ShortIdConfig,
    max_depth: usize,
}

impl GroupCoordinator {
    pub fn new(
        groups: Arc<EntityCache<Group>>,
        hierarchies: Arc<EntityCache<GroupHierarchy>>,
        store: Arc<dyn GroupStore>,
        users: Arc<dyn EntityStore<User>>,
        bus: Arc<dyn InvalidationBus>,
        short_ids: ShortIdConfig,
        max_depth: usize,
    ) -> Self {
        info!(
            "Group coordinator ready: hierarchy depth {}, short ids {} chars",
            max_depth, short_ids.length
        );
        Self {
            groups,
            hierarchies,
            store,
            users,
            bus,
            write_lock: Mutex::new(()),
            short_ids,
            max_depth,
        }
    }

    /// Fetches a group by short id.
    ///
    /// Virtual ids (`user_<login>`) are synthesized fresh from the owning
    /// account on every call and never touch the group caches or store.
    /// For persisted groups the hierarchy cache is warmed as a side effect,
    /// so a follow-up hierarchy read is a hit.
    pub async fn get_by_short_id(&self, short_id: &str) -> Result<Group, GroupError> {
        if let Some(login) = Group::virtual_login(short_id) {
            return self.synthesize_virtual(short_id, login).await;
        }

        let group = self.groups.get_or_load(short_id).await?;

        if let Err(err) = self.hierarchies.get_or_load(short_id).await {
            debug!("hierarchy warm-up for '{}' skipped: {}", short_id, err);
        }

        Ok(group)
    }

    /// Fetches the materialized hierarchy view for a head group.
    pub async fn get_hierarchy(&self, short_id: &str) -> Result<GroupHierarchy, GroupError> {
        if let Some(login) = Group::virtual_login(short_id) {
            let group = self.synthesize_virtual(short_id, login).await?;
            return Ok(GroupHierarchy::single(group, self.max_depth));
        }

        Ok(self.hierarchies.get_or_load(short_id).await?)
    }

    /// Persists a group under the coarse write lock.
    ///
    /// The order is flush-then-persist: the cascading invalidation clears
    /// every cached view the write could make stale, then the store is
    /// updated, then sibling instances are told to do the same. Saving a
    /// virtual group is a silent no-op.
    pub async fn save(&self, group: &Group) -> Result<(), GroupError> {
        if group.is_virtual || Group::is_virtual_id(&group.short_id) {
            debug!("ignoring save of virtual group '{}'", group.short_id);
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        self.invalidate_cascade(&group.short_id).await;
        self.store.save(group).await?;
        self.bus.broadcast(MODULE_GROUPS, "flush", &group.short_id);

        Ok(())
    }

    /// Cascading invalidation for a group id.
    ///
    /// Clears the id and every transitive referrer from both the
    /// single-Group cache and the hierarchy cache. Virtual ids are
    /// structurally excluded (empty back-link set) and return immediately.
    pub async fn flush_group(&self, short_id: &str, broadcast: bool) {
        if Group::is_virtual_id(short_id) {
            return;
        }

        self.invalidate_cascade(short_id).await;

        if broadcast {
            self.bus.broadcast(MODULE_GROUPS, "flush", short_id);
        }
    }

    /// Handles a flush broadcast from a sibling instance: same cascade,
    /// without echoing it back onto the bus.
    pub async fn on_remote_flush(&self, short_id: &str) {
        debug!("remote flush for group '{}'", short_id);
        self.flush_group(short_id, false).await;
    }

    /// Generates a free short id, probing the store for collisions.
    ///
    /// Gives up after a fixed attempt budget instead of looping: a nearly
    /// exhausted id space becomes a visible failure, not a hang.
    pub async fn generate_short_id(&self) -> Result<String, GroupError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let candidate = random_short_id(&self.short_ids);
            if !self.store.short_id_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!("short id '{}' taken (attempt {})", candidate, attempt);
        }
        Err(GroupError::TooManyRetries {
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Walks the back-link graph from `short_id` and drops every collected
    /// id from both caches.
    ///
    /// Referring sets are discovered from cached values only; entries that
    /// are not cached anywhere have nothing stale to clear locally. The
    /// walk keeps a visited set and is bounded by the configured depth, so
    /// cyclic back-link data terminates. This over-invalidates whole
    /// subtrees rather than computing a precise diff.
    async fn invalidate_cascade(&self, short_id: &str) {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(short_id.to_string());

        let mut frontier = vec![short_id.to_string()];
        let mut depth = 0;
        while !frontier.is_empty() && depth < self.max_depth {
            let mut next = Vec::new();
            for id in frontier {
                for referrer in self.referrers_of(&id) {
                    if visited.insert(referrer.clone()) {
                        next.push(referrer);
                    }
                }
            }
            frontier = next;
            depth += 1;
        }

        debug!(
            "cascade flush of '{}' clears {} group(s)",
            short_id,
            visited.len()
        );
        for id in visited {
            self.groups.flush(&id, false).await;
            self.hierarchies.flush(&id, false).await;
        }
    }

    /// Back-link set for an id, read from whichever cache still holds it
    fn referrers_of(&self, short_id: &str) -> Vec<String> {
        if let Some(group) = self.groups.cached(short_id) {
            return group.referring_groups;
        }
        if let Some(view) = self.hierarchies.cached(short_id) {
            return view.head_group().referring_groups.clone();
        }
        Vec::new()
    }

    async fn synthesize_virtual(&self, short_id: &str, login: &str) -> Result<Group, GroupError> {
        let user = self
            .users
            .load(login)
            .await?
            .ok_or_else(|| CacheError::NotFound {
                key: short_id.to_string(),
            })?;
        Ok(Group::virtual_for(&user))
    }

    /// Single-Group cache, for stats scraping and maintenance
    pub fn group_cache(&self) -> &EntityCache<Group> {
        self.groups.as_ref()
    }

    /// Hierarchy-view cache, for stats scraping and maintenance
    pub fn hierarchy_cache(&self) -> &EntityCache<GroupHierarchy> {
        self.hierarchies.as_ref()
    }

    /// TTL sweep over both caches
    pub async fn sweep(&self) -> usize {
        self.groups.sweep().await + self.hierarchies.sweep().await
    }

    /// Drains both caches at shutdown
    pub async fn drain(&self) -> usize {
        self.groups.drain().await + self.hierarchies.drain().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::HierarchyLoader;
    use crate::cache::{CacheConfig, StoreError, WritePolicy};
    use crate::cluster::RecordingBus;
    use crate::db::memory::{MemoryGroupStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn group(short_id: &str, referrers: &[&str]) -> Group {
        Group::new(short_id, short_id, "tester")
            .with_referring_groups(referrers.iter().map(|s| s.to_string()).collect())
    }

    struct Fixture {
        coordinator: GroupCoordinator,
        store: Arc<MemoryGroupStore>,
        users: Arc<MemoryStore<User>>,
        bus: Arc<RecordingBus>,
    }

    fn fixture(groups: Vec<Group>) -> Fixture {
        let store = Arc::new(MemoryGroupStore::with_groups(groups));
        let users = Arc::new(MemoryStore::<User>::new());
        let bus = RecordingBus::new();

        let group_cache = Arc::new(EntityCache::new(
            "groups",
            CacheConfig::no_expiration(100),
            WritePolicy::ReadThroughInvalidate,
            store.clone() as Arc<dyn EntityStore<Group>>,
            bus.clone() as Arc<dyn InvalidationBus>,
        ));
        let hierarchy_cache = Arc::new(EntityCache::new(
            "group-hierarchies",
            CacheConfig::no_expiration(100),
            WritePolicy::ReadThroughInvalidate,
            Arc::new(HierarchyLoader::new(store.clone(), 5)) as Arc<dyn EntityStore<GroupHierarchy>>,
            bus.clone() as Arc<dyn InvalidationBus>,
        ));

        let coordinator = GroupCoordinator::new(
            group_cache,
            hierarchy_cache,
            store.clone(),
            users.clone(),
            bus.clone(),
            ShortIdConfig::default(),
            5,
        );

        Fixture {
            coordinator,
            store,
            users,
            bus,
        }
    }

    #[tokio::test]
    async fn test_get_warms_the_hierarchy_cache() {
        let f = fixture(vec![group("head", &[]), group("leaf", &["head"])]);

        f.coordinator.get_by_short_id("head").await.unwrap();

        let view = f.coordinator.hierarchy_cache().cached("head").unwrap();
        assert_eq!(view.len(), 2);
        assert!(view.contains("leaf"));
    }

    #[tokio::test]
    async fn test_cascade_flush_clears_transitive_referrers() {
        // a <- b <- x: x's write must clear the whole referrer chain
        let f = fixture(vec![
            group("a", &[]),
            group("b", &["a"]),
            group("x", &["b"]),
            group("c", &[]),
        ]);

        for id in ["a", "b", "x", "c"] {
            f.coordinator.get_by_short_id(id).await.unwrap();
        }
        assert!(f.coordinator.group_cache().cached("x").is_some());

        f.coordinator.flush_group("x", false).await;

        for id in ["x", "a", "b"] {
            assert!(f.coordinator.group_cache().cached(id).is_none(), "{}", id);
            assert!(f.coordinator.hierarchy_cache().cached(id).is_none(), "{}", id);
        }
        // The unrelated group still hits
        assert!(f.coordinator.group_cache().cached("c").is_some());
    }

    #[tokio::test]
    async fn test_save_flushes_persists_and_broadcasts() {
        let f = fixture(vec![group("a", &[]), group("x", &["a"])]);

        f.coordinator.get_by_short_id("x").await.unwrap();
        f.coordinator.get_by_short_id("a").await.unwrap();

        let updated = group("x", &["a"]).with_description("updated");
        f.coordinator.save(&updated).await.unwrap();

        assert_eq!(f.store.get("x").unwrap().description, "updated");
        assert!(f.coordinator.group_cache().cached("x").is_none());
        assert!(f.coordinator.group_cache().cached("a").is_none());
        assert!(f
            .bus
            .messages()
            .contains(&("groups".to_string(), "flush".to_string(), "x".to_string())));

        // Next read sees the persisted state
        let reloaded = f.coordinator.get_by_short_id("x").await.unwrap();
        assert_eq!(reloaded.description, "updated");
    }

    #[tokio::test]
    async fn test_virtual_group_bypasses_store_and_caches() {
        let f = fixture(vec![]);
        f.users.insert(User::new("42", "u42@example.org").with_language("fr"));

        let virtual_group = f.coordinator.get_by_short_id("user_42").await.unwrap();

        assert!(virtual_group.is_virtual);
        assert_eq!(virtual_group.language, "fr");
        // The group store was never consulted for the virtual id
        assert_eq!(f.store.load_count(), 0);
        assert!(f.coordinator.group_cache().is_empty());

        // Saving and flushing virtual groups are silent no-ops
        f.coordinator.save(&virtual_group).await.unwrap();
        f.coordinator.flush_group("user_42", true).await;
        assert_eq!(f.store.save_count(), 0);
        assert!(f.bus.messages().is_empty());
    }

    #[tokio::test]
    async fn test_virtual_group_for_missing_user_is_not_found() {
        let f = fixture(vec![]);
        let err = f.coordinator.get_by_short_id("user_ghost").await.unwrap_err();
        assert!(matches!(err, GroupError::Cache(CacheError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_virtual_hierarchy_is_a_single_view() {
        let f = fixture(vec![]);
        f.users.insert(User::new("42", "u42@example.org"));

        let view = f.coordinator.get_hierarchy("user_42").await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.head, "user_42");
        assert!(f.coordinator.hierarchy_cache().is_empty());
    }

    /// Group store whose short ids are all permanently taken
    struct CollidingGroupStore {
        exists_calls: AtomicU64,
    }

    #[async_trait]
    impl EntityStore<Group> for CollidingGroupStore {
        async fn load(&self, _key: &str) -> Result<Option<Group>, StoreError> {
            Ok(None)
        }

        async fn save(&self, _entity: &Group) -> Result<(), StoreError> {
            Ok(())
        }

        async fn save_all(&self, _entities: &[Group]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[async_trait]
    impl GroupStore for CollidingGroupStore {
        async fn find_hierarchy_rows(&self, _head: &str) -> Result<Vec<Group>, StoreError> {
            Ok(Vec::new())
        }

        async fn short_id_exists(&self, _short_id: &str) -> Result<bool, StoreError> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_short_id_generation_gives_up_after_ten_attempts() {
        let store = Arc::new(CollidingGroupStore {
            exists_calls: AtomicU64::new(0),
        });
        let bus = RecordingBus::new();

        let coordinator = GroupCoordinator::new(
            Arc::new(EntityCache::new(
                "groups",
                CacheConfig::disabled(),
                WritePolicy::ReadThroughInvalidate,
                store.clone() as Arc<dyn EntityStore<Group>>,
                bus.clone() as Arc<dyn InvalidationBus>,
            )),
            Arc::new(EntityCache::new(
                "group-hierarchies",
                CacheConfig::disabled(),
                WritePolicy::ReadThroughInvalidate,
                Arc::new(HierarchyLoader::new(store.clone(), 5)) as Arc<dyn EntityStore<GroupHierarchy>>,
                bus.clone() as Arc<dyn InvalidationBus>,
            )),
            store.clone(),
            Arc::new(MemoryStore::<User>::new()),
            bus,
            ShortIdConfig::default(),
            5,
        );

        let err = coordinator.generate_short_id().await.unwrap_err();
        assert!(matches!(err, GroupError::TooManyRetries { attempts: 10 }));
        assert_eq!(store.exists_calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_generate_short_id_returns_free_candidate() {
        let f = fixture(vec![]);
        let id = f.coordinator.generate_short_id().await.unwrap();
        assert_eq!(id.len(), ShortIdConfig::default().length);
        assert!(!Group::is_virtual_id(&id));
    }
}
