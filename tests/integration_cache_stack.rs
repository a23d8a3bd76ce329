//! End-to-end tests over the cache stack: adapters, coordinator and
//! maintenance wired together over in-memory stores, the way `main` wires
//! them over SurrealDB.

use std::sync::Arc;
use std::time::Duration;

use devicegrid::cache::{CacheConfig, CacheMaintenance, EntityCache, EntityStore, WritePolicy};
use devicegrid::cluster::RecordingBus;
use devicegrid::db::memory::{MemoryGroupStore, MemoryStore};
use devicegrid::groups::{GroupCoordinator, HierarchyLoader, ShortIdConfig};
use devicegrid::models::{CaptureEndpoint, Group, GroupHierarchy, User};
use devicegrid::services::maintenance::drain_all;

fn group(short_id: &str, referrers: &[&str]) -> Group {
    Group::new(short_id, short_id, "tester")
        .with_referring_groups(referrers.iter().map(|s| s.to_string()).collect())
}

struct Stack {
    coordinator: GroupCoordinator,
    group_store: Arc<MemoryGroupStore>,
    user_store: Arc<MemoryStore<User>>,
    bus: Arc<RecordingBus>,
}

fn stack(groups: Vec<Group>, group_config: CacheConfig) -> Stack {
    let group_store = Arc::new(MemoryGroupStore::with_groups(groups));
    let user_store = Arc::new(MemoryStore::<User>::new());
    let bus = RecordingBus::new();

    let group_cache = Arc::new(EntityCache::new(
        "groups",
        group_config.clone(),
        WritePolicy::ReadThroughInvalidate,
        group_store.clone() as Arc<dyn EntityStore<Group>>,
        bus.clone(),
    ));
    let hierarchy_cache = Arc::new(EntityCache::new(
        "group-hierarchies",
        group_config,
        WritePolicy::ReadThroughInvalidate,
        Arc::new(HierarchyLoader::new(group_store.clone(), 8))
            as Arc<dyn EntityStore<GroupHierarchy>>,
        bus.clone(),
    ));

    let coordinator = GroupCoordinator::new(
        group_cache,
        hierarchy_cache,
        group_store.clone(),
        user_store.clone(),
        bus.clone(),
        ShortIdConfig::default(),
        8,
    );

    Stack {
        coordinator,
        group_store,
        user_store,
        bus,
    }
}

#[tokio::test]
async fn group_lifecycle_keeps_both_views_consistent() {
    // root <- floor <- room, one sibling elsewhere
    let s = stack(
        vec![
            group("root", &[]),
            group("floor", &["root"]),
            group("room", &["root", "floor"]),
            group("other", &[]),
        ],
        CacheConfig::no_expiration(100),
    );

    // Warm every view
    for id in ["root", "floor", "room", "other"] {
        s.coordinator.get_by_short_id(id).await.unwrap();
    }
    let warm_loads = s.group_store.load_count();

    let root_view = s.coordinator.get_hierarchy("root").await.unwrap();
    assert_eq!(root_view.len(), 3);
    assert!(root_view.contains("room"));

    // Update the room; the cascade must clear room, floor and root in both
    // caches, but leave the unrelated sibling warm
    let mut room = s.coordinator.get_by_short_id("room").await.unwrap();
    room.name = "room 101".to_string();
    s.coordinator.save(&room).await.unwrap();

    assert!(s.coordinator.group_cache().cached("room").is_none());
    assert!(s.coordinator.group_cache().cached("floor").is_none());
    assert!(s.coordinator.group_cache().cached("root").is_none());
    assert!(s.coordinator.hierarchy_cache().cached("root").is_none());
    assert!(s.coordinator.group_cache().cached("other").is_some());

    // Reads after the write observe the new state in both views
    let reloaded = s.coordinator.get_by_short_id("room").await.unwrap();
    assert_eq!(reloaded.name, "room 101");
    assert!(s.group_store.load_count() > warm_loads);

    let fresh_view = s.coordinator.get_hierarchy("root").await.unwrap();
    assert_eq!(fresh_view.get("room").unwrap().name, "room 101");

    // The write announced itself to sibling instances exactly once
    let flushes: Vec<_> = s
        .bus
        .messages()
        .into_iter()
        .filter(|(module, action, payload)| {
            module == "groups" && action == "flush" && payload == "room"
        })
        .collect();
    assert_eq!(flushes.len(), 1);
}

#[tokio::test]
async fn virtual_groups_never_reach_store_or_cache() {
    let s = stack(vec![], CacheConfig::no_expiration(100));
    s.user_store
        .insert(User::new("42", "u42@example.org").with_language("de"));

    let virtual_group = s.coordinator.get_by_short_id("user_42").await.unwrap();
    assert!(virtual_group.is_virtual);
    assert_eq!(virtual_group.language, "de");

    // Synthesized fresh on every call, never cached, never persisted
    s.coordinator.get_by_short_id("user_42").await.unwrap();
    assert_eq!(s.group_store.load_count(), 0);
    assert_eq!(s.group_store.save_count(), 0);
    assert!(s.coordinator.group_cache().is_empty());

    s.coordinator.save(&virtual_group).await.unwrap();
    assert_eq!(s.group_store.save_count(), 0);
}

#[tokio::test]
async fn disabled_group_caches_still_serve_consistent_reads() {
    let s = stack(
        vec![group("root", &[]), group("leaf", &["root"])],
        CacheConfig::disabled(),
    );

    let leaf = s.coordinator.get_by_short_id("leaf").await.unwrap();
    assert_eq!(leaf.short_id, "leaf");

    let view = s.coordinator.get_hierarchy("root").await.unwrap();
    assert_eq!(view.len(), 2);

    // Every read goes to the store; flushing is harmless
    s.coordinator.flush_group("root", false).await;
    let view_again = s.coordinator.get_hierarchy("root").await.unwrap();
    assert_eq!(view_again.len(), 2);
}

#[tokio::test]
async fn capture_counters_survive_eviction_and_shutdown() {
    let store = Arc::new(MemoryStore::<CaptureEndpoint>::new());
    let endpoints = Arc::new(
        EntityCache::new(
            "endpoints",
            CacheConfig::no_expiration(2),
            WritePolicy::WriteBack,
            store.clone() as Arc<dyn EntityStore<CaptureEndpoint>>,
            RecordingBus::new(),
        )
        .with_batch_threshold(100),
    );

    // Three hot endpoints through a capacity-2 cache: one gets evicted into
    // the dirty buffer, nothing reaches the store yet
    for i in 0..3 {
        let mut endpoint = CaptureEndpoint::new(format!("ep-{}", i), "dev-1", "mqtt");
        endpoint.record_capture(100);
        endpoints.save(&endpoint).await.unwrap();
    }
    assert_eq!(store.len(), 0);
    assert_eq!(endpoints.pending_writes(), 1);

    // Shutdown drain persists the cached and the buffered entries alike
    let registry: Vec<Arc<dyn CacheMaintenance>> = vec![endpoints.clone()];
    drain_all(&registry).await;

    assert_eq!(store.len(), 3);
    for i in 0..3 {
        let persisted = store.get(&format!("ep-{}", i)).unwrap();
        assert_eq!(persisted.request_count, 1);
        assert_eq!(persisted.byte_count, 100);
    }
}

#[tokio::test]
async fn bounded_cache_follows_the_documented_eviction_example() {
    // Capacity 2, TTL 60s: put A, put B, put C evicts A; A then reloads
    let store = Arc::new(MemoryStore::with_records(vec![
        User::new("a", "a@example.org"),
        User::new("b", "b@example.org"),
        User::new("c", "c@example.org"),
    ]));
    let cache = EntityCache::new(
        "users",
        CacheConfig::with_capacity(2).ttl(Duration::from_secs(60)),
        WritePolicy::ReadThroughInvalidate,
        store.clone() as Arc<dyn EntityStore<User>>,
        RecordingBus::new(),
    );

    cache.get_or_load("a").await.unwrap();
    cache.get_or_load("b").await.unwrap();
    assert_eq!(cache.len(), 2);

    cache.get_or_load("c").await.unwrap();
    assert_eq!(cache.len(), 2);

    let stats = cache.stats().unwrap();
    assert_eq!(stats.evictions, 1);

    // A is gone and reloads from the store
    let loads_before = store.load_count();
    cache.get_or_load("a").await.unwrap();
    assert_eq!(store.load_count(), loads_before + 1);
}
