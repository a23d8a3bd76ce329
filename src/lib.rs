//! devicegrid: IoT platform backend node.
//!
//! Accounts, group hierarchies, device records and a data-capture front
//! door, backed by a document store and exposed over HTTP. The caching and
//! invalidation layer in [`cache`] and [`groups`] carries the interesting
//! invariants; everything else is plumbing around it.

#![allow(dead_code)]

pub mod api;
pub mod cache;
pub mod cluster;
pub mod db;
pub mod groups;
pub mod models;
pub mod services;

// Main re-exports
pub use cache::{
    CacheConfig, CacheEngine, CacheError, CacheStats, Cacheable, EntityCache, EntityStore,
    EvictionHook, StoreError, WritePolicy,
};
pub use cluster::{bus_for, InvalidationBus, NoopBus};
pub use db::connection::{DatabaseConnection, DbConfig};
pub use db::PlatformStores;
pub use groups::{GroupCoordinator, GroupError, GroupStore, ShortIdConfig};
pub use models::{
    ApiToken, CaptureEndpoint, Device, Group, GroupHierarchy, Protocol, User, WifiMacLocation,
};
pub use services::{PlatformConfig, MaintenanceConfig, MaintenanceJob};
