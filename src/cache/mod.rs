//! Caching and invalidation layer.
//!
//! This module is the performance core of the platform:
//! - A generic bounded, TTL-expiring engine with an eviction hook
//! - Per-entity adapters with read-through-invalidate or write-back policies
//! - Clone-on-read everywhere: callers never see the cache's own copy
//!
//! # Example
//!
//! ```rust,ignore
//! use devicegrid::cache::{CacheConfig, EntityCache, WritePolicy};
//!
//! let users = EntityCache::new(
//!     "users",
//!     CacheConfig::with_capacity(1000),
//!     WritePolicy::ReadThroughInvalidate,
//!     store,
//!     bus,
//! );
//! let user = users.get_or_load("alice").await?;
//! ```

pub mod adapter;
pub mod config;
pub mod engine;
pub mod entry;

// Re-exports
pub use adapter::{
    Cacheable, CacheError, CacheMaintenance, EntityCache, EntityStore, StoreError, WritePolicy,
    DEFAULT_BATCH_THRESHOLD,
};
pub use config::{CacheConfig, CacheStats};
pub use engine::{CacheEngine, DiscardHook, EvictionHook};
pub use entry::CacheEntry;
