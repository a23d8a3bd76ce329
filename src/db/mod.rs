pub mod connection;
pub mod memory;
pub mod repositories;
pub mod schema;

pub use connection::{check_connection, connect_db, DatabaseConnection, DbConfig};
pub use memory::{MemoryGroupStore, MemoryStore};
pub use repositories::{GroupRepository, Repository, StoredRecord};

use std::sync::Arc;

use crate::cache::{EntityStore, StoreError};
use crate::groups::GroupStore;
use crate::models::{ApiToken, CaptureEndpoint, Device, Protocol, User, WifiMacLocation};

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// One store handle per entity type, injected into the cache adapters.
pub struct PlatformStores {
    pub users: Arc<dyn EntityStore<User>>,
    pub tokens: Arc<dyn EntityStore<ApiToken>>,
    pub devices: Arc<dyn EntityStore<Device>>,
    pub endpoints: Arc<dyn EntityStore<CaptureEndpoint>>,
    pub locations: Arc<dyn EntityStore<WifiMacLocation>>,
    pub protocols: Arc<dyn EntityStore<Protocol>>,
    pub groups: Arc<dyn GroupStore>,
}

impl PlatformStores {
    /// Repositories over a SurrealDB connection
    pub fn surreal(db: DatabaseConnection) -> Self {
        Self {
            users: Arc::new(Repository::<User>::new(db.clone())),
            tokens: Arc::new(Repository::<ApiToken>::new(db.clone())),
            devices: Arc::new(Repository::<Device>::new(db.clone())),
            endpoints: Arc::new(Repository::<CaptureEndpoint>::new(db.clone())),
            locations: Arc::new(Repository::<WifiMacLocation>::new(db.clone())),
            protocols: Arc::new(Repository::<Protocol>::new(db.clone())),
            groups: Arc::new(GroupRepository::new(db)),
        }
    }

    /// In-memory stores, for development and tests
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryStore::<User>::new()),
            tokens: Arc::new(MemoryStore::<ApiToken>::new()),
            devices: Arc::new(MemoryStore::<Device>::new()),
            endpoints: Arc::new(MemoryStore::<CaptureEndpoint>::new()),
            locations: Arc::new(MemoryStore::<WifiMacLocation>::new()),
            protocols: Arc::new(MemoryStore::<Protocol>::new()),
            groups: Arc::new(MemoryGroupStore::new()),
        }
    }
}
