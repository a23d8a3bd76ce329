//! Document-store repositories implementing the cache's store contract.

#![allow(dead_code)]

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use surrealdb::sql::Thing;

use crate::cache::{Cacheable, EntityStore, StoreError};
use crate::groups::GroupStore;
use crate::models::{ApiToken, CaptureEndpoint, Device, Group, Protocol, User, WifiMacLocation};

use super::connection::DatabaseConnection;

/// An entity persisted in its own table, addressed by a natural-key field
pub trait StoredRecord: Cacheable + Serialize + DeserializeOwned {
    const TABLE: &'static str;
    const KEY_FIELD: &'static str;

    /// Store-assigned record id, present once persisted
    fn record_id(&self) -> Option<&Thing>;
}

impl StoredRecord for User {
    const TABLE: &'static str = "user";
    const KEY_FIELD: &'static str = "login";

    fn record_id(&self) -> Option<&Thing> {
        self.id.as_ref()
    }
}

impl StoredRecord for ApiToken {
    const TABLE: &'static str = "api_token";
    const KEY_FIELD: &'static str = "token";

    fn record_id(&self) -> Option<&Thing> {
        self.id.as_ref()
    }
}

impl StoredRecord for Group {
    const TABLE: &'static str = "device_group";
    const KEY_FIELD: &'static str = "short_id";

    fn record_id(&self) -> Option<&Thing> {
        self.id.as_ref()
    }
}

impl StoredRecord for Device {
    const TABLE: &'static str = "device";
    const KEY_FIELD: &'static str = "device_ref";

    fn record_id(&self) -> Option<&Thing> {
        self.id.as_ref()
    }
}

impl StoredRecord for CaptureEndpoint {
    const TABLE: &'static str = "endpoint";
    const KEY_FIELD: &'static str = "endpoint_ref";

    fn record_id(&self) -> Option<&Thing> {
        self.id.as_ref()
    }
}

impl StoredRecord for WifiMacLocation {
    const TABLE: &'static str = "location";
    const KEY_FIELD: &'static str = "mac";

    fn record_id(&self) -> Option<&Thing> {
        self.id.as_ref()
    }
}

impl StoredRecord for Protocol {
    const TABLE: &'static str = "protocol";
    const KEY_FIELD: &'static str = "name";

    fn record_id(&self) -> Option<&Thing> {
        self.id.as_ref()
    }
}

/// Repository over one entity table.
///
/// Loads by natural key; saves update the existing record when the entity
/// carries a store id and create a fresh one otherwise.
pub struct Repository<E: StoredRecord> {
    db: DatabaseConnection,
    _marker: PhantomData<fn() -> E>,
}

impl<E: StoredRecord> Repository<E> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E: StoredRecord> EntityStore<E> for Repository<E> {
    async fn load(&self, key: &str) -> Result<Option<E>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = $key LIMIT 1",
            E::TABLE,
            E::KEY_FIELD
        );
        let mut result = self
            .db
            .query(sql)
            .bind(("key", key.to_string()))
            .await?;

        let rows: Vec<E> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn save(&self, entity: &E) -> Result<(), StoreError> {
        match entity.record_id() {
            Some(id) => {
                let _: Option<E> = self.db.update(id.clone()).content(entity.clone()).await?;
            }
            None => {
                let _: Vec<E> = self.db.create(E::TABLE).content(entity.clone()).await?;
            }
        }
        Ok(())
    }

    async fn save_all(&self, entities: &[E]) -> Result<(), StoreError> {
        for entity in entities {
            self.save(entity).await?;
        }
        Ok(())
    }
}

/// Group repository: the generic table access plus the hierarchy query.
pub struct GroupRepository {
    inner: Repository<Group>,
    db: DatabaseConnection,
}

impl GroupRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            inner: Repository::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl EntityStore<Group> for GroupRepository {
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
impl GroupStore for GroupRepository {
    async fn find_hierarchy_rows(&self, head_short_id: &str) -> Result<Vec<Group>, StoreError> {
        let sql =
            "SELECT * FROM device_group WHERE short_id = $head OR referring_groups CONTAINS $head";
        let mut result = self
            .db
            .query(sql)
            .bind(("head", head_short_id.to_string()))
            .await?;

        let rows: Vec<Group> = result.take(0)?;
        Ok(rows)
    }

    async fn short_id_exists(&self, short_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.load(short_id).await?.is_some())
    }
}
