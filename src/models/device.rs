//! Device records.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::cache::Cacheable;

/// A registered device.
///
/// Keyed by its reference string; belongs to exactly one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Record id assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,

    /// Unique device reference, used as the cache key
    pub device_ref: String,

    /// Human-readable name
    pub name: String,

    /// Short id of the owning group
    pub group_short_id: String,

    /// Name of the protocol the device speaks
    pub protocol: String,

    /// Whether the device is enabled
    pub active: bool,

    /// Timestamp of registration
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last observed message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(
        device_ref: impl Into<String>,
        group_short_id: impl Into<String>,
        protocol: impl Into<String>,
    ) -> Self {
        let device_ref = device_ref.into();
        Self {
            id: None,
            name: device_ref.clone(),
            device_ref,
            group_short_id: group_short_id.into(),
            protocol: protocol.into(),
            active: true,
            created_at: Utc::now(),
            last_seen_at: None,
        }
    }

    /// Marks the device as seen now
    pub fn touch(&mut self) {
        self.last_seen_at = Some(Utc::now());
    }
}

impl Cacheable for Device {
    fn cache_key(&self) -> String {
        self.device_ref.clone()
    }
}
