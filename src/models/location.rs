//! WiFi MAC geolocation records.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::cache::Cacheable;

/// Last known position for a WiFi MAC address.
///
/// High write rate (every observation updates the running average), so these
/// go through a write-back cache like capture endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiMacLocation {
    /// Record id assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,

    /// MAC address, used as the cache key
    pub mac: String,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Position accuracy in meters
    pub accuracy: f64,

    /// Number of observations folded into the position
    pub observation_count: u64,

    /// Timestamp of the last observation
    pub updated_at: DateTime<Utc>,
}

impl WifiMacLocation {
    pub fn new(mac: impl Into<String>, latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            id: None,
            mac: mac.into(),
            latitude,
            longitude,
            accuracy,
            observation_count: 1,
            updated_at: Utc::now(),
        }
    }

    /// Folds a new observation into the running average position
    pub fn observe(&mut self, latitude: f64, longitude: f64, accuracy: f64) {
        let n = self.observation_count as f64;
        self.latitude = (self.latitude * n + latitude) / (n + 1.0);
        self.longitude = (self.longitude * n + longitude) / (n + 1.0);
        self.accuracy = (self.accuracy * n + accuracy) / (n + 1.0);
        self.observation_count += 1;
        self.updated_at = Utc::now();
    }
}

impl Cacheable for WifiMacLocation {
    fn cache_key(&self) -> String {
        self.mac.clone()
    }
}
