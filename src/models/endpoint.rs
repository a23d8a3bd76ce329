//! Capture endpoint records: the ingestion front door's counters.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::cache::Cacheable;

/// Per-endpoint capture statistics.
///
/// Updated on every inbound capture request, so these records go through a
/// write-back cache: mutations land in memory and are persisted in bulk at
/// eviction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEndpoint {
    /// Record id assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,

    /// Unique endpoint reference, used as the cache key
    pub endpoint_ref: String,

    /// Reference of the device feeding this endpoint
    pub device_ref: String,

    /// Name of the protocol the payloads arrive in
    pub protocol: String,

    /// Total capture requests accepted
    pub request_count: u64,

    /// Total payload bytes accepted
    pub byte_count: u64,

    /// Timestamp of the last accepted capture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_capture_at: Option<DateTime<Utc>>,
}

impl CaptureEndpoint {
    pub fn new(
        endpoint_ref: impl Into<String>,
        device_ref: impl Into<String>,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            endpoint_ref: endpoint_ref.into(),
            device_ref: device_ref.into(),
            protocol: protocol.into(),
            request_count: 0,
            byte_count: 0,
            last_capture_at: None,
        }
    }

    /// Accounts one accepted capture of the given payload size
    pub fn record_capture(&mut self, payload_bytes: u64) {
        self.request_count += 1;
        self.byte_count += payload_bytes;
        self.last_capture_at = Some(Utc::now());
    }
}

impl Cacheable for CaptureEndpoint {
    fn cache_key(&self) -> String {
        self.endpoint_ref.clone()
    }
}
