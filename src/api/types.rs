//! API request/response types.

#![allow(dead_code)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;

// ============================================================================
// Health Check
// ============================================================================

/// Health check response
#[derive(Serialize, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub components: HealthComponents,
}

/// Health status of individual components
#[derive(Serialize, Clone)]
pub struct HealthComponents {
    pub database: bool,
    pub cache: bool,
}

// ============================================================================
// Cache stats
// ============================================================================

/// Counters for one cache adapter
#[derive(Serialize)]
pub struct CacheStatsEntry {
    pub name: String,

    /// None when the cache is disabled (capacity 0)
    pub stats: Option<CacheStats>,

    pub hit_rate: f64,
}

/// Scraping surface: one entry per adapter
#[derive(Serialize)]
pub struct CacheStatsResponse {
    pub caches: Vec<CacheStatsEntry>,
}

// ============================================================================
// Accounts
// ============================================================================

/// Request to create or update an account
#[derive(Deserialize)]
pub struct SaveUserRequest {
    pub login: String,
    pub email: String,
    pub display_name: Option<String>,
    pub language: Option<String>,
    pub active: Option<bool>,
}

// ============================================================================
// Groups
// ============================================================================

/// Request to create a group
#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub created_by: String,

    /// Short id of the parent group, if any
    pub parent: Option<String>,

    pub attributes: Option<HashMap<String, String>>,
}

/// Response after creating a group
#[derive(Serialize)]
pub struct CreateGroupResponse {
    pub success: bool,
    pub short_id: String,
}

/// Request to update a group
#[derive(Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub active: Option<bool>,
    pub attributes: Option<HashMap<String, String>>,
}

/// Response after a flush
#[derive(Serialize)]
pub struct FlushResponse {
    pub success: bool,
}

// ============================================================================
// Capture front door
// ============================================================================

/// Inbound capture request.
///
/// The payload is opaque to this service; only its length is accounted.
#[derive(Deserialize)]
pub struct CaptureRequest {
    /// Opaque payload as delivered by the device
    pub payload: String,

    /// Optional WiFi observation riding along with the payload
    pub wifi: Option<WifiObservation>,
}

/// A single WiFi position observation
#[derive(Deserialize)]
pub struct WifiObservation {
    pub mac: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

/// Response to a capture request
#[derive(Serialize)]
pub struct CaptureResponse {
    pub success: bool,
    pub request_count: u64,
    pub byte_count: u64,
}
