//! API request handlers.
//!
//! Deliberately thin: every read goes through an entity cache adapter,
//! every group write through the consistency coordinator. Routing depth,
//! authentication flows and payload decoding live outside this crate.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use tracing::debug;

use crate::cache::{CacheError, CacheMaintenance, EntityCache};
use crate::db::connection::DatabaseConnection;
use crate::groups::GroupCoordinator;
use crate::models::{
    ApiToken, CaptureEndpoint, Device, Group, Protocol, User, WifiMacLocation,
};
use crate::services::PlatformConfig;

use super::error::{ApiError, ApiResult};
use super::types::*;

/// Header carrying the API token on capture requests
pub const TOKEN_HEADER: &str = "x-api-token";

/// Application state shared across handlers
pub struct AppState {
    /// Database connection; None in memory mode
    pub db: Option<DatabaseConnection>,

    pub users: Arc<EntityCache<User>>,
    pub tokens: Arc<EntityCache<ApiToken>>,
    pub devices: Arc<EntityCache<Device>>,
    pub endpoints: Arc<EntityCache<CaptureEndpoint>>,
    pub locations: Arc<EntityCache<WifiMacLocation>>,
    pub protocols: Arc<EntityCache<Protocol>>,

    pub coordinator: Arc<GroupCoordinator>,

    /// Every adapter, for stats scraping and maintenance
    pub registry: Vec<Arc<dyn CacheMaintenance>>,

    pub config: PlatformConfig,
}

/// Thread-safe shared state
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wires every cache adapter and the group coordinator over the given
    /// stores and bus.
    pub fn new(
        config: PlatformConfig,
        db: Option<DatabaseConnection>,
        bus: Arc<dyn crate::cluster::InvalidationBus>,
        stores: crate::db::PlatformStores,
    ) -> Self {
        use crate::cache::WritePolicy;
        use crate::groups::HierarchyLoader;

        // The coordinator synthesizes virtual groups straight from the user
        // store, bypassing the user cache
        let user_store = stores.users.clone();

        let users = Arc::new(EntityCache::new(
            "users",
            config.users_cache.clone(),
            WritePolicy::ReadThroughInvalidate,
            stores.users,
            bus.clone(),
        ));
        let tokens = Arc::new(EntityCache::new(
            "tokens",
            config.tokens_cache.clone(),
            WritePolicy::ReadThroughInvalidate,
            stores.tokens,
            bus.clone(),
        ));
        let devices = Arc::new(EntityCache::new(
            "devices",
            config.devices_cache.clone(),
            WritePolicy::ReadThroughInvalidate,
            stores.devices,
            bus.clone(),
        ));
        let endpoints = Arc::new(
            EntityCache::new(
                "endpoints",
                config.endpoints_cache.clone(),
                WritePolicy::WriteBack,
                stores.endpoints,
                bus.clone(),
            )
            .with_batch_threshold(config.batch_threshold),
        );
        let locations = Arc::new(
            EntityCache::new(
                "locations",
                config.locations_cache.clone(),
                WritePolicy::WriteBack,
                stores.locations,
                bus.clone(),
            )
            .with_batch_threshold(config.batch_threshold),
        );
        let protocols = Arc::new(EntityCache::new(
            "protocols",
            config.protocols_cache.clone(),
            WritePolicy::ReadThroughInvalidate,
            stores.protocols,
            bus.clone(),
        ));

        let group_entity_store: Arc<dyn crate::cache::EntityStore<Group>> = stores.groups.clone();
        let groups = Arc::new(EntityCache::new(
            "groups",
            config.groups_cache.clone(),
            WritePolicy::ReadThroughInvalidate,
            group_entity_store,
            bus.clone(),
        ));
        let hierarchies = Arc::new(EntityCache::new(
            "group-hierarchies",
            config.hierarchies_cache.clone(),
            WritePolicy::ReadThroughInvalidate,
            Arc::new(HierarchyLoader::new(
                stores.groups.clone(),
                config.hierarchy_max_depth,
            )) as Arc<dyn crate::cache::EntityStore<crate::models::GroupHierarchy>>,
            bus.clone(),
        ));

        let registry: Vec<Arc<dyn CacheMaintenance>> = vec![
            users.clone(),
            tokens.clone(),
            devices.clone(),
            endpoints.clone(),
            locations.clone(),
            protocols.clone(),
            groups.clone(),
            hierarchies.clone(),
        ];

        let coordinator = Arc::new(GroupCoordinator::new(
            groups,
            hierarchies,
            stores.groups,
            user_store,
            bus,
            config.short_ids.clone(),
            config.hierarchy_max_depth,
        ));

        Self {
            db,
            users,
            tokens,
            devices,
            endpoints,
            locations,
            protocols,
            coordinator,
            registry,
            config,
        }
    }
}

// ============================================================================
// Health and observability
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let db_healthy = match &state.db {
        Some(db) => crate::db::connection::check_connection(db)
            .await
            .unwrap_or(false),
        None => true,
    };

    let status = if db_healthy { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        service: "devicegrid".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents {
            database: db_healthy,
            cache: true,
        },
    })
}

/// Per-adapter counters for external scraping
pub async fn cache_stats(State(state): State<SharedState>) -> Json<CacheStatsResponse> {
    let caches = state
        .registry
        .iter()
        .map(|cache| {
            let stats = cache.stats();
            let hit_rate = stats.as_ref().map(|s| s.hit_rate()).unwrap_or(0.0);
            CacheStatsEntry {
                name: cache.name().to_string(),
                stats,
                hit_rate,
            }
        })
        .collect();

    Json(CacheStatsResponse { caches })
}

// ============================================================================
// Accounts
// ============================================================================

/// Fetches an account by login
pub async fn get_user(
    State(state): State<SharedState>,
    Path(login): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state.users.get_or_load(&login).await?;
    Ok(Json(user))
}

/// Creates or updates an account
pub async fn save_user(
    State(state): State<SharedState>,
    Json(request): Json<SaveUserRequest>,
) -> ApiResult<Json<User>> {
    if request.login.is_empty() {
        return Err(ApiError::BadRequest("login must not be empty".to_string()));
    }

    let user = match state.users.get_or_load(&request.login).await {
        Ok(mut existing) => {
            existing.email = request.email;
            if let Some(name) = request.display_name {
                existing.display_name = name;
            }
            if let Some(language) = request.language {
                existing.language = language;
            }
            if let Some(active) = request.active {
                existing.active = active;
            }
            existing
        }
        Err(CacheError::NotFound { .. }) => {
            let mut user = User::new(request.login, request.email);
            if let Some(name) = request.display_name {
                user.display_name = name;
            }
            if let Some(language) = request.language {
                user.language = language;
            }
            if let Some(active) = request.active {
                user.active = active;
            }
            user
        }
        Err(err) => return Err(err.into()),
    };

    state.users.save(&user).await?;
    Ok(Json(user))
}

// ============================================================================
// Groups
// ============================================================================

/// Fetches a group by short id; `user_<login>` ids resolve to virtual groups
pub async fn get_group(
    State(state): State<SharedState>,
    Path(short_id): Path<String>,
) -> ApiResult<Json<Group>> {
    let group = state.coordinator.get_by_short_id(&short_id).await?;
    Ok(Json(group))
}

/// Fetches the materialized hierarchy view for a group
pub async fn get_group_hierarchy(
    State(state): State<SharedState>,
    Path(short_id): Path<String>,
) -> ApiResult<Json<crate::models::GroupHierarchy>> {
    let view = state.coordinator.get_hierarchy(&short_id).await?;
    Ok(Json(view))
}

/// Creates a group, generating a fresh short id
pub async fn create_group(
    State(state): State<SharedState>,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<Json<CreateGroupResponse>> {
    if request.name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    // The new group's back-link set is its parent plus the parent's own
    // referrers, keeping the denormalized index transitive
    let referring_groups = match &request.parent {
        Some(parent) => {
            let parent_group = state.coordinator.get_by_short_id(parent).await?;
            if parent_group.is_virtual {
                return Err(ApiError::BadRequest(
                    "virtual groups cannot have children".to_string(),
                ));
            }
            let mut referrers = parent_group.referring_groups;
            referrers.push(parent_group.short_id);
            referrers
        }
        None => Vec::new(),
    };

    let short_id = state.coordinator.generate_short_id().await?;
    let mut group = Group::new(short_id.clone(), request.name, request.created_by)
        .with_referring_groups(referring_groups);
    if let Some(description) = request.description {
        group.description = description;
    }
    if let Some(language) = request.language {
        group.language = language;
    }
    if let Some(attributes) = request.attributes {
        group.attributes = attributes;
    }

    state.coordinator.save(&group).await?;
    Ok(Json(CreateGroupResponse {
        success: true,
        short_id,
    }))
}

/// Updates a group through the coordinator
pub async fn update_group(
    State(state): State<SharedState>,
    Path(short_id): Path<String>,
    Json(request): Json<UpdateGroupRequest>,
) -> ApiResult<Json<Group>> {
    let mut group = state.coordinator.get_by_short_id(&short_id).await?;
    if group.is_virtual {
        return Err(ApiError::BadRequest(
            "virtual groups cannot be updated".to_string(),
        ));
    }

    if let Some(name) = request.name {
        group.name = name;
    }
    if let Some(description) = request.description {
        group.description = description;
    }
    if let Some(language) = request.language {
        group.language = language;
    }
    if let Some(active) = request.active {
        group.active = active;
    }
    if let Some(attributes) = request.attributes {
        group.attributes = attributes;
    }

    state.coordinator.save(&group).await?;
    Ok(Json(group))
}

/// Explicit cascading invalidation, broadcast to sibling instances
pub async fn flush_group(
    State(state): State<SharedState>,
    Path(short_id): Path<String>,
) -> ApiResult<Json<FlushResponse>> {
    state.coordinator.flush_group(&short_id, true).await;
    Ok(Json(FlushResponse { success: true }))
}

// ============================================================================
// Devices
// ============================================================================

/// Fetches a device by reference
pub async fn get_device(
    State(state): State<SharedState>,
    Path(device_ref): Path<String>,
) -> ApiResult<Json<Device>> {
    let device = state.devices.get_or_load(&device_ref).await?;
    Ok(Json(device))
}

// ============================================================================
// Capture front door
// ============================================================================

/// Accepts a capture request for an endpoint.
///
/// The token is resolved through the token cache, the endpoint counters are
/// updated write-back, and any riding WiFi observation lands in the
/// geolocation write-back cache. The payload itself stays opaque.
pub async fn capture(
    State(state): State<SharedState>,
    Path(endpoint_ref): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CaptureRequest>,
) -> ApiResult<Json<CaptureResponse>> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing api token".to_string()))?;

    state
        .tokens
        .get_or_load(token)
        .await
        .map_err(|_| ApiError::Unauthorized("unknown api token".to_string()))?;

    let mut endpoint = state.endpoints.get_or_load(&endpoint_ref).await?;

    let protocol = state.protocols.get_or_load(&endpoint.protocol).await?;
    if !protocol.active {
        return Err(ApiError::BadRequest(format!(
            "protocol '{}' is disabled",
            protocol.name
        )));
    }

    endpoint.record_capture(request.payload.len() as u64);
    state.endpoints.save(&endpoint).await?;

    if let Some(observation) = request.wifi {
        record_wifi_observation(&state, observation).await?;
    }

    debug!(
        "capture accepted for '{}': {} requests so far",
        endpoint_ref, endpoint.request_count
    );
    Ok(Json(CaptureResponse {
        success: true,
        request_count: endpoint.request_count,
        byte_count: endpoint.byte_count,
    }))
}

async fn record_wifi_observation(
    state: &AppState,
    observation: WifiObservation,
) -> ApiResult<()> {
    let location = match state.locations.get_or_load(&observation.mac).await {
        Ok(mut existing) => {
            existing.observe(
                observation.latitude,
                observation.longitude,
                observation.accuracy,
            );
            existing
        }
        Err(CacheError::NotFound { .. }) => WifiMacLocation::new(
            observation.mac,
            observation.latitude,
            observation.longitude,
            observation.accuracy,
        ),
        Err(err) => return Err(err.into()),
    };

    state.locations.save(&location).await?;
    Ok(())
}
