//! API route definitions.

#![allow(dead_code)]

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, SharedState};

/// Creates the API router with all routes configured
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // API routes
        .nest("/api", api_routes())
        // State
        .with_state(state)
}

/// Platform API routes
fn api_routes() -> Router<SharedState> {
    Router::new()
        // Observability
        .route("/cache/stats", get(handlers::cache_stats))
        // Accounts
        .route("/users", post(handlers::save_user))
        .route("/users/:login", get(handlers::get_user))
        // Groups
        .route("/groups", post(handlers::create_group))
        .route(
            "/groups/:short_id",
            get(handlers::get_group).put(handlers::update_group),
        )
        .route("/groups/:short_id/hierarchy", get(handlers::get_group_hierarchy))
        .route("/groups/:short_id/flush", post(handlers::flush_group))
        // Devices
        .route("/devices/:device_ref", get(handlers::get_device))
        // Capture front door
        .route("/capture/:endpoint_ref", post(handlers::capture))
}

/// Prints all available routes for logging
pub fn print_routes() {
    tracing::info!("Available API routes:");
    tracing::info!("  GET  /health                         - Health check");
    tracing::info!("  GET  /api/cache/stats                - Cache counters");
    tracing::info!("  POST /api/users                      - Create/update account");
    tracing::info!("  GET  /api/users/:login               - Fetch account");
    tracing::info!("  POST /api/groups                     - Create group");
    tracing::info!("  GET  /api/groups/:id                 - Fetch group");
    tracing::info!("  PUT  /api/groups/:id                 - Update group");
    tracing::info!("  GET  /api/groups/:id/hierarchy       - Fetch hierarchy view");
    tracing::info!("  POST /api/groups/:id/flush           - Cascading invalidation");
    tracing::info!("  GET  /api/devices/:ref               - Fetch device");
    tracing::info!("  POST /api/capture/:ref               - Data capture front door");
}
