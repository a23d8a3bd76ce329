mod api;
mod cache;
mod cluster;
mod db;
mod groups;
mod models;
mod services;

use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::handlers::AppState;
use crate::db::PlatformStores;
use crate::services::maintenance::{drain_all, MaintenanceConfig, MaintenanceJob};
use crate::services::PlatformConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devicegrid=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting devicegrid platform node...");

    let config = PlatformConfig::from_env();
    let bus = cluster::bus_for(&config.bus);

    // Wire the backing store: SurrealDB by default, in-memory for local
    // development
    let db_mode = std::env::var("DEVICEGRID_DB_MODE").unwrap_or_else(|_| "surreal".to_string());
    let (db, stores) = match db_mode.as_str() {
        "memory" => {
            warn!("Running with the in-memory store; nothing will survive a restart");
            (None, PlatformStores::memory())
        }
        _ => {
            let db_config = db::connection::DbConfig::from_env()?;
            let db = db::connection::connect_db(&db_config).await?;

            if !db::connection::check_connection(&db).await? {
                error!("Database connection check failed");
                return Err(anyhow::anyhow!("Failed to connect to database"));
            }

            db::schema::initialize_schema(&db).await?;
            (Some(db.clone()), PlatformStores::surreal(db))
        }
    };

    let state = Arc::new(AppState::new(config.clone(), db, bus, stores));

    // Background cache housekeeping: TTL sweeps plus the periodic summary
    let maintenance = MaintenanceJob::new(
        state.registry.clone(),
        MaintenanceConfig {
            sweep_interval: config.sweep_interval,
            log_period: config.summary_log_enabled().then_some(config.log_period),
        },
    );
    let _maintenance_handle = maintenance.start();
    info!(
        "Maintenance job started (sweep every {:?})",
        config.sweep_interval
    );

    let app = api::routes::create_router(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    api::routes::print_routes();

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Write-back entries must reach the store before the process exits
    info!("Shutting down, draining caches...");
    let drained = drain_all(&state.registry).await;
    info!("Shutdown complete, {} entries drained", drained);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
}
