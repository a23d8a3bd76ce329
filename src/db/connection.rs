use anyhow::{Context, Result};
use surrealdb::engine::remote::http::{Client, Http};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{info, warn};

/// SurrealDB client handle
pub type DatabaseConnection = Surreal<Client>;

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
}

impl DbConfig {
    /// Loads connection settings from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: std::env::var("SURREAL_URL").unwrap_or_else(|_| "http://localhost:8000".to_string()),
            username: std::env::var("SURREAL_USER").unwrap_or_else(|_| "root".to_string()),
            password: std::env::var("SURREAL_PASS").unwrap_or_else(|_| "root".to_string()),
            namespace: std::env::var("SURREAL_NS").unwrap_or_else(|_| "devicegrid".to_string()),
            database: std::env::var("SURREAL_DB").unwrap_or_else(|_| "platform".to_string()),
        })
    }
}

/// Connects and authenticates against SurrealDB
pub async fn connect_db(config: &DbConfig) -> Result<DatabaseConnection> {
    info!("Connecting to SurrealDB at {}", config.url);

    // Strip the protocol, the engine only wants host:port
    let addr = config
        .url
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_start_matches("ws://")
        .trim_start_matches("wss://");

    let db = Surreal::new::<Http>(addr)
        .await
        .context("Failed to connect to SurrealDB")?;

    db.signin(Root {
        username: &config.username,
        password: &config.password,
    })
    .await
    .context("Failed to authenticate with SurrealDB")?;

    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .context("Failed to select namespace/database")?;

    info!(
        "Connected to SurrealDB: {}/{}",
        config.namespace, config.database
    );

    Ok(db)
}

/// Health check against the database
pub async fn check_connection(db: &DatabaseConnection) -> Result<bool> {
    match db.health().await {
        Ok(_) => Ok(true),
        Err(e) => {
            warn!("Database health check failed: {}", e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env var tests must not interleave
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_db_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        let saved = [
            ("SURREAL_URL", std::env::var("SURREAL_URL").ok()),
            ("SURREAL_NS", std::env::var("SURREAL_NS").ok()),
        ];

        std::env::set_var("SURREAL_URL", "http://testdb:8000");
        std::env::set_var("SURREAL_NS", "testns");

        let config = DbConfig::from_env().unwrap();
        assert_eq!(config.url, "http://testdb:8000");
        assert_eq!(config.namespace, "testns");

        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }

    #[test]
    fn test_db_config_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();

        let saved = [
            ("SURREAL_URL", std::env::var("SURREAL_URL").ok()),
            ("SURREAL_DB", std::env::var("SURREAL_DB").ok()),
        ];

        std::env::remove_var("SURREAL_URL");
        std::env::remove_var("SURREAL_DB");

        let config = DbConfig::from_env().unwrap();
        assert_eq!(config.url, "http://localhost:8000");
        assert_eq!(config.database, "platform");

        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}
