use anyhow::{Context, Result};
use tracing::info;

use super::connection::DatabaseConnection;

/// Initializes tables and indexes
pub async fn initialize_schema(db: &DatabaseConnection) -> Result<()> {
    info!("Initializing database schema...");

    define_account_tables(db).await?;
    define_group_table(db).await?;
    define_device_tables(db).await?;

    info!("Database schema initialized");
    Ok(())
}

/// Accounts and API tokens
async fn define_account_tables(db: &DatabaseConnection) -> Result<()> {
    let query = r#"
        DEFINE TABLE user SCHEMAFULL;

        DEFINE FIELD login ON TABLE user TYPE string;
        DEFINE FIELD email ON TABLE user TYPE string;
        DEFINE FIELD display_name ON TABLE user TYPE string;
        DEFINE FIELD language ON TABLE user TYPE string;
        DEFINE FIELD active ON TABLE user TYPE bool;
        DEFINE FIELD created_at ON TABLE user TYPE datetime;

        DEFINE INDEX idx_user_login ON TABLE user COLUMNS login UNIQUE;

        DEFINE TABLE api_token SCHEMAFULL;

        DEFINE FIELD token ON TABLE api_token TYPE string;
        DEFINE FIELD login ON TABLE api_token TYPE string;
        DEFINE FIELD label ON TABLE api_token TYPE string;
        DEFINE FIELD created_at ON TABLE api_token TYPE datetime;

        DEFINE INDEX idx_token ON TABLE api_token COLUMNS token UNIQUE;
        DEFINE INDEX idx_token_login ON TABLE api_token COLUMNS login;
    "#;

    db.query(query)
        .await
        .context("Failed to define account tables")?;
    Ok(())
}

/// Groups and their back-link index
async fn define_group_table(db: &DatabaseConnection) -> Result<()> {
    let query = r#"
        DEFINE TABLE device_group SCHEMAFULL;

        DEFINE FIELD short_id ON TABLE device_group TYPE string;
        DEFINE FIELD name ON TABLE device_group TYPE string;
        DEFINE FIELD description ON TABLE device_group TYPE string;
        DEFINE FIELD language ON TABLE device_group TYPE string;
        DEFINE FIELD active ON TABLE device_group TYPE bool;
        DEFINE FIELD virtual ON TABLE device_group TYPE bool;
        DEFINE FIELD created_at ON TABLE device_group TYPE datetime;
        DEFINE FIELD created_by ON TABLE device_group TYPE string;
        DEFINE FIELD attributes ON TABLE device_group FLEXIBLE TYPE object;
        DEFINE FIELD referring_groups ON TABLE device_group TYPE array<string>;

        DEFINE INDEX idx_group_short_id ON TABLE device_group COLUMNS short_id UNIQUE;
        DEFINE INDEX idx_group_referrers ON TABLE device_group COLUMNS referring_groups;
    "#;

    db.query(query)
        .await
        .context("Failed to define group table")?;
    Ok(())
}

/// Devices, capture endpoints, protocols, geolocation records
async fn define_device_tables(db: &DatabaseConnection) -> Result<()> {
    let query = r#"
        DEFINE TABLE device SCHEMAFULL;

        DEFINE FIELD device_ref ON TABLE device TYPE string;
        DEFINE FIELD name ON TABLE device TYPE string;
        DEFINE FIELD group_short_id ON TABLE device TYPE string;
        DEFINE FIELD protocol ON TABLE device TYPE string;
        DEFINE FIELD active ON TABLE device TYPE bool;
        DEFINE FIELD created_at ON TABLE device TYPE datetime;
        DEFINE FIELD last_seen_at ON TABLE device TYPE option<datetime>;

        DEFINE INDEX idx_device_ref ON TABLE device COLUMNS device_ref UNIQUE;
        DEFINE INDEX idx_device_group ON TABLE device COLUMNS group_short_id;

        DEFINE TABLE endpoint SCHEMAFULL;

        DEFINE FIELD endpoint_ref ON TABLE endpoint TYPE string;
        DEFINE FIELD device_ref ON TABLE endpoint TYPE string;
        DEFINE FIELD protocol ON TABLE endpoint TYPE string;
        DEFINE FIELD request_count ON TABLE endpoint TYPE int;
        DEFINE FIELD byte_count ON TABLE endpoint TYPE int;
        DEFINE FIELD last_capture_at ON TABLE endpoint TYPE option<datetime>;

        DEFINE INDEX idx_endpoint_ref ON TABLE endpoint COLUMNS endpoint_ref UNIQUE;

        DEFINE TABLE protocol SCHEMAFULL;

        DEFINE FIELD name ON TABLE protocol TYPE string;
        DEFINE FIELD description ON TABLE protocol TYPE string;
        DEFINE FIELD active ON TABLE protocol TYPE bool;

        DEFINE INDEX idx_protocol_name ON TABLE protocol COLUMNS name UNIQUE;

        DEFINE TABLE location SCHEMAFULL;

        DEFINE FIELD mac ON TABLE location TYPE string;
        DEFINE FIELD latitude ON TABLE location TYPE float;
        DEFINE FIELD longitude ON TABLE location TYPE float;
        DEFINE FIELD accuracy ON TABLE location TYPE float;
        DEFINE FIELD observation_count ON TABLE location TYPE int;
        DEFINE FIELD updated_at ON TABLE location TYPE datetime;

        DEFINE INDEX idx_location_mac ON TABLE location COLUMNS mac UNIQUE;
    "#;

    db.query(query)
        .await
        .context("Failed to define device tables")?;
    Ok(())
}
