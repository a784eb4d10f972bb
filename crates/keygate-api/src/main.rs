//! # keygate-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the keygate license service.
//! Binds to a configurable port (default 4242).

use std::net::SocketAddr;

use keygate_api::state::{AppConfig, AppState, LicenseStore};
use keygate_core::AdminCredentials;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // Initialize structured tracing unless logging is disabled.
    if config.logging_enabled {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // The administrative principal is mandatory: without it the
    // validation endpoint could never authenticate anyone.
    let credentials = load_credentials().map_err(|e| {
        tracing::error!("Failed to load admin credentials: {e}");
        e
    })?;

    // Attempt to create the Stripe client from environment.
    let stripe = match keygate_stripe::StripeConfig::from_env() {
        Ok(stripe_config) => {
            tracing::info!("Stripe client configured");
            Some(keygate_stripe::StripeClient::new(stripe_config)?)
        }
        Err(e) => {
            tracing::warn!(
                "Stripe client not configured: {e}. Session and webhook endpoints will reject requests."
            );
            None
        }
    };

    // Initialize database pool (optional — absent means in-memory only).
    let db = keygate_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;

    let port = config.port;
    let state = AppState {
        config,
        credentials,
        stripe,
        licenses: LicenseStore::new(),
        db,
    };

    // Hydrate the in-memory repository from the database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = keygate_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("keygate API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load the administrative credential from `ADMIN_CREDENTIALS_FILE`, or
/// from `ADMIN_USERNAME` + `ADMIN_PASSWORD_HASH` when no file is set.
fn load_credentials() -> Result<AdminCredentials, Box<dyn std::error::Error>> {
    if let Ok(path) = std::env::var("ADMIN_CREDENTIALS_FILE") {
        return Ok(AdminCredentials::from_file(&path)?);
    }

    let username = std::env::var("ADMIN_USERNAME")
        .map_err(|_| "ADMIN_USERNAME environment variable is required")?;
    let hash = std::env::var("ADMIN_PASSWORD_HASH")
        .map_err(|_| "ADMIN_PASSWORD_HASH environment variable is required")?;
    Ok(AdminCredentials::new(username, hash)?)
}
