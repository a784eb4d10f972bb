//! # Persistence
//!
//! Postgres write-through for the license repository. The in-memory
//! [`crate::state::LicenseStore`] is the hot path; these modules keep it
//! durable across restarts. Unique constraints on `licenses.license_key`
//! and `webhook_events.event_id` are the storage-layer backstop for the
//! idempotency the application enforces in memory.

pub mod licenses;
pub mod webhook_events;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres and ensure the schema exists.
///
/// `None` means persistence is disabled — the service runs in-memory
/// only, which is how the test suites exercise it.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        return Ok(None);
    };

    let pool = PgPoolOptions::new().max_connections(8).connect(url).await?;
    ensure_schema(&pool).await?;
    Ok(Some(pool))
}

/// Create tables and indexes if they do not exist yet.
async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS licenses (
             license_key     TEXT PRIMARY KEY,
             customer_id     TEXT NOT NULL,
             plan            TEXT NOT NULL,
             devices_allowed INTEGER NOT NULL,
             referer         TEXT NOT NULL,
             user_agent      TEXT NOT NULL,
             fingerprint     TEXT NOT NULL,
             created_at      TIMESTAMPTZ NOT NULL
         )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS licenses_customer_id_idx ON licenses (customer_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS licenses_fingerprint_idx ON licenses (fingerprint)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS webhook_events (
             event_id    TEXT PRIMARY KEY,
             received_at TIMESTAMPTZ NOT NULL DEFAULT now()
         )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
