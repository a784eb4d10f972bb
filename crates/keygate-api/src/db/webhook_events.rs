//! Processed-event persistence (webhook idempotency backstop).

use sqlx::{PgConnection, PgPool};

/// Record a provider event ID, returning `false` when it was already
/// present. The unique constraint makes this a true conditional insert:
/// two concurrent deliveries of the same event cannot both observe
/// `true`.
pub async fn try_record(conn: &mut PgConnection, event_id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("INSERT INTO webhook_events (event_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(event_id)
            .execute(conn)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all processed event IDs into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT event_id FROM webhook_events")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
