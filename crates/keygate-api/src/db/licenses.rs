//! License persistence operations.
//!
//! Mutations take a `&mut PgConnection` so the webhook path can run the
//! event record and the license insert in one transaction.

use chrono::{DateTime, Utc};
use keygate_core::{License, Plan};
use sqlx::{PgConnection, PgPool};

/// Insert a new license row.
///
/// `ON CONFLICT DO NOTHING` on the primary key: the application
/// generates UUID keys, so a conflict only occurs when a concurrent
/// duplicate delivery already won the race — which is exactly the
/// at-most-once outcome we want.
pub async fn insert(conn: &mut PgConnection, license: &License) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO licenses
             (license_key, customer_id, plan, devices_allowed, referer, user_agent, fingerprint, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (license_key) DO NOTHING",
    )
    .bind(&license.license_key)
    .bind(&license.customer_id)
    .bind(license.plan.as_str())
    .bind(license.devices_allowed)
    .bind(&license.referer)
    .bind(&license.user_agent)
    .bind(&license.fingerprint)
    .bind(license.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Delete a license by key. Returns whether a row was removed.
pub async fn delete_by_key(pool: &PgPool, license_key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM licenses WHERE license_key = $1")
        .bind(license_key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all licenses into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<License>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LicenseRow>(
        "SELECT license_key, customer_id, plan, devices_allowed, referer, user_agent, fingerprint, created_at
         FROM licenses ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(LicenseRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct LicenseRow {
    license_key: String,
    customer_id: String,
    plan: String,
    devices_allowed: i32,
    referer: String,
    user_agent: String,
    fingerprint: String,
    created_at: DateTime<Utc>,
}

impl LicenseRow {
    fn into_record(self) -> License {
        // READ path: an unrecognized plan string collapses to Unknown,
        // which carries the same permissive entitlement the write path
        // would have assigned it.
        let plan = Plan::parse(&self.plan);
        if plan == Plan::Unknown && self.plan != "unknown" {
            tracing::warn!(
                license_key = %self.license_key,
                plan = %self.plan,
                "unrecognized plan string in database row"
            );
        }

        License {
            license_key: self.license_key,
            customer_id: self.customer_id,
            plan,
            devices_allowed: self.devices_allowed,
            referer: self.referer,
            user_agent: self.user_agent,
            fingerprint: self.fingerprint,
            created_at: self.created_at,
        }
    }
}
