//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! The [`LicenseStore`] is the license repository and the only shared
//! mutable resource in the service. All reads and mutations run under a
//! scoped guard acquired and released per request (the `RwLock` is
//! `parking_lot`, not `tokio::sync`, because the lock is never held
//! across an `.await` point). Webhook dedup is an atomic
//! conditional-insert under a single write guard.
//!
//! When a Postgres pool is configured, the store is hydrated from it at
//! startup and every mutation is written through inside a transaction,
//! with unique constraints on `license_key` and `event_id` as the
//! storage-layer backstop. A write-through failure rolls the in-memory
//! change back so provider redelivery can retry cleanly.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use keygate_core::{AdminCredentials, License};
use keygate_stripe::StripeClient;
use parking_lot::RwLock;
use sqlx::PgPool;

use crate::db;

// -- Configuration ------------------------------------------------------------

/// Immutable service configuration, constructed once at startup and
/// passed explicitly — never read as ambient global state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP listener binds.
    pub port: u16,
    /// Whether the public base URL uses the `https` scheme. TLS itself
    /// terminates in front of this service.
    pub https: bool,
    /// Whether the binary initializes the tracing subscriber.
    pub logging_enabled: bool,
    /// Public host (and optional port) clients are redirected back to.
    pub domain: String,
    /// Postgres connection string. Absent means in-memory only.
    pub database_url: Option<String>,
    /// Directory holding the static index page.
    pub public_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 4242)
    /// - `HTTPS` (default: false)
    /// - `LOGGING_ENABLED` (default: true)
    /// - `DOMAIN` (default: `localhost:4242`)
    /// - `DATABASE_URL` (optional)
    /// - `PUBLIC_DIR` (default: `public`)
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4242),
            https: env_flag("HTTPS", false),
            logging_enabled: env_flag("LOGGING_ENABLED", true),
            domain: std::env::var("DOMAIN").unwrap_or_else(|_| "localhost:4242".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            public_dir: std::env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),
        }
    }

    /// The public base URL provider redirects point back to.
    pub fn public_base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{scheme}://{}", self.domain)
    }
}

fn env_flag(var: &str, default: bool) -> bool {
    std::env::var(var)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(default)
}

// -- License Repository -------------------------------------------------------

/// Outcome of a webhook-driven license creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new license row was inserted.
    Created,
    /// The provider event was already processed; nothing changed.
    DuplicateDelivery,
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Issued licenses, in creation order. Customer lookups take the
    /// first match, mirroring the delete semantics of the lifecycle.
    licenses: Vec<License>,
    /// Provider event IDs already applied (idempotency set).
    processed_events: HashSet<String>,
}

/// Thread-safe, cloneable in-memory license repository.
#[derive(Debug, Clone, Default)]
pub struct LicenseStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl LicenseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conditionally insert a license keyed on the provider event ID.
    ///
    /// Returns `false` without touching the store when `event_id` was
    /// already processed. The dedup check and the insert happen under
    /// one write guard, so concurrent duplicate deliveries cannot both
    /// create a row. Events without an ID are always inserted.
    pub fn try_create(&self, event_id: Option<&str>, license: &License) -> bool {
        let mut inner = self.inner.write();
        if let Some(id) = event_id {
            if !inner.processed_events.insert(id.to_string()) {
                return false;
            }
        }
        inner.licenses.push(license.clone());
        true
    }

    /// Undo a `try_create` whose database write-through failed.
    pub fn rollback_create(&self, event_id: Option<&str>, license_key: &str) {
        let mut inner = self.inner.write();
        if let Some(id) = event_id {
            inner.processed_events.remove(id);
        }
        inner.licenses.retain(|l| l.license_key != license_key);
    }

    /// Remove the first license held by `customer_id`, if any.
    pub fn remove_by_customer(&self, customer_id: &str) -> Option<License> {
        let mut inner = self.inner.write();
        let index = inner
            .licenses
            .iter()
            .position(|l| l.customer_id == customer_id)?;
        Some(inner.licenses.remove(index))
    }

    /// Re-insert a license whose database deletion failed.
    pub fn restore(&self, license: License) {
        self.inner.write().licenses.push(license);
    }

    /// Look up a license where BOTH key and fingerprint match exactly.
    pub fn find(&self, license_key: &str, fingerprint: &str) -> Option<License> {
        self.inner
            .read()
            .licenses
            .iter()
            .find(|l| l.license_key == license_key && l.fingerprint == fingerprint)
            .cloned()
    }

    /// All licenses, in creation order.
    pub fn list(&self) -> Vec<License> {
        self.inner.read().licenses.clone()
    }

    /// Number of licenses currently held.
    pub fn len(&self) -> usize {
        self.inner.read().licenses.len()
    }

    /// Whether the store holds no licenses.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace store contents from persistence at startup.
    pub fn hydrate(&self, licenses: Vec<License>, processed_events: Vec<String>) {
        let mut inner = self.inner.write();
        inner.licenses = licenses;
        inner.processed_events = processed_events.into_iter().collect();
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Immutable service configuration.
    pub config: AppConfig,
    /// The administrative principal for the validation endpoint.
    pub credentials: AdminCredentials,
    /// Stripe client. Absent when the provider is not configured;
    /// session and webhook endpoints then reject with an upstream error.
    pub stripe: Option<StripeClient>,
    /// The license repository.
    pub licenses: LicenseStore,
    /// Optional Postgres pool for write-through persistence.
    pub db: Option<PgPool>,
}

impl AppState {
    /// Create a license, idempotently per provider event.
    ///
    /// The in-memory conditional insert decides dedup; the database
    /// write-through (when configured) runs in one transaction with
    /// `ON CONFLICT DO NOTHING` on the event ID as backstop. On storage
    /// failure the in-memory change is rolled back and the error is
    /// surfaced so the provider redelivers.
    pub async fn create_license(
        &self,
        event_id: Option<&str>,
        license: License,
    ) -> Result<CreateOutcome, sqlx::Error> {
        if !self.licenses.try_create(event_id, &license) {
            return Ok(CreateOutcome::DuplicateDelivery);
        }

        if let Some(pool) = &self.db {
            let write_through = async {
                let mut tx = pool.begin().await?;
                if let Some(id) = event_id {
                    if !db::webhook_events::try_record(&mut tx, id).await? {
                        tx.rollback().await?;
                        return Ok::<bool, sqlx::Error>(false);
                    }
                }
                db::licenses::insert(&mut tx, &license).await?;
                tx.commit().await?;
                Ok(true)
            }
            .await;

            match write_through {
                Ok(true) => {}
                Ok(false) => {
                    self.licenses
                        .rollback_create(event_id, &license.license_key);
                    return Ok(CreateOutcome::DuplicateDelivery);
                }
                Err(e) => {
                    self.licenses
                        .rollback_create(event_id, &license.license_key);
                    return Err(e);
                }
            }
        }

        Ok(CreateOutcome::Created)
    }

    /// Delete the first license held by `customer_id`.
    ///
    /// Returns the removed license, or `None` when the customer holds
    /// none — a no-op for the caller, not an error.
    pub async fn delete_license_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<License>, sqlx::Error> {
        let removed = self.licenses.remove_by_customer(customer_id);

        if let (Some(pool), Some(license)) = (&self.db, &removed) {
            if let Err(e) = db::licenses::delete_by_key(pool, &license.license_key).await {
                self.licenses.restore(license.clone());
                return Err(e);
            }
        }

        Ok(removed)
    }

    /// Hydrate the in-memory repository from the database, if connected.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let Some(pool) = &self.db else {
            return Ok(());
        };
        let licenses = db::licenses::load_all(pool).await?;
        let events = db::webhook_events::load_all(pool).await?;
        tracing::info!(
            licenses = licenses.len(),
            processed_events = events.len(),
            "hydrated license repository from database"
        );
        self.licenses.hydrate(licenses, events);
        Ok(())
    }
}
