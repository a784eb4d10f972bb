//! # License Validation API
//!
//! `POST /check-license` — authenticated lookup of a license by its key
//! and bound device fingerprint. "Wrong key" and "wrong fingerprint"
//! collapse into one 404 so callers cannot probe which part failed, and
//! provenance fields (`customer_id`, `referer`, `user_agent`) are never
//! returned.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::middleware::from_fn;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use keygate_core::{License, Plan};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to validate a license key against a device fingerprint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckLicenseRequest {
    /// The license key to validate.
    pub license_key: String,
    /// The device fingerprint bound at checkout.
    pub fingerprint: String,
}

impl Validate for CheckLicenseRequest {
    fn validate(&self) -> Result<(), String> {
        if self.license_key.trim().is_empty() {
            return Err("license_key must not be empty".to_string());
        }
        if self.fingerprint.trim().is_empty() {
            return Err("fingerprint must not be empty".to_string());
        }
        Ok(())
    }
}

/// Entitlement metadata returned for a valid license.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckLicenseResponse {
    /// The validated license key.
    pub license_key: String,
    /// Plan the license was issued under.
    pub plan: Plan,
    /// Device entitlement for the plan.
    pub devices_allowed: i32,
    /// When the license was issued.
    pub created_at: DateTime<Utc>,
}

impl From<License> for CheckLicenseResponse {
    fn from(license: License) -> Self {
        Self {
            license_key: license.license_key,
            plan: license.plan,
            devices_allowed: license.devices_allowed,
            created_at: license.created_at,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the license validation router. Basic authentication is a
/// route layer here so it runs after the outer rate limiter.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check-license", post(check_license))
        .route_layer(from_fn(auth::basic_auth_middleware))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /check-license — Validate a license key + fingerprint pair.
#[utoipa::path(
    post,
    path = "/check-license",
    request_body = CheckLicenseRequest,
    responses(
        (status = 200, description = "License is valid", body = CheckLicenseResponse),
        (status = 401, description = "Invalid admin credentials", body = crate::error::ErrorBody),
        (status = 404, description = "No matching license", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub(crate) async fn check_license(
    State(state): State<AppState>,
    body: Result<Json<CheckLicenseRequest>, JsonRejection>,
) -> Result<Json<CheckLicenseResponse>, AppError> {
    let req = extract_validated_json(body)?;

    match state.licenses.find(&req.license_key, &req.fingerprint) {
        Some(license) => Ok(Json(license.into())),
        None => {
            tracing::warn!(license_key = %req.license_key, "license lookup failed");
            Err(AppError::NotFound(
                "license not found or invalid fingerprint".to_string(),
            ))
        }
    }
}
