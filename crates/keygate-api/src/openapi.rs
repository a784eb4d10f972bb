//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "keygate API",
        version = "0.3.2",
        description = "License key service: webhook-driven license lifecycle, authenticated license validation, and checkout/portal session brokering.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::sessions::create_checkout_session,
        crate::routes::sessions::create_portal_session,
        crate::routes::webhook::receive_webhook,
        crate::routes::licenses::check_license,
    ),
    components(schemas(
        // Domain types
        keygate_core::Plan,
        // DTOs
        crate::routes::licenses::CheckLicenseRequest,
        crate::routes::licenses::CheckLicenseResponse,
        crate::routes::webhook::WebhookAck,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "sessions", description = "Checkout and billing-portal session brokering"),
        (name = "webhook", description = "Payment-provider webhook processing"),
        (name = "licenses", description = "License validation"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
