//! # Session Broker
//!
//! Thin pass-through to the payment provider's hosted flows:
//!
//! - `POST /create-checkout-session?lookup_key=…` — resolve a price and
//!   open a checkout session
//! - `POST /create-portal-session?session_id=…` — open a billing-portal
//!   session for a prior checkout's customer
//!
//! Both delegate to [`keygate_stripe::StripeClient`] and redirect (303)
//! to the provider's URL. The license repository is never touched here;
//! provider failures surface without retries.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Redirect;
use axum::routing::post;
use axum::Router;
use keygate_stripe::StripeClient;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Query parameters for checkout session creation.
#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    /// Opaque price lookup key configured at the provider.
    pub lookup_key: Option<String>,
}

/// Query parameters for portal session creation.
#[derive(Debug, Deserialize)]
pub struct PortalQuery {
    /// The checkout session to resolve the customer from.
    pub session_id: Option<String>,
}

/// Build the session broker router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/create-portal-session", post(create_portal_session))
}

/// POST /create-checkout-session — Redirect to a hosted checkout flow.
#[utoipa::path(
    post,
    path = "/create-checkout-session",
    params(("lookup_key" = String, Query, description = "Price lookup key")),
    responses(
        (status = 303, description = "Redirect to the provider's checkout page"),
        (status = 400, description = "Missing lookup key or no matching price", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ErrorBody),
        (status = 500, description = "Provider rejected the call", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
pub(crate) async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CheckoutQuery>,
) -> Result<Redirect, AppError> {
    let stripe = provider(&state)?;
    let lookup_key = query
        .lookup_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::BadRequest("lookup_key query parameter is required".into()))?;
    let customer_email = headers.get("email").and_then(|v| v.to_str().ok());

    let url = stripe
        .create_checkout_session(&lookup_key, customer_email, &state.config.public_base_url())
        .await
        .map_err(|e| {
            tracing::error!(lookup_key = %lookup_key, error = %e, "checkout session creation failed");
            AppError::from(e)
        })?;

    Ok(Redirect::to(url.as_str()))
}

/// POST /create-portal-session — Redirect to the billing portal.
#[utoipa::path(
    post,
    path = "/create-portal-session",
    params(("session_id" = String, Query, description = "Prior checkout session ID")),
    responses(
        (status = 303, description = "Redirect to the provider's billing portal"),
        (status = 400, description = "Missing session ID", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ErrorBody),
        (status = 500, description = "Provider rejected the call", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
pub(crate) async fn create_portal_session(
    State(state): State<AppState>,
    Query(query): Query<PortalQuery>,
) -> Result<Redirect, AppError> {
    let stripe = provider(&state)?;
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("session_id query parameter is required".into()))?;

    let url = stripe
        .create_portal_session(&session_id, &state.config.public_base_url())
        .await
        .map_err(|e| {
            tracing::error!(session_id = %session_id, error = %e, "portal session creation failed");
            AppError::from(e)
        })?;

    Ok(Redirect::to(url.as_str()))
}

fn provider(state: &AppState) -> Result<&StripeClient, AppError> {
    state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::Upstream("payment provider is not configured".to_string()))
}
