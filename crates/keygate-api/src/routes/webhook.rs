//! # Webhook Processor
//!
//! `POST /webhook` — receives payment-provider events and drives the
//! license lifecycle. The raw body is verified against the
//! `stripe-signature` header before any field of it is trusted.
//!
//! Response semantics follow the provider's retry contract. A non-2xx
//! status triggers redelivery, so every semantically-handled outcome
//! acknowledges success, even when it was a no-op (duplicate delivery,
//! deletion with no matching license, unrecognized event type). Only
//! signature failure, a malformed payload, or a storage failure
//! returns an error status.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use keygate_core::{License, Plan};
use keygate_stripe::webhook::{CHECKOUT_COMPLETED, SUBSCRIPTION_DELETED};
use keygate_stripe::WebhookEvent;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::{AppState, CreateOutcome};

/// Acknowledgment body returned for every accepted delivery.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    /// Always `"success"`.
    pub status: String,
}

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(receive_webhook))
}

/// POST /webhook — Verify and apply a payment-provider event.
#[utoipa::path(
    post,
    path = "/webhook",
    responses(
        (status = 200, description = "Event processed or acknowledged", body = WebhookAck),
        (status = 400, description = "Invalid signature or malformed payload", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure; the provider will redeliver", body = crate::error::ErrorBody),
    ),
    tag = "webhook"
)]
pub(crate) async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let Some(stripe) = &state.stripe else {
        return Err(AppError::Upstream(
            "payment provider is not configured".to_string(),
        ));
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("missing stripe-signature header".to_string()))?;

    stripe.verify_webhook_signature(&body, signature).map_err(|e| {
        tracing::warn!(error = %e, "webhook signature verification failed");
        AppError::InvalidSignature(e.to_string())
    })?;

    let event = WebhookEvent::parse(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed event payload: {e}")))?;

    let referer = header_or_unknown(&headers, "referer");
    let user_agent = header_or_unknown(&headers, "user-agent");

    process_event(&state, event, referer, user_agent).await?;

    Ok(Json(WebhookAck {
        status: "success".to_string(),
    }))
}

/// Apply a verified event to the license repository.
async fn process_event(
    state: &AppState,
    event: WebhookEvent,
    referer: String,
    user_agent: String,
) -> Result<(), AppError> {
    let WebhookEvent {
        id: event_id,
        event_type,
        data,
    } = event;
    tracing::info!(event_type = %event_type, "webhook event received");

    match event_type.as_str() {
        CHECKOUT_COMPLETED => {
            let object = data.object;
            let customer_id = object
                .customer
                .ok_or_else(|| AppError::BadRequest("checkout event has no customer".to_string()))?;
            let plan = object
                .metadata
                .get("plan")
                .map(String::as_str)
                .map(Plan::parse)
                .unwrap_or(Plan::Unknown);
            let fingerprint = object
                .client_reference_id
                .unwrap_or_else(|| "unknown".to_string());

            let license = License::issue(&customer_id, plan, fingerprint, referer, user_agent);
            let license_key = license.license_key.clone();

            match state.create_license(event_id.as_deref(), license).await? {
                CreateOutcome::Created => {
                    tracing::info!(
                        license_key = %license_key,
                        customer_id = %customer_id,
                        plan = %plan,
                        "license created"
                    );
                }
                CreateOutcome::DuplicateDelivery => {
                    tracing::info!(
                        event_id = event_id.as_deref().unwrap_or("-"),
                        customer_id = %customer_id,
                        "duplicate delivery ignored"
                    );
                }
            }
        }
        SUBSCRIPTION_DELETED => {
            let customer_id = data.object.customer.ok_or_else(|| {
                AppError::BadRequest("subscription event has no customer".to_string())
            })?;

            match state.delete_license_for_customer(&customer_id).await? {
                Some(license) => {
                    tracing::info!(
                        license_key = %license.license_key,
                        customer_id = %customer_id,
                        "license deleted"
                    );
                }
                None => {
                    // Not an error: the provider still expects an ack.
                    tracing::info!(customer_id = %customer_id, "no license to delete");
                }
            }
        }
        other => {
            tracing::debug!(event_type = %other, "ignoring unrecognized event type");
        }
    }

    Ok(())
}

fn header_or_unknown(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
