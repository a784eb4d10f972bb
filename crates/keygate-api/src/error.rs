//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps license lifecycle, authentication, provider, and storage errors
//! to HTTP status codes with JSON error bodies. Storage and internal
//! details are never exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses use this format for consistency across the API
/// surface.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "RATE_LIMITED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// Webhook no-ops (unknown event type, deletion with no matching license)
/// are deliberately NOT represented here — they acknowledge success so the
/// payment provider stops redelivering.
#[derive(Error, Debug)]
pub enum AppError {
    /// Webhook signature verification failed (400). No state was mutated.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Request body or parameters could not be used (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Administrative authentication failed (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No license matched the supplied key and fingerprint (404).
    /// One collapsed message — which part failed is never revealed.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider knows no price for the supplied lookup key (400).
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Per-client request budget exhausted (429). Raised before
    /// authentication runs.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The payment provider rejected a call (500). The provider's
    /// message is surfaced; the call is not retried.
    #[error("upstream provider error: {0}")]
    Upstream(String),

    /// Repository unreachable or constraint violation (500).
    /// Details are logged but not returned to the client.
    #[error("storage error: {0}")]
    Storage(String),

    /// Other internal failure (500). Details are logged but not
    /// returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidSignature(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::InvalidPrice(_) => (StatusCode::BAD_REQUEST, "INVALID_PRICE"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose storage or internal details to clients.
        let message = match &self {
            Self::Storage(_) => "A storage error occurred".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Storage(_) | Self::Internal(_)) {
            tracing::error!(error = %self, "request failed with server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convert repository errors to API errors.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Convert provider-client errors to API errors.
///
/// `InvalidPrice` keeps its own status (client mistake); everything else
/// from the provider surfaces as an upstream failure with the provider's
/// message attached.
impl From<keygate_stripe::StripeError> for AppError {
    fn from(err: keygate_stripe::StripeError) -> Self {
        match err {
            keygate_stripe::StripeError::InvalidPrice(key) => {
                Self::InvalidPrice(format!("no price found for lookup_key {key}"))
            }
            other => Self::Upstream(other.to_string()),
        }
    }
}
