//! Webhook signature verification and event parsing.
//!
//! Stripe signs each delivery with `HMAC-SHA256(secret, "{t}.{payload}")`
//! and sends the result in the `stripe-signature` header:
//!
//! ```text
//! t=1712345678,v1=5257a869e7...,v1=...
//! ```
//!
//! Verification checks the timestamp against a tolerance window (replay
//! protection) and compares the expected MAC against every `v1` candidate
//! in constant time. Nothing in the payload is trusted until this passes.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a delivery, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Event type emitted when a checkout completes (subscription activated).
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Event type emitted when a subscription is cancelled.
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Reasons a `stripe-signature` header fails verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The header did not contain a `t=` timestamp element.
    #[error("signature header is missing the timestamp")]
    MissingTimestamp,

    /// The header did not contain any `v1=` signature element.
    #[error("signature header is missing a v1 signature")]
    MissingSignature,

    /// The timestamp element was not a valid integer.
    #[error("signature header timestamp is malformed")]
    MalformedTimestamp,

    /// The delivery timestamp is outside the tolerance window.
    #[error("signature timestamp is outside the tolerance window")]
    StaleTimestamp,

    /// No `v1` candidate matched the expected MAC.
    #[error("signature did not match the expected value")]
    Mismatch,
}

/// Verify a webhook payload against its `stripe-signature` header.
///
/// `tolerance_secs` bounds how old (or how far in the future) the `t=`
/// timestamp may be relative to the current clock.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for element in signature_header.split(',') {
        match element.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            // Unknown schemes (v0, future versions) are ignored.
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if candidates.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let parsed: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedTimestamp)?;
    let now = chrono::Utc::now().timestamp();
    if (now - parsed).abs() > tolerance_secs {
        return Err(SignatureError::StaleTimestamp);
    }

    // The MAC covers the timestamp exactly as it appeared in the header.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    for candidate in candidates {
        let Ok(provided) = hex::decode(candidate) else {
            continue;
        };
        if provided.len() == expected.len() && bool::from(provided.ct_eq(expected.as_slice())) {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

// -- Event payload types ------------------------------------------------------

/// A verified webhook event.
///
/// Fields use `#[serde(default)]` for resilience against payload
/// variations across event types — `serde(deny_unknown_fields)` is
/// intentionally NOT used.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Provider event ID (`evt_...`), the idempotency key for redelivery.
    #[serde(default)]
    pub id: Option<String>,
    /// Event type, e.g. `checkout.session.completed`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    #[serde(default)]
    pub data: EventData,
}

/// The `data` envelope of a webhook event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    /// The object the event describes.
    #[serde(default)]
    pub object: EventObject,
}

/// The fields of `data.object` the license lifecycle consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventObject {
    /// Payment-provider customer identifier.
    #[serde(default)]
    pub customer: Option<String>,
    /// Checkout metadata; `plan` carries the price lookup key.
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
    /// Caller-supplied client reference, bound as the device fingerprint.
    #[serde(default)]
    pub client_reference_id: Option<String>,
}

impl WebhookEvent {
    /// Parse a verified payload into a typed event.
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
