//! # keygate-stripe — Typed Stripe client for keygate
//!
//! Provides the three provider-facing capabilities the license service
//! needs:
//!
//! - **Checkout sessions** — resolve a price by lookup key and open a
//!   hosted checkout session ([`StripeClient::create_checkout_session`])
//! - **Billing-portal sessions** — resolve a prior checkout session's
//!   customer and open a self-service portal session
//!   ([`StripeClient::create_portal_session`])
//! - **Webhook authenticity** — verify the `stripe-signature` header
//!   against the shared webhook secret before any payload field is
//!   trusted ([`webhook::verify_signature`]), and parse the event
//!   ([`webhook::WebhookEvent`])
//!
//! ## Architecture
//!
//! This crate is the only path from keygate to Stripe. Session calls
//! are pure delegation with a bounded timeout and no retries, and no
//! state is persisted as a side effect. Provider failures surface as
//! [`StripeError`] with the provider's message attached.

pub mod config;
pub mod error;
pub mod sessions;
pub mod webhook;

pub use config::StripeConfig;
pub use error::StripeError;
pub use webhook::{SignatureError, WebhookEvent};

use std::time::Duration;

/// Stripe API client. Cheap to clone; the inner reqwest client is shared.
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    config: StripeConfig,
}

impl StripeClient {
    /// Create a new Stripe client from configuration.
    pub fn new(config: StripeConfig) -> Result<Self, StripeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StripeError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self { http, config })
    }

    /// Verify a webhook delivery's `stripe-signature` header against the
    /// configured shared secret.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), SignatureError> {
        webhook::verify_signature(
            payload,
            signature_header,
            &self.config.webhook_secret,
            webhook::DEFAULT_TOLERANCE_SECS,
        )
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn config(&self) -> &StripeConfig {
        &self.config
    }
}
