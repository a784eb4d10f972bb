//! Stripe client error types.

/// Errors from Stripe API calls.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        /// Logical endpoint name for log context.
        endpoint: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// Stripe returned a non-2xx status.
    #[error("Stripe {endpoint} returned {status}: {body}")]
    Api {
        /// Logical endpoint name for log context.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, carrying the provider's message.
        body: String,
    },

    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        /// Logical endpoint name for log context.
        endpoint: String,
        /// Underlying reqwest/serde error.
        source: reqwest::Error,
    },

    /// No price matched the supplied lookup key.
    #[error("no price found for lookup_key {0}")]
    InvalidPrice(String),

    /// A session was created but the response carried no redirect URL.
    #[error("Stripe {0} response did not include a redirect URL")]
    MissingRedirectUrl(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
