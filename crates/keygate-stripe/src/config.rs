//! Stripe client configuration.
//!
//! Defaults point at the live Stripe API. Override the base URL via
//! environment for testing against a mock server.

use url::Url;

/// Configuration for connecting to Stripe.
///
/// Custom `Debug` implementation redacts `api_key` and `webhook_secret`
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct StripeConfig {
    /// Base URL for the Stripe API. Default: <https://api.stripe.com>
    pub api_base: Url,
    /// Secret API key (`sk_...`) used as the Bearer credential.
    pub api_key: String,
    /// Shared secret (`whsec_...`) for webhook signature verification.
    pub webhook_secret: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `STRIPE_API_KEY` (required)
    /// - `WEBHOOK_SECRET` (required)
    /// - `STRIPE_API_BASE` (default: `https://api.stripe.com`)
    /// - `STRIPE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            std::env::var("STRIPE_API_KEY").map_err(|_| ConfigError::Missing("STRIPE_API_KEY"))?;
        let webhook_secret =
            std::env::var("WEBHOOK_SECRET").map_err(|_| ConfigError::Missing("WEBHOOK_SECRET"))?;

        Ok(Self {
            api_base: env_url("STRIPE_API_BASE", "https://api.stripe.com")?,
            api_key,
            webhook_secret,
            timeout_secs: std::env::var("STRIPE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable was absent.
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    /// A URL variable failed to parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
