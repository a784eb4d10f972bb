//! Checkout and billing-portal session creation.
//!
//! Both operations are pure delegation to Stripe: resolve identifiers,
//! create the session, hand back the hosted redirect URL. Nothing is
//! persisted on our side, there are no retries, and the client timeout
//! bounds every call.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::ConfigError;
use crate::error::StripeError;
use crate::StripeClient;

/// A price object, reduced to the field session creation needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    /// Price identifier (`price_...`).
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PriceList {
    #[serde(default)]
    data: Vec<Price>,
}

/// A checkout session, as returned by create and retrieve.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session identifier (`cs_...`).
    pub id: String,
    /// Hosted checkout URL. Present on newly created sessions.
    #[serde(default)]
    pub url: Option<String>,
    /// Customer the session resolved to. Present after completion.
    #[serde(default)]
    pub customer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PortalSession {
    url: String,
}

impl StripeClient {
    /// Resolve a price by its opaque lookup key.
    ///
    /// Returns [`StripeError::InvalidPrice`] when Stripe knows no price
    /// under that key.
    pub async fn lookup_price(&self, lookup_key: &str) -> Result<Price, StripeError> {
        let url = self.endpoint("v1/prices")?;
        let response = self
            .http()
            .get(url)
            .bearer_auth(&self.config().api_key)
            .query(&[("lookup_keys[]", lookup_key), ("expand[]", "data.product")])
            .send()
            .await
            .map_err(|source| StripeError::Http {
                endpoint: "prices".into(),
                source,
            })?;

        let prices: PriceList = read_json("prices", response).await?;
        prices
            .data
            .into_iter()
            .next()
            .ok_or_else(|| StripeError::InvalidPrice(lookup_key.to_string()))
    }

    /// Create a subscription checkout session for the price behind
    /// `lookup_key` and return the hosted redirect URL.
    ///
    /// `base_url` is this service's public base; success and cancel pages
    /// hang off it. The lookup key travels in the session metadata so the
    /// completion webhook can recover the plan.
    pub async fn create_checkout_session(
        &self,
        lookup_key: &str,
        customer_email: Option<&str>,
        base_url: &str,
    ) -> Result<Url, StripeError> {
        let price = self.lookup_price(lookup_key).await?;

        let success_url = format!("{base_url}/success.html?session_id={{CHECKOUT_SESSION_ID}}");
        let cancel_url = format!("{base_url}/cancel.html");

        let mut params: Vec<(&str, String)> = vec![
            ("line_items[0][price]", price.id),
            ("line_items[0][quantity]", "1".to_string()),
            ("mode", "subscription".to_string()),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("metadata[plan]", lookup_key.to_string()),
        ];
        if let Some(email) = customer_email {
            params.push(("customer_email", email.to_string()));
        }

        let url = self.endpoint("v1/checkout/sessions")?;
        let response = self
            .http()
            .post(url)
            .bearer_auth(&self.config().api_key)
            .form(&params)
            .send()
            .await
            .map_err(|source| StripeError::Http {
                endpoint: "checkout_sessions".into(),
                source,
            })?;

        let session: CheckoutSession = read_json("checkout_sessions", response).await?;
        tracing::debug!(session_id = %session.id, lookup_key = %lookup_key, "checkout session created");
        redirect_url("checkout_sessions", session.url)
    }

    /// Open a billing-portal session for the customer behind a prior
    /// checkout session and return the hosted redirect URL.
    pub async fn create_portal_session(
        &self,
        session_id: &str,
        return_url: &str,
    ) -> Result<Url, StripeError> {
        let url = self.endpoint(&format!("v1/checkout/sessions/{session_id}"))?;
        let response = self
            .http()
            .get(url)
            .bearer_auth(&self.config().api_key)
            .send()
            .await
            .map_err(|source| StripeError::Http {
                endpoint: "retrieve_checkout_session".into(),
                source,
            })?;
        let session: CheckoutSession = read_json("retrieve_checkout_session", response).await?;

        let customer = session.customer.ok_or_else(|| StripeError::Api {
            endpoint: "retrieve_checkout_session".into(),
            status: 200,
            body: format!("session {} has no customer", session.id),
        })?;

        let params = [
            ("customer", customer.as_str()),
            ("return_url", return_url),
        ];
        let url = self.endpoint("v1/billing_portal/sessions")?;
        let response = self
            .http()
            .post(url)
            .bearer_auth(&self.config().api_key)
            .form(&params)
            .send()
            .await
            .map_err(|source| StripeError::Http {
                endpoint: "billing_portal_sessions".into(),
                source,
            })?;

        let portal: PortalSession = read_json("billing_portal_sessions", response).await?;
        tracing::debug!(customer = %customer, "billing portal session created");
        redirect_url("billing_portal_sessions", Some(portal.url))
    }

    fn endpoint(&self, path: &str) -> Result<Url, StripeError> {
        self.config().api_base.join(path).map_err(|e| {
            StripeError::Config(ConfigError::InvalidUrl(path.to_string(), e.to_string()))
        })
    }
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, StripeError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StripeError::Api {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|source| StripeError::Deserialization {
            endpoint: endpoint.to_string(),
            source,
        })
}

fn redirect_url(endpoint: &str, raw: Option<String>) -> Result<Url, StripeError> {
    let raw = raw.ok_or_else(|| StripeError::MissingRedirectUrl(endpoint.to_string()))?;
    Url::parse(&raw).map_err(|_| StripeError::MissingRedirectUrl(endpoint.to_string()))
}
