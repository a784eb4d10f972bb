//! # Per-Client Rate Limiting
//!
//! Fixed-window request budgets keyed by client address, enforced in
//! front of authentication: session-creation endpoints share one budget
//! class, license validation gets its own, everything else is
//! unlimited. Exceeding a budget yields 429 `RATE_LIMITED`, distinct
//! from any authentication or lookup failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::RwLock;

use crate::error::AppError;
use crate::middleware::client_addr;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Budget per window for checkout/portal session creation.
    pub session_max: u64,
    /// Budget per window for license validation.
    pub validate_max: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            session_max: 5,
            validate_max: 10,
            window_secs: 60,
        }
    }
}

/// Per-key rate limit state.
#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<RwLock<HashMap<String, BucketState>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The budget applying to a request path, or `None` when the path
    /// is not rate-limited.
    fn budget_for(&self, path: &str) -> Option<u64> {
        match path {
            "/create-checkout-session" | "/create-portal-session" => Some(self.config.session_max),
            "/check-license" => Some(self.config.validate_max),
            _ => None,
        }
    }

    /// Check whether a request under `key` fits its `max`-per-window
    /// budget, counting it if so.
    fn check(&self, key: &str, max: u64) -> bool {
        let mut buckets = self.buckets.write();
        let now = Instant::now();

        let bucket = buckets.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start).as_secs() >= self.config.window_secs {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= max {
            false
        } else {
            bucket.count += 1;
            true
        }
    }
}

/// Middleware that enforces per-client request budgets.
///
/// Buckets are keyed on `(client address, path)` so a client exhausting
/// the checkout budget still has its validation budget intact.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let path = request.uri().path();
        if let Some(max) = limiter.budget_for(path) {
            let addr = client_addr(&request);
            let key = format!("{addr}:{path}");

            if !limiter.check(&key, max) {
                tracing::warn!(addr = %addr, path = %path, "rate limit exceeded");
                return AppError::RateLimited.into_response();
            }
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::post;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    #[test]
    fn budget_allows_up_to_max_then_blocks() {
        let limiter = RateLimiter::new(RateLimitConfig {
            session_max: 3,
            validate_max: 10,
            window_secs: 60,
        });

        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4:/create-checkout-session", 3));
        }
        assert!(!limiter.check("1.2.3.4:/create-checkout-session", 3));
    }

    #[test]
    fn budgets_are_independent_per_key() {
        let limiter = RateLimiter::new(RateLimitConfig::default());

        assert!(limiter.check("1.2.3.4:/check-license", 1));
        assert!(!limiter.check("1.2.3.4:/check-license", 1));
        // A different client is unaffected.
        assert!(limiter.check("5.6.7.8:/check-license", 1));
    }

    #[test]
    fn budget_for_classifies_paths() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        assert_eq!(limiter.budget_for("/create-checkout-session"), Some(5));
        assert_eq!(limiter.budget_for("/create-portal-session"), Some(5));
        assert_eq!(limiter.budget_for("/check-license"), Some(10));
        assert_eq!(limiter.budget_for("/webhook"), None);
        assert_eq!(limiter.budget_for("/"), None);
    }

    fn app(limiter: RateLimiter) -> Router {
        Router::new()
            .route("/check-license", post(|| async { "ok" }))
            .route("/webhook", post(|| async { "ok" }))
            .layer(from_fn(rate_limit_middleware))
            .layer(Extension(limiter))
    }

    fn request(path: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(path)
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn exceeding_the_validation_budget_returns_429() {
        let app = app(RateLimiter::new(RateLimitConfig {
            session_max: 5,
            validate_max: 2,
            window_secs: 60,
        }));

        for _ in 0..2 {
            let response = app.clone().oneshot(request("/check-license")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(request("/check-license")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn unclassified_paths_are_not_limited() {
        let app = app(RateLimiter::new(RateLimitConfig {
            session_max: 1,
            validate_max: 1,
            window_secs: 60,
        }));

        for _ in 0..10 {
            let response = app.clone().oneshot(request("/webhook")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
