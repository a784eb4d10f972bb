//! # keygate-api — Axum API Service
//!
//! The HTTP layer of the keygate license service, built on
//! Axum/Tower/Tokio.
//!
//! ## API Surface
//!
//! | Route                       | Module                 | Concern             |
//! |-----------------------------|------------------------|---------------------|
//! | `GET /`                     | [`routes::pages`]      | Landing page        |
//! | `POST /create-checkout-session` | [`routes::sessions`] | Checkout brokering |
//! | `POST /create-portal-session`   | [`routes::sessions`] | Portal brokering   |
//! | `POST /webhook`             | [`routes::webhook`]    | License lifecycle   |
//! | `POST /check-license`       | [`routes::licenses`]   | License validation  |
//! | `GET /openapi.json`         | [`openapi`]            | API document        |
//! | `GET /health/*`             | (here)                 | Probes, unauthenticated |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → RateLimitMiddleware → BasicAuthMiddleware* → Handler
//! ```
//!
//! *Basic auth is a route layer on `/check-license` only; the rate
//! limiter always runs first, so exhausting a budget yields 429 even
//! with valid credentials.
//!
//! ## Crate Policy
//!
//! - Route handlers hold no business rules beyond request shaping —
//!   lifecycle logic lives on [`state::AppState`] and in `keygate-core`.
//! - All errors map to structured HTTP responses via [`AppError`].
//! - Health probes stay outside every middleware layer.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AdminAuth;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};

pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the middleware stack
/// so they remain accessible without credentials or budget.
pub fn app(state: AppState) -> Router {
    let admin = AdminAuth::new(state.credentials.clone());
    let limiter = RateLimiter::new(RateLimitConfig::default());

    let api = Router::new()
        .merge(routes::pages::router())
        .merge(routes::sessions::router())
        .merge(routes::webhook::router())
        .merge(routes::licenses::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(admin))
        .layer(Extension(limiter))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
