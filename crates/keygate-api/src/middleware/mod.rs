//! Tower middleware for the keygate API.

pub mod rate_limit;

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Best-effort client address for rate limiting and audit logging.
///
/// Prefers the first `x-forwarded-for` entry (the service normally sits
/// behind a proxy), falling back to the socket peer address. Returns
/// `"unknown"` when neither is available, which only happens in tests
/// that drive the router without a connection.
pub fn client_addr(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
