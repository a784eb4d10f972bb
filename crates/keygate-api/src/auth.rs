//! # Authentication Middleware
//!
//! HTTP Basic authentication for the license validation endpoint,
//! checked against the single administrative principal.
//!
//! The password is verified against a salted Argon2id hash and the
//! username is compared in constant time (see
//! [`keygate_core::AdminCredentials::verify`]). Authentication failures
//! are logged with the caller address and rejected before any
//! repository access happens.

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use keygate_core::AdminCredentials;

use crate::error::{ErrorBody, ErrorDetail};
use crate::middleware::client_addr;

/// Admin credentials injected into request extensions for the
/// authentication middleware.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    credentials: AdminCredentials,
}

impl AdminAuth {
    /// Wrap credentials for injection via `Extension`.
    pub fn new(credentials: AdminCredentials) -> Self {
        Self { credentials }
    }
}

/// The authenticated administrative username, injected into request
/// extensions after successful Basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser(pub String);

/// Extract and validate the Basic credentials from the Authorization
/// header.
///
/// Injects [`AdminUser`] into request extensions for downstream
/// handlers. Every rejection path returns 401 with a `WWW-Authenticate`
/// challenge; none of them touches the license repository.
pub async fn basic_auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(auth) = request.extensions().get::<AdminAuth>().cloned() else {
        // Credentials are loaded at startup; a missing extension is an
        // assembly bug, not a caller problem.
        tracing::error!("admin credentials missing from request extensions");
        return crate::error::AppError::Internal("auth not configured".into()).into_response();
    };

    let addr = client_addr(&request);

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(encoded) = header_value.and_then(|v| v.strip_prefix("Basic ")) else {
        tracing::warn!(addr = %addr, "authentication failed: missing or non-Basic authorization header");
        return unauthorized_response("missing or invalid authorization header");
    };

    let Some((username, password)) = decode_basic(encoded) else {
        tracing::warn!(addr = %addr, "authentication failed: malformed Basic credentials");
        return unauthorized_response("malformed Basic credentials");
    };

    if !auth.credentials.verify(&username, &password) {
        tracing::warn!(addr = %addr, "authentication failed: invalid credentials");
        return unauthorized_response("invalid credentials");
    }

    request.extensions_mut().insert(AdminUser(username));
    next.run(request).await
}

/// Decode a Basic credential blob into `(username, password)`.
fn decode_basic(encoded: &str) -> Option<(String, String)> {
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"keygate\"")],
        Json(body),
    )
        .into_response()
}
