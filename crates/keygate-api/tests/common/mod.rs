//! Shared helpers for keygate-api integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use keygate_api::state::{AppConfig, AppState, LicenseStore};
use keygate_core::AdminCredentials;
use keygate_stripe::{StripeClient, StripeConfig};
use sha2::Sha256;

pub const ADMIN_PASSWORD: &str = "hunter2";
pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";

pub fn admin_credentials() -> AdminCredentials {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(ADMIN_PASSWORD.as_bytes(), &salt)
        .unwrap()
        .to_string();
    AdminCredentials::new("admin", hash).unwrap()
}

/// A Stripe client pointed at `api_base` (a mock server in tests).
pub fn stripe_client(api_base: &str) -> StripeClient {
    StripeClient::new(StripeConfig {
        api_base: url::Url::parse(api_base).unwrap(),
        api_key: "sk_test_xxx".to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

/// Application state with no database; `stripe` may point at a mock.
pub fn app_state(stripe: Option<StripeClient>) -> AppState {
    AppState {
        config: AppConfig {
            port: 0,
            https: false,
            logging_enabled: false,
            domain: "keys.example.com".into(),
            database_url: None,
            public_dir: "does-not-exist".into(),
        },
        credentials: admin_credentials(),
        stripe,
        licenses: LicenseStore::new(),
        db: None,
    }
}

pub fn basic_auth_header() -> String {
    format!("Basic {}", BASE64.encode(format!("admin:{ADMIN_PASSWORD}")))
}

/// Compute a valid `stripe-signature` header for `payload`.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}
