//! Administrative credential storage and verification.
//!
//! The service has exactly one administrative principal, used to
//! authenticate callers of the license validation endpoint. The stored
//! secret is an Argon2id PHC-format hash. Verification is the only
//! operation on it: the hash is never reversed and never logged.

use argon2::password_hash::PasswordHash;
use argon2::{Argon2, PasswordVerifier};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors raised while loading or verifying administrative credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The credential file could not be read.
    #[error("failed to read credential file {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The credential file did not contain a `username:hash` line.
    #[error("credential file is malformed: expected a single `username:hash` line")]
    Malformed,

    /// The stored hash is not a valid PHC string.
    #[error("stored password hash is not a valid PHC string")]
    InvalidHash,
}

/// The singleton administrative identity: a username and a salted
/// one-way password hash.
///
/// Custom `Debug` redacts the hash so the credential can never leak
/// through log output.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password_hash: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

impl AdminCredentials {
    /// Build credentials from a username and an Argon2id PHC hash string.
    ///
    /// The hash is parsed eagerly so a malformed value fails at startup
    /// rather than on the first authentication attempt.
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let password_hash = password_hash.into();
        PasswordHash::new(&password_hash).map_err(|_| CredentialError::InvalidHash)?;
        Ok(Self {
            username: username.into(),
            password_hash,
        })
    }

    /// Load credentials from a file holding a single `username:hash` line.
    ///
    /// PHC strings use `$` separators, so splitting on the first `:` is
    /// unambiguous.
    pub fn from_file(path: &str) -> Result<Self, CredentialError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.to_string(),
            source,
        })?;
        let line = contents.trim();
        let (username, hash) = line.split_once(':').ok_or(CredentialError::Malformed)?;
        if username.is_empty() || hash.is_empty() {
            return Err(CredentialError::Malformed);
        }
        Self::new(username, hash)
    }

    /// Verify a username/password pair against the stored credential.
    ///
    /// The username comparison is constant-time, and the password hash is
    /// always verified even when the username already failed, so the two
    /// rejection paths are indistinguishable by timing.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_ok = constant_time_str_eq(username, &self.username);

        let password_ok = PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false);

        username_ok && password_ok
    }

    /// The administrative username.
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Constant-time string equality.
///
/// When lengths differ, performs a dummy comparison to avoid leaking
/// length information through timing variance.
fn constant_time_str_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}
