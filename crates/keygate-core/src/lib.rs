#![deny(missing_docs)]

//! # keygate-core — Foundational Types for keygate
//!
//! This crate defines the domain types the service layer depends on. It has
//! no internal crate dependencies — only `serde`, `thiserror`, `chrono`,
//! `uuid`, `subtle`, and `argon2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Closed plan enumeration.** [`Plan`] has four variants with an explicit
//!    `Unknown` fallback; the device entitlement mapping lives in exactly one
//!    `match`. No free-form plan strings can diverge from it.
//!
//! 2. **Licenses are created whole.** A [`License`] carries its derived
//!    `devices_allowed` from the moment of construction; there is no partially
//!    initialized state and no update-in-place of immutable fields.
//!
//! 3. **Credential verification only.** [`AdminCredentials`] holds a salted
//!    one-way hash and exposes a verify operation. The plaintext password is
//!    never stored, returned, or logged.

pub mod credentials;
pub mod license;
pub mod plan;

pub use credentials::{AdminCredentials, CredentialError};
pub use license::{generate_license_key, License};
pub use plan::Plan;
