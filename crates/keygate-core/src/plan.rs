//! Subscription plans and the device entitlement mapping.
//!
//! Plans arrive from the payment provider as free-form metadata strings.
//! [`Plan::parse`] collapses anything unrecognized into [`Plan::Unknown`]
//! rather than rejecting the event — a paid subscription with a
//! misconfigured price still yields a working license.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A subscription plan, as recorded on a license.
///
/// `Unknown` covers plan identifiers the service does not recognize
/// (missing metadata, renamed prices). It is a first-class variant, not an
/// error: licenses on unknown plans get the most permissive entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Monthly subscription.
    Monthly,
    /// Yearly subscription.
    Yearly,
    /// Enterprise subscription.
    Enterprise,
    /// Unrecognized or absent plan identifier.
    Unknown,
}

impl Plan {
    /// Parse a provider plan identifier, falling back to `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            "enterprise" => Self::Enterprise,
            _ => Self::Unknown,
        }
    }

    /// Number of devices a license on this plan may be activated on.
    pub fn devices_allowed(&self) -> i32 {
        match self {
            Self::Monthly => 1,
            Self::Yearly => 3,
            Self::Enterprise => 10,
            Self::Unknown => 10,
        }
    }

    /// The string representation stored and returned by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Enterprise => "enterprise",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
