//! License records and key generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::plan::Plan;

/// Generate a fresh license key.
///
/// Keys are UUID v4 in canonical hyphenated form. Uniqueness holds with
/// overwhelming probability; the repository's unique constraint on
/// `license_key` is the backstop.
pub fn generate_license_key() -> String {
    Uuid::new_v4().to_string()
}

/// One issued entitlement: a customer's right to run the software on
/// `devices_allowed` devices under `plan`.
///
/// `referer` and `user_agent` are provenance captured from the webhook
/// delivery that created the license. They are internal — the validation
/// endpoint never returns them, and neither is `customer_id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct License {
    /// Unique, server-generated key. Primary lookup identifier.
    pub license_key: String,
    /// Payment-provider customer identifier. Not unique across history.
    pub customer_id: String,
    /// Plan the subscription was purchased under.
    pub plan: Plan,
    /// Device entitlement, derived from `plan` at creation time.
    pub devices_allowed: i32,
    /// `Referer` header of the creating webhook delivery.
    pub referer: String,
    /// `User-Agent` header of the creating webhook delivery.
    pub user_agent: String,
    /// Device fingerprint bound at checkout; must match on validation.
    pub fingerprint: String,
    /// Creation timestamp. Set once, never mutated.
    pub created_at: DateTime<Utc>,
}

impl License {
    /// Issue a new license for `customer_id` under `plan`.
    ///
    /// The key is generated here and `devices_allowed` is derived from the
    /// plan mapping; callers supply only what the webhook event carried.
    pub fn issue(
        customer_id: impl Into<String>,
        plan: Plan,
        fingerprint: impl Into<String>,
        referer: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            license_key: generate_license_key(),
            customer_id: customer_id.into(),
            plan,
            devices_allowed: plan.devices_allowed(),
            referer: referer.into(),
            user_agent: user_agent.into(),
            fingerprint: fingerprint.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique_and_uuid_shaped() {
        let a = generate_license_key();
        let b = generate_license_key();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert!(Uuid::parse_str(&b).is_ok());
    }

    #[test]
    fn issue_derives_devices_from_plan() {
        let license = License::issue("cus_1", Plan::Yearly, "fp-abc", "unknown", "unknown");
        assert_eq!(license.devices_allowed, 3);
        assert_eq!(license.plan, Plan::Yearly);
        assert_eq!(license.customer_id, "cus_1");
        assert_eq!(license.fingerprint, "fp-abc");
    }

    #[test]
    fn issue_generates_distinct_keys() {
        let a = License::issue("cus_1", Plan::Monthly, "fp", "unknown", "unknown");
        let b = License::issue("cus_1", Plan::Monthly, "fp", "unknown", "unknown");
        assert_ne!(a.license_key, b.license_key);
    }
}
