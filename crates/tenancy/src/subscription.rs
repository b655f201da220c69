//! Subscription gate: evaluated fresh on every request, never cached.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use scholaris_auth::Principal;

use crate::Tenant;

/// Days before `subscription_end` at which requests start carrying a warning.
pub const WARNING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    /// Still admitted; `days_left` is rounded up to whole days.
    Warning { days_left: i64 },
    Inactive,
    Expired,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("account deactivated: please contact support")]
    Deactivated,

    #[error("subscription expired: please renew to continue")]
    Expired,
}

/// Classify a tenant at `now`. Deactivation wins over expiry.
pub fn evaluate(tenant: &Tenant, now: DateTime<Utc>) -> SubscriptionStatus {
    if !tenant.is_active() {
        return SubscriptionStatus::Inactive;
    }
    if now >= tenant.subscription_end {
        return SubscriptionStatus::Expired;
    }

    let left = tenant.subscription_end - now;
    if left <= Duration::days(WARNING_WINDOW_DAYS) {
        let secs = left.num_seconds();
        let days_left = (secs + 86_399) / 86_400;
        return SubscriptionStatus::Warning { days_left };
    }
    SubscriptionStatus::Active
}

impl SubscriptionStatus {
    /// Admit or reject; admitted statuses pass through.
    pub fn admit(self) -> Result<SubscriptionStatus, SubscriptionError> {
        match self {
            SubscriptionStatus::Inactive => Err(SubscriptionError::Deactivated),
            SubscriptionStatus::Expired => Err(SubscriptionError::Expired),
            ok => Ok(ok),
        }
    }

    pub fn warning_days(&self) -> Option<i64> {
        match self {
            SubscriptionStatus::Warning { days_left } => Some(*days_left),
            _ => None,
        }
    }
}

/// Gate a principal against its tenant. Superadmins bypass (`Active`).
///
/// `tenant` is the freshly loaded record for the principal's own tenant;
/// resolving a missing record to an error is the caller's job.
pub fn check_subscription(
    principal: &Principal,
    tenant: &Tenant,
    now: DateTime<Utc>,
) -> Result<SubscriptionStatus, SubscriptionError> {
    if principal.is_superadmin() {
        return Ok(SubscriptionStatus::Active);
    }
    evaluate(tenant, now).admit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewTenant;
    use scholaris_auth::{NewPrincipal, Role};

    fn tenant_ending_in(delta: Duration) -> (Tenant, DateTime<Utc>) {
        let now = Utc::now();
        let mut t = Tenant::register_trial(
            NewTenant {
                name: "Greenfield".into(),
                contact_email: "office@greenfield.test".into(),
                address: "1 Main St".into(),
                phone_number: "555-0100".into(),
            },
            now,
        )
        .unwrap();
        t.subscription_end = now + delta;
        (t, now)
    }

    fn admin_of(t: &Tenant) -> Principal {
        Principal::new_member(
            NewPrincipal {
                role: Role::Admin,
                tenant_id: t.id(),
                name: "Ada".into(),
                email: "ada@greenfield.test".into(),
                class_id: None,
                password_hash: "h".into(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn far_end_is_active() {
        let (t, now) = tenant_ending_in(Duration::days(20));
        assert_eq!(evaluate(&t, now), SubscriptionStatus::Active);
    }

    #[test]
    fn three_days_left_warns_and_admits() {
        let (t, now) = tenant_ending_in(Duration::days(3));
        let status = check_subscription(&admin_of(&t), &t, now).unwrap();
        assert_eq!(status, SubscriptionStatus::Warning { days_left: 3 });
        assert_eq!(status.warning_days(), Some(3));
    }

    #[test]
    fn warning_window_boundary_is_inclusive() {
        let (t, now) = tenant_ending_in(Duration::days(WARNING_WINDOW_DAYS));
        assert_eq!(evaluate(&t, now), SubscriptionStatus::Warning { days_left: 7 });

        let (t, now) = tenant_ending_in(Duration::days(WARNING_WINDOW_DAYS) + Duration::seconds(1));
        assert_eq!(evaluate(&t, now), SubscriptionStatus::Active);
    }

    #[test]
    fn ended_yesterday_is_expired() {
        let (t, now) = tenant_ending_in(Duration::days(-1));
        assert_eq!(
            check_subscription(&admin_of(&t), &t, now),
            Err(SubscriptionError::Expired)
        );
    }

    #[test]
    fn end_instant_itself_is_expired() {
        let (t, now) = tenant_ending_in(Duration::zero());
        assert_eq!(evaluate(&t, now), SubscriptionStatus::Expired);
    }

    #[test]
    fn deactivation_is_reported_before_expiry() {
        let (mut t, now) = tenant_ending_in(Duration::days(-1));
        t.toggle_active();
        assert_eq!(evaluate(&t, now), SubscriptionStatus::Inactive);
        let err = check_subscription(&admin_of(&t), &t, now).unwrap_err();
        assert_eq!(err, SubscriptionError::Deactivated);
        assert!(err.to_string().contains("account deactivated"));
    }

    #[test]
    fn superadmin_bypasses_even_a_dead_tenant() {
        let (mut t, now) = tenant_ending_in(Duration::days(-10));
        t.toggle_active();
        let root = Principal::superadmin("Root", "root@platform.test", "h".into(), now).unwrap();
        assert_eq!(check_subscription(&root, &t, now), Ok(SubscriptionStatus::Active));
    }
}
