use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use scholaris_auth::normalize_email;
use scholaris_core::{DomainError, TenantId};

/// Length of the self-service trial subscription.
pub const TRIAL_DAYS: i64 = 30;

/// A school. Every tenant-scoped record carries its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    id: TenantId,
    pub name: String,
    #[serde(rename = "email")]
    pub contact_email: String,
    pub address: String,
    pub phone_number: String,
    is_active: bool,
    pub subscription_start: DateTime<Utc>,
    pub subscription_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub contact_email: String,
    pub address: String,
    pub phone_number: String,
}

impl Tenant {
    /// Superadmin-created school with an explicit subscription end.
    pub fn new(
        input: NewTenant,
        subscription_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if subscription_end <= now {
            return Err(DomainError::validation(
                "subscription end must be in the future",
            ));
        }

        let required = |value: &str, field: &str| -> Result<String, DomainError> {
            let value = value.trim();
            if value.is_empty() {
                return Err(DomainError::validation(format!("{field} cannot be empty")));
            }
            Ok(value.to_string())
        };

        Ok(Self {
            id: TenantId::new(),
            name: required(&input.name, "school name")?,
            contact_email: normalize_email(&input.contact_email)?,
            address: required(&input.address, "address")?,
            phone_number: required(&input.phone_number, "phone number")?,
            is_active: true,
            subscription_start: now,
            subscription_end,
            created_at: now,
        })
    }

    /// Self-service registration: active, with a [`TRIAL_DAYS`] trial.
    pub fn register_trial(input: NewTenant, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Self::new(input, now + Duration::days(TRIAL_DAYS), now)
    }

    pub fn id(&self) -> TenantId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Flip the activation flag; returns the new state.
    pub fn toggle_active(&mut self) -> bool {
        self.is_active = !self.is_active;
        self.is_active
    }

    /// Extend the subscription by `days`, counted from whichever is later:
    /// the current end or `now` (an expired school restarts from today).
    pub fn renew(&mut self, days: i64, now: DateTime<Utc>) -> Result<(), DomainError> {
        if days <= 0 {
            return Err(DomainError::validation("renewal must be at least one day"));
        }
        let base = self.subscription_end.max(now);
        self.subscription_end = base + Duration::days(days);
        Ok(())
    }

    /// Case-insensitive name comparison used for global uniqueness.
    pub fn same_name(&self, other: &str) -> bool {
        self.name.to_lowercase() == other.trim().to_lowercase()
    }
}
