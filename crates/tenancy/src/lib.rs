//! `scholaris-tenancy`: schools as tenants, and the two gates every
//! tenant-scoped request passes: isolation, then subscription.

pub mod isolation;
pub mod subscription;
pub mod tenant;

pub use isolation::{EffectiveTenant, IsolationError, resolve_effective_tenant, resolve_requested};
pub use subscription::{
    SubscriptionError, SubscriptionStatus, WARNING_WINDOW_DAYS, check_subscription, evaluate,
};
pub use tenant::{NewTenant, TRIAL_DAYS, Tenant};
