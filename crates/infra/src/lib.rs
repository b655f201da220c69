//! Infrastructure layer: tenant-scoped stores, the fee ledger service and
//! the provisioning workflows that span several stores.

pub mod directory;
pub mod error;
pub mod fees;
pub mod provisioning;
pub mod registry;
pub mod store;

pub use directory::{InMemoryPrincipalDirectory, PrincipalDirectory};
pub use error::StoreError;
pub use fees::{
    DEFAULT_MAX_ATTEMPTS, FeeLedger, FeeStore, InMemoryFeeStore, LedgerError, PaymentRequest,
};
pub use provisioning::{ProvisioningError, enroll_student, register_school, withdraw_student};
pub use registry::{InMemoryTenantRegistry, TenantRegistry};
pub use store::{InMemoryTenantStore, TenantStore};
