//! Multi-store workflows with compensating steps.
//!
//! Each workflow runs its steps in order; when a later step fails, the
//! earlier ones are undone before the error is returned. A failing
//! compensation is logged and the first error is still returned.

use chrono::{DateTime, Utc};
use thiserror::Error;

use scholaris_auth::{Principal, Role};
use scholaris_core::{DomainError, Money, PrincipalId, TenantId};
use scholaris_fees::FeeAccount;
use scholaris_tenancy::Tenant;

use crate::{FeeLedger, FeeStore, LedgerError, PrincipalDirectory, StoreError, TenantRegistry};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Create a student principal together with its first fee account.
///
/// 1. insert principal
/// 2. open fee account (on failure: remove the principal)
pub fn enroll_student<S: FeeStore>(
    directory: &dyn PrincipalDirectory,
    ledger: &FeeLedger<S>,
    student: Principal,
    total_fee: Money,
    billing_period: &str,
    now: DateTime<Utc>,
) -> Result<(Principal, FeeAccount), ProvisioningError> {
    let tenant_id = match (student.role(), student.tenant_id()) {
        (Role::Student, Some(t)) => t,
        _ => return Err(DomainError::invariant("only a tenant's student can be enrolled").into()),
    };

    directory.insert(student.clone())?;

    match ledger.open_account(tenant_id, student.id(), total_fee, billing_period, now) {
        Ok(account) => Ok((student, account)),
        Err(e) => {
            if let Err(undo) = directory.remove(tenant_id, student.id()) {
                tracing::error!(
                    tenant_id = %tenant_id,
                    student_id = %student.id(),
                    error = %undo,
                    "enrollment compensation failed; student left without fee account"
                );
            }
            Err(e.into())
        }
    }
}

/// Delete a student and close its fee accounts.
///
/// 1. close fee accounts (payments are tombstoned, not deleted)
/// 2. remove principal (on failure: restore the accounts)
pub fn withdraw_student<S: FeeStore>(
    directory: &dyn PrincipalDirectory,
    ledger: &FeeLedger<S>,
    tenant_id: TenantId,
    student_id: PrincipalId,
) -> Result<Principal, ProvisioningError> {
    let closed = ledger.close_account(tenant_id, student_id)?;

    match directory.remove(tenant_id, student_id) {
        Ok(principal) => Ok(principal),
        Err(e) => {
            if let Err(undo) = ledger.reopen(tenant_id, student_id, closed) {
                tracing::error!(
                    tenant_id = %tenant_id,
                    student_id = %student_id,
                    error = %undo,
                    "withdrawal compensation failed; fee accounts lost"
                );
            }
            Err(e.into())
        }
    }
}

/// Register a school together with its first admin.
///
/// 1. create tenant
/// 2. insert admin (on failure: remove the tenant)
pub fn register_school(
    registry: &dyn TenantRegistry,
    directory: &dyn PrincipalDirectory,
    tenant: Tenant,
    admin: Principal,
) -> Result<(Tenant, Principal), ProvisioningError> {
    if admin.role() != Role::Admin || admin.tenant_id() != Some(tenant.id()) {
        return Err(DomainError::invariant("first principal must be the school's admin").into());
    }

    registry.create(tenant.clone())?;

    match directory.insert(admin.clone()) {
        Ok(()) => Ok((tenant, admin)),
        Err(e) => {
            if let Err(undo) = registry.remove(tenant.id()) {
                tracing::error!(
                    tenant_id = %tenant.id(),
                    error = %undo,
                    "registration compensation failed; school left without admin"
                );
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use scholaris_auth::NewPrincipal;
    use scholaris_core::{ClassId, ExpectedVersion};
    use scholaris_fees::FeePayment;
    use scholaris_tenancy::NewTenant;

    use crate::{InMemoryFeeStore, InMemoryPrincipalDirectory, InMemoryTenantRegistry};

    /// Fee store whose `open` always fails.
    struct RefusingFeeStore(InMemoryFeeStore);

    impl FeeStore for RefusingFeeStore {
        fn open(&self, _account: FeeAccount) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("fee store offline".into()))
        }
        fn account_for_student(&self, t: TenantId, s: PrincipalId) -> Result<Option<FeeAccount>, StoreError> {
            self.0.account_for_student(t, s)
        }
        fn commit_payment(&self, n: &FeeAccount, e: ExpectedVersion, p: FeePayment) -> Result<(), StoreError> {
            self.0.commit_payment(n, e, p)
        }
        fn close_for_student(&self, t: TenantId, s: PrincipalId) -> Result<Vec<FeeAccount>, StoreError> {
            self.0.close_for_student(t, s)
        }
        fn restore(&self, t: TenantId, s: PrincipalId, a: Vec<FeeAccount>) -> Result<(), StoreError> {
            self.0.restore(t, s, a)
        }
        fn accounts(&self, t: TenantId) -> Result<Vec<FeeAccount>, StoreError> {
            self.0.accounts(t)
        }
        fn payments_for_student(&self, t: TenantId, s: PrincipalId) -> Result<Vec<FeePayment>, StoreError> {
            self.0.payments_for_student(t, s)
        }
    }

    fn principal(role: Role, tenant: TenantId, email: &str) -> Principal {
        Principal::new_member(
            NewPrincipal {
                role,
                tenant_id: tenant,
                name: "Sam".into(),
                email: email.into(),
                class_id: (role == Role::Student).then(ClassId::new),
                password_hash: "h".into(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn school() -> Tenant {
        Tenant::register_trial(
            NewTenant {
                name: "Greenfield".into(),
                contact_email: "office@greenfield.test".into(),
                address: "1 Main St".into(),
                phone_number: "555-0100".into(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn enrollment_creates_principal_and_account() {
        let dir = InMemoryPrincipalDirectory::new();
        let ledger = FeeLedger::new(Arc::new(InMemoryFeeStore::new()), 8);
        let t = TenantId::new();

        let (student, account) = enroll_student(
            &dir,
            &ledger,
            principal(Role::Student, t, "sam@school.test"),
            Money::from_minor(500),
            "2025",
            Utc::now(),
        )
        .unwrap();

        assert!(dir.get_in_tenant(t, student.id()).unwrap().is_some());
        assert_eq!(account.student_id(), Some(student.id()));
        assert_eq!(account.remaining_amount(), Money::from_minor(500));
    }

    #[test]
    fn failed_account_opening_removes_the_student() {
        let dir = InMemoryPrincipalDirectory::new();
        let ledger = FeeLedger::new(RefusingFeeStore(InMemoryFeeStore::new()), 8);
        let t = TenantId::new();
        let student = principal(Role::Student, t, "sam@school.test");
        let id = student.id();

        let err = enroll_student(&dir, &ledger, student, Money::ZERO, "2025", Utc::now()).unwrap_err();
        assert!(matches!(err, ProvisioningError::Ledger(LedgerError::Store(_))));
        assert!(dir.get(id).unwrap().is_none());
    }

    #[test]
    fn negative_fee_rolls_back_enrollment() {
        let dir = InMemoryPrincipalDirectory::new();
        let ledger = FeeLedger::new(Arc::new(InMemoryFeeStore::new()), 8);
        let student = principal(Role::Student, TenantId::new(), "sam@school.test");
        let id = student.id();

        let err = enroll_student(&dir, &ledger, student, Money::from_minor(-1), "2025", Utc::now())
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::Ledger(LedgerError::Validation(_))));
        assert!(dir.get(id).unwrap().is_none());
    }

    #[test]
    fn only_students_are_enrolled() {
        let dir = InMemoryPrincipalDirectory::new();
        let ledger = FeeLedger::new(Arc::new(InMemoryFeeStore::new()), 8);
        let teacher = principal(Role::Teacher, TenantId::new(), "tia@school.test");
        assert!(enroll_student(&dir, &ledger, teacher, Money::ZERO, "2025", Utc::now()).is_err());
    }

    #[test]
    fn withdrawal_closes_accounts_and_removes_student() {
        let dir = InMemoryPrincipalDirectory::new();
        let ledger = FeeLedger::new(Arc::new(InMemoryFeeStore::new()), 8);
        let t = TenantId::new();
        let (student, _) = enroll_student(
            &dir,
            &ledger,
            principal(Role::Student, t, "sam@school.test"),
            Money::from_minor(500),
            "2025",
            Utc::now(),
        )
        .unwrap();

        withdraw_student(&dir, &ledger, t, student.id()).unwrap();
        assert!(dir.get(student.id()).unwrap().is_none());
        assert!(ledger.accounts(t).unwrap().is_empty());
    }

    #[test]
    fn withdrawal_of_unknown_student_restores_nothing_and_fails() {
        let dir = InMemoryPrincipalDirectory::new();
        let ledger = FeeLedger::new(Arc::new(InMemoryFeeStore::new()), 8);
        let t = TenantId::new();
        let orphan = PrincipalId::new();
        ledger.open_account(t, orphan, Money::from_minor(100), "2025", Utc::now()).unwrap();

        let err = withdraw_student(&dir, &ledger, t, orphan).unwrap_err();
        assert_eq!(err, ProvisioningError::Store(StoreError::NotFound));
        // The account closed in step 1 was put back.
        assert_eq!(ledger.accounts(t).unwrap().len(), 1);
    }

    #[test]
    fn registration_rolls_back_tenant_when_admin_email_is_taken() {
        let reg = InMemoryTenantRegistry::new();
        let dir = InMemoryPrincipalDirectory::new();
        dir.insert(principal(Role::Teacher, TenantId::new(), "ada@greenfield.test"))
            .unwrap();

        let tenant = school();
        let tenant_id = tenant.id();
        let admin = principal(Role::Admin, tenant_id, "ada@greenfield.test");

        let err = register_school(&reg, &dir, tenant, admin).unwrap_err();
        assert!(matches!(err, ProvisioningError::Store(StoreError::Conflict(_))));
        assert!(reg.get(tenant_id).unwrap().is_none());
    }

    #[test]
    fn registration_requires_own_admin() {
        let reg = InMemoryTenantRegistry::new();
        let dir = InMemoryPrincipalDirectory::new();
        let tenant = school();
        let stranger = principal(Role::Admin, TenantId::new(), "ada@greenfield.test");
        assert!(register_school(&reg, &dir, tenant, stranger).is_err());
        assert!(reg.list().unwrap().is_empty());
    }
}
