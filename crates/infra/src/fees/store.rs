//! Fee account storage with compare-and-swap payment commits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use scholaris_core::{AggregateRoot, ExpectedVersion, FeeAccountId, PrincipalId, TenantId};
use scholaris_fees::{FeeAccount, FeePayment};

use crate::StoreError;

pub trait FeeStore: Send + Sync {
    /// Store a freshly opened account. One account per (student, billing period).
    fn open(&self, account: FeeAccount) -> Result<(), StoreError>;

    /// The student's most recently opened account.
    fn account_for_student(&self, tenant_id: TenantId, student_id: PrincipalId)
    -> Result<Option<FeeAccount>, StoreError>;

    /// Atomically replace the account snapshot and append `payment`.
    ///
    /// Fails with [`StoreError::Concurrency`] unless the stored version
    /// matches `expected`; nothing is written in that case.
    fn commit_payment(
        &self,
        next: &FeeAccount,
        expected: ExpectedVersion,
        payment: FeePayment,
    ) -> Result<(), StoreError>;

    /// Remove every account of the student and tombstone its payments.
    /// Returns the removed accounts.
    fn close_for_student(&self, tenant_id: TenantId, student_id: PrincipalId)
    -> Result<Vec<FeeAccount>, StoreError>;

    /// Undo [`FeeStore::close_for_student`].
    fn restore(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
        accounts: Vec<FeeAccount>,
    ) -> Result<(), StoreError>;

    fn accounts(&self, tenant_id: TenantId) -> Result<Vec<FeeAccount>, StoreError>;

    /// Payment rows of the student, including tombstoned ones.
    fn payments_for_student(&self, tenant_id: TenantId, student_id: PrincipalId)
    -> Result<Vec<FeePayment>, StoreError>;
}

impl<S> FeeStore for Arc<S>
where
    S: FeeStore + ?Sized,
{
    fn open(&self, account: FeeAccount) -> Result<(), StoreError> {
        (**self).open(account)
    }

    fn account_for_student(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
    ) -> Result<Option<FeeAccount>, StoreError> {
        (**self).account_for_student(tenant_id, student_id)
    }

    fn commit_payment(
        &self,
        next: &FeeAccount,
        expected: ExpectedVersion,
        payment: FeePayment,
    ) -> Result<(), StoreError> {
        (**self).commit_payment(next, expected, payment)
    }

    fn close_for_student(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
    ) -> Result<Vec<FeeAccount>, StoreError> {
        (**self).close_for_student(tenant_id, student_id)
    }

    fn restore(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
        accounts: Vec<FeeAccount>,
    ) -> Result<(), StoreError> {
        (**self).restore(tenant_id, student_id, accounts)
    }

    fn accounts(&self, tenant_id: TenantId) -> Result<Vec<FeeAccount>, StoreError> {
        (**self).accounts(tenant_id)
    }

    fn payments_for_student(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
    ) -> Result<Vec<FeePayment>, StoreError> {
        (**self).payments_for_student(tenant_id, student_id)
    }
}

#[derive(Debug, Default)]
struct FeeTables {
    /// Value carries an insertion sequence so "most recent" is unambiguous.
    accounts: HashMap<(TenantId, FeeAccountId), (u64, FeeAccount)>,
    payments: Vec<FeePayment>,
    next_seq: u64,
}

/// Accounts and payments live behind one lock so a payment commit is atomic.
#[derive(Debug, Default)]
pub struct InMemoryFeeStore {
    inner: RwLock<FeeTables>,
}

impl InMemoryFeeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owner(account: &FeeAccount) -> Result<(TenantId, PrincipalId), StoreError> {
    match (account.tenant_id(), account.student_id()) {
        (Some(t), Some(s)) => Ok((t, s)),
        _ => Err(StoreError::Domain(scholaris_core::DomainError::invariant(
            "fee account was never opened",
        ))),
    }
}

impl FeeStore for InMemoryFeeStore {
    fn open(&self, account: FeeAccount) -> Result<(), StoreError> {
        let (tenant_id, student_id) = owner(&account)?;
        let mut tables = self.inner.write()?;

        let duplicate = tables.accounts.values().any(|(_, a)| {
            a.tenant_id() == Some(tenant_id)
                && a.student_id() == Some(student_id)
                && a.billing_period() == account.billing_period()
        });
        if duplicate {
            return Err(StoreError::Conflict(
                "fee account already exists for this billing period".into(),
            ));
        }

        tables.next_seq += 1;
        let seq = tables.next_seq;
        tables.accounts.insert((tenant_id, *account.id()), (seq, account));
        Ok(())
    }

    fn account_for_student(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
    ) -> Result<Option<FeeAccount>, StoreError> {
        let tables = self.inner.read()?;
        Ok(tables
            .accounts
            .iter()
            .filter(|((t, _), (_, a))| *t == tenant_id && a.student_id() == Some(student_id))
            .max_by_key(|(_, (seq, _))| *seq)
            .map(|(_, (_, a))| a.clone()))
    }

    fn commit_payment(
        &self,
        next: &FeeAccount,
        expected: ExpectedVersion,
        payment: FeePayment,
    ) -> Result<(), StoreError> {
        let (tenant_id, student_id) = owner(next)?;
        if payment.tenant_id != tenant_id
            || payment.student_id != student_id
            || payment.fee_account_id != *next.id()
        {
            return Err(StoreError::Domain(scholaris_core::DomainError::invariant(
                "payment does not belong to the account",
            )));
        }

        let mut guard = self.inner.write()?;
        let tables = &mut *guard;
        let (_, stored) = tables
            .accounts
            .get_mut(&(tenant_id, *next.id()))
            .ok_or(StoreError::NotFound)?;

        expected
            .check(stored.version())
            .map_err(|e| StoreError::Concurrency(e.to_string()))?;

        *stored = next.clone();
        tables.payments.push(payment);
        Ok(())
    }

    fn close_for_student(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
    ) -> Result<Vec<FeeAccount>, StoreError> {
        let mut tables = self.inner.write()?;

        let keys: Vec<_> = tables
            .accounts
            .iter()
            .filter(|((t, _), (_, a))| *t == tenant_id && a.student_id() == Some(student_id))
            .map(|(k, _)| *k)
            .collect();

        let mut removed: Vec<(u64, FeeAccount)> = keys
            .iter()
            .filter_map(|k| tables.accounts.remove(k))
            .collect();
        removed.sort_by_key(|(seq, _)| *seq);

        for p in tables
            .payments
            .iter_mut()
            .filter(|p| p.tenant_id == tenant_id && p.student_id == student_id)
        {
            p.student_deleted = true;
        }

        Ok(removed.into_iter().map(|(_, a)| a).collect())
    }

    fn restore(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
        accounts: Vec<FeeAccount>,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.write()?;
        for account in accounts {
            if account.tenant_id() != Some(tenant_id) || account.student_id() != Some(student_id) {
                continue;
            }
            tables.next_seq += 1;
            let seq = tables.next_seq;
            tables.accounts.insert((tenant_id, *account.id()), (seq, account));
        }
        for p in tables
            .payments
            .iter_mut()
            .filter(|p| p.tenant_id == tenant_id && p.student_id == student_id)
        {
            p.student_deleted = false;
        }
        Ok(())
    }

    fn accounts(&self, tenant_id: TenantId) -> Result<Vec<FeeAccount>, StoreError> {
        let tables = self.inner.read()?;
        let mut out: Vec<&(u64, FeeAccount)> = tables
            .accounts
            .iter()
            .filter(|((t, _), _)| *t == tenant_id)
            .map(|(_, v)| v)
            .collect();
        out.sort_by_key(|(seq, _)| *seq);
        Ok(out.into_iter().map(|(_, a)| a.clone()).collect())
    }

    fn payments_for_student(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
    ) -> Result<Vec<FeePayment>, StoreError> {
        let tables = self.inner.read()?;
        Ok(tables
            .payments
            .iter()
            .filter(|p| p.tenant_id == tenant_id && p.student_id == student_id)
            .cloned()
            .collect())
    }
}
