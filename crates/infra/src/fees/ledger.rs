//! Fee ledger service: the only writer of fee balances.
//!
//! ```text
//! RecordPayment
//!   ↓
//! 1. Load the student's current account (tenant-scoped)
//!   ↓
//! 2. Handle the command (pure; overflow and amount checks)
//!   ↓
//! 3. Apply the event to a copy of the snapshot
//!   ↓
//! 4. Compare-and-swap the snapshot + append the payment row
//!   ↓ (lost the race → reload and retry, bounded)
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

use scholaris_core::{
    Aggregate, AggregateRoot, DomainError, ExpectedVersion, FeeAccountId, Money, PaymentId,
    PrincipalId, TenantId,
};
use scholaris_fees::{
    FeeAccount, FeeAggregate, FeeCommand, FeeEvent, FeePayment, FeeStatement, OpenAccount,
    PaymentMethod, RecordPayment,
};

use crate::{FeeStore, StoreError};

/// Attempts made before a contended payment is reported as a conflict.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("fee record not found for this student")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("ledger invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::InvariantViolation(msg) | DomainError::Unauthorized(msg) => {
                LedgerError::Invariant(msg)
            }
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
            DomainError::NotFound => LedgerError::NotFound,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => LedgerError::NotFound,
            StoreError::Conflict(msg) | StoreError::Concurrency(msg) => LedgerError::Conflict(msg),
            StoreError::Domain(e) => e.into(),
            other => LedgerError::Store(other),
        }
    }
}

/// A payment as requested by an administration user.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub tenant_id: TenantId,
    pub student_id: PrincipalId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub note: Option<String>,
    pub recorded_by: PrincipalId,
}

#[derive(Debug)]
pub struct FeeLedger<S> {
    store: S,
    max_attempts: u32,
}

impl<S> FeeLedger<S> {
    pub fn new(store: S, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: FeeStore> FeeLedger<S> {
    pub fn open_account(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
        total: Money,
        billing_period: &str,
        now: DateTime<Utc>,
    ) -> Result<FeeAccount, LedgerError> {
        let account_id = FeeAccountId::new();
        let mut account = FeeAccount::empty(account_id);
        let events = account.handle(&FeeCommand::OpenAccount(OpenAccount {
            tenant_id,
            account_id,
            student_id,
            total_amount: total,
            billing_period: billing_period.to_string(),
            occurred_at: now,
        }))?;
        for e in &events {
            account.apply(e);
        }

        self.store.open(account.clone())?;
        tracing::info!(
            tenant_id = %tenant_id,
            student_id = %student_id,
            account_id = %account_id,
            total = total.minor(),
            "fee account opened"
        );
        Ok(account)
    }

    /// Record a payment against the student's current account.
    ///
    /// Returns the appended payment and the account as committed.
    pub fn record_payment(
        &self,
        request: PaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<(FeePayment, FeeAccount), LedgerError> {
        let payment_id = PaymentId::new();

        for attempt in 1..=self.max_attempts {
            let current = self
                .store
                .account_for_student(request.tenant_id, request.student_id)?
                .ok_or(LedgerError::NotFound)?;
            let expected = ExpectedVersion::Exact(current.version());

            let events = current.handle(&FeeCommand::RecordPayment(RecordPayment {
                tenant_id: request.tenant_id,
                account_id: *current.id(),
                payment_id,
                amount: request.amount,
                method: request.method,
                recorded_by: request.recorded_by,
                note: request.note.clone(),
                occurred_at: now,
            }))?;

            let mut next = current;
            for e in &events {
                next.apply(e);
            }
            let payment = events
                .iter()
                .find_map(|e| match e {
                    FeeEvent::PaymentRecorded(p) => Some(FeePayment::from(p)),
                    _ => None,
                })
                .ok_or_else(|| LedgerError::Invariant("payment produced no ledger entry".into()))?;

            match self.store.commit_payment(&next, expected, payment.clone()) {
                Ok(()) => {
                    tracing::info!(
                        tenant_id = %request.tenant_id,
                        student_id = %request.student_id,
                        payment_id = %payment_id,
                        amount = request.amount.minor(),
                        remaining = next.remaining_amount().minor(),
                        attempt,
                        "fee payment recorded"
                    );
                    return Ok((payment, next));
                }
                Err(StoreError::Concurrency(reason)) => {
                    tracing::debug!(attempt, %reason, "fee account write lost a race; retrying");
                    std::thread::yield_now();
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            tenant_id = %request.tenant_id,
            student_id = %request.student_id,
            attempts = self.max_attempts,
            "fee payment abandoned under contention"
        );
        Err(LedgerError::Conflict(format!(
            "fee account is busy; payment not recorded after {} attempts",
            self.max_attempts
        )))
    }

    /// Remove the student's accounts; payment history stays, tombstoned.
    pub fn close_account(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
    ) -> Result<Vec<FeeAccount>, LedgerError> {
        let closed = self.store.close_for_student(tenant_id, student_id)?;
        tracing::info!(
            tenant_id = %tenant_id,
            student_id = %student_id,
            accounts = closed.len(),
            "fee accounts closed"
        );
        Ok(closed)
    }

    pub fn reopen(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
        accounts: Vec<FeeAccount>,
    ) -> Result<(), LedgerError> {
        Ok(self.store.restore(tenant_id, student_id, accounts)?)
    }

    pub fn aggregate(&self, tenant_id: TenantId) -> Result<FeeAggregate, LedgerError> {
        let accounts = self.store.accounts(tenant_id)?;
        Ok(FeeAggregate::from_accounts(&accounts)?)
    }

    pub fn accounts(&self, tenant_id: TenantId) -> Result<Vec<FeeAccount>, LedgerError> {
        Ok(self.store.accounts(tenant_id)?)
    }

    /// Current account plus payment history, newest first. `None` when the
    /// student has no account.
    pub fn statement(
        &self,
        tenant_id: TenantId,
        student_id: PrincipalId,
    ) -> Result<Option<FeeStatement>, LedgerError> {
        let Some(account) = self.store.account_for_student(tenant_id, student_id)? else {
            return Ok(None);
        };
        let payments = self.store.payments_for_student(tenant_id, student_id)?;
        Ok(Some(FeeStatement::new(account, payments)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryFeeStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn ledger() -> FeeLedger<Arc<InMemoryFeeStore>> {
        FeeLedger::new(Arc::new(InMemoryFeeStore::new()), DEFAULT_MAX_ATTEMPTS)
    }

    fn request(tenant_id: TenantId, student_id: PrincipalId, amount: i64) -> PaymentRequest {
        PaymentRequest {
            tenant_id,
            student_id,
            amount: Money::from_minor(amount),
            method: PaymentMethod::Cash,
            note: None,
            recorded_by: PrincipalId::new(),
        }
    }

    #[test]
    fn partial_payments_and_overpayment() {
        let l = ledger();
        let (t, s) = (TenantId::new(), PrincipalId::new());
        l.open_account(t, s, Money::from_minor(500), "2025-T1", Utc::now()).unwrap();

        l.record_payment(request(t, s, 200), Utc::now()).unwrap();
        let (_, acc) = l.record_payment(request(t, s, 150), Utc::now()).unwrap();
        assert_eq!(acc.remaining_amount(), Money::from_minor(150));

        let (payment, acc) = l.record_payment(request(t, s, 200), Utc::now()).unwrap();
        assert_eq!(payment.amount, Money::from_minor(200));
        assert_eq!(acc.paid_amount(), Money::from_minor(550));
        assert_eq!(acc.remaining_amount(), Money::from_minor(-50));

        let st = l.statement(t, s).unwrap().unwrap();
        assert_eq!(st.payments.len(), 3);
        assert_eq!(st.account, acc);
    }

    #[test]
    fn payment_without_account_is_not_found() {
        let l = ledger();
        assert_eq!(
            l.record_payment(request(TenantId::new(), PrincipalId::new(), 10), Utc::now()),
            Err(LedgerError::NotFound)
        );
    }

    #[test]
    fn payment_in_another_tenant_does_not_see_the_account() {
        let l = ledger();
        let (t, s) = (TenantId::new(), PrincipalId::new());
        l.open_account(t, s, Money::from_minor(500), "2025", Utc::now()).unwrap();
        assert_eq!(
            l.record_payment(request(TenantId::new(), s, 10), Utc::now()),
            Err(LedgerError::NotFound)
        );
    }

    #[test]
    fn non_positive_amount_is_validation_and_writes_nothing() {
        let l = ledger();
        let (t, s) = (TenantId::new(), PrincipalId::new());
        l.open_account(t, s, Money::from_minor(500), "2025", Utc::now()).unwrap();

        assert!(matches!(
            l.record_payment(request(t, s, 0), Utc::now()),
            Err(LedgerError::Validation(_))
        ));
        let st = l.statement(t, s).unwrap().unwrap();
        assert!(st.payments.is_empty());
        assert_eq!(st.account.version(), 1);
    }

    #[test]
    fn duplicate_period_is_a_conflict_but_new_period_is_current() {
        let l = ledger();
        let (t, s) = (TenantId::new(), PrincipalId::new());
        l.open_account(t, s, Money::from_minor(500), "2025-T1", Utc::now()).unwrap();
        assert!(matches!(
            l.open_account(t, s, Money::from_minor(500), "2025-T1", Utc::now()),
            Err(LedgerError::Conflict(_))
        ));

        let t2 = l.open_account(t, s, Money::from_minor(300), "2025-T2", Utc::now()).unwrap();
        let (_, acc) = l.record_payment(request(t, s, 100), Utc::now()).unwrap();
        assert_eq!(acc.id(), t2.id());
        assert_eq!(acc.remaining_amount(), Money::from_minor(200));
    }

    #[test]
    fn empty_tenant_aggregate_is_zero() {
        assert_eq!(ledger().aggregate(TenantId::new()).unwrap(), FeeAggregate::default());
    }

    #[test]
    fn close_keeps_tombstoned_history_and_reopen_restores() {
        let l = ledger();
        let (t, s) = (TenantId::new(), PrincipalId::new());
        l.open_account(t, s, Money::from_minor(500), "2025", Utc::now()).unwrap();
        l.record_payment(request(t, s, 100), Utc::now()).unwrap();

        let closed = l.close_account(t, s).unwrap();
        assert_eq!(closed.len(), 1);
        assert!(l.statement(t, s).unwrap().is_none());
        assert_eq!(l.aggregate(t).unwrap(), FeeAggregate::default());

        let history = l.store().payments_for_student(t, s).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].student_deleted);

        l.reopen(t, s, closed).unwrap();
        let st = l.statement(t, s).unwrap().unwrap();
        assert_eq!(st.account.paid_amount(), Money::from_minor(100));
        assert!(!st.payments[0].student_deleted);
    }

    #[test]
    fn stale_snapshot_is_rejected_by_the_store() {
        let l = ledger();
        let (t, s) = (TenantId::new(), PrincipalId::new());
        let opened = l.open_account(t, s, Money::from_minor(500), "2025", Utc::now()).unwrap();
        l.record_payment(request(t, s, 100), Utc::now()).unwrap();

        // Build a commit from the stale version-1 snapshot.
        let events = opened
            .handle(&FeeCommand::RecordPayment(RecordPayment {
                tenant_id: t,
                account_id: *opened.id(),
                payment_id: PaymentId::new(),
                amount: Money::from_minor(50),
                method: PaymentMethod::Cash,
                recorded_by: PrincipalId::new(),
                note: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        let mut next = opened.clone();
        for e in &events {
            next.apply(e);
        }
        let FeeEvent::PaymentRecorded(p) = &events[0] else {
            panic!("expected a payment event");
        };

        let err = l
            .store()
            .commit_payment(&next, ExpectedVersion::Exact(opened.version()), FeePayment::from(p))
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert_eq!(
            l.statement(t, s).unwrap().unwrap().account.paid_amount(),
            Money::from_minor(100)
        );
    }

    #[test]
    fn concurrent_payments_lose_no_update() {
        let l = FeeLedger::new(Arc::new(InMemoryFeeStore::new()), 1_000);
        let (t, s) = (TenantId::new(), PrincipalId::new());
        l.open_account(t, s, Money::from_minor(10_000), "2025", Utc::now()).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        l.record_payment(request(t, s, 7), Utc::now()).unwrap();
                    }
                });
            }
        });

        let st = l.statement(t, s).unwrap().unwrap();
        assert_eq!(st.payments.len(), 200);
        assert_eq!(st.account.paid_amount(), Money::from_minor(1_400));
        assert_eq!(st.account.remaining_amount(), Money::from_minor(10_000 - 1_400));
        assert_eq!(st.account.version(), 201);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Stored balances always satisfy remaining == total - paid and
        /// paid == sum of the payment rows.
        #[test]
        fn stored_balance_matches_payment_rows(
            total in 0i64..1_000_000i64,
            amounts in prop::collection::vec(1i64..100_000i64, 0..15)
        ) {
            let l = ledger();
            let (t, s) = (TenantId::new(), PrincipalId::new());
            l.open_account(t, s, Money::from_minor(total), "2025", Utc::now()).unwrap();

            for amount in &amounts {
                l.record_payment(request(t, s, *amount), Utc::now()).unwrap();
                let st = l.statement(t, s).unwrap().unwrap();
                let rows = Money::sum(st.payments.iter().map(|p| p.amount)).unwrap();
                prop_assert_eq!(st.account.paid_amount(), rows);
                prop_assert_eq!(
                    st.account.remaining_amount().minor(),
                    total - st.account.paid_amount().minor()
                );
            }
        }
    }
}
