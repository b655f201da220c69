use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scholaris_core::{
    Aggregate, AggregateRoot, DomainError, FeeAccountId, Money, PaymentId, PrincipalId, TenantId,
};

use crate::PaymentMethod;

/// Aggregate root: one student's fee balance for one billing period.
///
/// # Invariants
/// - `remaining_amount == total_amount - paid_amount` after every applied event.
/// - `paid_amount` only grows, by the amount of each recorded payment.
/// - None of the balance fields has a setter; they move only through events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAccount {
    id: FeeAccountId,
    #[serde(rename = "schoolId")]
    tenant_id: Option<TenantId>,
    student_id: Option<PrincipalId>,
    billing_period: String,
    total_amount: Money,
    paid_amount: Money,
    remaining_amount: Money,
    version: u64,
    #[serde(skip)]
    opened: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl FeeAccount {
    /// Create an empty, not-yet-opened aggregate instance.
    pub fn empty(id: FeeAccountId) -> Self {
        Self {
            id,
            tenant_id: None,
            student_id: None,
            billing_period: String::new(),
            total_amount: Money::ZERO,
            paid_amount: Money::ZERO,
            remaining_amount: Money::ZERO,
            version: 0,
            opened: false,
            updated_at: None,
        }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn student_id(&self) -> Option<PrincipalId> {
        self.student_id
    }

    pub fn billing_period(&self) -> &str {
        &self.billing_period
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn paid_amount(&self) -> Money {
        self.paid_amount
    }

    pub fn remaining_amount(&self) -> Money {
        self.remaining_amount
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl AggregateRoot for FeeAccount {
    type Id = FeeAccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenAccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAccount {
    pub tenant_id: TenantId,
    pub account_id: FeeAccountId,
    pub student_id: PrincipalId,
    pub total_amount: Money,
    pub billing_period: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub tenant_id: TenantId,
    pub account_id: FeeAccountId,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub recorded_by: PrincipalId,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeCommand {
    OpenAccount(OpenAccount),
    RecordPayment(RecordPayment),
}

/// Event: AccountOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOpened {
    pub tenant_id: TenantId,
    pub account_id: FeeAccountId,
    pub student_id: PrincipalId,
    pub total_amount: Money,
    pub billing_period: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded.
///
/// Carries the post-payment balances so `apply` stays infallible; the
/// overflow check happens once, in `handle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub tenant_id: TenantId,
    pub account_id: FeeAccountId,
    pub student_id: PrincipalId,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub recorded_by: PrincipalId,
    pub note: Option<String>,
    pub paid_after: Money,
    pub remaining_after: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeEvent {
    AccountOpened(AccountOpened),
    PaymentRecorded(PaymentRecorded),
}

impl FeeEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            FeeEvent::AccountOpened(_) => "fees.account.opened",
            FeeEvent::PaymentRecorded(_) => "fees.payment.recorded",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FeeEvent::AccountOpened(e) => e.occurred_at,
            FeeEvent::PaymentRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for FeeAccount {
    type Command = FeeCommand;
    type Event = FeeEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            FeeEvent::AccountOpened(e) => {
                self.id = e.account_id;
                self.tenant_id = Some(e.tenant_id);
                self.student_id = Some(e.student_id);
                self.billing_period = e.billing_period.clone();
                self.total_amount = e.total_amount;
                self.paid_amount = Money::ZERO;
                self.remaining_amount = e.total_amount;
                self.opened = true;
            }
            FeeEvent::PaymentRecorded(e) => {
                self.paid_amount = e.paid_after;
                self.remaining_amount = e.remaining_after;
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            FeeCommand::OpenAccount(cmd) => self.handle_open(cmd),
            FeeCommand::RecordPayment(cmd) => self.handle_payment(cmd),
        }
    }
}

impl FeeAccount {
    fn ensure_target(&self, tenant_id: TenantId, account_id: FeeAccountId) -> Result<(), DomainError> {
        if self.id != account_id {
            return Err(DomainError::invariant("account_id mismatch"));
        }
        if self.opened && self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenAccount) -> Result<Vec<FeeEvent>, DomainError> {
        if self.opened {
            return Err(DomainError::conflict("fee account already exists"));
        }
        self.ensure_target(cmd.tenant_id, cmd.account_id)?;
        if cmd.total_amount.is_negative() {
            return Err(DomainError::validation("total amount cannot be negative"));
        }
        let period = cmd.billing_period.trim();
        if period.is_empty() {
            return Err(DomainError::validation("billing period cannot be empty"));
        }

        Ok(vec![FeeEvent::AccountOpened(AccountOpened {
            tenant_id: cmd.tenant_id,
            account_id: cmd.account_id,
            student_id: cmd.student_id,
            total_amount: cmd.total_amount,
            billing_period: period.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_payment(&self, cmd: &RecordPayment) -> Result<Vec<FeeEvent>, DomainError> {
        if !self.opened {
            return Err(DomainError::NotFound);
        }
        self.ensure_target(cmd.tenant_id, cmd.account_id)?;
        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("payment amount must be greater than zero"));
        }
        let student_id = self
            .student_id
            .ok_or_else(|| DomainError::invariant("opened account without student"))?;

        let paid_after = self.paid_amount.checked_add(cmd.amount)?;
        let remaining_after = self.total_amount.checked_sub(paid_after)?;

        Ok(vec![FeeEvent::PaymentRecorded(PaymentRecorded {
            tenant_id: cmd.tenant_id,
            account_id: cmd.account_id,
            student_id,
            payment_id: cmd.payment_id,
            amount: cmd.amount,
            method: cmd.method,
            recorded_by: cmd.recorded_by,
            note: cmd.note.clone(),
            paid_after,
            remaining_after,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn opened(tenant_id: TenantId, total: i64) -> FeeAccount {
        let id = FeeAccountId::new();
        let mut acc = FeeAccount::empty(id);
        let events = acc
            .handle(&FeeCommand::OpenAccount(OpenAccount {
                tenant_id,
                account_id: id,
                student_id: PrincipalId::new(),
                total_amount: Money::from_minor(total),
                billing_period: "2025-T1".into(),
                occurred_at: t0(),
            }))
            .unwrap();
        for e in &events {
            acc.apply(e);
        }
        acc
    }

    fn pay(acc: &mut FeeAccount, tenant_id: TenantId, amount: i64) -> Result<(), DomainError> {
        let events = acc.handle(&FeeCommand::RecordPayment(RecordPayment {
            tenant_id,
            account_id: *acc.id(),
            payment_id: PaymentId::new(),
            amount: Money::from_minor(amount),
            method: PaymentMethod::Cash,
            recorded_by: PrincipalId::new(),
            note: None,
            occurred_at: t0(),
        }))?;
        for e in &events {
            acc.apply(e);
        }
        Ok(())
    }

    #[test]
    fn open_sets_remaining_to_total() {
        let acc = opened(TenantId::new(), 500);
        assert_eq!(acc.paid_amount(), Money::ZERO);
        assert_eq!(acc.remaining_amount(), Money::from_minor(500));
        assert_eq!(acc.version(), 1);
    }

    #[test]
    fn partial_payments_then_overpayment() {
        let tenant = TenantId::new();
        let mut acc = opened(tenant, 500);

        pay(&mut acc, tenant, 200).unwrap();
        pay(&mut acc, tenant, 150).unwrap();
        assert_eq!(acc.paid_amount(), Money::from_minor(350));
        assert_eq!(acc.remaining_amount(), Money::from_minor(150));

        pay(&mut acc, tenant, 200).unwrap();
        assert_eq!(acc.paid_amount(), Money::from_minor(550));
        assert_eq!(acc.remaining_amount(), Money::from_minor(-50));
        assert_eq!(acc.version(), 4);
    }

    #[test]
    fn non_positive_payment_is_rejected_without_change() {
        let tenant = TenantId::new();
        let mut acc = opened(tenant, 500);
        let before = acc.clone();

        for amount in [0, -10] {
            let err = pay(&mut acc, tenant, amount).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        assert_eq!(acc, before);
    }

    #[test]
    fn payment_from_other_tenant_is_an_invariant_violation() {
        let mut acc = opened(TenantId::new(), 500);
        let err = pay(&mut acc, TenantId::new(), 10).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn negative_total_and_blank_period_are_rejected() {
        let id = FeeAccountId::new();
        let acc = FeeAccount::empty(id);
        let mut cmd = OpenAccount {
            tenant_id: TenantId::new(),
            account_id: id,
            student_id: PrincipalId::new(),
            total_amount: Money::from_minor(-1),
            billing_period: "2025".into(),
            occurred_at: t0(),
        };
        assert!(acc.handle(&FeeCommand::OpenAccount(cmd.clone())).is_err());

        cmd.total_amount = Money::ZERO;
        cmd.billing_period = "   ".into();
        assert!(acc.handle(&FeeCommand::OpenAccount(cmd)).is_err());
    }

    #[test]
    fn reopening_is_a_conflict() {
        let acc = opened(TenantId::new(), 100);
        let err = acc
            .handle(&FeeCommand::OpenAccount(OpenAccount {
                tenant_id: acc.tenant_id().unwrap(),
                account_id: *acc.id(),
                student_id: PrincipalId::new(),
                total_amount: Money::from_minor(1),
                billing_period: "x".into(),
                occurred_at: t0(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn overflowing_payment_is_refused() {
        let tenant = TenantId::new();
        let mut acc = opened(tenant, 0);
        pay(&mut acc, tenant, i64::MAX).unwrap();
        assert!(matches!(
            pay(&mut acc, tenant, 1),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn serializes_balances_in_camel_case() {
        let acc = opened(TenantId::new(), 500);
        let json = serde_json::to_value(&acc).unwrap();
        assert_eq!(json["totalAmount"], 500);
        assert_eq!(json["remainingAmount"], 500);
        assert_eq!(json["billingPeriod"], "2025-T1");
        assert!(json.get("opened").is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// After every payment, remaining == total - paid and paid == sum(payments).
        #[test]
        fn balance_invariant_holds_after_each_payment(
            total in 0i64..10_000_000i64,
            amounts in prop::collection::vec(1i64..1_000_000i64, 1..20)
        ) {
            let tenant = TenantId::new();
            let mut acc = opened(tenant, total);
            let mut sum = 0i64;

            for amount in amounts {
                pay(&mut acc, tenant, amount).unwrap();
                sum += amount;

                prop_assert_eq!(acc.paid_amount().minor(), sum);
                prop_assert_eq!(
                    acc.remaining_amount().minor(),
                    acc.total_amount().minor() - acc.paid_amount().minor()
                );
            }
        }
    }
}
