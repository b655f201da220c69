use serde::Serialize;

use scholaris_core::{DomainResult, Money};

use crate::{FeeAccount, FeePayment};

/// Tenant-wide fee totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAggregate {
    pub total_expected: Money,
    pub total_paid: Money,
    pub total_remaining: Money,
}

impl FeeAggregate {
    /// Sum over accounts; an empty set yields zeros.
    pub fn from_accounts<'a, I>(accounts: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a FeeAccount>,
    {
        accounts.into_iter().try_fold(Self::default(), |acc, a| {
            Ok(Self {
                total_expected: acc.total_expected.checked_add(a.total_amount())?,
                total_paid: acc.total_paid.checked_add(a.paid_amount())?,
                total_remaining: acc.total_remaining.checked_add(a.remaining_amount())?,
            })
        })
    }
}

/// One student's account together with its payment history (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStatement {
    pub account: FeeAccount,
    pub payments: Vec<FeePayment>,
}

impl FeeStatement {
    pub fn new(account: FeeAccount, mut payments: Vec<FeePayment>) -> Self {
        payments.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        Self { account, payments }
    }
}
