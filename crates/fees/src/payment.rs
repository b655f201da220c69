use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scholaris_core::{DomainError, FeeAccountId, Money, PaymentId, PrincipalId, TenantId};

use crate::PaymentRecorded;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Cheque,
    Online,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Online => "online",
            PaymentMethod::Other => "other",
        }
    }
}

impl core::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "cheque" => Ok(PaymentMethod::Cheque),
            "online" => Ok(PaymentMethod::Online),
            "other" => Ok(PaymentMethod::Other),
            other => Err(DomainError::validation(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

/// Immutable ledger entry. Never updated; `student_deleted` is the only
/// flag that changes, when the owning student is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePayment {
    pub id: PaymentId,
    pub fee_account_id: FeeAccountId,
    pub student_id: PrincipalId,
    #[serde(rename = "schoolId")]
    pub tenant_id: TenantId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub recorded_by: PrincipalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub student_deleted: bool,
}

impl From<&PaymentRecorded> for FeePayment {
    fn from(e: &PaymentRecorded) -> Self {
        Self {
            id: e.payment_id,
            fee_account_id: e.account_id,
            student_id: e.student_id,
            tenant_id: e.tenant_id,
            amount: e.amount,
            method: e.method,
            recorded_by: e.recorded_by,
            note: e.note.clone(),
            recorded_at: e.occurred_at,
            student_deleted: false,
        }
    }
}
