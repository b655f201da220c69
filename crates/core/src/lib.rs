//! `scholaris-core`: shared domain building blocks.
//!
//! Identifiers, the domain error model, money arithmetic and the aggregate
//! contract used by the fee ledger. No IO lives here.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{
    AttendanceId, AuditEntryId, ClassId, FeeAccountId, HomeworkId, PaymentId, PrincipalId,
    SubmissionId, TaskId, TenantId,
};
pub use money::Money;
