//! `scholaris-fees`: per-student fee accounts and their payment ledger.
//!
//! Pure domain: the account is an [`Aggregate`](scholaris_core::Aggregate);
//! persisting it (with compare-and-swap) lives in `scholaris-infra`.

pub mod account;
pub mod payment;
pub mod report;

pub use account::{
    AccountOpened, FeeAccount, FeeCommand, FeeEvent, OpenAccount, PaymentRecorded, RecordPayment,
};
pub use payment::{FeePayment, PaymentMethod};
pub use report::{FeeAggregate, FeeStatement};
