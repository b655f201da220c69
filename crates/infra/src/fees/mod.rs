//! Fee persistence and the ledger service on top of it.

pub mod ledger;
pub mod store;

pub use ledger::{DEFAULT_MAX_ATTEMPTS, FeeLedger, LedgerError, PaymentRequest};
pub use store::{FeeStore, InMemoryFeeStore};
