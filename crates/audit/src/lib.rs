//! `scholaris-audit`: append-only record of privileged mutations.
//!
//! Writing an entry is best-effort: a failing sink is logged and never
//! aborts the business operation that triggered it.

pub mod entry;
pub mod sink;
pub mod trail;

pub use entry::{AuditEntry, AuditModule};
pub use sink::{AuditError, AuditSink, InMemoryAuditLog};
pub use trail::AuditTrail;
