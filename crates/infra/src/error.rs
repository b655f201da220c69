use std::sync::PoisonError;

use thiserror::Error;

use scholaris_core::DomainError;

/// Storage-layer failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    /// Uniqueness violation.
    #[error("{0}")]
    Conflict(String),

    /// Compare-and-swap lost against a concurrent writer.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// A mutation closure rejected the change.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        StoreError::Unavailable("lock poisoned".to_string())
    }
}
