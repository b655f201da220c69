use thiserror::Error;

use crate::TokenValidationError;

/// Authentication failures (identity & session boundary).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("not authorized to access this route")]
    MissingCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Token(#[from] TokenValidationError),

    /// Hashing/signing primitive failed; never shown to clients verbatim.
    #[error("crypto error: {0}")]
    Crypto(String),
}
