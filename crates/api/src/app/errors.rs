//! One error type for every handler, rendered as `{"success": false, "error": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use scholaris_auth::{AuthError, PolicyDenial};
use scholaris_core::DomainError;
use scholaris_infra::{LedgerError, ProvisioningError, StoreError};
use scholaris_tenancy::{IsolationError, SubscriptionError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    /// Role policy or tenant isolation denial.
    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    Subscription(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Logged server-side; clients only see a generic message.
    #[error("server error")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) | ApiError::Subscription(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => ApiError::Validation(msg),
            DomainError::NotFound => ApiError::NotFound("resource not found".into()),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::Unauthorized(msg) => ApiError::Authorization(msg),
        }
    }
}

impl From<PolicyDenial> for ApiError {
    fn from(e: PolicyDenial) -> Self {
        ApiError::Authorization(e.to_string())
    }
}

impl From<IsolationError> for ApiError {
    fn from(e: IsolationError) -> Self {
        ApiError::Authorization(e.to_string())
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(e: SubscriptionError) -> Self {
        ApiError::Subscription(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::Authentication(e.to_string()),
            AuthError::MissingCredentials | AuthError::InvalidToken(_) | AuthError::Token(_) => {
                ApiError::Authentication(AuthError::MissingCredentials.to_string())
            }
            AuthError::Crypto(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound("resource not found".into()),
            StoreError::Conflict(msg) | StoreError::Concurrency(msg) => ApiError::Conflict(msg),
            StoreError::Domain(d) => d.into(),
            StoreError::Unavailable(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Validation(msg) | LedgerError::Invariant(msg) => ApiError::Validation(msg),
            LedgerError::NotFound => ApiError::NotFound(e.to_string()),
            LedgerError::Conflict(msg) => ApiError::Conflict(msg),
            LedgerError::Store(s) => s.into(),
        }
    }
}

impl From<ProvisioningError> for ApiError {
    fn from(e: ProvisioningError) -> Self {
        match e {
            ProvisioningError::Domain(d) => d.into(),
            ProvisioningError::Store(s) => s.into(),
            ProvisioningError::Ledger(l) => l.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholaris_auth::{Action, Role, TokenValidationError};

    #[test]
    fn gate_denials_are_forbidden() {
        let e: ApiError = IsolationError::CrossTenant.into();
        assert_eq!(e.status(), StatusCode::FORBIDDEN);
        assert_eq!(e.to_string(), "cross-tenant data access is prohibited");

        let e: ApiError = SubscriptionError::Expired.into();
        assert_eq!(e.status(), StatusCode::FORBIDDEN);

        let e: ApiError = PolicyDenial::ActionNotPermitted {
            role: Role::Teacher,
            action: Action::RecordFeePayment,
        }
        .into();
        assert_eq!(e.status(), StatusCode::FORBIDDEN);
        assert!(e.to_string().starts_with("role policy:"));
    }

    #[test]
    fn token_details_are_not_echoed() {
        let e: ApiError = AuthError::InvalidToken("InvalidSignature".into()).into();
        assert_eq!(e, ApiError::Authentication("not authorized to access this route".into()));
        let e: ApiError = AuthError::Token(TokenValidationError::Expired).into();
        assert_eq!(e.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn oversized_body_is_413() {
        let e = ApiError::PayloadTooLarge("request body too large".into());
        assert_eq!(e.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(e.to_string(), "request body too large");
    }

    #[test]
    fn storage_failures_are_generic() {
        let e: ApiError = StoreError::Unavailable("lock poisoned".into()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.to_string(), "server error");
    }

    #[test]
    fn ledger_errors_keep_their_messages() {
        let e: ApiError = LedgerError::NotFound.into();
        assert_eq!(e, ApiError::NotFound("fee record not found for this student".into()));
        let e: ApiError = LedgerError::Store(StoreError::Conflict("busy".into())).into();
        assert_eq!(e.status(), StatusCode::CONFLICT);
    }
}
