//! Session tokens: HS256 JWT issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{AuthError, JwtClaims, Principal, validate_claims};

/// Verifies a session token and returns its claims.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError>;
}

/// Issues a session token for an authenticated principal.
pub trait SessionIssuer: Send + Sync {
    fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, AuthError>;
}

/// Shared-secret sessions (HMAC-SHA256).
pub struct Hs256Sessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Sessions {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for Hs256Sessions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Sessions")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer for Hs256Sessions {
    fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = JwtClaims {
            sub: principal.id(),
            role: principal.role(),
            tenant_id: principal.tenant_id(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("jwt encode: {e}")))
    }
}

impl TokenValidator for Hs256Sessions {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError> {
        // Expiry is checked against the caller's clock below, not the wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewPrincipal, Role, TokenValidationError};
    use scholaris_core::{ClassId, TenantId};

    fn student() -> Principal {
        Principal::new_member(
            NewPrincipal {
                role: Role::Student,
                tenant_id: TenantId::new(),
                name: "Sam".into(),
                email: "sam@school.test".into(),
                class_id: Some(ClassId::new()),
                password_hash: "h".into(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_round_trips() {
        let sessions = Hs256Sessions::new(b"secret", Duration::hours(1));
        let p = student();
        let now = Utc::now();
        let token = sessions.issue(&p, now).unwrap();

        let claims = sessions.validate(&token, now).unwrap();
        assert_eq!(claims.sub, p.id());
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.tenant_id, p.tenant_id());
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let issuer = Hs256Sessions::new(b"one", Duration::hours(1));
        let verifier = Hs256Sessions::new(b"two", Duration::hours(1));
        let now = Utc::now();
        let token = issuer.issue(&student(), now).unwrap();

        assert!(matches!(
            verifier.validate(&token, now),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected_with_reason() {
        let sessions = Hs256Sessions::new(b"secret", Duration::minutes(5));
        let issued = Utc::now();
        let token = sessions.issue(&student(), issued).unwrap();

        let later = issued + Duration::minutes(6);
        assert_eq!(
            sessions.validate(&token, later),
            Err(AuthError::Token(TokenValidationError::Expired))
        );
    }

    #[test]
    fn garbage_is_invalid() {
        let sessions = Hs256Sessions::new(b"secret", Duration::hours(1));
        assert!(matches!(
            sessions.validate("not.a.jwt", Utc::now()),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
