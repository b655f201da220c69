//! Password hashing using Argon2id (PHC string format).

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use uuid::Uuid;

use crate::AuthError;

/// Opaque credential primitive.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// `memory_kib` and `iterations` map to Argon2's m_cost and t_cost.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AuthError::Crypto(format!("argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| AuthError::Crypto(format!("salt: {e}")))?;

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Crypto(format!("hash: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
        }
    }
}

/// Reject passwords that are too short to be worth hashing.
pub fn check_password_strength(password: &str) -> Result<(), scholaris_core::DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(scholaris_core::DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::new(8, 1).unwrap()
    }

    #[test]
    fn correct_password_matches() {
        let h = hasher();
        let hash = h.hash("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(h.verify("hunter22", &hash).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let h = hasher();
        let hash = h.hash("hunter22").unwrap();
        assert!(!h.verify("wrong-one", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let h = hasher();
        assert_ne!(h.hash("hunter22").unwrap(), h.hash("hunter22").unwrap());
    }

    #[test]
    fn malformed_hash_is_crypto_error() {
        assert!(matches!(
            hasher().verify("x", "not-a-phc-string"),
            Err(AuthError::Crypto(_))
        ));
    }

    #[test]
    fn short_password_rejected() {
        assert!(check_password_strength("12345").is_err());
        assert!(check_password_strength("123456").is_ok());
    }
}
