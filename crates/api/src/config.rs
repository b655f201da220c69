//! Runtime configuration read from the environment (and `.env` in dev).

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "scholaris-dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set together with {1}")]
    Incomplete(&'static str, &'static str),
}

/// Platform operator account created at startup when absent.
#[derive(Clone, PartialEq, Eq)]
pub struct SuperAdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SuperAdminSeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SuperAdminSeed")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// Attempts per fee payment before a contended write gives up.
    pub fee_payment_max_attempts: u32,
    /// Argon2 m_cost / t_cost; `None` keeps the library defaults.
    pub password_hash_cost: Option<(u32, u32)>,
    pub superadmin: Option<SuperAdminSeed>,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl", &self.token_ttl)
            .field("fee_payment_max_attempts", &self.fee_payment_max_attempts)
            .field("password_hash_cost", &self.password_hash_cost)
            .field("superadmin", &self.superadmin)
            .finish_non_exhaustive()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl: Duration::days(7),
            fee_payment_max_attempts: scholaris_infra::DEFAULT_MAX_ATTEMPTS,
            password_hash_cost: None,
            superadmin: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => cfg.jwt_secret = secret,
            None => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }

        if let Some(v) = lookup("BIND_ADDR") {
            cfg.bind_addr = parse("BIND_ADDR", &v)?;
        }
        if let Some(v) = lookup("TOKEN_TTL_MINUTES") {
            let minutes: i64 = parse("TOKEN_TTL_MINUTES", &v)?;
            if minutes <= 0 {
                return Err(invalid("TOKEN_TTL_MINUTES", &v));
            }
            cfg.token_ttl = Duration::minutes(minutes);
        }
        if let Some(v) = lookup("FEE_PAYMENT_MAX_RETRIES") {
            let attempts: u32 = parse("FEE_PAYMENT_MAX_RETRIES", &v)?;
            if attempts == 0 {
                return Err(invalid("FEE_PAYMENT_MAX_RETRIES", &v));
            }
            cfg.fee_payment_max_attempts = attempts;
        }

        cfg.password_hash_cost = match (lookup("PASSWORD_HASH_MEMORY_KIB"), lookup("PASSWORD_HASH_ITERATIONS")) {
            (None, None) => None,
            (Some(m), Some(i)) => Some((
                parse("PASSWORD_HASH_MEMORY_KIB", &m)?,
                parse("PASSWORD_HASH_ITERATIONS", &i)?,
            )),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete("PASSWORD_HASH_MEMORY_KIB", "PASSWORD_HASH_ITERATIONS"));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete("PASSWORD_HASH_ITERATIONS", "PASSWORD_HASH_MEMORY_KIB"));
            }
        };

        cfg.superadmin = match (lookup("SUPERADMIN_EMAIL"), lookup("SUPERADMIN_PASSWORD")) {
            (None, None) => None,
            (Some(email), Some(password)) => Some(SuperAdminSeed {
                name: lookup("SUPERADMIN_NAME").unwrap_or_else(|| "Super Admin".to_string()),
                email,
                password,
            }),
            (Some(_), None) => return Err(ConfigError::Incomplete("SUPERADMIN_EMAIL", "SUPERADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("SUPERADMIN_PASSWORD", "SUPERADMIN_EMAIL")),
        };

        Ok(cfg)
    }
}

fn parse<T: core::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}
