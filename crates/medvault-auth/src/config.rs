//! Authentication configuration.
//!
//! Signing secret, record encryption key and password-hashing cost. All three
//! secrets are process-wide and read-only after startup.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth.token]
//! secret = "change-me"
//! ttl = "8h"
//!
//! [auth.encryption]
//! key = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
//!
//! [auth.password]
//! memory_kib = 19456
//! iterations = 2
//! parallelism = 1
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DEV_TOKEN_SECRET: &str = "medvault-dev-signing-secret";
const DEV_ENCRYPTION_KEY: &str = "medvault-dev-encryption-key";

/// A configured secret. Never printed, never serialized in the clear.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret material.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[redacted]")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

/// Root auth configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session token signing.
    pub token: TokenConfig,

    /// Record payload encryption.
    pub encryption: EncryptionConfig,

    /// Password hashing cost.
    pub password: PasswordConfig,
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC secret for HS256 signatures.
    pub secret: Secret,

    /// Token lifetime. There is no revocation, so this is also the exposure
    /// window of a leaked token.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: Secret::new(DEV_TOKEN_SECRET),
            ttl: Duration::from_secs(8 * 3600),
        }
    }
}

/// Record encryption configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// 64 hex characters are used as the raw 256-bit key; anything else is
    /// hashed with SHA-256 into one.
    pub key: Secret,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key: Secret::new(DEV_ENCRYPTION_KEY),
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    /// Smallest parameters argon2 accepts. Test use only.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any secret is empty, the token TTL is under a
    /// second, or the password cost is outside what Argon2id supports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "auth.token.secret cannot be empty".to_string(),
            ));
        }

        if self.token.ttl < crate::token::MIN_TTL {
            return Err(ConfigError::InvalidValue(format!(
                "auth.token.ttl must be at least 1s, got {:?}",
                self.token.ttl
            )));
        }

        if self.encryption.key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "auth.encryption.key cannot be empty".to_string(),
            ));
        }

        let p = &self.password;
        if p.parallelism == 0 || p.parallelism > 16 {
            return Err(ConfigError::InvalidValue(format!(
                "auth.password.parallelism must be between 1 and 16, got {}",
                p.parallelism
            )));
        }
        if p.iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.password.iterations must be at least 1".to_string(),
            ));
        }
        if p.memory_kib < 8 * p.parallelism {
            return Err(ConfigError::InvalidValue(format!(
                "auth.password.memory_kib must be at least {} for parallelism {}",
                8 * p.parallelism,
                p.parallelism
            )));
        }

        Ok(())
    }

    /// Returns `true` if either secret is still the built-in development value.
    pub fn uses_development_secrets(&self) -> bool {
        self.token.secret.expose() == DEV_TOKEN_SECRET
            || self.encryption.key.expose() == DEV_ENCRYPTION_KEY
    }
}
