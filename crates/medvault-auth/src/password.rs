//! Password hashing with Argon2id.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so
//! the salt and cost parameters travel with the digest and old digests keep
//! verifying after the configured cost changes.
//!
//! # Security
//!
//! - Salts are 16 random bytes from `OsRng`
//! - Verification re-derives with the stored salt and compares in constant time
//! - Failure is a plain `false`; malformed digests are not distinguished

use std::fmt;
use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::config::PasswordConfig;
use crate::error::AuthError;

/// Hashes and verifies account passwords.
#[derive(Clone)]
pub struct CredentialManager {
    argon2: Argon2<'static>,
    /// Verified against when the username is unknown, so that a miss costs
    /// the same as a wrong password.
    dummy_digest: Arc<str>,
}

impl CredentialManager {
    /// Creates a manager with the given cost parameters.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if Argon2 rejects the parameters.
    pub fn new(config: &PasswordConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::configuration(format!("invalid argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let dummy_digest = argon2
            .hash_password(b"medvault-unknown-account", &salt)
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?
            .to_string();

        Ok(Self {
            argon2,
            dummy_digest: dummy_digest.into(),
        })
    }

    /// Hashes a password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if hashing fails (rare).
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verifies a password against a stored digest.
    ///
    /// Returns `false` for a wrong password and for a digest that cannot be
    /// parsed.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::warn!("Stored password digest is malformed");
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_async(&self, password: String) -> Result<String, AuthError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.hash(&password)).await?
    }

    /// Verifies on the blocking pool. With no stored digest the password is
    /// checked against a dummy digest and the result is always `false`.
    pub async fn verify_async(
        &self,
        password: String,
        digest: Option<String>,
    ) -> Result<bool, AuthError> {
        let this = self.clone();
        let ok = tokio::task::spawn_blocking(move || match digest {
            Some(digest) => this.verify(&password, &digest),
            None => {
                let _ = this.verify(&password, &this.dummy_digest);
                false
            }
        })
        .await?;
        Ok(ok)
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.argon2.params();
        f.debug_struct("CredentialManager")
            .field("m_cost", &params.m_cost())
            .field("t_cost", &params.t_cost())
            .field("p_cost", &params.p_cost())
            .finish_non_exhaustive()
    }
}
