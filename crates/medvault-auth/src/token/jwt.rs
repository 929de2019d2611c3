//! HS256 session tokens.
//!
//! A token is a compact JWT whose payload carries the account id, role,
//! issue and expiry times and a random `jti`. Nothing is stored server-side:
//! a token is valid exactly while its MAC checks out and `now < exp`.
//!
//! ## Example
//!
//! ```ignore
//! use medvault_auth::token::TokenService;
//!
//! let tokens = TokenService::new(&config.token)?;
//! let issued = tokens.issue(&account_id, Role::Patient)?;
//! let session = tokens.verify(&issued.token)?;
//! assert_eq!(session.subject, account_id);
//! ```

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use medvault_core::{AccountId, Role};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::TokenConfig;
use crate::error::AuthError;

const INVALID_TOKEN: &str = "Invalid or expired token";

/// Claims carried in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id.
    pub sub: String,
    pub role: Role,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expires at (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

/// An authenticated principal recovered from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub subject: AccountId,
    pub role: Role,
    pub expires_at: i64,
}

/// A freshly minted token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Shortest accepted token lifetime. `exp` has whole-second resolution.
pub const MIN_TTL: Duration = Duration::from_secs(1);

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Mints and verifies session tokens with a process-wide HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// Creates a token service from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the secret is empty or the TTL is
    /// shorter than one second.
    pub fn new(config: &TokenConfig) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::configuration("token secret cannot be empty"));
        }
        if config.ttl < MIN_TTL {
            return Err(AuthError::configuration(
                "token ttl must be at least one second",
            ));
        }
        let secret = config.secret.expose().as_bytes();
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: config.ttl,
        })
    }

    /// Configured token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token valid for the configured TTL from now.
    pub fn issue(&self, subject: &AccountId, role: Role) -> Result<IssuedToken, AuthError> {
        self.issue_at(subject, role, self.ttl, OffsetDateTime::now_utc())
    }

    /// Issues a token valid for `ttl` from `now`.
    ///
    /// `exp` is `now + ttl` rounded up to the next whole second, so the token
    /// never expires before the full lifetime has elapsed.
    pub fn issue_at(
        &self,
        subject: &AccountId,
        role: Role,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, AuthError> {
        let iat = now.unix_timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let nanos = i64::from(now.nanosecond()) + i64::from(ttl.subsec_nanos());
        let carry = (nanos + NANOS_PER_SEC - 1) / NANOS_PER_SEC;
        let claims = SessionClaims {
            sub: subject.to_string(),
            role,
            iat,
            exp: iat.saturating_add(ttl_secs).saturating_add(carry),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("failed to sign token: {e}")))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verifies a token against the current time.
    ///
    /// # Errors
    ///
    /// Every failure is the same `AuthError::Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Session, AuthError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Verifies a token as of `now`.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Session, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below without leeway.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected session token");
                AuthError::unauthorized(INVALID_TOKEN)
            })?
            .claims;

        if now.unix_timestamp() >= claims.exp {
            tracing::debug!(jti = %claims.jti, "Session token expired");
            return Err(AuthError::unauthorized(INVALID_TOKEN));
        }

        let subject = claims.sub.parse::<AccountId>().map_err(|_| {
            tracing::debug!(jti = %claims.jti, "Session token has malformed subject");
            AuthError::unauthorized(INVALID_TOKEN)
        })?;

        Ok(Session {
            subject,
            role: claims.role,
            expires_at: claims.exp,
        })
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
