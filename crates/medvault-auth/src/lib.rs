//! # medvault-auth
//!
//! The trust layer of the MedVault portal.
//!
//! ## Modules
//!
//! - [`password`] - Argon2id credential hashing and verification
//! - [`token`] - signed, expiring session tokens
//! - [`codec`] - AES-256-GCM sealing of clinical payloads
//! - [`policy`] - the consent-based access control engine
//! - [`service`] - portal operations composed from the above
//! - [`middleware`] - axum extractors and error responses
//! - [`config`] - secrets and cost parameters

pub mod codec;
pub mod config;
pub mod error;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod service;
pub mod token;

pub use codec::RecordCodec;
pub use config::{AuthConfig, ConfigError, Secret};
pub use error::{AuthError, ErrorCategory};
pub use middleware::{AuthState, BearerAuth};
pub use password::CredentialManager;
pub use policy::{AccessControlEngine, AccessDecision, AccessRequest, Actor};
pub use service::PortalService;
pub use token::{IssuedToken, Session, TokenService};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;
