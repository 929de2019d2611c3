//! Authentication and authorization error types.
//!
//! Callers above this crate see a small closed set of kinds. Credential and
//! token failures are deliberately uniform; access denials carry a reason code
//! for the audit trail that is not echoed to the client.

use std::fmt;

use medvault_core::{CoreError, DenyReason};
use medvault_storage::StorageError;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown username or wrong password. Never says which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A doctor or hospital that has not been approved yet.
    #[error("Account not verified")]
    AccountNotVerified,

    /// Missing, malformed, tampered or expired session token.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The caller may not perform this action on this data.
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Audit-level detail of the refusal.
        reason: DenyReason,
    },

    /// A sealed payload failed authentication or could not be decoded.
    #[error("Sealed payload failed integrity check")]
    DecryptionFailure,

    /// The target entity does not exist.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of entity looked up.
        resource: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The request is malformed or conflicts with existing data.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// An error occurred while loading or committing portal state.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(reason: DenyReason) -> Self {
        Self::Forbidden { reason }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error was caused by the caller.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::AccountNotVerified
                | Self::Unauthorized { .. }
                | Self::Forbidden { .. }
                | Self::NotFound { .. }
                | Self::InvalidRequest { .. }
        )
    }

    /// Returns `true` if this error is a server-side failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the access-denial reason, if this is a `Forbidden` error.
    #[must_use]
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Forbidden { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCredentials | Self::AccountNotVerified | Self::Unauthorized { .. } => {
                ErrorCategory::Authentication
            }
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::DecryptionFailure => ErrorCategory::Integrity,
            Self::NotFound { .. } | Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Stable machine-readable code used in error responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountNotVerified => "account_not_verified",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::DecryptionFailure => "decryption_failure",
            Self::NotFound { .. } => "not_found",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "server_error"
            }
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<CoreError> for AuthError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownPatient(id) => Self::not_found("Patient", id),
            CoreError::InvalidId { .. } | CoreError::InvalidRole(_) => {
                Self::invalid_request(err.to_string())
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("blocking task failed: {err}"))
    }
}

/// Categories of auth errors for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Who the caller is could not be established.
    Authentication,
    /// The caller is known but not allowed.
    Authorization,
    /// Tampered or corrupt sealed data.
    Integrity,
    /// Malformed input or unknown targets.
    Validation,
    /// Storage failures.
    Infrastructure,
    /// Configuration problems.
    Configuration,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Integrity => write!(f, "integrity"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
