use thiserror::Error;

/// Core error types for MedVault data handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid {kind} identifier: '{value}'")]
    InvalidId { kind: &'static str, value: String },

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid timestamp: {0}")]
    InvalidDateTime(String),

    #[error("No consent entry exists for medical id {0}")]
    UnknownPatient(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidId error
    pub fn invalid_id(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidId {
            kind,
            value: value.into(),
        }
    }

    /// Create a new InvalidRole error
    pub fn invalid_role(role: impl Into<String>) -> Self {
        Self::InvalidRole(role.into())
    }

    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(datetime: impl Into<String>) -> Self {
        Self::InvalidDateTime(datetime.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
