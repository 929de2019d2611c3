use std::fmt;

use serde::{Deserialize, Serialize};

/// What a caller wants to do with a patient's clinical data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Read,
    Write,
}

/// Why an access was refused. Suitable for audit detail; callers only see a
/// generic forbidden response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The role may not touch this data for this operation at all.
    RoleMismatch,
    /// The professional has not been approved by an administrator.
    NotVerified,
    /// The patient has not listed the actor in their consent set.
    NoConsent,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::RoleMismatch => "role_mismatch",
            DenyReason::NotVerified => "not_verified",
            DenyReason::NoConsent => "no_consent",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
