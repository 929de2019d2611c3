use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Account role. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Patient,
    Doctor,
    Hospital,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "Patient",
            Role::Doctor => "Doctor",
            Role::Hospital => "Hospital",
            Role::Admin => "Admin",
        }
    }

    /// Doctors and hospitals act on other patients' data and need admin approval.
    pub fn professional_kind(&self) -> Option<ProfessionalKind> {
        match self {
            Role::Doctor => Some(ProfessionalKind::Doctor),
            Role::Hospital => Some(ProfessionalKind::Hospital),
            Role::Patient | Role::Admin => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(Role::Patient),
            "Doctor" => Ok(Role::Doctor),
            "Hospital" => Ok(Role::Hospital),
            "Admin" => Ok(Role::Admin),
            other => Err(CoreError::invalid_role(other)),
        }
    }
}

/// Explicit discriminator for professional identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfessionalKind {
    Doctor,
    Hospital,
}

impl ProfessionalKind {
    pub fn role(&self) -> Role {
        match self {
            ProfessionalKind::Doctor => Role::Doctor,
            ProfessionalKind::Hospital => Role::Hospital,
        }
    }

    pub(crate) fn id_prefix(&self) -> &'static str {
        match self {
            ProfessionalKind::Doctor => "DOC",
            ProfessionalKind::Hospital => "HOSP",
        }
    }
}

impl fmt::Display for ProfessionalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role().as_str())
    }
}

/// Professional verification state. `Pending --approve--> Active`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VerificationStatus {
    #[default]
    Pending,
    Active,
}

impl VerificationStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, VerificationStatus::Active)
    }
}
