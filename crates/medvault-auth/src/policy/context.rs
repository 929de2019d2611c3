//! Who is asking, resolved against current portal state.

use medvault_core::{
    AccountId, ActorId, MedicalId, ProfessionalId, ProfessionalKind, Role, VerificationStatus,
};
use medvault_storage::PortalState;

use crate::error::AuthError;
use crate::token::Session;

/// The principal behind a request, with its role-specific identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Patient {
        account: AccountId,
        medical_id: MedicalId,
    },
    Professional {
        account: AccountId,
        kind: ProfessionalKind,
        id: ProfessionalId,
        status: VerificationStatus,
    },
    Admin {
        account: AccountId,
    },
}

impl Actor {
    /// Resolves a verified session against the stored accounts.
    ///
    /// A token whose account no longer exists, or whose role disagrees with
    /// the stored account, is treated like an invalid token.
    pub fn resolve(state: &PortalState, session: &Session) -> Result<Self, AuthError> {
        let stale = || AuthError::unauthorized("Session does not match a known account");

        let account = state.account(&session.subject).ok_or_else(stale)?;
        if account.role != session.role {
            tracing::warn!(
                subject = %session.subject,
                token_role = %session.role,
                "Token role disagrees with stored account"
            );
            return Err(stale());
        }

        match account.role {
            Role::Patient => {
                let patient = state.patient_by_user(&account.id).ok_or_else(stale)?;
                Ok(Self::Patient {
                    account: account.id.clone(),
                    medical_id: patient.medical_id.clone(),
                })
            }
            Role::Doctor => {
                let doctor = state.doctor_by_user(&account.id).ok_or_else(stale)?;
                Ok(Self::Professional {
                    account: account.id.clone(),
                    kind: ProfessionalKind::Doctor,
                    id: doctor.doctor_id.clone(),
                    status: doctor.status,
                })
            }
            Role::Hospital => {
                let hospital = state.hospital_by_user(&account.id).ok_or_else(stale)?;
                Ok(Self::Professional {
                    account: account.id.clone(),
                    kind: ProfessionalKind::Hospital,
                    id: hospital.hospital_id.clone(),
                    status: hospital.status,
                })
            }
            Role::Admin => Ok(Self::Admin {
                account: account.id.clone(),
            }),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Patient { .. } => Role::Patient,
            Self::Professional { kind, .. } => kind.role(),
            Self::Admin { .. } => Role::Admin,
        }
    }

    pub fn account(&self) -> &AccountId {
        match self {
            Self::Patient { account, .. }
            | Self::Professional { account, .. }
            | Self::Admin { account } => account,
        }
    }

    /// Id recorded in audit entries: the professional id for doctors and
    /// hospitals, the account id otherwise.
    pub fn actor_id(&self) -> ActorId {
        match self {
            Self::Professional { id, .. } => ActorId::from(id),
            Self::Patient { account, .. } | Self::Admin { account } => ActorId::from(account),
        }
    }

    pub fn medical_id(&self) -> Option<&MedicalId> {
        match self {
            Self::Patient { medical_id, .. } => Some(medical_id),
            _ => None,
        }
    }

    pub fn professional_id(&self) -> Option<&ProfessionalId> {
        match self {
            Self::Professional { id, .. } => Some(id),
            _ => None,
        }
    }
}
