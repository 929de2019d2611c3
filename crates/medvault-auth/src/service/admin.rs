//! Administrator operations: approvals and the audit trail.

use medvault_core::{AuditEntry, ProfessionalKind, Role, VerificationStatus};

use super::{ApproveRequest, Approved, PendingApprovals, PortalService, require_role};
use crate::error::AuthError;
use crate::policy::Actor;
use crate::token::Session;

impl PortalService {
    /// Doctors and hospitals awaiting approval.
    pub async fn list_pending(&self, session: &Session) -> Result<PendingApprovals, AuthError> {
        let state = self.snapshot().await?;
        let actor = Actor::resolve(&state, session)?;
        require_role(&actor, Role::Admin)?;

        Ok(PendingApprovals {
            pending_doctors: state
                .doctors
                .iter()
                .filter(|d| !d.status.is_active())
                .cloned()
                .collect(),
            pending_hospitals: state
                .hospitals
                .iter()
                .filter(|h| !h.status.is_active())
                .cloned()
                .collect(),
        })
    }

    /// Moves a professional from `Pending` to `Active`. Approving an already
    /// active professional is a no-op.
    pub async fn approve(
        &self,
        session: &Session,
        request: ApproveRequest,
    ) -> Result<Approved, AuthError> {
        let approved = self
            .write(|state| {
                let actor = Actor::resolve(state, session)?;
                require_role(&actor, Role::Admin)?;

                let status = match request.kind {
                    ProfessionalKind::Doctor => {
                        &mut state
                            .doctor_mut(&request.id)
                            .ok_or_else(|| AuthError::not_found("Doctor", request.id.to_string()))?
                            .status
                    }
                    ProfessionalKind::Hospital => {
                        &mut state
                            .hospital_mut(&request.id)
                            .ok_or_else(|| {
                                AuthError::not_found("Hospital", request.id.to_string())
                            })?
                            .status
                    }
                };
                *status = VerificationStatus::Active;

                Ok(Approved {
                    kind: request.kind,
                    id: request.id.clone(),
                    status: *status,
                })
            })
            .await?;

        tracing::info!(kind = %approved.kind, id = %approved.id, "Professional approved");
        Ok(approved)
    }

    /// The full audit trail in insertion order.
    pub async fn list_audits(&self, session: &Session) -> Result<Vec<AuditEntry>, AuthError> {
        let state = self.snapshot().await?;
        let actor = Actor::resolve(&state, session)?;
        require_role(&actor, Role::Admin)?;
        Ok(state.audits.entries().to_vec())
    }
}
