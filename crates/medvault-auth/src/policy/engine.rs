//! The access control engine: the single decision point for clinical data.
//!
//! # Decision procedure
//!
//! 1. The actor's role must be allowed to perform the action at all. Patients
//!    may only act on their own medical id; doctors and hospitals must be
//!    active. Failing here is a `RoleMismatch` or `NotVerified` denial and is
//!    not audited.
//! 2. Patients acting on their own data are allowed.
//! 3. A professional in the patient's consent set is allowed.
//! 4. A read with a non-empty emergency reason is allowed as an emergency.
//! 5. Anything else is denied with `NoConsent`.
//!
//! Every outcome from step 2 onward appends exactly one audit entry.

use medvault_core::{
    AuditAction, AuditId, AuditLog, AuditRecord, ConsentLedger, DenyReason, Intent, MedicalId,
    Role,
};

use super::context::Actor;

// =============================================================================
// Access Decision
// =============================================================================

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Consented access, or a patient acting on their own data.
    Allow,
    /// Read-only override with a recorded reason.
    AllowEmergency,
    Deny(DenyReason),
}

impl AccessDecision {
    /// Returns `true` for both allow variants.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow | Self::AllowEmergency)
    }

    #[must_use]
    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::AllowEmergency)
    }

    #[must_use]
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Deny(reason) => Some(*reason),
            _ => None,
        }
    }
}

// =============================================================================
// Access Request
// =============================================================================

/// One attempted access to a patient's clinical data.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub actor: &'a Actor,
    pub medical_id: &'a MedicalId,
    pub action: AuditAction,
    /// Present when the caller asked for the emergency override.
    pub emergency_reason: Option<&'a str>,
}

impl<'a> AccessRequest<'a> {
    pub fn new(actor: &'a Actor, medical_id: &'a MedicalId, action: AuditAction) -> Self {
        Self {
            actor,
            medical_id,
            action,
            emergency_reason: None,
        }
    }

    #[must_use]
    pub fn with_emergency(mut self, reason: Option<&'a str>) -> Self {
        self.emergency_reason = reason;
        self
    }

    pub fn intent(&self) -> Intent {
        intent_of(self.action)
    }
}

/// Whether an action reads or writes clinical data.
pub fn intent_of(action: AuditAction) -> Intent {
    match action {
        AuditAction::ViewPatient
        | AuditAction::EmergencyView
        | AuditAction::ViewOwnProfile
        | AuditAction::ViewOwnRecords => Intent::Read,
        AuditAction::CreatePrescription
        | AuditAction::UploadReport
        | AuditAction::CreateSymptoms
        | AuditAction::BookAppointment
        | AuditAction::UpdateConsent => Intent::Write,
    }
}

/// Roles that may attempt an action.
fn permitted_roles(action: AuditAction) -> &'static [Role] {
    match action {
        AuditAction::ViewPatient | AuditAction::EmergencyView => &[Role::Doctor, Role::Hospital],
        AuditAction::CreatePrescription => &[Role::Doctor],
        AuditAction::UploadReport => &[Role::Hospital],
        AuditAction::ViewOwnProfile
        | AuditAction::ViewOwnRecords
        | AuditAction::CreateSymptoms
        | AuditAction::BookAppointment
        | AuditAction::UpdateConsent => &[Role::Patient],
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless evaluator over the consent ledger, appending to the audit log.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessControlEngine;

impl AccessControlEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decides an access and records it.
    pub fn check_access(
        &self,
        consents: &ConsentLedger,
        audits: &mut AuditLog,
        request: &AccessRequest<'_>,
    ) -> AccessDecision {
        if let Some(reason) = self.screen(request) {
            tracing::warn!(
                actor = %request.actor.actor_id(),
                role = %request.actor.role(),
                action = request.action.as_str(),
                medical_id = %request.medical_id,
                reason = %reason,
                "Access refused before consent check"
            );
            return AccessDecision::Deny(reason);
        }

        let decision = self.evaluate(consents, request);
        let audit_id = self.record(audits, request, decision);

        match decision {
            AccessDecision::Allow => tracing::info!(
                actor = %request.actor.actor_id(),
                action = request.action.as_str(),
                medical_id = %request.medical_id,
                audit_id = %audit_id,
                "Access allowed"
            ),
            AccessDecision::AllowEmergency => tracing::warn!(
                actor = %request.actor.actor_id(),
                medical_id = %request.medical_id,
                audit_id = %audit_id,
                "Emergency access granted"
            ),
            AccessDecision::Deny(reason) => tracing::warn!(
                actor = %request.actor.actor_id(),
                action = request.action.as_str(),
                medical_id = %request.medical_id,
                audit_id = %audit_id,
                reason = %reason,
                "Access denied"
            ),
        }

        decision
    }

    /// Step 1: role and verification gate.
    fn screen(&self, request: &AccessRequest<'_>) -> Option<DenyReason> {
        if !permitted_roles(request.action).contains(&request.actor.role()) {
            return Some(DenyReason::RoleMismatch);
        }

        match request.actor {
            Actor::Patient { medical_id, .. } if medical_id != request.medical_id => {
                Some(DenyReason::RoleMismatch)
            }
            Actor::Professional { status, .. } if !status.is_active() => {
                Some(DenyReason::NotVerified)
            }
            _ => None,
        }
    }

    fn evaluate(&self, consents: &ConsentLedger, request: &AccessRequest<'_>) -> AccessDecision {
        let professional = match request.actor {
            Actor::Patient { .. } => return AccessDecision::Allow,
            Actor::Professional { id, .. } => id,
            Actor::Admin { .. } => return AccessDecision::Deny(DenyReason::RoleMismatch),
        };

        if consents.is_allowed(request.medical_id, professional) {
            return AccessDecision::Allow;
        }

        let has_reason = request
            .emergency_reason
            .is_some_and(|reason| !reason.trim().is_empty());
        if has_reason && request.intent() == Intent::Read {
            return AccessDecision::AllowEmergency;
        }

        AccessDecision::Deny(DenyReason::NoConsent)
    }

    fn record(
        &self,
        audits: &mut AuditLog,
        request: &AccessRequest<'_>,
        decision: AccessDecision,
    ) -> AuditId {
        let actor = request.actor.actor_id();
        let medical_id = request.medical_id.clone();

        let record = match decision {
            AccessDecision::Allow => AuditRecord::new(actor, request.action, medical_id),
            AccessDecision::AllowEmergency => {
                let reason = request.emergency_reason.unwrap_or_default().trim();
                AuditRecord::new(actor, AuditAction::EmergencyView, medical_id).emergency(reason)
            }
            AccessDecision::Deny(reason) => {
                AuditRecord::new(actor, request.action, medical_id).denied(reason)
            }
        };

        audits.append(record)
    }
}
