//! Append-only audit trail.
//!
//! [`AuditLog`] offers no update or removal operation. Entries keep insertion
//! order, which is the only ordering guarantee. The log trusts its caller:
//! restricting who may list entries is the access layer's job.

use serde::{Deserialize, Serialize};

use crate::access::DenyReason;
use crate::id::{ActorId, AuditId, MedicalId};
use crate::time::{Timestamp, now_utc};

/// Audited clinical-data actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    // Professional access to another patient
    ViewPatient,
    EmergencyView,
    CreatePrescription,
    UploadReport,

    // Patient access to their own data
    ViewOwnProfile,
    ViewOwnRecords,
    CreateSymptoms,
    BookAppointment,
    UpdateConsent,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ViewPatient => "VIEW_PATIENT",
            AuditAction::EmergencyView => "EMERGENCY_VIEW",
            AuditAction::CreatePrescription => "CREATE_PRESCRIPTION",
            AuditAction::UploadReport => "UPLOAD_REPORT",
            AuditAction::ViewOwnProfile => "VIEW_OWN_PROFILE",
            AuditAction::ViewOwnRecords => "VIEW_OWN_RECORDS",
            AuditAction::CreateSymptoms => "CREATE_SYMPTOMS",
            AuditAction::BookAppointment => "BOOK_APPOINTMENT",
            AuditAction::UpdateConsent => "UPDATE_CONSENT",
        }
    }
}

/// Result of the access decision being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allowed,
    /// Allowed through the read-only emergency override.
    Emergency,
    Denied,
}

/// A stored, immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: AuditId,
    pub actor_id: ActorId,
    pub action: AuditAction,
    pub medical_id: MedicalId,
    pub time: Timestamp,
    pub outcome: AuditOutcome,
    /// Emergency justification supplied by the actor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_reason: Option<DenyReason>,
}

/// An event waiting to be appended; the log assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    actor_id: ActorId,
    action: AuditAction,
    medical_id: MedicalId,
    outcome: AuditOutcome,
    reason: Option<String>,
    deny_reason: Option<DenyReason>,
}

impl AuditRecord {
    pub fn new(actor_id: ActorId, action: AuditAction, medical_id: MedicalId) -> Self {
        Self {
            actor_id,
            action,
            medical_id,
            outcome: AuditOutcome::Allowed,
            reason: None,
            deny_reason: None,
        }
    }

    pub fn emergency(mut self, reason: impl Into<String>) -> Self {
        self.outcome = AuditOutcome::Emergency;
        self.reason = Some(reason.into());
        self
    }

    pub fn denied(mut self, reason: DenyReason) -> Self {
        self.outcome = AuditOutcome::Denied;
        self.deny_reason = Some(reason);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps and appends a record, returning the new entry's id.
    pub fn append(&mut self, record: AuditRecord) -> AuditId {
        let id = AuditId::generate();
        self.entries.push(AuditEntry {
            id: id.clone(),
            actor_id: record.actor_id,
            action: record.action,
            medical_id: record.medical_id,
            time: now_utc(),
            outcome: record.outcome,
            reason: record.reason,
            deny_reason: record.deny_reason,
        });
        id
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn for_patient<'a>(
        &'a self,
        medical_id: &'a MedicalId,
    ) -> impl Iterator<Item = &'a AuditEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| &entry.medical_id == medical_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
