//! Request and response types for portal operations.

use std::fmt;

use medvault_core::{
    AccountId, MedicalId, ProfessionalId, ProfessionalKind, RecordId, Role, Timestamp,
    VerificationStatus,
};
use medvault_storage::{DoctorIdentity, HospitalIdentity, PatientProfile, Prescription};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Accounts
// =============================================================================

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub role: Role,
    pub username: String,
    pub password: String,
    /// Doctor or hospital display name. Defaults to the username.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub gov_reg_no: Option<String>,
    #[serde(default)]
    pub license_no: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
}

impl RegisterRequest {
    pub fn new(role: Role, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            role,
            username: username.into(),
            password: password.into(),
            name: None,
            specialization: None,
            gov_reg_no: None,
            license_no: None,
            national_id: None,
        }
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("role", &self.role)
            .field("username", &self.username)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub user_id: AccountId,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_id: Option<MedicalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_id: Option<ProfessionalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VerificationStatus>,
}

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedIn {
    pub token: String,
    pub role: Role,
    pub expires_at: i64,
}

// =============================================================================
// Patient
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub medical_id: MedicalId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    pub profile: PatientProfile,
    pub allowed_ids: Vec<ProfessionalId>,
}

/// A clinical record after it has been opened for an authorized reader.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedRecord {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub record_type: String,
    pub data: Value,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecords {
    pub medical_id: MedicalId,
    pub records: Vec<OpenedRecord>,
    pub prescriptions: Vec<Prescription>,
    /// Set when the data was released under the emergency override.
    pub emergency: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymptomsRequest {
    #[serde(default)]
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    #[serde(default)]
    pub doctor_id: Option<ProfessionalId>,
    #[serde(default)]
    pub hospital_id: Option<ProfessionalId>,
    /// Defaults to the booking time.
    #[serde(default)]
    pub time: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentUpdate {
    #[serde(default)]
    pub allowed_ids: Vec<ProfessionalId>,
}

// =============================================================================
// Doctor / hospital
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRequest {
    pub medical_id: MedicalId,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub medicines: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub medical_id: MedicalId,
    #[serde(rename = "type", default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub report: Value,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApprovals {
    pub pending_doctors: Vec<DoctorIdentity>,
    pub pending_hospitals: Vec<HospitalIdentity>,
}

/// Approval names the professional kind explicitly; the id prefix is never
/// used to guess it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApproveRequest {
    pub kind: ProfessionalKind,
    pub id: ProfessionalId,
}

#[derive(Debug, Clone, Serialize)]
pub struct Approved {
    pub kind: ProfessionalKind,
    pub id: ProfessionalId,
    pub status: VerificationStatus,
}
