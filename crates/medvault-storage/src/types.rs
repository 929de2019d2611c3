//! Persisted portal state.
//!
//! The whole portal is one document. Field names follow the camelCase layout
//! of the on-disk JSON.

use std::fmt;

use medvault_core::{
    AccountId, AppointmentId, AuditLog, ConsentLedger, MedicalId, PrescriptionId, ProfessionalId,
    RecordId, Role, SealedPayload, Timestamp, VerificationStatus,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Accounts and identities
// =============================================================================

/// A login account. The digest is the credential manager's PHC string.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub role: Role,
    pub username: String,
    pub password_digest: String,
    pub created_at: Timestamp,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("username", &self.username)
            .field("password_digest", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientProfile {
    pub allergies: Vec<String>,
    pub vaccinations: Vec<String>,
    pub surgeries: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientIdentity {
    pub user_id: AccountId,
    pub medical_id: MedicalId,
    /// Government identity number supplied at registration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default)]
    pub profile: PatientProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorIdentity {
    pub user_id: AccountId,
    pub doctor_id: ProfessionalId,
    pub name: String,
    pub specialization: String,
    pub status: VerificationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalIdentity {
    pub user_id: AccountId,
    pub hospital_id: ProfessionalId,
    pub name: String,
    pub gov_reg_no: String,
    pub license_no: String,
    pub status: VerificationStatus,
}

// =============================================================================
// Clinical data
// =============================================================================

/// Append-only clinical record whose payload only the record codec can open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalRecord {
    pub id: RecordId,
    pub medical_id: MedicalId,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(rename = "encData")]
    pub sealed: SealedPayload,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: PrescriptionId,
    pub medical_id: MedicalId,
    pub doctor_id: ProfessionalId,
    pub created_at: Timestamp,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub medicines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[default]
    Booked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub medical_id: MedicalId,
    #[serde(default)]
    pub doctor_id: Option<ProfessionalId>,
    #[serde(default)]
    pub hospital_id: Option<ProfessionalId>,
    pub time: Timestamp,
    #[serde(default)]
    pub status: AppointmentStatus,
}

// =============================================================================
// Portal state
// =============================================================================

/// Everything the portal persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortalState {
    pub users: Vec<Account>,
    pub patients: Vec<PatientIdentity>,
    pub doctors: Vec<DoctorIdentity>,
    pub hospitals: Vec<HospitalIdentity>,
    pub records: Vec<ClinicalRecord>,
    pub prescriptions: Vec<Prescription>,
    pub appointments: Vec<Appointment>,
    pub consents: ConsentLedger,
    pub audits: AuditLog,
}

impl PortalState {
    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.users.iter().find(|u| &u.id == id)
    }

    pub fn account_by_username(&self, username: &str) -> Option<&Account> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn username_taken(&self, username: &str) -> bool {
        self.account_by_username(username).is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.users.iter().any(|u| u.role == role)
    }

    pub fn patient_by_user(&self, user_id: &AccountId) -> Option<&PatientIdentity> {
        self.patients.iter().find(|p| &p.user_id == user_id)
    }

    pub fn patient(&self, medical_id: &MedicalId) -> Option<&PatientIdentity> {
        self.patients.iter().find(|p| &p.medical_id == medical_id)
    }

    pub fn doctor_by_user(&self, user_id: &AccountId) -> Option<&DoctorIdentity> {
        self.doctors.iter().find(|d| &d.user_id == user_id)
    }

    pub fn doctor_mut(&mut self, doctor_id: &ProfessionalId) -> Option<&mut DoctorIdentity> {
        self.doctors.iter_mut().find(|d| &d.doctor_id == doctor_id)
    }

    pub fn hospital_by_user(&self, user_id: &AccountId) -> Option<&HospitalIdentity> {
        self.hospitals.iter().find(|h| &h.user_id == user_id)
    }

    pub fn hospital_mut(&mut self, hospital_id: &ProfessionalId) -> Option<&mut HospitalIdentity> {
        self.hospitals
            .iter_mut()
            .find(|h| &h.hospital_id == hospital_id)
    }

    pub fn records_for<'a>(
        &'a self,
        medical_id: &'a MedicalId,
    ) -> impl Iterator<Item = &'a ClinicalRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| &r.medical_id == medical_id)
    }

    pub fn prescriptions_for<'a>(
        &'a self,
        medical_id: &'a MedicalId,
    ) -> impl Iterator<Item = &'a Prescription> + 'a {
        self.prescriptions
            .iter()
            .filter(move |p| &p.medical_id == medical_id)
    }
}
