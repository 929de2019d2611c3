//! Doctor and hospital access to another patient's data.

use medvault_core::{
    AuditAction, DenyReason, MedicalId, PrescriptionId, ProfessionalId, RecordId, Role, Timestamp,
    now_utc,
};
use medvault_storage::{ClinicalRecord, PortalState, Prescription};
use serde::Serialize;
use serde_json::Value;

use super::{PatientRecords, PortalService, PrescriptionRequest, ReportRequest, require_role};
use crate::error::AuthError;
use crate::policy::Actor;
use crate::token::Session;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportPayload<'a> {
    report: &'a Value,
    uploaded_by: &'a ProfessionalId,
    created_at: Timestamp,
}

fn require_patient(state: &PortalState, medical_id: &MedicalId) -> Result<(), AuthError> {
    if state.patient(medical_id).is_some() {
        Ok(())
    } else {
        Err(AuthError::not_found("Patient", medical_id.to_string()))
    }
}

fn professional_id(actor: &Actor) -> Result<ProfessionalId, AuthError> {
    actor
        .professional_id()
        .cloned()
        .ok_or_else(|| AuthError::internal("professional actor without professional id"))
}

impl PortalService {
    /// A doctor or hospital reads a patient's records and prescriptions.
    ///
    /// `emergency_reason` requests the read-only override; it only takes
    /// effect when consent is missing and the reason is not blank.
    pub async fn view_patient(
        &self,
        session: &Session,
        medical_id: &MedicalId,
        emergency_reason: Option<&str>,
    ) -> Result<PatientRecords, AuthError> {
        let (decision, sealed, prescriptions) = self
            .write(|state| {
                let actor = Actor::resolve(state, session)?;
                if !matches!(actor.role(), Role::Doctor | Role::Hospital) {
                    return Err(AuthError::forbidden(DenyReason::RoleMismatch));
                }
                require_patient(state, medical_id)?;

                let decision = self.authorize(
                    state,
                    &actor,
                    medical_id,
                    AuditAction::ViewPatient,
                    emergency_reason,
                )?;

                let sealed: Vec<_> = state.records_for(medical_id).cloned().collect();
                let prescriptions: Vec<_> =
                    state.prescriptions_for(medical_id).cloned().collect();
                Ok((decision, sealed, prescriptions))
            })
            .await?;

        Ok(PatientRecords {
            medical_id: medical_id.clone(),
            records: self.open_records(sealed)?,
            prescriptions,
            emergency: decision.is_emergency(),
        })
    }

    /// A consented doctor writes a prescription. Never available through the
    /// emergency override.
    pub async fn create_prescription(
        &self,
        session: &Session,
        request: PrescriptionRequest,
    ) -> Result<PrescriptionId, AuthError> {
        self.write(|state| {
            let actor = Actor::resolve(state, session)?;
            require_role(&actor, Role::Doctor)?;
            require_patient(state, &request.medical_id)?;
            let doctor_id = professional_id(&actor)?;

            self.authorize(
                state,
                &actor,
                &request.medical_id,
                AuditAction::CreatePrescription,
                None,
            )?;

            let id = PrescriptionId::generate();
            state.prescriptions.push(Prescription {
                id: id.clone(),
                medical_id: request.medical_id.clone(),
                doctor_id,
                created_at: now_utc(),
                notes: request.notes.clone(),
                medicines: request.medicines.clone(),
            });
            Ok(id)
        })
        .await
    }

    /// A consented hospital uploads a sealed report.
    pub async fn upload_report(
        &self,
        session: &Session,
        request: ReportRequest,
    ) -> Result<RecordId, AuthError> {
        self.write(|state| {
            let actor = Actor::resolve(state, session)?;
            require_role(&actor, Role::Hospital)?;
            require_patient(state, &request.medical_id)?;

            let hospital_id = professional_id(&actor)?;
            let created_at = now_utc();
            let sealed = self.codec.seal(&ReportPayload {
                report: &request.report,
                uploaded_by: &hospital_id,
                created_at,
            })?;

            self.authorize(
                state,
                &actor,
                &request.medical_id,
                AuditAction::UploadReport,
                None,
            )?;

            let id = RecordId::generate();
            state.records.push(ClinicalRecord {
                id: id.clone(),
                medical_id: request.medical_id.clone(),
                record_type: request
                    .report_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or("report")
                    .to_string(),
                sealed,
                created_at,
            });
            Ok(id)
        })
        .await
    }
}
