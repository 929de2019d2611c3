//! Operations a patient performs on their own data.

use medvault_core::{
    AppointmentId, AuditAction, ConsentEntry, MedicalId, RecordId, Role, Timestamp, now_utc,
};
use medvault_storage::{Appointment, AppointmentStatus, ClinicalRecord};
use serde::Serialize;

use super::{
    AppointmentRequest, ConsentUpdate, PatientRecords, PatientSummary, PortalService,
    SymptomsRequest, require_role,
};
use crate::error::AuthError;
use crate::policy::Actor;
use crate::token::Session;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SymptomsPayload<'a> {
    symptoms: &'a [String],
    created_at: Timestamp,
}

fn own_medical_id(actor: &Actor) -> Result<MedicalId, AuthError> {
    actor
        .medical_id()
        .cloned()
        .ok_or_else(|| AuthError::internal("patient actor without medical id"))
}

impl PortalService {
    /// The caller's own patient profile and current consent set. Audited as an
    /// owner read like the records view.
    pub async fn patient_me(&self, session: &Session) -> Result<PatientSummary, AuthError> {
        self.write(|state| {
            let actor = Actor::resolve(state, session)?;
            require_role(&actor, Role::Patient)?;
            let medical_id = own_medical_id(&actor)?;

            self.authorize(state, &actor, &medical_id, AuditAction::ViewOwnProfile, None)?;

            let patient = state
                .patient_by_user(actor.account())
                .ok_or_else(|| AuthError::not_found("Patient", actor.account().to_string()))?;
            let allowed_ids = state
                .consents
                .entry(&patient.medical_id)
                .map(|entry| entry.allowed_ids.iter().cloned().collect())
                .unwrap_or_default();

            Ok(PatientSummary {
                medical_id: patient.medical_id.clone(),
                national_id: patient.national_id.clone(),
                profile: patient.profile.clone(),
                allowed_ids,
            })
        })
        .await
    }

    /// The caller's own records, opened, plus prescriptions written for them.
    pub async fn patient_records(&self, session: &Session) -> Result<PatientRecords, AuthError> {
        let (medical_id, sealed, prescriptions) = self
            .write(|state| {
                let actor = Actor::resolve(state, session)?;
                require_role(&actor, Role::Patient)?;
                let medical_id = own_medical_id(&actor)?;

                self.authorize(state, &actor, &medical_id, AuditAction::ViewOwnRecords, None)?;

                let sealed: Vec<_> = state.records_for(&medical_id).cloned().collect();
                let prescriptions: Vec<_> =
                    state.prescriptions_for(&medical_id).cloned().collect();
                Ok((medical_id, sealed, prescriptions))
            })
            .await?;

        Ok(PatientRecords {
            medical_id,
            records: self.open_records(sealed)?,
            prescriptions,
            emergency: false,
        })
    }

    /// Seals a symptoms entry into the caller's record.
    pub async fn add_symptoms(
        &self,
        session: &Session,
        request: SymptomsRequest,
    ) -> Result<RecordId, AuthError> {
        self.write(|state| {
            let actor = Actor::resolve(state, session)?;
            require_role(&actor, Role::Patient)?;
            let medical_id = own_medical_id(&actor)?;

            let created_at = now_utc();
            let sealed = self.codec.seal(&SymptomsPayload {
                symptoms: &request.symptoms,
                created_at,
            })?;

            self.authorize(state, &actor, &medical_id, AuditAction::CreateSymptoms, None)?;

            let id = RecordId::generate();
            state.records.push(ClinicalRecord {
                id: id.clone(),
                medical_id,
                record_type: "symptoms".to_string(),
                sealed,
                created_at,
            });
            Ok(id)
        })
        .await
    }

    /// Books an appointment with a known doctor and/or hospital.
    pub async fn book_appointment(
        &self,
        session: &Session,
        request: AppointmentRequest,
    ) -> Result<AppointmentId, AuthError> {
        self.write(|state| {
            let actor = Actor::resolve(state, session)?;
            require_role(&actor, Role::Patient)?;
            let medical_id = own_medical_id(&actor)?;

            if let Some(doctor_id) = &request.doctor_id {
                if !state.doctors.iter().any(|d| &d.doctor_id == doctor_id) {
                    return Err(AuthError::not_found("Doctor", doctor_id.to_string()));
                }
            }
            if let Some(hospital_id) = &request.hospital_id {
                if !state.hospitals.iter().any(|h| &h.hospital_id == hospital_id) {
                    return Err(AuthError::not_found("Hospital", hospital_id.to_string()));
                }
            }

            self.authorize(state, &actor, &medical_id, AuditAction::BookAppointment, None)?;

            let id = AppointmentId::generate();
            state.appointments.push(Appointment {
                id: id.clone(),
                medical_id,
                doctor_id: request.doctor_id.clone(),
                hospital_id: request.hospital_id.clone(),
                time: request.time.unwrap_or_else(now_utc),
                status: AppointmentStatus::Booked,
            });
            Ok(id)
        })
        .await
    }

    /// Replaces the caller's consent set with exactly `allowed_ids`.
    pub async fn set_consent(
        &self,
        session: &Session,
        update: ConsentUpdate,
    ) -> Result<ConsentEntry, AuthError> {
        let entry = self
            .write(|state| {
                let actor = Actor::resolve(state, session)?;
                require_role(&actor, Role::Patient)?;
                let medical_id = own_medical_id(&actor)?;

                if state.consents.entry(&medical_id).is_none() {
                    return Err(AuthError::not_found("Consent", medical_id.to_string()));
                }

                self.authorize(state, &actor, &medical_id, AuditAction::UpdateConsent, None)?;

                let entry = state
                    .consents
                    .set_allowed(&medical_id, update.allowed_ids.iter().cloned())?;
                Ok(entry.clone())
            })
            .await?;

        tracing::info!(
            medical_id = %entry.medical_id,
            allowed = entry.allowed_ids.len(),
            "Consent replaced"
        );
        Ok(entry)
    }
}
