use std::sync::Arc;

use medvault_core::{
    AuditAction, AuditOutcome, DenyReason, MedicalId, ProfessionalId, ProfessionalKind, Role,
    SealedPayload, VerificationStatus,
};
use medvault_storage::{MemoryStore, PortalStore};
use serde_json::json;

use super::*;
use crate::config::{AuthConfig, PasswordConfig};
use crate::token::Session;

struct Harness {
    store: Arc<MemoryStore>,
    svc: Arc<PortalService>,
    admin: Session,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let config = AuthConfig {
        password: PasswordConfig::insecure_fast(),
        ..Default::default()
    };
    let svc = Arc::new(PortalService::new(store.clone(), &config).unwrap());
    svc.ensure_admin("admin", "admin123").await.unwrap();
    let admin = login(&svc, "admin", "admin123").await;
    Harness { store, svc, admin }
}

async fn login(svc: &PortalService, username: &str, password: &str) -> Session {
    let logged_in = svc
        .login(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
        .unwrap();
    svc.authenticate(&logged_in.token).unwrap()
}

async fn register_patient(svc: &PortalService, username: &str) -> (Session, MedicalId) {
    let registered = svc
        .register(RegisterRequest::new(Role::Patient, username, "patient123"))
        .await
        .unwrap();
    let session = login(svc, username, "patient123").await;
    (session, registered.medical_id.unwrap())
}

async fn register_professional(
    h: &Harness,
    role: Role,
    username: &str,
) -> (Session, ProfessionalId) {
    let mut request = RegisterRequest::new(role, username, "secret123");
    if role == Role::Hospital {
        request.gov_reg_no = Some("REG-1".into());
        request.license_no = Some("LIC-1".into());
    }
    let registered = h.svc.register(request).await.unwrap();
    let id = registered.professional_id.unwrap();
    let kind = role.professional_kind().unwrap();
    h.svc
        .approve(&h.admin, ApproveRequest { kind, id: id.clone() })
        .await
        .unwrap();
    (login(&h.svc, username, "secret123").await, id)
}

fn consent(ids: &[&ProfessionalId]) -> ConsentUpdate {
    ConsentUpdate {
        allowed_ids: ids.iter().map(|id| (*id).clone()).collect(),
    }
}

fn assert_denied(result: Result<impl std::fmt::Debug, AuthError>, reason: DenyReason) {
    match result {
        Err(err) => assert_eq!(err.deny_reason(), Some(reason), "unexpected error {err:?}"),
        Ok(value) => panic!("expected {reason} denial, got {value:?}"),
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_patient_registration_creates_identity_and_empty_consent() {
    let h = harness().await;
    let (session, medical_id) = register_patient(&h.svc, "john").await;

    let suffix = medical_id.as_str().split('-').next_back().unwrap();
    assert!(medical_id.as_str().starts_with("MID-"));
    assert_eq!(suffix.len(), 8);

    let me = h.svc.patient_me(&session).await.unwrap();
    assert_eq!(me.medical_id, medical_id);
    assert!(me.allowed_ids.is_empty());
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let h = harness().await;
    register_patient(&h.svc, "john").await;

    let err = h
        .svc
        .register(RegisterRequest::new(Role::Doctor, "john", "doctor123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_admin_cannot_self_register() {
    let h = harness().await;
    let err = h
        .svc
        .register(RegisterRequest::new(Role::Admin, "root", "rootroot"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest { .. }));
    assert!(!h.store.load().await.unwrap().state.username_taken("root"));
}

#[tokio::test]
async fn test_hospital_registration_requires_numbers() {
    let h = harness().await;
    let err = h
        .svc
        .register(RegisterRequest::new(Role::Hospital, "citycare", "hospital123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let h = harness().await;
    register_patient(&h.svc, "john").await;

    let unknown = h
        .svc
        .login(LoginRequest {
            username: "nobody".into(),
            password: "patient123".into(),
        })
        .await
        .unwrap_err();
    let wrong = h
        .svc
        .login(LoginRequest {
            username: "john".into(),
            password: "patient124".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn test_pending_professional_cannot_login_until_approved() {
    let h = harness().await;
    let registered = h
        .svc
        .register(RegisterRequest::new(Role::Doctor, "drrao", "doctor123"))
        .await
        .unwrap();
    assert_eq!(registered.status, Some(VerificationStatus::Pending));
    let doctor_id = registered.professional_id.unwrap();
    assert!(doctor_id.as_str().starts_with("DOC-"));

    let attempt = |password: &'static str| {
        h.svc.login(LoginRequest {
            username: "drrao".into(),
            password: password.into(),
        })
    };

    assert!(matches!(
        attempt("doctor123").await.unwrap_err(),
        AuthError::AccountNotVerified
    ));
    // status is only revealed after the password checks out
    assert!(matches!(
        attempt("wrong-password").await.unwrap_err(),
        AuthError::InvalidCredentials
    ));

    let pending = h.svc.list_pending(&h.admin).await.unwrap();
    assert_eq!(pending.pending_doctors.len(), 1);

    h.svc
        .approve(
            &h.admin,
            ApproveRequest {
                kind: ProfessionalKind::Doctor,
                id: doctor_id,
            },
        )
        .await
        .unwrap();

    let logged_in = attempt("doctor123").await.unwrap();
    assert_eq!(logged_in.role, Role::Doctor);
    assert!(
        h.svc
            .list_pending(&h.admin)
            .await
            .unwrap()
            .pending_doctors
            .is_empty()
    );
}

#[tokio::test]
async fn test_approval_uses_explicit_kind() {
    let h = harness().await;
    let registered = h
        .svc
        .register(RegisterRequest::new(Role::Doctor, "drrao", "doctor123"))
        .await
        .unwrap();

    let err = h
        .svc
        .approve(
            &h.admin,
            ApproveRequest {
                kind: ProfessionalKind::Hospital,
                id: registered.professional_id.unwrap(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));
}

#[tokio::test]
async fn test_admin_operations_require_admin() {
    let h = harness().await;
    let (patient, _) = register_patient(&h.svc, "john").await;

    assert_denied(h.svc.list_audits(&patient).await, DenyReason::RoleMismatch);
    assert_denied(h.svc.list_pending(&patient).await, DenyReason::RoleMismatch);
}

#[tokio::test]
async fn test_ensure_admin_is_idempotent() {
    let h = harness().await;
    assert!(
        h.svc
            .ensure_admin("admin2", "admin1234")
            .await
            .unwrap()
            .is_none()
    );
    assert!(h.svc.has_accounts(Role::Admin).await.unwrap());
    assert!(!h.svc.has_accounts(Role::Hospital).await.unwrap());
}

#[tokio::test]
async fn test_token_role_must_match_account() {
    let h = harness().await;
    let (patient, _) = register_patient(&h.svc, "john").await;

    let forged = h.svc.tokens().issue(&patient.subject, Role::Admin).unwrap();
    let session = h.svc.authenticate(&forged.token).unwrap();
    let err = h.svc.list_audits(&session).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized { .. }));
}

// =============================================================================
// Clinical access
// =============================================================================

#[tokio::test]
async fn test_end_to_end_consent_flow() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    let (doctor, doctor_id) = register_professional(&h, Role::Doctor, "drrao").await;

    h.svc
        .add_symptoms(
            &patient,
            SymptomsRequest {
                symptoms: vec!["fever".into(), "cough".into()],
            },
        )
        .await
        .unwrap();

    assert_denied(
        h.svc.view_patient(&doctor, &medical_id, None).await,
        DenyReason::NoConsent,
    );

    h.svc
        .set_consent(&patient, consent(&[&doctor_id]))
        .await
        .unwrap();

    let view = h
        .svc
        .view_patient(&doctor, &medical_id, None)
        .await
        .unwrap();
    assert!(!view.emergency);
    assert_eq!(view.records.len(), 1);
    assert_eq!(view.records[0].record_type, "symptoms");
    assert_eq!(view.records[0].data["symptoms"], json!(["fever", "cough"]));

    let audits = h.svc.list_audits(&h.admin).await.unwrap();
    let trail: Vec<_> = audits.iter().map(|e| (e.action, e.outcome)).collect();
    assert_eq!(
        trail,
        vec![
            (AuditAction::CreateSymptoms, AuditOutcome::Allowed),
            (AuditAction::ViewPatient, AuditOutcome::Denied),
            (AuditAction::UpdateConsent, AuditOutcome::Allowed),
            (AuditAction::ViewPatient, AuditOutcome::Allowed),
        ]
    );
    assert_eq!(audits[1].actor_id.as_str(), doctor_id.as_str());
    assert_eq!(audits[1].deny_reason, Some(DenyReason::NoConsent));
    assert!(audits.iter().all(|e| e.medical_id == medical_id));
}

#[tokio::test]
async fn test_consent_is_replaced_not_merged() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    let (doc_a, a) = register_professional(&h, Role::Doctor, "doc-a").await;
    let (doc_b, b) = register_professional(&h, Role::Doctor, "doc-b").await;
    let (doc_c, _) = register_professional(&h, Role::Doctor, "doc-c").await;

    h.svc.set_consent(&patient, consent(&[&a, &b])).await.unwrap();
    assert!(h.svc.view_patient(&doc_a, &medical_id, None).await.is_ok());
    assert!(h.svc.view_patient(&doc_b, &medical_id, None).await.is_ok());
    assert_denied(
        h.svc.view_patient(&doc_c, &medical_id, None).await,
        DenyReason::NoConsent,
    );

    let entry = h.svc.set_consent(&patient, consent(&[&b])).await.unwrap();
    assert_eq!(entry.allowed_ids.len(), 1);
    assert_denied(
        h.svc.view_patient(&doc_a, &medical_id, None).await,
        DenyReason::NoConsent,
    );
    assert!(h.svc.view_patient(&doc_b, &medical_id, None).await.is_ok());
}

#[tokio::test]
async fn test_emergency_read_is_audited_with_reason() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    let (doctor, doctor_id) = register_professional(&h, Role::Doctor, "drrao").await;
    h.svc
        .add_symptoms(
            &patient,
            SymptomsRequest {
                symptoms: vec!["chest pain".into()],
            },
        )
        .await
        .unwrap();
    let before = h.svc.list_audits(&h.admin).await.unwrap().len();

    let view = h
        .svc
        .view_patient(&doctor, &medical_id, Some("chest pain"))
        .await
        .unwrap();
    assert!(view.emergency);
    assert_eq!(view.records.len(), 1);

    let audits = h.svc.list_audits(&h.admin).await.unwrap();
    assert_eq!(audits.len(), before + 1);
    let entry = audits.last().unwrap();
    assert_eq!(entry.action, AuditAction::EmergencyView);
    assert_eq!(entry.outcome, AuditOutcome::Emergency);
    assert_eq!(entry.reason.as_deref(), Some("chest pain"));
    assert_eq!(entry.actor_id.as_str(), doctor_id.as_str());

    // blank reason does not unlock anything
    assert_denied(
        h.svc.view_patient(&doctor, &medical_id, Some("  ")).await,
        DenyReason::NoConsent,
    );
}

#[tokio::test]
async fn test_writes_require_consent() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    let (doctor, doctor_id) = register_professional(&h, Role::Doctor, "drrao").await;
    let (hospital, hospital_id) = register_professional(&h, Role::Hospital, "citycare").await;

    let prescription = || PrescriptionRequest {
        medical_id: medical_id.clone(),
        notes: "after meals".into(),
        medicines: vec!["Aspirin 75mg".into()],
    };
    let report = || ReportRequest {
        medical_id: medical_id.clone(),
        report_type: Some("lab".into()),
        report: json!({"hb": 13.5}),
    };

    // an emergency read first must not open a write path
    h.svc
        .view_patient(&doctor, &medical_id, Some("collapse"))
        .await
        .unwrap();
    assert_denied(
        h.svc.create_prescription(&doctor, prescription()).await,
        DenyReason::NoConsent,
    );
    assert_denied(
        h.svc.upload_report(&hospital, report()).await,
        DenyReason::NoConsent,
    );

    h.svc
        .set_consent(&patient, consent(&[&doctor_id, &hospital_id]))
        .await
        .unwrap();
    h.svc
        .create_prescription(&doctor, prescription())
        .await
        .unwrap();
    h.svc.upload_report(&hospital, report()).await.unwrap();

    let own = h.svc.patient_records(&patient).await.unwrap();
    assert_eq!(own.prescriptions.len(), 1);
    assert_eq!(own.prescriptions[0].doctor_id, doctor_id);
    assert_eq!(own.prescriptions[0].medicines, vec!["Aspirin 75mg"]);
    assert_eq!(own.records.len(), 1);
    assert_eq!(own.records[0].record_type, "lab");
    assert_eq!(own.records[0].data["report"]["hb"], 13.5);
    assert_eq!(own.records[0].data["uploadedBy"], hospital_id.as_str());
}

#[tokio::test]
async fn test_role_mismatch_is_forbidden_and_not_audited() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    let (hospital, hospital_id) = register_professional(&h, Role::Hospital, "citycare").await;
    h.svc
        .set_consent(&patient, consent(&[&hospital_id]))
        .await
        .unwrap();
    let before = h.svc.list_audits(&h.admin).await.unwrap().len();

    assert_denied(
        h.svc
            .create_prescription(
                &hospital,
                PrescriptionRequest {
                    medical_id: medical_id.clone(),
                    notes: String::new(),
                    medicines: vec![],
                },
            )
            .await,
        DenyReason::RoleMismatch,
    );
    assert_denied(
        h.svc.view_patient(&patient, &medical_id, None).await,
        DenyReason::RoleMismatch,
    );
    assert_denied(h.svc.patient_records(&hospital).await, DenyReason::RoleMismatch);
    assert_denied(
        h.svc.view_patient(&h.admin, &medical_id, Some("audit")).await,
        DenyReason::RoleMismatch,
    );

    assert_eq!(h.svc.list_audits(&h.admin).await.unwrap().len(), before);
}

#[tokio::test]
async fn test_unknown_patient_is_not_found() {
    let h = harness().await;
    let (doctor, _) = register_professional(&h, Role::Doctor, "drrao").await;
    let unknown: MedicalId = "MID-2024-00000000".parse().unwrap();

    let err = h
        .svc
        .view_patient(&doctor, &unknown, Some("chest pain"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));
    assert!(h.svc.list_audits(&h.admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_patient_records_are_audited_and_decrypted() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    h.svc
        .add_symptoms(
            &patient,
            SymptomsRequest {
                symptoms: vec!["headache".into()],
            },
        )
        .await
        .unwrap();

    let own = h.svc.patient_records(&patient).await.unwrap();
    assert_eq!(own.medical_id, medical_id);
    assert_eq!(own.records[0].data["symptoms"][0], "headache");

    let last = h.svc.list_audits(&h.admin).await.unwrap();
    assert_eq!(last.last().unwrap().action, AuditAction::ViewOwnRecords);
}

#[tokio::test]
async fn test_own_profile_read_is_audited() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    let before = h.svc.list_audits(&h.admin).await.unwrap().len();

    h.svc.patient_me(&patient).await.unwrap();

    let audits = h.svc.list_audits(&h.admin).await.unwrap();
    assert_eq!(audits.len(), before + 1);
    let entry = audits.last().unwrap();
    assert_eq!(entry.action, AuditAction::ViewOwnProfile);
    assert_eq!(entry.outcome, AuditOutcome::Allowed);
    assert_eq!(entry.medical_id, medical_id);
}

#[tokio::test]
async fn test_records_are_stored_sealed() {
    let h = harness().await;
    let (patient, _) = register_patient(&h.svc, "john").await;
    h.svc
        .add_symptoms(
            &patient,
            SymptomsRequest {
                symptoms: vec!["migraine".into()],
            },
        )
        .await
        .unwrap();

    let raw = serde_json::to_string(&h.store.load().await.unwrap().state).unwrap();
    assert!(!raw.contains("migraine"));
}

#[tokio::test]
async fn test_tampered_record_surfaces_decryption_failure() {
    let h = harness().await;
    let (patient, _) = register_patient(&h.svc, "john").await;
    h.svc
        .add_symptoms(
            &patient,
            SymptomsRequest {
                symptoms: vec!["fever".into()],
            },
        )
        .await
        .unwrap();

    let mut snapshot = h.store.load().await.unwrap();
    let record = &mut snapshot.state.records[0];
    let mut tag = hex::decode(record.sealed.tag()).unwrap();
    tag[0] ^= 0x01;
    record.sealed = SealedPayload::from_parts(
        record.sealed.nonce(),
        record.sealed.ciphertext(),
        hex::encode(tag),
    );
    h.store
        .commit(&snapshot.state, snapshot.version)
        .await
        .unwrap();

    let err = h.svc.patient_records(&patient).await.unwrap_err();
    assert!(matches!(err, AuthError::DecryptionFailure));
}

#[tokio::test]
async fn test_appointments() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    let (_, doctor_id) = register_professional(&h, Role::Doctor, "drrao").await;

    let err = h
        .svc
        .book_appointment(
            &patient,
            AppointmentRequest {
                doctor_id: Some("DOC-000000000000".parse().unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound { .. }));

    let id = h
        .svc
        .book_appointment(
            &patient,
            AppointmentRequest {
                doctor_id: Some(doctor_id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(id.as_str().starts_with("APT-"));

    let state = h.store.load().await.unwrap().state;
    assert_eq!(state.appointments.len(), 1);
    assert_eq!(state.appointments[0].medical_id, medical_id);
    assert_eq!(state.appointments[0].doctor_id, Some(doctor_id));
    assert_eq!(
        state.audits.entries().last().unwrap().action,
        AuditAction::BookAppointment
    );
}

#[tokio::test]
async fn test_concurrent_consent_updates_are_not_lost() {
    let h = harness().await;
    let (patient, medical_id) = register_patient(&h.svc, "john").await;
    let (_, a) = register_professional(&h, Role::Doctor, "doc-a").await;
    let (_, b) = register_professional(&h, Role::Doctor, "doc-b").await;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let svc = Arc::clone(&h.svc);
        let session = patient.clone();
        let pick = if i % 2 == 0 { a.clone() } else { b.clone() };
        tasks.push(tokio::spawn(async move {
            svc.set_consent(&session, ConsentUpdate {
                allowed_ids: vec![pick],
            })
            .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let audits = h.svc.list_audits(&h.admin).await.unwrap();
    let updates = audits
        .iter()
        .filter(|e| e.action == AuditAction::UpdateConsent)
        .count();
    assert_eq!(updates, 16);

    let state = h.store.load().await.unwrap().state;
    let entry = state.consents.entry(&medical_id).unwrap();
    assert_eq!(entry.allowed_ids.len(), 1);
}
