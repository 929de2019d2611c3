//! HTTP handlers. Each one unwraps the request, calls a single
//! [`PortalService`](medvault_auth::PortalService) operation and shapes the
//! JSON response.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use medvault_auth::service::{
    AppointmentRequest, ApproveRequest, ConsentUpdate, LoginRequest, PrescriptionRequest,
    RegisterRequest, ReportRequest, SymptomsRequest,
};
use medvault_auth::{AuthError, BearerAuth};
use medvault_auth::middleware::error_body;
use medvault_core::MedicalId;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::server::AppState;

type ApiResult<T> = Result<T, AuthError>;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AuthError::invalid_request(rejection.body_text()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(error_body("not_found", "No such route")),
    )
}

// =============================================================================
// Accounts
// =============================================================================

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let registered = state.service.register(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let logged_in = state.service.login(json_body(payload)?).await?;
    Ok(Json(logged_in))
}

// =============================================================================
// Patient
// =============================================================================

pub async fn patient_me(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
) -> ApiResult<impl IntoResponse> {
    let patient = state.service.patient_me(&session).await?;
    Ok(Json(json!({ "patient": patient })))
}

pub async fn patient_records(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.patient_records(&session).await?))
}

pub async fn add_symptoms(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    payload: Result<Json<SymptomsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let record_id = state
        .service
        .add_symptoms(&session, json_body(payload)?)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "recordId": record_id }))))
}

pub async fn book_appointment(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    payload: Result<Json<AppointmentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let appointment_id = state
        .service
        .book_appointment(&session, json_body(payload)?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "appointmentId": appointment_id })),
    ))
}

pub async fn set_consent(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    payload: Result<Json<ConsentUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let entry = state
        .service
        .set_consent(&session, json_body(payload)?)
        .await?;
    Ok(Json(json!({
        "medicalId": entry.medical_id,
        "allowedIds": entry.allowed_ids,
    })))
}

// =============================================================================
// Doctor / hospital
// =============================================================================

/// `?emergency=true&reason=...`
#[derive(Debug, Default, Deserialize)]
pub struct EmergencyQuery {
    #[serde(default)]
    pub emergency: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl EmergencyQuery {
    /// The override reason, present only when the override was requested.
    /// A missing reason is passed on as blank so the request is judged on
    /// consent alone.
    fn reason(&self) -> Option<&str> {
        self.emergency
            .then(|| self.reason.as_deref().unwrap_or_default())
    }
}

pub async fn view_patient(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    Path(medical_id): Path<String>,
    query: Result<Query<EmergencyQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) =
        query.map_err(|rejection| AuthError::invalid_request(rejection.body_text()))?;
    let medical_id: MedicalId = medical_id.parse()?;

    let records = state
        .service
        .view_patient(&session, &medical_id, query.reason())
        .await?;
    Ok(Json(records))
}

pub async fn create_prescription(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    payload: Result<Json<PrescriptionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let prescription_id = state
        .service
        .create_prescription(&session, json_body(payload)?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "prescriptionId": prescription_id })),
    ))
}

pub async fn upload_report(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let record_id = state
        .service
        .upload_report(&session, json_body(payload)?)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "recordId": record_id }))))
}

// =============================================================================
// Admin
// =============================================================================

pub async fn list_pending(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_pending(&session).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
    payload: Result<Json<ApproveRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let approved = state
        .service
        .approve(&session, json_body(payload)?)
        .await?;
    Ok(Json(approved))
}

pub async fn list_audits(
    State(state): State<AppState>,
    BearerAuth(session): BearerAuth,
) -> ApiResult<impl IntoResponse> {
    let audits = state.service.list_audits(&session).await?;
    Ok(Json(json!({ "audits": audits })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emergency_query_reason() {
        let plain = EmergencyQuery::default();
        assert_eq!(plain.reason(), None);

        let flagged = EmergencyQuery {
            emergency: true,
            reason: Some("chest pain".into()),
        };
        assert_eq!(flagged.reason(), Some("chest pain"));

        let no_reason = EmergencyQuery {
            emergency: true,
            reason: None,
        };
        assert_eq!(no_reason.reason(), Some(""));

        // a reason without the flag is ignored
        let unflagged = EmergencyQuery {
            emergency: false,
            reason: Some("chest pain".into()),
        };
        assert_eq!(unflagged.reason(), None);
    }
}
