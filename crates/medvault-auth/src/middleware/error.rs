//! `IntoResponse` for [`AuthError`].
//!
//! Bodies are `{"error": <code>, "message": <text>}`. Denial reasons and
//! server-side details stay in the logs.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = error_details(&self);

        if status.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Request failed");
        } else if let Some(reason) = self.deny_reason() {
            tracing::debug!(reason = %reason, "Request forbidden");
        }

        let mut response = (status, Json(error_body(self.code(), &message))).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"medvault\""),
            );
        }

        response
    }
}

/// Maps an error to its HTTP status and client-facing message.
fn error_details(error: &AuthError) -> (StatusCode, String) {
    match error {
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        }
        AuthError::Unauthorized { message } => (StatusCode::UNAUTHORIZED, message.clone()),
        AuthError::AccountNotVerified => (
            StatusCode::FORBIDDEN,
            "Account is awaiting administrator approval".to_string(),
        ),
        AuthError::Forbidden { .. } => (StatusCode::FORBIDDEN, "Access denied".to_string()),
        AuthError::NotFound { resource, .. } => {
            (StatusCode::NOT_FOUND, format!("{resource} not found"))
        }
        AuthError::InvalidRequest { message } => (StatusCode::BAD_REQUEST, message.clone()),
        AuthError::DecryptionFailure
        | AuthError::Storage { .. }
        | AuthError::Configuration { .. }
        | AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

/// JSON error body shared with the server's own rejections.
#[must_use]
pub fn error_body(code: &str, message: &str) -> Value {
    json!({
        "error": code,
        "message": message,
    })
}
