//! Bearer token authentication extractor.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::token::{Session, TokenService};

// =============================================================================
// Auth State
// =============================================================================

/// State required by [`BearerAuth`], made available through `FromRef`.
///
/// ```ignore
/// #[derive(Clone)]
/// struct AppState {
///     auth: AuthState,
/// }
///
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
}

impl AuthState {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor that validates `Authorization: Bearer <token>` and yields
/// the verified [`Session`].
///
/// Every failure is the same `Unauthorized` rejection. The session still has
/// to be resolved against current state by the operation that uses it.
pub struct BearerAuth(pub Session);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AuthError::unauthorized("Missing or malformed Authorization header"))?;

        let session = auth_state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            e
        })?;

        Ok(Self(session))
    }
}

/// Extracts the token from a `Bearer` header value. The scheme is matched
/// case-insensitively.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use medvault_core::{AccountId, Role};

    use super::*;
    use crate::config::TokenConfig;

    fn auth_state() -> AuthState {
        AuthState::new(Arc::new(TokenService::new(&TokenConfig::default()).unwrap()))
    }

    async fn extract(state: &AuthState, header: Option<&str>) -> Result<Session, AuthError> {
        let mut builder = Request::builder().uri("/api/patient/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        BearerAuth::from_request_parts(&mut parts, state)
            .await
            .map(|BearerAuth(session)| session)
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[tokio::test]
    async fn test_valid_token_yields_session() {
        let state = auth_state();
        let account = AccountId::generate();
        let issued = state.tokens.issue(&account, Role::Doctor).unwrap();

        let session = extract(&state, Some(&format!("Bearer {}", issued.token)))
            .await
            .unwrap();
        assert_eq!(session.subject, account);
        assert_eq!(session.role, Role::Doctor);
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_is_unauthorized() {
        let state = auth_state();

        for header in [None, Some("Bearer"), Some("Token xyz"), Some("Bearer not.a.jwt")] {
            let err = extract(&state, header).await.unwrap_err();
            assert!(
                matches!(err, AuthError::Unauthorized { .. }),
                "{header:?} gave {err:?}"
            );
        }
    }
}
