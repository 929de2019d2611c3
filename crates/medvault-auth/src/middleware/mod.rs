//! HTTP glue for authentication.
//!
//! - Bearer token extraction and validation
//! - JSON error responses for [`AuthError`](crate::error::AuthError)
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use medvault_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn whoami(BearerAuth(session): BearerAuth) -> String {
//!     format!("{} ({})", session.subject, session.role)
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .with_state(AuthState::new(tokens));
//! ```

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth};
pub use error::error_body;
