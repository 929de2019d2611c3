//! Consent-based access control.
//!
//! - [`context`] - resolving a session into an [`Actor`]
//! - [`engine`] - the allow / emergency / deny decision and its audit entry

pub mod context;
pub mod engine;

pub use context::Actor;
pub use engine::{AccessControlEngine, AccessDecision, AccessRequest, intent_of};
