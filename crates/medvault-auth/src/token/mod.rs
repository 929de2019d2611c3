//! Session token issuance and verification.

pub mod jwt;

pub use jwt::{IssuedToken, MIN_TTL, Session, SessionClaims, TokenService};
