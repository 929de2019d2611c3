//! # medvault-core
//!
//! Shared building blocks for the MedVault portal:
//!
//! - [`id`] - prefixed identifiers (accounts, medical ids, professionals, records)
//! - [`role`] - account roles and professional verification status
//! - [`time`] - RFC 3339 timestamps
//! - [`access`] - access intents and denial reasons
//! - [`consent`] - the per-patient consent ledger
//! - [`audit`] - the append-only audit log
//! - [`sealed`] - the persisted form of encrypted record payloads

pub mod access;
pub mod audit;
pub mod consent;
pub mod error;
pub mod id;
pub mod role;
pub mod sealed;
pub mod time;

pub use access::{DenyReason, Intent};
pub use audit::{AuditAction, AuditEntry, AuditLog, AuditOutcome, AuditRecord};
pub use consent::{ConsentEntry, ConsentLedger};
pub use error::{CoreError, Result};
pub use id::{
    AccountId, ActorId, AppointmentId, AuditId, MedicalId, PrescriptionId, ProfessionalId,
    RecordId,
};
pub use role::{ProfessionalKind, Role, VerificationStatus};
pub use sealed::SealedPayload;
pub use time::{Timestamp, now_utc};
