//! Portal operations composed from the credential manager, token service,
//! record codec and access control engine.
//!
//! Every state-changing operation runs as one load -> decide -> mutate ->
//! commit unit behind a single writer gate, so consent replacements and audit
//! appends never interleave. Read-only operations work from a snapshot.
//! Sealed records are opened after the gate is released.

mod account;
mod admin;
mod clinical;
mod patient;
pub mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use medvault_core::{AuditAction, DenyReason, MedicalId, Role};
use medvault_storage::{ClinicalRecord, DynStore, PortalState};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::codec::RecordCodec;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password::CredentialManager;
use crate::policy::{AccessControlEngine, AccessDecision, AccessRequest, Actor};
use crate::token::{Session, TokenService};

pub use types::*;

/// The portal's trust layer over a [`PortalStore`](medvault_storage::PortalStore).
pub struct PortalService {
    store: DynStore,
    credentials: CredentialManager,
    tokens: Arc<TokenService>,
    codec: RecordCodec,
    engine: AccessControlEngine,
    write_gate: Mutex<()>,
}

impl PortalService {
    /// Builds the service and its crypto components from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid.
    pub fn new(store: DynStore, config: &AuthConfig) -> Result<Self, AuthError> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        Ok(Self::from_parts(
            store,
            CredentialManager::new(&config.password)?,
            Arc::new(TokenService::new(&config.token)?),
            RecordCodec::new(&config.encryption.key)?,
        ))
    }

    pub fn from_parts(
        store: DynStore,
        credentials: CredentialManager,
        tokens: Arc<TokenService>,
        codec: RecordCodec,
    ) -> Self {
        Self {
            store,
            credentials,
            tokens,
            codec,
            engine: AccessControlEngine::new(),
            write_gate: Mutex::new(()),
        }
    }

    /// Shared token service, for request extractors.
    pub fn tokens(&self) -> Arc<TokenService> {
        Arc::clone(&self.tokens)
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// Name of the storage backend, for logs.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Verifies a bearer token.
    pub fn authenticate(&self, token: &str) -> Result<Session, AuthError> {
        self.tokens.verify(token)
    }

    // =========================================================================
    // State access
    // =========================================================================

    async fn snapshot(&self) -> Result<PortalState, AuthError> {
        Ok(self.store.load().await?.state)
    }

    /// Runs `op` against the current state under the writer gate and commits
    /// whatever it changed, including when it returns an error. A refused
    /// access still leaves its audit entry behind.
    async fn write<T, F>(&self, op: F) -> Result<T, AuthError>
    where
        F: FnOnce(&mut PortalState) -> Result<T, AuthError>,
    {
        let _gate = self.write_gate.lock().await;

        let snapshot = self.store.load().await?;
        let mut state = snapshot.state.clone();
        let result = op(&mut state);

        if state != snapshot.state {
            let version = self.store.commit(&state, snapshot.version).await?;
            tracing::debug!(version, "Committed portal state");
        }

        result
    }

    /// Runs the access check and turns a denial into `Forbidden`.
    fn authorize(
        &self,
        state: &mut PortalState,
        actor: &Actor,
        medical_id: &MedicalId,
        action: AuditAction,
        emergency_reason: Option<&str>,
    ) -> Result<AccessDecision, AuthError> {
        let request =
            AccessRequest::new(actor, medical_id, action).with_emergency(emergency_reason);
        let decision = self
            .engine
            .check_access(&state.consents, &mut state.audits, &request);

        match decision.deny_reason() {
            Some(reason) => Err(AuthError::forbidden(reason)),
            None => Ok(decision),
        }
    }

    /// Opens sealed records for an already authorized reader.
    fn open_records(&self, sealed: Vec<ClinicalRecord>) -> Result<Vec<OpenedRecord>, AuthError> {
        sealed
            .into_iter()
            .map(|record| {
                let data: Value = self.codec.open(&record.sealed).map_err(|e| {
                    tracing::error!(record_id = %record.id, "Sealed record failed integrity check");
                    e
                })?;
                Ok(OpenedRecord {
                    id: record.id,
                    record_type: record.record_type,
                    data,
                    created_at: record.created_at,
                })
            })
            .collect()
    }
}

/// Refuses anyone not holding `role`. Not audited.
fn require_role(actor: &Actor, role: Role) -> Result<(), AuthError> {
    if actor.role() == role {
        Ok(())
    } else {
        Err(AuthError::forbidden(DenyReason::RoleMismatch))
    }
}
