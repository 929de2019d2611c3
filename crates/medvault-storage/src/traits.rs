//! Storage traits for the portal persistence boundary.

use async_trait::async_trait;

use crate::StorageResult;
use crate::types::PortalState;

/// A consistent copy of the portal state together with the version it was
/// read at.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub state: PortalState,
    pub version: u64,
}

/// The contract every portal storage backend implements.
///
/// Writers follow a load-modify-commit cycle. A commit carries the version of
/// the snapshot it was derived from and is rejected if anything was committed
/// in between, so no two writers can both succeed from the same base.
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use medvault_storage::{PortalStore, StorageError};
///
/// async fn open_consent(store: &dyn PortalStore, medical_id: &MedicalId) -> Result<u64, StorageError> {
///     let mut snapshot = store.load().await?;
///     snapshot.state.consents.open(medical_id);
///     store.commit(&snapshot.state, snapshot.version).await
/// }
/// ```
#[async_trait]
pub trait PortalStore: Send + Sync {
    /// Reads the current state. A backend with nothing stored yet returns an
    /// empty state at version 0.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure or decoding failures.
    async fn load(&self) -> StorageResult<Snapshot>;

    /// Replaces the stored state and returns the new version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::VersionConflict` if `expected_version` is not the
    /// current version. Nothing is written in that case.
    async fn commit(&self, state: &PortalState, expected_version: u64) -> StorageResult<u64>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
