use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::StorageResult;
use crate::error::StorageError;
use crate::traits::{PortalStore, Snapshot};
use crate::types::PortalState;

/// In-memory portal store. State is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
}

impl MemoryStore {
    /// Creates an empty store at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `state` at version 1.
    pub fn with_state(state: PortalState) -> Self {
        Self {
            inner: RwLock::new(Snapshot { state, version: 1 }),
        }
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn load(&self) -> StorageResult<Snapshot> {
        Ok(self.inner.read().await.clone())
    }

    async fn commit(&self, state: &PortalState, expected_version: u64) -> StorageResult<u64> {
        let mut guard = self.inner.write().await;
        if guard.version != expected_version {
            return Err(StorageError::version_conflict(
                expected_version,
                guard.version,
            ));
        }
        guard.state = state.clone();
        guard.version += 1;
        Ok(guard.version)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
