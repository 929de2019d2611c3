//! Single-document JSON file backend.
//!
//! The file holds `{"version": n, ...state}`. Each write goes to a uniquely
//! named sibling temp file, is synced to disk and is then renamed over the
//! live one. The write runs on the blocking pool holding the writer lock, so
//! a cancelled commit still finishes before the next one starts.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::StorageResult;
use crate::error::StorageError;
use crate::traits::{PortalStore, Snapshot};
use crate::types::PortalState;

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u64,
    #[serde(flatten)]
    state: &'a PortalState,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    version: u64,
    #[serde(flatten)]
    state: PortalState,
}

/// Portal store persisted as one pretty-printed JSON file.
///
/// Commits within one process are serialized; the store assumes it is the
/// only process writing the file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is created empty at version 0;
    /// an existing file must decode.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        };

        if !tokio::fs::try_exists(&store.path).await? {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let guard = Arc::clone(&store.write_lock).lock_owned().await;
            store
                .write_document(&PortalState::default(), 0, guard)
                .await?;
            tracing::info!(path = %store.path.display(), "Created empty data file");
        } else {
            let snapshot = store.read_document().await?;
            tracing::info!(
                path = %store.path.display(),
                version = snapshot.version,
                users = snapshot.state.users.len(),
                "Opened data file"
            );
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> StorageResult<Snapshot> {
        let bytes = tokio::fs::read(&self.path).await?;
        let doc: Document = serde_json::from_slice(&bytes)?;
        Ok(Snapshot {
            state: doc.state,
            version: doc.version,
        })
    }

    /// Writes the document while holding `guard`. The guard moves into the
    /// blocking task and is released only once the file is in place.
    async fn write_document(
        &self,
        state: &PortalState,
        version: u64,
        guard: OwnedMutexGuard<()>,
    ) -> StorageResult<()> {
        let body = serde_json::to_vec_pretty(&DocumentRef { version, state })?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            replace_file(&path, &body)
        })
        .await
        .map_err(|e| StorageError::internal(format!("write task failed: {e}")))?
    }
}

fn replace_file(path: &Path, body: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".medvault-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(format!("replace {}: {}", path.display(), e.error)))?;
    Ok(())
}

#[async_trait]
impl PortalStore for JsonFileStore {
    async fn load(&self) -> StorageResult<Snapshot> {
        self.read_document().await
    }

    async fn commit(&self, state: &PortalState, expected_version: u64) -> StorageResult<u64> {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;

        let current = self.read_document().await?.version;
        if current != expected_version {
            return Err(StorageError::version_conflict(expected_version, current));
        }

        let next = current + 1;
        self.write_document(state, next, guard).await?;
        tracing::debug!(version = next, "Committed portal state");
        Ok(next)
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;
    use medvault_core::{ActorId, AuditAction, AuditRecord, MedicalId};

    #[tokio::test]
    async fn test_open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(path.exists());

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.version, 0);
        assert!(snapshot.state.users.is_empty());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let medical_id = MedicalId::generate(2024);

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            let mut snapshot = store.load().await.unwrap();
            snapshot.state.consents.open(&medical_id);
            snapshot.state.audits.append(AuditRecord::new(
                "USR-1".parse::<ActorId>().unwrap(),
                AuditAction::UpdateConsent,
                medical_id.clone(),
            ));
            store.commit(&snapshot.state, snapshot.version).await.unwrap();
        }

        let store = JsonFileStore::open(&path).await.unwrap();
        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.version, 1);
        assert!(snapshot.state.consents.entry(&medical_id).is_some());
        assert_eq!(snapshot.state.audits.len(), 1);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert!(raw["audits"].is_array());
    }

    #[tokio::test]
    async fn test_stale_commit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json"))
            .await
            .unwrap();

        let base = store.load().await.unwrap();
        store.commit(&base.state, base.version).await.unwrap();

        let err = store.commit(&base.state, base.version).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict {
                expected: 0,
                actual: 1
            }
        ));
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_commits_leave_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json"))
            .await
            .unwrap();

        for _ in 0..3 {
            let snapshot = store.load().await.unwrap();
            store.commit(&snapshot.state, snapshot.version).await.unwrap();
        }

        assert_eq!(store.load().await.unwrap().version, 3);
        assert_eq!(file_names(dir.path()), vec!["data.json".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_commit_finishes_before_next_writer() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            JsonFileStore::open(dir.path().join("data.json"))
                .await
                .unwrap(),
        );
        let base = store.load().await.unwrap();

        let pending = {
            let store = Arc::clone(&store);
            let state = base.state.clone();
            tokio::spawn(async move { store.commit(&state, 0).await })
        };
        pending.abort();
        let _ = pending.await;

        // The aborted commit either never wrote or completed in full.
        match store.commit(&base.state, base.version).await {
            Ok(version) => assert_eq!(version, 1),
            Err(err) => assert!(err.is_version_conflict()),
        }

        assert_eq!(store.load().await.unwrap().version, 1);
        assert_eq!(file_names(dir.path()), vec!["data.json".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_commits_on_one_version_admit_one_writer() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            JsonFileStore::open(dir.path().join("data.json"))
                .await
                .unwrap(),
        );
        let base = store.load().await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let state = base.state.clone();
                tokio::spawn(async move { store.commit(&state, 0).await })
            })
            .collect();

        let mut committed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(err) => assert!(err.is_version_conflict()),
            }
        }

        assert_eq!(committed, 1);
        assert_eq!(store.load().await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Data);
    }
}
