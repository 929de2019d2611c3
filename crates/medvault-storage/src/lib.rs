//! # medvault-storage
//!
//! Persistence boundary for the MedVault portal.
//!
//! The access layer never talks to a database directly. It consumes a
//! [`PortalStore`], which hands out a versioned [`Snapshot`] of the whole
//! [`PortalState`] and accepts a commit only if the snapshot is still current.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - process-local, used by tests and ephemeral runs
//! - [`JsonFileStore`] - a single pretty-printed JSON document on disk
//!
//! ## Example
//!
//! ```ignore
//! use medvault_storage::{MemoryStore, PortalStore};
//!
//! let store = MemoryStore::new();
//! let mut snapshot = store.load().await?;
//! snapshot.state.consents.open(&medical_id);
//! store.commit(&snapshot.state, snapshot.version).await?;
//! ```

mod error;
mod file;
mod memory;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{PortalStore, Snapshot};
pub use types::{
    Account, Appointment, AppointmentStatus, ClinicalRecord, DoctorIdentity, HospitalIdentity,
    PatientIdentity, PatientProfile, PortalState, Prescription,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn PortalStore>;
