//! Per-patient consent ledger.
//!
//! Exactly one entry exists per medical id. An actor is allowed only if its
//! professional id is a member of the patient's current allow-set; there are no
//! wildcards, hierarchies or expiry. Updates replace the whole set.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::id::{MedicalId, ProfessionalId};
use crate::time::{Timestamp, now_utc};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentEntry {
    pub medical_id: MedicalId,
    pub allowed_ids: BTreeSet<ProfessionalId>,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentLedger {
    entries: BTreeMap<MedicalId, ConsentEntry>,
}

impl ConsentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the empty allow-set for a newly registered patient.
    ///
    /// Returns `false` and leaves the existing entry untouched if one exists.
    pub fn open(&mut self, medical_id: &MedicalId) -> bool {
        if self.entries.contains_key(medical_id) {
            return false;
        }
        self.entries.insert(
            medical_id.clone(),
            ConsentEntry {
                medical_id: medical_id.clone(),
                allowed_ids: BTreeSet::new(),
                updated_at: now_utc(),
            },
        );
        true
    }

    /// Exact membership lookup. Unknown patients and absent actors are denied.
    pub fn is_allowed(&self, medical_id: &MedicalId, actor: &ProfessionalId) -> bool {
        self.entries
            .get(medical_id)
            .is_some_and(|entry| entry.allowed_ids.contains(actor))
    }

    pub fn entry(&self, medical_id: &MedicalId) -> Option<&ConsentEntry> {
        self.entries.get(medical_id)
    }

    /// Replaces the allow-set wholesale. Callers wanting incremental edits must
    /// read the current set, modify it and write it back.
    pub fn set_allowed<I>(&mut self, medical_id: &MedicalId, allowed: I) -> Result<&ConsentEntry>
    where
        I: IntoIterator<Item = ProfessionalId>,
    {
        let entry = self
            .entries
            .get_mut(medical_id)
            .ok_or_else(|| CoreError::UnknownPatient(medical_id.to_string()))?;
        entry.allowed_ids = allowed.into_iter().collect();
        entry.updated_at = now_utc();
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
