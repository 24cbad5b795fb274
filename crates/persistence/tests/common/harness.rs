//! Test harness for store-level tests.
//!
//! [`TestStore`] opens a [`HospitalStore`] over a fresh temporary directory that is
//! removed when the harness is dropped.

use std::path::{Path, PathBuf};

use medrec_persistence::{HospitalStore, RecordKind, StoreConfig};
use tempfile::TempDir;

use super::fixtures::{create_doctor, create_patient};

/// A hospital store rooted in a temporary directory.
pub struct TestStore {
    dir: TempDir,
    /// The store under test.
    pub store: HospitalStore,
}

impl TestStore {
    /// Opens an empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// Opens an empty store, letting the caller adjust the configuration.
    pub fn with_config(adjust: impl FnOnce(StoreConfig) -> StoreConfig) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = adjust(StoreConfig::in_dir(dir.path()));
        let store = HospitalStore::open(config).expect("Failed to open store");
        Self { dir, store }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn entity_path(&self, kind: RecordKind) -> PathBuf {
        self.store.config().entity_path(kind)
    }

    /// Drops the current store and opens a new one over the same directory.
    pub fn reopen(self) -> Self {
        let Self { dir, store } = self;
        let config = store.config().clone();
        drop(store);
        let store = HospitalStore::open(config).expect("Failed to reopen store");
        Self { dir, store }
    }

    /// Adds one patient and one doctor, returning their IDs.
    pub fn seed_pair(&self) -> (i32, i32) {
        let patient_id = self
            .store
            .add_patient(create_patient("Ana", "001"))
            .expect("Failed to add patient");
        let doctor_id = self
            .store
            .add_doctor(create_doctor("Luis", "MED-001", "General"))
            .expect("Failed to add doctor");
        (patient_id, doctor_id)
    }

    /// Reads a store file's raw bytes.
    pub fn read_file(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.path(name)).expect("Failed to read store file")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}
