//! Store configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ledger::DEFAULT_MAX_CHAIN;
use crate::maintenance::DEFAULT_CHUNK_SIZE;
use crate::types::RecordKind;

/// Name of the header-less hospital snapshot file.
pub const HOSPITAL_FILE: &str = "hospital.bin";

/// Default archive name, created inside the data directory.
pub const BACKUP_FILE: &str = "hospital_backup.bak";

/// Configuration for a [`HospitalStore`](crate::HospitalStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the five store files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Backup archive path. Relative paths resolve inside `data_dir`.
    #[serde(default = "default_backup_file")]
    pub backup_file: PathBuf,

    /// Buffer size used when copying files into and out of archives.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Entries a history walk may visit before it is treated as a cycle.
    #[serde(default = "default_max_chain")]
    pub max_chain: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_backup_file() -> PathBuf {
    PathBuf::from(BACKUP_FILE)
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_chain() -> usize {
    DEFAULT_MAX_CHAIN
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backup_file: default_backup_file(),
            chunk_size: default_chunk_size(),
            max_chain: default_max_chain(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn hospital_path(&self) -> PathBuf {
        self.data_dir.join(HOSPITAL_FILE)
    }

    pub fn entity_path(&self, kind: RecordKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    pub fn backup_path(&self) -> PathBuf {
        resolve(&self.data_dir, &self.backup_file)
    }

    /// The five store files in archive order.
    pub fn archive_names() -> [&'static str; 5] {
        [
            HOSPITAL_FILE,
            RecordKind::Patient.file_name(),
            RecordKind::Doctor.file_name(),
            RecordKind::Appointment.file_name(),
            RecordKind::HistoryEntry.file_name(),
        ]
    }

    /// Full paths of [`archive_names`](Self::archive_names).
    pub fn archive_paths(&self) -> Vec<PathBuf> {
        Self::archive_names()
            .iter()
            .map(|name| self.data_dir.join(name))
            .collect()
    }

    /// Validates the configuration, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.chunk_size == 0 {
            errors.push("chunk_size must be greater than 0".to_string());
        }
        if self.max_chain == 0 {
            errors.push("max_chain must be greater than 0".to_string());
        }
        if self.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
