//! Command-line configuration for the maintenance tool.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MEDREC_DATA_DIR` | . | Directory holding the store files |
//! | `MEDREC_LOG_LEVEL` | info | Log level |
//! | `MEDREC_BACKUP_FILE` | hospital_backup.bak | Backup archive path |
//! | `MEDREC_MAX_CHAIN` | 100 | History walk safety cap |

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use medrec_persistence::{RecordKind, StoreConfig};

/// Maintenance tool configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "medrec")]
#[command(about = "Hospital record store maintenance")]
pub struct CliConfig {
    /// Directory holding the store files.
    #[arg(short, long, env = "MEDREC_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "MEDREC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Backup archive path; relative paths resolve inside the data directory.
    #[arg(long, env = "MEDREC_BACKUP_FILE", default_value = "hospital_backup.bak")]
    pub backup_file: PathBuf,

    /// Maximum number of history entries a chain walk may visit.
    #[arg(long, env = "MEDREC_MAX_CHAIN", default_value = "100")]
    pub max_chain: usize,

    #[command(subcommand)]
    pub command: Command,
}

/// Maintenance operations.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Verify every store file and print its header counters.
    Verify,
    /// Print the hospital snapshot and per-file counters.
    Stats,
    /// Drop soft-deleted slots from one entity file, or from all of them.
    Compact {
        /// patients, doctors, appointments, history or all.
        target: String,
    },
    /// Archive the five store files.
    Backup,
    /// Overwrite the store files from the backup archive.
    Restore,
    /// Print a patient's medical history.
    History {
        /// Patient ID.
        patient_id: i32,
    },
    /// Compare a patient's history chain with the stored consultation count.
    CheckChain {
        /// Patient ID.
        patient_id: i32,
    },
}

/// Which files a `compact` run touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactTarget {
    One(RecordKind),
    All,
}

impl CompactTarget {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("all") {
            return Some(CompactTarget::All);
        }
        RecordKind::parse(s).map(CompactTarget::One)
    }
}

impl CliConfig {
    /// Builds the store configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir.clone(),
            backup_file: self.backup_file.clone(),
            max_chain: self.max_chain,
            ..StoreConfig::in_dir(&self.data_dir)
        }
    }

    /// Validates the configuration, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = self.store_config().validate().err().unwrap_or_default();

        if let Command::Compact { target } = &self.command
            && CompactTarget::parse(target).is_none()
        {
            errors.push(format!(
                "Unknown compaction target '{}' (expected patients, doctors, appointments, history or all)",
                target
            ));
        }

        if let Command::History { patient_id } | Command::CheckChain { patient_id } = &self.command
            && *patient_id < 1
        {
            errors.push("Patient ID must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
