//! Multi-step maintenance operations.
//!
//! - [`compaction`] - rewrites an entity file without its soft-deleted slots
//! - [`backup`] - archives and restores the five-file set
//!
//! Neither operation rolls back. Failures part way through are reported with
//! [`MaintenanceError::Partial`](crate::error::MaintenanceError::Partial) or leave
//! files behind that startup verification reports.

pub mod backup;
pub mod compaction;

pub use backup::{
    ArchivedFile, BackupReport, DEFAULT_CHUNK_SIZE, RestoreReport, create_backup, restore_backup,
};
pub use compaction::{CompactionReport, compact};
