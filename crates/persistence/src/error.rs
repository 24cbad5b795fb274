//! Error types for the record store.
//!
//! Errors are grouped by category: resource state, on-disk format, field validation,
//! reference-list capacity, history chain integrity, multi-file maintenance operations
//! and raw I/O. A referential miss on lookup is *not* an error; finders return `None`.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RecordKind;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// On-disk format errors
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Field validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Bounded reference list overflow
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// History chain errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Compaction, backup and restore errors
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),

    /// Low-level I/O errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to record state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// No live record with this ID exists (only raised by mutating operations).
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: i32 },

    /// Slot index outside of the indexed range.
    #[error("{kind} slot {index} out of range (record count {record_count})")]
    SlotOutOfRange {
        kind: RecordKind,
        index: u64,
        record_count: u64,
    },

    /// The requested state transition is not allowed.
    #[error("invalid state for {kind} {id}: {message}")]
    InvalidState {
        kind: RecordKind,
        id: i32,
        message: String,
    },
}

/// Errors related to the binary file format.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The header version differs from the supported one.
    #[error("incompatible file version in {}: found {found}, expected {expected}", path.display())]
    VersionMismatch {
        path: PathBuf,
        found: i32,
        expected: i32,
    },

    /// The file is shorter than its header claims.
    #[error("file {} is truncated: {actual} bytes, at least {expected} expected", path.display())]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The header-less hospital file does not hold exactly one record.
    #[error("hospital file {} has {actual} bytes, expected {expected}", path.display())]
    HospitalSize {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// A stored field could not be decoded.
    #[error("corrupt field '{field}' in {record} record: {message}")]
    CorruptField {
        record: &'static str,
        field: &'static str,
        message: String,
    },

    /// The header counters contradict each other.
    #[error("inconsistent header in {}: {message}", path.display())]
    InconsistentHeader { path: PathBuf, message: String },
}

/// Errors related to field values supplied by the caller.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Text does not fit into its fixed-width field.
    #[error("field '{field}' is {len} bytes, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Text is not a valid `YYYY-MM-DD` calendar date.
    #[error("field '{field}' is not a valid YYYY-MM-DD date: '{value}'")]
    InvalidDate { field: &'static str, value: String },

    /// Text is not a valid `HH:MM` time.
    #[error("field '{field}' is not a valid HH:MM time: '{value}'")]
    InvalidTime { field: &'static str, value: String },

    /// A referenced record does not exist.
    #[error("{field} references missing {kind} {id}")]
    MissingReference {
        field: &'static str,
        kind: RecordKind,
        id: i32,
    },
}

/// Errors raised when a bounded reference list is full.
#[derive(Error, Debug)]
pub enum CapacityError {
    /// The list already holds `capacity` IDs.
    #[error("{owner} {owner_id}: {list} list is full (capacity {capacity})")]
    ListFull {
        owner: RecordKind,
        owner_id: i32,
        list: &'static str,
        capacity: usize,
    },
}

/// Errors related to the per-patient history chain.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A `next_entry_id` points at an entry that does not exist.
    #[error("broken history chain for patient {patient_id}: entry {missing_id} not found")]
    BrokenChain { patient_id: i32, missing_id: i32 },

    /// The walk hit the safety cap before reaching the tail.
    #[error("history chain for patient {patient_id} exceeds {cap} entries (possible cycle)")]
    ChainTooLong { patient_id: i32, cap: usize },

    /// The chain already holds the maximum number of entries.
    #[error("history chain for patient {patient_id} is full ({cap} entries)")]
    ChainFull { patient_id: i32, cap: usize },

    /// The ID assigned on append differs from the one linked into the chain.
    #[error("history entry ID mismatch: linked {predicted}, assigned {assigned}")]
    IdMismatch { predicted: i32, assigned: i32 },

    /// History entries cannot be deleted because neighbours are not relinked.
    #[error("history entry {id} cannot be deleted: chain nodes are never removed")]
    DeletionUnsupported { id: i32 },
}

/// Errors from multi-file maintenance operations. None of these roll back.
#[derive(Error, Debug)]
pub enum MaintenanceError {
    /// Only `completed` of `total` steps succeeded.
    #[error("{operation} incomplete: {completed}/{total} steps succeeded")]
    Partial {
        operation: &'static str,
        completed: usize,
        total: usize,
        #[source]
        source: Option<Box<StorageError>>,
    },

    /// A previous compaction left its temporary file behind.
    #[error("leftover compaction file {} requires manual recovery", path.display())]
    CompactionLeftover { path: PathBuf },

    /// Archive entry does not match the expected file at that position.
    #[error("archive entry {position} is '{found}', expected '{expected}'")]
    UnexpectedEntry {
        position: usize,
        found: String,
        expected: String,
    },
}

/// Errors originating from the file system.
#[derive(Error, Debug)]
pub enum BackendError {
    /// An I/O operation on `path` failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackendError::Io {
            path: path.into(),
            source,
        }
    }
}

impl StorageError {
    /// Shorthand for an I/O error on `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Backend(BackendError::io(path, source))
    }

    /// Returns true if this error means a record was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Resource(ResourceError::NotFound { .. }))
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
