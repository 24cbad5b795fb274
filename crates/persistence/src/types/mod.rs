//! Core types shared by every record file.
//!
//! - [`FileHeader`] - the 16-byte header at offset 0 of each entity file
//! - [`RecordKind`] - which of the four entity files a record lives in
//! - [`BoundedIds`] - fixed-capacity ordered list of record IDs
//! - [`codec`] - fixed-width field encoding helpers

pub mod bounded;
pub mod codec;
pub mod header;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use bounded::BoundedIds;
pub use header::{CURRENT_VERSION, FileHeader, HEADER_SIZE, HeaderSummary};

/// Sentinel stored on disk for "no reference".
pub const NO_ID: i32 = -1;

/// The four entity files of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Patient records.
    Patient,
    /// Doctor records.
    Doctor,
    /// Appointment records.
    Appointment,
    /// Medical-history entries.
    HistoryEntry,
}

impl RecordKind {
    /// All kinds, in archive order.
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Patient,
        RecordKind::Doctor,
        RecordKind::Appointment,
        RecordKind::HistoryEntry,
    ];

    /// Default file name of this kind inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            RecordKind::Patient => "patients.bin",
            RecordKind::Doctor => "doctors.bin",
            RecordKind::Appointment => "appointments.bin",
            RecordKind::HistoryEntry => "history.bin",
        }
    }

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::Patient => "patient",
            RecordKind::Doctor => "doctor",
            RecordKind::Appointment => "appointment",
            RecordKind::HistoryEntry => "history entry",
        }
    }

    /// Parses a kind from a user-facing name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "patient" | "patients" => Some(RecordKind::Patient),
            "doctor" | "doctors" => Some(RecordKind::Doctor),
            "appointment" | "appointments" => Some(RecordKind::Appointment),
            "history" | "history_entry" | "history-entry" => Some(RecordKind::HistoryEntry),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Converts an on-disk ID to an optional reference.
pub fn id_from_disk(raw: i32) -> Option<i32> {
    (raw != NO_ID).then_some(raw)
}

/// Converts an optional reference to its on-disk ID.
pub fn id_to_disk(id: Option<i32>) -> i32 {
    id.unwrap_or(NO_ID)
}
