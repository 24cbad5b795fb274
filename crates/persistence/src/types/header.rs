//! The fixed header at offset 0 of every entity file.
//!
//! ```text
//! +--------------------+
//! | record_count  i32  |  slots ever appended, including soft-deleted
//! | next_id       i32  |  next ID to assign, never decremented
//! | active_count  i32  |  slots not soft-deleted
//! | version       i32  |  format version stamp
//! +--------------------+
//! | slot 0             |  HEADER_SIZE + 0 * width
//! | slot 1             |  HEADER_SIZE + 1 * width
//! | ...                |
//! ```
//!
//! All fields are little-endian.

use serde::Serialize;
use zerocopy::little_endian::I32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{FormatError, StorageResult};

/// Format version written by this crate. Any other value is rejected at load.
pub const CURRENT_VERSION: i32 = 1;

/// Size of [`FileHeader`] on disk.
pub const HEADER_SIZE: usize = std::mem::size_of::<FileHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FileHeader {
    record_count: I32,
    next_id: I32,
    active_count: I32,
    version: I32,
}

const _: () = assert!(HEADER_SIZE == 16);

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHeader {
    /// A fresh header: no records, first ID is 1.
    pub fn new() -> Self {
        Self {
            record_count: I32::new(0),
            next_id: I32::new(1),
            active_count: I32::new(0),
            version: I32::new(CURRENT_VERSION),
        }
    }

    /// Parses a header without checking the version.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self::read_from_bytes(bytes).unwrap_or_default()
    }

    /// Raw little-endian bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    pub fn record_count(&self) -> i32 {
        self.record_count.get()
    }

    pub fn next_id(&self) -> i32 {
        self.next_id.get()
    }

    pub fn active_count(&self) -> i32 {
        self.active_count.get()
    }

    pub fn version(&self) -> i32 {
        self.version.get()
    }

    /// Number of indexed slots as an unsigned index bound.
    pub fn slots(&self) -> u64 {
        self.record_count().max(0) as u64
    }

    pub fn set_active_count(&mut self, count: i32) {
        self.active_count = I32::new(count);
    }

    /// Accounts for one appended, live record.
    pub fn record_appended(&mut self) {
        self.record_count = I32::new(self.record_count() + 1);
        self.next_id = I32::new(self.next_id() + 1);
        self.active_count = I32::new(self.active_count() + 1);
    }

    /// Header for a compacted copy: same ID space, no slots yet.
    pub fn compacted(&self) -> Self {
        Self {
            record_count: I32::new(0),
            next_id: self.next_id,
            active_count: I32::new(0),
            version: I32::new(CURRENT_VERSION),
        }
    }

    /// Accounts for one record copied during compaction.
    pub fn record_copied(&mut self) {
        self.record_count = I32::new(self.record_count() + 1);
        self.active_count = I32::new(self.active_count() + 1);
    }

    /// Rejects headers from another format version.
    pub fn check_version(&self, path: &std::path::Path) -> StorageResult<()> {
        if self.version() != CURRENT_VERSION {
            return Err(FormatError::VersionMismatch {
                path: path.to_path_buf(),
                found: self.version(),
                expected: CURRENT_VERSION,
            }
            .into());
        }
        Ok(())
    }

    /// Rejects counters that cannot describe a valid file.
    pub fn check_counters(&self, path: &std::path::Path) -> StorageResult<()> {
        let message = if self.record_count() < 0 || self.active_count() < 0 {
            Some("negative record counter".to_string())
        } else if self.active_count() > self.record_count() {
            Some(format!(
                "active count {} exceeds record count {}",
                self.active_count(),
                self.record_count()
            ))
        } else if self.next_id() < 1 {
            Some(format!("next ID {} is not positive", self.next_id()))
        } else {
            None
        };

        match message {
            Some(message) => Err(FormatError::InconsistentHeader {
                path: path.to_path_buf(),
                message,
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Serializable copy of the counters.
    pub fn summary(&self) -> HeaderSummary {
        HeaderSummary {
            record_count: self.record_count(),
            next_id: self.next_id(),
            active_count: self.active_count(),
            version: self.version(),
        }
    }
}

/// Plain view of a header for reports and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderSummary {
    pub record_count: i32,
    pub next_id: i32,
    pub active_count: i32,
    pub version: i32,
}
