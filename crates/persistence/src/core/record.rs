//! The fixed-width record contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::types::RecordKind;

/// Engine-owned bookkeeping carried by every entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Durable identity, assigned on append and never changed.
    pub id: i32,
    /// Soft-delete flag.
    pub deleted: bool,
    /// When the record was appended.
    pub created_at: DateTime<Utc>,
    /// When the record was last overwritten.
    pub modified_at: DateTime<Utc>,
}

impl Default for RecordMeta {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl RecordMeta {
    /// Placeholder values for a candidate that has not been appended yet.
    pub fn placeholder() -> Self {
        Self {
            id: crate::types::NO_ID,
            deleted: false,
            created_at: DateTime::<Utc>::default(),
            modified_at: DateTime::<Utc>::default(),
        }
    }

    /// Stamps a record being appended with `id`.
    pub fn stamp_created(&mut self, id: i32, now: DateTime<Utc>) {
        self.id = id;
        self.deleted = false;
        self.created_at = truncate_to_secs(now);
        self.modified_at = self.created_at;
    }

    /// Stamps a record being overwritten.
    pub fn stamp_modified(&mut self, now: DateTime<Utc>) {
        self.modified_at = truncate_to_secs(now);
    }
}

// Timestamps are stored as whole seconds; keep the in-memory value identical to what
// a later read returns.
fn truncate_to_secs(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

/// A record with a fixed byte width, stored in a [`RecordFile`](super::RecordFile).
///
/// `encode` must write exactly [`WIDTH`](FixedRecord::WIDTH) bytes and `decode` must
/// read them back. Cross-record references are always IDs, never slot indices, so
/// compaction can renumber slots freely.
pub trait FixedRecord: Sized + Clone {
    /// Which entity file this record lives in.
    const KIND: RecordKind;

    /// Encoded size in bytes.
    const WIDTH: usize;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Writes the record into `buf` (exactly `WIDTH` bytes long).
    fn encode(&self, buf: &mut [u8]) -> StorageResult<()>;

    /// Reads a record from `buf` (exactly `WIDTH` bytes long).
    fn decode(buf: &[u8]) -> StorageResult<Self>;

    /// Checks caller-supplied field values before they are written.
    fn validate(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Resets fields the engine owns before a candidate is appended.
    fn reset_engine_fields(&mut self) {}

    fn id(&self) -> i32 {
        self.meta().id
    }

    fn is_deleted(&self) -> bool {
        self.meta().deleted
    }

    /// Encodes into a fresh buffer.
    fn to_bytes(&self) -> StorageResult<Vec<u8>> {
        let mut buf = vec![0u8; Self::WIDTH];
        self.encode(&mut buf)?;
        Ok(buf)
    }
}
