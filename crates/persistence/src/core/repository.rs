//! ID-based access to one entity file.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info};

use crate::core::{FixedRecord, RecordFile};
use crate::error::{ResourceError, StorageResult};
use crate::types::FileHeader;

/// CRUD with soft delete over a [`RecordFile`].
///
/// Lookups return `None` when no live record matches. Mutations that need an existing
/// record fail with [`ResourceError::NotFound`].
#[derive(Debug, Clone)]
pub struct Repository<T> {
    file: RecordFile<T>,
}

impl<T: FixedRecord> Repository<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: RecordFile::new(path),
        }
    }

    /// The underlying record file.
    pub fn file(&self) -> &RecordFile<T> {
        &self.file
    }

    pub fn header(&self) -> StorageResult<FileHeader> {
        self.file.read_header()
    }

    /// Appends `candidate` and returns its assigned ID.
    ///
    /// Engine-owned fields are reset first, so placeholder values in the candidate are
    /// ignored.
    pub fn add(&self, mut candidate: T) -> StorageResult<i32> {
        candidate.reset_engine_fields();
        candidate.validate()?;
        self.file.append(&mut candidate)
    }

    pub fn find_by_id(&self, id: i32) -> StorageResult<Option<T>> {
        Ok(self.find_slot(id)?.map(|(_, record)| record))
    }

    /// The live record with `id` and the slot it occupies.
    pub fn find_slot(&self, id: i32) -> StorageResult<Option<(u64, T)>> {
        self.file.find_by(|r| r.id() == id)
    }

    /// First live record matching `predicate`.
    pub fn find_by<P>(&self, predicate: P) -> StorageResult<Option<T>>
    where
        P: FnMut(&T) -> bool,
    {
        Ok(self.file.find_by(predicate)?.map(|(_, record)| record))
    }

    /// Live records in slot order.
    pub fn list(&self) -> StorageResult<Vec<T>> {
        let mut out = Vec::new();
        for slot in self.file.records()? {
            let (_, record) = slot?;
            if !record.is_deleted() {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Live records whose IDs appear in `ids`, in the order given. Unknown IDs are
    /// skipped.
    pub fn resolve(&self, ids: impl IntoIterator<Item = i32>) -> StorageResult<Vec<T>> {
        let mut out = Vec::new();
        for id in ids {
            if let Some(record) = self.find_by_id(id)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Overwrites the live record with the same ID.
    ///
    /// The creation time is taken from disk; the modification time is stamped now and
    /// written back into `record`.
    pub fn update(&self, record: &mut T) -> StorageResult<()> {
        let id = record.id();
        let (index, stored) = self.find_slot(id)?.ok_or(ResourceError::NotFound {
            kind: T::KIND,
            id,
        })?;

        record.validate()?;
        let meta = record.meta_mut();
        meta.created_at = stored.meta().created_at;
        meta.deleted = false;
        meta.stamp_modified(Utc::now());

        self.file.overwrite(index, record)?;
        debug!(kind = %T::KIND, id, "Record updated");
        Ok(())
    }

    /// Flags the record as deleted and refreshes the header's active count.
    ///
    /// The slot stays in place until compaction.
    pub fn soft_delete(&self, id: i32) -> StorageResult<T> {
        let (index, mut record) = self.find_slot(id)?.ok_or(ResourceError::NotFound {
            kind: T::KIND,
            id,
        })?;

        let meta = record.meta_mut();
        meta.deleted = true;
        meta.stamp_modified(Utc::now());
        self.file.overwrite(index, &record)?;

        let header = self.file.refresh_active_count()?;
        info!(
            kind = %T::KIND,
            id,
            active = header.active_count(),
            "Record soft-deleted"
        );
        Ok(record)
    }

    pub fn count_active(&self) -> StorageResult<i32> {
        self.file.count_active()
    }
}
