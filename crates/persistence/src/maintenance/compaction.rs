//! Reclaims soft-deleted slots.
//!
//! Compaction streams every live record of `X` into `X_temp` under a header that keeps
//! the original `next_id`, then replaces `X` with the copy. Slot indices change; IDs
//! and the references between records do not.

use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};

use serde::Serialize;
use tracing::{error, info};

use crate::core::{FixedRecord, RecordFile};
use crate::error::{MaintenanceError, StorageError, StorageResult};
use crate::types::{HeaderSummary, RecordKind};

/// Outcome of compacting one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    pub kind: RecordKind,
    pub before: HeaderSummary,
    pub after: HeaderSummary,
    /// Slots dropped from the file.
    pub reclaimed: i32,
}

/// Compacts `file` in place.
///
/// Refuses to start when `X_temp` already exists. If the final delete or rename
/// fails, both files may remain and the next startup reports the leftover.
pub fn compact<T: FixedRecord>(file: &RecordFile<T>) -> StorageResult<CompactionReport> {
    let path = file.path();
    let temp = file.temp_path();
    if temp.exists() {
        return Err(MaintenanceError::CompactionLeftover { path: temp }.into());
    }

    if !path.exists() {
        file.initialize()?;
    }
    let before = file.read_header()?;
    before.check_version(path)?;

    let mut header = before.compacted();
    let out = File::create(&temp).map_err(|e| StorageError::io(&temp, e))?;
    let mut writer = BufWriter::new(out);
    writer
        .write_all(&header.to_bytes())
        .map_err(|e| StorageError::io(&temp, e))?;

    for slot in file.records()? {
        let (_, record) = slot?;
        if record.is_deleted() {
            continue;
        }
        writer
            .write_all(&record.to_bytes()?)
            .map_err(|e| StorageError::io(&temp, e))?;
        header.record_copied();
    }

    let mut out = writer
        .into_inner()
        .map_err(|e| StorageError::io(&temp, e.into_error()))?;
    out.seek(SeekFrom::Start(0))
        .and_then(|_| out.write_all(&header.to_bytes()))
        .and_then(|_| out.sync_all())
        .map_err(|e| StorageError::io(&temp, e))?;
    drop(out);

    if let Err(e) = fs::remove_file(path).and_then(|_| fs::rename(&temp, path)) {
        error!(
            kind = %T::KIND,
            path = %path.display(),
            temp = %temp.display(),
            error = %e,
            "Compaction could not replace the original file"
        );
        return Err(StorageError::io(path, e));
    }

    let report = CompactionReport {
        kind: T::KIND,
        before: before.summary(),
        after: header.summary(),
        reclaimed: before.record_count() - header.record_count(),
    };
    info!(
        kind = %T::KIND,
        records_before = report.before.record_count,
        records_after = report.after.record_count,
        reclaimed = report.reclaimed,
        next_id = report.after.next_id,
        "File compacted"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Repository;
    use crate::model::Appointment;

    fn create_appointment(patient_id: i32) -> Appointment {
        Appointment::new(patient_id, 1, "2025-05-02", "11:30", "Control")
    }

    /// Test that deleted slots are dropped and the ID space is kept.
    #[test]
    fn test_compact_drops_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let repo: Repository<Appointment> = Repository::new(dir.path().join("appointments.bin"));
        for patient in 1..=4 {
            repo.add(create_appointment(patient)).unwrap();
        }
        repo.soft_delete(2).unwrap();
        repo.soft_delete(3).unwrap();

        let report = compact(repo.file()).unwrap();
        assert_eq!(report.reclaimed, 2);
        assert_eq!(report.before.record_count, 4);
        assert_eq!(report.after.record_count, 2);
        assert_eq!(report.after.active_count, 2);
        assert_eq!(report.after.next_id, 5);

        let ids: Vec<_> = repo.list().unwrap().iter().map(|a| a.meta.id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert!(!repo.file().temp_path().exists());
        assert_eq!(repo.add(create_appointment(9)).unwrap(), 5);
    }

    /// Test that a leftover temp file blocks compaction.
    #[test]
    fn test_leftover_blocks_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let repo: Repository<Appointment> = Repository::new(dir.path().join("appointments.bin"));
        repo.add(create_appointment(1)).unwrap();
        fs::write(repo.file().temp_path(), b"stale").unwrap();

        let err = compact(repo.file()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Maintenance(MaintenanceError::CompactionLeftover { .. })
        ));
        assert_eq!(repo.header().unwrap().record_count(), 1);
    }
}
