//! Whole-store backup archives.
//!
//! ```text
//! [i64 created_at, Unix seconds]
//! [i32 name_len][name bytes][i64 size][size raw bytes]   × one per archived file
//! ```
//!
//! Files are archived in a fixed order and copied in fixed-size chunks. Names are bare
//! file names resolved inside the data directory on restore.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{FormatError, MaintenanceError, StorageError, StorageResult};

/// Copy buffer size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

const MAX_NAME_LEN: i32 = 255;

/// One file stored in or restored from an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedFile {
    pub name: String,
    pub bytes: u64,
}

/// Outcome of [`create_backup`].
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub archive: PathBuf,
    pub created_at: DateTime<Utc>,
    pub files: Vec<ArchivedFile>,
}

/// Outcome of [`restore_backup`].
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub archive: PathBuf,
    /// When the archive was written.
    pub created_at: DateTime<Utc>,
    pub files: Vec<ArchivedFile>,
}

/// Writes every file in `sources` into a fresh archive at `archive`.
///
/// A source that cannot be opened is skipped and the rest are still archived; the
/// result is then [`MaintenanceError::Partial`] and the archive stays on disk.
pub fn create_backup(
    archive: &Path,
    sources: &[PathBuf],
    chunk_size: usize,
) -> StorageResult<BackupReport> {
    let out = File::create(archive).map_err(|e| StorageError::io(archive, e))?;
    let mut writer = BufWriter::new(out);

    let created_at = now_secs();
    writer
        .write_all(&created_at.timestamp().to_le_bytes())
        .map_err(|e| StorageError::io(archive, e))?;

    let mut files = Vec::with_capacity(sources.len());
    let mut last_error = None;
    for source in sources {
        let input = match File::open(source) {
            Ok(input) => input,
            Err(e) => {
                warn!(file = %source.display(), error = %e, "File could not be backed up");
                last_error = Some(StorageError::io(source, e));
                continue;
            }
        };
        // A failure mid-entry leaves the archive unreadable past this point.
        let entry = append_entry(&mut writer, archive, source, input, chunk_size)
            .map_err(|e| partial("backup", files.len(), sources.len(), Some(e)))?;
        info!(file = %entry.name, bytes = entry.bytes, "File backed up");
        files.push(entry);
    }

    writer
        .into_inner()
        .map_err(|e| StorageError::io(archive, e.into_error()))?
        .sync_all()
        .map_err(|e| StorageError::io(archive, e))?;

    if files.len() < sources.len() {
        return Err(partial("backup", files.len(), sources.len(), last_error));
    }

    info!(
        archive = %archive.display(),
        files = files.len(),
        "Backup completed"
    );
    Ok(BackupReport {
        archive: archive.to_path_buf(),
        created_at,
        files,
    })
}

/// Restores an archive into `data_dir`, overwriting the live files.
///
/// Entries must carry names from `expected`, in that order; missing entries are
/// allowed (the archive may come from a partial backup) but unknown or reordered ones
/// stop the restore. Files restored before a failure stay restored, so anything short
/// of every expected file is [`MaintenanceError::Partial`].
pub fn restore_backup(
    archive: &Path,
    data_dir: &Path,
    expected: &[&str],
    chunk_size: usize,
) -> StorageResult<RestoreReport> {
    let input = File::open(archive).map_err(|e| StorageError::io(archive, e))?;
    let mut reader = BufReader::new(input);

    let mut stamp = [0u8; 8];
    reader
        .read_exact(&mut stamp)
        .map_err(|e| StorageError::io(archive, e))?;
    let secs = i64::from_le_bytes(stamp);
    let created_at = DateTime::from_timestamp(secs, 0).ok_or_else(|| corrupt("created_at", secs))?;

    let mut files = Vec::with_capacity(expected.len());
    let mut next_expected = 0;
    while next_expected < expected.len() {
        let entry = match read_entry_name(&mut reader, archive) {
            Ok(Some(name)) => name,
            Ok(None) => break,
            Err(e) => return Err(partial("restore", files.len(), expected.len(), Some(e))),
        };

        let Some(offset) = expected[next_expected..].iter().position(|n| *n == entry) else {
            let e = MaintenanceError::UnexpectedEntry {
                position: files.len(),
                found: entry,
                expected: expected[next_expected].to_string(),
            };
            return Err(partial("restore", files.len(), expected.len(), Some(e.into())));
        };
        next_expected += offset + 1;

        let target = data_dir.join(&entry);
        let bytes = restore_entry(&mut reader, archive, &target, chunk_size)
            .map_err(|e| partial("restore", files.len(), expected.len(), Some(e)))?;
        info!(file = %entry, bytes, "File restored");
        files.push(ArchivedFile { name: entry, bytes });
    }

    if files.len() < expected.len() {
        return Err(partial("restore", files.len(), expected.len(), None));
    }

    info!(
        archive = %archive.display(),
        created_at = %created_at,
        files = files.len(),
        "Restore completed"
    );
    Ok(RestoreReport {
        archive: archive.to_path_buf(),
        created_at,
        files,
    })
}

fn append_entry<W: Write>(
    writer: &mut W,
    archive: &Path,
    source: &Path,
    mut input: File,
    chunk_size: usize,
) -> StorageResult<ArchivedFile> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size = input
        .metadata()
        .map_err(|e| StorageError::io(source, e))?
        .len();

    let to_archive = |e: std::io::Error| StorageError::io(archive, e);
    writer
        .write_all(&(name.len() as i32).to_le_bytes())
        .map_err(to_archive)?;
    writer.write_all(name.as_bytes()).map_err(to_archive)?;
    writer
        .write_all(&(size as i64).to_le_bytes())
        .map_err(to_archive)?;

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut remaining = size;
    while remaining > 0 {
        let len = remaining.min(buf.len() as u64) as usize;
        input
            .read_exact(&mut buf[..len])
            .map_err(|e| StorageError::io(source, e))?;
        writer.write_all(&buf[..len]).map_err(to_archive)?;
        remaining -= len as u64;
    }

    Ok(ArchivedFile { name, bytes: size })
}

/// Reads the next entry name, or `None` at a clean end of archive.
fn read_entry_name<R: Read>(reader: &mut R, archive: &Path) -> StorageResult<Option<String>> {
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(StorageError::io(archive, e)),
    }
    let len = i32::from_le_bytes(len);
    if !(1..=MAX_NAME_LEN).contains(&len) {
        return Err(corrupt("name_len", len as i64));
    }

    let mut name = vec![0u8; len as usize];
    reader
        .read_exact(&mut name)
        .map_err(|e| StorageError::io(archive, e))?;
    let name = String::from_utf8(name).map_err(|e| FormatError::CorruptField {
        record: "archive",
        field: "name",
        message: e.to_string(),
    })?;
    Ok(Some(name))
}

fn restore_entry<R: Read>(
    reader: &mut R,
    archive: &Path,
    target: &Path,
    chunk_size: usize,
) -> StorageResult<u64> {
    let mut size = [0u8; 8];
    reader
        .read_exact(&mut size)
        .map_err(|e| StorageError::io(archive, e))?;
    let size = i64::from_le_bytes(size);
    if size < 0 {
        return Err(corrupt("size", size));
    }

    let mut out = File::create(target).map_err(|e| StorageError::io(target, e))?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut remaining = size as u64;
    while remaining > 0 {
        let len = remaining.min(buf.len() as u64) as usize;
        reader
            .read_exact(&mut buf[..len])
            .map_err(|e| StorageError::io(archive, e))?;
        out.write_all(&buf[..len])
            .map_err(|e| StorageError::io(target, e))?;
        remaining -= len as u64;
    }
    out.sync_all().map_err(|e| StorageError::io(target, e))?;
    Ok(size as u64)
}

fn partial(
    operation: &'static str,
    completed: usize,
    total: usize,
    source: Option<StorageError>,
) -> StorageError {
    warn!(operation, completed, total, "Maintenance operation incomplete");
    MaintenanceError::Partial {
        operation,
        completed,
        total,
        source: source.map(Box::new),
    }
    .into()
}

fn corrupt(field: &'static str, value: i64) -> StorageError {
    FormatError::CorruptField {
        record: "archive",
        field,
        message: format!("invalid value {value}"),
    }
    .into()
}

fn now_secs() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const NAMES: [&str; 3] = ["a.bin", "b.bin", "c.bin"];

    fn create_sources(dir: &Path) -> Vec<PathBuf> {
        NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let path = dir.join(name);
                // Larger than one chunk so the loop runs more than once.
                fs::write(&path, vec![i as u8 + 1; 10_000 + i]).unwrap();
                path
            })
            .collect()
    }

    /// Test that restore reproduces every archived file byte for byte.
    #[test]
    fn test_backup_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let sources = create_sources(dir.path());
        let archive = dir.path().join("store.bak");

        let report = create_backup(&archive, &sources, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.files[1].bytes, 10_001);

        let originals: Vec<_> = sources.iter().map(|p| fs::read(p).unwrap()).collect();
        for source in &sources {
            fs::write(source, b"changed").unwrap();
        }

        let restored = restore_backup(&archive, dir.path(), &NAMES, 1024).unwrap();
        assert_eq!(restored.created_at, report.created_at);
        for (source, original) in sources.iter().zip(&originals) {
            assert_eq!(&fs::read(source).unwrap(), original);
        }
    }

    /// Test that a missing source yields a partial backup that still restores the rest.
    #[test]
    fn test_partial_backup() {
        let dir = tempfile::tempdir().unwrap();
        let sources = create_sources(dir.path());
        fs::remove_file(&sources[1]).unwrap();
        let archive = dir.path().join("store.bak");

        let err = create_backup(&archive, &sources, DEFAULT_CHUNK_SIZE).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Maintenance(MaintenanceError::Partial {
                completed: 2,
                total: 3,
                ..
            })
        ));
        assert!(archive.exists());

        let err = restore_backup(&archive, dir.path(), &NAMES, DEFAULT_CHUNK_SIZE).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Maintenance(MaintenanceError::Partial { completed: 2, .. })
        ));
        assert!(!sources[1].exists());
    }

    /// Test that entries out of the expected order stop the restore.
    #[test]
    fn test_restore_rejects_unknown_entry() {
        let dir = tempfile::tempdir().unwrap();
        let sources = create_sources(dir.path());
        let archive = dir.path().join("store.bak");
        create_backup(&archive, &sources, DEFAULT_CHUNK_SIZE).unwrap();

        let reordered = ["b.bin", "a.bin", "c.bin"];
        let err = restore_backup(&archive, dir.path(), &reordered, DEFAULT_CHUNK_SIZE)
            .unwrap_err();
        let StorageError::Maintenance(MaintenanceError::Partial {
            completed, source, ..
        }) = err
        else {
            panic!("expected a partial restore");
        };
        // "a.bin" is accepted after skipping "b.bin", then "b.bin" is out of order.
        assert_eq!(completed, 1);
        assert!(matches!(
            source.as_deref(),
            Some(StorageError::Maintenance(MaintenanceError::UnexpectedEntry { .. }))
        ));
    }

    /// Test that a truncated archive reports how far it got.
    #[test]
    fn test_truncated_archive() {
        let dir = tempfile::tempdir().unwrap();
        let sources = create_sources(dir.path());
        let archive = dir.path().join("store.bak");
        create_backup(&archive, &sources, DEFAULT_CHUNK_SIZE).unwrap();

        let bytes = fs::read(&archive).unwrap();
        fs::write(&archive, &bytes[..bytes.len() - 100]).unwrap();

        let err = restore_backup(&archive, dir.path(), &NAMES, DEFAULT_CHUNK_SIZE).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Maintenance(MaintenanceError::Partial { completed: 2, .. })
        ));
    }
}
