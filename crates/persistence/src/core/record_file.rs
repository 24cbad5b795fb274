//! Header and slot I/O for a single entity file.
//!
//! A record file is a [`FileHeader`] followed by fixed-width slots. Slot `i` lives at
//! `HEADER_SIZE + i * T::WIDTH`. Slot indices are positional and change on compaction;
//! IDs stored inside the records never do.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::FixedRecord;
use crate::error::{FormatError, MaintenanceError, ResourceError, StorageError, StorageResult};
use crate::types::{FileHeader, HEADER_SIZE};

/// One entity file on disk.
#[derive(Debug, Clone)]
pub struct RecordFile<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: FixedRecord> RecordFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path used while compacting, `patients.bin` -> `patients_temp.bin`.
    pub fn temp_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match self.path.extension() {
            Some(ext) => format!("{stem}_temp.{}", ext.to_string_lossy()),
            None => format!("{stem}_temp"),
        };
        self.path.with_file_name(name)
    }

    /// Byte offset of slot `index`.
    pub fn offset_of(&self, index: u64) -> u64 {
        HEADER_SIZE as u64 + index * T::WIDTH as u64
    }

    /// Creates (or truncates) the file with a fresh header.
    pub fn initialize(&self) -> StorageResult<FileHeader> {
        let header = FileHeader::new();
        let mut file = File::create(&self.path).map_err(|e| self.io(e))?;
        file.write_all(&header.to_bytes()).map_err(|e| self.io(e))?;
        debug!(kind = %T::KIND, path = %self.path.display(), "Record file initialized");
        Ok(header)
    }

    /// Fails when the file is gone but its compaction copy is still on disk.
    ///
    /// The copy may be the only surviving data for the entity.
    fn check_orphaned_temp(&self) -> StorageResult<()> {
        let temp = self.temp_path();
        if !self.path.exists() && temp.exists() {
            warn!(
                kind = %T::KIND,
                temp = %temp.display(),
                "Record file missing next to a compaction copy; refusing to recreate it"
            );
            return Err(MaintenanceError::CompactionLeftover { path: temp }.into());
        }
        Ok(())
    }

    /// Startup check: creates a missing file, otherwise validates header and length.
    ///
    /// A missing file whose compaction copy survived is an error, not an empty file.
    pub fn verify(&self) -> StorageResult<FileHeader> {
        if !self.path.exists() {
            self.check_orphaned_temp()?;
            let header = self.initialize()?;
            info!(kind = %T::KIND, path = %self.path.display(), "Created empty record file");
            return Ok(header);
        }

        let header = self.read_header()?;
        header.check_version(&self.path)?;
        header.check_counters(&self.path)?;

        let expected = self.offset_of(header.slots());
        let actual = self.file_len()?;
        if actual < expected {
            return Err(FormatError::Truncated {
                path: self.path.clone(),
                expected,
                actual,
            }
            .into());
        }
        if actual > expected {
            warn!(
                kind = %T::KIND,
                path = %self.path.display(),
                trailing_bytes = actual - expected,
                "Bytes found past the indexed slots; an append may have been interrupted"
            );
        }

        let temp = self.temp_path();
        if temp.exists() {
            warn!(
                kind = %T::KIND,
                temp = %temp.display(),
                "Leftover compaction file found; manual recovery required"
            );
        }

        info!(
            kind = %T::KIND,
            records = header.record_count(),
            active = header.active_count(),
            next_id = header.next_id(),
            "Record file verified"
        );
        Ok(header)
    }

    /// Reads the header at offset 0. A missing file yields the default header.
    pub fn read_header(&self) -> StorageResult<FileHeader> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(FileHeader::new()),
            Err(e) => return Err(self.io(e)),
        };
        self.read_header_from(&mut file)
    }

    fn read_header_from(&self, file: &mut File) -> StorageResult<FileHeader> {
        let mut bytes = [0u8; HEADER_SIZE];
        file.seek(SeekFrom::Start(0)).map_err(|e| self.io(e))?;
        match file.read_exact(&mut bytes) {
            Ok(()) => Ok(FileHeader::from_bytes(&bytes)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(FormatError::Truncated {
                path: self.path.clone(),
                expected: HEADER_SIZE as u64,
                actual: file.metadata().map(|m| m.len()).unwrap_or(0),
            }
            .into()),
            Err(e) => Err(self.io(e)),
        }
    }

    /// Rewrites the header at offset 0.
    pub fn write_header(&self, header: &FileHeader) -> StorageResult<()> {
        let mut file = self.open_rw()?;
        Self::write_at(&mut file, 0, &header.to_bytes()).map_err(|e| self.io(e))
    }

    /// Reads the record in slot `index`, deleted or not.
    pub fn read_at(&self, index: u64) -> StorageResult<T> {
        let mut file = File::open(&self.path).map_err(|e| self.io(e))?;
        let header = self.read_header_from(&mut file)?;
        self.check_slot(index, &header)?;

        let mut buf = vec![0u8; T::WIDTH];
        file.seek(SeekFrom::Start(self.offset_of(index)))
            .map_err(|e| self.io(e))?;
        file.read_exact(&mut buf).map_err(|e| self.io(e))?;
        T::decode(&buf)
    }

    /// Appends `record`, assigning it the next ID and fresh timestamps.
    ///
    /// The record is written before the header. A failure between the two writes
    /// leaves trailing bytes that [`verify`](Self::verify) reports.
    pub fn append(&self, record: &mut T) -> StorageResult<i32> {
        if !self.path.exists() {
            self.check_orphaned_temp()?;
            self.initialize()?;
        }
        let mut file = self.open_rw()?;
        let mut header = self.read_header_from(&mut file)?;
        header.check_version(&self.path)?;

        let id = header.next_id();
        record.meta_mut().stamp_created(id, Utc::now());
        let bytes = record.to_bytes()?;

        let index = header.slots();
        Self::write_at(&mut file, self.offset_of(index), &bytes).map_err(|e| self.io(e))?;
        header.record_appended();
        Self::write_at(&mut file, 0, &header.to_bytes()).map_err(|e| self.io(e))?;

        debug!(kind = %T::KIND, id, slot = index, "Record appended");
        Ok(id)
    }

    /// Writes `record` into slot `index` without touching the counters.
    pub fn overwrite(&self, index: u64, record: &T) -> StorageResult<()> {
        let bytes = record.to_bytes()?;
        let mut file = self.open_rw()?;
        let header = self.read_header_from(&mut file)?;
        self.check_slot(index, &header)?;

        Self::write_at(&mut file, self.offset_of(index), &bytes).map_err(|e| self.io(e))?;
        debug!(kind = %T::KIND, id = record.id(), slot = index, "Record overwritten");
        Ok(())
    }

    /// Lazily reads every indexed slot in order, soft-deleted ones included.
    pub fn records(&self) -> StorageResult<Records<T>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Records::empty(&self.path)),
            Err(e) => return Err(self.io(e)),
        };
        let header = self.read_header_from(&mut file)?;
        file.seek(SeekFrom::Start(HEADER_SIZE as u64))
            .map_err(|e| self.io(e))?;

        Ok(Records {
            reader: Some(BufReader::new(file)),
            path: self.path.clone(),
            index: 0,
            slots: header.slots(),
            buf: vec![0u8; T::WIDTH],
            _record: PhantomData,
        })
    }

    /// First live record matching `predicate`, with its slot index.
    pub fn find_by<P>(&self, mut predicate: P) -> StorageResult<Option<(u64, T)>>
    where
        P: FnMut(&T) -> bool,
    {
        for slot in self.records()? {
            let (index, record) = slot?;
            if !record.is_deleted() && predicate(&record) {
                return Ok(Some((index, record)));
            }
        }
        Ok(None)
    }

    /// Slot index of the live record with `id`.
    pub fn find_index_by_id(&self, id: i32) -> StorageResult<Option<u64>> {
        Ok(self.find_by(|r| r.id() == id)?.map(|(index, _)| index))
    }

    /// Counts live records by scanning every slot.
    pub fn count_active(&self) -> StorageResult<i32> {
        let mut active = 0;
        for slot in self.records()? {
            let (_, record) = slot?;
            if !record.is_deleted() {
                active += 1;
            }
        }
        Ok(active)
    }

    /// Rewrites the header's active count with a fresh scan.
    pub fn refresh_active_count(&self) -> StorageResult<FileHeader> {
        let active = self.count_active()?;
        let mut header = self.read_header()?;
        header.set_active_count(active);
        self.write_header(&header)?;
        Ok(header)
    }

    fn check_slot(&self, index: u64, header: &FileHeader) -> StorageResult<()> {
        if index >= header.slots() {
            return Err(ResourceError::SlotOutOfRange {
                kind: T::KIND,
                index,
                record_count: header.slots(),
            }
            .into());
        }
        Ok(())
    }

    fn file_len(&self) -> StorageResult<u64> {
        fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| self.io(e))
    }

    fn open_rw(&self) -> StorageResult<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| self.io(e))
    }

    fn write_at(file: &mut File, offset: u64, bytes: &[u8]) -> std::io::Result<()> {
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)
    }

    fn io(&self, source: std::io::Error) -> StorageError {
        StorageError::io(&self.path, source)
    }
}

/// Iterator over the slots of a [`RecordFile`], yielding `(slot index, record)`.
///
/// Stops after the first error.
pub struct Records<T> {
    reader: Option<BufReader<File>>,
    path: PathBuf,
    index: u64,
    slots: u64,
    buf: Vec<u8>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Records<T> {
    fn empty(path: &Path) -> Self {
        Self {
            reader: None,
            path: path.to_path_buf(),
            index: 0,
            slots: 0,
            buf: Vec::new(),
            _record: PhantomData,
        }
    }
}

impl<T: FixedRecord> Iterator for Records<T> {
    type Item = StorageResult<(u64, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.slots {
            return None;
        }
        let reader = self.reader.as_mut()?;
        if let Err(e) = reader.read_exact(&mut self.buf) {
            self.reader = None;
            return Some(Err(StorageError::io(&self.path, e)));
        }

        let index = self.index;
        self.index += 1;
        match T::decode(&self.buf) {
            Ok(record) => Some(Ok((index, record))),
            Err(e) => {
                self.reader = None;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.slots.saturating_sub(self.index) as usize;
        if self.reader.is_some() {
            (0, Some(remaining))
        } else {
            (0, Some(0))
        }
    }
}
