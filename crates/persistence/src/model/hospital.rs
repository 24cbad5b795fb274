//! The hospital aggregate snapshot.
//!
//! A single header-less record holding the hospital's identity plus counters mirrored
//! from the four entity file headers. The headers stay the source of truth; this
//! record is refreshed from them and written back only on an explicit save.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FormatError, StorageError, StorageResult};
use crate::types::codec::{FieldReader, FieldWriter};
use crate::types::{FileHeader, RecordKind};

const NAME: usize = 100;
const ADDRESS: usize = 150;
const PHONE: usize = 15;

/// Hospital identity and mirrored counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hospital {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub next_patient_id: i32,
    pub next_doctor_id: i32,
    pub next_appointment_id: i32,
    pub next_history_id: i32,
    pub total_patients: i32,
    pub total_doctors: i32,
    pub total_appointments: i32,
    pub total_consultations: i32,
}

impl Default for Hospital {
    fn default() -> Self {
        Self {
            name: "Hospital Central".to_string(),
            address: "Av. Principal Milagro".to_string(),
            phone: "555-1234".to_string(),
            next_patient_id: 1,
            next_doctor_id: 1,
            next_appointment_id: 1,
            next_history_id: 1,
            total_patients: 0,
            total_doctors: 0,
            total_appointments: 0,
            total_consultations: 0,
        }
    }
}

impl Hospital {
    /// Encoded size in bytes; the file is exactly this long.
    pub const WIDTH: usize = NAME + ADDRESS + PHONE + 4 * 8;

    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        let mut buf = vec![0u8; Self::WIDTH];
        let mut w = FieldWriter::new(&mut buf);
        w.put_str("name", &self.name, NAME)?;
        w.put_str("address", &self.address, ADDRESS)?;
        w.put_str("phone", &self.phone, PHONE)?;
        w.put_i32(self.next_patient_id);
        w.put_i32(self.next_doctor_id);
        w.put_i32(self.next_appointment_id);
        w.put_i32(self.next_history_id);
        w.put_i32(self.total_patients);
        w.put_i32(self.total_doctors);
        w.put_i32(self.total_appointments);
        w.put_i32(self.total_consultations);
        debug_assert_eq!(w.position(), Self::WIDTH);
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> StorageResult<Self> {
        let mut r = FieldReader::new(buf, "hospital");
        Ok(Self {
            name: r.str("name", NAME)?,
            address: r.str("address", ADDRESS)?,
            phone: r.str("phone", PHONE)?,
            next_patient_id: r.i32(),
            next_doctor_id: r.i32(),
            next_appointment_id: r.i32(),
            next_history_id: r.i32(),
            total_patients: r.i32(),
            total_doctors: r.i32(),
            total_appointments: r.i32(),
            total_consultations: r.i32(),
        })
    }

    /// Loads the snapshot, creating it with defaults when the file is absent.
    ///
    /// An existing file must be exactly [`Hospital::WIDTH`] bytes.
    pub fn load_or_create(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            let hospital = Self::default();
            hospital.save(path)?;
            info!(path = %path.display(), "Created hospital file with defaults");
            return Ok(hospital);
        }

        let bytes = fs::read(path).map_err(|e| StorageError::io(path, e))?;
        if bytes.len() != Self::WIDTH {
            return Err(FormatError::HospitalSize {
                path: path.to_path_buf(),
                expected: Self::WIDTH as u64,
                actual: bytes.len() as u64,
            }
            .into());
        }
        let hospital = Self::decode(&bytes)?;
        info!(name = %hospital.name, "Hospital loaded");
        Ok(hospital)
    }

    /// Overwrites the snapshot file.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let bytes = self.encode()?;
        fs::write(path, bytes).map_err(|e| StorageError::io(path, e))?;
        debug!(path = %path.display(), "Hospital snapshot saved");
        Ok(())
    }

    /// Mirrors one entity file's header into the counters.
    pub fn mirror(&mut self, kind: RecordKind, header: &FileHeader) {
        let (next, total) = match kind {
            RecordKind::Patient => (&mut self.next_patient_id, &mut self.total_patients),
            RecordKind::Doctor => (&mut self.next_doctor_id, &mut self.total_doctors),
            RecordKind::Appointment => {
                (&mut self.next_appointment_id, &mut self.total_appointments)
            }
            RecordKind::HistoryEntry => (&mut self.next_history_id, &mut self.total_consultations),
        };
        *next = header.next_id();
        *total = header.active_count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hospital.bin");

        let hospital = Hospital::load_or_create(&path).unwrap();
        assert_eq!(hospital, Hospital::default());
        assert_eq!(fs::metadata(&path).unwrap().len(), Hospital::WIDTH as u64);
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hospital.bin");
        fs::write(&path, [0u8; 16]).unwrap();

        let err = Hospital::load_or_create(&path).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Format(FormatError::HospitalSize { .. })
        ));
    }

    #[test]
    fn test_mirror_header() {
        let mut header = FileHeader::new();
        header.record_appended();
        header.record_appended();

        let mut hospital = Hospital::default();
        hospital.mirror(RecordKind::Doctor, &header);
        assert_eq!(hospital.next_doctor_id, 3);
        assert_eq!(hospital.total_doctors, 2);
        assert_eq!(hospital.next_patient_id, 1);
    }
}
