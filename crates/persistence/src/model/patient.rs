//! Patient records.

use serde::{Deserialize, Serialize};

use crate::core::{FixedRecord, RecordMeta};
use crate::error::{CapacityError, StorageResult};
use crate::types::codec::{FieldReader, FieldWriter};
use crate::types::{BoundedIds, RecordKind, id_from_disk, id_to_disk};

/// Maximum number of appointments a patient can hold.
pub const MAX_PATIENT_APPOINTMENTS: usize = 20;

const NAME: usize = 50;
const NATIONAL_ID: usize = 20;
/// One ASCII letter plus its terminating NUL.
const SEX: usize = 2;
const BLOOD_TYPE: usize = 5;
const PHONE: usize = 15;
const ADDRESS: usize = 100;
const EMAIL: usize = 50;
const LONG_TEXT: usize = 500;

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub first_name: String,
    pub last_name: String,
    /// National identity number (cédula), the secondary lookup key.
    pub national_id: String,
    pub age: i32,
    /// `'M'` or `'F'`.
    pub sex: char,
    pub blood_type: String,
    pub phone: String,
    pub address: String,
    pub email: String,
    pub allergies: String,
    pub notes: String,
    pub active: bool,
    /// Number of entries appended to this patient's history chain.
    pub consultation_count: i32,
    /// Head of the history chain.
    pub first_consultation_id: Option<i32>,
    pub appointment_ids: BoundedIds<MAX_PATIENT_APPOINTMENTS>,
}

impl Default for Patient {
    fn default() -> Self {
        Self {
            meta: RecordMeta::placeholder(),
            first_name: String::new(),
            last_name: String::new(),
            national_id: String::new(),
            age: 0,
            sex: 'M',
            blood_type: String::new(),
            phone: String::new(),
            address: String::new(),
            email: String::new(),
            allergies: String::new(),
            notes: String::new(),
            active: true,
            consultation_count: 0,
            first_consultation_id: None,
            appointment_ids: BoundedIds::new(),
        }
    }
}

impl Patient {
    /// A candidate patient with the identifying fields set.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        national_id: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            national_id: national_id.into(),
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Fails when no further appointment can be linked.
    pub fn ensure_appointment_slot(&self) -> Result<(), CapacityError> {
        if self.appointment_ids.is_full() {
            return Err(self.appointments_full());
        }
        Ok(())
    }

    /// Appends an appointment ID, failing when the list is full.
    pub fn link_appointment(&mut self, appointment_id: i32) -> Result<(), CapacityError> {
        self.appointment_ids
            .try_push(appointment_id)
            .map_err(|_| self.appointments_full())
    }

    fn appointments_full(&self) -> CapacityError {
        CapacityError::ListFull {
            owner: RecordKind::Patient,
            owner_id: self.meta.id,
            list: "appointment",
            capacity: MAX_PATIENT_APPOINTMENTS,
        }
    }
}

impl FixedRecord for Patient {
    const KIND: RecordKind = RecordKind::Patient;
    const WIDTH: usize = 4
        + NAME * 2
        + NATIONAL_ID
        + 4
        + SEX
        + BLOOD_TYPE
        + PHONE
        + ADDRESS
        + EMAIL
        + LONG_TEXT * 2
        + 1
        + 4
        + 4
        + 4 * (1 + MAX_PATIENT_APPOINTMENTS)
        + 1
        + 8
        + 8;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn encode(&self, buf: &mut [u8]) -> StorageResult<()> {
        let mut w = FieldWriter::new(buf);
        w.put_i32(self.meta.id);
        w.put_str("first_name", &self.first_name, NAME)?;
        w.put_str("last_name", &self.last_name, NAME)?;
        w.put_str("national_id", &self.national_id, NATIONAL_ID)?;
        w.put_i32(self.age);
        let mut sex = [0u8; 4];
        w.put_str("sex", self.sex.encode_utf8(&mut sex), SEX)?;
        w.put_str("blood_type", &self.blood_type, BLOOD_TYPE)?;
        w.put_str("phone", &self.phone, PHONE)?;
        w.put_str("address", &self.address, ADDRESS)?;
        w.put_str("email", &self.email, EMAIL)?;
        w.put_str("allergies", &self.allergies, LONG_TEXT)?;
        w.put_str("notes", &self.notes, LONG_TEXT)?;
        w.put_bool(self.active);
        w.put_i32(self.consultation_count);
        w.put_i32(id_to_disk(self.first_consultation_id));
        w.put_ids(&self.appointment_ids);
        w.put_bool(self.meta.deleted);
        w.put_time(self.meta.created_at);
        w.put_time(self.meta.modified_at);
        debug_assert_eq!(w.position(), Self::WIDTH);
        Ok(())
    }

    fn decode(buf: &[u8]) -> StorageResult<Self> {
        let mut r = FieldReader::new(buf, Self::KIND.name());
        let id = r.i32();
        let first_name = r.str("first_name", NAME)?;
        let last_name = r.str("last_name", NAME)?;
        let national_id = r.str("national_id", NATIONAL_ID)?;
        let age = r.i32();
        let sex = r.str("sex", SEX)?.chars().next().unwrap_or(' ');
        let blood_type = r.str("blood_type", BLOOD_TYPE)?;
        let phone = r.str("phone", PHONE)?;
        let address = r.str("address", ADDRESS)?;
        let email = r.str("email", EMAIL)?;
        let allergies = r.str("allergies", LONG_TEXT)?;
        let notes = r.str("notes", LONG_TEXT)?;
        let active = r.bool();
        let consultation_count = r.i32();
        let first_consultation_id = id_from_disk(r.i32());
        let appointment_ids = r.ids("appointment_ids")?;
        let deleted = r.bool();
        let created_at = r.time("created_at")?;
        let modified_at = r.time("modified_at")?;

        Ok(Self {
            meta: RecordMeta {
                id,
                deleted,
                created_at,
                modified_at,
            },
            first_name,
            last_name,
            national_id,
            age,
            sex,
            blood_type,
            phone,
            address,
            email,
            allergies,
            notes,
            active,
            consultation_count,
            first_consultation_id,
            appointment_ids,
        })
    }

    fn reset_engine_fields(&mut self) {
        self.consultation_count = 0;
        self.first_consultation_id = None;
        self.appointment_ids.clear();
    }
}
