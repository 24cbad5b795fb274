//! Doctor records.

use serde::{Deserialize, Serialize};

use crate::core::{FixedRecord, RecordMeta};
use crate::error::{CapacityError, StorageResult};
use crate::types::codec::{FieldReader, FieldWriter};
use crate::types::{BoundedIds, RecordKind};

/// Maximum number of distinct patients a doctor can hold.
pub const MAX_DOCTOR_PATIENTS: usize = 50;
/// Maximum number of appointments a doctor can hold.
pub const MAX_DOCTOR_APPOINTMENTS: usize = 30;

const NAME: usize = 50;
const LICENSE: usize = 20;
const SPECIALTY: usize = 50;
const OFFICE_HOURS: usize = 50;
const PHONE: usize = 15;
const EMAIL: usize = 50;

/// A doctor on staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub first_name: String,
    pub last_name: String,
    /// Professional license number, the secondary lookup key.
    pub license_number: String,
    pub specialty: String,
    pub years_experience: i32,
    pub consultation_fee: f32,
    pub office_hours: String,
    pub phone: String,
    pub email: String,
    pub available: bool,
    pub patient_ids: BoundedIds<MAX_DOCTOR_PATIENTS>,
    pub appointment_ids: BoundedIds<MAX_DOCTOR_APPOINTMENTS>,
}

impl Default for Doctor {
    fn default() -> Self {
        Self {
            meta: RecordMeta::placeholder(),
            first_name: String::new(),
            last_name: String::new(),
            license_number: String::new(),
            specialty: String::new(),
            years_experience: 0,
            consultation_fee: 0.0,
            office_hours: String::new(),
            phone: String::new(),
            email: String::new(),
            available: true,
            patient_ids: BoundedIds::new(),
            appointment_ids: BoundedIds::new(),
        }
    }
}

impl Doctor {
    /// A candidate doctor with the identifying fields set.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        license_number: impl Into<String>,
        specialty: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            license_number: license_number.into(),
            specialty: specialty.into(),
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether linking `patient_id` would need a free patient slot.
    pub fn needs_patient_slot(&self, patient_id: i32) -> bool {
        !self.patient_ids.contains(patient_id)
    }

    /// Fails when an appointment with `patient_id` could not be linked.
    pub fn ensure_slots_for(&self, patient_id: i32) -> Result<(), CapacityError> {
        if self.appointment_ids.is_full() {
            return Err(self.list_full("appointment", MAX_DOCTOR_APPOINTMENTS));
        }
        if self.needs_patient_slot(patient_id) && self.patient_ids.is_full() {
            return Err(self.list_full("patient", MAX_DOCTOR_PATIENTS));
        }
        Ok(())
    }

    /// Records `patient_id` once; already-known patients are a no-op.
    pub fn link_patient(&mut self, patient_id: i32) -> Result<(), CapacityError> {
        if !self.needs_patient_slot(patient_id) {
            return Ok(());
        }
        self.patient_ids
            .try_push(patient_id)
            .map_err(|full| self.list_full("patient", full.capacity))
    }

    /// Appends an appointment ID, failing when the list is full.
    pub fn link_appointment(&mut self, appointment_id: i32) -> Result<(), CapacityError> {
        self.appointment_ids
            .try_push(appointment_id)
            .map_err(|full| self.list_full("appointment", full.capacity))
    }

    fn list_full(&self, list: &'static str, capacity: usize) -> CapacityError {
        CapacityError::ListFull {
            owner: RecordKind::Doctor,
            owner_id: self.meta.id,
            list,
            capacity,
        }
    }
}

impl FixedRecord for Doctor {
    const KIND: RecordKind = RecordKind::Doctor;
    const WIDTH: usize = 4
        + NAME * 2
        + LICENSE
        + SPECIALTY
        + 4
        + 4
        + OFFICE_HOURS
        + PHONE
        + EMAIL
        + 1
        + 4 * (1 + MAX_DOCTOR_PATIENTS)
        + 4 * (1 + MAX_DOCTOR_APPOINTMENTS)
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
        w.put_str("license_number", &self.license_number, LICENSE)?;
        w.put_str("specialty", &self.specialty, SPECIALTY)?;
        w.put_i32(self.years_experience);
        w.put_f32(self.consultation_fee);
        w.put_str("office_hours", &self.office_hours, OFFICE_HOURS)?;
        w.put_str("phone", &self.phone, PHONE)?;
        w.put_str("email", &self.email, EMAIL)?;
        w.put_bool(self.available);
        w.put_ids(&self.patient_ids);
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
        let license_number = r.str("license_number", LICENSE)?;
        let specialty = r.str("specialty", SPECIALTY)?;
        let years_experience = r.i32();
        let consultation_fee = r.f32();
        let office_hours = r.str("office_hours", OFFICE_HOURS)?;
        let phone = r.str("phone", PHONE)?;
        let email = r.str("email", EMAIL)?;
        let available = r.bool();
        let patient_ids = r.ids("patient_ids")?;
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
            license_number,
            specialty,
            years_experience,
            consultation_fee,
            office_hours,
            phone,
            email,
            available,
            patient_ids,
            appointment_ids,
        })
    }

    fn reset_engine_fields(&mut self) {
        self.patient_ids.clear();
        self.appointment_ids.clear();
    }
}
