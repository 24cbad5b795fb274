//! Appointment records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{FixedRecord, RecordMeta};
use crate::error::{FormatError, StorageResult};
use crate::model::{DATE_WIDTH, TIME_WIDTH, validate_date, validate_time};
use crate::types::codec::{FieldReader, FieldWriter};
use crate::types::{RecordKind, id_from_disk, id_to_disk};

const REASON: usize = 150;
const STATUS: usize = 20;
const NOTES: usize = 200;

/// Lifecycle of an appointment. Stored on disk by its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// Booked and pending.
    Scheduled,
    /// Fulfilled; a history entry was recorded.
    Attended,
    /// Cancelled before it happened.
    Cancelled,
}

impl AppointmentStatus {
    /// The label written to disk.
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Agendada",
            AppointmentStatus::Attended => "Atendida",
            AppointmentStatus::Cancelled => "Cancelada",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Agendada" => Some(AppointmentStatus::Scheduled),
            "Atendida" => Some(AppointmentStatus::Attended),
            "Cancelada" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A booked appointment between a patient and a doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub patient_id: i32,
    pub doctor_id: i32,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM`.
    pub time: String,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: String,
    pub attended: bool,
    /// History entry recorded when the appointment was attended.
    pub consultation_id: Option<i32>,
}

impl Appointment {
    /// A scheduled candidate appointment.
    pub fn new(
        patient_id: i32,
        doctor_id: i32,
        date: impl Into<String>,
        time: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            meta: RecordMeta::placeholder(),
            patient_id,
            doctor_id,
            date: date.into(),
            time: time.into(),
            reason: reason.into(),
            status: AppointmentStatus::Scheduled,
            notes: String::new(),
            attended: false,
            consultation_id: None,
        }
    }

    /// Whether this appointment blocks the doctor's slot.
    pub fn occupies_slot(&self) -> bool {
        !self.is_deleted() && self.status != AppointmentStatus::Cancelled
    }
}

impl FixedRecord for Appointment {
    const KIND: RecordKind = RecordKind::Appointment;
    const WIDTH: usize =
        4 + 4 + 4 + DATE_WIDTH + TIME_WIDTH + REASON + STATUS + NOTES + 1 + 4 + 1 + 8 + 8;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn encode(&self, buf: &mut [u8]) -> StorageResult<()> {
        let mut w = FieldWriter::new(buf);
        w.put_i32(self.meta.id);
        w.put_i32(self.patient_id);
        w.put_i32(self.doctor_id);
        w.put_str("date", &self.date, DATE_WIDTH)?;
        w.put_str("time", &self.time, TIME_WIDTH)?;
        w.put_str("reason", &self.reason, REASON)?;
        w.put_str("status", self.status.label(), STATUS)?;
        w.put_str("notes", &self.notes, NOTES)?;
        w.put_bool(self.attended);
        w.put_i32(id_to_disk(self.consultation_id));
        w.put_bool(self.meta.deleted);
        w.put_time(self.meta.created_at);
        w.put_time(self.meta.modified_at);
        debug_assert_eq!(w.position(), Self::WIDTH);
        Ok(())
    }

    fn decode(buf: &[u8]) -> StorageResult<Self> {
        let mut r = FieldReader::new(buf, Self::KIND.name());
        let id = r.i32();
        let patient_id = r.i32();
        let doctor_id = r.i32();
        let date = r.str("date", DATE_WIDTH)?;
        let time = r.str("time", TIME_WIDTH)?;
        let reason = r.str("reason", REASON)?;
        let label = r.str("status", STATUS)?;
        let status = AppointmentStatus::from_label(&label).ok_or_else(|| FormatError::CorruptField {
            record: Self::KIND.name(),
            field: "status",
            message: format!("unknown status '{label}'"),
        })?;
        let notes = r.str("notes", NOTES)?;
        let attended = r.bool();
        let consultation_id = id_from_disk(r.i32());
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
            patient_id,
            doctor_id,
            date,
            time,
            reason,
            status,
            notes,
            attended,
            consultation_id,
        })
    }

    fn validate(&self) -> StorageResult<()> {
        validate_date("date", &self.date)?;
        validate_time("time", &self.time)
    }

    fn reset_engine_fields(&mut self) {
        self.status = AppointmentStatus::Scheduled;
        self.attended = false;
        self.consultation_id = None;
    }
}
