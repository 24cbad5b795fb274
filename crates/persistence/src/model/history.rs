//! Medical-history entries.
//!
//! Entries of every patient share one file. A patient's entries form a singly linked
//! list: the patient record holds the head ID and each entry holds the ID of its
//! successor in `next_entry_id` (`None` at the tail).

use serde::{Deserialize, Serialize};

use crate::core::{FixedRecord, RecordMeta};
use crate::error::StorageResult;
use crate::model::{DATE_WIDTH, TIME_WIDTH, validate_date, validate_time};
use crate::types::codec::{FieldReader, FieldWriter};
use crate::types::{RecordKind, id_from_disk, id_to_disk};

const DIAGNOSIS: usize = 200;
const TREATMENT: usize = 200;
const MEDICATIONS: usize = 150;

/// One consultation in a patient's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub date: String,
    pub time: String,
    pub diagnosis: String,
    pub treatment: String,
    pub medications: String,
    pub cost: f32,
    /// Successor in the patient's chain.
    pub next_entry_id: Option<i32>,
}

impl HistoryEntry {
    /// A candidate entry; the patient is set when it is appended to a chain.
    pub fn new(
        doctor_id: i32,
        date: impl Into<String>,
        time: impl Into<String>,
        diagnosis: impl Into<String>,
    ) -> Self {
        Self {
            meta: RecordMeta::placeholder(),
            patient_id: crate::types::NO_ID,
            doctor_id,
            date: date.into(),
            time: time.into(),
            diagnosis: diagnosis.into(),
            treatment: String::new(),
            medications: String::new(),
            cost: 0.0,
            next_entry_id: None,
        }
    }
}

impl FixedRecord for HistoryEntry {
    const KIND: RecordKind = RecordKind::HistoryEntry;
    const WIDTH: usize = 4
        + 4
        + 4
        + DATE_WIDTH
        + TIME_WIDTH
        + DIAGNOSIS
        + TREATMENT
        + MEDICATIONS
        + 4
        + 4
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
        w.put_i32(self.patient_id);
        w.put_i32(self.doctor_id);
        w.put_str("date", &self.date, DATE_WIDTH)?;
        w.put_str("time", &self.time, TIME_WIDTH)?;
        w.put_str("diagnosis", &self.diagnosis, DIAGNOSIS)?;
        w.put_str("treatment", &self.treatment, TREATMENT)?;
        w.put_str("medications", &self.medications, MEDICATIONS)?;
        w.put_f32(self.cost);
        w.put_i32(id_to_disk(self.next_entry_id));
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
        let diagnosis = r.str("diagnosis", DIAGNOSIS)?;
        let treatment = r.str("treatment", TREATMENT)?;
        let medications = r.str("medications", MEDICATIONS)?;
        let cost = r.f32();
        let next_entry_id = id_from_disk(r.i32());
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
            diagnosis,
            treatment,
            medications,
            cost,
            next_entry_id,
        })
    }

    fn validate(&self) -> StorageResult<()> {
        validate_date("date", &self.date)?;
        validate_time("time", &self.time)
    }
}
