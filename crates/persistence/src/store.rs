//! The hospital record store.
//!
//! [`HospitalStore`] ties the four entity repositories, the history ledger and the
//! maintenance operations together, and owns the hospital snapshot. The snapshot's
//! counters are refreshed from the file headers after every mutation and written to
//! disk only by [`HospitalStore::save_hospital`].

use std::fs;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::core::{FixedRecord, Repository};
use crate::error::{
    MaintenanceError, ResourceError, StorageError, StorageResult, ValidationError,
};
use crate::ledger::{ChainAudit, HistoryLedger};
use crate::maintenance::{self, BackupReport, CompactionReport, RestoreReport};
use crate::model::{Appointment, AppointmentStatus, Doctor, HistoryEntry, Hospital, Patient};
use crate::types::{FileHeader, HeaderSummary, RecordKind};

/// Header counters of one entity file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub kind: RecordKind,
    #[serde(flatten)]
    pub header: HeaderSummary,
}

/// Snapshot of the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub hospital: Hospital,
    pub files: Vec<FileStats>,
}

/// File-backed hospital records.
///
/// A process-local reader-writer lock guards the files: mutations and maintenance take
/// it exclusively, lookups and listings share it, so a reader never observes a file
/// between compaction's delete and rename. [`ledger`](Self::ledger) hands out an
/// unguarded view. Nothing coordinates separate processes working on the same
/// directory.
pub struct HospitalStore {
    config: StoreConfig,
    patients: Repository<Patient>,
    doctors: Repository<Doctor>,
    appointments: Repository<Appointment>,
    history: Repository<HistoryEntry>,
    hospital: RwLock<Hospital>,
    lock: RwLock<()>,
}

impl std::fmt::Debug for HospitalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HospitalStore")
            .field("config", &self.config)
            .field("hospital", &self.hospital.read().name)
            .finish_non_exhaustive()
    }
}

impl HospitalStore {
    /// Opens the store, creating and verifying every file.
    ///
    /// A version mismatch or malformed file in any of the five files fails the open.
    pub fn open(config: StoreConfig) -> StorageResult<Self> {
        fs::create_dir_all(&config.data_dir)
            .map_err(|e| StorageError::io(&config.data_dir, e))?;

        let hospital = Hospital::load_or_create(&config.hospital_path())?;
        let store = Self {
            patients: Repository::new(config.entity_path(RecordKind::Patient)),
            doctors: Repository::new(config.entity_path(RecordKind::Doctor)),
            appointments: Repository::new(config.entity_path(RecordKind::Appointment)),
            history: Repository::new(config.entity_path(RecordKind::HistoryEntry)),
            hospital: RwLock::new(hospital),
            lock: RwLock::new(()),
            config,
        };
        store.verify()?;

        info!(
            data_dir = %store.config.data_dir.display(),
            hospital = %store.hospital.read().name,
            "Hospital store opened"
        );
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Copy of the hospital snapshot.
    pub fn hospital(&self) -> Hospital {
        self.hospital.read().clone()
    }

    /// Verifies the four entity files and mirrors their headers into the snapshot.
    pub fn verify(&self) -> StorageResult<Vec<FileStats>> {
        let _guard = self.lock.write();
        let files = vec![
            self.file_stats(RecordKind::Patient, self.patients.file().verify()?),
            self.file_stats(RecordKind::Doctor, self.doctors.file().verify()?),
            self.file_stats(RecordKind::Appointment, self.appointments.file().verify()?),
            self.file_stats(RecordKind::HistoryEntry, self.history.file().verify()?),
        ];
        Ok(files)
    }

    /// Current header counters of every entity file.
    pub fn stats(&self) -> StorageResult<StoreStats> {
        let _guard = self.lock.read();
        let mut files = Vec::with_capacity(RecordKind::ALL.len());
        for kind in RecordKind::ALL {
            let header = self.header(kind)?;
            files.push(self.file_stats(kind, header));
        }
        Ok(StoreStats {
            hospital: self.hospital(),
            files,
        })
    }

    /// Writes the snapshot to the hospital file.
    pub fn save_hospital(&self) -> StorageResult<()> {
        let _guard = self.lock.write();
        self.hospital.read().save(&self.config.hospital_path())?;
        info!("Hospital data saved");
        Ok(())
    }

    /// Changes the hospital's identity fields. Persisted by [`save_hospital`](Self::save_hospital).
    pub fn set_hospital_info(&self, name: &str, address: &str, phone: &str) -> StorageResult<()> {
        let mut candidate = self.hospital();
        candidate.name = name.to_string();
        candidate.address = address.to_string();
        candidate.phone = phone.to_string();
        candidate.encode()?;
        *self.hospital.write() = candidate;
        Ok(())
    }

    // ========================================================================
    // Patients
    // ========================================================================

    /// Adds a patient and returns its ID.
    ///
    /// National IDs are not checked for uniqueness here; callers use
    /// [`find_patient_by_national_id`](Self::find_patient_by_national_id) first.
    pub fn add_patient(&self, patient: Patient) -> StorageResult<i32> {
        let _guard = self.lock.write();
        let id = self.patients.add(patient)?;
        self.refresh(RecordKind::Patient)?;
        Ok(id)
    }

    pub fn find_patient(&self, id: i32) -> StorageResult<Option<Patient>> {
        let _guard = self.lock.read();
        self.patients.find_by_id(id)
    }

    pub fn find_patient_by_national_id(&self, national_id: &str) -> StorageResult<Option<Patient>> {
        let _guard = self.lock.read();
        self.patients.find_by(|p| p.national_id == national_id)
    }

    /// Overwrites a patient's caller-owned fields.
    ///
    /// The appointment list and history pointers always keep their stored values.
    pub fn update_patient(&self, patient: &mut Patient) -> StorageResult<()> {
        let _guard = self.lock.write();
        let stored = self.require(&self.patients, patient.meta.id)?;
        patient.consultation_count = stored.consultation_count;
        patient.first_consultation_id = stored.first_consultation_id;
        patient.appointment_ids = stored.appointment_ids;
        self.patients.update(patient)
    }

    pub fn delete_patient(&self, id: i32) -> StorageResult<()> {
        let _guard = self.lock.write();
        self.patients.soft_delete(id)?;
        self.refresh(RecordKind::Patient)
    }

    pub fn list_patients(&self) -> StorageResult<Vec<Patient>> {
        let _guard = self.lock.read();
        self.patients.list()
    }

    // ========================================================================
    // Doctors
    // ========================================================================

    pub fn add_doctor(&self, doctor: Doctor) -> StorageResult<i32> {
        let _guard = self.lock.write();
        let id = self.doctors.add(doctor)?;
        self.refresh(RecordKind::Doctor)?;
        Ok(id)
    }

    pub fn find_doctor(&self, id: i32) -> StorageResult<Option<Doctor>> {
        let _guard = self.lock.read();
        self.doctors.find_by_id(id)
    }

    pub fn find_doctor_by_license(&self, license_number: &str) -> StorageResult<Option<Doctor>> {
        let _guard = self.lock.read();
        self.doctors.find_by(|d| d.license_number == license_number)
    }

    /// Overwrites a doctor's caller-owned fields; reference lists keep their stored values.
    pub fn update_doctor(&self, doctor: &mut Doctor) -> StorageResult<()> {
        let _guard = self.lock.write();
        let stored = self.require(&self.doctors, doctor.meta.id)?;
        doctor.patient_ids = stored.patient_ids;
        doctor.appointment_ids = stored.appointment_ids;
        self.doctors.update(doctor)
    }

    pub fn delete_doctor(&self, id: i32) -> StorageResult<()> {
        let _guard = self.lock.write();
        self.doctors.soft_delete(id)?;
        self.refresh(RecordKind::Doctor)
    }

    pub fn list_doctors(&self) -> StorageResult<Vec<Doctor>> {
        let _guard = self.lock.read();
        self.doctors.list()
    }

    /// Live doctors whose specialty matches, ignoring case.
    pub fn doctors_by_specialty(&self, specialty: &str) -> StorageResult<Vec<Doctor>> {
        let _guard = self.lock.read();
        Ok(self
            .doctors
            .list()?
            .into_iter()
            .filter(|d| d.specialty.eq_ignore_ascii_case(specialty))
            .collect())
    }

    // ========================================================================
    // Appointments
    // ========================================================================

    /// Books an appointment and links it into the patient's and doctor's lists.
    ///
    /// Both participants must exist and have room in every affected list; otherwise
    /// nothing is written. Double booking is not prevented here, see
    /// [`doctor_available`](Self::doctor_available). Once the appointment is appended,
    /// a failure updating the patient or doctor is reported as
    /// [`MaintenanceError::Partial`].
    pub fn schedule_appointment(&self, appointment: Appointment) -> StorageResult<i32> {
        let _guard = self.lock.write();
        appointment.validate()?;
        appointment.to_bytes()?;

        let mut patient = self.reference(&self.patients, "patient_id", appointment.patient_id)?;
        let mut doctor = self.reference(&self.doctors, "doctor_id", appointment.doctor_id)?;
        patient.ensure_appointment_slot()?;
        doctor.ensure_slots_for(patient.meta.id)?;

        let id = self.appointments.add(appointment)?;
        self.refresh(RecordKind::Appointment)?;

        let linked = patient
            .link_appointment(id)
            .map_err(StorageError::from)
            .and_then(|_| self.patients.update(&mut patient));
        if let Err(e) = linked {
            return Err(self.partial_schedule(id, 1, e));
        }

        let linked = doctor
            .link_appointment(id)
            .and_then(|_| doctor.link_patient(patient.meta.id))
            .map_err(StorageError::from)
            .and_then(|_| self.doctors.update(&mut doctor));
        if let Err(e) = linked {
            return Err(self.partial_schedule(id, 2, e));
        }

        info!(
            appointment_id = id,
            patient_id = patient.meta.id,
            doctor_id = doctor.meta.id,
            "Appointment scheduled"
        );
        Ok(id)
    }

    pub fn find_appointment(&self, id: i32) -> StorageResult<Option<Appointment>> {
        let _guard = self.lock.read();
        self.appointments.find_by_id(id)
    }

    pub fn list_appointments(&self) -> StorageResult<Vec<Appointment>> {
        let _guard = self.lock.read();
        self.appointments.list()
    }

    /// Appointments linked to a patient, in booking order. `None` for an unknown patient.
    pub fn appointments_for_patient(
        &self,
        patient_id: i32,
    ) -> StorageResult<Option<Vec<Appointment>>> {
        let _guard = self.lock.read();
        match self.patients.find_by_id(patient_id)? {
            Some(patient) => Ok(Some(self.appointments.resolve(patient.appointment_ids.iter())?)),
            None => Ok(None),
        }
    }

    /// Appointments linked to a doctor, in booking order. `None` for an unknown doctor.
    pub fn appointments_for_doctor(
        &self,
        doctor_id: i32,
    ) -> StorageResult<Option<Vec<Appointment>>> {
        let _guard = self.lock.read();
        match self.doctors.find_by_id(doctor_id)? {
            Some(doctor) => Ok(Some(self.appointments.resolve(doctor.appointment_ids.iter())?)),
            None => Ok(None),
        }
    }

    /// Whether the doctor has no live, non-cancelled appointment at `date` and `time`.
    pub fn doctor_available(&self, doctor_id: i32, date: &str, time: &str) -> StorageResult<bool> {
        let _guard = self.lock.read();
        let clash = self.appointments.find_by(|a| {
            a.doctor_id == doctor_id && a.date == date && a.time == time && a.occupies_slot()
        })?;
        Ok(clash.is_none())
    }

    /// Marks an appointment as cancelled.
    ///
    /// Cancelling twice is a no-op; attended appointments cannot be cancelled.
    pub fn cancel_appointment(&self, id: i32) -> StorageResult<Appointment> {
        let _guard = self.lock.write();
        let mut appointment = self.require(&self.appointments, id)?;
        match appointment.status {
            AppointmentStatus::Cancelled => return Ok(appointment),
            AppointmentStatus::Attended => {
                return Err(ResourceError::InvalidState {
                    kind: RecordKind::Appointment,
                    id,
                    message: "an attended appointment cannot be cancelled".to_string(),
                }
                .into());
            }
            AppointmentStatus::Scheduled => {}
        }

        appointment.status = AppointmentStatus::Cancelled;
        self.appointments.update(&mut appointment)?;
        info!(appointment_id = id, "Appointment cancelled");
        Ok(appointment)
    }

    /// Records the consultation for a scheduled appointment and marks it attended.
    ///
    /// The entry's patient and doctor are taken from the appointment. Returns the new
    /// history entry's ID.
    pub fn attend_appointment(&self, id: i32, mut entry: HistoryEntry) -> StorageResult<i32> {
        let _guard = self.lock.write();
        let mut appointment = self.require(&self.appointments, id)?;
        if appointment.status != AppointmentStatus::Scheduled {
            return Err(ResourceError::InvalidState {
                kind: RecordKind::Appointment,
                id,
                message: format!("appointment is {}", appointment.status),
            }
            .into());
        }

        entry.doctor_id = appointment.doctor_id;
        let entry_id = self.ledger().append(appointment.patient_id, entry)?;
        self.refresh(RecordKind::HistoryEntry)?;

        appointment.status = AppointmentStatus::Attended;
        appointment.attended = true;
        appointment.consultation_id = Some(entry_id);
        if let Err(e) = self.appointments.update(&mut appointment) {
            return Err(MaintenanceError::Partial {
                operation: "attend appointment",
                completed: 1,
                total: 2,
                source: Some(Box::new(e)),
            }
            .into());
        }

        info!(appointment_id = id, entry_id, "Appointment attended");
        Ok(entry_id)
    }

    pub fn delete_appointment(&self, id: i32) -> StorageResult<()> {
        let _guard = self.lock.write();
        self.appointments.soft_delete(id)?;
        self.refresh(RecordKind::Appointment)
    }

    // ========================================================================
    // Medical history
    // ========================================================================

    /// Appends a consultation to a patient's history chain and returns its ID.
    pub fn record_consultation(&self, patient_id: i32, entry: HistoryEntry) -> StorageResult<i32> {
        let _guard = self.lock.write();
        self.reference(&self.doctors, "doctor_id", entry.doctor_id)?;
        let id = self.ledger().append(patient_id, entry)?;
        self.refresh(RecordKind::HistoryEntry)?;
        Ok(id)
    }

    /// A patient's history from first to latest consultation. `None` for an unknown patient.
    pub fn history(&self, patient_id: i32) -> StorageResult<Option<Vec<HistoryEntry>>> {
        let _guard = self.lock.read();
        self.ledger().entries(patient_id)
    }

    pub fn find_history_entry(&self, id: i32) -> StorageResult<Option<HistoryEntry>> {
        let _guard = self.lock.read();
        self.history.find_by_id(id)
    }

    /// Compares a patient's reachable chain with the stored consultation count.
    pub fn verify_chain(&self, patient_id: i32) -> StorageResult<Option<ChainAudit>> {
        let _guard = self.lock.read();
        self.ledger().verify_chain(patient_id)
    }

    /// Always fails: history entries are never removed.
    pub fn delete_history_entry(&self, id: i32) -> StorageResult<()> {
        self.ledger().delete(id)
    }

    /// The history ledger over this store's files.
    ///
    /// Calls through the ledger bypass the store lock.
    pub fn ledger(&self) -> HistoryLedger<'_> {
        HistoryLedger::new(&self.patients, &self.history, self.config.max_chain)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Drops soft-deleted slots from one entity file.
    pub fn compact(&self, kind: RecordKind) -> StorageResult<CompactionReport> {
        let _guard = self.lock.write();
        self.compact_locked(kind)
    }

    /// Compacts all four entity files in order, stopping at the first failure.
    pub fn compact_all(&self) -> StorageResult<Vec<CompactionReport>> {
        let _guard = self.lock.write();
        let mut reports = Vec::with_capacity(RecordKind::ALL.len());
        for kind in RecordKind::ALL {
            match self.compact_locked(kind) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    return Err(MaintenanceError::Partial {
                        operation: "compaction",
                        completed: reports.len(),
                        total: RecordKind::ALL.len(),
                        source: Some(Box::new(e)),
                    }
                    .into());
                }
            }
        }
        Ok(reports)
    }

    /// Archives the five store files to the configured backup path.
    ///
    /// The archive holds the hospital file as last saved, not the in-memory snapshot.
    pub fn backup(&self) -> StorageResult<BackupReport> {
        let _guard = self.lock.write();
        maintenance::create_backup(
            &self.config.backup_path(),
            &self.config.archive_paths(),
            self.config.chunk_size,
        )
    }

    /// Overwrites the store files from the configured backup archive and reloads the
    /// hospital snapshot.
    pub fn restore(&self) -> StorageResult<RestoreReport> {
        let _guard = self.lock.write();
        let result = maintenance::restore_backup(
            &self.config.backup_path(),
            &self.config.data_dir,
            &StoreConfig::archive_names(),
            self.config.chunk_size,
        );

        if let Err(e) = self.reload_hospital() {
            warn!(error = %e, "Hospital snapshot could not be reloaded after restore");
            if result.is_ok() {
                return Err(e);
            }
        }
        result
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn compact_locked(&self, kind: RecordKind) -> StorageResult<CompactionReport> {
        let report = match kind {
            RecordKind::Patient => maintenance::compact(self.patients.file())?,
            RecordKind::Doctor => maintenance::compact(self.doctors.file())?,
            RecordKind::Appointment => maintenance::compact(self.appointments.file())?,
            RecordKind::HistoryEntry => maintenance::compact(self.history.file())?,
        };
        self.refresh(kind)?;
        Ok(report)
    }

    fn reload_hospital(&self) -> StorageResult<()> {
        let mut hospital = Hospital::load_or_create(&self.config.hospital_path())?;
        for kind in RecordKind::ALL {
            hospital.mirror(kind, &self.header(kind)?);
        }
        *self.hospital.write() = hospital;
        Ok(())
    }

    fn header(&self, kind: RecordKind) -> StorageResult<FileHeader> {
        match kind {
            RecordKind::Patient => self.patients.header(),
            RecordKind::Doctor => self.doctors.header(),
            RecordKind::Appointment => self.appointments.header(),
            RecordKind::HistoryEntry => self.history.header(),
        }
    }

    fn refresh(&self, kind: RecordKind) -> StorageResult<()> {
        let header = self.header(kind)?;
        self.hospital.write().mirror(kind, &header);
        Ok(())
    }

    fn file_stats(&self, kind: RecordKind, header: FileHeader) -> FileStats {
        self.hospital.write().mirror(kind, &header);
        FileStats {
            kind,
            header: header.summary(),
        }
    }

    fn require<T: FixedRecord>(&self, repo: &Repository<T>, id: i32) -> StorageResult<T> {
        repo.find_by_id(id)?
            .ok_or_else(|| ResourceError::NotFound { kind: T::KIND, id }.into())
    }

    fn reference<T: FixedRecord>(
        &self,
        repo: &Repository<T>,
        field: &'static str,
        id: i32,
    ) -> StorageResult<T> {
        repo.find_by_id(id)?.ok_or_else(|| {
            ValidationError::MissingReference {
                field,
                kind: T::KIND,
                id,
            }
            .into()
        })
    }

    fn partial_schedule(&self, appointment_id: i32, completed: usize, e: StorageError) -> StorageError {
        warn!(
            appointment_id,
            completed,
            error = %e,
            "Appointment written but not fully linked"
        );
        MaintenanceError::Partial {
            operation: "schedule appointment",
            completed,
            total: 3,
            source: Some(Box::new(e)),
        }
        .into()
    }
}
