//! Medrec Persistence Layer
//!
//! This crate stores hospital records (patients, doctors, appointments and medical
//! history) in fixed-layout binary files with random access by computed offset,
//! soft deletion, bounded cross-reference lists and per-patient history chains
//! threaded through the history file.
//!
//! # Files
//!
//! | File | Contents |
//! |------|----------|
//! | `hospital.bin` | header-less hospital snapshot |
//! | `patients.bin` | header + patient slots |
//! | `doctors.bin` | header + doctor slots |
//! | `appointments.bin` | header + appointment slots |
//! | `history.bin` | header + history entry slots |
//! | `hospital_backup.bak` | backup archive of the five files above |
//!
//! # Architecture
//!
//! - [`types`] - file header, record kinds, bounded ID lists, field codec
//! - [`core`] - the fixed-record contract, record files and repositories
//! - [`model`] - the hospital entities and their layouts
//! - [`ledger`] - per-patient history chains
//! - [`maintenance`] - compaction, backup and restore
//! - [`store`] - the [`HospitalStore`] facade
//! - [`config`] - store configuration
//! - [`error`] - error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use medrec_persistence::{Appointment, Doctor, HospitalStore, Patient, StoreConfig};
//!
//! let store = HospitalStore::open(StoreConfig::in_dir("/var/lib/medrec"))?;
//!
//! if store.find_patient_by_national_id("001")?.is_none() {
//!     let patient_id = store.add_patient(Patient::new("Ana", "Pérez", "001"))?;
//!     let doctor_id = store.add_doctor(Doctor::new("Luis", "Mora", "MED-77", "General"))?;
//!
//!     if store.doctor_available(doctor_id, "2025-03-01", "09:00")? {
//!         store.schedule_appointment(Appointment::new(
//!             patient_id,
//!             doctor_id,
//!             "2025-03-01",
//!             "09:00",
//!             "Control",
//!         ))?;
//!     }
//! }
//!
//! store.save_hospital()?;
//! # Ok::<(), medrec_persistence::StorageError>(())
//! ```
//!
//! # Lookups vs. failures
//!
//! Finders return `Ok(None)` when nothing matches. Errors are reserved for I/O,
//! format, validation, capacity, chain integrity and partially completed multi-file
//! operations; see [`error`].

#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod core;
pub mod error;
pub mod ledger;
pub mod maintenance;
pub mod model;
pub mod store;
pub mod types;

// Re-export commonly used types at crate root
pub use config::StoreConfig;
pub use error::{StorageError, StorageResult};
pub use ledger::{ChainAudit, HistoryLedger};
pub use model::{Appointment, AppointmentStatus, Doctor, HistoryEntry, Hospital, Patient};
pub use store::{FileStats, HospitalStore, StoreStats};
pub use types::RecordKind;

// Re-export the record engine
pub use core::{FixedRecord, RecordFile, RecordMeta, Repository};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
