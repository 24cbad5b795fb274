//! Per-patient medical history chains.
//!
//! Each patient's history is a singly linked list threaded through `history.bin` by ID:
//!
//! ```text
//! Patient { first_consultation_id: 4, consultation_count: 3 }
//!            │
//!            ▼
//! Entry 4 { next: 9 } ──► Entry 9 { next: 12 } ──► Entry 12 { next: -1 }
//! ```
//!
//! Entries of different patients interleave in the file. Every hop is a linear scan of
//! the history file, so appends cost O(chain length × file length).

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{FixedRecord, Repository};
use crate::error::{LedgerError, MaintenanceError, ResourceError, StorageError, StorageResult};
use crate::model::{HistoryEntry, Patient};
use crate::types::RecordKind;

/// Default number of entries a walk may visit before it is treated as a cycle.
pub const DEFAULT_MAX_CHAIN: usize = 100;

/// Appends to and walks history chains.
pub struct HistoryLedger<'a> {
    patients: &'a Repository<Patient>,
    history: &'a Repository<HistoryEntry>,
    max_chain: usize,
}

/// Result of [`HistoryLedger::verify_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainAudit {
    pub patient_id: i32,
    /// Entries actually reachable from the head.
    pub length: usize,
    /// The patient's stored `consultation_count`.
    pub recorded: i32,
}

impl ChainAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded >= 0 && self.length == self.recorded as usize
    }
}

impl<'a> HistoryLedger<'a> {
    pub fn new(
        patients: &'a Repository<Patient>,
        history: &'a Repository<HistoryEntry>,
        max_chain: usize,
    ) -> Self {
        Self {
            patients,
            history,
            max_chain,
        }
    }

    /// Appends `entry` to the tail of the patient's chain and returns its ID.
    ///
    /// The tail is linked to the ID the history file will assign next, then the entry
    /// is appended and the patient's head and count are updated. A chain that already
    /// holds `max_chain` entries is rejected with [`LedgerError::ChainFull`] before
    /// anything is written.
    ///
    /// Steps are not atomic. A failure after the tail was linked is returned as
    /// [`MaintenanceError::Partial`]; the dangling link shows up in
    /// [`verify_chain`](Self::verify_chain) as a broken chain.
    pub fn append(&self, patient_id: i32, mut entry: HistoryEntry) -> StorageResult<i32> {
        let mut patient = self
            .patients
            .find_by_id(patient_id)?
            .ok_or(ResourceError::NotFound {
                kind: RecordKind::Patient,
                id: patient_id,
            })?;

        entry.patient_id = patient_id;
        entry.next_entry_id = None;
        entry.validate()?;
        // Fail on oversized text before any link is written.
        entry.to_bytes()?;

        let predicted = self.history.header()?.next_id();
        let linked = match patient.first_consultation_id {
            None => {
                patient.first_consultation_id = Some(predicted);
                false
            }
            Some(head) => {
                let (mut tail, length) = self.tail_of(patient_id, head)?;
                if length >= self.max_chain {
                    return Err(LedgerError::ChainFull {
                        patient_id,
                        cap: self.max_chain,
                    }
                    .into());
                }
                tail.next_entry_id = Some(predicted);
                self.history.update(&mut tail)?;
                true
            }
        };

        let assigned = match self.history.add(entry) {
            Ok(id) => id,
            Err(e) if linked => return Err(interrupted(patient_id, 1, e)),
            Err(e) => return Err(e),
        };
        if assigned != predicted {
            let mismatch = LedgerError::IdMismatch {
                predicted,
                assigned,
            };
            return Err(interrupted(patient_id, 2, mismatch.into()));
        }

        patient.consultation_count += 1;
        if let Err(e) = self.patients.update(&mut patient) {
            return Err(interrupted(patient_id, 2, e));
        }

        debug!(
            patient_id,
            entry_id = assigned,
            consultations = patient.consultation_count,
            "History entry appended"
        );
        Ok(assigned)
    }

    /// Walks a patient's chain lazily from the head. Returns `None` for an unknown
    /// patient.
    pub fn traverse(&self, patient_id: i32) -> StorageResult<Option<Chain<'a>>> {
        Ok(self
            .patients
            .find_by_id(patient_id)?
            .map(|patient| self.chain_from(patient_id, patient.first_consultation_id)))
    }

    /// Collects the whole chain of a patient.
    pub fn entries(&self, patient_id: i32) -> StorageResult<Option<Vec<HistoryEntry>>> {
        match self.traverse(patient_id)? {
            Some(chain) => chain.collect::<StorageResult<Vec<_>>>().map(Some),
            None => Ok(None),
        }
    }

    /// Compares the reachable chain length with the stored consultation count.
    pub fn verify_chain(&self, patient_id: i32) -> StorageResult<Option<ChainAudit>> {
        let Some(patient) = self.patients.find_by_id(patient_id)? else {
            return Ok(None);
        };

        let mut length = 0;
        for entry in self.chain_from(patient_id, patient.first_consultation_id) {
            if let Err(e) = entry {
                warn!(patient_id, error = %e, "History chain check failed");
                return Err(e);
            }
            length += 1;
        }

        let audit = ChainAudit {
            patient_id,
            length,
            recorded: patient.consultation_count,
        };
        if audit.is_consistent() {
            info!(patient_id, length, "History chain verified");
        } else {
            warn!(
                patient_id,
                length,
                recorded = audit.recorded,
                "History chain length differs from the stored count"
            );
        }
        Ok(Some(audit))
    }

    /// History entries are never removed; neighbours would need relinking.
    pub fn delete(&self, entry_id: i32) -> StorageResult<()> {
        Err(LedgerError::DeletionUnsupported { id: entry_id }.into())
    }

    fn chain_from(&self, patient_id: i32, head: Option<i32>) -> Chain<'a> {
        Chain {
            history: self.history,
            patient_id,
            next: head,
            visited: 0,
            cap: self.max_chain,
            failed: false,
        }
    }

    /// Last entry of a non-empty chain and the number of entries walked.
    fn tail_of(&self, patient_id: i32, head: i32) -> StorageResult<(HistoryEntry, usize)> {
        let mut tail = None;
        let mut length = 0;
        for entry in self.chain_from(patient_id, Some(head)) {
            tail = Some(entry?);
            length += 1;
        }
        // A non-empty head always yields at least one entry or an error.
        let tail = tail.ok_or(LedgerError::BrokenChain {
            patient_id,
            missing_id: head,
        })?;
        Ok((tail, length))
    }
}

/// Steps of an append: link the tail, append the entry, update the patient.
const APPEND_STEPS: usize = 3;

fn interrupted(patient_id: i32, completed: usize, source: StorageError) -> StorageError {
    warn!(
        patient_id,
        completed,
        error = %source,
        "History append interrupted after the chain was modified"
    );
    MaintenanceError::Partial {
        operation: "append history entry",
        completed,
        total: APPEND_STEPS,
        source: Some(Box::new(source)),
    }
    .into()
}

/// Lazy walk over one patient's history chain.
///
/// Yields entries from head to tail. Fails once with [`LedgerError::BrokenChain`] when
/// a link points at a missing entry, or [`LedgerError::ChainTooLong`] when more than
/// `cap` entries would be visited.
pub struct Chain<'a> {
    history: &'a Repository<HistoryEntry>,
    patient_id: i32,
    next: Option<i32>,
    visited: usize,
    cap: usize,
    failed: bool,
}

impl Iterator for Chain<'_> {
    type Item = StorageResult<HistoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let id = self.next?;

        if self.visited >= self.cap {
            self.failed = true;
            return Some(Err(LedgerError::ChainTooLong {
                patient_id: self.patient_id,
                cap: self.cap,
            }
            .into()));
        }

        match self.history.find_by_id(id) {
            Ok(Some(entry)) => {
                self.visited += 1;
                self.next = entry.next_entry_id;
                Some(Ok(entry))
            }
            Ok(None) => {
                self.failed = true;
                Some(Err(LedgerError::BrokenChain {
                    patient_id: self.patient_id,
                    missing_id: id,
                }
                .into()))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        patients: Repository<Patient>,
        history: Repository<HistoryEntry>,
    }

    fn create_fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let patients = Repository::new(dir.path().join("patients.bin"));
        let history = Repository::new(dir.path().join("history.bin"));
        patients.file().verify().unwrap();
        history.file().verify().unwrap();
        Fixture {
            _dir: dir,
            patients,
            history,
        }
    }

    fn create_entry(diagnosis: &str) -> HistoryEntry {
        HistoryEntry::new(1, "2025-03-01", "09:00", diagnosis)
    }

    /// Test that interleaved appends keep each patient's chain separate.
    #[test]
    fn test_interleaved_chains() {
        let f = create_fixture();
        let ledger = HistoryLedger::new(&f.patients, &f.history, DEFAULT_MAX_CHAIN);
        f.patients.add(Patient::new("Ana", "Pérez", "001")).unwrap();
        f.patients.add(Patient::new("Juan", "Ríos", "002")).unwrap();

        assert_eq!(ledger.append(1, create_entry("a1")).unwrap(), 1);
        assert_eq!(ledger.append(2, create_entry("b1")).unwrap(), 2);
        assert_eq!(ledger.append(1, create_entry("a2")).unwrap(), 3);

        let ana: Vec<_> = ledger
            .entries(1)
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|e| e.diagnosis)
            .collect();
        assert_eq!(ana, vec!["a1", "a2"]);

        let juan = ledger.entries(2).unwrap().unwrap();
        assert_eq!(juan.len(), 1);
        assert_eq!(juan[0].next_entry_id, None);
    }

    /// Test that a missing link is reported as a broken chain.
    #[test]
    fn test_broken_link() {
        let f = create_fixture();
        let ledger = HistoryLedger::new(&f.patients, &f.history, DEFAULT_MAX_CHAIN);
        f.patients.add(Patient::new("Ana", "Pérez", "001")).unwrap();
        ledger.append(1, create_entry("a1")).unwrap();

        let mut entry = f.history.find_by_id(1).unwrap().unwrap();
        entry.next_entry_id = Some(40);
        f.history.update(&mut entry).unwrap();

        let err = ledger.verify_chain(1).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Ledger(LedgerError::BrokenChain { missing_id: 40, .. })
        ));
    }

    /// Test that a cycle stops at the cap.
    #[test]
    fn test_cycle_hits_cap() {
        let f = create_fixture();
        let ledger = HistoryLedger::new(&f.patients, &f.history, 5);
        f.patients.add(Patient::new("Ana", "Pérez", "001")).unwrap();
        ledger.append(1, create_entry("a1")).unwrap();

        let mut entry = f.history.find_by_id(1).unwrap().unwrap();
        entry.next_entry_id = Some(1);
        f.history.update(&mut entry).unwrap();

        let results: Vec<_> = ledger.traverse(1).unwrap().unwrap().collect();
        assert_eq!(results.len(), 6);
        assert!(matches!(
            results.last(),
            Some(Err(StorageError::Ledger(LedgerError::ChainTooLong { cap: 5, .. })))
        ));
    }

    /// Test that a full chain refuses another entry without linking it.
    #[test]
    fn test_full_chain_rejects_append() {
        let f = create_fixture();
        let ledger = HistoryLedger::new(&f.patients, &f.history, 2);
        f.patients.add(Patient::new("Ana", "Pérez", "001")).unwrap();
        ledger.append(1, create_entry("a1")).unwrap();
        ledger.append(1, create_entry("a2")).unwrap();

        assert!(matches!(
            ledger.append(1, create_entry("a3")),
            Err(StorageError::Ledger(LedgerError::ChainFull { patient_id: 1, cap: 2 }))
        ));
        assert_eq!(f.history.header().unwrap().record_count(), 2);
        assert_eq!(f.history.find_by_id(2).unwrap().unwrap().next_entry_id, None);
        let audit = ledger.verify_chain(1).unwrap().unwrap();
        assert!(audit.is_consistent());
        assert_eq!(audit.length, 2);
    }

    /// Test that a failure after linking the tail is reported as partial.
    #[test]
    fn test_append_after_link_is_partial() {
        let f = create_fixture();
        let ledger = HistoryLedger::new(&f.patients, &f.history, DEFAULT_MAX_CHAIN);
        f.patients.add(Patient::new("Ana", "Pérez", "001")).unwrap();
        ledger.append(1, create_entry("a1")).unwrap();

        // A foreign version only stops the append; slot overwrites still go through.
        let mut bytes = std::fs::read(f.history.file().path()).unwrap();
        bytes[12..16].copy_from_slice(&2i32.to_le_bytes());
        std::fs::write(f.history.file().path(), bytes).unwrap();

        match ledger.append(1, create_entry("a2")) {
            Err(StorageError::Maintenance(MaintenanceError::Partial {
                operation,
                completed,
                total,
                source,
            })) => {
                assert_eq!(operation, "append history entry");
                assert_eq!((completed, total), (1, 3));
                assert!(matches!(
                    source.as_deref(),
                    Some(StorageError::Format(crate::error::FormatError::VersionMismatch { .. }))
                ));
            }
            other => panic!("Expected Partial, got {:?}", other),
        }
        let patient = f.patients.find_by_id(1).unwrap().unwrap();
        assert_eq!(patient.consultation_count, 1);
        assert!(matches!(
            ledger.verify_chain(1),
            Err(StorageError::Ledger(LedgerError::BrokenChain { missing_id: 2, .. }))
        ));
    }

    /// Test that invalid entries leave the chain untouched.
    #[test]
    fn test_invalid_entry_does_not_link() {
        let f = create_fixture();
        let ledger = HistoryLedger::new(&f.patients, &f.history, DEFAULT_MAX_CHAIN);
        f.patients.add(Patient::new("Ana", "Pérez", "001")).unwrap();
        ledger.append(1, create_entry("a1")).unwrap();

        let too_long = create_entry(&"x".repeat(400));
        assert!(ledger.append(1, too_long).is_err());

        let tail = f.history.find_by_id(1).unwrap().unwrap();
        assert_eq!(tail.next_entry_id, None);
        let audit = ledger.verify_chain(1).unwrap().unwrap();
        assert!(audit.is_consistent());
    }

    /// Test that deletion is refused.
    #[test]
    fn test_delete_unsupported() {
        let f = create_fixture();
        let ledger = HistoryLedger::new(&f.patients, &f.history, DEFAULT_MAX_CHAIN);
        assert!(matches!(
            ledger.delete(1),
            Err(StorageError::Ledger(LedgerError::DeletionUnsupported { id: 1 }))
        ));
    }

    /// Test that unknown patients yield no chain.
    #[test]
    fn test_unknown_patient() {
        let f = create_fixture();
        let ledger = HistoryLedger::new(&f.patients, &f.history, DEFAULT_MAX_CHAIN);
        assert!(ledger.traverse(3).unwrap().is_none());
        assert!(ledger.verify_chain(3).unwrap().is_none());
        assert!(ledger.append(3, create_entry("x")).unwrap_err().is_not_found());
    }
}
