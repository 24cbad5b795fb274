//! History chain integration tests.

mod common;

use medrec_persistence::core::Repository;
use medrec_persistence::error::{LedgerError, StorageError};
use medrec_persistence::{HistoryEntry, Patient, RecordKind, StoreConfig};

use common::*;

fn record_chain(ctx: &TestStore, patient_id: i32, doctor_id: i32, diagnoses: &[&str]) -> Vec<i32> {
    diagnoses
        .iter()
        .map(|d| {
            ctx.store
                .record_consultation(patient_id, create_entry(doctor_id, d))
                .unwrap()
        })
        .collect()
}

/// Test that chains of different patients interleave in one file without mixing.
#[test]
fn test_interleaved_patients() {
    let ctx = TestStore::new();
    let (ana, doctor_id) = ctx.seed_pair();
    let bea = ctx.store.add_patient(create_patient("Bea", "002")).unwrap();

    record_chain(&ctx, ana, doctor_id, &["Flu"]);
    record_chain(&ctx, bea, doctor_id, &["Migraine"]);
    record_chain(&ctx, ana, doctor_id, &["Sprain"]);

    let ana_ids: Vec<i32> = ctx
        .store
        .history(ana)
        .unwrap()
        .unwrap()
        .iter()
        .map(|e| e.meta.id)
        .collect();
    assert_eq!(ana_ids, vec![1, 3]);

    let bea_history = ctx.store.history(bea).unwrap().unwrap();
    assert_eq!(bea_history.len(), 1);
    assert_eq!(bea_history[0].diagnosis, "Migraine");
    assert_eq!(bea_history[0].next_entry_id, None);
}

/// Test that the chain walk is lazy and can stop early.
#[test]
fn test_traverse_is_lazy() {
    let ctx = TestStore::new();
    let (patient_id, doctor_id) = ctx.seed_pair();
    record_chain(&ctx, patient_id, doctor_id, &["Flu", "Sprain", "Checkup"]);

    let ledger = ctx.store.ledger();
    let first = ledger
        .traverse(patient_id)
        .unwrap()
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(first.diagnosis, "Flu");
    assert!(ledger.traverse(99).unwrap().is_none());
}

/// Test that a chain at the configured cap refuses further consultations.
#[test]
fn test_chain_cap() {
    let ctx = TestStore::with_config(|config| StoreConfig {
        max_chain: 2,
        ..config
    });
    let (patient_id, doctor_id) = ctx.seed_pair();
    record_chain(&ctx, patient_id, doctor_id, &["Flu", "Sprain"]);

    match ctx
        .store
        .record_consultation(patient_id, create_entry(doctor_id, "Checkup"))
    {
        Err(StorageError::Ledger(LedgerError::ChainFull { patient_id: p, cap })) => {
            assert_eq!((p, cap), (patient_id, 2));
        }
        other => panic!("Expected ChainFull, got {:?}", other),
    }

    // The chain stays readable and nothing was appended.
    let history = ctx.store.history(patient_id).unwrap().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].next_entry_id, None);
    assert!(ctx.store.find_history_entry(3).unwrap().is_none());
    let audit = ctx.store.verify_chain(patient_id).unwrap().unwrap();
    assert!(audit.is_consistent());
    assert_eq!(ctx.store.hospital().next_history_id, 3);
}

/// Test that a link to a missing entry is reported as a broken chain.
#[test]
fn test_broken_chain_detected() {
    let ctx = TestStore::new();
    let (patient_id, doctor_id) = ctx.seed_pair();
    record_chain(&ctx, patient_id, doctor_id, &["Flu", "Sprain", "Checkup"]);

    let history: Repository<HistoryEntry> =
        Repository::new(ctx.entity_path(RecordKind::HistoryEntry));
    history.soft_delete(2).unwrap();

    match ctx.store.history(patient_id) {
        Err(StorageError::Ledger(LedgerError::BrokenChain { missing_id, .. })) => {
            assert_eq!(missing_id, 2);
        }
        other => panic!("Expected BrokenChain, got {:?}", other),
    }
    assert_storage_error(ctx.store.verify_chain(patient_id), "BrokenChain");
}

/// Test that a count that disagrees with the chain is reported, not raised.
#[test]
fn test_count_mismatch_reported() {
    let ctx = TestStore::new();
    let (patient_id, doctor_id) = ctx.seed_pair();
    record_chain(&ctx, patient_id, doctor_id, &["Flu", "Sprain"]);

    let patients: Repository<Patient> =
        Repository::new(ctx.entity_path(RecordKind::Patient));
    let mut patient = patients.find_by_id(patient_id).unwrap().unwrap();
    patient.consultation_count = 5;
    patients.update(&mut patient).unwrap();

    let audit = ctx.store.verify_chain(patient_id).unwrap().unwrap();
    assert!(!audit.is_consistent());
    assert_eq!(audit.length, 2);
    assert_eq!(audit.recorded, 5);
}

/// Test that an entry with a bad date leaves the chain untouched.
#[test]
fn test_invalid_entry_not_linked() {
    let ctx = TestStore::new();
    let (patient_id, doctor_id) = ctx.seed_pair();
    record_chain(&ctx, patient_id, doctor_id, &["Flu"]);

    let mut entry = create_entry(doctor_id, "Sprain");
    entry.date = "01/03/2025".to_string();
    assert_storage_error(ctx.store.record_consultation(patient_id, entry), "InvalidDate");

    let history = ctx.store.history(patient_id).unwrap().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].next_entry_id, None);
    assert!(ctx.store.verify_chain(patient_id).unwrap().unwrap().is_consistent());
}
