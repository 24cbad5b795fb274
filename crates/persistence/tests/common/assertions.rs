//! Assertion helpers for store errors.

use medrec_persistence::error::{
    CapacityError, LedgerError, MaintenanceError, ResourceError, StorageError, ValidationError,
};

/// Asserts that a result is an error whose debug form contains `expected_variant`.
pub fn assert_storage_error<T>(result: Result<T, StorageError>, expected_variant: &str) {
    match result {
        Ok(_) => panic!("Expected error '{}', but got Ok", expected_variant),
        Err(e) => {
            let error_string = format!("{:?}", e);
            assert!(
                error_string.contains(expected_variant),
                "Expected error containing '{}', got {:?}",
                expected_variant,
                e
            );
        }
    }
}

/// Asserts that a result is a ResourceError::NotFound.
pub fn assert_not_found<T>(result: Result<T, StorageError>) {
    match result {
        Ok(_) => panic!("Expected NotFound error, but got Ok"),
        Err(StorageError::Resource(ResourceError::NotFound { .. })) => {}
        Err(e) => panic!("Expected NotFound error, got {:?}", e),
    }
}

/// Asserts that a result is a ResourceError::InvalidState.
pub fn assert_invalid_state<T>(result: Result<T, StorageError>) {
    match result {
        Ok(_) => panic!("Expected InvalidState error, but got Ok"),
        Err(StorageError::Resource(ResourceError::InvalidState { .. })) => {}
        Err(e) => panic!("Expected InvalidState error, got {:?}", e),
    }
}

/// Asserts that a result is a ValidationError::MissingReference.
pub fn assert_missing_reference<T>(result: Result<T, StorageError>) {
    match result {
        Ok(_) => panic!("Expected MissingReference error, but got Ok"),
        Err(StorageError::Validation(ValidationError::MissingReference { .. })) => {}
        Err(e) => panic!("Expected MissingReference error, got {:?}", e),
    }
}

/// Asserts that a result is a CapacityError::ListFull.
pub fn assert_list_full<T>(result: Result<T, StorageError>) {
    match result {
        Ok(_) => panic!("Expected ListFull error, but got Ok"),
        Err(StorageError::Capacity(CapacityError::ListFull { .. })) => {}
        Err(e) => panic!("Expected ListFull error, got {:?}", e),
    }
}

/// Asserts that a result is a LedgerError::DeletionUnsupported.
pub fn assert_deletion_unsupported<T>(result: Result<T, StorageError>) {
    match result {
        Ok(_) => panic!("Expected DeletionUnsupported error, but got Ok"),
        Err(StorageError::Ledger(LedgerError::DeletionUnsupported { .. })) => {}
        Err(e) => panic!("Expected DeletionUnsupported error, got {:?}", e),
    }
}

/// Asserts that a result is a MaintenanceError::Partial with `completed` steps.
pub fn assert_partial<T>(result: Result<T, StorageError>, completed: usize) {
    match result {
        Ok(_) => panic!("Expected Partial error, but got Ok"),
        Err(StorageError::Maintenance(MaintenanceError::Partial { completed: c, .. })) => {
            assert_eq!(c, completed, "Partial step count mismatch");
        }
        Err(e) => panic!("Expected Partial error, got {:?}", e),
    }
}

/// Assertion macro for checking errors.
#[macro_export]
macro_rules! assert_error {
    ($result:expr, not_found) => {
        $crate::common::assertions::assert_not_found($result);
    };
    ($result:expr, invalid_state) => {
        $crate::common::assertions::assert_invalid_state($result);
    };
    ($result:expr, missing_reference) => {
        $crate::common::assertions::assert_missing_reference($result);
    };
    ($result:expr, list_full) => {
        $crate::common::assertions::assert_list_full($result);
    };
    ($result:expr, deletion_unsupported) => {
        $crate::common::assertions::assert_deletion_unsupported($result);
    };
    ($result:expr, partial: $completed:expr) => {
        $crate::common::assertions::assert_partial($result, $completed);
    };
}
