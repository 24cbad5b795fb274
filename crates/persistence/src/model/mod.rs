//! Hospital entity records and their fixed-width layouts.
//!
//! - [`Patient`] - identity and medical data, appointment list, history head
//! - [`Doctor`] - identity and specialty, patient and appointment lists
//! - [`Appointment`] - patient/doctor pairing at a date and time
//! - [`HistoryEntry`] - one node of a patient's on-disk history chain
//! - [`Hospital`] - the header-less aggregate snapshot

pub mod appointment;
pub mod doctor;
pub mod history;
pub mod hospital;
pub mod patient;

use chrono::{NaiveDate, NaiveTime};

pub use appointment::{Appointment, AppointmentStatus};
pub use doctor::Doctor;
pub use history::HistoryEntry;
pub use hospital::Hospital;
pub use patient::Patient;

use crate::error::{StorageResult, ValidationError};

/// Width of a `YYYY-MM-DD` field including its terminator.
pub const DATE_WIDTH: usize = 11;
/// Width of a `HH:MM` field including its terminator.
pub const TIME_WIDTH: usize = 6;

/// Checks that `value` is a real calendar date written as `YYYY-MM-DD`.
pub fn validate_date(field: &'static str, value: &str) -> StorageResult<()> {
    let valid = value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    if !valid {
        return Err(ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Checks that `value` is a time of day written as `HH:MM`.
pub fn validate_time(field: &'static str, value: &str) -> StorageResult<()> {
    let valid = value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok();
    if !valid {
        return Err(ValidationError::InvalidTime {
            field,
            value: value.to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_date() {
        assert!(validate_date("date", "2024-02-29").is_ok());
        assert!(validate_date("date", "2023-02-29").is_err());
        assert!(validate_date("date", "2024-2-9").is_err());
        assert!(validate_date("date", "").is_err());
    }

    #[test]
    fn test_validate_time() {
        assert!(validate_time("time", "00:00").is_ok());
        assert!(validate_time("time", "23:59").is_ok());
        assert!(validate_time("time", "24:00").is_err());
        assert!(validate_time("time", "9:30").is_err());
    }
}
