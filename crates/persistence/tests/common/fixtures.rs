//! Test fixtures for persistence layer testing.
//!
//! Builders for candidate records with realistic field values.

use medrec_persistence::{Appointment, Doctor, HistoryEntry, Patient};

/// A patient with the given first name and national ID.
pub fn create_patient(first_name: &str, national_id: &str) -> Patient {
    let mut patient = Patient::new(first_name, "Pérez", national_id);
    patient.age = 34;
    patient.sex = 'F';
    patient.blood_type = "O+".to_string();
    patient.phone = "555-0101".to_string();
    patient.email = format!("{}@example.com", first_name.to_lowercase());
    patient
}

/// A doctor with the given first name, license and specialty.
pub fn create_doctor(first_name: &str, license: &str, specialty: &str) -> Doctor {
    let mut doctor = Doctor::new(first_name, "Mora", license, specialty);
    doctor.years_experience = 12;
    doctor.consultation_fee = 80.0;
    doctor.office_hours = "08:00-14:00".to_string();
    doctor
}

/// A morning appointment on 2025-03-01 at `time`.
pub fn create_appointment(patient_id: i32, doctor_id: i32, time: &str) -> Appointment {
    Appointment::new(patient_id, doctor_id, "2025-03-01", time, "Control")
}

/// A consultation entry with the given diagnosis.
pub fn create_entry(doctor_id: i32, diagnosis: &str) -> HistoryEntry {
    let mut entry = HistoryEntry::new(doctor_id, "2025-03-01", "09:30", diagnosis);
    entry.treatment = "Rest".to_string();
    entry.medications = "Paracetamol".to_string();
    entry.cost = 45.5;
    entry
}

/// `count` appointment times on the half hour starting at 08:00.
pub fn appointment_times(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{:02}:{:02}", 8 + i / 2, (i % 2) * 30))
        .collect()
}
