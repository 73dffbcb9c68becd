//! Population loading and record batch writing

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Instant;

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::models::Patient;
use crate::utils::logging::{log_read_complete, log_read_start};

/// Read a JSON array of patients
///
/// Records of each patient are sorted by date after loading, so input files
/// need not be ordered.
pub fn load_population(path: &Path) -> Result<Vec<Patient>> {
    let start = Instant::now();
    log_read_start("population", path);

    let reader = BufReader::new(File::open(path)?);
    let mut patients: Vec<Patient> = serde_json::from_reader(reader)?;
    for patient in &mut patients {
        sort_records(patient);
    }

    log_read_complete("patients", path, patients.len(), start.elapsed());
    Ok(patients)
}

/// Sort a patient's events, prescriptions and measurements by date
pub fn sort_records(patient: &mut Patient) {
    patient.events.sort_by_key(|event| event.date);
    patient.prescriptions.sort_by_key(|prescription| prescription.start);
    patient.measurements.sort_by_key(|measurement| measurement.date);
}

/// Write a record batch as CSV with a header row
///
/// `Date32` columns are written as ISO dates.
pub fn write_csv<W: Write>(batch: &RecordBatch, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().with_header(true).build(writer);
    writer.write(batch)?;
    Ok(())
}
