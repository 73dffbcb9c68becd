//! Validation functions for the matching algorithm
//!
//! The passes rely on sorted records for their early exits, so malformed
//! input is rejected before any patient is processed.

use crate::error::{MatchingError, Result};
use crate::models::Patient;
use crate::utils::dates;
use itertools::Itertools;

/// Validate that the population is well formed
///
/// Checks unique patient ids, birth dates inside the calendar range,
/// well-formed and disjoint cohort intervals, well-formed prescriptions and
/// ascending dates in every record sequence.
pub fn validate_population(patients: &[Patient]) -> Result<()> {
    if let Some(id) = patients.iter().map(|patient| patient.id.as_str()).duplicates().next() {
        return Err(MatchingError::validation(format!("duplicate patient id {id}")));
    }
    patients.iter().try_for_each(validate_patient)
}

fn validate_patient(patient: &Patient) -> Result<()> {
    if dates::day_to_date(patient.birth_date).is_none() {
        return Err(MatchingError::validation(format!(
            "patient {} has birth day {} outside the calendar range",
            patient.id, patient.birth_date
        )));
    }

    if let Some(cohort) = patient.cohorts.iter().find(|cohort| cohort.start >= cohort.end) {
        return Err(MatchingError::validation(format!(
            "patient {} has an empty cohort interval [{}, {})",
            patient.id, cohort.start, cohort.end
        )));
    }

    // Segments are scanned one by one and must not share a day
    let segments = patient
        .cohorts
        .iter()
        .sorted_by_key(|cohort| cohort.start)
        .tuple_windows()
        .find(|(earlier, later)| earlier.end > later.start);
    if let Some((earlier, later)) = segments {
        return Err(MatchingError::validation(format!(
            "patient {} has overlapping cohort intervals [{}, {}) and [{}, {})",
            patient.id, earlier.start, earlier.end, later.start, later.end
        )));
    }

    if let Some(prescription) = patient.prescriptions.iter().find(|p| p.end < p.start) {
        return Err(MatchingError::validation(format!(
            "patient {} has prescription {} ending before it starts",
            patient.id, prescription.atc
        )));
    }

    check_ascending(patient, "events", patient.events.iter().map(|e| e.date))?;
    check_ascending(
        patient,
        "prescriptions",
        patient.prescriptions.iter().map(|p| p.start),
    )?;
    check_ascending(
        patient,
        "measurements",
        patient.measurements.iter().map(|m| m.date),
    )
}

fn check_ascending(
    patient: &Patient,
    what: &str,
    dates: impl Iterator<Item = i32>,
) -> Result<()> {
    let mut previous = i32::MIN;
    for date in dates {
        if date < previous {
            return Err(MatchingError::validation(format!(
                "{what} of patient {} are not sorted by date",
                patient.id
            )));
        }
        previous = date;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CohortInterval, Event, Gender, Prescription};

    fn patient(id: &str) -> Patient {
        Patient::new(id, 0, Gender::Male, "PR1", CohortInterval::new(0, 100))
    }

    #[test]
    fn test_valid_population() {
        let patients = vec![
            patient("A").with_events([Event::new("MI", 50), Event::new("MI", 10)]),
            patient("B"),
        ];
        assert!(validate_population(&patients).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let patients = vec![patient("A"), patient("A")];
        assert!(matches!(
            validate_population(&patients),
            Err(MatchingError::Validation(_))
        ));
    }

    #[test]
    fn test_unsorted_events() {
        let mut unsorted = patient("A");
        unsorted.events = vec![Event::new("MI", 50), Event::new("MI", 10)];
        assert!(validate_population(&[unsorted]).is_err());
    }

    #[test]
    fn test_bad_intervals() {
        let mut empty_cohort = patient("A");
        empty_cohort.cohorts.push(CohortInterval::new(200, 200));
        assert!(validate_population(&[empty_cohort]).is_err());

        let mut backwards = patient("B");
        let mut prescription = Prescription::new("N02BE01", 50, 10);
        prescription.end = 40;
        backwards.prescriptions.push(prescription);
        assert!(validate_population(&[backwards]).is_err());
    }

    #[test]
    fn test_overlapping_cohort_segments() {
        let overlapping = Patient::new("A", 0, Gender::Male, "PR1", CohortInterval::new(500, 1500))
            .with_cohort(CohortInterval::new(0, 1000));
        assert!(matches!(
            validate_population(&[overlapping]),
            Err(MatchingError::Validation(message)) if message.contains("overlapping")
        ));

        let adjacent = Patient::new("B", 0, Gender::Male, "PR1", CohortInterval::new(1000, 1500))
            .with_cohort(CohortInterval::new(0, 1000));
        assert!(validate_population(&[adjacent]).is_ok());
    }

    #[test]
    fn test_birth_date_outside_calendar() {
        let unborn = Patient::new("A", i32::MAX, Gender::Male, "PR1", CohortInterval::new(0, 100));
        assert!(matches!(
            validate_population(&[unborn]),
            Err(MatchingError::Validation(_))
        ));
    }
}
