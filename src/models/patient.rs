//! Patient entity model
//!
//! A patient is immutable for the duration of a matching run; the engine only
//! borrows it.

use crate::models::clinical::{Event, Measurement, Prescription};
use crate::models::types::{CohortInterval, Gender};
use crate::utils::dates;
use serde::{Deserialize, Serialize};

/// A patient with demographics, cohort membership and dated clinical records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    /// Patient identifier
    pub id: String,
    /// Birth day number
    pub birth_date: i32,
    /// Gender
    pub gender: Gender,
    /// Practice identifier
    pub practice_id: String,
    /// Cohort intervals; empty when cohort membership is unknown
    #[serde(default)]
    pub cohorts: Vec<CohortInterval>,
    /// Events in ascending date order
    #[serde(default)]
    pub events: Vec<Event>,
    /// Prescriptions in ascending start date order
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    /// Measurements in ascending date order
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

impl Patient {
    /// Create a patient with a single cohort interval and no records
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        birth_date: i32,
        gender: Gender,
        practice_id: impl Into<String>,
        cohort: CohortInterval,
    ) -> Self {
        Self {
            id: id.into(),
            birth_date,
            gender,
            practice_id: practice_id.into(),
            cohorts: vec![cohort],
            events: Vec::new(),
            prescriptions: Vec::new(),
            measurements: Vec::new(),
        }
    }

    /// Add events, keeping them sorted by date
    #[must_use]
    pub fn with_events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self.events.sort_by_key(|event| event.date);
        self
    }

    /// Add prescriptions, keeping them sorted by start date
    #[must_use]
    pub fn with_prescriptions(mut self, prescriptions: impl IntoIterator<Item = Prescription>) -> Self {
        self.prescriptions.extend(prescriptions);
        self.prescriptions.sort_by_key(|prescription| prescription.start);
        self
    }

    /// Add measurements, keeping them sorted by date
    #[must_use]
    pub fn with_measurements(mut self, measurements: impl IntoIterator<Item = Measurement>) -> Self {
        self.measurements.extend(measurements);
        self.measurements.sort_by_key(|measurement| measurement.date);
        self
    }

    /// Add another cohort segment
    #[must_use]
    pub fn with_cohort(mut self, cohort: CohortInterval) -> Self {
        self.cohorts.push(cohort);
        self
    }

    /// Calendar year and month of birth
    #[must_use]
    pub fn birth_year_month(&self) -> Option<(i32, u32)> {
        dates::year_month(self.birth_date)
    }

    /// First cohort segment containing `day`
    #[must_use]
    pub fn cohort_containing(&self, day: i32) -> Option<CohortInterval> {
        self.cohorts.iter().copied().find(|cohort| cohort.contains(day))
    }

    /// Suffix of the first event type starting with `prefix`
    #[must_use]
    pub fn external_case_set_id(&self, prefix: &str) -> Option<&str> {
        self.events
            .iter()
            .find_map(|event| event.event_type.strip_prefix(prefix))
    }
}
