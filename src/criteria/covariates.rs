//! Covariates written next to case and control records

use crate::algorithm::matching::criteria::EventWindow;
use crate::algorithm::matching::window;
use crate::common::traits::CovariateProvider;
use crate::models::types::code_matches;
use crate::models::{CohortInterval, Patient};
use crate::utils::dates;

/// Ordered collection of covariates
#[derive(Debug, Default)]
pub struct CovariateSet {
    covariates: Vec<Box<dyn CovariateProvider>>,
}

impl CovariateSet {
    /// Append a covariate
    #[must_use]
    pub fn with(mut self, covariate: impl CovariateProvider + 'static) -> Self {
        self.covariates.push(Box::new(covariate));
        self
    }

    /// Append an already boxed covariate
    pub fn push(&mut self, covariate: Box<dyn CovariateProvider>) {
        self.covariates.push(covariate);
    }

    /// Number of covariates
    #[must_use]
    pub fn len(&self) -> usize {
        self.covariates.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.covariates.is_empty()
    }
}

impl CovariateProvider for CovariateSet {
    fn labels(&self) -> Vec<String> {
        self.covariates.iter().flat_map(|covariate| covariate.labels()).collect()
    }

    fn values(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> Vec<String> {
        self.covariates
            .iter()
            .flat_map(|covariate| covariate.values(patient, index_date, cohort))
            .collect()
    }
}

/// Number of matching events inside a window around the index date
#[derive(Debug, Clone)]
pub struct EventCountCovariate {
    label: String,
    event_types: Vec<String>,
    window: EventWindow,
}

impl EventCountCovariate {
    /// Create a covariate; event types may end with `*` to match a prefix
    #[must_use]
    pub fn new(label: impl Into<String>, event_types: Vec<String>, window: EventWindow) -> Self {
        Self {
            label: label.into(),
            event_types,
            window,
        }
    }
}

impl CovariateProvider for EventCountCovariate {
    fn labels(&self) -> Vec<String> {
        vec![self.label.clone()]
    }

    fn values(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> Vec<String> {
        let count =
            window::count_events(&patient.events, &self.event_types, &self.window, index_date, cohort);
        vec![count.to_string()]
    }
}

/// Most recent measurement of a type on or before the index date
///
/// Measurements older than `lookback_days` before the index date are ignored.
/// The value is empty when no measurement qualifies.
#[derive(Debug, Clone)]
pub struct MeasurementCovariate {
    label: String,
    measurement_type: String,
    lookback_days: Option<u32>,
}

impl MeasurementCovariate {
    /// Create a covariate without a lookback limit
    #[must_use]
    pub fn new(label: impl Into<String>, measurement_type: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            measurement_type: measurement_type.into(),
            lookback_days: None,
        }
    }

    /// Only consider measurements at most `days` before the index date
    #[must_use]
    pub const fn with_lookback(mut self, days: u32) -> Self {
        self.lookback_days = Some(days);
        self
    }
}

impl CovariateProvider for MeasurementCovariate {
    fn labels(&self) -> Vec<String> {
        vec![self.label.clone()]
    }

    fn values(&self, patient: &Patient, index_date: i32, _cohort: CohortInterval) -> Vec<String> {
        let earliest = self
            .lookback_days
            .map_or(i64::MIN, |days| i64::from(index_date) - i64::from(days));

        let latest = patient
            .measurements
            .iter()
            .take_while(|measurement| measurement.date <= index_date)
            .filter(|measurement| i64::from(measurement.date) >= earliest)
            .filter(|measurement| code_matches(&self.measurement_type, &measurement.measurement_type))
            .last();

        vec![latest.map(|measurement| measurement.value.clone()).unwrap_or_default()]
    }
}

/// Age in whole years at the index date
#[derive(Debug, Clone)]
pub struct AgeCovariate {
    label: String,
}

impl AgeCovariate {
    /// Create an age covariate with the given column label
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl Default for AgeCovariate {
    fn default() -> Self {
        Self::new("age")
    }
}

impl CovariateProvider for AgeCovariate {
    fn labels(&self) -> Vec<String> {
        vec![self.label.clone()]
    }

    fn values(&self, patient: &Patient, index_date: i32, _cohort: CohortInterval) -> Vec<String> {
        vec![
            dates::age_in_years(patient.birth_date, index_date)
                .map(|age| age.to_string())
                .unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::matching::criteria::{WindowEnd, WindowStart};
    use crate::models::{Event, Gender, Measurement};
    use chrono::NaiveDate;

    fn day(year: i32, month: u32, day: u32) -> i32 {
        dates::date_to_day(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }

    fn patient() -> Patient {
        Patient::new("P1", day(1950, 6, 15), Gender::Female, "PR1", CohortInterval::new(0, 20000))
            .with_events([Event::new("GP", 100), Event::new("GP", 200), Event::new("GP", 300)])
            .with_measurements([
                Measurement::new("BMI", 100, "24.1"),
                Measurement::new("SBP", 150, "130"),
                Measurement::new("BMI", 250, "25.3"),
                Measurement::new("BMI", 400, "26.0"),
            ])
    }

    #[test]
    fn test_event_count_covariate() {
        let visits = EventCountCovariate::new(
            "gp_visits",
            vec!["GP".to_string()],
            EventWindow::new(WindowStart::Offset(-150), WindowEnd::Index),
        );
        let cohort = CohortInterval::new(0, 20000);
        assert_eq!(visits.values(&patient(), 300, cohort), vec!["1"]);
        assert_eq!(visits.values(&patient(), 301, cohort), vec!["2"]);
    }

    #[test]
    fn test_latest_measurement_within_lookback() {
        let cohort = CohortInterval::new(0, 20000);
        let bmi = MeasurementCovariate::new("bmi", "BMI");
        assert_eq!(bmi.values(&patient(), 300, cohort), vec!["25.3"]);
        assert_eq!(bmi.values(&patient(), 400, cohort), vec!["26.0"]);
        assert_eq!(bmi.values(&patient(), 50, cohort), vec![""]);

        let recent = MeasurementCovariate::new("bmi", "BMI").with_lookback(30);
        assert_eq!(recent.values(&patient(), 300, cohort), vec![""]);
        assert_eq!(recent.values(&patient(), 270, cohort), vec!["25.3"]);
    }

    #[test]
    fn test_age_and_set() {
        let set = CovariateSet::default()
            .with(AgeCovariate::default())
            .with(MeasurementCovariate::new("sbp", "SBP"));
        let cohort = CohortInterval::new(0, 20000);

        assert_eq!(set.labels(), vec!["age", "sbp"]);
        assert_eq!(set.values(&patient(), day(2000, 6, 14), cohort), vec!["49", "130"]);
        assert_eq!(set.values(&patient(), day(2000, 6, 15), cohort), vec!["50", "130"]);
        assert_eq!(set.len(), 2);
    }
}
