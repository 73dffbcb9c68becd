//! Shared fixtures for integration tests
#![allow(dead_code)]

use case_control::algorithm::matching::{MatchRecord, MatchingConfig, MatchingResult};
use case_control::{CohortInterval, CovariateSet, CriteriaSet, Event, Gender, Matcher, Patient, VecSink};

/// Birth day shared by default fixtures (1940-01-01)
pub const BIRTH: i32 = -10958;

/// A patient in practice PR1 with cohort `[0, 1000)` and no records
#[must_use]
pub fn patient(id: &str) -> Patient {
    Patient::new(id, BIRTH, Gender::Female, "PR1", CohortInterval::new(0, 1000))
}

/// A patient with a single event
#[must_use]
pub fn with_event(id: &str, event_type: &str, day: i32) -> Patient {
    patient(id).with_events([Event::new(event_type, day)])
}

/// Run the engine without exclusion criteria or covariates
pub fn run(config: MatchingConfig, patients: &[Patient]) -> (MatchingResult, Vec<MatchRecord>) {
    run_with(config, &CriteriaSet::default(), &CovariateSet::default(), patients)
}

/// Run the engine with collaborators
pub fn run_with(
    config: MatchingConfig,
    exclusion: &CriteriaSet,
    covariates: &CovariateSet,
    patients: &[Patient],
) -> (MatchingResult, Vec<MatchRecord>) {
    let matcher = Matcher::new(config, exclusion, covariates);
    let mut sink = VecSink::default();
    let result = matcher.perform_matching(patients, &mut sink).unwrap();
    (result, sink.into_records())
}

/// Patient ids of the controls of one case set, in emission order
#[must_use]
pub fn controls_of(records: &[MatchRecord], case_set_id: u64) -> Vec<&str> {
    records
        .iter()
        .filter(|record| !record.is_case && record.case_set_id == case_set_id)
        .map(|record| record.patient_id.as_str())
        .collect()
}

/// The case record of a case set
#[must_use]
pub fn case_of(records: &[MatchRecord], case_set_id: u64) -> Option<&MatchRecord> {
    records
        .iter()
        .find(|record| record.is_case && record.case_set_id == case_set_id)
}
