//! Control matching
//!
//! Evaluates one candidate against one case pattern. The predicates run in a
//! fixed order and stop at the first failure; later predicates rely on earlier
//! ones, e.g. the candidate's cohort segment is only known after the cohort
//! containment check.

use crate::algorithm::matching::adapter::PredicateAdapter;
use crate::algorithm::matching::criteria::MatchingConfig;
use crate::algorithm::matching::types::{
    CasePattern, ControlValues, EventCounts, MatchOutcome, Rejection,
};
use crate::algorithm::matching::window;
use crate::models::{CohortInterval, Patient};

/// Matches candidate controls against case patterns
#[derive(Debug, Clone, Copy)]
pub struct ControlMatcher<'a> {
    config: &'a MatchingConfig,
    adapter: PredicateAdapter<'a>,
}

impl<'a> ControlMatcher<'a> {
    /// Create a matcher over a validated configuration
    #[must_use]
    pub const fn new(config: &'a MatchingConfig, adapter: PredicateAdapter<'a>) -> Self {
        Self { config, adapter }
    }

    /// Run the full predicate chain for one candidate
    #[must_use]
    pub fn try_match(&self, pattern: &CasePattern, candidate: &Patient) -> MatchOutcome {
        match self.evaluate(pattern, candidate) {
            Ok(values) => MatchOutcome::Accepted(values),
            Err(rejection) => MatchOutcome::Rejected(rejection),
        }
    }

    fn evaluate(
        &self,
        pattern: &CasePattern,
        candidate: &Patient,
    ) -> Result<ControlValues, Rejection> {
        let config = self.config;
        let index_date = pattern.index_date();

        if candidate.id == pattern.patient_id {
            return Err(Rejection::SamePatient);
        }

        if config.match_on_practice && candidate.practice_id != pattern.practice_id {
            return Err(Rejection::Practice);
        }

        if !config.birth_date.matches(
            pattern.birth_date,
            pattern.birth_year_month,
            candidate.birth_date,
            candidate.birth_year_month(),
        ) {
            return Err(Rejection::BirthDate);
        }

        if config.match_on_gender && candidate.gender != pattern.gender {
            return Err(Rejection::Gender);
        }

        let cohort = candidate
            .cohort_containing(index_date)
            .ok_or(Rejection::OutsideCohort)?;

        if let Some(prefix) = config.case_set_prefix.as_deref() {
            if candidate.external_case_set_id(prefix) != pattern.case_set_id.as_deref() {
                return Err(Rejection::CaseSetId);
            }
        }

        if let Some(cohort_time) = config.cohort_time {
            if !cohort_time.matches(pattern.cohort, cohort) {
                return Err(Rejection::CohortTime);
            }
        }

        if had_prior_event(candidate, pattern.event_type(), index_date, cohort) {
            return Err(Rejection::PriorEvent);
        }

        let drug_count = match (&config.drug_count, pattern.drug_count) {
            (Some(matching), Some(case_count)) => {
                let control_count = window::drug_count(candidate, index_date, matching);
                if control_count != case_count {
                    return Err(Rejection::DrugCount);
                }
                Some(control_count)
            }
            _ => None,
        };

        if let (Some(matching), Some(case_classes)) = (&config.atc_classes, &pattern.atc_classes) {
            let control_classes = window::atc_classes(candidate, index_date, matching);
            if !window::same_classes(case_classes, &control_classes) {
                return Err(Rejection::AtcClasses);
            }
        }

        let mut event_counts = EventCounts::with_capacity(config.event_count_rules.len());
        for (position, rule) in config.event_count_rules.iter().enumerate() {
            let control_count = window::event_count(candidate, index_date, cohort, rule);
            let case_count = pattern.event_counts.get(position).copied().unwrap_or(0);
            if rule.check_bounds(control_count).is_err()
                || !rule.counts_match(case_count, control_count)
            {
                return Err(Rejection::EventCount(position));
            }
            event_counts.push(control_count);
        }

        if let Some(reason) = self.adapter.control_exclusion(candidate, index_date, cohort) {
            return Err(Rejection::Excluded(reason));
        }

        Ok(ControlValues {
            cohort,
            drug_count,
            event_counts,
        })
    }
}

/// Whether the candidate had an event of `event_type` inside its cohort
/// segment before the index date
///
/// The scan stops at the first event on or after the index date.
fn had_prior_event(candidate: &Patient, event_type: &str, index_date: i32, cohort: CohortInterval) -> bool {
    candidate
        .events
        .iter()
        .take_while(|event| event.date < index_date)
        .any(|event| event.date >= cohort.start && event.event_type == event_type)
}
