//! Case identification
//!
//! Scans a patient's events once per cohort segment, decides which events
//! qualify as cases and materializes a [`CasePattern`] for each accepted one.

use crate::algorithm::matching::adapter::PredicateAdapter;
use crate::algorithm::matching::attrition::AttritionReport;
use crate::algorithm::matching::criteria::MatchingConfig;
use crate::algorithm::matching::registry::CaseSetRegistry;
use crate::algorithm::matching::types::{CaseId, CasePattern, EventCounts, MatchRecord};
use crate::algorithm::matching::window;
use crate::common::traits::RecordSink;
use crate::error::Result;
use crate::models::types::any_code_matches;
use crate::models::{CohortInterval, Event, Patient};
use log::debug;
use rustc_hash::FxHashSet;

/// Finds cases and registers their patterns
#[derive(Debug)]
pub struct CaseIdentifier<'a> {
    config: &'a MatchingConfig,
    adapter: PredicateAdapter<'a>,
    next_id: CaseId,
}

impl<'a> CaseIdentifier<'a> {
    /// Create an identifier whose first allocated id is 1
    #[must_use]
    pub const fn new(config: &'a MatchingConfig, adapter: PredicateAdapter<'a>) -> Self {
        Self {
            config,
            adapter,
            next_id: 1,
        }
    }

    /// The id the next accepted candidate will receive
    #[must_use]
    pub const fn next_id(&self) -> CaseId {
        self.next_id
    }

    /// Identify, register and emit every case of one patient
    ///
    /// # Arguments
    ///
    /// * `patient` - The patient to scan
    /// * `registry` - Receives each accepted pattern
    /// * `attrition` - Rejection and exclusion counters
    /// * `sink` - Receives one case record per accepted pattern
    ///
    /// # Returns
    ///
    /// Ids of the registered patterns, in event order
    pub fn identify_cases(
        &mut self,
        patient: &Patient,
        registry: &mut CaseSetRegistry,
        attrition: &mut AttritionReport,
        sink: &mut dyn RecordSink,
    ) -> Result<Vec<CaseId>> {
        attrition.patients_screened += 1;
        if patient.cohorts.is_empty() {
            attrition.patients_without_cohort += 1;
            return Ok(Vec::new());
        }

        let mut accepted = Vec::new();
        for &cohort in &patient.cohorts {
            let mut seen: FxHashSet<&str> = FxHashSet::default();
            for event in &patient.events {
                if !self.is_of_interest(&event.event_type) || !cohort.contains(event.date) {
                    continue;
                }
                if self.config.first_event_only && !seen.insert(event.event_type.as_str()) {
                    continue;
                }
                if let Some(id) =
                    self.evaluate_candidate(patient, event, cohort, registry, attrition, sink)?
                {
                    accepted.push(id);
                }
            }
        }

        if accepted.is_empty() {
            attrition.patients_without_case += 1;
        }
        Ok(accepted)
    }

    /// Build the fingerprint of a case event
    ///
    /// Only the configured fingerprints are computed; `event_counts` are the
    /// rule counts already evaluated for the candidate.
    #[must_use]
    pub fn fingerprint(
        &self,
        id: CaseId,
        patient: &Patient,
        event: &Event,
        cohort: CohortInterval,
        event_counts: EventCounts,
    ) -> CasePattern {
        let mut pattern = CasePattern::new(id, patient, event.clone(), cohort);
        pattern.drug_count = self
            .config
            .drug_count
            .as_ref()
            .map(|matching| window::drug_count(patient, event.date, matching));
        pattern.atc_classes = self
            .config
            .atc_classes
            .as_ref()
            .map(|matching| window::atc_classes(patient, event.date, matching));
        pattern.case_set_id = self
            .config
            .case_set_prefix
            .as_deref()
            .and_then(|prefix| patient.external_case_set_id(prefix))
            .map(str::to_string);
        pattern.event_counts = event_counts;
        pattern
    }

    fn is_of_interest(&self, event_type: &str) -> bool {
        self.config.event_types.is_empty() || any_code_matches(&self.config.event_types, event_type)
    }

    fn evaluate_candidate(
        &mut self,
        patient: &Patient,
        event: &Event,
        cohort: CohortInterval,
        registry: &mut CaseSetRegistry,
        attrition: &mut AttritionReport,
        sink: &mut dyn RecordSink,
    ) -> Result<Option<CaseId>> {
        let mut counts = EventCounts::with_capacity(self.config.event_count_rules.len());
        for rule in &self.config.event_count_rules {
            let count = window::event_count(patient, event.date, cohort, rule);
            if let Err(violation) = rule.check_bounds(count) {
                let reason = rule.rejection_reason(violation);
                debug!(
                    "Rejected {} on day {} for patient {}: {reason}",
                    event.event_type, event.date, patient.id
                );
                attrition.case_rejections.add(&reason);
                return Ok(None);
            }
            counts.push(count);
        }

        // Ids are not rolled back when the exclusion criteria discard the case
        let id = self.next_id;
        self.next_id += 1;
        let pattern = self.fingerprint(id, patient, event, cohort, counts);

        if let Some(reason) = self.adapter.case_exclusion(patient, event.date, cohort) {
            debug!("Excluded case {id} for patient {}: {reason}", patient.id);
            attrition.case_exclusions.add(&reason);
            return Ok(None);
        }

        let values = self.adapter.output_values(patient, event.date, cohort);
        let record = MatchRecord::for_case(&pattern, values);
        registry.register(pattern)?;
        attrition.record_case(&event.event_type);
        sink.emit(record)?;
        Ok(Some(id))
    }
}
