//! The two matching passes
//!
//! Pass 1 identifies cases across the whole population before pass 2 looks
//! for a single control, so every case pattern is visible to every candidate.
//! Both passes run on one thread in the order they are given.

use crate::algorithm::matching::adapter::PredicateAdapter;
use crate::algorithm::matching::attrition::AttritionReport;
use crate::algorithm::matching::case_identifier::CaseIdentifier;
use crate::algorithm::matching::control::ControlMatcher;
use crate::algorithm::matching::registry::CaseSetRegistry;
use crate::algorithm::matching::types::{MatchOutcome, MatchRecord, Rejection};
use crate::common::traits::RecordSink;
use crate::error::Result;
use crate::models::Patient;
use crate::utils::logging::progress;
use log::{debug, info, trace};
use rustc_hash::FxHashSet;

/// State shared by both passes
pub struct PassState<'s> {
    /// Open and closed case patterns
    pub registry: CaseSetRegistry,
    /// Attrition counters
    pub attrition: AttritionReport,
    /// Receives every case and control record
    pub sink: &'s mut dyn RecordSink,
    /// Case records emitted
    pub cases_emitted: usize,
    /// Control records emitted
    pub controls_emitted: usize,
}

impl<'s> PassState<'s> {
    /// Fresh state around a registry and a sink
    pub fn new(registry: CaseSetRegistry, sink: &'s mut dyn RecordSink) -> Self {
        Self {
            registry,
            attrition: AttritionReport::default(),
            sink,
            cases_emitted: 0,
            controls_emitted: 0,
        }
    }
}

/// Pass 1: identify and register the cases of every patient
///
/// # Returns
///
/// Identifiers of the patients that produced at least one case
pub fn identify_cases_pass<'p>(
    patients: &[&'p Patient],
    identifier: &mut CaseIdentifier<'_>,
    state: &mut PassState<'_>,
    show_progress: bool,
) -> Result<FxHashSet<&'p str>> {
    info!("Identifying cases among {} patients", patients.len());
    let pb = progress::pass_progress_bar(patients.len(), "Identifying cases", show_progress);

    let mut case_patients = FxHashSet::default();
    for (position, &patient) in patients.iter().enumerate() {
        let ids = identifier.identify_cases(
            patient,
            &mut state.registry,
            &mut state.attrition,
            &mut *state.sink,
        )?;
        if !ids.is_empty() {
            state.cases_emitted += ids.len();
            case_patients.insert(patient.id.as_str());
        }

        progress::advance(&pb, position, || format!("{} cases", state.cases_emitted));
    }

    progress::finish_pass(&pb, "Case identification complete");
    info!(
        "Identified {} cases in {} patients",
        state.cases_emitted,
        case_patients.len()
    );
    Ok(case_patients)
}

/// Pass 2: try every patient as a control against every open case pattern
///
/// Patients in `skip` are never tried.
pub fn control_search_pass(
    patients: &[&Patient],
    matcher: &ControlMatcher<'_>,
    adapter: PredicateAdapter<'_>,
    skip: &FxHashSet<&str>,
    state: &mut PassState<'_>,
    show_progress: bool,
) -> Result<()> {
    info!(
        "Searching controls for {} open case sets among {} patients",
        state.registry.open_count(),
        patients.len()
    );
    let pb = progress::pass_progress_bar(patients.len(), "Searching controls", show_progress);

    let PassState {
        registry,
        attrition,
        sink,
        controls_emitted,
        ..
    } = state;

    for (position, &candidate) in patients.iter().enumerate() {
        if registry.open_count() == 0 {
            debug!("Every case set is complete after {position} candidates");
            break;
        }

        progress::advance(&pb, position, || format!("{controls_emitted} controls"));

        if skip.contains(candidate.id.as_str()) {
            attrition.candidates_skipped_as_cases += 1;
            continue;
        }
        if candidate.cohorts.is_empty() {
            continue;
        }

        registry.visit_open(|pattern| match matcher.try_match(pattern, candidate) {
            MatchOutcome::Accepted(values) => {
                let output = adapter.output_values(candidate, pattern.index_date(), values.cohort);
                sink.emit(MatchRecord::for_control(pattern, candidate, values, output))?;
                attrition.record_control(pattern.event_type());
                *controls_emitted += 1;
                Ok(true)
            }
            MatchOutcome::Rejected(Rejection::Excluded(reason)) => {
                trace!(
                    "Candidate {} excluded for case set {}: {reason}",
                    candidate.id, pattern.id
                );
                attrition.control_exclusions.add(&reason);
                Ok(false)
            }
            MatchOutcome::Rejected(rejection) => {
                trace!(
                    "Candidate {} rejected for case set {}: {rejection:?}",
                    candidate.id, pattern.id
                );
                Ok(false)
            }
        })?;
    }

    progress::finish_pass(&pb, "Control search complete");
    info!(
        "Matched {} controls, {} case sets still open",
        controls_emitted,
        registry.open_count()
    );
    Ok(())
}
