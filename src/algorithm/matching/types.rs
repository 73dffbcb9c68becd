//! Type definitions for the matching algorithm
//!
//! This module contains common types used throughout the matching algorithm.

use crate::algorithm::matching::adapter::OutputValues;
use crate::algorithm::matching::attrition::AttritionReport;
use crate::algorithm::matching::window::AtcClassSet;
use crate::models::{CohortInterval, Event, Gender, Patient};
use smallvec::SmallVec;
use std::time::Duration;

/// Identifier of a case pattern, also the case-set id in output
pub type CaseId = u64;

/// Per-rule event counts, index-aligned with the configured rules
pub type EventCounts = SmallVec<[u32; 4]>;

/// The matching fingerprint of an accepted case
#[derive(Debug, Clone)]
pub struct CasePattern {
    /// Case-set identifier
    pub id: CaseId,
    /// The qualifying event
    pub case_event: Event,
    /// Case patient identifier
    pub patient_id: String,
    /// Case patient practice
    pub practice_id: String,
    /// Case birth day number
    pub birth_date: i32,
    /// Case birth year and month (1-12)
    pub birth_year_month: Option<(i32, u32)>,
    /// Case gender
    pub gender: Gender,
    /// Cohort segment the case was found in
    pub cohort: CohortInterval,
    /// Drug-count fingerprint, when drug-count matching is configured
    pub drug_count: Option<u32>,
    /// ATC-class fingerprint, when ATC-class matching is configured
    pub atc_classes: Option<AtcClassSet>,
    /// External case-set id, when a prefix is configured
    pub case_set_id: Option<String>,
    /// The case's own count under each event-count rule
    pub event_counts: EventCounts,
    pub(crate) controls_found: u32,
}

impl CasePattern {
    /// Snapshot the case patient's demographics around a qualifying event
    #[must_use]
    pub fn new(id: CaseId, patient: &Patient, case_event: Event, cohort: CohortInterval) -> Self {
        Self {
            id,
            case_event,
            patient_id: patient.id.clone(),
            practice_id: patient.practice_id.clone(),
            birth_date: patient.birth_date,
            birth_year_month: patient.birth_year_month(),
            gender: patient.gender,
            cohort,
            drug_count: None,
            atc_classes: None,
            case_set_id: None,
            event_counts: EventCounts::new(),
            controls_found: 0,
        }
    }

    /// The index date, i.e. the date of the case event
    #[must_use]
    pub const fn index_date(&self) -> i32 {
        self.case_event.date
    }

    /// Event type of the case event
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.case_event.event_type
    }

    /// Number of controls matched so far
    #[must_use]
    pub const fn controls_found(&self) -> u32 {
        self.controls_found
    }
}

/// Values computed for a control while matching, needed for its output record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlValues {
    /// The control's cohort segment containing the index date
    pub cohort: CohortInterval,
    /// The control's own drug count, when drug-count matching is configured
    pub drug_count: Option<u32>,
    /// The control's count under each event-count rule
    pub event_counts: EventCounts,
}

/// The predicate that turned a candidate down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Candidate is the case patient
    SamePatient,
    /// Different practice
    Practice,
    /// Birth dates too far apart
    BirthDate,
    /// Different gender
    Gender,
    /// Index date outside every cohort segment of the candidate
    OutsideCohort,
    /// External case-set ids differ
    CaseSetId,
    /// Cohort timing too different
    CohortTime,
    /// Candidate already had the case's event type before the index date
    PriorEvent,
    /// Drug counts differ
    DrugCount,
    /// ATC-class sets differ
    AtcClasses,
    /// An event-count rule failed (index into the configured rules)
    EventCount(usize),
    /// Excluded by the exclusion criteria, with the reason given
    Excluded(String),
}

/// Outcome of matching one candidate against one case pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Candidate is a valid control
    Accepted(ControlValues),
    /// Candidate failed a predicate
    Rejected(Rejection),
}

impl MatchOutcome {
    /// Whether the candidate was accepted
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// One output row: a case or one of its controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Case-set identifier shared by the case and its controls
    pub case_set_id: CaseId,
    /// Event type of the case event
    pub event_type: String,
    /// `true` for the case row, `false` for control rows
    pub is_case: bool,
    /// Patient identifier of this row
    pub patient_id: String,
    /// Practice identifier of this row
    pub practice_id: String,
    /// Birth day number of this row's patient
    pub birth_date: i32,
    /// Gender of this row's patient
    pub gender: Gender,
    /// The case's index date
    pub index_date: i32,
    /// Cohort segment start of this row's patient
    pub cohort_start: i32,
    /// Cohort segment end of this row's patient
    pub cohort_end: i32,
    /// Drug count of this row's patient, when configured
    pub drug_count: Option<u32>,
    /// Counts under each event-count rule for this row's patient
    pub event_counts: Vec<u32>,
    /// Exclusion-criteria values
    pub exclusion_values: Vec<String>,
    /// Covariate values
    pub covariate_values: Vec<String>,
}

impl MatchRecord {
    /// Output row for an accepted case
    #[must_use]
    pub fn for_case(pattern: &CasePattern, values: OutputValues) -> Self {
        Self {
            case_set_id: pattern.id,
            event_type: pattern.case_event.event_type.clone(),
            is_case: true,
            patient_id: pattern.patient_id.clone(),
            practice_id: pattern.practice_id.clone(),
            birth_date: pattern.birth_date,
            gender: pattern.gender,
            index_date: pattern.index_date(),
            cohort_start: pattern.cohort.start,
            cohort_end: pattern.cohort.end,
            drug_count: pattern.drug_count,
            event_counts: pattern.event_counts.to_vec(),
            exclusion_values: values.exclusion,
            covariate_values: values.covariates,
        }
    }

    /// Output row for a control matched to `pattern`
    #[must_use]
    pub fn for_control(
        pattern: &CasePattern,
        control: &Patient,
        matched: ControlValues,
        values: OutputValues,
    ) -> Self {
        Self {
            case_set_id: pattern.id,
            event_type: pattern.case_event.event_type.clone(),
            is_case: false,
            patient_id: control.id.clone(),
            practice_id: control.practice_id.clone(),
            birth_date: control.birth_date,
            gender: control.gender,
            index_date: pattern.index_date(),
            cohort_start: matched.cohort.start,
            cohort_end: matched.cohort.end,
            drug_count: matched.drug_count,
            event_counts: matched.event_counts.into_vec(),
            exclusion_values: values.exclusion,
            covariate_values: values.covariates,
        }
    }
}

/// Final state of one case after the control search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSummary {
    /// Case-set identifier
    pub id: CaseId,
    /// Case patient identifier
    pub patient_id: String,
    /// Event type of the case event
    pub event_type: String,
    /// Controls matched
    pub controls_found: u32,
}

/// Result of the matching process
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Number of case records emitted
    pub case_count: usize,
    /// Number of control records emitted
    pub control_count: usize,
    /// Every registered case with its final control count
    pub cases: Vec<CaseSummary>,
    /// Attrition counters
    pub attrition: AttritionReport,
    /// Time taken for matching
    pub matching_time: Duration,
}
