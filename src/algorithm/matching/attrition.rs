//! Attrition bookkeeping for case identification and control search
//!
//! Counters are reported, never consulted for control flow.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;

/// Counts keyed by a free-text reason, kept in order of first occurrence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasonTally {
    entries: Vec<(String, usize)>,
    index: FxHashMap<String, usize>,
}

impl ReasonTally {
    /// Count one occurrence of `reason`
    pub fn add(&mut self, reason: &str) {
        if let Some(&slot) = self.index.get(reason) {
            self.entries[slot].1 += 1;
        } else {
            self.index.insert(reason.to_string(), self.entries.len());
            self.entries.push((reason.to_string(), 1));
        }
    }

    /// Count recorded for `reason`
    #[must_use]
    pub fn get(&self, reason: &str) -> usize {
        self.index.get(reason).map_or(0, |&slot| self.entries[slot].1)
    }

    /// Sum of all counts
    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Reasons and counts in order of first occurrence
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(reason, count)| (reason.as_str(), *count))
    }

    /// Whether nothing was counted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attrition counters for one run of the engine
#[derive(Debug, Clone, Default)]
pub struct AttritionReport {
    /// Patients scanned for cases
    pub patients_screened: usize,
    /// Patients skipped because no cohort interval is known
    pub patients_without_cohort: usize,
    /// Patients that yielded no accepted case
    pub patients_without_case: usize,
    /// Case candidates rejected by event-count rules, per reason
    pub case_rejections: ReasonTally,
    /// Cases removed by the exclusion criteria, per reason
    pub case_exclusions: ReasonTally,
    /// Accepted cases per event type
    pub cases_by_event_type: BTreeMap<String, usize>,
    /// Matched controls per case event type
    pub controls_by_event_type: BTreeMap<String, usize>,
    /// Control candidates skipped because they were cases themselves
    pub candidates_skipped_as_cases: usize,
    /// Candidate controls removed by the exclusion criteria, per reason
    pub control_exclusions: ReasonTally,
    /// Cases that ended with fewer controls than the quota
    pub cases_below_quota: usize,
    /// Cases that ended with no control at all
    pub cases_without_controls: usize,
}

impl AttritionReport {
    pub(crate) fn record_case(&mut self, event_type: &str) {
        *self.cases_by_event_type.entry(event_type.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn record_control(&mut self, event_type: &str) {
        *self.controls_by_event_type.entry(event_type.to_string()).or_insert(0) += 1;
    }

    /// Total accepted cases
    #[must_use]
    pub fn total_cases(&self) -> usize {
        self.cases_by_event_type.values().sum()
    }

    /// Total matched controls
    #[must_use]
    pub fn total_controls(&self) -> usize {
        self.controls_by_event_type.values().sum()
    }
}

impl fmt::Display for AttritionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Attrition Summary:")?;
        writeln!(f, "  - Patients screened: {}", self.patients_screened)?;
        writeln!(f, "  - Patients without cohort: {}", self.patients_without_cohort)?;
        writeln!(
            f,
            "  - Not a qualifying event of interest: {}",
            self.patients_without_case
        )?;
        for (reason, count) in self.case_rejections.iter() {
            writeln!(f, "  - {reason}: {count}")?;
        }
        for (reason, count) in self.case_exclusions.iter() {
            writeln!(f, "  - Excluded case, {reason}: {count}")?;
        }

        writeln!(f)?;
        writeln!(f, "{:<30} | {:>8} | {:>8}", "Event type", "Cases", "Controls")?;
        writeln!(f, "{:-<30}-|-{:->8}-|-{:->8}", "", "", "")?;
        for (event_type, cases) in &self.cases_by_event_type {
            let controls = self.controls_by_event_type.get(event_type).copied().unwrap_or(0);
            writeln!(f, "{event_type:<30} | {cases:>8} | {controls:>8}")?;
        }
        writeln!(
            f,
            "{:<30} | {:>8} | {:>8}",
            "Total",
            self.total_cases(),
            self.total_controls()
        )?;

        writeln!(f)?;
        writeln!(f, "Control Search:")?;
        writeln!(
            f,
            "  - Candidates skipped (were cases): {}",
            self.candidates_skipped_as_cases
        )?;
        for (reason, count) in self.control_exclusions.iter() {
            writeln!(f, "  - Excluded candidate, {reason}: {count}")?;
        }
        writeln!(f, "  - Cases below quota: {}", self.cases_below_quota)?;
        write!(f, "  - Cases without controls: {}", self.cases_without_controls)
    }
}
