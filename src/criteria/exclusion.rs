//! Exclusion criteria

use crate::algorithm::matching::criteria::EventWindow;
use crate::algorithm::matching::window;
use crate::common::traits::ExclusionCriteria;
use crate::models::{CohortInterval, Patient};

/// Ordered collection of exclusion criteria
///
/// The first criterion that excludes a patient supplies the reason. An empty
/// set excludes nobody.
#[derive(Debug, Default)]
pub struct CriteriaSet {
    criteria: Vec<Box<dyn ExclusionCriteria>>,
}

impl CriteriaSet {
    /// Append a criterion
    #[must_use]
    pub fn with(mut self, criterion: impl ExclusionCriteria + 'static) -> Self {
        self.criteria.push(Box::new(criterion));
        self
    }

    /// Append an already boxed criterion
    pub fn push(&mut self, criterion: Box<dyn ExclusionCriteria>) {
        self.criteria.push(criterion);
    }

    /// Number of criteria
    #[must_use]
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl ExclusionCriteria for CriteriaSet {
    fn labels(&self) -> Vec<String> {
        self.criteria.iter().flat_map(|criterion| criterion.labels()).collect()
    }

    fn exclusion_reason(
        &self,
        patient: &Patient,
        index_date: i32,
        cohort: CohortInterval,
    ) -> Option<String> {
        self.criteria
            .iter()
            .find_map(|criterion| criterion.exclusion_reason(patient, index_date, cohort))
    }

    fn values(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> Vec<String> {
        self.criteria
            .iter()
            .flat_map(|criterion| criterion.values(patient, index_date, cohort))
            .collect()
    }
}

/// Excludes patients with a matching event inside a window around the index date
#[derive(Debug, Clone)]
pub struct EventHistoryExclusion {
    label: String,
    event_types: Vec<String>,
    window: EventWindow,
}

impl EventHistoryExclusion {
    /// Create a criterion; event types may end with `*` to match a prefix
    #[must_use]
    pub fn new(label: impl Into<String>, event_types: Vec<String>, window: EventWindow) -> Self {
        Self {
            label: label.into(),
            event_types,
            window,
        }
    }

    fn count(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> u32 {
        window::count_events(&patient.events, &self.event_types, &self.window, index_date, cohort)
    }
}

impl ExclusionCriteria for EventHistoryExclusion {
    fn labels(&self) -> Vec<String> {
        vec![self.label.clone()]
    }

    fn exclusion_reason(
        &self,
        patient: &Patient,
        index_date: i32,
        cohort: CohortInterval,
    ) -> Option<String> {
        (self.count(patient, index_date, cohort) > 0).then(|| format!("history of {}", self.label))
    }

    fn values(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> Vec<String> {
        vec![self.count(patient, index_date, cohort).to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::matching::criteria::{WindowEnd, WindowStart};
    use crate::models::{Event, Gender};

    fn patient() -> Patient {
        Patient::new("P1", 0, Gender::Male, "PR1", CohortInterval::new(0, 1000)).with_events([
            Event::new("CA50", 100),
            Event::new("STROKE", 300),
            Event::new("CA18", 700),
        ])
    }

    fn history(label: &str, code: &str) -> EventHistoryExclusion {
        EventHistoryExclusion::new(
            label,
            vec![code.to_string()],
            EventWindow::new(WindowStart::Unbounded, WindowEnd::Index),
        )
    }

    #[test]
    fn test_event_history_window() {
        let cancer = history("cancer", "CA*");
        let cohort = CohortInterval::new(0, 1000);

        assert_eq!(cancer.exclusion_reason(&patient(), 50, cohort), None);
        assert_eq!(
            cancer.exclusion_reason(&patient(), 500, cohort).as_deref(),
            Some("history of cancer")
        );
        assert_eq!(cancer.values(&patient(), 500, cohort), vec!["1"]);
        assert_eq!(cancer.values(&patient(), 800, cohort), vec!["2"]);
    }

    #[test]
    fn test_first_excluding_criterion_wins() {
        let set = CriteriaSet::default()
            .with(history("stroke", "STROKE"))
            .with(history("cancer", "CA*"));
        let cohort = CohortInterval::new(0, 1000);

        assert_eq!(set.len(), 2);
        assert_eq!(set.labels(), vec!["stroke", "cancer"]);
        assert_eq!(
            set.exclusion_reason(&patient(), 200, cohort).as_deref(),
            Some("history of cancer")
        );
        assert_eq!(
            set.exclusion_reason(&patient(), 500, cohort).as_deref(),
            Some("history of stroke")
        );
        assert_eq!(set.values(&patient(), 500, cohort), vec!["1", "1"]);
    }

    #[test]
    fn test_empty_set_excludes_nobody() {
        let set = CriteriaSet::default();
        assert!(set.is_empty());
        assert!(set.labels().is_empty());
        assert_eq!(set.exclusion_reason(&patient(), 900, CohortInterval::new(0, 1000)), None);
    }
}
