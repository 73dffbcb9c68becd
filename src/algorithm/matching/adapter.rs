//! Pass-through to the exclusion-criteria and covariate collaborators
//!
//! The engine consults exclusion criteria at exactly two points: after a case
//! candidate passes its event-count rules, and as the last predicate of the
//! control chain. Output values are looked up once per emitted record.

use crate::common::traits::{CovariateProvider, ExclusionCriteria};
use crate::models::{CohortInterval, Patient};

/// Values written next to a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputValues {
    /// Exclusion-criteria values
    pub exclusion: Vec<String>,
    /// Covariate values
    pub covariates: Vec<String>,
}

/// Borrowed handles on the two collaborators
#[derive(Debug, Clone, Copy)]
pub struct PredicateAdapter<'a> {
    exclusion: &'a dyn ExclusionCriteria,
    covariates: &'a dyn CovariateProvider,
}

impl<'a> PredicateAdapter<'a> {
    /// Wrap the collaborators
    #[must_use]
    pub fn new(exclusion: &'a dyn ExclusionCriteria, covariates: &'a dyn CovariateProvider) -> Self {
        Self {
            exclusion,
            covariates,
        }
    }

    /// Exclusion check for a case candidate at its own event date
    #[must_use]
    pub fn case_exclusion(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> Option<String> {
        self.exclusion.exclusion_reason(patient, index_date, cohort)
    }

    /// Exclusion check for a control candidate at the case's index date
    #[must_use]
    pub fn control_exclusion(
        &self,
        candidate: &Patient,
        index_date: i32,
        cohort: CohortInterval,
    ) -> Option<String> {
        self.exclusion.exclusion_reason(candidate, index_date, cohort)
    }

    /// Exclusion and covariate values for an output record
    #[must_use]
    pub fn output_values(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> OutputValues {
        OutputValues {
            exclusion: self.exclusion.values(patient, index_date, cohort),
            covariates: self.covariates.values(patient, index_date, cohort),
        }
    }

    /// Exclusion-criteria column labels
    #[must_use]
    pub fn exclusion_labels(&self) -> Vec<String> {
        self.exclusion.labels()
    }

    /// Covariate column labels
    #[must_use]
    pub fn covariate_labels(&self) -> Vec<String> {
        self.covariates.labels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use std::cell::RefCell;

    /// Excludes patients whose id starts with `X` and remembers every call
    #[derive(Debug, Default)]
    struct Recording {
        calls: RefCell<Vec<(String, i32, CohortInterval)>>,
    }

    impl ExclusionCriteria for Recording {
        fn labels(&self) -> Vec<String> {
            vec!["flag".to_string()]
        }

        fn exclusion_reason(
            &self,
            patient: &Patient,
            index_date: i32,
            cohort: CohortInterval,
        ) -> Option<String> {
            self.calls
                .borrow_mut()
                .push((patient.id.clone(), index_date, cohort));
            patient.id.starts_with('X').then(|| "flagged".to_string())
        }

        fn values(&self, patient: &Patient, _index_date: i32, _cohort: CohortInterval) -> Vec<String> {
            vec![patient.id.starts_with('X').to_string()]
        }
    }

    impl CovariateProvider for Recording {
        fn labels(&self) -> Vec<String> {
            vec!["index".to_string()]
        }

        fn values(&self, _patient: &Patient, index_date: i32, _cohort: CohortInterval) -> Vec<String> {
            vec![index_date.to_string()]
        }
    }

    #[test]
    fn test_collaborators_see_index_date_and_segment() {
        let recording = Recording::default();
        let adapter = PredicateAdapter::new(&recording, &recording);
        let segment = CohortInterval::new(100, 200);
        let plain = Patient::new("A", 0, Gender::Male, "PR1", segment);
        let flagged = Patient::new("X1", 0, Gender::Male, "PR1", segment);

        assert_eq!(adapter.case_exclusion(&plain, 150, segment), None);
        assert_eq!(
            adapter.control_exclusion(&flagged, 160, segment).as_deref(),
            Some("flagged")
        );
        assert_eq!(
            recording.calls.borrow().as_slice(),
            &[
                ("A".to_string(), 150, segment),
                ("X1".to_string(), 160, segment)
            ]
        );

        let values = adapter.output_values(&flagged, 170, segment);
        assert_eq!(values.exclusion, vec!["true"]);
        assert_eq!(values.covariates, vec!["170"]);
        assert_eq!(adapter.exclusion_labels(), vec!["flag"]);
        assert_eq!(adapter.covariate_labels(), vec!["index"]);
    }
}
