//! Exclusion-criteria and covariate collaborator traits
//!
//! The engine treats both as opaque services. It only decides when they are
//! consulted and with which index date and cohort interval.

use crate::models::{CohortInterval, Patient};
use std::fmt::Debug;

/// Decides whether a patient is excluded at an index date
///
/// Implementors also supply one output value per label, written next to every
/// case and control record.
pub trait ExclusionCriteria: Debug {
    /// Output column labels, one per value returned by [`Self::values`]
    fn labels(&self) -> Vec<String>;

    /// Reason the patient is excluded, or `None` when the patient is eligible
    ///
    /// # Arguments
    ///
    /// * `patient` - The case or candidate control
    /// * `index_date` - The case's index date
    /// * `cohort` - The cohort segment containing the index date
    fn exclusion_reason(
        &self,
        patient: &Patient,
        index_date: i32,
        cohort: CohortInterval,
    ) -> Option<String>;

    /// Output values for the patient at the index date
    fn values(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> Vec<String>;
}

/// Produces covariate values for output records
pub trait CovariateProvider: Debug {
    /// Output column labels, one per value returned by [`Self::values`]
    fn labels(&self) -> Vec<String>;

    /// Covariate values for the patient at the index date
    fn values(&self, patient: &Patient, index_date: i32, cohort: CohortInterval) -> Vec<String>;
}
