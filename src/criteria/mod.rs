//! Built-in exclusion criteria and covariates
//!
//! Implementations of the collaborator traits in [`crate::common::traits`]
//! that cover the common cases: excluding patients with a history of some
//! event, and reporting event counts, measurements and age next to each
//! record.

pub mod covariates;
pub mod exclusion;

pub use covariates::{AgeCovariate, CovariateSet, EventCountCovariate, MeasurementCovariate};
pub use exclusion::{CriteriaSet, EventHistoryExclusion};
