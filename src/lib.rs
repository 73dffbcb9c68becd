//! Case identification and control matching for nested case-control studies.
//!
//! Given a population of patients with dated events, prescriptions and
//! measurements, the engine finds qualifying case events and matches each
//! case to controls that resemble it at the case's index date.

pub mod algorithm;
pub mod common;
pub mod config;
pub mod criteria;
pub mod error;
pub mod loader;
pub mod models;
pub mod output;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use algorithm::matching::{
    AttritionReport, MatchRecord, Matcher, MatchingConfig, MatchingConfigBuilder, MatchingResult,
};
pub use config::MatchingSettings;
pub use error::{ConfigError, MatchingError, Result};
pub use models::{CohortInterval, Event, Gender, Measurement, Patient, Prescription};

// Collaborators and sinks
pub use common::traits::{CovariateProvider, ExclusionCriteria, RecordSink};
pub use criteria::{CovariateSet, CriteriaSet};
pub use output::{RecordBatchSink, VecSink};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Loading and writing
pub use loader::{load_population, write_csv};
