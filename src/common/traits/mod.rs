//! Common traits used across the codebase
//!
//! This module defines the narrow interfaces through which the matching
//! engine talks to its collaborators.

pub mod criteria;
pub mod sink;

// Re-export collaborator traits
pub use criteria::{CovariateProvider, ExclusionCriteria};

// Re-export output traits
pub use sink::RecordSink;
