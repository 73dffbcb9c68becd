//! Case identification and control matching
//!
//! This module implements the two-pass matching engine:
//!
//! 1. Pass 1 scans every patient for qualifying events and registers a case
//!    pattern for each accepted case
//! 2. Pass 2 tries every patient as a control against every open pattern,
//!    newest first, until each pattern's quota is met
//!
//! Matching predicates are configured through [`MatchingConfig`]; exclusion
//! criteria and covariates are supplied by the caller.

pub mod adapter;
pub mod attrition;
pub mod case_identifier;
pub mod control;
pub mod criteria;
pub mod matcher;
pub mod registry;
pub mod sequential;
pub mod types;
pub mod validation;
pub mod window;

// Re-export key types
pub use adapter::{OutputValues, PredicateAdapter};
pub use attrition::{AttritionReport, ReasonTally};
pub use case_identifier::CaseIdentifier;
pub use control::ControlMatcher;
pub use criteria::{
    AtcClassMatch, BirthDateMatch, CohortTimeMatch, ControlQuota, DayWindow, DrugCountMatch,
    EventCountRule, EventWindow, MatchingConfig, MatchingConfigBuilder, WindowEnd, WindowStart,
};
pub use matcher::Matcher;
pub use registry::CaseSetRegistry;
pub use types::{
    CaseId, CasePattern, CaseSummary, ControlValues, MatchOutcome, MatchRecord, MatchingResult,
    Rejection,
};
