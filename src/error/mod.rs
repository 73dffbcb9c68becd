//! Error handling for the case-control matching engine.

use arrow::error::ArrowError;
use std::io;

/// Errors raised while turning settings into a validated matching configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A window token could not be parsed
    #[error("Invalid window bound '{token}' for {field}: {reason}")]
    InvalidWindow {
        /// Setting that held the token
        field: String,
        /// The offending token
        token: String,
        /// What was wrong with it
        reason: String,
    },

    /// ATC level must be between 1 and 7
    #[error("ATC level {0} is out of range (expected 1-7)")]
    AtcLevelOutOfRange(i64),

    /// A numeric setting held a value that does not make sense
    #[error("Invalid value {value} for {field}: {reason}")]
    InvalidNumber {
        /// Setting name
        field: String,
        /// Offending value
        value: String,
        /// What was wrong with it
        reason: String,
    },

    /// Unknown unit or mode keyword
    #[error("Unknown {field} '{value}'")]
    UnknownKeyword {
        /// Setting name
        field: String,
        /// Offending keyword
        value: String,
    },

    /// An event-count rule or criterion was configured without event types
    #[error("'{0}' has no event types")]
    NoEventTypes(String),

    /// Minimum above maximum on an event-count rule
    #[error("Rule '{label}' has minimum {min} above maximum {max}")]
    MinAboveMax {
        /// Rule label
        label: String,
        /// Configured minimum
        min: u32,
        /// Configured maximum
        max: u32,
    },

    /// Two rules or columns share the same label
    #[error("Duplicate label '{0}'")]
    DuplicateLabel(String),

    /// A code list contained an empty entry
    #[error("Empty code in {0}")]
    EmptyCode(String),
}

/// Specialized error type for the matching engine
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    /// Configuration could not be validated
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Population input violates an ordering or consistency requirement
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record sink refused a record
    #[error("Sink error: {0}")]
    Sink(String),

    /// Arrow error while assembling output
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MatchingError {
    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type for matching operations
pub type Result<T> = std::result::Result<T, MatchingError>;
