//! Common domain type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gender of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    /// Male gender
    Male,
    /// Female gender
    Female,
    /// Unknown or not specified
    Unknown,
}

impl Gender {
    /// Short code used in output records
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "U",
        }
    }
}

impl From<&str> for Gender {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "1" => Self::Male,
            "f" | "female" | "2" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for Gender {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Gender> for String {
    fn from(gender: Gender) -> Self {
        gender.code().to_string()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Half-open `[start, end)` range of days during which a patient is eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CohortInterval {
    /// First eligible day
    pub start: i32,
    /// First day after eligibility ends
    pub end: i32,
}

impl CohortInterval {
    /// Create a new cohort interval
    #[must_use]
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Whether `day` lies in `[start, end)`
    #[must_use]
    pub const fn contains(&self, day: i32) -> bool {
        self.start <= day && day < self.end
    }

    /// Number of days in the interval
    #[must_use]
    pub const fn duration(&self) -> i64 {
        self.end as i64 - self.start as i64
    }
}

/// Returns `true` when `code` matches `pattern`.
///
/// A pattern ending in `*` matches by prefix, anything else must match exactly.
#[must_use]
pub fn code_matches(pattern: &str, code: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => code.starts_with(prefix),
        None => code == pattern,
    }
}

/// Returns `true` when any pattern in `patterns` matches `code`
#[must_use]
pub fn any_code_matches(patterns: &[String], code: &str) -> bool {
    patterns.iter().any(|pattern| code_matches(pattern, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parsing() {
        assert_eq!(Gender::from("M"), Gender::Male);
        assert_eq!(Gender::from(" female "), Gender::Female);
        assert_eq!(Gender::from("2"), Gender::Female);
        assert_eq!(Gender::from("x"), Gender::Unknown);
    }

    #[test]
    fn test_code_matching() {
        assert!(code_matches("MI", "MI"));
        assert!(!code_matches("MI", "MI2"));
        assert!(code_matches("I2*", "I21"));
        assert!(!code_matches("I2*", "I10"));
        assert!(any_code_matches(&["A".to_string(), "B*".to_string()], "B01"));
    }

    #[test]
    fn test_cohort_interval_is_half_open() {
        let cohort = CohortInterval::new(0, 1000);
        assert!(cohort.contains(0));
        assert!(cohort.contains(999));
        assert!(!cohort.contains(1000));
        assert_eq!(cohort.duration(), 1000);
    }
}
