//! Raw matching settings
//!
//! Settings are read from JSON and keep the legacy encodings: integer codes
//! for the control quota and birth-date mode, and string tokens for window
//! edges. [`MatchingSettings::to_config`] turns them into a validated
//! [`MatchingConfig`]; every configuration error surfaces there, before any
//! patient is read.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algorithm::matching::criteria::{
    AtcClassMatch, BirthDateMatch, CohortTimeMatch, ControlQuota, DayWindow, DrugCountMatch,
    EventCountRule, EventWindow, MatchingConfig,
};
use crate::criteria::{
    AgeCovariate, CovariateSet, CriteriaSet, EventCountCovariate, EventHistoryExclusion,
    MeasurementCovariate,
};
use crate::error::{ConfigError, Result};

/// Matching settings as written in a settings file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// Event types of interest; empty means every type
    pub event_types: Vec<String>,
    /// Only the first occurrence of each event type per cohort is a candidate
    pub first_event_only: bool,
    /// Controls per case, `-1` for unbounded
    pub controls_per_case: i64,
    /// Patients that became cases are never used as controls
    pub controls_never_case: bool,
    /// Require the same practice
    pub match_on_practice: bool,
    /// Require the same gender
    pub match_on_gender: bool,
    /// `-1` off, `-2` same year, `-3` or below same year and month,
    /// non-negative for a tolerance in days
    pub max_difference_between_birth_dates: i64,
    /// Cohort timing comparison
    pub cohort_time: Option<CohortTimeSettings>,
    /// Drug-count matching
    pub drug_count: Option<DrugCountSettings>,
    /// ATC-class matching
    pub atc_classes: Option<AtcClassSettings>,
    /// Prefix of the event type carrying an external case-set id
    pub case_set_prefix: Option<String>,
    /// Event-count rules
    pub event_count_rules: Vec<EventCountRuleSettings>,
    /// Seed for shuffling the processing order
    pub random_seed: Option<u64>,
    /// Built-in exclusion criteria
    pub exclusions: Vec<ExclusionSettings>,
    /// Built-in covariates
    pub covariates: Vec<CovariateSettings>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            event_types: Vec::new(),
            first_event_only: false,
            controls_per_case: 1,
            controls_never_case: false,
            match_on_practice: false,
            match_on_gender: false,
            max_difference_between_birth_dates: -1,
            cohort_time: None,
            drug_count: None,
            atc_classes: None,
            case_set_prefix: None,
            event_count_rules: Vec::new(),
            random_seed: None,
            exclusions: Vec::new(),
            covariates: Vec::new(),
        }
    }
}

/// Cohort timing tolerance with its unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortTimeSettings {
    /// Tolerance value
    pub tolerance: f64,
    /// `"days"` or `"percent"`
    pub unit: String,
}

/// Drug-count window and drug list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugCountSettings {
    /// Window start offset or `"MIN"`
    pub window_start: String,
    /// Window end offset or `"MAX"`
    pub window_end: String,
    /// ATC prefixes to count; empty counts every drug
    #[serde(default)]
    pub drugs: Vec<String>,
}

/// ATC-class window and truncation level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtcClassSettings {
    /// Window start offset or `"MIN"`
    pub window_start: String,
    /// Window end offset or `"MAX"`
    pub window_end: String,
    /// ATC characters kept (1-7)
    pub level: i64,
}

/// One event-count rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCountRuleSettings {
    /// Output label
    pub label: String,
    /// Event codes counted
    pub event_types: Vec<String>,
    /// Minimum count
    #[serde(default)]
    pub min: Option<u32>,
    /// Maximum count
    #[serde(default)]
    pub max: Option<u32>,
    /// Allowed difference; absent requires presence equivalence
    #[serde(default)]
    pub tolerance: Option<u32>,
    /// Window start token
    #[serde(default)]
    pub window_start: String,
    /// Window end token
    #[serde(default)]
    pub window_end: String,
}

/// An event-history exclusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionSettings {
    /// Output label, also used in the exclusion reason
    pub label: String,
    /// Event codes that exclude
    pub event_types: Vec<String>,
    /// Window start token
    #[serde(default)]
    pub window_start: String,
    /// Window end token
    #[serde(default = "index_token")]
    pub window_end: String,
}

fn index_token() -> String {
    "Index".to_string()
}

/// A built-in covariate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CovariateSettings {
    /// Count of matching events in a window
    EventCount {
        /// Output label
        label: String,
        /// Event codes counted
        event_types: Vec<String>,
        /// Window start token
        #[serde(default)]
        window_start: String,
        /// Window end token
        #[serde(default = "index_token")]
        window_end: String,
    },
    /// Latest measurement value on or before the index date
    Measurement {
        /// Output label
        label: String,
        /// Measurement type
        measurement_type: String,
        /// Maximum age of the measurement in days
        #[serde(default)]
        lookback_days: Option<u32>,
    },
    /// Age in whole years at the index date
    Age {
        /// Output label
        label: String,
    },
}

fn event_window(
    field: &str,
    start: &str,
    end: &str,
) -> std::result::Result<EventWindow, ConfigError> {
    let window = EventWindow::new(start.parse()?, end.parse()?);
    window.check(field)?;
    Ok(window)
}

fn cohort_time(settings: &CohortTimeSettings) -> std::result::Result<CohortTimeMatch, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidNumber {
        field: "cohort_time".to_string(),
        value: settings.tolerance.to_string(),
        reason: reason.to_string(),
    };
    if !settings.tolerance.is_finite() || settings.tolerance < 0.0 {
        return Err(invalid("tolerance must be a non-negative number"));
    }

    match settings.unit.trim().to_ascii_lowercase().as_str() {
        "days" => {
            if settings.tolerance.fract() != 0.0 || settings.tolerance > f64::from(u32::MAX) {
                return Err(invalid("a tolerance in days must be a whole number"));
            }
            Ok(CohortTimeMatch::StartWithinDays(settings.tolerance as u32))
        }
        "percent" => Ok(CohortTimeMatch::DurationWithinPercent(settings.tolerance)),
        _ => Err(ConfigError::UnknownKeyword {
            field: "cohort time unit".to_string(),
            value: settings.unit.clone(),
        }),
    }
}

impl MatchingSettings {
    /// Parse settings from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Decode legacy encodings and validate
    pub fn to_config(&self) -> std::result::Result<MatchingConfig, ConfigError> {
        let drug_count = self
            .drug_count
            .as_ref()
            .map(|settings| -> std::result::Result<_, ConfigError> {
                Ok(DrugCountMatch {
                    window: DayWindow::parse(
                        "drug count window",
                        &settings.window_start,
                        &settings.window_end,
                    )?,
                    drugs: settings.drugs.clone(),
                })
            })
            .transpose()?;

        let atc_classes = self
            .atc_classes
            .as_ref()
            .map(|settings| -> std::result::Result<_, ConfigError> {
                let level = u8::try_from(settings.level)
                    .ok()
                    .filter(|level| (1..=7).contains(level))
                    .ok_or(ConfigError::AtcLevelOutOfRange(settings.level))?;
                Ok(AtcClassMatch {
                    window: DayWindow::parse(
                        "ATC class window",
                        &settings.window_start,
                        &settings.window_end,
                    )?,
                    level,
                })
            })
            .transpose()?;

        let event_count_rules = self
            .event_count_rules
            .iter()
            .map(|rule| -> std::result::Result<_, ConfigError> {
                Ok(EventCountRule {
                    label: rule.label.clone(),
                    event_types: rule.event_types.clone(),
                    min: rule.min,
                    max: rule.max,
                    tolerance: rule.tolerance,
                    window: event_window(&rule.label, &rule.window_start, &rule.window_end)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let config = MatchingConfig {
            event_types: self.event_types.clone(),
            first_event_only: self.first_event_only,
            controls_per_case: ControlQuota::from_legacy(self.controls_per_case)?,
            controls_never_case: self.controls_never_case,
            match_on_practice: self.match_on_practice,
            match_on_gender: self.match_on_gender,
            birth_date: BirthDateMatch::from_legacy(self.max_difference_between_birth_dates)?,
            cohort_time: self.cohort_time.as_ref().map(cohort_time).transpose()?,
            drug_count,
            atc_classes,
            case_set_prefix: self.case_set_prefix.clone(),
            event_count_rules,
            random_seed: self.random_seed,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build the configured exclusion criteria
    pub fn exclusion_criteria(&self) -> std::result::Result<CriteriaSet, ConfigError> {
        let mut set = CriteriaSet::default();
        for exclusion in &self.exclusions {
            if exclusion.event_types.is_empty() {
                return Err(ConfigError::NoEventTypes(exclusion.label.clone()));
            }
            set.push(Box::new(EventHistoryExclusion::new(
                exclusion.label.clone(),
                exclusion.event_types.clone(),
                event_window(&exclusion.label, &exclusion.window_start, &exclusion.window_end)?,
            )));
        }
        Ok(set)
    }

    /// Build the configured covariates
    pub fn covariates(&self) -> std::result::Result<CovariateSet, ConfigError> {
        let mut set = CovariateSet::default();
        for covariate in &self.covariates {
            match covariate {
                CovariateSettings::EventCount {
                    label,
                    event_types,
                    window_start,
                    window_end,
                } => {
                    if event_types.is_empty() {
                        return Err(ConfigError::NoEventTypes(label.clone()));
                    }
                    set.push(Box::new(EventCountCovariate::new(
                        label.clone(),
                        event_types.clone(),
                        event_window(label, window_start, window_end)?,
                    )));
                }
                CovariateSettings::Measurement {
                    label,
                    measurement_type,
                    lookback_days,
                } => {
                    let mut measurement = MeasurementCovariate::new(label.clone(), measurement_type.clone());
                    if let Some(days) = *lookback_days {
                        measurement = measurement.with_lookback(days);
                    }
                    set.push(Box::new(measurement));
                }
                CovariateSettings::Age { label } => {
                    set.push(Box::new(AgeCovariate::new(label.clone())));
                }
            }
        }
        Ok(set)
    }
}

impl TryFrom<&MatchingSettings> for MatchingConfig {
    type Error = ConfigError;

    fn try_from(settings: &MatchingSettings) -> std::result::Result<Self, Self::Error> {
        settings.to_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::matching::criteria::{WindowEnd, WindowStart};
    use crate::common::traits::{CovariateProvider, ExclusionCriteria};

    const SETTINGS: &str = r#"{
        "event_types": ["MI", "I21*"],
        "first_event_only": true,
        "controls_per_case": -1,
        "max_difference_between_birth_dates": -2,
        "cohort_time": { "tolerance": 30, "unit": "days" },
        "drug_count": { "window_start": "-365", "window_end": "0" },
        "atc_classes": { "window_start": "MIN", "window_end": "-1", "level": 3 },
        "case_set_prefix": "SET_",
        "event_count_rules": [
            { "label": "visits", "event_types": ["GP"], "tolerance": 2,
              "window_start": "CohortStart", "window_end": "Index" }
        ],
        "random_seed": 42,
        "exclusions": [ { "label": "cancer", "event_types": ["CA*"] } ],
        "covariates": [
            { "kind": "age", "label": "age" },
            { "kind": "measurement", "label": "bmi", "measurement_type": "BMI", "lookback_days": 365 }
        ]
    }"#;

    #[test]
    fn test_full_settings() {
        let settings = MatchingSettings::from_json_str(SETTINGS).unwrap();
        let config = settings.to_config().unwrap();

        assert_eq!(config.controls_per_case, ControlQuota::Unbounded);
        assert_eq!(config.birth_date, BirthDateMatch::SameYear);
        assert_eq!(config.cohort_time, Some(CohortTimeMatch::StartWithinDays(30)));
        assert_eq!(
            config.drug_count.as_ref().map(|d| d.window),
            Some(DayWindow::new(Some(-365), Some(0)))
        );
        assert_eq!(config.atc_classes.as_ref().map(|a| a.level), Some(3));
        assert_eq!(
            config.event_count_rules[0].window,
            EventWindow::new(WindowStart::CohortStart, WindowEnd::Index)
        );
        assert_eq!(config.random_seed, Some(42));

        assert_eq!(settings.exclusion_criteria().unwrap().labels(), vec!["cancer"]);
        assert_eq!(settings.covariates().unwrap().labels(), vec!["age", "bmi"]);
    }

    #[test]
    fn test_defaults() {
        let config = MatchingSettings::from_json_str("{}").unwrap().to_config().unwrap();
        assert_eq!(config, MatchingConfig::default());
    }

    #[test]
    fn test_invalid_settings() {
        let bad = |json: &str| MatchingSettings::from_json_str(json).unwrap().to_config();

        assert!(matches!(
            bad(r#"{ "controls_per_case": -2 }"#),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            bad(r#"{ "atc_classes": { "window_start": "0", "window_end": "1", "level": 8 } }"#),
            Err(ConfigError::AtcLevelOutOfRange(8))
        ));
        assert!(matches!(
            bad(r#"{ "cohort_time": { "tolerance": 5, "unit": "weeks" } }"#),
            Err(ConfigError::UnknownKeyword { .. })
        ));
        assert!(matches!(
            bad(r#"{ "cohort_time": { "tolerance": -5, "unit": "percent" } }"#),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            bad(r#"{ "event_count_rules": [ { "label": "x", "event_types": ["A"], "window_start": "soon" } ] }"#),
            Err(ConfigError::InvalidWindow { .. })
        ));
        assert!(matches!(
            bad(r#"{ "event_count_rules": [ { "label": "x", "event_types": ["A"], "min": 3, "max": 1 } ] }"#),
            Err(ConfigError::MinAboveMax { .. })
        ));
        assert!(matches!(
            bad(r#"{ "event_count_rules": [
                { "label": "x", "event_types": ["A"] },
                { "label": "x", "event_types": ["B"] } ] }"#),
            Err(ConfigError::DuplicateLabel(_))
        ));
        assert!(MatchingSettings::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_inverted_windows() {
        let bad = |json: &str| MatchingSettings::from_json_str(json).unwrap();

        assert!(matches!(
            bad(r#"{ "drug_count": { "window_start": "100", "window_end": "-100" } }"#).to_config(),
            Err(ConfigError::InvalidWindow { .. })
        ));
        assert!(matches!(
            bad(r#"{ "atc_classes": { "window_start": "0", "window_end": "0", "level": 3 } }"#).to_config(),
            Err(ConfigError::InvalidWindow { .. })
        ));
        assert!(matches!(
            bad(r#"{ "event_count_rules": [ { "label": "x", "event_types": ["A"],
                "window_start": "100", "window_end": "-100" } ] }"#)
            .to_config(),
            Err(ConfigError::InvalidWindow { .. })
        ));
        assert!(matches!(
            bad(r#"{ "exclusions": [ { "label": "cancer", "event_types": ["CA*"],
                "window_start": "10", "window_end": "-10" } ] }"#)
            .exclusion_criteria(),
            Err(ConfigError::InvalidWindow { .. })
        ));

        let open_ended = bad(r#"{ "drug_count": { "window_start": "MIN", "window_end": "-100" } }"#);
        assert!(open_ended.to_config().is_ok());
    }
}
