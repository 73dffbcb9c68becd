//! Matching criteria definitions for case-control matching
//!
//! This module holds the validated, immutable configuration consumed by the
//! case identifier and the control matcher. Window tokens and legacy integer
//! codes are resolved into enums here, once, so that evaluation never
//! re-parses anything.

use crate::error::ConfigError;
use crate::models::CohortInterval;
use rustc_hash::FxHashSet;
use std::fmt;
use std::str::FromStr;

/// How many controls to find for each case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlQuota {
    /// At most this many controls
    Bounded(u32),
    /// Every eligible candidate becomes a control
    Unbounded,
}

impl ControlQuota {
    /// Decode the legacy `controlsPerCase` value where `-1` means unbounded
    pub fn from_legacy(value: i64) -> Result<Self, ConfigError> {
        match value {
            -1 => Ok(Self::Unbounded),
            v if v >= 0 => u32::try_from(v).map(Self::Bounded).map_err(|_| {
                ConfigError::InvalidNumber {
                    field: "controls_per_case".to_string(),
                    value: v.to_string(),
                    reason: "too large".to_string(),
                }
            }),
            v => Err(ConfigError::InvalidNumber {
                field: "controls_per_case".to_string(),
                value: v.to_string(),
                reason: "must be -1 (unbounded) or a non-negative count".to_string(),
            }),
        }
    }

    /// Whether `found` controls fill the quota
    #[must_use]
    pub const fn is_met(self, found: u32) -> bool {
        match self {
            Self::Bounded(quota) => found >= quota,
            Self::Unbounded => false,
        }
    }
}

impl fmt::Display for ControlQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(quota) => write!(f, "{quota}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Birth-date proximity required between case and control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BirthDateMatch {
    /// No birth-date check
    Disabled,
    /// Control birth day in `(case - n, case + n]`, or on the case's birth day
    WithinDays(u32),
    /// Same calendar year of birth
    SameYear,
    /// Same calendar year and month of birth
    SameYearAndMonth,
}

impl BirthDateMatch {
    /// Decode the legacy `maxDifferenceBetweenBirthDates` code
    ///
    /// `-1` disables the check, `-2` requires the same year, anything at or
    /// below `-3` requires the same year and month, and a non-negative value
    /// is a tolerance in days.
    pub fn from_legacy(value: i64) -> Result<Self, ConfigError> {
        match value {
            -1 => Ok(Self::Disabled),
            -2 => Ok(Self::SameYear),
            v if v <= -3 => Ok(Self::SameYearAndMonth),
            v => u32::try_from(v)
                .map(Self::WithinDays)
                .map_err(|_| ConfigError::InvalidNumber {
                    field: "max_difference_between_birth_dates".to_string(),
                    value: v.to_string(),
                    reason: "too large".to_string(),
                }),
        }
    }

    /// Check a candidate's birth against the case's birth
    ///
    /// Birth dates are day numbers; year/month pairs are their calendar parts.
    /// A birth without a calendar date never matches on year or month.
    #[must_use]
    pub fn matches(
        self,
        case_birth: i32,
        case_year_month: Option<(i32, u32)>,
        control_birth: i32,
        control_year_month: Option<(i32, u32)>,
    ) -> bool {
        match self {
            Self::Disabled => true,
            Self::WithinDays(days) => {
                let days = i64::from(days);
                let case_birth = i64::from(case_birth);
                let control_birth = i64::from(control_birth);
                control_birth == case_birth
                    || (control_birth > case_birth - days && control_birth <= case_birth + days)
            }
            Self::SameYear => matches!(
                (case_year_month, control_year_month),
                (Some((case_year, _)), Some((control_year, _))) if case_year == control_year
            ),
            Self::SameYearAndMonth => case_year_month.is_some() && case_year_month == control_year_month,
        }
    }
}

/// Comparison of cohort timing between case and control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CohortTimeMatch {
    /// Cohort start dates at most this many days apart
    StartWithinDays(u32),
    /// Cohort durations differ by at most this percentage of the case duration
    DurationWithinPercent(f64),
}

impl CohortTimeMatch {
    /// Whether the control's cohort is close enough to the case's
    #[must_use]
    pub fn matches(self, case: CohortInterval, control: CohortInterval) -> bool {
        match self {
            Self::StartWithinDays(days) => {
                (i64::from(case.start) - i64::from(control.start)).abs() <= i64::from(days)
            }
            Self::DurationWithinPercent(percent) => {
                let case_duration = case.duration() as f64;
                let difference = (case_duration - control.duration() as f64).abs();
                difference <= case_duration * percent / 100.0
            }
        }
    }
}

/// Lower bound of an event-count window, exclusive after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStart {
    /// The anchor date itself counts
    Index,
    /// The cohort start itself counts
    CohortStart,
    /// `anchor + offset`, exclusive
    Offset(i32),
    /// No lower bound
    Unbounded,
}

/// Upper bound of an event-count window, exclusive after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// Up to, not including, the anchor date
    Index,
    /// Up to, not including, the cohort end
    CohortEnd,
    /// `anchor + offset`, exclusive
    Offset(i32),
    /// No upper bound
    Unbounded,
    /// Not specified: the window closes right after the anchor date
    AnchorOnly,
}

fn parse_offset(field: &str, token: &str) -> Result<i32, ConfigError> {
    token
        .trim_start_matches('+')
        .parse::<i32>()
        .map_err(|e| ConfigError::InvalidWindow {
            field: field.to_string(),
            token: token.to_string(),
            reason: e.to_string(),
        })
}

impl FromStr for WindowStart {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        match token.to_ascii_lowercase().as_str() {
            "index" => Ok(Self::Index),
            "cohortstart" => Ok(Self::CohortStart),
            "" | "min" => Ok(Self::Unbounded),
            "cohortend" => Err(ConfigError::InvalidWindow {
                field: "window start".to_string(),
                token: token.to_string(),
                reason: "cohort end cannot open a window".to_string(),
            }),
            _ => parse_offset("window start", token).map(Self::Offset),
        }
    }
}

impl FromStr for WindowEnd {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        match token.to_ascii_lowercase().as_str() {
            "index" => Ok(Self::Index),
            "cohortend" => Ok(Self::CohortEnd),
            "max" => Ok(Self::Unbounded),
            "" => Ok(Self::AnchorOnly),
            "cohortstart" => Err(ConfigError::InvalidWindow {
                field: "window end".to_string(),
                token: token.to_string(),
                reason: "cohort start cannot close a window".to_string(),
            }),
            _ => parse_offset("window end", token).map(Self::Offset),
        }
    }
}

/// Event-count window relative to an anchor date and a cohort interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    /// Lower bound
    pub start: WindowStart,
    /// Upper bound
    pub end: WindowEnd,
}

impl EventWindow {
    /// Create a new window
    #[must_use]
    pub const fn new(start: WindowStart, end: WindowEnd) -> Self {
        Self { start, end }
    }

    /// Reject a window whose offset start is not before its offset end
    pub fn check(&self, field: &str) -> Result<(), ConfigError> {
        match (self.start, self.end) {
            (WindowStart::Offset(start), WindowEnd::Offset(end)) => check_offsets(field, start, end),
            _ => Ok(()),
        }
    }

    /// Resolve to exclusive numeric bounds: a day `d` is inside when `lo < d < hi`
    #[must_use]
    pub fn resolve(&self, anchor: i32, cohort: CohortInterval) -> (i64, i64) {
        let anchor = i64::from(anchor);
        let lo = match self.start {
            WindowStart::Index => anchor - 1,
            WindowStart::CohortStart => i64::from(cohort.start) - 1,
            WindowStart::Offset(offset) => anchor + i64::from(offset),
            WindowStart::Unbounded => i64::MIN,
        };
        let hi = match self.end {
            WindowEnd::Index => anchor,
            WindowEnd::CohortEnd => i64::from(cohort.end),
            WindowEnd::Offset(offset) => anchor + i64::from(offset),
            WindowEnd::Unbounded => i64::MAX,
            WindowEnd::AnchorOnly => anchor + 1,
        };
        (lo, hi)
    }
}

/// Window of days relative to an anchor; `None` is unbounded on that side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// Offset of the lower edge
    pub start: Option<i32>,
    /// Offset of the upper edge
    pub end: Option<i32>,
}

impl DayWindow {
    /// Create a new window from offsets
    #[must_use]
    pub const fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    /// Parse a window from two tokens, `MIN`/`MAX` meaning unbounded
    pub fn parse(field: &str, start: &str, end: &str) -> Result<Self, ConfigError> {
        let parse_edge = |token: &str, sentinel: &str| -> Result<Option<i32>, ConfigError> {
            let token = token.trim();
            if token.eq_ignore_ascii_case(sentinel) {
                Ok(None)
            } else {
                parse_offset(field, token).map(Some)
            }
        };
        Ok(Self {
            start: parse_edge(start, "min")?,
            end: parse_edge(end, "max")?,
        })
    }

    /// Reject a window whose start is not before its end
    pub fn check(&self, field: &str) -> Result<(), ConfigError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => check_offsets(field, start, end),
            _ => Ok(()),
        }
    }

    /// Resolve to absolute bounds around `anchor`
    #[must_use]
    pub fn resolve(&self, anchor: i32) -> (i64, i64) {
        let anchor = i64::from(anchor);
        (
            self.start.map_or(i64::MIN, |offset| anchor + i64::from(offset)),
            self.end.map_or(i64::MAX, |offset| anchor + i64::from(offset)),
        )
    }
}

fn check_offsets(field: &str, start: i32, end: i32) -> Result<(), ConfigError> {
    if start < end {
        return Ok(());
    }
    Err(ConfigError::InvalidWindow {
        field: field.to_string(),
        token: format!("{start}..{end}"),
        reason: "window start must come before its end".to_string(),
    })
}

/// Match on the number of distinct drugs the patient was exposed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugCountMatch {
    /// Window relative to the index date
    pub window: DayWindow,
    /// ATC prefixes to count; empty counts every drug
    pub drugs: Vec<String>,
}

/// Match on the set of ATC classes the patient was exposed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtcClassMatch {
    /// Window relative to the index date
    pub window: DayWindow,
    /// Number of ATC characters kept (1-7)
    pub level: u8,
}

/// Which side of a rule's bounds a count fell on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundViolation {
    /// Below the minimum
    TooFew,
    /// Above the maximum
    TooMany,
}

/// A "match on event count" rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCountRule {
    /// Label used in output columns and attrition reasons
    pub label: String,
    /// Event codes counted by the rule
    pub event_types: Vec<String>,
    /// Minimum count required of both case and control
    pub min: Option<u32>,
    /// Maximum count allowed for both case and control
    pub max: Option<u32>,
    /// Allowed absolute difference; `None` requires presence equivalence
    pub tolerance: Option<u32>,
    /// Counting window
    pub window: EventWindow,
}

impl EventCountRule {
    /// Create a rule with no bounds and presence-equivalence matching
    #[must_use]
    pub fn new(label: impl Into<String>, event_types: Vec<String>, window: EventWindow) -> Self {
        Self {
            label: label.into(),
            event_types,
            min: None,
            max: None,
            tolerance: None,
            window,
        }
    }

    /// Set the minimum count
    #[must_use]
    pub const fn with_min(mut self, min: u32) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the maximum count
    #[must_use]
    pub const fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }

    /// Set the allowed difference between case and control counts
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: u32) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Check a count against the rule's minimum and maximum
    pub fn check_bounds(&self, count: u32) -> Result<(), BoundViolation> {
        if self.min.is_some_and(|min| count < min) {
            return Err(BoundViolation::TooFew);
        }
        if self.max.is_some_and(|max| count > max) {
            return Err(BoundViolation::TooMany);
        }
        Ok(())
    }

    /// Attrition reason for a bound violation
    #[must_use]
    pub fn rejection_reason(&self, violation: BoundViolation) -> String {
        match violation {
            BoundViolation::TooFew => format!("not enough events of {}", self.label),
            BoundViolation::TooMany => format!("too many events of {}", self.label),
        }
    }

    /// Compare a control's count with the case's count
    #[must_use]
    pub fn counts_match(&self, case_count: u32, control_count: u32) -> bool {
        match self.tolerance {
            None => (case_count > 0) == (control_count > 0),
            Some(tolerance) => case_count.abs_diff(control_count) <= tolerance,
        }
    }
}

/// Validated configuration for the matching engine
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Event types of interest; empty means every type
    pub event_types: Vec<String>,
    /// Only the first occurrence of each event type per cohort scan is a candidate
    pub first_event_only: bool,
    /// Controls to find per case
    pub controls_per_case: ControlQuota,
    /// Patients that became cases are never used as controls
    pub controls_never_case: bool,
    /// Require the same practice
    pub match_on_practice: bool,
    /// Require the same gender
    pub match_on_gender: bool,
    /// Birth-date proximity
    pub birth_date: BirthDateMatch,
    /// Cohort timing comparison
    pub cohort_time: Option<CohortTimeMatch>,
    /// Drug-count fingerprint
    pub drug_count: Option<DrugCountMatch>,
    /// ATC-class fingerprint
    pub atc_classes: Option<AtcClassMatch>,
    /// Prefix of the event type carrying an external case-set id
    pub case_set_prefix: Option<String>,
    /// Event-count rules, evaluated in order
    pub event_count_rules: Vec<EventCountRule>,
    /// Seed for shuffling the processing order of the population
    pub random_seed: Option<u64>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            event_types: Vec::new(),
            first_event_only: false,
            controls_per_case: ControlQuota::Bounded(1),
            controls_never_case: false,
            match_on_practice: false,
            match_on_gender: false,
            birth_date: BirthDateMatch::Disabled,
            cohort_time: None,
            drug_count: None,
            atc_classes: None,
            case_set_prefix: None,
            event_count_rules: Vec::new(),
            random_seed: None,
        }
    }
}

impl MatchingConfig {
    /// Create a new builder for constructing a matching configuration
    #[must_use]
    pub fn builder() -> MatchingConfigBuilder {
        MatchingConfigBuilder::new()
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_types.iter().any(|code| code.trim().is_empty()) {
            return Err(ConfigError::EmptyCode("event types of interest".to_string()));
        }

        if let Some(CohortTimeMatch::DurationWithinPercent(percent)) = self.cohort_time {
            if !percent.is_finite() || percent < 0.0 {
                return Err(ConfigError::InvalidNumber {
                    field: "cohort_time".to_string(),
                    value: percent.to_string(),
                    reason: "percentage must be a non-negative number".to_string(),
                });
            }
        }

        if let Some(drug_count) = &self.drug_count {
            if drug_count.drugs.iter().any(|drug| drug.trim().is_empty()) {
                return Err(ConfigError::EmptyCode("drug count list".to_string()));
            }
            drug_count.window.check("drug count window")?;
        }

        if let Some(atc) = &self.atc_classes {
            if !(1..=7).contains(&atc.level) {
                return Err(ConfigError::AtcLevelOutOfRange(i64::from(atc.level)));
            }
            atc.window.check("ATC class window")?;
        }

        if self
            .case_set_prefix
            .as_deref()
            .is_some_and(|prefix| prefix.is_empty())
        {
            return Err(ConfigError::EmptyCode("case set prefix".to_string()));
        }

        let mut labels = FxHashSet::default();
        for rule in &self.event_count_rules {
            if rule.event_types.is_empty() {
                return Err(ConfigError::NoEventTypes(rule.label.clone()));
            }
            if rule.event_types.iter().any(|code| code.trim().is_empty()) {
                return Err(ConfigError::EmptyCode(format!("rule '{}'", rule.label)));
            }
            if let (Some(min), Some(max)) = (rule.min, rule.max) {
                if min > max {
                    return Err(ConfigError::MinAboveMax {
                        label: rule.label.clone(),
                        min,
                        max,
                    });
                }
            }
            rule.window.check(&format!("rule '{}'", rule.label))?;
            if !labels.insert(rule.label.as_str()) {
                return Err(ConfigError::DuplicateLabel(rule.label.clone()));
            }
        }

        Ok(())
    }
}

impl fmt::Display for MatchingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matching Configuration:")?;
        if self.event_types.is_empty() {
            writeln!(f, "  - Event types: all")?;
        } else {
            writeln!(f, "  - Event types: {}", self.event_types.join(", "))?;
        }
        writeln!(f, "  - First event only: {}", self.first_event_only)?;
        writeln!(f, "  - Controls per case: {}", self.controls_per_case)?;
        writeln!(f, "  - Controls never case: {}", self.controls_never_case)?;
        writeln!(f, "  - Match on practice: {}", self.match_on_practice)?;
        writeln!(f, "  - Match on gender: {}", self.match_on_gender)?;
        writeln!(f, "  - Birth date: {:?}", self.birth_date)?;
        if let Some(cohort_time) = self.cohort_time {
            writeln!(f, "  - Cohort time: {cohort_time:?}")?;
        }
        if let Some(drug_count) = &self.drug_count {
            writeln!(
                f,
                "  - Drug count: window {:?}, {} drug prefixes",
                drug_count.window,
                drug_count.drugs.len()
            )?;
        }
        if let Some(atc) = &self.atc_classes {
            writeln!(f, "  - ATC classes: window {:?}, level {}", atc.window, atc.level)?;
        }
        if let Some(prefix) = &self.case_set_prefix {
            writeln!(f, "  - Case set prefix: {prefix}")?;
        }
        for rule in &self.event_count_rules {
            writeln!(
                f,
                "  - Event count '{}': min {:?}, max {:?}, tolerance {:?}",
                rule.label, rule.min, rule.max, rule.tolerance
            )?;
        }
        if let Some(seed) = self.random_seed {
            writeln!(f, "  - Random seed: {seed}")?;
        }
        Ok(())
    }
}

/// Builder for constructing a matching configuration
#[derive(Debug, Clone, Default)]
pub struct MatchingConfigBuilder {
    config: MatchingConfig,
}

impl MatchingConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MatchingConfig::default(),
        }
    }

    /// Set the event types of interest
    #[must_use]
    pub fn event_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.event_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Only consider the first occurrence of each event type
    #[must_use]
    pub const fn first_event_only(mut self, first_only: bool) -> Self {
        self.config.first_event_only = first_only;
        self
    }

    /// Set the control quota
    #[must_use]
    pub const fn controls_per_case(mut self, quota: ControlQuota) -> Self {
        self.config.controls_per_case = quota;
        self
    }

    /// Never use patients that became cases as controls
    #[must_use]
    pub const fn controls_never_case(mut self, never: bool) -> Self {
        self.config.controls_never_case = never;
        self
    }

    /// Set whether the same practice is required
    #[must_use]
    pub const fn match_on_practice(mut self, required: bool) -> Self {
        self.config.match_on_practice = required;
        self
    }

    /// Set whether the same gender is required
    #[must_use]
    pub const fn match_on_gender(mut self, required: bool) -> Self {
        self.config.match_on_gender = required;
        self
    }

    /// Set the birth-date matching mode
    #[must_use]
    pub const fn birth_date(mut self, mode: BirthDateMatch) -> Self {
        self.config.birth_date = mode;
        self
    }

    /// Set the cohort-time matching mode
    #[must_use]
    pub const fn cohort_time(mut self, mode: CohortTimeMatch) -> Self {
        self.config.cohort_time = Some(mode);
        self
    }

    /// Match on drug count over `window`, restricted to `drugs`
    #[must_use]
    pub fn drug_count(mut self, window: DayWindow, drugs: Vec<String>) -> Self {
        self.config.drug_count = Some(DrugCountMatch { window, drugs });
        self
    }

    /// Match on ATC classes over `window` at `level`
    #[must_use]
    pub const fn atc_classes(mut self, window: DayWindow, level: u8) -> Self {
        self.config.atc_classes = Some(AtcClassMatch { window, level });
        self
    }

    /// Match on an external case-set id carried by events starting with `prefix`
    #[must_use]
    pub fn case_set_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.case_set_prefix = Some(prefix.into());
        self
    }

    /// Add an event-count rule
    #[must_use]
    pub fn event_count_rule(mut self, rule: EventCountRule) -> Self {
        self.config.event_count_rules.push(rule);
        self
    }

    /// Shuffle the population with this seed before matching
    #[must_use]
    pub const fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = Some(seed);
        self
    }

    /// Validate and build the matching configuration
    pub fn build(self) -> Result<MatchingConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
