//! Windowed exposure and event counting
//!
//! Pure functions evaluated once to build a case fingerprint and again for
//! every candidate control. Records are sorted by date, so each scan stops as
//! soon as it passes the upper edge of the window.

use crate::algorithm::matching::criteria::{AtcClassMatch, DrugCountMatch, EventCountRule, EventWindow};
use crate::models::types::any_code_matches;
use crate::models::{CohortInterval, Event, Patient};
use rustc_hash::FxHashSet;

/// Set of truncated ATC codes
pub type AtcClassSet = FxHashSet<String>;

/// Number of distinct drugs with a prescription overlapping the window
///
/// Only drugs whose ATC code starts with one of the configured prefixes are
/// counted; an empty prefix list counts every drug.
#[must_use]
pub fn drug_count(patient: &Patient, anchor: i32, matching: &DrugCountMatch) -> u32 {
    let (from, to) = matching.window.resolve(anchor);
    let mut drugs: FxHashSet<&str> = FxHashSet::default();

    for prescription in &patient.prescriptions {
        if i64::from(prescription.start) >= to {
            break;
        }
        if !prescription.overlaps(from, to) {
            continue;
        }
        if matching.drugs.is_empty()
            || matching
                .drugs
                .iter()
                .any(|prefix| prescription.atc.starts_with(prefix.as_str()))
        {
            drugs.insert(prescription.atc.as_str());
        }
    }

    u32::try_from(drugs.len()).unwrap_or(u32::MAX)
}

/// ATC classes of prescriptions starting strictly inside the window
///
/// Codes shorter than the configured level are ignored.
#[must_use]
pub fn atc_classes(patient: &Patient, anchor: i32, matching: &AtcClassMatch) -> AtcClassSet {
    let (from, to) = matching.window.resolve(anchor);
    let level = usize::from(matching.level);

    patient
        .prescriptions
        .iter()
        .take_while(|prescription| i64::from(prescription.start) < to)
        .filter(|prescription| i64::from(prescription.start) > from)
        .filter_map(|prescription| prescription.atc.get(..level))
        .map(str::to_string)
        .collect()
}

/// Set equality spelled out as equal size and full containment
#[must_use]
pub fn same_classes(case: &AtcClassSet, control: &AtcClassSet) -> bool {
    case.len() == control.len() && case.iter().all(|class| control.contains(class))
}

/// Count events matching `patterns` inside an event window
#[must_use]
pub fn count_events(
    events: &[Event],
    patterns: &[String],
    window: &EventWindow,
    anchor: i32,
    cohort: CohortInterval,
) -> u32 {
    let (lo, hi) = window.resolve(anchor, cohort);
    let count = events
        .iter()
        .take_while(|event| i64::from(event.date) < hi)
        .filter(|event| i64::from(event.date) > lo)
        .filter(|event| any_code_matches(patterns, &event.event_type))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// A patient's count under an event-count rule
#[must_use]
pub fn event_count(patient: &Patient, anchor: i32, cohort: CohortInterval, rule: &EventCountRule) -> u32 {
    count_events(&patient.events, &rule.event_types, &rule.window, anchor, cohort)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::matching::criteria::{DayWindow, WindowEnd, WindowStart};
    use crate::models::{Gender, Prescription};

    fn patient() -> Patient {
        Patient::new("P1", 0, Gender::Female, "PR1", CohortInterval::new(0, 1000))
    }

    #[test]
    fn test_drug_count_distinct_and_filtered() {
        let patient = patient().with_prescriptions([
            Prescription::new("N02BE01", 400, 30),
            Prescription::new("N02BE01", 450, 30),
            Prescription::new("C07AB02", 460, 30),
            Prescription::new("A10BA02", 480, 30),
            Prescription::new("C09AA05", 600, 30),
        ]);
        let window = DayWindow::new(Some(-100), Some(0));

        let all = DrugCountMatch { window, drugs: Vec::new() };
        assert_eq!(drug_count(&patient, 500, &all), 3);

        let cardio = DrugCountMatch { window, drugs: vec!["C".to_string()] };
        assert_eq!(drug_count(&patient, 500, &cardio), 1);
    }

    #[test]
    fn test_drug_count_overlap_edges() {
        // [390, 400) ends exactly where the window [400, 500) starts
        let patient = patient().with_prescriptions([
            Prescription::new("A01", 390, 10),
            Prescription::new("B01", 399, 2),
            Prescription::new("C01", 500, 5),
        ]);
        let matching = DrugCountMatch {
            window: DayWindow::new(Some(-100), Some(0)),
            drugs: Vec::new(),
        };
        assert_eq!(drug_count(&patient, 500, &matching), 1);

        let unbounded = DrugCountMatch {
            window: DayWindow::new(None, None),
            drugs: Vec::new(),
        };
        assert_eq!(drug_count(&patient, 500, &unbounded), 3);
    }

    #[test]
    fn test_atc_classes_truncate_and_skip_short_codes() {
        let patient = patient().with_prescriptions([
            Prescription::new("N02BE01", 410, 10),
            Prescription::new("N02AA01", 420, 10),
            Prescription::new("C0", 430, 10),
            Prescription::new("C07AB02", 400, 10),
        ]);
        let matching = AtcClassMatch {
            window: DayWindow::new(Some(-100), Some(0)),
            level: 3,
        };
        let classes = atc_classes(&patient, 500, &matching);
        let expected: AtcClassSet = ["N02".to_string()].into_iter().collect();
        assert!(same_classes(&classes, &expected));
    }

    #[test]
    fn test_same_classes_rejects_overlap() {
        let a: AtcClassSet = ["N02".to_string(), "C07".to_string()].into_iter().collect();
        let b: AtcClassSet = ["N02".to_string(), "A10".to_string()].into_iter().collect();
        let c: AtcClassSet = ["N02".to_string()].into_iter().collect();
        assert!(same_classes(&a, &a.clone()));
        assert!(!same_classes(&a, &b));
        assert!(!same_classes(&a, &c));
        assert!(!same_classes(&c, &a));
    }

    #[test]
    fn test_event_count_window_edges() {
        let events = vec![
            Event::new("GP", 100),
            Event::new("GP", 300),
            Event::new("GP", 500),
            Event::new("GP", 500),
            Event::new("HOSP", 510),
            Event::new("GP", 999),
        ];
        let codes = vec!["GP".to_string()];
        let cohort = CohortInterval::new(100, 999);

        let anchor_only = EventWindow::new(WindowStart::Index, WindowEnd::AnchorOnly);
        assert_eq!(count_events(&events, &codes, &anchor_only, 500, cohort), 2);

        let history = EventWindow::new(WindowStart::CohortStart, WindowEnd::Index);
        assert_eq!(count_events(&events, &codes, &history, 500, cohort), 2);

        let offset = EventWindow::new(WindowStart::Offset(-200), WindowEnd::Index);
        assert_eq!(count_events(&events, &codes, &offset, 500, cohort), 0);

        let follow_up = EventWindow::new(WindowStart::Index, WindowEnd::CohortEnd);
        assert_eq!(count_events(&events, &codes, &follow_up, 500, cohort), 2);

        let everything = EventWindow::new(WindowStart::Unbounded, WindowEnd::Unbounded);
        assert_eq!(count_events(&events, &codes, &everything, 500, cohort), 5);
    }
}
