//! Dated clinical records attached to a patient
//!
//! Events, prescriptions and measurements are owned by their patient and kept
//! in ascending date order.

use serde::{Deserialize, Serialize};

/// A diagnosis or other coded clinical event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type code
    #[serde(rename = "type")]
    pub event_type: String,
    /// Day of the event
    pub date: i32,
    /// Optional sub-code
    #[serde(default)]
    pub code: Option<String>,
}

impl Event {
    /// Create a new event without a sub-code
    #[must_use]
    pub fn new(event_type: impl Into<String>, date: i32) -> Self {
        Self {
            event_type: event_type.into(),
            date,
            code: None,
        }
    }

    /// Attach a sub-code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// A drug dispensation covering `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    /// ATC code of the dispensed drug
    pub atc: String,
    /// First day of exposure
    pub start: i32,
    /// First day after exposure
    pub end: i32,
    /// Dose, if recorded
    #[serde(default)]
    pub dose: Option<f64>,
    /// Indication, if recorded
    #[serde(default)]
    pub indication: Option<String>,
}

impl Prescription {
    /// Create a prescription starting at `start` lasting `duration` days
    #[must_use]
    pub fn new(atc: impl Into<String>, start: i32, duration: i32) -> Self {
        Self {
            atc: atc.into(),
            start,
            end: start.saturating_add(duration),
            dose: None,
            indication: None,
        }
    }

    /// Whether `[start, end)` intersects the half-open range `[from, to)`
    #[must_use]
    pub fn overlaps(&self, from: i64, to: i64) -> bool {
        i64::from(self.start) < to && i64::from(self.end) > from
    }
}

/// A clinical measurement such as a lab value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Measurement type code
    #[serde(rename = "type")]
    pub measurement_type: String,
    /// Day of the measurement
    pub date: i32,
    /// Recorded value
    pub value: String,
}

impl Measurement {
    /// Create a new measurement
    #[must_use]
    pub fn new(measurement_type: impl Into<String>, date: i32, value: impl Into<String>) -> Self {
        Self {
            measurement_type: measurement_type.into(),
            date,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_with_sub_code() {
        let event: Event = serde_json::from_str(r#"{ "type": "MI", "date": 12, "code": "I21.0" }"#).unwrap();
        assert_eq!(event, Event::new("MI", 12).with_code("I21.0"));

        let bare: Event = serde_json::from_str(r#"{ "type": "MI", "date": 12 }"#).unwrap();
        assert!(bare.code.is_none());
    }

    #[test]
    fn test_prescription_overlap_is_half_open() {
        let prescription = Prescription::new("N02BE01", 10, 5);
        assert_eq!(prescription.end, 15);
        assert!(prescription.overlaps(14, 20));
        assert!(!prescription.overlaps(15, 20));
        assert!(!prescription.overlaps(0, 10));
    }
}
