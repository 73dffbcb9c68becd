//! Data models for patients and their clinical records

pub mod clinical;
pub mod patient;
pub mod types;

pub use clinical::{Event, Measurement, Prescription};
pub use patient::Patient;
pub use types::{CohortInterval, Gender};
