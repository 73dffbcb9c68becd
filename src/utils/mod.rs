//! Shared utilities

pub mod dates;
pub mod logging;
