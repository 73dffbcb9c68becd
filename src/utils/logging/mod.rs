//! Logging and progress utilities

pub mod log;
pub mod progress;

pub use log::{log_read_complete, log_read_start, log_report};
pub use progress::{advance, finish_pass, pass_progress_bar};
