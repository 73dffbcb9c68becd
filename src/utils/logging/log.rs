//! Logging helpers for file input and run reports

use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

/// Log that `what` is being read from `path`
pub fn log_read_start(what: &str, path: &Path) {
    log::info!("Reading {what} from {}", path.display());
}

/// Log how many `what` were read from `path` and how long it took
pub fn log_read_complete(what: &str, path: &Path, items: usize, elapsed: Duration) {
    log::info!("Read {items} {what} from {} in {elapsed:.2?}", path.display());
}

/// Log a multi-line report one line at a time under a title
pub fn log_report(title: &str, report: &impl Display) {
    log::info!("{title}");
    for line in report.to_string().lines() {
        log::info!("  {line}");
    }
}
