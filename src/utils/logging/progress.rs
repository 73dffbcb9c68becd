//! Progress bars for the matching passes

use indicatif::{ProgressBar, ProgressStyle};

/// Template of a pass bar
pub const PASS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} patients ({per_sec}) {msg}";

/// Patients between two refreshes of the running tally
pub const TALLY_INTERVAL: usize = 1000;

/// Bar over a pass of `patients` patients, hidden unless `visible`
#[must_use]
pub fn pass_progress_bar(patients: usize, description: &str, visible: bool) -> ProgressBar {
    let pb = if visible {
        let style = ProgressStyle::with_template(PASS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        ProgressBar::new(patients as u64).with_style(style)
    } else {
        ProgressBar::hidden()
    };
    pb.with_message(description.to_string())
}

/// Advance past one patient, refreshing the tally every [`TALLY_INTERVAL`] patients
pub fn advance(pb: &ProgressBar, position: usize, tally: impl FnOnce() -> String) {
    pb.inc(1);
    if position % TALLY_INTERVAL == 0 {
        pb.set_message(tally());
    }
}

/// Finish a pass bar with a completion message
pub fn finish_pass(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(message.to_string());
}
