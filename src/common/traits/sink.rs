//! Output sink trait

use crate::algorithm::matching::types::MatchRecord;
use crate::error::Result;

/// Receives case and control records as the engine produces them
///
/// A failing sink aborts the run; the engine never retries.
pub trait RecordSink {
    /// Accept one record
    fn emit(&mut self, record: MatchRecord) -> Result<()>;
}
