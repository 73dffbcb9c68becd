//! Record sinks
//!
//! The engine hands every case and control record to a
//! [`RecordSink`](crate::common::traits::RecordSink) as soon as it is produced.
//! [`VecSink`] keeps records in memory; [`RecordBatchSink`] additionally
//! converts them into an Arrow record batch for writing.

pub mod batch;
pub mod collect;

pub use batch::RecordBatchSink;
pub use collect::VecSink;
