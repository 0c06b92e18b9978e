//! Types and traits for recording training metrics.
//!
//! * [`Record`] - key-value pairs of [`RecordValue`]s
//! * [`Recorder`] - writes a record to an output destination
//! * [`AggregateRecorder`] - stores records and writes aggregated values on flush
//! * [`RecordStorage`] - aggregates stored records
//! * [`BufferedRecorder`] - keeps records in memory
//! * [`NullRecorder`] - discards records
//!
//! ```rust
//! use tdrl_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("eps", RecordValue::Scalar(0.5));
//! record.insert("obs", RecordValue::Array1(vec![1.0, 2.0]));
//! assert_eq!(record.get_scalar("eps").unwrap(), 0.5);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::{AggregateRecorder, Recorder};
pub use storage::RecordStorage;
