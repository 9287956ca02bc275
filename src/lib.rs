//! xystats - risk and exposure telemetry for two-leg trading strategies
//!
//! Snapshots of a strategy's accounts and positions are turned into metric
//! points by the [`recorder::Recorder`] and delivered to one or more
//! time-series endpoints by buffered [`writer::BatchWriter`]s.

pub mod config;
pub mod logging;
pub mod point;
pub mod recorder;
pub mod sink;
pub mod writer;

pub use config::{RecorderConfig, WriterConfig};
pub use point::{FieldValue, Point};
pub use recorder::{Recorder, RecorderError, Snapshot};
pub use writer::BatchWriter;
