//! Remote time-series sink
//!
//! The batch writer only depends on the `MetricsSink` trait; the InfluxDB
//! HTTP client is the production implementation.

pub mod backend;
pub mod influx;

pub use backend::{BatchConfig, MetricsSink, PointBatch, Precision, SinkError};
pub use influx::{HttpConfig, InfluxHttpClient};
