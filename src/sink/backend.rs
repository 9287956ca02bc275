//! Sink backend trait for metric batches
//!
//! Defines the batch container and the interface for delivering it to a
//! remote store.

use crate::point::Point;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
        }
    }

    pub(crate) fn nanos_per_unit(&self) -> i64 {
        match self {
            Precision::Nanoseconds => 1,
            Precision::Microseconds => 1_000,
            Precision::Milliseconds => 1_000_000,
            Precision::Seconds => 1_000_000_000,
        }
    }
}

#[derive(Debug)]
pub enum SinkError {
    InvalidAddress(String),
    InvalidBatch(String),
    Transport(String),
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Transport(err.to_string())
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::InvalidAddress(e) => write!(f, "Invalid sink address: {}", e),
            SinkError::InvalidBatch(e) => write!(f, "Invalid batch: {}", e),
            SinkError::Transport(e) => write!(f, "Transport error: {}", e),
            SinkError::Status { status, body } => {
                write!(f, "Sink rejected write with HTTP {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for SinkError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub database: String,
    pub precision: Precision,
}

/// A bounded group of points sent to the sink in one call
#[derive(Debug, Clone)]
pub struct PointBatch {
    config: BatchConfig,
    points: Vec<Point>,
}

impl PointBatch {
    pub fn new(config: BatchConfig) -> Result<Self, SinkError> {
        if config.database.is_empty() {
            return Err(SinkError::InvalidBatch("database name is empty".to_string()));
        }
        Ok(Self {
            config,
            points: Vec::new(),
        })
    }

    pub fn add_points(&mut self, points: &[Point]) {
        self.points.extend_from_slice(points);
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    pub fn precision(&self) -> Precision {
        self.config.precision
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Newline separated line protocol body for this batch
    pub fn to_line_protocol(&self) -> String {
        self.points
            .iter()
            .map(|p| p.to_line(self.config.precision))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Backend trait for delivering point batches
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Construct an empty batch bound to a database
    fn new_batch(&self, config: &BatchConfig) -> Result<PointBatch, SinkError> {
        PointBatch::new(config.clone())
    }

    /// Deliver one batch; any error is treated as retryable
    async fn write(&self, batch: &PointBatch) -> Result<(), SinkError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
