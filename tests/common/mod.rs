//! In-memory sink shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use xystats::config::WriterConfig;
use xystats::point::{Fields, Point, Tags};
use xystats::sink::{BatchConfig, MetricsSink, PointBatch, SinkError};

pub const ALWAYS: usize = usize::MAX;

pub struct MockSink {
    attempts: Mutex<Vec<usize>>,
    delivered: Mutex<Vec<Point>>,
    failing_writes: AtomicUsize,
    failing_batches: AtomicUsize,
    gate: Option<watch::Sender<bool>>,
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
            0 => None,
            ALWAYS => Some(ALWAYS),
            n => Some(n - 1),
        })
        .is_ok()
}

impl MockSink {
    pub fn new() -> Arc<Self> {
        Self::build(0, 0, None)
    }

    /// Fails the next `n` writes (`ALWAYS` for every write)
    pub fn failing(n: usize) -> Arc<Self> {
        Self::build(n, 0, None)
    }

    /// Fails the next `n` batch constructions
    pub fn failing_batches(n: usize) -> Arc<Self> {
        Self::build(0, n, None)
    }

    /// Writes block until `open_gate` is called
    pub fn gated() -> Arc<Self> {
        let (gate, _) = watch::channel(false);
        Self::build(0, 0, Some(gate))
    }

    fn build(writes: usize, batches: usize, gate: Option<watch::Sender<bool>>) -> Arc<Self> {
        Arc::new(Self {
            attempts: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
            failing_writes: AtomicUsize::new(writes),
            failing_batches: AtomicUsize::new(batches),
            gate,
        })
    }

    pub fn set_failing_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.send_replace(true);
        }
    }

    /// Batch size of every write attempt, in order
    pub fn attempts(&self) -> Vec<usize> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<Point> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSink for MockSink {
    fn new_batch(&self, config: &BatchConfig) -> Result<PointBatch, SinkError> {
        if take_failure(&self.failing_batches) {
            return Err(SinkError::InvalidBatch("mock batch failure".to_string()));
        }
        PointBatch::new(config.clone())
    }

    async fn write(&self, batch: &PointBatch) -> Result<(), SinkError> {
        self.attempts.lock().unwrap().push(batch.len());

        if let Some(gate) = &self.gate {
            let mut open = gate.subscribe();
            let _ = open.wait_for(|open| *open).await;
        }

        if take_failure(&self.failing_writes) {
            return Err(SinkError::Transport("mock write failure".to_string()));
        }
        self.delivered
            .lock()
            .unwrap()
            .extend_from_slice(batch.points());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "Mock"
    }
}

pub fn writer_config() -> WriterConfig {
    WriterConfig {
        address: "mem://mock".to_string(),
        username: String::new(),
        password: String::new(),
        database: "stats".to_string(),
        batch_size: 100,
        write_interval_secs: 15,
    }
}

/// A point tagged with its producer and carrying a sequence number
pub fn seq_point(producer: &str, seq: i64) -> Point {
    let mut tags = Tags::new();
    tags.insert("producer".to_string(), producer.to_string());
    let mut fields = Fields::new();
    fields.insert("seq".to_string(), seq.into());
    Point::new("test", tags, fields, chrono::Utc::now()).unwrap()
}

pub fn seq_of(point: &Point) -> i64 {
    point.field("seq").and_then(|v| v.as_f64()).unwrap() as i64
}
