//! Buffered, batched writer with retry and graceful drain
//!
//! Producers append to `pending` under the push lock. A single background
//! flush task moves `pending` into `draining` and sends batches from there,
//! holding the drain lock only while claiming a batch. Neither lock is held
//! across a sink call, so producers never wait on the network.
//!
//! Lifecycle: `Running` → `Draining` (stop requested or parent cancelled)
//! → `Stopped`. A timer tick runs one bounded pass (at most one batch); the
//! shutdown pass repeats until the buffer is empty or a batch exhausts its
//! retries.

use crate::config::WriterConfig;
use crate::point::Point;
use crate::sink::{BatchConfig, HttpConfig, InfluxHttpClient, MetricsSink, Precision, SinkError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

pub const MAX_RETRY_COUNT: u32 = 10;
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Running,
    Draining,
    Stopped,
}

struct Shared {
    config: WriterConfig,
    batch_config: BatchConfig,
    sink: Arc<dyn MetricsSink>,
    pending: Mutex<Vec<Point>>,
    draining: Mutex<Vec<Point>>,
    state: watch::Sender<WriterState>,
}

/// Handle to a running writer; clones share the same buffer and flush task
#[derive(Clone)]
pub struct BatchWriter {
    shared: Arc<Shared>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl BatchWriter {
    /// Connect to the configured InfluxDB endpoint and start flushing
    pub fn connect(
        config: WriterConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, SinkError> {
        let client = InfluxHttpClient::connect(&HttpConfig {
            address: config.address.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: crate::sink::influx::DEFAULT_TIMEOUT,
        })?;
        Ok(Self::spawn(config, Arc::new(client), shutdown))
    }

    /// Start a writer over any sink. Must be called inside a Tokio runtime.
    pub fn spawn(
        config: WriterConfig,
        sink: Arc<dyn MetricsSink>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let config = config.normalized();
        let (state, _) = watch::channel(WriterState::Running);

        log::info!(
            "🚀 Starting {} writer for {} (db: {}, batch: {}, interval: {}s)",
            sink.backend_type(),
            config.address,
            config.database,
            config.batch_size,
            config.write_interval_secs
        );

        let shared = Arc::new(Shared {
            batch_config: BatchConfig {
                database: config.database.clone(),
                precision: Precision::Nanoseconds,
            },
            config,
            sink,
            pending: Mutex::new(Vec::new()),
            draining: Mutex::new(Vec::new()),
            state,
        });

        tokio::spawn(flush_loop(shared.clone(), shutdown));

        Self { shared }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.shared.config
    }

    pub fn push(&self, point: Point) {
        lock(&self.shared.pending).push(point);
    }

    pub fn push_many(&self, points: impl IntoIterator<Item = Point>) {
        lock(&self.shared.pending).extend(points);
    }

    pub fn state(&self) -> WriterState {
        *self.shared.state.borrow()
    }

    /// Points accepted but not yet delivered or dropped
    pub fn buffered_len(&self) -> usize {
        let pending = lock(&self.shared.pending).len();
        pending + lock(&self.shared.draining).len()
    }

    /// Request a full drain and wait until it has finished.
    ///
    /// Only the first call starts the drain; every call returns once the
    /// writer is stopped.
    pub async fn stop(&self) {
        self.request_stop();
        self.drained().await;
    }

    /// Signal the flush task to drain without waiting.
    ///
    /// Returns true only for the call that moved the writer out of `Running`.
    pub fn request_stop(&self) -> bool {
        let requested = self.shared.begin_drain();
        if requested {
            log::info!("🔄 Stop requested for writer {}, draining...", self.shared.config.address);
        }
        requested
    }

    /// Resolves once the writer has drained and stopped
    pub async fn drained(&self) {
        let mut rx = self.shared.state.subscribe();
        // The sender lives in `shared`, which we hold, so this cannot close early
        let _ = rx.wait_for(|state| *state == WriterState::Stopped).await;
    }
}

async fn parent_cancelled(shutdown: &mut watch::Receiver<bool>) {
    let cancelled = shutdown.wait_for(|cancelled| *cancelled).await.is_ok();
    if !cancelled {
        // Sender dropped without cancelling; never fire
        std::future::pending::<()>().await;
    }
}

async fn flush_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let period = shared.config.write_interval();
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut state_rx = shared.state.subscribe();

    loop {
        tokio::select! {
            biased;

            // The watch guard is not Send; it must not outlive this branch
            _ = async { state_rx.wait_for(|state| *state != WriterState::Running).await.is_ok() } => {
                break;
            }
            _ = parent_cancelled(&mut shutdown) => {
                log::info!("🔄 Parent cancelled, draining writer {}", shared.config.address);
                shared.begin_drain();
                break;
            }
            _ = timer.tick() => {
                shared.flush(false).await;
            }
        }
    }

    shared.flush(true).await;
    shared.state.send_replace(WriterState::Stopped);
    log::info!("✅ Writer {} fully drained", shared.config.address);
}

impl Shared {
    fn begin_drain(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == WriterState::Running {
                *state = WriterState::Draining;
                true
            } else {
                false
            }
        })
    }

    /// Merge `pending` into `draining` and claim at most one batch from it
    fn claim_batch(&self) -> Option<Vec<Point>> {
        let incoming = std::mem::take(&mut *lock(&self.pending));

        let mut draining = lock(&self.draining);
        draining.extend(incoming);
        if draining.is_empty() {
            return None;
        }
        let end = draining.len().min(self.config.batch_size);
        Some(draining.drain(..end).collect())
    }

    async fn flush(&self, save_all: bool) {
        while let Some(batch) = self.claim_batch() {
            let delivered = self.deliver(&batch).await;

            if !save_all {
                return;
            }
            if !delivered {
                let mut dropped = std::mem::take(&mut *lock(&self.draining)).len();
                dropped += std::mem::take(&mut *lock(&self.pending)).len();
                log::error!(
                    "❌ Abandoning drain of {}: {} buffered points dropped",
                    self.config.address,
                    dropped
                );
                return;
            }
        }
    }

    /// Write one batch, retrying the same points on failure.
    ///
    /// Returns false once `MAX_RETRY_COUNT` retries are spent; the batch is
    /// then discarded.
    async fn deliver(&self, points: &[Point]) -> bool {
        let mut retry_count = 0;
        loop {
            match self.write_batch(points).await {
                Ok(()) => {
                    log::debug!(
                        "✅ Flushed {} points to {}",
                        points.len(),
                        self.config.address
                    );
                    return true;
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > MAX_RETRY_COUNT {
                        log::error!(
                            "❌ Write to {} failed, retryCount {} > maxRetryCount {}, {} points dropped: {}",
                            self.config.address,
                            retry_count,
                            MAX_RETRY_COUNT,
                            points.len(),
                            e
                        );
                        return false;
                    }
                    log::warn!(
                        "⚠️  Write to {} failed (attempt {}), retrying in {}s: {}",
                        self.config.address,
                        retry_count,
                        RETRY_DELAY.as_secs(),
                        e
                    );
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn write_batch(&self, points: &[Point]) -> Result<(), SinkError> {
        let mut batch = self.sink.new_batch(&self.batch_config)?;
        batch.add_points(points);
        self.sink.write(&batch).await
    }
}
