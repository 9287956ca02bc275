//! Recorder: aggregates snapshots and fans points out to every writer

use super::aggregator::{summary_fields, PairMetrics, PortfolioTotals, RecorderError};
use super::order::Order;
use super::snapshot::{Account, Position, Snapshot};
use crate::config::RecorderConfig;
use crate::point::{Fields, Point, Tags};
use crate::writer::BatchWriter;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

pub struct Recorder {
    config: RecorderConfig,
    writers: Vec<BatchWriter>,
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Recorder {
    /// Start one writer per configured endpoint. Must be called inside a
    /// Tokio runtime.
    pub fn connect(
        config: RecorderConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, RecorderError> {
        config.validate()?;

        let mut writers = Vec::with_capacity(config.writers.len());
        for writer_config in &config.writers {
            match BatchWriter::connect(writer_config.clone(), shutdown.clone()) {
                Ok(writer) => writers.push(writer),
                Err(e) => {
                    log::error!("❌ Failed to connect writer {}: {}", writer_config.address, e);
                    // Writers started so far are empty; let them exit
                    for writer in writers {
                        writer.request_stop();
                    }
                    return Err(e.into());
                }
            }
        }

        log::info!(
            "✅ Recorder '{}' ready with {} writers",
            config.name,
            writers.len()
        );
        Ok(Self { config, writers })
    }

    pub fn with_writers(config: RecorderConfig, writers: Vec<BatchWriter>) -> Self {
        Self { config, writers }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn writers(&self) -> &[BatchWriter] {
        &self.writers
    }

    /// Compute per-pair and summary metrics and push them to every writer.
    ///
    /// Pairs are processed in symbol order. A validation error aborts the
    /// call, but points already pushed for earlier pairs stay pushed.
    pub fn save<A, P>(&self, snapshot: &Snapshot<'_, A, P>) -> Result<(), RecorderError>
    where
        A: Account + ?Sized,
        P: Position,
    {
        let primary_account = snapshot
            .primary_account
            .ok_or(RecorderError::MissingPrimaryAccount)?;

        let mut totals = PortfolioTotals::default();
        for (primary_symbol, secondary_symbol) in &self.config.symbol_map {
            let pair = PairMetrics::resolve(snapshot, primary_symbol, secondary_symbol)?;
            totals.accumulate(&pair);

            self.publish(
                primary_symbol,
                tags(&[
                    ("xSymbol", primary_symbol.as_str()),
                    ("ySymbol", secondary_symbol.as_str()),
                    ("type", "symbol"),
                ]),
                pair.to_fields(),
                snapshot.timestamp,
            );
        }

        let fields = summary_fields(
            primary_account,
            snapshot.secondary_account,
            &totals,
            snapshot.primary_max_leverage,
            snapshot.secondary_max_leverage,
            self.config.start_value,
        );
        self.publish("summary", tags(&[("type", "summary")]), fields, Utc::now());

        Ok(())
    }

    /// Emit one order record tagged with its symbol
    pub fn save_order(&self, order: &Order, timestamp: DateTime<Utc>) {
        self.publish(
            &order.id,
            tags(&[("symbol", order.symbol.as_str()), ("type", "order")]),
            order.to_fields(),
            timestamp,
        );
    }

    fn publish(&self, label: &str, tags: Tags, fields: Fields, timestamp: DateTime<Utc>) {
        let point = match Point::new(self.config.name.as_str(), tags, fields, timestamp) {
            Ok(point) => point,
            Err(e) => {
                log::warn!("⚠️  Dropping point for {}: {}", label, e);
                return;
            }
        };

        if let Some((last, rest)) = self.writers.split_last() {
            for writer in rest {
                writer.push(point.clone());
            }
            last.push(point);
        }
    }

    /// Drain and stop every writer
    pub async fn stop(&self) {
        for writer in &self.writers {
            writer.request_stop();
        }
        for writer in &self.writers {
            writer.drained().await;
        }
        log::info!("✅ Recorder '{}' stopped", self.config.name);
    }
}
