//! Snapshot Replay - feeds recorded snapshots through the recorder
//!
//! Reads one `SnapshotRecord` JSON object per line, saves each through the
//! recorder, and drains every writer before exiting. Ctrl-C stops reading
//! and drains what has been pushed so far.
//!
//! Usage:
//!   cargo run --release --bin snapshot_replay
//!
//! Environment variables:
//!   XYSTATS_CONFIG - recorder config JSON file (required)
//!   XYSTATS_SNAPSHOTS - JSONL snapshot file (default: snapshots.jsonl)
//!   RUST_LOG - log filter (default: info)

use dotenv::dotenv;
use log::{error, info, warn};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use xystats::config::{RecorderConfig, RuntimeConfig};
use xystats::recorder::{Recorder, SnapshotRecord};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let runtime = RuntimeConfig::from_env()?;
    xystats::logging::init(&runtime.rust_log);

    info!("🚀 Snapshot replay");
    info!("   ├─ Config: {}", runtime.config_path);
    info!("   └─ Snapshots: {}", runtime.snapshots_path);

    let config = RecorderConfig::from_file(&runtime.config_path)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let recorder = Recorder::connect(config, shutdown_rx)?;

    let file = File::open(&runtime.snapshots_path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut saved = 0u64;
    let mut failed = 0u64;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                warn!("⚠️  Interrupted, draining writers...");
                let _ = shutdown_tx.send(true);
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let record: SnapshotRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("⚠️  Skipping malformed snapshot line: {}", e);
                failed += 1;
                continue;
            }
        };

        match recorder.save(&record.as_snapshot()) {
            Ok(()) => saved += 1,
            Err(e) => {
                error!("❌ Snapshot at {} rejected: {}", record.timestamp, e);
                failed += 1;
            }
        }
    }

    info!("📊 Replayed {} snapshots ({} rejected)", saved, failed);
    recorder.stop().await;
    Ok(())
}
