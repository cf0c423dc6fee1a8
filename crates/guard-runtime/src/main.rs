//! # Telemetry Guard
//!
//! Reads signed device messages (one JSON object per line) on stdin and
//! writes the dashboard feed (JSON lines) to stdout. Logs go to stderr.
//!
//! Runs until stdin is exhausted or Ctrl+C.

use anyhow::{Context, Result};
use guard_runtime::{GuardConfig, GuardRuntime};
use guard_telemetry::{init_telemetry, TelemetryConfig};
use std::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("failed to initialize telemetry")?;

    let config = GuardConfig::from_env().context("invalid configuration")?;
    let mut runtime = GuardRuntime::new(config).context("refusing to start")?;

    runtime.start_consumers(tokio::io::stdout());
    let ingestion = runtime
        .start_ingestion(BufReader::new(std::io::stdin()))
        .context("failed to start ingestion thread")?;

    info!("Telemetry guard is running. Press Ctrl+C to stop.");
    tokio::select! {
        outcome = ingestion => match outcome {
            Ok(Ok(summary)) => info!(?summary, "Input exhausted"),
            Ok(Err(e)) => error!(error = %e, "Failed reading input"),
            Err(_) => error!("Ingestion thread exited without a summary"),
        },
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Received shutdown signal");
        }
    }

    runtime.shutdown().await;
    Ok(())
}
