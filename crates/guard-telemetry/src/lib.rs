//! # Guard Telemetry
//!
//! Observability for the telemetry guard: structured logs through `tracing`
//! and Prometheus metrics in a process-wide registry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guard_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TG_SERVICE_NAME` | `telemetry-guard` | Service name in logs |
//! | `TG_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `TG_JSON_LOGS` | `false` | JSON log lines |
//! | `TG_CONSOLE_OUTPUT` | `true` | Disable to silence logs |
//! | `TG_METRICS_ON_EXIT` | `false` | Log the metrics exposition at shutdown |

mod config;
mod logging;
pub mod metrics;

pub use config::{parse_flag, TelemetryConfig};
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, ANOMALIES_FLAGGED, CONSUMERS,
    DEVICES_TRACKED, DISTRIBUTOR_DROPPED, MALFORMED_PAYLOADS, MESSAGES_VALIDATED,
    SCORER_FAILURES, VALIDATION_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    init_logging(&config)?;
    Ok(TelemetryGuard { config })
}

/// Guard that keeps telemetry active. Dropping it logs shutdown (and the
/// metrics exposition, if configured).
pub struct TelemetryGuard {
    config: TelemetryConfig,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.config.metrics_on_exit {
            match encode_metrics() {
                Ok(text) => tracing::info!(metrics = %text, "Final metrics"),
                Err(e) => tracing::warn!(error = %e, "Could not encode metrics"),
            }
        }
        tracing::info!(service = %self.config.service_name, "Shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
