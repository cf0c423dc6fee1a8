//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log filter directive (trace, debug, info, warn, error, or a full EnvFilter string)
    pub log_level: String,

    /// Whether to write logs at all
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to dump the Prometheus text exposition to the log on shutdown
    pub metrics_on_exit: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "telemetry-guard".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_on_exit: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TG_SERVICE_NAME`: Service name (default: telemetry-guard)
    /// - `TG_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `TG_CONSOLE_OUTPUT`: Enable log output (default: true)
    /// - `TG_JSON_LOGS`: JSON logs (default: false, true in containers)
    /// - `TG_METRICS_ON_EXIT`: Log metrics at shutdown (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("TG_SERVICE_NAME")
                .unwrap_or_else(|_| "telemetry-guard".to_string()),

            log_level: env::var("TG_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("TG_CONSOLE_OUTPUT")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("TG_JSON_LOGS")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(is_container),

            metrics_on_exit: env::var("TG_METRICS_ON_EXIT")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

/// Parse an on/off switch: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`,
/// any case. Anything else is `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
