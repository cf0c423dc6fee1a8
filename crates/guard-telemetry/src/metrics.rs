//! Prometheus metrics for the telemetry guard.
//!
//! All metrics follow the naming convention: `tg_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., messages_validated_total)
//! - **Gauge**: Value that can go up or down (e.g., devices_tracked)
//! - **Histogram**: Distribution of values (e.g., validation_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Verdicts by outcome and failing stage
    pub static ref MESSAGES_VALIDATED: CounterVec = CounterVec::new(
        Opts::new("tg_validation_messages_total", "Messages validated"),
        &["result", "stage"]  // result: accepted/rejected, stage: none/integrity/freshness/sequence
    ).expect("metric creation failed");

    /// Payloads that could not be parsed into a message
    pub static ref MALFORMED_PAYLOADS: CounterVec = CounterVec::new(
        Opts::new("tg_ingest_malformed_total", "Payloads dropped before validation"),
        &["kind"]  // kind: empty/syntax/shape
    ).expect("metric creation failed");

    /// Time from payload to published event
    pub static ref VALIDATION_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "tg_validation_duration_seconds",
            "Time spent validating, scoring and publishing one message"
        ).buckets(exponential_buckets(0.000_005, 2.0, 16).unwrap())
    ).expect("metric creation failed");

    /// Devices with ordering state
    pub static ref DEVICES_TRACKED: Gauge = Gauge::new(
        "tg_validation_devices_tracked",
        "Number of devices with a last accepted sequence"
    ).expect("metric creation failed");

    // =========================================================================
    // ANOMALY SCORING
    // =========================================================================

    /// Accepted messages flagged by the scorer
    pub static ref ANOMALIES_FLAGGED: Counter = Counter::new(
        "tg_scoring_anomalies_total",
        "Accepted messages flagged as anomalous"
    ).expect("metric creation failed");

    /// Scorer failures (message published without annotation)
    pub static ref SCORER_FAILURES: Counter = Counter::new(
        "tg_scoring_failures_total",
        "Scorer calls that produced no judgment"
    ).expect("metric creation failed");

    // =========================================================================
    // DISTRIBUTION
    // =========================================================================

    /// Registered consumers
    pub static ref CONSUMERS: Gauge = Gauge::new(
        "tg_distributor_consumers",
        "Number of registered consumers"
    ).expect("metric creation failed");

    /// Deliveries dropped from full consumer queues
    pub static ref DISTRIBUTOR_DROPPED: Gauge = Gauge::new(
        "tg_distributor_dropped_events",
        "Deliveries discarded from full consumer queues since start"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Validation
        Box::new(MESSAGES_VALIDATED.clone()),
        Box::new(MALFORMED_PAYLOADS.clone()),
        Box::new(VALIDATION_DURATION.clone()),
        Box::new(DEVICES_TRACKED.clone()),
        // Scoring
        Box::new(ANOMALIES_FLAGGED.clone()),
        Box::new(SCORER_FAILURES.clone()),
        // Distribution
        Box::new(CONSUMERS.clone()),
        Box::new(DISTRIBUTOR_DROPPED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
