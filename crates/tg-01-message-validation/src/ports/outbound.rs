//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies this subsystem needs: a clock and, optionally, an anomaly
//! scorer for accepted readings.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared_types::{Readings, ScorerError};

// =============================================================================
// TIME
// =============================================================================

/// Time source for freshness checks.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to replay captured traffic
/// and in tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

// =============================================================================
// ANOMALY SCORING
// =============================================================================

/// A scorer's judgment on one set of readings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyJudgment {
    /// Whether the readings look anomalous.
    pub is_anomaly: bool,
    /// Raw score; lower is more anomalous.
    pub value: f64,
    /// Human-readable explanation (may be empty for normal readings).
    pub explanation: String,
}

/// Pluggable anomaly scorer.
///
/// Only called for messages that passed every validation stage. An `Err`
/// means "no judgment available"; it never turns an accepted message into a
/// rejected one.
pub trait AnomalyScorer: Send + Sync {
    /// Score one set of readings.
    fn score(&self, readings: &Readings) -> Result<AnomalyJudgment, ScorerError>;

    /// Name for logs.
    fn name(&self) -> &str {
        "anomaly-scorer"
    }
}
