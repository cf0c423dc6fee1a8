//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Wire**: `TelemetryMessage`, `Readings`
//! - **Validation**: `Verdict`, `FailedStage`
//! - **Distribution**: `ValidationEvent`, `AnomalyAnnotation`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// CLUSTER A: THE WIRE MESSAGE
// =============================================================================

/// Stable identity of a field device.
pub type DeviceId = String;

/// Named numeric channels reported by a device (e.g. `flow_rate`).
///
/// A `BTreeMap` so iteration order never depends on insertion order.
pub type Readings = BTreeMap<String, f64>;

/// Top-level field names with a fixed meaning. Additional fields may not reuse them.
pub const RESERVED_FIELDS: [&str; 6] = [
    "device_id",
    "timestamp",
    "sequence",
    "readings",
    "signature",
    "hmac",
];

/// A reading emitted by one device.
///
/// Deserializes from the canonical wire shape:
///
/// ```json
/// {
///   "device_id": "HYDROLOGIC-Device-001",
///   "timestamp": "2024-06-01T12:00:00Z",
///   "sequence": 42,
///   "readings": { "flow_rate": 50.12, "pressure_upstream": 60.3 },
///   "status": "operational",
///   "signature": "9f2c..."
/// }
/// ```
///
/// Unknown top-level fields (such as `status`) are kept in `extra` and are
/// covered by the signature like every other field. Older publishers name the
/// tag `hmac`; that spelling is accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    /// Device that produced the reading.
    pub device_id: DeviceId,
    /// Sender-declared creation time, ISO-8601 / RFC 3339 in UTC.
    ///
    /// Kept as the sender's exact string: the signature covers these bytes,
    /// and an unparseable value is a freshness failure rather than a parse error.
    pub timestamp: String,
    /// Per-device counter, strictly increasing from session start.
    pub sequence: u64,
    /// Sensor channels.
    pub readings: Readings,
    /// Additional top-level fields, signed along with the rest.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    /// Hex-encoded integrity tag over the canonical encoding of all other fields.
    #[serde(default, alias = "hmac", skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl TelemetryMessage {
    /// Start building a message stamped with the current UTC time.
    pub fn builder(device_id: impl Into<DeviceId>) -> TelemetryMessageBuilder {
        TelemetryMessageBuilder::new(device_id)
    }

    /// Copy of this message with the signature removed.
    #[must_use]
    pub fn unsigned(&self) -> Self {
        Self {
            signature: None,
            ..self.clone()
        }
    }

    /// Look up a reading by channel name.
    pub fn reading(&self, channel: &str) -> Option<f64> {
        self.readings.get(channel).copied()
    }
}

/// Builder used by device publishers and tests.
#[derive(Debug, Clone)]
pub struct TelemetryMessageBuilder {
    device_id: DeviceId,
    timestamp: Option<String>,
    sequence: u64,
    readings: Readings,
    extra: Map<String, Value>,
}

impl TelemetryMessageBuilder {
    fn new(device_id: impl Into<DeviceId>) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp: None,
            sequence: 0,
            readings: Readings::new(),
            extra: Map::new(),
        }
    }

    /// Set the sequence number.
    #[must_use]
    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Override the declared timestamp (defaults to now).
    #[must_use]
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Declare the timestamp from a UTC point in time.
    #[must_use]
    pub fn timestamp_at(self, at: chrono::DateTime<chrono::Utc>) -> Self {
        self.timestamp(format_timestamp(at))
    }

    /// Add a sensor channel.
    #[must_use]
    pub fn reading(mut self, channel: impl Into<String>, value: f64) -> Self {
        self.readings.insert(channel.into(), value);
        self
    }

    /// Add an extra top-level field (e.g. `status`).
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Finish the (unsigned) message.
    pub fn build(self) -> TelemetryMessage {
        TelemetryMessage {
            device_id: self.device_id,
            timestamp: self
                .timestamp
                .unwrap_or_else(|| format_timestamp(chrono::Utc::now())),
            sequence: self.sequence,
            readings: self.readings,
            extra: self.extra,
            signature: None,
        }
    }
}

/// Device-side sequence counter.
///
/// Hands out builders with strictly increasing sequence numbers, starting at 1.
#[derive(Debug, Clone)]
pub struct DeviceSequencer {
    device_id: DeviceId,
    last: u64,
}

impl DeviceSequencer {
    pub fn new(device_id: impl Into<DeviceId>) -> Self {
        Self::resume(device_id, 0)
    }

    /// Continue after `last` (e.g. a sequence persisted across a device restart).
    pub fn resume(device_id: impl Into<DeviceId>, last: u64) -> Self {
        Self {
            device_id: device_id.into(),
            last,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Sequence of the most recently issued message (0 before the first).
    pub fn last(&self) -> u64 {
        self.last
    }

    /// Builder for the next message, stamped now.
    pub fn next_message(&mut self) -> TelemetryMessageBuilder {
        self.last = self.last.saturating_add(1);
        TelemetryMessage::builder(self.device_id.clone()).sequence(self.last)
    }
}

/// Render a UTC instant the way devices declare it: RFC 3339, microseconds, `Z` suffix.
pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

// =============================================================================
// CLUSTER B: VALIDATION OUTCOME
// =============================================================================

/// The pipeline stage that rejected a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailedStage {
    /// Every stage passed.
    None,
    /// Canonicalization or HMAC check failed.
    Integrity,
    /// Timestamp outside the freshness window (stale or future-dated).
    Freshness,
    /// Sequence not strictly greater than the last accepted one.
    Sequence,
}

impl FailedStage {
    /// Stable lowercase label (used for metrics and logs).
    pub fn as_str(&self) -> &'static str {
        match self {
            FailedStage::None => "none",
            FailedStage::Integrity => "integrity",
            FailedStage::Freshness => "freshness",
            FailedStage::Sequence => "sequence",
        }
    }
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailedStage::None => "NONE",
            FailedStage::Integrity => "INTEGRITY",
            FailedStage::Freshness => "FRESHNESS",
            FailedStage::Sequence => "SEQUENCE",
        })
    }
}

/// Outcome of one validation pass over one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether every stage passed.
    pub accepted: bool,
    /// First failing stage, or `None` when accepted.
    pub failed_stage: FailedStage,
    /// Human-readable detail (observed age, observed vs. last sequence, ...).
    pub reason: String,
    /// The original message, kept even on rejection.
    pub message: TelemetryMessage,
}

impl Verdict {
    /// A verdict for a message that passed every stage.
    pub fn accepted(message: TelemetryMessage, reason: impl Into<String>) -> Self {
        Self {
            accepted: true,
            failed_stage: FailedStage::None,
            reason: reason.into(),
            message,
        }
    }

    /// A verdict for a message rejected at `stage`.
    pub fn rejected(message: TelemetryMessage, stage: FailedStage, reason: impl Into<String>) -> Self {
        debug_assert!(stage != FailedStage::None, "rejection needs a failing stage");
        Self {
            accepted: false,
            failed_stage: stage,
            reason: reason.into(),
            message,
        }
    }

    /// Device the verdict is about.
    pub fn device_id(&self) -> &str {
        &self.message.device_id
    }
}

// =============================================================================
// CLUSTER C: DISTRIBUTION
// =============================================================================

/// Judgment attached by an anomaly scorer to an accepted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyAnnotation {
    /// Whether the scorer flagged the readings.
    pub is_anomaly: bool,
    /// Raw score; lower is more anomalous.
    pub score: f64,
    /// Why the readings look unusual.
    pub explanation: String,
}

/// The unit pushed through the event distributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEvent {
    /// Verdict for the message.
    pub verdict: Verdict,
    /// Present only for accepted messages scored by a configured scorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyAnnotation>,
}

impl ValidationEvent {
    /// Event without an anomaly judgment.
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            anomaly: None,
        }
    }

    /// Attach an anomaly judgment. Ignored for rejected verdicts.
    #[must_use]
    pub fn with_anomaly(mut self, annotation: AnomalyAnnotation) -> Self {
        if self.verdict.accepted {
            self.anomaly = Some(annotation);
        }
        self
    }

    /// True when the message was accepted and the scorer flagged it.
    pub fn is_flagged(&self) -> bool {
        self.anomaly.as_ref().is_some_and(|a| a.is_anomaly)
    }
}
