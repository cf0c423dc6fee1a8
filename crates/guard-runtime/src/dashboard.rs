//! # Dashboard Feed
//!
//! Projects validation events into the dashboard protocol, one JSON object
//! per line:
//!
//! ```json
//! {"type":"valid_message","data":{"device_id":"...","pressure_psi":60.1,...}}
//! {"type":"ai_anomaly","data":{...,"ai_score":-0.214,"anomaly_description":"..."}}
//! {"type":"attack","data":{"attack_type":"Replay Attack","reasons":["..."],...}}
//! {"type":"stats_update","data":{"total":12,"valid":9,"rejected":3,"ai_anomalies":1}}
//! ```
//!
//! Devices publishing through a broker may carry their topic as an extra
//! `topic` field; the zone shown on the dashboard is derived from it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared_bus::DistributorStats;
use shared_types::{FailedStage, ValidationEvent};

/// Gate position shown when a device does not report one.
const DISPLAY_GATE_POSITION: f64 = 50.0;

/// One line of the dashboard feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DashboardMessage {
    ValidMessage(SensorReport),
    AiAnomaly(AnomalyReport),
    Attack(AttackReport),
    StatsUpdate(StatsReport),
}

impl DashboardMessage {
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Readings of an accepted message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReport {
    pub device_id: String,
    pub topic: String,
    pub timestamp: String,
    pub pressure_psi: f64,
    pub flow_rate_lpm: f64,
    pub valve_position: f64,
    pub zone: &'static str,
}

/// Accepted readings the scorer flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    #[serde(flatten)]
    pub sensor: SensorReport,
    /// Score rounded to three decimals.
    pub ai_score: f64,
    pub anomaly_description: String,
}

/// A rejected message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackReport {
    pub attack_type: &'static str,
    pub source: String,
    pub topic: String,
    pub reasons: Vec<String>,
    pub timestamp: String,
    pub description: &'static str,
}

/// Running totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub total: u64,
    pub valid: u64,
    pub rejected: u64,
    pub ai_anomalies: u64,
}

impl From<DistributorStats> for StatsReport {
    fn from(stats: DistributorStats) -> Self {
        Self {
            total: stats.total,
            valid: stats.accepted,
            rejected: stats.rejected,
            ai_anomalies: stats.anomalies,
        }
    }
}

/// Dashboard classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    MessageTampering,
    StaleMessage,
    ReplayAttack,
}

impl AttackKind {
    /// Kind for a failing stage; `None` for an accepted verdict.
    pub fn from_stage(stage: FailedStage) -> Option<Self> {
        match stage {
            FailedStage::None => None,
            FailedStage::Integrity => Some(Self::MessageTampering),
            FailedStage::Freshness => Some(Self::StaleMessage),
            FailedStage::Sequence => Some(Self::ReplayAttack),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::MessageTampering => "Message Tampering",
            Self::StaleMessage => "Stale Message",
            Self::ReplayAttack => "Replay Attack",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::MessageTampering => "HMAC mismatch: message contents were altered",
            Self::StaleMessage => "Timestamp outside the freshness window: message blocked",
            Self::ReplayAttack => "Sequence number already seen: duplicate message blocked",
        }
    }
}

/// Project an event as seen at `at` (the wall clock shown on the dashboard).
pub fn project(event: &ValidationEvent, at: DateTime<Utc>) -> DashboardMessage {
    let message = &event.verdict.message;
    let topic = message
        .extra
        .get("topic")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let timestamp = at.format("%H:%M:%S").to_string();

    if let Some(kind) = AttackKind::from_stage(event.verdict.failed_stage) {
        return DashboardMessage::Attack(AttackReport {
            attack_type: kind.label(),
            source: message.device_id.clone(),
            topic,
            reasons: vec![event.verdict.reason.clone()],
            timestamp,
            description: kind.description(),
        });
    }

    let reading = |primary: &str, legacy: &str, default: f64| {
        message
            .reading(primary)
            .or_else(|| message.reading(legacy))
            .unwrap_or(default)
    };
    let sensor = SensorReport {
        device_id: message.device_id.clone(),
        zone: zone_from_topic(&topic),
        topic,
        timestamp,
        pressure_psi: reading("pressure_upstream", "pressure_psi", 0.0),
        flow_rate_lpm: reading("flow_rate", "flow_rate_lpm", 0.0),
        valve_position: reading("gate_a_position", "valve_position", DISPLAY_GATE_POSITION),
    };

    match &event.anomaly {
        Some(annotation) if annotation.is_anomaly => DashboardMessage::AiAnomaly(AnomalyReport {
            sensor,
            ai_score: (annotation.score * 1000.0).round() / 1000.0,
            anomaly_description: annotation.explanation.clone(),
        }),
        _ => DashboardMessage::ValidMessage(sensor),
    }
}

/// Stats line for the current totals.
pub fn stats_update(stats: DistributorStats) -> DashboardMessage {
    DashboardMessage::StatsUpdate(stats.into())
}

/// Facility zone a topic belongs to.
pub fn zone_from_topic(topic: &str) -> &'static str {
    if topic.contains("pool") {
        "pool_spa"
    } else if topic.contains("kitchen") {
        "kitchen"
    } else {
        "main_building"
    }
}
