//! # Distribution Events
//!
//! What a consumer receives: the validation event itself, its position in
//! ingestion order, and the running totals as of that event.

use serde::{Deserialize, Serialize};
use shared_types::{FailedStage, ValidationEvent};
use std::sync::Arc;

/// One event as seen by one consumer.
///
/// The event body is shared between consumers, so cloning a `Delivery` is cheap.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// 1-based position in the distributor's publish order.
    ///
    /// Gaps mean events were dropped from this consumer's queue or filtered out.
    pub seq_no: u64,
    /// The published event.
    pub event: Arc<ValidationEvent>,
    /// Running totals right after this event was counted.
    pub stats: DistributorStats,
}

/// Running aggregate counts, updated once per published event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorStats {
    /// Every event published.
    pub total: u64,
    /// Events with an accepted verdict.
    pub accepted: u64,
    /// Events with a rejected verdict.
    pub rejected: u64,
    /// Rejections at the integrity stage.
    pub integrity_failures: u64,
    /// Rejections at the freshness stage.
    pub freshness_failures: u64,
    /// Rejections at the sequence stage.
    pub sequence_failures: u64,
    /// Accepted events the anomaly scorer flagged.
    pub anomalies: u64,
}

impl DistributorStats {
    /// Fold one event into the totals.
    pub(crate) fn record(&mut self, event: &ValidationEvent) {
        self.total += 1;
        match event.verdict.failed_stage {
            FailedStage::None => self.accepted += 1,
            FailedStage::Integrity => {
                self.rejected += 1;
                self.integrity_failures += 1;
            }
            FailedStage::Freshness => {
                self.rejected += 1;
                self.freshness_failures += 1;
            }
            FailedStage::Sequence => {
                self.rejected += 1;
                self.sequence_failures += 1;
            }
        }
        if event.is_flagged() {
            self.anomalies += 1;
        }
    }

    /// Rejections at a given stage (`FailedStage::None` gives the accepted count).
    #[must_use]
    pub fn at_stage(&self, stage: FailedStage) -> u64 {
        match stage {
            FailedStage::None => self.accepted,
            FailedStage::Integrity => self.integrity_failures,
            FailedStage::Freshness => self.freshness_failures,
            FailedStage::Sequence => self.sequence_failures,
        }
    }
}

/// Which events a consumer wants delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventFilter {
    /// Every event.
    #[default]
    All,
    /// Only accepted verdicts.
    Accepted,
    /// Only rejected verdicts.
    Rejected,
    /// Only accepted verdicts the scorer flagged as anomalous.
    Flagged,
}

impl EventFilter {
    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ValidationEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Accepted => event.verdict.accepted,
            EventFilter::Rejected => !event.verdict.accepted,
            EventFilter::Flagged => event.is_flagged(),
        }
    }
}
