//! # Attack Log Handler
//!
//! Subscribes to rejections only and writes one `warn!` line per blocked
//! message, classified the way the dashboard shows it.

use super::DeliveryHandler;
use crate::dashboard::AttackKind;
use async_trait::async_trait;
use shared_bus::{Delivery, DistributorStats, EventFilter};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct AttackLog {
    tampering: u64,
    stale: u64,
    replay: u64,
}

impl AttackLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejections seen, by kind.
    pub fn count(&self, kind: AttackKind) -> u64 {
        match kind {
            AttackKind::MessageTampering => self.tampering,
            AttackKind::StaleMessage => self.stale,
            AttackKind::ReplayAttack => self.replay,
        }
    }
}

#[async_trait]
impl DeliveryHandler for AttackLog {
    fn name(&self) -> &'static str {
        "attack-log"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::Rejected
    }

    async fn on_delivery(&mut self, delivery: Delivery) -> anyhow::Result<()> {
        let verdict = &delivery.event.verdict;
        let Some(kind) = AttackKind::from_stage(verdict.failed_stage) else {
            return Ok(());
        };
        match kind {
            AttackKind::MessageTampering => self.tampering += 1,
            AttackKind::StaleMessage => self.stale += 1,
            AttackKind::ReplayAttack => self.replay += 1,
        }
        warn!(
            attack_type = kind.label(),
            device_id = %verdict.device_id(),
            sequence = verdict.message.sequence,
            stage = verdict.failed_stage.as_str(),
            reason = %verdict.reason,
            seq_no = delivery.seq_no,
            "Blocked message"
        );
        Ok(())
    }

    async fn on_shutdown(&mut self, stats: DistributorStats) -> anyhow::Result<()> {
        info!(
            tampering = self.tampering,
            stale = self.stale,
            replay = self.replay,
            rejected_total = stats.rejected,
            "Attack summary"
        );
        Ok(())
    }
}
