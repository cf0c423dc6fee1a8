//! # Stats Reporter
//!
//! Periodically publishes the gauges (devices tracked, consumers, drops) and
//! logs the running totals. Subscribes to flagged events only, to keep a
//! per-device anomaly tally for the shutdown summary.

use super::DeliveryHandler;
use async_trait::async_trait;
use guard_telemetry::{CONSUMERS, DEVICES_TRACKED, DISTRIBUTOR_DROPPED};
use shared_bus::{Delivery, DistributorStats, EventDistributor, EventFilter};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tg_01_message_validation::{TimeSource, ValidationPipeline};
use tracing::{info, warn};

pub struct StatsReporter<C: TimeSource> {
    pipeline: Arc<ValidationPipeline<C>>,
    distributor: Arc<EventDistributor>,
    interval: Duration,
    anomalies_by_device: BTreeMap<String, u64>,
    last_dropped: u64,
}

impl<C: TimeSource> StatsReporter<C> {
    pub fn new(
        pipeline: Arc<ValidationPipeline<C>>,
        distributor: Arc<EventDistributor>,
        interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            distributor,
            interval,
            anomalies_by_device: BTreeMap::new(),
            last_dropped: 0,
        }
    }

    /// Flagged events seen per device.
    pub fn anomalies_by_device(&self) -> &BTreeMap<String, u64> {
        &self.anomalies_by_device
    }

    fn refresh_gauges(&mut self) {
        let devices = self.pipeline.device_count();
        let dropped = self.distributor.dropped_total();
        DEVICES_TRACKED.set(devices as f64);
        CONSUMERS.set(self.distributor.subscriber_count() as f64);
        DISTRIBUTOR_DROPPED.set(dropped as f64);

        if dropped > self.last_dropped {
            for consumer in self.distributor.consumer_stats() {
                if consumer.dropped > 0 {
                    warn!(
                        consumer = %consumer.name,
                        id = consumer.id,
                        dropped = consumer.dropped,
                        pending = consumer.pending,
                        "Consumer lagging, oldest events discarded"
                    );
                }
            }
            self.last_dropped = dropped;
        }
    }
}

#[async_trait]
impl<C: TimeSource + 'static> DeliveryHandler for StatsReporter<C> {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::Flagged
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.interval)
    }

    async fn on_delivery(&mut self, delivery: Delivery) -> anyhow::Result<()> {
        let device = delivery.event.verdict.device_id().to_string();
        *self.anomalies_by_device.entry(device).or_default() += 1;
        Ok(())
    }

    async fn on_tick(&mut self, stats: DistributorStats) -> anyhow::Result<()> {
        self.refresh_gauges();
        if stats.total > 0 {
            info!(
                total = stats.total,
                accepted = stats.accepted,
                rejected = stats.rejected,
                integrity = stats.integrity_failures,
                freshness = stats.freshness_failures,
                sequence = stats.sequence_failures,
                anomalies = stats.anomalies,
                devices = self.pipeline.device_count(),
                "Running totals"
            );
        }
        Ok(())
    }

    async fn on_shutdown(&mut self, stats: DistributorStats) -> anyhow::Result<()> {
        self.refresh_gauges();
        for (device, count) in &self.anomalies_by_device {
            info!(device_id = %device, anomalies = count, "Anomaly tally");
        }
        info!(
            total = stats.total,
            accepted = stats.accepted,
            rejected = stats.rejected,
            anomalies = stats.anomalies,
            "Final totals"
        );
        Ok(())
    }
}
