//! # Dashboard Feed Handler
//!
//! Writes the dashboard protocol as JSON lines: one line per event, plus a
//! `stats_update` line on start, on every tick, and at shutdown.

use super::DeliveryHandler;
use crate::dashboard::{project, stats_update, DashboardMessage};
use async_trait::async_trait;
use chrono::Utc;
use shared_bus::{Delivery, DistributorStats};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub struct DashboardFeed<W> {
    out: W,
    stats_interval: Duration,
    lines: u64,
}

impl<W: AsyncWrite + Unpin + Send> DashboardFeed<W> {
    pub fn new(out: W, stats_interval: Duration) -> Self {
        Self {
            out,
            stats_interval,
            lines: 0,
        }
    }

    /// Lines written so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    async fn write(&mut self, message: &DashboardMessage) -> anyhow::Result<()> {
        let line = message.to_json_line()?;
        self.out.write_all(line.as_bytes()).await?;
        self.out.flush().await?;
        self.lines += 1;
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> DeliveryHandler for DashboardFeed<W> {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.stats_interval)
    }

    async fn on_delivery(&mut self, delivery: Delivery) -> anyhow::Result<()> {
        let message = project(&delivery.event, Utc::now());
        self.write(&message).await
    }

    async fn on_tick(&mut self, stats: DistributorStats) -> anyhow::Result<()> {
        self.write(&stats_update(stats)).await
    }

    async fn on_shutdown(&mut self, stats: DistributorStats) -> anyhow::Result<()> {
        self.write(&stats_update(stats)).await?;
        self.out.shutdown().await?;
        Ok(())
    }
}
