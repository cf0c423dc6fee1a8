//! # Consumer Handlers
//!
//! Each consumer owns one subscription and runs as its own task, so a slow
//! consumer only ever backs up (and eventually drops from) its own queue.
//!
//! ```text
//! EventDistributor ──┬──▶ [queue] ──▶ ConsumerTask<DashboardFeed>  ──▶ stdout
//!                    ├──▶ [queue] ──▶ ConsumerTask<AttackLog>      ──▶ warn! logs
//!                    └──▶ [queue] ──▶ ConsumerTask<StatsReporter>  ──▶ gauges + info! logs
//! ```

pub mod attack_log;
pub mod dashboard;
pub mod stats;

pub use attack_log::AttackLog;
pub use dashboard::DashboardFeed;
pub use stats::StatsReporter;

use async_trait::async_trait;
use shared_bus::{Delivery, DistributorStats, EventDistributor, EventFilter, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// A consumer of validation events.
#[async_trait]
pub trait DeliveryHandler: Send {
    /// Consumer label (also used as the subscription name).
    fn name(&self) -> &'static str;

    /// Which events to subscribe to.
    fn filter(&self) -> EventFilter {
        EventFilter::All
    }

    /// Period for [`on_tick`](Self::on_tick); `None` disables ticks.
    fn tick_interval(&self) -> Option<Duration> {
        None
    }

    /// Handle one delivery. An error stops this consumer.
    async fn on_delivery(&mut self, delivery: Delivery) -> anyhow::Result<()>;

    /// Periodic callback with the current totals.
    async fn on_tick(&mut self, _stats: DistributorStats) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once after the last delivery.
    async fn on_shutdown(&mut self, _stats: DistributorStats) -> anyhow::Result<()> {
        Ok(())
    }
}

/// What a consumer task did before it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSummary {
    pub name: &'static str,
    /// Deliveries handled.
    pub handled: u64,
    /// Deliveries discarded from this consumer's queue while it lagged.
    pub dropped: u64,
    /// Set when the handler failed and the task stopped early.
    pub error: Option<String>,
}

/// A handler bound to its subscription.
pub struct ConsumerTask<H: DeliveryHandler> {
    handler: H,
    subscription: Subscription,
    distributor: Arc<EventDistributor>,
}

impl<H: DeliveryHandler> ConsumerTask<H> {
    /// Subscribe `handler` to the distributor.
    ///
    /// The handler sees every matching event published after this returns.
    pub fn new(handler: H, distributor: Arc<EventDistributor>) -> Self {
        let subscription =
            distributor.subscribe_with(handler.name(), handler.filter(), distributor.capacity());
        Self {
            handler,
            subscription,
            distributor,
        }
    }

    /// Process deliveries until the subscription closes or `shutdown` fires.
    ///
    /// On shutdown, deliveries already queued are still handled before
    /// `on_shutdown` runs.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ConsumerSummary {
        let name = self.handler.name();
        info!(consumer = name, id = self.subscription.id(), "Consumer started");

        let ticking = self.handler.tick_interval();
        let mut ticker = tokio::time::interval(ticking.unwrap_or(Duration::from_secs(3600)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut handled = 0u64;
        let outcome: anyhow::Result<()> = async {
            loop {
                tokio::select! {
                    delivery = self.subscription.recv() => match delivery {
                        Some(delivery) => {
                            self.handler.on_delivery(delivery).await?;
                            handled += 1;
                        }
                        None => {
                            debug!(consumer = name, "Subscription closed");
                            break;
                        }
                    },
                    _ = ticker.tick(), if ticking.is_some() => {
                        self.handler.on_tick(self.distributor.stats()).await?;
                    }
                    _ = shutdown.changed() => {
                        while let Ok(Some(delivery)) = self.subscription.try_recv() {
                            self.handler.on_delivery(delivery).await?;
                            handled += 1;
                        }
                        break;
                    }
                }
            }
            self.handler.on_shutdown(self.distributor.stats()).await
        }
        .await;

        let error = match outcome {
            Ok(()) => None,
            Err(err) => {
                error!(consumer = name, error = %err, "Consumer failed, unsubscribing");
                Some(err.to_string())
            }
        };
        let summary = ConsumerSummary {
            name,
            handled,
            dropped: self.subscription.dropped(),
            error,
        };
        info!(
            consumer = name,
            handled = summary.handled,
            dropped = summary.dropped,
            "Consumer stopped"
        );
        summary
    }
}
