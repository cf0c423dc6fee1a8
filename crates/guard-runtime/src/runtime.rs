//! # Guard Runtime
//!
//! Owns the container, the consumer tasks and the shutdown channel.
//!
//! ## Lifecycle
//!
//! 1. `new` wires the pipeline and distributor (refusing to start without a secret)
//! 2. `start_consumers` subscribes and spawns one task per consumer
//! 3. `start_ingestion` feeds a reader through the pipeline on its own thread
//! 4. `shutdown` signals the consumers, lets them drain, and collects summaries

use crate::container::{ConfigError, GuardConfig, GuardContainer};
use crate::handlers::{AttackLog, ConsumerSummary, ConsumerTask, DashboardFeed, StatsReporter};
use crate::ingestion::{spawn_ingestion, IngestSummary};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long consumers get to drain their queues at shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The running guard.
pub struct GuardRuntime {
    container: Arc<GuardContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    consumers: Vec<JoinHandle<ConsumerSummary>>,
}

impl GuardRuntime {
    pub fn new(config: GuardConfig) -> Result<Self, ConfigError> {
        info!("Creating telemetry guard runtime");
        let container = Arc::new(GuardContainer::new(config)?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
            consumers: Vec::new(),
        })
    }

    pub fn container(&self) -> Arc<GuardContainer> {
        Arc::clone(&self.container)
    }

    /// Subscribe the dashboard feed (writing to `dashboard_out`), the attack
    /// log and the stats reporter, and spawn their tasks.
    pub fn start_consumers<W>(&mut self, dashboard_out: W)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let distributor = Arc::clone(&self.container.distributor);
        let interval = self.container.config.distributor.stats_interval();

        let dashboard = ConsumerTask::new(
            DashboardFeed::new(dashboard_out, interval),
            Arc::clone(&distributor),
        );
        self.consumers
            .push(tokio::spawn(dashboard.run(self.shutdown_rx.clone())));

        let attacks = ConsumerTask::new(AttackLog::new(), Arc::clone(&distributor));
        self.consumers
            .push(tokio::spawn(attacks.run(self.shutdown_rx.clone())));

        let stats = ConsumerTask::new(
            StatsReporter::new(
                Arc::clone(&self.container.pipeline),
                Arc::clone(&distributor),
                interval,
            ),
            distributor,
        );
        self.consumers
            .push(tokio::spawn(stats.run(self.shutdown_rx.clone())));

        info!(consumers = self.consumers.len(), "Consumers started");
    }

    /// Start ingesting `reader` on a dedicated thread.
    pub fn start_ingestion<R>(&self, reader: R) -> io::Result<oneshot::Receiver<io::Result<IngestSummary>>>
    where
        R: BufRead + Send + 'static,
    {
        spawn_ingestion(reader, self.container.ingest.clone())
    }

    /// Signal shutdown and wait (bounded) for every consumer to drain.
    ///
    /// Consumers that do not finish within the drain timeout are abandoned.
    pub async fn shutdown(self) -> Vec<ConsumerSummary> {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let mut summaries = Vec::with_capacity(self.consumers.len());
        for handle in self.consumers {
            match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
                Ok(Ok(summary)) => summaries.push(summary),
                Ok(Err(join_error)) => error!(error = %join_error, "Consumer task panicked"),
                Err(_) => warn!("Consumer did not drain in time"),
            }
        }

        let stats = self.container.distributor.stats();
        info!(
            total = stats.total,
            accepted = stats.accepted,
            rejected = stats.rejected,
            dropped = self.container.distributor.dropped_total(),
            "Shutdown complete"
        );
        summaries
    }
}
