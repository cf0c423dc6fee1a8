//! # Event Distributor
//!
//! The publishing side. `publish` is synchronous and never waits on a
//! consumer: it takes the registry lock, counts the event, and appends a
//! `Delivery` to every matching consumer's queue. Because the lock serializes
//! publishers, every consumer sees the same relative order.

use crate::events::{Delivery, DistributorStats, EventFilter};
use crate::subscriber::{ConsumerId, ConsumerQueue, ConsumerStats, EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::Mutex;
use shared_types::ValidationEvent;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Trait for handing validation events to the distributor.
///
/// Callable from any thread, including a blocking ingestion thread with no
/// async runtime.
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// # Returns
    ///
    /// The number of consumers the event was queued for.
    fn publish(&self, event: ValidationEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

pub(crate) struct Hub {
    state: Mutex<HubState>,
    next_id: AtomicU64,
    published: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Default)]
struct HubState {
    consumers: BTreeMap<ConsumerId, Arc<ConsumerQueue>>,
    stats: DistributorStats,
    seq_no: u64,
}

impl Hub {
    /// Deregister and close a consumer.
    pub(crate) fn remove(&self, id: ConsumerId) -> bool {
        let removed = self.state.lock().consumers.remove(&id);
        match removed {
            Some(queue) => {
                queue.close();
                true
            }
            None => false,
        }
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        for queue in self.state.get_mut().consumers.values() {
            queue.close();
        }
    }
}

/// Fan-out hub between synchronous ingestion and independently paced consumers.
///
/// Cheap to clone; clones share the same consumers and totals.
#[derive(Clone)]
pub struct EventDistributor {
    hub: Arc<Hub>,
    capacity: usize,
}

impl EventDistributor {
    /// Create a distributor whose consumers buffer up to `DEFAULT_CHANNEL_CAPACITY` events.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a distributor with a per-consumer buffer size.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hub: Arc::new(Hub {
                state: Mutex::new(HubState::default()),
                next_id: AtomicU64::new(1),
                published: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Register a consumer for every event.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.subscribe_with("consumer", EventFilter::All, self.capacity)
    }

    /// Register a labelled consumer with its own filter and buffer size.
    ///
    /// The consumer sees every matching event published after this call returns.
    #[must_use]
    pub fn subscribe_with(
        &self,
        name: impl Into<String>,
        filter: EventFilter,
        capacity: usize,
    ) -> Subscription {
        let id = self.hub.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(ConsumerQueue::new(id, name.into(), capacity, filter));

        let stats = {
            let mut state = self.hub.state.lock();
            state.consumers.insert(id, queue.clone());
            state.stats
        };

        info!(consumer = id, name = %queue.name(), ?filter, "Consumer subscribed");
        Subscription::new(queue, Arc::downgrade(&self.hub), stats)
    }

    /// Register a consumer and wrap it as a `Stream`.
    #[must_use]
    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    /// Deregister a consumer.
    ///
    /// Its handle drains what is already queued and then reports closed.
    /// Returns `false` if the id is unknown.
    pub fn unsubscribe(&self, id: ConsumerId) -> bool {
        let removed = self.hub.remove(id);
        if removed {
            info!(consumer = id, "Consumer unsubscribed");
        }
        removed
    }

    /// Read-only copy of the running totals.
    #[must_use]
    pub fn stats(&self) -> DistributorStats {
        self.hub.state.lock().stats
    }

    /// Per-consumer queue depth and drop counts.
    #[must_use]
    pub fn consumer_stats(&self) -> Vec<ConsumerStats> {
        let state = self.hub.state.lock();
        state
            .consumers
            .values()
            .map(|q| ConsumerStats::of(q))
            .collect()
    }

    /// Deliveries discarded across all consumers since creation.
    #[must_use]
    pub fn dropped_total(&self) -> u64 {
        self.hub.dropped.load(Ordering::Relaxed)
    }

    /// Get the number of registered consumers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.hub.state.lock().consumers.len()
    }

    /// Default per-consumer buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventDistributor {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for EventDistributor {
    fn publish(&self, event: ValidationEvent) -> usize {
        let device_id = event.verdict.device_id().to_string();
        let stage = event.verdict.failed_stage;
        let event = Arc::new(event);

        let mut receivers = 0;
        let mut evicted = Vec::new();
        let seq_no = {
            let mut state = self.hub.state.lock();
            state.stats.record(&event);
            state.seq_no += 1;

            let delivery = Delivery {
                seq_no: state.seq_no,
                event: event.clone(),
                stats: state.stats,
            };
            for queue in state.consumers.values() {
                if !queue.filter().matches(&event) {
                    continue;
                }
                receivers += 1;
                if queue.push(delivery.clone()) {
                    evicted.push((queue.id(), queue.name().to_string(), queue.dropped()));
                }
            }
            state.seq_no
        };

        self.hub.published.fetch_add(1, Ordering::Relaxed);
        if !evicted.is_empty() {
            self.hub
                .dropped
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
        }
        for (id, name, dropped) in evicted {
            warn!(
                consumer = id,
                name = %name,
                dropped_total = dropped,
                "Consumer queue full, oldest event dropped"
            );
        }

        debug!(
            seq_no,
            device_id = %device_id,
            stage = stage.as_str(),
            receivers,
            "Event published"
        );
        receivers
    }

    fn events_published(&self) -> u64 {
        self.hub.published.load(Ordering::Relaxed)
    }
}
