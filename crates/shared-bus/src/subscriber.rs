//! # Event Subscriber
//!
//! The consumer side of the distributor. Each consumer owns a bounded queue;
//! when it fills up the oldest delivery is discarded and counted, so a stalled
//! consumer costs memory proportional to its capacity and nothing else.

use crate::events::{Delivery, DistributorStats, EventFilter};
use crate::publisher::Hub;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_stream::Stream;
use tracing::debug;

/// Identifies one registered consumer.
pub type ConsumerId = u64;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The consumer was unsubscribed or the distributor was dropped.
    #[error("subscription closed")]
    Closed,
}

/// Per-consumer bounded buffer with drop-oldest overflow.
pub(crate) struct ConsumerQueue {
    id: ConsumerId,
    name: String,
    capacity: usize,
    filter: EventFilter,
    buffer: Mutex<VecDeque<Delivery>>,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl ConsumerQueue {
    pub(crate) fn new(id: ConsumerId, name: String, capacity: usize, filter: EventFilter) -> Self {
        let capacity = capacity.max(1);
        Self {
            id,
            name,
            capacity,
            filter,
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> ConsumerId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn filter(&self) -> EventFilter {
        self.filter
    }

    /// Enqueue without waiting. Returns `true` if the oldest delivery was evicted.
    pub(crate) fn push(&self, delivery: Delivery) -> bool {
        let evicted = {
            let mut buffer = self.buffer.lock();
            let evicted = if buffer.len() >= self.capacity {
                buffer.pop_front();
                true
            } else {
                false
            };
            buffer.push_back(delivery);
            evicted
        };
        if evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        evicted
    }

    fn pop(&self) -> Option<Delivery> {
        self.buffer.lock().pop_front()
    }

    pub(crate) fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Per-consumer counters, as reported by the distributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Consumer id.
    pub id: ConsumerId,
    /// Label given at subscription time.
    pub name: String,
    /// Deliveries waiting in the queue.
    pub pending: usize,
    /// Deliveries discarded because the queue was full.
    pub dropped: u64,
}

impl ConsumerStats {
    pub(crate) fn of(queue: &ConsumerQueue) -> Self {
        Self {
            id: queue.id(),
            name: queue.name().to_string(),
            pending: queue.pending(),
            dropped: queue.dropped(),
        }
    }
}

/// A registered consumer's handle.
///
/// Dropping it deregisters the consumer.
pub struct Subscription {
    queue: Arc<ConsumerQueue>,
    hub: Weak<Hub>,
    stats_at_subscribe: DistributorStats,
}

impl Subscription {
    pub(crate) fn new(queue: Arc<ConsumerQueue>, hub: Weak<Hub>, stats: DistributorStats) -> Self {
        Self {
            queue,
            hub,
            stats_at_subscribe: stats,
        }
    }

    /// Receive the next delivery, waiting if the queue is empty.
    ///
    /// # Returns
    ///
    /// - `Some(delivery)` - The oldest undelivered event
    /// - `None` - The consumer was unsubscribed (or the distributor dropped)
    ///   and its queue is drained
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            if let Some(delivery) = self.queue.pop() {
                return Some(delivery);
            }
            if self.queue.is_closed() {
                return None;
            }
            self.queue.notify.notified().await;
        }
    }

    /// Take the next delivery without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(delivery))` - A delivery was queued
    /// - `Ok(None)` - Nothing queued right now
    /// - `Err(SubscriptionError::Closed)` - Closed and drained
    pub fn try_recv(&mut self) -> Result<Option<Delivery>, SubscriptionError> {
        match self.queue.pop() {
            Some(delivery) => Ok(Some(delivery)),
            None if self.queue.is_closed() => Err(SubscriptionError::Closed),
            None => Ok(None),
        }
    }

    /// This consumer's id (for `EventDistributor::unsubscribe`).
    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.queue.id()
    }

    /// Label given at subscription time.
    #[must_use]
    pub fn name(&self) -> &str {
        self.queue.name()
    }

    /// The filter this consumer registered with.
    #[must_use]
    pub fn filter(&self) -> EventFilter {
        self.queue.filter()
    }

    /// Deliveries discarded from this consumer's queue so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    /// Deliveries waiting in this consumer's queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Running totals at the moment this consumer registered.
    #[must_use]
    pub fn stats_at_subscribe(&self) -> DistributorStats {
        self.stats_at_subscribe
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.queue.id());
        }
        debug!(consumer = self.queue.id(), name = %self.queue.name(), "Subscription dropped");
    }
}

/// A subscription as a `Stream` of deliveries.
pub struct EventStream {
    id: ConsumerId,
    inner: BoxStream<'static, Delivery>,
}

impl EventStream {
    /// Wrap a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let id = subscription.id();
        let inner = futures::stream::unfold(subscription, |mut sub| async move {
            sub.recv().await.map(|delivery| (delivery, sub))
        })
        .boxed();
        Self { id, inner }
    }

    /// Id of the underlying consumer.
    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.id
    }
}

impl Stream for EventStream {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
