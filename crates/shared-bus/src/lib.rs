//! # Shared Bus - Validation Event Distribution
//!
//! Fans validation events out from the ingestion side to any number of
//! independently paced consumers (dashboard pushers, stats loggers, alerting).
//!
//! ```text
//!  ingestion thread(s)                       consumer tasks
//!  ┌──────────────┐                    ┌──────────────────────┐
//!  │  pipeline    │    publish()       │ queue ─▶ Subscription│
//!  │              │ ──────┐     ┌────▶ │ queue ─▶ Subscription│
//!  └──────────────┘       ▼     │      │ queue ─▶ EventStream │
//!                  ┌──────────────┐    └──────────────────────┘
//!                  │ Distributor  │ ───┘  subscribe()
//!                  └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Non-blocking publish:** posting an event never waits on a consumer
//! - **Same order everywhere:** all consumers observe publish order
//! - **Bounded memory:** each consumer buffers at most its capacity; on
//!   overflow the oldest delivery is dropped and counted
//! - **Running totals:** every delivery carries the aggregate counts as of
//!   its own event, updated incrementally

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{Delivery, DistributorStats, EventFilter};
pub use publisher::{EventDistributor, EventPublisher};
pub use subscriber::{ConsumerId, ConsumerStats, EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per consumer before the oldest is dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
