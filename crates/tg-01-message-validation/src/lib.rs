//! # Message Validation Subsystem (TG-01)
//!
//! Decides, for every incoming telemetry message, whether it is authentic,
//! recent, and in order, and hands the verdict to the event distributor.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Freshness window and per-device sequence table
//! - **Ports Layer** (`ports/`): `MessageValidationApi` in, `TimeSource` and
//!   `AnomalyScorer` out
//! - **Service Layer** (`service.rs`): The ordered validation pipeline
//! - **Adapters** (`adapters/`): Payload ingestion and distributor wiring
//!
//! ## Security Notes
//!
//! - **Integrity first**: nothing about an unauthenticated message is trusted,
//!   so it never reaches the freshness or sequence stages
//! - **No side effects on rejection**: only a fully accepted message advances
//!   the device's sequence
//! - **Freshness before sequence**: a delayed replay is reported as stale even
//!   when its sequence would also fail

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::bus::{Processed, ValidationBusAdapter};
pub use adapters::ingest::{parse_payload, IngestAdapter};
pub use domain::errors::{FreshnessError, IngestError};
pub use domain::freshness::{is_fresh, parse_timestamp, FreshnessGuard, DEFAULT_MAX_AGE};
pub use domain::sequence::{DeviceState, SequenceGuard};
pub use ports::inbound::MessageValidationApi;
pub use ports::outbound::{AnomalyJudgment, AnomalyScorer, ManualClock, SystemTimeSource, TimeSource};
pub use service::ValidationPipeline;
