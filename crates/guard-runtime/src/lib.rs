//! # Telemetry Guard Runtime
//!
//! Wires the validation pipeline, the event distributor and the consumers
//! into one process.
//!
//! ## Data Flow
//!
//! ```text
//! stdin (NDJSON) ──▶ [ingest thread] ──▶ ValidationPipeline ──▶ EventDistributor
//!                                                                     │
//!                           ┌─────────────────────┬───────────────────┤
//!                           ▼                     ▼                   ▼
//!                    DashboardFeed            AttackLog         StatsReporter
//!                  (stdout JSON lines)      (warn! per block)   (gauges, totals)
//! ```
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and subsystem wiring
//! - `dashboard` - Event to dashboard-protocol projection
//! - `handlers/` - Consumer tasks
//! - `ingestion` - Payload reader thread
//! - `runtime` - Lifecycle and shutdown

pub mod container;
pub mod dashboard;
pub mod handlers;
pub mod ingestion;
pub mod runtime;

pub use container::{ConfigError, GuardConfig, GuardContainer};
pub use dashboard::{project, stats_update, AttackKind, DashboardMessage};
pub use handlers::{ConsumerSummary, ConsumerTask, DeliveryHandler};
pub use ingestion::{ingest_lines, spawn_ingestion, IngestSummary};
pub use runtime::GuardRuntime;
