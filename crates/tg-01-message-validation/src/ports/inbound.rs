//! # Inbound Ports (Driving Ports / API)
//!
//! The API the ingestion side uses.

use shared_types::{TelemetryMessage, Verdict};

/// Message validation API.
///
/// Implementations must be thread-safe (`Send + Sync`): several ingestion
/// threads may validate concurrently.
pub trait MessageValidationApi: Send + Sync {
    /// Run integrity, freshness and sequence checks, in that order, stopping
    /// at the first failure.
    ///
    /// Always produces a verdict; failures are verdicts, not errors. Only a
    /// fully accepted message advances the device's sequence state.
    fn validate(&self, message: TelemetryMessage) -> Verdict;

    /// Last accepted sequence for a device.
    fn last_accepted_sequence(&self, device_id: &str) -> Option<u64>;
}
