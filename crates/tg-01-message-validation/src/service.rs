//! # Validation Pipeline
//!
//! Application service implementing `MessageValidationApi`.
//!
//! ## Stage order
//!
//! ```text
//! message ──▶ canonicalize + HMAC ──▶ freshness ──▶ sequence ──▶ ACCEPTED
//!                  │                      │             │
//!                  ▼                      ▼             ▼
//!              INTEGRITY              FRESHNESS      SEQUENCE
//! ```
//!
//! The order is fixed and short-circuits. A message that fails integrity
//! never reaches the sequence table, and a stale one never advances it.

use crate::domain::freshness::FreshnessGuard;
use crate::domain::sequence::{DeviceState, SequenceGuard};
use crate::ports::inbound::MessageValidationApi;
use crate::ports::outbound::{SystemTimeSource, TimeSource};
use shared_crypto::{canonical_bytes, Authenticator, SharedSecret};
use shared_types::{TelemetryMessage, ValidationError, Verdict};
use tracing::{debug, warn};

/// Validation pipeline: Authenticator, FreshnessGuard, SequenceGuard.
pub struct ValidationPipeline<C: TimeSource = SystemTimeSource> {
    authenticator: Authenticator,
    freshness: FreshnessGuard,
    sequences: SequenceGuard,
    clock: C,
}

impl ValidationPipeline<SystemTimeSource> {
    /// Pipeline on the system clock.
    pub fn new(secret: SharedSecret, freshness: FreshnessGuard) -> Self {
        Self::with_clock(secret, freshness, SystemTimeSource)
    }
}

impl<C: TimeSource> ValidationPipeline<C> {
    /// Pipeline on an injected clock.
    pub fn with_clock(secret: SharedSecret, freshness: FreshnessGuard, clock: C) -> Self {
        Self {
            authenticator: Authenticator::new(secret),
            freshness,
            sequences: SequenceGuard::new(),
            clock,
        }
    }

    pub fn freshness(&self) -> &FreshnessGuard {
        &self.freshness
    }

    /// Copy of a device's ordering state.
    pub fn device_state(&self, device_id: &str) -> Option<DeviceState> {
        self.sequences.device_state(device_id)
    }

    /// Number of devices with ordering state.
    pub fn device_count(&self) -> usize {
        self.sequences.device_count()
    }

    /// All stages; `Ok` carries the acceptance reason.
    fn run_stages(&self, message: &TelemetryMessage) -> Result<String, ValidationError> {
        // 1. Integrity
        let canonical = canonical_bytes(message)?;
        self.authenticator
            .verify(&canonical, message.signature.as_deref())
            .map_err(|e| ValidationError::Integrity {
                reason: e.to_string(),
            })?;

        // 2. Freshness
        let now = self.clock.now();
        let age = self
            .freshness
            .check(&message.timestamp, now)
            .map_err(|e| ValidationError::Freshness {
                reason: e.to_string(),
            })?;

        // 3. Sequence
        self.sequences
            .advance(&message.device_id, message.sequence, now)?;

        Ok(format!(
            "age {:.1}s (max {}s)",
            age,
            self.freshness.max_age().as_secs_f64()
        ))
    }
}

impl<C: TimeSource> MessageValidationApi for ValidationPipeline<C> {
    fn validate(&self, message: TelemetryMessage) -> Verdict {
        match self.run_stages(&message) {
            Ok(reason) => {
                debug!(
                    device_id = %message.device_id,
                    sequence = message.sequence,
                    reason = %reason,
                    "Message accepted"
                );
                Verdict::accepted(message, reason)
            }
            Err(err) => {
                let stage = err.stage();
                let reason = err.to_string();
                warn!(
                    device_id = %message.device_id,
                    sequence = message.sequence,
                    stage = stage.as_str(),
                    reason = %reason,
                    "Message rejected"
                );
                Verdict::rejected(message, stage, reason)
            }
        }
    }

    fn last_accepted_sequence(&self, device_id: &str) -> Option<u64> {
        self.sequences.last_accepted(device_id)
    }
}
