//! # Ingest Adapter
//!
//! Entry point for raw payloads from the transport (one JSON object per
//! payload). Parsing is the only step that can fail without a verdict.

use super::bus::{Processed, ValidationBusAdapter};
use crate::domain::errors::IngestError;
use crate::ports::inbound::MessageValidationApi;
use shared_bus::EventPublisher;
use shared_types::TelemetryMessage;
use std::sync::Arc;
use tracing::warn;

/// Parse one payload into a message.
///
/// The timestamp is kept as a string here; an unparseable one is judged by
/// the freshness stage, not rejected as malformed.
pub fn parse_payload(payload: &[u8]) -> Result<TelemetryMessage, IngestError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(IngestError::Empty);
    }
    Ok(serde_json::from_slice(payload)?)
}

/// Raw payload ingestion in front of the bus adapter.
pub struct IngestAdapter<S, P>
where
    S: MessageValidationApi,
    P: EventPublisher,
{
    bus: Arc<ValidationBusAdapter<S, P>>,
}

impl<S, P> Clone for IngestAdapter<S, P>
where
    S: MessageValidationApi,
    P: EventPublisher,
{
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<S, P> IngestAdapter<S, P>
where
    S: MessageValidationApi,
    P: EventPublisher,
{
    pub fn new(bus: Arc<ValidationBusAdapter<S, P>>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &ValidationBusAdapter<S, P> {
        &self.bus
    }

    /// Parse, validate, score and publish one payload.
    pub fn ingest(&self, payload: &[u8]) -> Result<Processed, IngestError> {
        let message = parse_payload(payload).map_err(|err| {
            warn!(kind = err.kind(), error = %err, bytes = payload.len(), "Malformed payload dropped");
            err
        })?;
        Ok(self.bus.process(message))
    }
}
