//! # Event Bus Adapter
//!
//! Wires the validation pipeline to the event distributor.
//!
//! ## Event Flow
//!
//! ```text
//! TelemetryMessage ──▶ [ValidationPipeline] ──▶ Verdict
//!                                                  │
//!                         ┌────────────────────────┴──────────────┐
//!                         ↓                                       ↓
//!                    [accepted]                              [rejected]
//!                         │                                       │
//!                [AnomalyScorer, if any]                          │
//!                         │                                       │
//!                         └──────────▶ ValidationEvent ◀──────────┘
//!                                           │
//!                                    [EventDistributor]
//! ```
//!
//! A scorer failure is logged and the event goes out without an annotation.

use crate::ports::inbound::MessageValidationApi;
use crate::ports::outbound::AnomalyScorer;
use shared_bus::EventPublisher;
use shared_types::{AnomalyAnnotation, ScorerError, TelemetryMessage, ValidationEvent};
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to one message.
#[derive(Debug, Clone)]
pub struct Processed {
    /// The event handed to the distributor.
    pub event: ValidationEvent,
    /// Consumers it was queued for.
    pub receivers: usize,
    /// Set when the scorer was asked and could not answer.
    pub scorer_error: Option<ScorerError>,
}

/// Event bus adapter for the validation subsystem.
pub struct ValidationBusAdapter<S, P>
where
    S: MessageValidationApi,
    P: EventPublisher,
{
    /// The validation service
    service: Arc<S>,

    /// The event publisher (distributor)
    publisher: Arc<P>,

    /// Optional anomaly scorer for accepted readings
    scorer: Option<Arc<dyn AnomalyScorer>>,
}

impl<S, P> ValidationBusAdapter<S, P>
where
    S: MessageValidationApi,
    P: EventPublisher,
{
    /// Create an adapter with no anomaly scorer.
    pub fn new(service: Arc<S>, publisher: Arc<P>) -> Self {
        Self {
            service,
            publisher,
            scorer: None,
        }
    }

    /// Score accepted messages with `scorer`.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn AnomalyScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Get a reference to the underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Get a reference to the event publisher.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Validate, score if accepted, and publish.
    pub fn process(&self, message: TelemetryMessage) -> Processed {
        let verdict = self.service.validate(message);
        let mut event = ValidationEvent::new(verdict);
        let mut scorer_error = None;

        if event.verdict.accepted {
            if let Some(scorer) = &self.scorer {
                match scorer.score(&event.verdict.message.readings) {
                    Ok(judgment) => {
                        if judgment.is_anomaly {
                            info!(
                                device_id = %event.verdict.device_id(),
                                sequence = event.verdict.message.sequence,
                                score = judgment.value,
                                explanation = %judgment.explanation,
                                "Anomalous readings"
                            );
                        }
                        event = event.with_anomaly(AnomalyAnnotation {
                            is_anomaly: judgment.is_anomaly,
                            score: judgment.value,
                            explanation: judgment.explanation,
                        });
                    }
                    Err(err) => {
                        warn!(
                            scorer = scorer.name(),
                            device_id = %event.verdict.device_id(),
                            error = %err,
                            "Scorer unavailable, publishing without annotation"
                        );
                        scorer_error = Some(err);
                    }
                }
            }
        }

        let receivers = self.publisher.publish(event.clone());
        Processed {
            event,
            receivers,
            scorer_error,
        }
    }
}
