//! # Guard Container
//!
//! Builds the validation pipeline, the distributor and the ingest adapter
//! from a `GuardConfig`, and holds them for the lifetime of the runtime.
//!
//! ```text
//! payload ──▶ IngestAdapter ──▶ ValidationBusAdapter ──▶ EventDistributor
//!                                    │         │
//!                          ValidationPipeline  ThresholdScorer (optional)
//! ```

pub mod config;

pub use config::{ConfigError, GuardConfig};

use shared_bus::EventDistributor;
use shared_crypto::SharedSecret;
use std::sync::Arc;
use tg_01_message_validation::{
    FreshnessGuard, IngestAdapter, SystemTimeSource, TimeSource, ValidationBusAdapter,
    ValidationPipeline,
};
use tracing::info;

/// Ingest adapter as wired by the container.
pub type GuardIngest<C = SystemTimeSource> = IngestAdapter<ValidationPipeline<C>, EventDistributor>;

/// Subsystem instances shared by the ingestion thread and the consumer tasks.
pub struct GuardContainer<C: TimeSource = SystemTimeSource> {
    pub config: GuardConfig,
    pub pipeline: Arc<ValidationPipeline<C>>,
    pub distributor: Arc<EventDistributor>,
    pub ingest: GuardIngest<C>,
}

impl GuardContainer<SystemTimeSource> {
    /// Wire everything on the system clock.
    pub fn new(config: GuardConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemTimeSource)
    }
}

impl<C: TimeSource + 'static> GuardContainer<C> {
    /// Wire everything on an injected clock.
    pub fn with_clock(config: GuardConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate_for_production()?;

        let secret = config
            .security
            .shared_secret
            .as_deref()
            .ok_or(ConfigError::MissingSharedSecret)
            .and_then(|raw| {
                SharedSecret::new(raw.as_bytes()).map_err(|_| ConfigError::MissingSharedSecret)
            })?;

        let freshness = FreshnessGuard::new(config.freshness.max_age())
            .with_future_skew(config.freshness.max_future_skew());
        let pipeline = Arc::new(ValidationPipeline::with_clock(secret, freshness, clock));
        let distributor = Arc::new(EventDistributor::with_capacity(
            config.distributor.consumer_capacity,
        ));

        let bus = ValidationBusAdapter::new(pipeline.clone(), distributor.clone());
        let bus = Self::attach_scorer(bus, &config);

        info!(
            max_age_secs = config.freshness.max_age_secs,
            max_future_skew_secs = config.freshness.max_future_skew_secs,
            consumer_capacity = config.distributor.consumer_capacity,
            scoring = config.scoring.enabled,
            "Validation pipeline ready"
        );

        Ok(Self {
            ingest: IngestAdapter::new(Arc::new(bus)),
            config,
            pipeline,
            distributor,
        })
    }

    #[cfg(feature = "scoring")]
    fn attach_scorer(
        bus: ValidationBusAdapter<ValidationPipeline<C>, EventDistributor>,
        config: &GuardConfig,
    ) -> ValidationBusAdapter<ValidationPipeline<C>, EventDistributor> {
        if !config.scoring.enabled {
            return bus;
        }
        let scorer = tg_02_anomaly_scoring::ThresholdScorer::default()
            .with_tolerance(config.scoring.tolerance);
        bus.with_scorer(Arc::new(scorer))
    }

    #[cfg(not(feature = "scoring"))]
    fn attach_scorer(
        bus: ValidationBusAdapter<ValidationPipeline<C>, EventDistributor>,
        _config: &GuardConfig,
    ) -> ValidationBusAdapter<ValidationPipeline<C>, EventDistributor> {
        bus
    }
}
