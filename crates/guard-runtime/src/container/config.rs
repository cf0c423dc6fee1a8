//! # Guard Configuration
//!
//! Runtime parameters for the validation pipeline, the distributor and the
//! consumers, with environment overrides.
//!
//! ## Security Requirements
//!
//! - The shared secret MUST be configured; there is no built-in default
//! - The secret is never logged or included in `Debug` output

use guard_telemetry::parse_flag;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Complete guard configuration.
#[derive(Debug, Clone, Default)]
pub struct GuardConfig {
    /// Shared secret.
    pub security: SecurityConfig,
    /// Freshness window.
    pub freshness: FreshnessConfig,
    /// Event distribution.
    pub distributor: DistributorConfig,
    /// Anomaly scoring.
    pub scoring: ScoringConfig,
}

impl GuardConfig {
    /// Defaults overridden by `TG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `TG_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secret) = lookup("TG_SHARED_SECRET") {
            config.security.shared_secret = Some(secret);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TG_MAX_AGE_SECS")? {
            config.freshness.max_age_secs = secs;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TG_MAX_FUTURE_SKEW_SECS")? {
            config.freshness.max_future_skew_secs = secs;
        }
        if let Some(capacity) = parse_var::<usize>(&lookup, "TG_CONSUMER_CAPACITY")? {
            config.distributor.consumer_capacity = capacity;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TG_STATS_INTERVAL_SECS")? {
            config.distributor.stats_interval_secs = secs;
        }
        if let Some(raw) = lookup("TG_SCORER_ENABLED") {
            config.scoring.enabled = parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                key: "TG_SCORER_ENABLED",
                value: raw.clone(),
            })?;
        }
        if let Some(tolerance) = parse_var::<f64>(&lookup, "TG_SCORER_TOLERANCE")? {
            config.scoring.tolerance = tolerance;
        }

        Ok(config)
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the shared secret is missing or empty
    /// - the freshness window or a consumer queue has zero size
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        match self.security.shared_secret.as_deref() {
            None => return Err(ConfigError::MissingSharedSecret),
            Some(secret) if secret.is_empty() => return Err(ConfigError::MissingSharedSecret),
            Some(_) => {}
        }
        if self.freshness.max_age_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TG_MAX_AGE_SECS",
                value: "0".into(),
            });
        }
        if self.distributor.consumer_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TG_CONSUMER_CAPACITY",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(ConfigError::InvalidValue { key, value: raw }),
        },
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No shared secret (or an empty one) was provided.
    #[error(
        "SECURITY VIOLATION: no shared secret configured. \
         Set the TG_SHARED_SECRET environment variable."
    )]
    MissingSharedSecret,

    /// An override could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Security configuration.
#[derive(Clone, Default)]
pub struct SecurityConfig {
    /// Shared secret for message authentication.
    pub shared_secret: Option<String>,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field(
                "shared_secret",
                &self.shared_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Freshness configuration.
#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    /// Maximum accepted message age.
    pub max_age_secs: u64,
    /// Tolerated device clock lead.
    pub max_future_skew_secs: u64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 30,
            max_future_skew_secs: 0,
        }
    }
}

impl FreshnessConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn max_future_skew(&self) -> Duration {
        Duration::from_secs(self.max_future_skew_secs)
    }
}

/// Event distribution configuration.
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Per-consumer queue bound before the oldest events are dropped.
    pub consumer_capacity: usize,
    /// Interval between dashboard stats updates and the stats log line.
    pub stats_interval_secs: u64,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            consumer_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            stats_interval_secs: 10,
        }
    }
}

impl DistributorConfig {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }
}

/// Anomaly scoring configuration.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Score accepted readings.
    pub enabled: bool,
    /// Deviation, in band half-widths, at which readings become anomalous.
    pub tolerance: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: 1.1,
        }
    }
}
