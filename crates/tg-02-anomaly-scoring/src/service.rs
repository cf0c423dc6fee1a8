//! # Threshold Scorer
//!
//! `AnomalyScorer` implementation comparing readings against normal operating
//! bands.
//!
//! The score follows the decision-function convention of the original model:
//! positive for normal readings, negative for anomalies, lower meaning more
//! anomalous. With the default tolerance a value exactly on a band edge scores
//! about 0.09; one 10% of a half-width beyond the edge scores 0.

use crate::domain::explain::describe_anomaly;
use crate::domain::features::{Bands, Features};
use shared_types::{Readings, ScorerError};
use tg_01_message_validation::{AnomalyJudgment, AnomalyScorer};
use tracing::trace;

/// Deviation (in half-widths) at which the score crosses zero.
pub const DEFAULT_TOLERANCE: f64 = 1.1;

/// Band-based anomaly scorer.
#[derive(Debug, Clone)]
pub struct ThresholdScorer {
    bands: Bands,
    tolerance: f64,
}

impl Default for ThresholdScorer {
    fn default() -> Self {
        Self::new(Bands::default())
    }
}

impl ThresholdScorer {
    pub fn new(bands: Bands) -> Self {
        Self {
            bands,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Score crosses zero at `tolerance` half-widths from a band centre.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(f64::EPSILON);
        self
    }

    pub fn bands(&self) -> &Bands {
        &self.bands
    }

    /// Score already extracted features.
    pub fn score_features(&self, features: &Features) -> AnomalyJudgment {
        let worst = self.bands.worst_deviation(features);
        let value = (self.tolerance - worst) / self.tolerance;
        let is_anomaly = value < 0.0;
        trace!(?features, worst, value, "Scored readings");

        AnomalyJudgment {
            is_anomaly,
            value,
            explanation: if is_anomaly {
                describe_anomaly(features)
            } else {
                String::new()
            },
        }
    }
}

impl AnomalyScorer for ThresholdScorer {
    fn score(&self, readings: &Readings) -> Result<AnomalyJudgment, ScorerError> {
        let features = Features::extract(readings)?;
        Ok(self.score_features(&features))
    }

    fn name(&self) -> &str {
        "threshold"
    }
}
