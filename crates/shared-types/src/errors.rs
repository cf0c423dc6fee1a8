//! # Error Types
//!
//! The validation failure taxonomy shared by the codec, the guards, the
//! pipeline and the scorer port.

use crate::entities::FailedStage;
use thiserror::Error;

/// A message field cannot be canonically represented.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// NaN or an infinity in a reading channel.
    #[error("reading '{channel}' is not a finite number")]
    NonFiniteReading { channel: String },

    /// An extra field reuses a reserved top-level name.
    #[error("extra field '{field}' shadows a reserved field")]
    ReservedField { field: String },

    /// Serialization of the canonical form failed.
    #[error("canonical serialization failed: {0}")]
    Serialization(String),
}

/// Why a message was rejected. Every variant maps onto exactly one
/// [`FailedStage`] so the verdict can name it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The message could not be canonicalized, so it cannot be authenticated.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Tag missing, malformed, or not matching the recomputed one.
    #[error("{reason}")]
    Integrity { reason: String },

    /// Timestamp outside the window, in either direction, or unparseable.
    #[error("{reason}")]
    Freshness { reason: String },

    /// Sequence not strictly above the last accepted value for the device.
    #[error("sequence {received} <= {last_accepted} (last accepted for device {device_id})")]
    Sequence {
        device_id: String,
        received: u64,
        last_accepted: u64,
    },
}

impl ValidationError {
    /// The pipeline stage this failure belongs to.
    pub fn stage(&self) -> FailedStage {
        match self {
            ValidationError::Encoding(_) | ValidationError::Integrity { .. } => {
                FailedStage::Integrity
            }
            ValidationError::Freshness { .. } => FailedStage::Freshness,
            ValidationError::Sequence { .. } => FailedStage::Sequence,
        }
    }
}

/// The anomaly scorer could not produce a judgment.
///
/// Never a validation failure: the accepted message proceeds unannotated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScorerError {
    /// Model missing, not loaded, or failed internally.
    #[error("scorer unavailable: {0}")]
    Unavailable(String),

    /// The readings lack a channel the model needs.
    #[error("missing feature '{0}'")]
    MissingFeature(String),
}
