//! # Anomaly Scoring Subsystem (TG-02)
//!
//! A concrete `AnomalyScorer` for accepted readings. Validation never
//! depends on it: the pipeline treats a missing or failing scorer as "no
//! judgment" and carries on.
//!
//! ## Model
//!
//! Each feature (upstream pressure, flow rate, gate position) has a normal
//! operating band. The worst deviation across features, measured in band
//! half-widths, decides the score. Flagged readings get an operator-facing
//! explanation such as `"Unusual pattern: high pressure (70.0 PSI)"`.

pub mod domain;
pub mod service;

pub use domain::explain::describe_anomaly;
pub use domain::features::{Band, Bands, Features, DEFAULT_GATE_POSITION};
pub use service::{ThresholdScorer, DEFAULT_TOLERANCE};
