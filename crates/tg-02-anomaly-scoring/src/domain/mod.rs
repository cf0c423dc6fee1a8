//! # Domain Layer
//!
//! Feature extraction, normal operating bands and anomaly explanations.

pub mod explain;
pub mod features;
