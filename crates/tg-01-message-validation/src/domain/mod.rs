//! # Domain Layer
//!
//! Pure validation logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod errors;
pub mod freshness;
pub mod sequence;
