//! # Adapters Module
//!
//! Infrastructure adapters implementing the ports.
//!
//! - `ingest`: raw payload bytes to `TelemetryMessage`
//! - `bus`: validate, score, and publish to the distributor

pub mod bus;
pub mod ingest;
