//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that the ingestion side calls
//! - **Outbound (Driven)**: Clock and anomaly scorer this subsystem depends on

pub mod inbound;
pub mod outbound;
