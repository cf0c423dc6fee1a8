//! # Shared Types Crate
//!
//! This crate contains the telemetry message, the verdict produced for it by
//! the validation pipeline, and the event pushed through the distributor.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: The wire shape of a device message is defined here.
//! - **Signature Last**: `TelemetryMessage::signature` is computed after every
//!   other field and stripped first when re-canonicalizing.
//! - **Verdicts Keep the Message**: A rejected message still travels with its
//!   verdict so consumers can display what was blocked.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
