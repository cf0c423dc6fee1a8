//! # Attack Simulations
//!
//! Each file plays one attacker against a fully wired pipeline and checks
//! the verdict, the failing stage, and that device state was not disturbed.

pub mod replay;
pub mod tampering;
