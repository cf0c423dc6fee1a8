//! # Integration Tests
//!
//! Raw payloads in, consumer deliveries out, with every crate in between.

pub mod fanout;
pub mod flows;
