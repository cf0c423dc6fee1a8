//! # Shared Crypto - Message Canonicalization and Authentication
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `canonical` | Sorted-key compact JSON | Deterministic bytes to sign |
//! | `authenticator` | HMAC-SHA256 | Integrity tag over canonical bytes |
//!
//! ## Security Properties
//!
//! - **Canonical form**: Independent of field insertion order, sensitive to every value
//! - **Constant-time verification**: Tags are compared with `Mac::verify_slice`
//! - **Secret hygiene**: `SharedSecret` is zeroized on drop and never printed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authenticator;
pub mod canonical;
pub mod errors;

// Re-exports
pub use authenticator::{sign, sign_message, verify, Authenticator, SharedSecret, TAG_LEN};
pub use canonical::{canonical_bytes, canonical_string};
pub use errors::CryptoError;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
