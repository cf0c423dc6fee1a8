//! Crypto error types.

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The shared secret is empty.
    #[error("shared secret must not be empty")]
    EmptySecret,

    /// No tag was attached to the message.
    #[error("no signature field in message")]
    MissingTag,

    /// The tag is not valid hex or has the wrong length.
    #[error("malformed signature: expected {expected} hex-encoded bytes")]
    MalformedTag {
        /// Expected tag length in bytes
        expected: usize,
    },

    /// The tag does not match the recomputed one.
    #[error("HMAC mismatch, message was tampered with or signed with another key")]
    TagMismatch,
}
