//! # HMAC-SHA256 Authentication
//!
//! Integrity tags over canonical message bytes, keyed with a secret shared
//! out-of-band between every legitimate device and the validator.
//!
//! Tags travel as lowercase hex (64 characters). Verification recomputes the
//! MAC and compares with `Mac::verify_slice`, which is constant-time.

use crate::canonical::canonical_bytes;
use crate::errors::CryptoError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared_types::{EncodingError, TelemetryMessage};
use std::fmt;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag in bytes.
pub const TAG_LEN: usize = 32;

/// Pre-shared HMAC key.
///
/// Zeroized on drop. `Debug` never prints the bytes.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Create from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EmptySecret` for an empty key.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, CryptoError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    /// Create from a UTF-8 passphrase (the form devices are provisioned with).
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CryptoError> {
        Self::new(passphrase.as_bytes().to_vec())
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed secret.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.0).expect("HMAC can take key of any size")
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Compute the hex tag over `canonical` bytes.
pub fn sign(canonical: &[u8], secret: &SharedSecret) -> String {
    let mut mac = secret.mac();
    mac.update(canonical);
    hex::encode(mac.finalize().into_bytes())
}

/// Check `tag` against `canonical` bytes in constant time.
///
/// Malformed tags (bad hex, wrong length) are simply not valid.
pub fn verify(canonical: &[u8], secret: &SharedSecret, tag: &str) -> bool {
    check_tag(canonical, secret, Some(tag)).is_ok()
}

fn check_tag(canonical: &[u8], secret: &SharedSecret, tag: Option<&str>) -> Result<(), CryptoError> {
    let tag = tag.ok_or(CryptoError::MissingTag)?;
    let malformed = CryptoError::MalformedTag { expected: TAG_LEN };
    let tag_bytes = hex::decode(tag.trim()).map_err(|_| malformed.clone())?;
    if tag_bytes.len() != TAG_LEN {
        return Err(malformed);
    }

    let mut mac = secret.mac();
    mac.update(canonical);
    mac.verify_slice(&tag_bytes)
        .map_err(|_| CryptoError::TagMismatch)
}

/// Canonicalize `message`, compute its tag and attach it as `signature`.
///
/// Any previous signature is ignored: the tag always covers the other fields only.
///
/// # Errors
///
/// Returns the `EncodingError` if the message cannot be canonicalized.
pub fn sign_message(message: &mut TelemetryMessage, secret: &SharedSecret) -> Result<(), EncodingError> {
    let bytes = canonical_bytes(message)?;
    message.signature = Some(sign(&bytes, secret));
    Ok(())
}

/// Holds the validator's copy of the shared secret.
#[derive(Debug, Clone)]
pub struct Authenticator {
    secret: SharedSecret,
}

impl Authenticator {
    /// Create an authenticator for `secret`.
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    /// Tag for already-canonical bytes.
    pub fn sign(&self, canonical: &[u8]) -> String {
        sign(canonical, &self.secret)
    }

    /// Constant-time check of a tag against canonical bytes.
    ///
    /// # Errors
    ///
    /// - `CryptoError::MissingTag` when `tag` is `None`
    /// - `CryptoError::MalformedTag` for bad hex or wrong length
    /// - `CryptoError::TagMismatch` when the MAC differs
    pub fn verify(&self, canonical: &[u8], tag: Option<&str>) -> Result<(), CryptoError> {
        check_tag(canonical, &self.secret, tag)
    }

    /// Sign a message in place.
    pub fn sign_message(&self, message: &mut TelemetryMessage) -> Result<(), EncodingError> {
        sign_message(message, &self.secret)
    }
}
