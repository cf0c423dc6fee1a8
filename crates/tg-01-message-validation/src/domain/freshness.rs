//! # Freshness Guard
//!
//! Stateless check that a message's declared creation time is recent.
//! Catches delayed replays that a sequence counter alone would miss after a
//! validator restart, and future-dated messages crafted to stay "fresh".

use super::errors::FreshnessError;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::Duration;

/// Nominal freshness window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30);

/// Whether `declared` is at most `max_age` old and not in the future.
pub fn is_fresh(declared: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    let age = age_nanos(declared, now);
    age >= 0 && age <= as_nanos(max_age)
}

/// Parse a device timestamp: RFC 3339, or a naive ISO-8601 instant taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Exact `now - declared` in nanoseconds; sub-second parts are never rounded away.
fn age_nanos(declared: DateTime<Utc>, now: DateTime<Utc>) -> i128 {
    let delta = now.signed_duration_since(declared);
    i128::from(delta.num_seconds()) * 1_000_000_000 + i128::from(delta.subsec_nanos())
}

fn as_nanos(d: Duration) -> i128 {
    i128::try_from(d.as_nanos()).unwrap_or(i128::MAX)
}

/// Freshness window: `-max_future_skew <= now - declared <= max_age`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessGuard {
    max_age: Duration,
    max_future_skew: Duration,
}

impl Default for FreshnessGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}

impl FreshnessGuard {
    /// Window of `max_age` with no tolerance for future-dated messages.
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            max_future_skew: Duration::ZERO,
        }
    }

    /// Tolerate device clocks running ahead by up to `skew`.
    #[must_use]
    pub fn with_future_skew(mut self, skew: Duration) -> Self {
        self.max_future_skew = skew;
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn max_future_skew(&self) -> Duration {
        self.max_future_skew
    }

    /// Check a declared timestamp string against `now`.
    ///
    /// Returns the observed age in seconds (negative when within the future skew).
    pub fn check(&self, declared: &str, now: DateTime<Utc>) -> Result<f64, FreshnessError> {
        let declared = parse_timestamp(declared).ok_or(FreshnessError::InvalidTimestamp)?;
        self.check_instant(declared, now)
    }

    /// Same as [`check`](Self::check) for an already parsed instant.
    pub fn check_instant(
        &self,
        declared: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<f64, FreshnessError> {
        let age = age_nanos(declared, now);
        let age_secs = age as f64 / 1_000_000_000.0;

        if age < 0 && -age > as_nanos(self.max_future_skew) {
            return Err(FreshnessError::FutureDated {
                ahead_secs: -age_secs,
                max_skew_secs: self.max_future_skew.as_secs_f64(),
            });
        }
        if age > as_nanos(self.max_age) {
            return Err(FreshnessError::Stale {
                age_secs,
                max_age_secs: self.max_age.as_secs_f64(),
            });
        }
        Ok(age_secs)
    }
}
