//! # Sequence Guard
//!
//! Per-device strictly increasing counters. The only mutable shared state in
//! the pipeline.
//!
//! ## Locking
//!
//! Each device owns an independently lockable `DeviceState`. The map itself
//! is a sharded `DashMap`, touched only long enough to find (or insert) a
//! device's slot; the shard lock is released before the device lock is taken,
//! so devices never contend with each other.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_types::{DeviceId, ValidationError};
use std::sync::Arc;

/// Ordering state for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    /// Highest sequence accepted so far.
    pub last_accepted_sequence: u64,
    /// When that sequence was accepted (validator clock).
    pub last_accepted_at: DateTime<Utc>,
    /// Number of messages accepted from this device.
    pub accepted: u64,
}

/// Device identity to ordering state.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    devices: DashMap<DeviceId, Arc<Mutex<DeviceState>>>,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `sequence` for `device_id` if it is strictly above the last
    /// accepted value, and advance the stored value.
    ///
    /// The first message from an unknown device is accepted unconditionally.
    /// A rejection leaves the state untouched.
    ///
    /// Returns the previous last accepted sequence (`None` for a new device).
    pub fn advance(
        &self,
        device_id: &str,
        sequence: u64,
        at: DateTime<Utc>,
    ) -> Result<Option<u64>, ValidationError> {
        let existing = self.devices.get(device_id).map(|slot| Arc::clone(slot.value()));
        let slot = match existing {
            Some(slot) => slot,
            None => match self.devices.entry(device_id.to_string()) {
                Entry::Occupied(slot) => Arc::clone(slot.get()),
                Entry::Vacant(vacant) => {
                    vacant.insert(Arc::new(Mutex::new(DeviceState {
                        last_accepted_sequence: sequence,
                        last_accepted_at: at,
                        accepted: 1,
                    })));
                    return Ok(None);
                }
            },
        };

        let mut state = slot.lock();
        if sequence > state.last_accepted_sequence {
            let previous = state.last_accepted_sequence;
            state.last_accepted_sequence = sequence;
            state.last_accepted_at = at;
            state.accepted += 1;
            Ok(Some(previous))
        } else {
            Err(ValidationError::Sequence {
                device_id: device_id.to_string(),
                received: sequence,
                last_accepted: state.last_accepted_sequence,
            })
        }
    }

    /// Boolean form of [`advance`](Self::advance), stamped with the current time.
    pub fn check_and_advance(&self, device_id: &str, sequence: u64) -> bool {
        self.advance(device_id, sequence, Utc::now()).is_ok()
    }

    /// Last accepted sequence for a device, if it has been seen.
    pub fn last_accepted(&self, device_id: &str) -> Option<u64> {
        self.device_state(device_id)
            .map(|state| state.last_accepted_sequence)
    }

    /// Copy of a device's ordering state.
    pub fn device_state(&self, device_id: &str) -> Option<DeviceState> {
        let slot = self.devices.get(device_id).map(|slot| Arc::clone(slot.value()))?;
        let state = *slot.lock();
        Some(state)
    }

    /// Number of devices with ordering state.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}
