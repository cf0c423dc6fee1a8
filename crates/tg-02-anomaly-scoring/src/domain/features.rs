//! Feature extraction from device readings.
//!
//! Devices name channels inconsistently across firmware generations, so each
//! feature accepts a primary channel name and a legacy one.

use serde::{Deserialize, Serialize};
use shared_types::{Readings, ScorerError};

/// Gate position assumed when a device does not report one (nominal opening).
pub const DEFAULT_GATE_POSITION: f64 = 45.0;

/// The three values the scorer looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features {
    /// Upstream pressure, PSI.
    pub pressure: f64,
    /// Flow rate, litres per minute.
    pub flow: f64,
    /// Gate A opening, percent.
    pub gate: f64,
}

impl Features {
    /// Pull features out of a reading map.
    ///
    /// Pressure and flow are required; gate position defaults to
    /// [`DEFAULT_GATE_POSITION`].
    pub fn extract(readings: &Readings) -> Result<Self, ScorerError> {
        let pressure = lookup(readings, "pressure_upstream", "pressure_psi")
            .ok_or_else(|| ScorerError::MissingFeature("pressure_upstream".into()))?;
        let flow = lookup(readings, "flow_rate", "flow_rate_lpm")
            .ok_or_else(|| ScorerError::MissingFeature("flow_rate".into()))?;
        let gate = lookup(readings, "gate_a_position", "valve_position").unwrap_or(DEFAULT_GATE_POSITION);
        Ok(Self {
            pressure,
            flow,
            gate,
        })
    }
}

fn lookup(readings: &Readings, primary: &str, legacy: &str) -> Option<f64> {
    readings
        .get(primary)
        .or_else(|| readings.get(legacy))
        .copied()
}

/// Inclusive normal operating range for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Distance from the band centre in half-widths: 1.0 at either edge.
    pub fn deviation(&self, value: f64) -> f64 {
        let centre = (self.low + self.high) / 2.0;
        let half = ((self.high - self.low) / 2.0).max(f64::EPSILON);
        (value - centre).abs() / half
    }
}

/// Normal operating bands for every feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub pressure: Band,
    pub flow: Band,
    pub gate: Band,
}

impl Default for Bands {
    /// Ranges the reference publisher produces under normal operation.
    fn default() -> Self {
        Self {
            pressure: Band::new(58.0, 62.0),
            flow: Band::new(45.0, 55.0),
            gate: Band::new(42.0, 48.0),
        }
    }
}

impl Bands {
    /// Largest deviation across features.
    pub fn worst_deviation(&self, features: &Features) -> f64 {
        self.pressure
            .deviation(features.pressure)
            .max(self.flow.deviation(features.flow))
            .max(self.gate.deviation(features.gate))
    }
}
