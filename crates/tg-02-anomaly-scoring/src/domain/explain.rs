//! Human-readable explanation of flagged readings.

use super::features::Features;

/// Describe why a set of readings looks unusual.
///
/// Fixed operator-facing thresholds, independent of the scoring bands.
pub fn describe_anomaly(features: &Features) -> String {
    let Features {
        pressure,
        flow,
        gate,
    } = *features;
    let mut reasons = Vec::new();

    if pressure > 65.0 {
        reasons.push(format!("high pressure ({pressure:.1} PSI)"));
    } else if pressure < 55.0 {
        reasons.push(format!("low pressure ({pressure:.1} PSI)"));
    }
    if flow < 30.0 {
        reasons.push(format!("low flow ({flow:.1} LPM)"));
    } else if flow > 65.0 {
        reasons.push(format!("high flow ({flow:.1} LPM)"));
    }
    if !(10.0..=90.0).contains(&gate) {
        reasons.push(format!("extreme gate position ({gate:.1}%)"));
    }
    if pressure > 62.0 && flow < 35.0 {
        reasons.push("pressure/flow mismatch".to_string());
    }

    if reasons.is_empty() {
        "Unusual sensor combination detected".to_string()
    } else {
        format!("Unusual pattern: {}", reasons.join(", "))
    }
}
