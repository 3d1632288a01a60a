//! Zone-level anomaly scoring.
//!
//! The isolation-forest model is not wired in yet; [`detect_anomalies`]
//! returns a fixed pair of zones so downstream consumers see the final
//! shape. Scores here never feed the violation decision.

use serde::{Deserialize, Serialize};

use crate::spectral::PixelSample;

/// Score above which a zone is reported as a high anomaly.
pub const HIGH_ANOMALY_SCORE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAnomaly {
    pub location: String,
    pub anomaly_score: f64,
    pub confidence: f64,
    pub pixels_affected: u32,
}

impl ZoneAnomaly {
    pub fn is_high(&self) -> bool {
        self.anomaly_score > HIGH_ANOMALY_SCORE
    }
}

// TODO: replace with a trained isolation forest over the pixel bands once the
// satellite source returns real band data.
pub fn detect_anomalies(_pixels: &[PixelSample]) -> Vec<ZoneAnomaly> {
    vec![
        ZoneAnomaly {
            location: "zone_a".into(),
            anomaly_score: 0.85,
            confidence: 0.92,
            pixels_affected: 245,
        },
        ZoneAnomaly {
            location: "zone_b".into(),
            anomaly_score: 0.45,
            confidence: 0.78,
            pixels_affected: 67,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_two_fixed_zones() {
        let zones = detect_anomalies(&[]);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].location, "zone_a");
        assert!(zones[0].is_high());
        assert_eq!(zones[1].pixels_affected, 67);
        assert!(!zones[1].is_high());
    }
}
