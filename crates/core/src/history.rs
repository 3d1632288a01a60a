//! Time-series points: the per-run append and the synthetic 5-year
//! baseline generated the first time an AOI is analysed.

use std::f64::consts::PI;

use chrono::{Datelike, Duration};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::detection::{round_to, DetectionResult};
use crate::spectral::PreprocessStats;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the synthetic baseline.
pub const HISTORY_SPAN_DAYS: i64 = 1825;
/// Spacing of synthetic samples.
pub const HISTORY_INTERVAL_DAYS: i64 = 14;

const LEGAL_AREA_RANGE: (f64, f64) = (5.0, 25.0);
const NOGO_AREA_RANGE: (f64, f64) = (1.0, 8.0);

const SIGMOID_STEEPNESS: f64 = 10.0;
const SEASONAL_AMPLITUDE: f64 = 0.1;
const NOISE_HALF_WIDTH: f64 = 0.05;

const CONFIDENCE_BASE: f64 = 0.85;
const CONFIDENCE_AMPLITUDE: f64 = 0.1;
const CONFIDENCE_RANGE: (f64, f64) = (0.6, 0.95);

/// NDVI of an untouched boundary and the drop at full excavation.
const NDVI_PRISTINE: f64 = 0.8;
const NDVI_FULL_DROP: f64 = 0.4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The part of a boundary the time-series writers need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryRef {
    pub id: DbId,
    pub is_legal: bool,
}

/// One time-series sample for a boundary, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub boundary_id: DbId,
    pub timestamp: Timestamp,
    pub raw_area_ha: f64,
    pub smoothed_area_ha: f64,
    pub rate_ha_per_day: f64,
    pub anomaly_score: f64,
    pub confidence: f64,
    pub ndvi_mean: Option<f64>,
}

// ---------------------------------------------------------------------------
// Per-run append
// ---------------------------------------------------------------------------

/// One point per boundary for an analysis run: legal boundaries receive the
/// legal area, no-go boundaries the no-go area.
pub fn points_from_detection(
    boundaries: &[BoundaryRef],
    detection: &DetectionResult,
    stats: &PreprocessStats,
    timestamp: Timestamp,
) -> Vec<TimeSeriesPoint> {
    boundaries
        .iter()
        .map(|b| {
            let area = if b.is_legal {
                detection.legal_area_ha
            } else {
                detection.nogo_area_ha
            };
            TimeSeriesPoint {
                boundary_id: b.id,
                timestamp,
                raw_area_ha: area,
                smoothed_area_ha: area,
                rate_ha_per_day: 0.0,
                anomaly_score: stats.suspicious_fraction(),
                confidence: detection.confidence,
                ndvi_mean: Some(stats.ndvi_mean),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Synthetic baseline
// ---------------------------------------------------------------------------

fn logistic(progress: f64) -> f64 {
    1.0 / (1.0 + (-SIGMOID_STEEPNESS * (progress - 0.5)).exp())
}

fn seasonal_factor(day_of_year: u32) -> f64 {
    1.0 + SEASONAL_AMPLITUDE * (2.0 * PI * day_of_year as f64 / 365.0).sin()
}

fn seasonal_confidence(day_of_year: u32) -> f64 {
    let raw = CONFIDENCE_BASE + CONFIDENCE_AMPLITUDE * (2.0 * PI * day_of_year as f64 / 365.0).cos();
    raw.clamp(CONFIDENCE_RANGE.0, CONFIDENCE_RANGE.1)
}

/// NDVI implied by an excavated area: falls linearly as the boundary fills.
fn synthetic_ndvi(area: f64, base: f64, max: f64) -> f64 {
    NDVI_PRISTINE - NDVI_FULL_DROP * (area - base) / (max - base)
}

/// Generate a bi-weekly baseline ending at `end` for every boundary.
///
/// Areas follow a logistic growth curve with seasonal variation and ±5%
/// noise drawn from `rng`, clamped to the boundary's range.
pub fn generate_synthetic_history<R: Rng>(
    boundaries: &[BoundaryRef],
    end: Timestamp,
    rng: &mut R,
) -> Vec<TimeSeriesPoint> {
    let start = end - Duration::days(HISTORY_SPAN_DAYS);
    let per_boundary = (HISTORY_SPAN_DAYS / HISTORY_INTERVAL_DAYS + 1) as usize;
    let mut points = Vec::with_capacity(boundaries.len() * per_boundary);

    for boundary in boundaries {
        let (base, max) = if boundary.is_legal {
            LEGAL_AREA_RANGE
        } else {
            NOGO_AREA_RANGE
        };
        let span = max - base;
        let mut prev_area = base;
        let mut current = start;

        while current <= end {
            let progress = (current - start).num_days() as f64 / HISTORY_SPAN_DAYS as f64;
            let growth = logistic(progress);
            let day_of_year = current.ordinal();
            let noise = 1.0 + rng.random_range(-NOISE_HALF_WIDTH..NOISE_HALF_WIDTH);

            let area = (base + span * growth * seasonal_factor(day_of_year) * noise).clamp(base, max);
            let expected = base + span * growth;
            let rate = (area - prev_area) / HISTORY_INTERVAL_DAYS as f64;
            let anomaly = ((area - expected).abs() / span).min(1.0);

            points.push(TimeSeriesPoint {
                boundary_id: boundary.id,
                timestamp: current,
                raw_area_ha: round_to(area, 4),
                smoothed_area_ha: round_to(area, 4),
                rate_ha_per_day: round_to(rate, 4),
                anomaly_score: round_to(anomaly, 3),
                confidence: round_to(seasonal_confidence(day_of_year), 3),
                ndvi_mean: Some(round_to(synthetic_ndvi(area, base, max), 4)),
            });

            prev_area = area;
            current += Duration::days(HISTORY_INTERVAL_DAYS);
        }
    }

    points
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
