//! Temporal analysis over a chronological series: smoothing, excavation
//! rate and regression trend.
//!
//! Every analysis reports a too-short series as
//! [`StageOutcome::InsufficientData`] and converts numeric failures into
//! [`StageOutcome::Error`]. Nothing here panics on short or degenerate input.

use serde::{Deserialize, Serialize};

use crate::breakpoints::{classify, Breakpoint};
use crate::error::CoreError;
use crate::stage::{ensure_finite, StageOutcome};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum points for Savitzky-Golay smoothing.
pub const MIN_SMOOTHING_POINTS: usize = 5;
/// Minimum points for the rate of change.
pub const MIN_RATE_POINTS: usize = 2;
/// Minimum points for the regression trend.
pub const MIN_TREND_POINTS: usize = 3;

/// Largest smoothing window.
pub const MAX_SMOOTHING_WINDOW: usize = 5;
/// Highest smoothing polynomial order.
pub const MAX_SMOOTHING_ORDER: usize = 2;

/// Mean rate (ha/day) separating `increasing`/`decreasing` from `stable`.
pub const RATE_TREND_BAND: f64 = 0.05;
/// Absolute NDVI slope per period below which a trend is `stable`.
pub const SLOPE_STABLE_BAND: f64 = 0.001;
/// Absolute mean second difference below which acceleration is `stable`.
pub const ACCELERATION_STABLE_BAND: f64 = 0.001;

/// Added to the rate spread when scoring how consistent the rate is.
pub const RATE_CONFIDENCE_EPSILON: f64 = 0.001;

const SECONDS_PER_DAY: f64 = 86_400.0;

// ---------------------------------------------------------------------------
// Shared labels
// ---------------------------------------------------------------------------

/// Direction of excavation activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcavationTrend {
    Increasing,
    Stable,
    Decreasing,
}

impl ExcavationTrend {
    pub fn as_str(self) -> &'static str {
        match self {
            ExcavationTrend::Increasing => "increasing",
            ExcavationTrend::Stable => "stable",
            ExcavationTrend::Decreasing => "decreasing",
        }
    }
}

/// Change in the pace of excavation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceleration {
    Accelerating,
    Stable,
    Decelerating,
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Least-squares polynomial fit. Coefficients are in ascending order.
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>, CoreError> {
    let terms = degree + 1;
    if xs.len() != ys.len() || xs.len() < terms {
        return Err(CoreError::Computation(format!(
            "polyfit needs {terms} paired points, got {} x and {} y",
            xs.len(),
            ys.len()
        )));
    }

    // Normal equations: (A^T A) c = A^T y, augmented column last.
    let mut m = vec![vec![0.0; terms + 1]; terms];
    for (&x, &y) in xs.iter().zip(ys) {
        let powers: Vec<f64> = (0..terms).map(|p| x.powi(p as i32)).collect();
        for r in 0..terms {
            for c in 0..terms {
                m[r][c] += powers[r] * powers[c];
            }
            m[r][terms] += powers[r] * y;
        }
    }

    for col in 0..terms {
        let pivot = (col..terms)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return Err(CoreError::Computation(
                "polyfit system is singular".into(),
            ));
        }
        m.swap(col, pivot);
        for row in 0..terms {
            if row != col {
                let factor = m[row][col] / m[col][col];
                for k in col..=terms {
                    m[row][k] -= factor * m[col][k];
                }
            }
        }
    }

    let coeffs: Vec<f64> = (0..terms).map(|r| m[r][terms] / m[r][r]).collect();
    for c in &coeffs {
        ensure_finite(*c, "polyfit coefficient")?;
    }
    Ok(coeffs)
}

/// Evaluate ascending-order coefficients at `x`.
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

// ---------------------------------------------------------------------------
// Smoothing
// ---------------------------------------------------------------------------

/// Window length for a series of `n` points: `n` rounded down to odd,
/// capped at 5, floored at 3.
pub fn smoothing_window(n: usize) -> usize {
    let odd = if n % 2 == 1 { n } else { n.saturating_sub(1) };
    odd.min(MAX_SMOOTHING_WINDOW).max(3)
}

/// Savitzky-Golay filter. Edge points are taken from a polynomial fitted to
/// the first or last full window.
pub fn savitzky_golay(values: &[f64], window: usize, order: usize) -> Result<Vec<f64>, CoreError> {
    if window % 2 == 0 || window > values.len() || order >= window {
        return Err(CoreError::Computation(format!(
            "invalid smoothing window {window} (order {order}) for {} points",
            values.len()
        )));
    }

    let half = window / 2;
    let offsets: Vec<f64> = (0..window).map(|i| i as f64).collect();
    let mut out = vec![0.0; values.len()];

    for center in half..values.len() - half {
        let coeffs = polyfit(&offsets, &values[center - half..=center + half], order)?;
        out[center] = polyval(&coeffs, half as f64);
    }

    let head = polyfit(&offsets, &values[..window], order)?;
    for (i, slot) in out.iter_mut().enumerate().take(half) {
        *slot = polyval(&head, i as f64);
    }

    let tail_start = values.len() - window;
    let tail = polyfit(&offsets, &values[tail_start..], order)?;
    for i in values.len() - half..values.len() {
        out[i] = polyval(&tail, (i - tail_start) as f64);
    }

    Ok(out)
}

/// How the smoothed series was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SmoothingStatus {
    Smoothed { window: usize, order: usize },
    /// Too few points; the raw series is returned unchanged.
    InsufficientData { required: usize, found: usize },
    /// The filter failed; the raw series is returned unchanged.
    Fallback { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothingResult {
    pub raw: Vec<f64>,
    pub smoothed: Vec<f64>,
    pub status: SmoothingStatus,
    /// `(var_raw - var_smoothed) / var_raw * 100`, zero for a flat series.
    pub noise_reduction_percent: f64,
}

impl SmoothingResult {
    pub fn is_smoothed(&self) -> bool {
        matches!(self.status, SmoothingStatus::Smoothed { .. })
    }

    /// Human-readable method label.
    pub fn method(&self) -> String {
        match &self.status {
            SmoothingStatus::Smoothed { window, order } => {
                format!("Savitzky-Golay (window={window}, order={order})")
            }
            _ => "none (raw series)".to_string(),
        }
    }

    fn unchanged(raw: &[f64], status: SmoothingStatus) -> Self {
        Self {
            raw: raw.to_vec(),
            smoothed: raw.to_vec(),
            status,
            noise_reduction_percent: 0.0,
        }
    }
}

/// Smooth an NDVI series. Never fails; short series and filter errors come
/// back as the raw series with a non-`Smoothed` status.
pub fn smooth_series(values: &[f64]) -> SmoothingResult {
    if values.len() < MIN_SMOOTHING_POINTS {
        return SmoothingResult::unchanged(
            values,
            SmoothingStatus::InsufficientData {
                required: MIN_SMOOTHING_POINTS,
                found: values.len(),
            },
        );
    }

    let window = smoothing_window(values.len());
    let order = MAX_SMOOTHING_ORDER.min(window - 1);

    match savitzky_golay(values, window, order) {
        Ok(smoothed) => {
            let raw_var = variance(values);
            let noise_reduction_percent = if raw_var > 0.0 {
                (raw_var - variance(&smoothed)) / raw_var * 100.0
            } else {
                0.0
            };
            SmoothingResult {
                raw: values.to_vec(),
                smoothed,
                status: SmoothingStatus::Smoothed { window, order },
                noise_reduction_percent,
            }
        }
        Err(e) => SmoothingResult::unchanged(
            values,
            SmoothingStatus::Fallback {
                message: e.to_string(),
            },
        ),
    }
}

// ---------------------------------------------------------------------------
// Excavation rate
// ---------------------------------------------------------------------------

/// Temporal derivative of excavated area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateStats {
    pub rate_ha_per_day: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub std_rate: f64,
    pub trend: ExcavationTrend,
    /// `|mean| / (std + 0.001)`.
    pub trend_confidence: f64,
    pub num_measurements: usize,
    pub time_period_days: i64,
}

/// Classify a mean rate against the ±0.05 ha/day band.
pub fn classify_rate_trend(mean_rate: f64) -> ExcavationTrend {
    let table = [
        Breakpoint::above(RATE_TREND_BAND, ExcavationTrend::Increasing),
        Breakpoint::above(-RATE_TREND_BAND, ExcavationTrend::Stable),
    ];
    classify(&table, mean_rate, ExcavationTrend::Decreasing)
}

/// Rate of excavation from paired timestamps and areas.
pub fn excavation_rate(timestamps: &[Timestamp], areas: &[f64]) -> StageOutcome<RateStats> {
    let found = timestamps.len().min(areas.len());
    if let Some(short) = StageOutcome::require(MIN_RATE_POINTS, found) {
        return short;
    }
    StageOutcome::from_result(compute_rate(timestamps, areas))
}

fn compute_rate(timestamps: &[Timestamp], areas: &[f64]) -> Result<RateStats, CoreError> {
    if timestamps.len() != areas.len() {
        return Err(CoreError::Validation(format!(
            "{} timestamps for {} area measurements",
            timestamps.len(),
            areas.len()
        )));
    }

    let mut rates = Vec::with_capacity(areas.len() - 1);
    for i in 1..areas.len() {
        let days = (timestamps[i] - timestamps[i - 1]).num_milliseconds() as f64
            / 1000.0
            / SECONDS_PER_DAY;
        if days == 0.0 {
            return Err(CoreError::Computation(format!(
                "zero time interval between samples {} and {i}",
                i - 1
            )));
        }
        rates.push(ensure_finite((areas[i] - areas[i - 1]) / days, "excavation rate")?);
    }

    let mean_rate = mean(&rates);
    let std_rate = std_dev(&rates);

    Ok(RateStats {
        rate_ha_per_day: mean_rate,
        min_rate: rates.iter().copied().fold(f64::INFINITY, f64::min),
        max_rate: rates.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std_rate,
        trend: classify_rate_trend(mean_rate),
        trend_confidence: mean_rate.abs() / (std_rate + RATE_CONFIDENCE_EPSILON),
        num_measurements: areas.len(),
        time_period_days: (timestamps[timestamps.len() - 1] - timestamps[0]).num_days(),
    })
}

// ---------------------------------------------------------------------------
// Regression trend
// ---------------------------------------------------------------------------

/// Linear trend of a smoothed NDVI series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStats {
    pub trend: ExcavationTrend,
    /// NDVI change per sample.
    pub slope: f64,
    pub intercept: f64,
    /// R² of the linear fit, clamped to `[0, 1]`.
    pub r_squared: f64,
    pub description: String,
    pub acceleration: Acceleration,
    pub mean_second_difference: f64,
}

/// Map an NDVI slope to an excavation label. The sign is inverted: falling
/// NDVI means vegetation is being removed.
pub fn classify_slope(slope: f64) -> ExcavationTrend {
    if slope.abs() < SLOPE_STABLE_BAND {
        ExcavationTrend::Stable
    } else if slope > 0.0 {
        ExcavationTrend::Decreasing
    } else {
        ExcavationTrend::Increasing
    }
}

/// Map the mean second difference of NDVI to an excavation pace, inverted
/// the same way as [`classify_slope`].
pub fn classify_acceleration(mean_second_diff: f64) -> Acceleration {
    if mean_second_diff < -ACCELERATION_STABLE_BAND {
        Acceleration::Accelerating
    } else if mean_second_diff > ACCELERATION_STABLE_BAND {
        Acceleration::Decelerating
    } else {
        Acceleration::Stable
    }
}

fn trend_description(trend: ExcavationTrend) -> &'static str {
    match trend {
        ExcavationTrend::Stable => "No significant change in excavation",
        ExcavationTrend::Decreasing => "Vegetation recovering (excavation ceasing)",
        ExcavationTrend::Increasing => "Vegetation loss increasing (active excavation)",
    }
}

/// Ordinary least-squares trend of `values` against sample index.
pub fn analyze_trend(values: &[f64]) -> StageOutcome<TrendStats> {
    if let Some(short) = StageOutcome::require(MIN_TREND_POINTS, values.len()) {
        return short;
    }
    StageOutcome::from_result(compute_trend(values))
}

fn compute_trend(values: &[f64]) -> Result<TrendStats, CoreError> {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    let slope = ensure_finite(sxy / sxx, "trend slope")?;
    let intercept = y_mean - slope * x_mean;

    let ss_tot: f64 = values.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 {
        ensure_finite(1.0 - ss_res / ss_tot, "trend r_squared")?.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let second_diffs: Vec<f64> = values.windows(3).map(|w| w[2] - 2.0 * w[1] + w[0]).collect();
    let mean_second_difference = ensure_finite(mean(&second_diffs), "mean second difference")?;

    let trend = classify_slope(slope);
    Ok(TrendStats {
        trend,
        slope,
        intercept,
        r_squared,
        description: trend_description(trend).to_string(),
        acceleration: classify_acceleration(mean_second_difference),
        mean_second_difference,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
