//! Early-warning engine: boundary proximity, spectral shift, composite risk
//! score and the 14-day predictive alert.

use serde::{Deserialize, Serialize};

use crate::breakpoints::{classify, Breakpoint};
use crate::error::CoreError;
use crate::stage::{ensure_finite, StageOutcome};
use crate::temporal::{std_dev, ExcavationTrend, RateStats, TrendStats};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BUFFER_DISTANCE_M: u32 = 500;
pub const DEFAULT_CRITICAL_DISTANCE_M: u32 = 100;
pub const DEFAULT_PROJECTION_DAYS: u32 = 14;

/// Fixed distances and horizon used by the early-warning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyWarningConfig {
    pub buffer_distance_m: u32,
    pub critical_distance_m: u32,
    pub projection_days: u32,
}

impl Default for EarlyWarningConfig {
    fn default() -> Self {
        Self {
            buffer_distance_m: DEFAULT_BUFFER_DISTANCE_M,
            critical_distance_m: DEFAULT_CRITICAL_DISTANCE_M,
            projection_days: DEFAULT_PROJECTION_DAYS,
        }
    }
}

// ---------------------------------------------------------------------------
// Boundary proximity
// ---------------------------------------------------------------------------

/// Pixels assumed per sample when estimating buffer occupancy.
pub const PIXELS_PER_SAMPLE: f64 = 100.0;
/// Area growth (ha) that maps to a buffer ratio of 1.0 before capping.
pub const BUFFER_TREND_SCALE_HA: f64 = 10.0;
/// Largest share of pixels assumed to sit inside the buffer.
pub const MAX_BUFFER_RATIO: f64 = 0.15;
/// Share of buffer pixels assumed to sit inside the critical sub-buffer.
pub const CRITICAL_SHARE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityStatus {
    LowRisk,
    MediumRisk,
    HighRisk,
}

const PROXIMITY_TABLE: [Breakpoint<ProximityStatus>; 2] = [
    Breakpoint::above(30.0, ProximityStatus::HighRisk),
    Breakpoint::above(10.0, ProximityStatus::MediumRisk),
];

/// Scalar estimate of excavation inside the no-go buffer.
///
/// This is an approximation from area growth, not a geometric buffer
/// intersection; pixel counts are truncated to whole pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityEstimate {
    pub buffer_distance_m: u32,
    pub critical_distance_m: u32,
    pub excavation_trend_ha: f64,
    pub pixels_in_buffer: u64,
    pub pixels_in_critical_zone: u64,
    pub buffer_coverage_percent: f64,
    pub critical_zone_risk_percent: f64,
    /// 0-100.
    pub encroachment_risk_score: f64,
    pub nogo_zones_identified: usize,
    pub status: ProximityStatus,
}

/// Estimate boundary encroachment from a chronological area series.
pub fn estimate_boundary_proximity(
    areas: &[f64],
    nogo_zones: usize,
    config: &EarlyWarningConfig,
) -> ProximityEstimate {
    let excavation_trend_ha = match areas {
        [.., prev, last] => (last - prev).max(0.0),
        _ => 0.0,
    };
    let buffer_ratio = (excavation_trend_ha / BUFFER_TREND_SCALE_HA).min(MAX_BUFFER_RATIO);

    let capacity = areas.len() as f64 * PIXELS_PER_SAMPLE;
    let pixels_in_buffer = (capacity * buffer_ratio) as u64;
    let pixels_in_critical_zone = (pixels_in_buffer as f64 * CRITICAL_SHARE) as u64;

    let coverage = if capacity > 0.0 {
        pixels_in_buffer as f64 / capacity
    } else {
        0.0
    };
    let critical = pixels_in_critical_zone as f64 / pixels_in_buffer.max(1) as f64;
    let encroachment_risk_score = coverage * 100.0;

    ProximityEstimate {
        buffer_distance_m: config.buffer_distance_m,
        critical_distance_m: config.critical_distance_m,
        excavation_trend_ha,
        pixels_in_buffer,
        pixels_in_critical_zone,
        buffer_coverage_percent: coverage * 100.0,
        critical_zone_risk_percent: critical * 100.0,
        encroachment_risk_score,
        nogo_zones_identified: nogo_zones,
        status: classify(&PROXIMITY_TABLE, encroachment_risk_score, ProximityStatus::LowRisk),
    }
}

// ---------------------------------------------------------------------------
// Spectral shift
// ---------------------------------------------------------------------------

pub const MIN_SPECTRAL_POINTS: usize = 3;
/// Standard deviations below the mean change that mark an anomalous period.
pub const ANOMALY_SIGMA: f64 = 2.0;
/// Samples compared at each end of the series for degradation.
pub const DEGRADATION_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftSeverity {
    None,
    Low,
    Medium,
    High,
}

impl ShiftSeverity {
    pub fn description(self) -> &'static str {
        match self {
            ShiftSeverity::High => "Significant vegetation stress detected",
            ShiftSeverity::Medium => "Moderate vegetation stress detected",
            ShiftSeverity::Low => "Subtle vegetation stress detected",
            ShiftSeverity::None => "No significant vegetation stress",
        }
    }
}

const SHIFT_SEVERITY_TABLE: [Breakpoint<ShiftSeverity>; 3] = [
    Breakpoint::above(0.05, ShiftSeverity::High),
    Breakpoint::above(0.02, ShiftSeverity::Medium),
    Breakpoint::above(0.01, ShiftSeverity::Low),
];

pub fn classify_shift(vegetation_degradation: f64) -> ShiftSeverity {
    classify(&SHIFT_SEVERITY_TABLE, vegetation_degradation, ShiftSeverity::None)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralShift {
    pub mean_change: f64,
    pub max_abs_change: f64,
    pub std_change: f64,
    pub anomaly_threshold: f64,
    pub anomalous_periods: usize,
    /// Early minimum NDVI minus recent minimum NDVI.
    pub vegetation_degradation: f64,
    pub severity: ShiftSeverity,
    pub description: String,
    pub confidence: f64,
}

/// Detect vegetation stress in an NDVI series before excavation shows up.
pub fn detect_spectral_shift(ndvi: &[f64]) -> StageOutcome<SpectralShift> {
    if let Some(short) = StageOutcome::require(MIN_SPECTRAL_POINTS, ndvi.len()) {
        return short;
    }
    StageOutcome::from_result(compute_shift(ndvi))
}

fn compute_shift(ndvi: &[f64]) -> Result<SpectralShift, CoreError> {
    let diffs: Vec<f64> = ndvi.windows(2).map(|w| w[1] - w[0]).collect();
    let mean_change = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let std_change = std_dev(&diffs);
    let max_abs_change = diffs.iter().map(|d| d.abs()).fold(0.0, f64::max);

    let anomaly_threshold = ensure_finite(mean_change - ANOMALY_SIGMA * std_change, "anomaly threshold")?;
    let anomalous_periods = diffs.iter().filter(|d| **d < anomaly_threshold).count();

    let window = DEGRADATION_WINDOW.min(ndvi.len());
    let early_min = ndvi[..window].iter().copied().fold(f64::INFINITY, f64::min);
    let recent_min = ndvi[ndvi.len() - window..]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let vegetation_degradation = ensure_finite(early_min - recent_min, "vegetation degradation")?;

    let severity = classify_shift(vegetation_degradation);
    Ok(SpectralShift {
        mean_change,
        max_abs_change,
        std_change,
        anomaly_threshold,
        anomalous_periods,
        vegetation_degradation,
        severity,
        description: severity.description().to_string(),
        confidence: ensure_finite(1.0 - std_change / (max_abs_change + 0.001), "shift confidence")?,
    })
}

// ---------------------------------------------------------------------------
// Composite risk
// ---------------------------------------------------------------------------

pub const BOUNDARY_WEIGHT: f64 = 0.35;
pub const SPECTRAL_WEIGHT: f64 = 0.25;
pub const RATE_WEIGHT: f64 = 0.25;
pub const TREND_WEIGHT: f64 = 0.15;

const RATE_RISK_TABLE: [Breakpoint<f64>; 3] = [
    Breakpoint::above(0.2, 35.0),
    Breakpoint::above(0.1, 20.0),
    Breakpoint::above(0.01, 10.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn action_required(self) -> &'static str {
        match self {
            RiskLevel::Critical => "Immediate intervention needed",
            RiskLevel::High => "Urgent monitoring and intervention",
            RiskLevel::Medium => "Enhanced monitoring recommended",
            RiskLevel::Low => "Standard monitoring",
        }
    }

    /// Base 14-day violation probability for this level.
    pub fn base_violation_probability(self) -> f64 {
        match self {
            RiskLevel::Critical => 0.85,
            RiskLevel::High => 0.60,
            RiskLevel::Medium => 0.30,
            RiskLevel::Low => 0.10,
        }
    }
}

const RISK_LEVEL_TABLE: [Breakpoint<RiskLevel>; 3] = [
    Breakpoint::at_least(75.0, RiskLevel::Critical),
    Breakpoint::at_least(50.0, RiskLevel::High),
    Breakpoint::at_least(25.0, RiskLevel::Medium),
];

pub fn classify_risk(total_score: f64) -> RiskLevel {
    classify(&RISK_LEVEL_TABLE, total_score, RiskLevel::Low)
}

pub fn spectral_risk(severity: ShiftSeverity) -> f64 {
    match severity {
        ShiftSeverity::High => 40.0,
        ShiftSeverity::Medium => 25.0,
        ShiftSeverity::Low => 10.0,
        ShiftSeverity::None => 0.0,
    }
}

pub fn rate_risk(rate_ha_per_day: f64) -> f64 {
    classify(&RATE_RISK_TABLE, rate_ha_per_day, 0.0)
}

pub fn trend_risk(trend: ExcavationTrend) -> f64 {
    match trend {
        ExcavationTrend::Increasing => 25.0,
        ExcavationTrend::Stable => 0.0,
        ExcavationTrend::Decreasing => -10.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentScores {
    pub boundary_proximity: f64,
    pub spectral_shift: f64,
    pub excavation_rate: f64,
    pub trend: f64,
}

impl ComponentScores {
    /// Score each factor. Stages that did not complete score as neutral:
    /// no spectral shift, zero rate and a stable trend.
    pub fn from_stages(
        proximity: &ProximityEstimate,
        spectral: &StageOutcome<SpectralShift>,
        rate: &StageOutcome<RateStats>,
        trend: &StageOutcome<TrendStats>,
    ) -> Self {
        Self {
            boundary_proximity: proximity.encroachment_risk_score,
            spectral_shift: spectral_risk(
                spectral.complete().map_or(ShiftSeverity::None, |s| s.severity),
            ),
            excavation_rate: rate_risk(rate.complete().map_or(0.0, |r| r.rate_ha_per_day)),
            trend: trend_risk(trend_label(trend)),
        }
    }

    /// Weighted total clamped to `[0, 100]`.
    pub fn total(&self) -> f64 {
        let raw = self.boundary_proximity * BOUNDARY_WEIGHT
            + self.spectral_shift * SPECTRAL_WEIGHT
            + self.excavation_rate * RATE_WEIGHT
            + self.trend * TREND_WEIGHT;
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, 100.0)
    }
}

fn trend_label(trend: &StageOutcome<TrendStats>) -> ExcavationTrend {
    trend.complete().map_or(ExcavationTrend::Stable, |t| t.trend)
}

// ---------------------------------------------------------------------------
// Predictive alert
// ---------------------------------------------------------------------------

/// Probability above which a predictive alert fires.
pub const ALERT_PROBABILITY: f64 = 0.3;
/// Projected excavation (ha) that raises the probability.
pub const LARGE_PROJECTION_HA: f64 = 5.0;
/// Projected excavation (ha) below which the probability is lowered.
pub const NEGLIGIBLE_PROJECTION_HA: f64 = 0.1;
pub const LARGE_PROJECTION_BONUS: f64 = 0.25;
pub const NEGLIGIBLE_PROJECTION_PENALTY: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictiveAlertKind {
    PredictiveViolationWarning,
    PredictiveAlert,
    NoSignificantAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn recommendation(self) -> &'static str {
        match self {
            AlertSeverity::Critical => {
                "IMMEDIATE ACTION: High probability of no-go boundary violation within 14 days"
            }
            AlertSeverity::High | AlertSeverity::Medium => {
                "PREPARE: Possible boundary violation within 2 weeks, increase monitoring"
            }
            AlertSeverity::Low => {
                "MONITOR: Low probability of violation, maintain standard surveillance"
            }
        }
    }
}

const ALERT_SEVERITY_TABLE: [Breakpoint<AlertSeverity>; 3] = [
    Breakpoint::above(0.7, AlertSeverity::Critical),
    Breakpoint::above(0.5, AlertSeverity::High),
    Breakpoint::above(ALERT_PROBABILITY, AlertSeverity::Medium),
];

const ALERT_KIND_TABLE: [Breakpoint<PredictiveAlertKind>; 2] = [
    Breakpoint::above(0.7, PredictiveAlertKind::PredictiveViolationWarning),
    Breakpoint::above(ALERT_PROBABILITY, PredictiveAlertKind::PredictiveAlert),
];

/// Multiplier applied to the current rate for the projection.
pub fn acceleration_factor(trend: ExcavationTrend) -> f64 {
    match trend {
        ExcavationTrend::Increasing => 1.1,
        ExcavationTrend::Decreasing => 0.9,
        ExcavationTrend::Stable => 1.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictiveAlert {
    pub projection_days: u32,
    pub acceleration_factor: f64,
    pub projected_rate_ha_day: f64,
    pub projected_excavation_ha: f64,
    /// In `[0, 1]`.
    pub violation_probability: f64,
    pub triggered: bool,
    pub kind: PredictiveAlertKind,
    pub severity: AlertSeverity,
    pub recommendation: String,
    pub days_to_predicted_violation: Option<i64>,
}

/// Project the current rate forward and estimate the violation probability.
pub fn predict_violation(
    current_rate_ha_day: f64,
    trend: ExcavationTrend,
    level: RiskLevel,
    config: &EarlyWarningConfig,
) -> PredictiveAlert {
    let factor = acceleration_factor(trend);
    let projected_rate = current_rate_ha_day * factor;
    let projected_excavation = projected_rate * config.projection_days as f64;

    let mut probability = level.base_violation_probability();
    if projected_excavation > LARGE_PROJECTION_HA {
        probability += LARGE_PROJECTION_BONUS;
    } else if projected_excavation < NEGLIGIBLE_PROJECTION_HA {
        probability -= NEGLIGIBLE_PROJECTION_PENALTY;
    }
    let probability = probability.clamp(0.0, 1.0);

    let triggered = probability > ALERT_PROBABILITY;
    let severity = classify(&ALERT_SEVERITY_TABLE, probability, AlertSeverity::Low);
    let days_to_predicted_violation =
        triggered.then(|| (config.projection_days as f64 * (1.0 - probability)).floor() as i64);

    PredictiveAlert {
        projection_days: config.projection_days,
        acceleration_factor: factor,
        projected_rate_ha_day: projected_rate,
        projected_excavation_ha: projected_excavation,
        violation_probability: probability,
        triggered,
        kind: classify(&ALERT_KIND_TABLE, probability, PredictiveAlertKind::NoSignificantAlert),
        severity,
        recommendation: severity.recommendation().to_string(),
        days_to_predicted_violation,
    }
}

// ---------------------------------------------------------------------------
// RiskAssessment
// ---------------------------------------------------------------------------

/// Composite risk for one AOI. Derived on every request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub components: ComponentScores,
    /// In `[0, 100]`.
    pub total_score: f64,
    pub level: RiskLevel,
    pub action_required: String,
    pub predictive_alert: PredictiveAlert,
}

/// Combine all early-warning stages into a risk assessment.
pub fn assess_risk(
    proximity: &ProximityEstimate,
    spectral: &StageOutcome<SpectralShift>,
    rate: &StageOutcome<RateStats>,
    trend: &StageOutcome<TrendStats>,
    config: &EarlyWarningConfig,
) -> RiskAssessment {
    let components = ComponentScores::from_stages(proximity, spectral, rate, trend);
    let total_score = components.total();
    let level = classify_risk(total_score);
    let current_rate = rate.complete().map_or(0.0, |r| r.rate_ha_per_day);

    RiskAssessment {
        components,
        total_score,
        level,
        action_required: level.action_required().to_string(),
        predictive_alert: predict_violation(current_rate, trend_label(trend), level, config),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(value: f64) -> StageOutcome<RateStats> {
        StageOutcome::Complete(RateStats {
            rate_ha_per_day: value,
            min_rate: value,
            max_rate: value,
            std_rate: 0.0,
            trend: crate::temporal::classify_rate_trend(value),
            trend_confidence: 1.0,
            num_measurements: 5,
            time_period_days: 56,
        })
    }

    fn trend(label: ExcavationTrend) -> StageOutcome<TrendStats> {
        StageOutcome::Complete(TrendStats {
            trend: label,
            slope: 0.0,
            intercept: 0.5,
            r_squared: 0.9,
            description: String::new(),
            acceleration: crate::temporal::Acceleration::Stable,
            mean_second_difference: 0.0,
        })
    }

    // -- proximity --------------------------------------------------------------

    #[test]
    fn proximity_caps_buffer_ratio() {
        let p = estimate_boundary_proximity(&[1.0, 2.0, 3.0, 10.0], 2, &EarlyWarningConfig::default());
        assert_eq!(p.excavation_trend_ha, 7.0);
        assert_eq!(p.pixels_in_buffer, 60);
        assert_eq!(p.pixels_in_critical_zone, 18);
        assert!((p.encroachment_risk_score - 15.0).abs() < 1e-9);
        assert_eq!(p.status, ProximityStatus::MediumRisk);
        assert_eq!(p.nogo_zones_identified, 2);
        assert!((p.critical_zone_risk_percent - 30.0).abs() < 1e-9);
    }

    #[test]
    fn shrinking_area_has_no_encroachment() {
        let p = estimate_boundary_proximity(&[5.0, 4.0], 1, &EarlyWarningConfig::default());
        assert_eq!(p.excavation_trend_ha, 0.0);
        assert_eq!(p.pixels_in_buffer, 0);
        assert_eq!(p.critical_zone_risk_percent, 0.0);
        assert_eq!(p.status, ProximityStatus::LowRisk);
    }

    #[test]
    fn proximity_pixels_truncate() {
        // 3 samples * 100 * 0.05 = 15 buffer pixels, 4.5 -> 4 critical.
        let p = estimate_boundary_proximity(&[1.0, 1.0, 1.5], 1, &EarlyWarningConfig::default());
        assert_eq!(p.pixels_in_buffer, 15);
        assert_eq!(p.pixels_in_critical_zone, 4);
    }

    #[test]
    fn empty_history_is_low_risk() {
        let p = estimate_boundary_proximity(&[], 0, &EarlyWarningConfig::default());
        assert_eq!(p.encroachment_risk_score, 0.0);
        assert_eq!(p.status, ProximityStatus::LowRisk);
    }

    // -- spectral shift -----------------------------------------------------------

    #[test]
    fn spectral_shift_needs_three_points() {
        assert_eq!(
            detect_spectral_shift(&[0.5, 0.4]),
            StageOutcome::InsufficientData { required: 3, found: 2 }
        );
    }

    #[test]
    fn shift_severity_breakpoints() {
        assert_eq!(classify_shift(0.051), ShiftSeverity::High);
        assert_eq!(classify_shift(0.05), ShiftSeverity::Medium);
        assert_eq!(classify_shift(0.02), ShiftSeverity::Low);
        assert_eq!(classify_shift(0.01), ShiftSeverity::None);
        assert_eq!(classify_shift(-0.2), ShiftSeverity::None);
    }

    #[test]
    fn declining_ndvi_shows_high_stress() {
        let shift = detect_spectral_shift(&[0.80, 0.78, 0.79, 0.70, 0.62, 0.60])
            .complete()
            .cloned()
            .unwrap();
        assert!((shift.vegetation_degradation - 0.18).abs() < 1e-9);
        assert_eq!(shift.severity, ShiftSeverity::High);
        assert!((shift.max_abs_change - 0.09).abs() < 1e-9);
        assert!(shift.mean_change < 0.0);
    }

    #[test]
    fn steady_ndvi_has_no_anomalous_periods() {
        let shift = detect_spectral_shift(&[0.6; 5]).complete().cloned().unwrap();
        assert_eq!(shift.anomalous_periods, 0);
        assert_eq!(shift.severity, ShiftSeverity::None);
        assert_eq!(shift.confidence, 1.0);
    }

    // -- composite risk -------------------------------------------------------------

    #[test]
    fn risk_levels_exact_at_boundaries() {
        assert_eq!(classify_risk(75.0), RiskLevel::Critical);
        assert_eq!(classify_risk(74.999), RiskLevel::High);
        assert_eq!(classify_risk(50.0), RiskLevel::High);
        assert_eq!(classify_risk(49.999), RiskLevel::Medium);
        assert_eq!(classify_risk(25.0), RiskLevel::Medium);
        assert_eq!(classify_risk(24.999), RiskLevel::Low);
        assert_eq!(classify_risk(0.0), RiskLevel::Low);
    }

    #[test]
    fn rate_risk_breakpoints() {
        assert_eq!(rate_risk(0.21), 35.0);
        assert_eq!(rate_risk(0.2), 20.0);
        assert_eq!(rate_risk(0.1), 10.0);
        assert_eq!(rate_risk(0.01), 0.0);
        assert_eq!(rate_risk(-1.0), 0.0);
    }

    #[test]
    fn total_is_clamped() {
        let low = ComponentScores {
            boundary_proximity: 0.0,
            spectral_shift: 0.0,
            excavation_rate: 0.0,
            trend: -10.0,
        };
        assert_eq!(low.total(), 0.0);

        let high = ComponentScores {
            boundary_proximity: 1000.0,
            spectral_shift: 40.0,
            excavation_rate: 35.0,
            trend: 25.0,
        };
        assert_eq!(high.total(), 100.0);
    }

    #[test]
    fn weighted_sum() {
        let scores = ComponentScores {
            boundary_proximity: 15.0,
            spectral_shift: 40.0,
            excavation_rate: 35.0,
            trend: 25.0,
        };
        let expected = 15.0 * 0.35 + 40.0 * 0.25 + 35.0 * 0.25 + 25.0 * 0.15;
        assert!((scores.total() - expected).abs() < 1e-9);
    }

    #[test]
    fn incomplete_stages_score_neutral() {
        let proximity = estimate_boundary_proximity(&[1.0], 0, &EarlyWarningConfig::default());
        let scores = ComponentScores::from_stages(
            &proximity,
            &StageOutcome::InsufficientData { required: 3, found: 1 },
            &StageOutcome::Error { message: "x".into() },
            &StageOutcome::InsufficientData { required: 3, found: 1 },
        );
        assert_eq!(scores.spectral_shift, 0.0);
        assert_eq!(scores.excavation_rate, 0.0);
        assert_eq!(scores.trend, 0.0);
    }

    // -- predictive alert -------------------------------------------------------------

    #[test]
    fn probability_stays_in_unit_range() {
        let cfg = EarlyWarningConfig::default();
        let p = predict_violation(10.0, ExcavationTrend::Increasing, RiskLevel::Critical, &cfg);
        assert_eq!(p.violation_probability, 1.0);
        let p = predict_violation(0.0, ExcavationTrend::Decreasing, RiskLevel::Low, &cfg);
        assert_eq!(p.violation_probability, 0.0);
        assert!(!p.triggered);
    }

    #[test]
    fn medium_base_does_not_trigger() {
        // 0.3 base, projection between 0.1 and 5 ha: no adjustment.
        let p = predict_violation(0.1, ExcavationTrend::Stable, RiskLevel::Medium, &EarlyWarningConfig::default());
        assert!((p.projected_excavation_ha - 1.4).abs() < 1e-9);
        assert_eq!(p.violation_probability, 0.3);
        assert!(!p.triggered);
        assert_eq!(p.kind, PredictiveAlertKind::NoSignificantAlert);
        assert_eq!(p.severity, AlertSeverity::Low);
        assert_eq!(p.days_to_predicted_violation, None);
    }

    #[test]
    fn critical_projection_raises_warning() {
        let p = predict_violation(0.4, ExcavationTrend::Increasing, RiskLevel::High, &EarlyWarningConfig::default());
        assert!((p.acceleration_factor - 1.1).abs() < 1e-12);
        assert!(p.projected_excavation_ha > 5.0);
        assert!((p.violation_probability - 0.85).abs() < 1e-9);
        assert!(p.triggered);
        assert_eq!(p.kind, PredictiveAlertKind::PredictiveViolationWarning);
        assert_eq!(p.severity, AlertSeverity::Critical);
        assert_eq!(p.days_to_predicted_violation, Some(2));
    }

    #[test]
    fn high_base_with_small_projection() {
        let p = predict_violation(0.001, ExcavationTrend::Stable, RiskLevel::High, &EarlyWarningConfig::default());
        assert!((p.violation_probability - 0.45).abs() < 1e-9);
        assert!(p.triggered);
        assert_eq!(p.kind, PredictiveAlertKind::PredictiveAlert);
        assert_eq!(p.severity, AlertSeverity::Medium);
    }

    #[test]
    fn assessment_combines_stages() {
        let cfg = EarlyWarningConfig::default();
        let proximity = estimate_boundary_proximity(&[1.0, 2.0, 3.0, 10.0], 1, &cfg);
        let spectral = detect_spectral_shift(&[0.80, 0.78, 0.79, 0.70, 0.62, 0.60]);
        let assessment = assess_risk(
            &proximity,
            &spectral,
            &rate(0.3),
            &trend(ExcavationTrend::Increasing),
            &cfg,
        );
        // 15*0.35 + 40*0.25 + 35*0.25 + 25*0.15 = 27.75
        assert!((assessment.total_score - 27.75).abs() < 1e-9);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert_eq!(assessment.action_required, "Enhanced monitoring recommended");
        // 0.3 * 1.1 * 14 = 4.62 ha: no adjustment, 0.30 does not trigger.
        assert!(!assessment.predictive_alert.triggered);
    }
}
