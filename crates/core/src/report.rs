//! Temporal and early-warning reports over an AOI's stored history.
//!
//! Reports never fail as a whole. Each stage carries its own
//! [`StageOutcome`], and [`ReportStatus::Partial`] names the stages that
//! did not complete.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::breakpoints::{classify, Breakpoint};
use crate::early_warning::{
    assess_risk, detect_spectral_shift, estimate_boundary_proximity, EarlyWarningConfig,
    ProximityEstimate, RiskAssessment, RiskLevel, ShiftSeverity, SpectralShift,
};
use crate::history::TimeSeriesPoint;
use crate::stage::StageOutcome;
use crate::temporal::{
    analyze_trend, excavation_rate, smooth_series, ExcavationTrend, RateStats, SmoothingResult,
    SmoothingStatus, TrendStats,
};
use crate::types::{DbId, Timestamp};

/// Fewest AOI-level samples a report accepts.
pub const MIN_REPORT_POINTS: usize = 2;

/// Raw/smoothed samples echoed in a report.
pub const SMOOTHING_PREVIEW_LEN: usize = 5;

/// Area derived from NDVI when a sample has no stored area.
pub const NDVI_AREA_SCALE: f64 = 10.0;

// ---------------------------------------------------------------------------
// AOI-level history
// ---------------------------------------------------------------------------

/// One AOI-level sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: Timestamp,
    pub area_ha: Option<f64>,
    pub ndvi_mean: f64,
}

impl HistoryPoint {
    /// Stored area, or the NDVI proxy when none was recorded.
    pub fn excavation_area(&self) -> f64 {
        self.area_ha.unwrap_or(self.ndvi_mean * NDVI_AREA_SCALE)
    }
}

/// Collapse per-boundary points into one sample per timestamp.
///
/// Area is the sum over boundaries; NDVI is the mean of the recorded values,
/// falling back to `area / 10` when no boundary recorded one.
pub fn aggregate_by_timestamp(points: &[TimeSeriesPoint]) -> Vec<HistoryPoint> {
    #[derive(Default)]
    struct Acc {
        area: f64,
        ndvi_sum: f64,
        ndvi_count: usize,
    }

    let mut groups: BTreeMap<Timestamp, Acc> = BTreeMap::new();
    for p in points {
        let acc = groups.entry(p.timestamp).or_default();
        acc.area += p.raw_area_ha;
        if let Some(ndvi) = p.ndvi_mean {
            acc.ndvi_sum += ndvi;
            acc.ndvi_count += 1;
        }
    }

    groups
        .into_iter()
        .map(|(timestamp, acc)| HistoryPoint {
            timestamp,
            area_ha: Some(acc.area),
            ndvi_mean: if acc.ndvi_count > 0 {
                acc.ndvi_sum / acc.ndvi_count as f64
            } else {
                acc.area / NDVI_AREA_SCALE
            },
        })
        .collect()
}

struct Series {
    timestamps: Vec<Timestamp>,
    areas: Vec<f64>,
    ndvi: Vec<f64>,
}

impl Series {
    fn from_history(history: &[HistoryPoint]) -> Self {
        Self {
            timestamps: history.iter().map(|h| h.timestamp).collect(),
            areas: history.iter().map(HistoryPoint::excavation_area).collect(),
            ndvi: history.iter().map(|h| h.ndvi_mean).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    Partial { failed_stages: Vec<String> },
    InsufficientData { required: usize, found: usize, message: String },
}

impl ReportStatus {
    fn insufficient(found: usize) -> Self {
        ReportStatus::InsufficientData {
            required: MIN_REPORT_POINTS,
            found,
            message: format!(
                "Need at least {MIN_REPORT_POINTS} historical data points, found {found}"
            ),
        }
    }

    fn from_failures(failed_stages: Vec<String>) -> Self {
        if failed_stages.is_empty() {
            ReportStatus::Complete
        } else {
            ReportStatus::Partial { failed_stages }
        }
    }
}

fn note_failure<T>(failed: &mut Vec<String>, stage: &str, outcome: &StageOutcome<T>) {
    if !outcome.is_complete() {
        failed.push(stage.to_string());
    }
}

// ---------------------------------------------------------------------------
// Temporal report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothingSummary {
    pub raw_ndvi: Vec<f64>,
    pub smoothed_ndvi: Vec<f64>,
    pub method: String,
    pub smoothing: SmoothingStatus,
    pub noise_reduction_percent: f64,
}

impl From<&SmoothingResult> for SmoothingSummary {
    fn from(result: &SmoothingResult) -> Self {
        Self {
            raw_ndvi: result.raw.iter().take(SMOOTHING_PREVIEW_LEN).copied().collect(),
            smoothed_ndvi: result.smoothed.iter().take(SMOOTHING_PREVIEW_LEN).copied().collect(),
            method: result.method(),
            smoothing: result.status.clone(),
            noise_reduction_percent: result.noise_reduction_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MiningIntensity {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendStrength {
    Weak,
    Moderate,
    Strong,
}

const INTENSITY_TABLE: [Breakpoint<MiningIntensity>; 2] = [
    Breakpoint::above(0.1, MiningIntensity::High),
    Breakpoint::above(0.01, MiningIntensity::Moderate),
];

const STRENGTH_TABLE: [Breakpoint<TrendStrength>; 2] = [
    Breakpoint::above(0.8, TrendStrength::Strong),
    Breakpoint::above(0.5, TrendStrength::Moderate),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalInsights {
    pub mining_intensity: MiningIntensity,
    pub trend_strength: TrendStrength,
    pub recommendation: String,
}

impl TemporalInsights {
    fn derive(rate: &StageOutcome<RateStats>, trend: &StageOutcome<TrendStats>) -> Self {
        let rate_value = rate.complete().map_or(0.0, |r| r.rate_ha_per_day);
        let r_squared = trend.complete().map_or(0.0, |t| t.r_squared);
        let label = trend.complete().map_or(ExcavationTrend::Stable, |t| t.trend);
        let recommendation = match label {
            ExcavationTrend::Increasing => "Urgent action required",
            ExcavationTrend::Stable => "Monitor",
            ExcavationTrend::Decreasing => "Recovery in progress",
        };
        Self {
            mining_intensity: classify(&INTENSITY_TABLE, rate_value, MiningIntensity::Low),
            trend_strength: classify(&STRENGTH_TABLE, r_squared, TrendStrength::Weak),
            recommendation: recommendation.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalAnalysis {
    pub temporal_smoothing: SmoothingSummary,
    pub excavation_rate: StageOutcome<RateStats>,
    pub trend_analysis: StageOutcome<TrendStats>,
    pub insights: TemporalInsights,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalReport {
    pub aoi_id: DbId,
    pub report_period_days: u32,
    pub data_points: usize,
    #[serde(flatten)]
    pub status: ReportStatus,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<TemporalAnalysis>,
}

/// Smoothing, rate and trend over an AOI-level history.
pub fn temporal_report(aoi_id: DbId, history: &[HistoryPoint], report_period_days: u32) -> TemporalReport {
    if history.len() < MIN_REPORT_POINTS {
        return TemporalReport {
            aoi_id,
            report_period_days,
            data_points: history.len(),
            status: ReportStatus::insufficient(history.len()),
            analysis: None,
        };
    }

    let series = Series::from_history(history);
    let smoothing = smooth_series(&series.ndvi);
    let rate = excavation_rate(&series.timestamps, &series.areas);
    let trend = analyze_trend(&smoothing.smoothed);

    let mut failed = Vec::new();
    if matches!(smoothing.status, SmoothingStatus::Fallback { .. }) {
        failed.push("temporal_smoothing".to_string());
    }
    note_failure(&mut failed, "excavation_rate", &rate);
    note_failure(&mut failed, "trend_analysis", &trend);

    TemporalReport {
        aoi_id,
        report_period_days,
        data_points: history.len(),
        status: ReportStatus::from_failures(failed),
        analysis: Some(TemporalAnalysis {
            temporal_smoothing: SmoothingSummary::from(&smoothing),
            insights: TemporalInsights::derive(&rate, &trend),
            excavation_rate: rate,
            trend_analysis: trend,
        }),
    }
}

// ---------------------------------------------------------------------------
// Early-warning report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub overall_risk_level: RiskLevel,
    pub boundary_encroachment_risk: f64,
    pub vegetation_stress_detected: bool,
    /// `None` when the rate could not be computed.
    pub mining_activity_level: Option<ExcavationTrend>,
    pub predicted_violation_14_days: bool,
    pub recommended_action: String,
    pub immediate_response_needed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarlyWarningAnalysis {
    pub boundary_proximity_analysis: ProximityEstimate,
    pub spectral_shift_detection: StageOutcome<SpectralShift>,
    pub excavation_rate_analysis: StageOutcome<RateStats>,
    pub temporal_trend_analysis: StageOutcome<TrendStats>,
    pub risk_assessment: RiskAssessment,
    pub executive_summary: ExecutiveSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarlyWarningReport {
    pub aoi_id: DbId,
    pub report_period_days: u32,
    pub data_points_analyzed: usize,
    #[serde(flatten)]
    pub status: ReportStatus,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<EarlyWarningAnalysis>,
}

impl EarlyWarningReport {
    pub fn risk_assessment(&self) -> Option<&RiskAssessment> {
        self.analysis.as_ref().map(|a| &a.risk_assessment)
    }
}

/// Proximity, spectral shift, rate, trend, composite risk and the 14-day
/// prediction over an AOI-level history.
pub fn early_warning_report(
    aoi_id: DbId,
    history: &[HistoryPoint],
    nogo_zones: usize,
    report_period_days: u32,
    config: &EarlyWarningConfig,
) -> EarlyWarningReport {
    if history.len() < MIN_REPORT_POINTS {
        return EarlyWarningReport {
            aoi_id,
            report_period_days,
            data_points_analyzed: history.len(),
            status: ReportStatus::insufficient(history.len()),
            analysis: None,
        };
    }

    let series = Series::from_history(history);
    let proximity = estimate_boundary_proximity(&series.areas, nogo_zones, config);
    let spectral = detect_spectral_shift(&series.ndvi);
    let rate = excavation_rate(&series.timestamps, &series.areas);
    let smoothing = smooth_series(&series.ndvi);
    let trend = analyze_trend(&smoothing.smoothed);
    let risk = assess_risk(&proximity, &spectral, &rate, &trend, config);

    let mut failed = Vec::new();
    note_failure(&mut failed, "spectral_shift_detection", &spectral);
    note_failure(&mut failed, "excavation_rate_analysis", &rate);
    note_failure(&mut failed, "temporal_trend_analysis", &trend);

    let summary = ExecutiveSummary {
        overall_risk_level: risk.level,
        boundary_encroachment_risk: proximity.encroachment_risk_score,
        vegetation_stress_detected: spectral
            .complete()
            .is_some_and(|s| s.severity != ShiftSeverity::None),
        mining_activity_level: rate.complete().map(|r| r.trend),
        predicted_violation_14_days: risk.predictive_alert.triggered,
        recommended_action: risk.predictive_alert.recommendation.clone(),
        immediate_response_needed: risk.level == RiskLevel::Critical,
    };

    EarlyWarningReport {
        aoi_id,
        report_period_days,
        data_points_analyzed: history.len(),
        status: ReportStatus::from_failures(failed),
        analysis: Some(EarlyWarningAnalysis {
            boundary_proximity_analysis: proximity,
            spectral_shift_detection: spectral,
            excavation_rate_analysis: rate,
            temporal_trend_analysis: trend,
            risk_assessment: risk,
            executive_summary: summary,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
