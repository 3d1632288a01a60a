//! No-go zone violation evaluation and deduplication.
//!
//! Pure logic: [`evaluate_violation`] decides whether a detection warrants a
//! violation and at which severity; [`decide`] adds the dedup rule (at most
//! one unresolved event per AOI and violation type). The caller must hold a
//! per-AOI lock between the open-event lookup and persisting the result.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::analysis_config::AnalysisConfig;
use crate::breakpoints::{classify, Breakpoint};
use crate::detection::DetectionResult;
use crate::spectral::DataQuality;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Violation type raised for excavation inside a no-go zone.
pub const VIOLATION_EXCAVATION_IN_NOGO_ZONE: &str = "EXCAVATION_IN_NOGO_ZONE";

/// Lifecycle markers stored alongside each event.
pub const LIFECYCLE_VIOLATION_START: &str = "VIOLATION_START";
pub const LIFECYCLE_ESCALATION: &str = "ESCALATION";
pub const LIFECYCLE_VIOLATION_RESOLVED: &str = "VIOLATION_RESOLVED";

/// No-go area (hectares) above which a violation is `High`.
pub const HIGH_SEVERITY_AREA_HA: f64 = 5.0;

/// Multiple of the configured threshold checked by the relative rule.
pub const RELATIVE_SEVERITY_MULTIPLE: f64 = 5.0;

/// Confidence below which a violation is flagged for manual review.
pub const MANUAL_REVIEW_CONFIDENCE: f64 = 0.65;

/// Value of `event_metadata.source` for pipeline-created events.
pub const EVENT_SOURCE_PIPELINE: &str = "ai_pipeline";
/// Value of `event_metadata.algorithm` for pipeline-created events.
pub const EVENT_ALGORITHM: &str = "satellite_imagery_analysis";

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a no-go zone violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationSeverity {
    Medium,
    High,
}

impl ViolationSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationSeverity::Medium => "MEDIUM",
            ViolationSeverity::High => "HIGH",
        }
    }

    /// Parse the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MEDIUM" => Some(ViolationSeverity::Medium),
            "HIGH" => Some(ViolationSeverity::High),
            _ => None,
        }
    }
}

/// Which severity rule fired.
///
/// `RelativeMultiple` and `ExceedsThreshold` both map to `Medium`; they are
/// kept apart so the outcome can be re-tiered without changing callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityRule {
    /// No-go area above [`HIGH_SEVERITY_AREA_HA`].
    AbsoluteHigh,
    /// No-go area above `threshold * 5`.
    RelativeMultiple,
    /// No-go area above the threshold only.
    ExceedsThreshold,
}

impl SeverityRule {
    pub fn severity(self) -> ViolationSeverity {
        match self {
            SeverityRule::AbsoluteHigh => ViolationSeverity::High,
            SeverityRule::RelativeMultiple | SeverityRule::ExceedsThreshold => {
                ViolationSeverity::Medium
            }
        }
    }
}

/// Classify a triggering no-go area. Assumes `nogo_area_ha > threshold_ha`.
pub fn classify_severity(nogo_area_ha: f64, threshold_ha: f64) -> SeverityRule {
    let table = [
        Breakpoint::above(HIGH_SEVERITY_AREA_HA, SeverityRule::AbsoluteHigh),
        Breakpoint::above(
            threshold_ha * RELATIVE_SEVERITY_MULTIPLE,
            SeverityRule::RelativeMultiple,
        ),
    ];
    classify(&table, nogo_area_ha, SeverityRule::ExceedsThreshold)
}

fn severity_reason(rule: SeverityRule, nogo_area_ha: f64, threshold_ha: f64) -> String {
    match rule {
        SeverityRule::AbsoluteHigh => format!(
            "Area {nogo_area_ha:.2} ha exceeds high threshold {HIGH_SEVERITY_AREA_HA} ha"
        ),
        SeverityRule::RelativeMultiple => {
            format!("Area {nogo_area_ha:.2} ha is 5x+ the threshold")
        }
        SeverityRule::ExceedsThreshold => format!(
            "Area {nogo_area_ha:.2} ha exceeds threshold by {:.2} ha",
            nogo_area_ha - threshold_ha
        ),
    }
}

// ---------------------------------------------------------------------------
// ViolationDraft
// ---------------------------------------------------------------------------

/// Cross-validation evidence carried with a violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub cross_validated: bool,
    pub consensus_pixels: usize,
    pub methods_used: usize,
    pub data_quality: DataQuality,
    pub cloud_cover_percent: f64,
    pub requires_manual_review: bool,
}

/// A violation ready to be persisted as a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationDraft {
    pub aoi_id: DbId,
    pub violation_type: String,
    pub detected_at: Timestamp,
    pub area_ha: f64,
    pub threshold_ha: f64,
    pub exceeds_threshold_ha: f64,
    pub severity: ViolationSeverity,
    pub severity_rule: SeverityRule,
    pub severity_reason: String,
    pub confidence: f64,
    pub verification: VerificationStatus,
}

impl ViolationDraft {
    pub fn requires_manual_review(&self) -> bool {
        self.verification.requires_manual_review
    }

    /// Human-readable description stored with the event.
    pub fn description(&self) -> String {
        format!("Automated detection: {}", self.violation_type)
    }

    /// JSON metadata stored with the event.
    pub fn event_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "source": EVENT_SOURCE_PIPELINE,
            "algorithm": EVENT_ALGORITHM,
            "confidence": self.confidence,
            "severity_rule": self.severity_rule,
            "severity_reason": self.severity_reason,
            "exceeds_threshold_ha": self.exceeds_threshold_ha,
            "verification": self.verification,
        })
    }
}

/// Decide whether a detection triggers a no-go zone violation.
///
/// Triggers iff `nogo_area_ha > config.min_violation_area_ha`. Low confidence
/// only sets `requires_manual_review`; it never suppresses the violation.
pub fn evaluate_violation(
    aoi_id: DbId,
    detection: &DetectionResult,
    config: &AnalysisConfig,
    detected_at: Timestamp,
) -> Option<ViolationDraft> {
    let nogo = detection.nogo_area_ha;
    let threshold = config.min_violation_area_ha;
    if nogo <= threshold || nogo.is_nan() {
        return None;
    }

    let rule = classify_severity(nogo, threshold);
    let v = &detection.verification;

    Some(ViolationDraft {
        aoi_id,
        violation_type: VIOLATION_EXCAVATION_IN_NOGO_ZONE.to_string(),
        detected_at,
        area_ha: nogo,
        threshold_ha: threshold,
        exceeds_threshold_ha: nogo - threshold,
        severity: rule.severity(),
        severity_rule: rule,
        severity_reason: severity_reason(rule, nogo, threshold),
        confidence: detection.confidence,
        verification: VerificationStatus {
            cross_validated: detection.consensus_pixels > 0,
            consensus_pixels: detection.consensus_pixels,
            methods_used: v.algorithms_used.len(),
            data_quality: v.data_quality,
            cloud_cover_percent: v.cloud_cover_percent,
            requires_manual_review: detection.confidence < MANUAL_REVIEW_CONFIDENCE,
        },
    })
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Lookup of unresolved events keyed by (AOI, violation type).
pub trait OpenViolationLookup {
    fn has_open(&self, aoi_id: DbId, violation_type: &str) -> bool;
}

/// In-memory (AOI, violation type) -> open-event presence index.
#[derive(Debug, Default, Clone)]
pub struct OpenViolationIndex {
    open: HashSet<(DbId, String)>,
}

impl OpenViolationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unresolved event. Returns `false` if one was already open.
    pub fn mark_open(&mut self, aoi_id: DbId, violation_type: &str) -> bool {
        self.open.insert((aoi_id, violation_type.to_string()))
    }

    /// Clear the open marker after resolution. Returns `false` if none was open.
    pub fn mark_resolved(&mut self, aoi_id: DbId, violation_type: &str) -> bool {
        self.open.remove(&(aoi_id, violation_type.to_string()))
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

impl OpenViolationLookup for OpenViolationIndex {
    fn has_open(&self, aoi_id: DbId, violation_type: &str) -> bool {
        self.open.contains(&(aoi_id, violation_type.to_string()))
    }
}

/// Outcome of evaluating one detection against the dedup state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ViolationDecision {
    /// No-go area did not exceed the configured threshold.
    BelowThreshold { nogo_area_ha: f64, threshold_ha: f64 },
    /// An unresolved event of the same type already exists; not escalated.
    Suppressed { violation_type: String },
    /// A new event should be created.
    Create { draft: ViolationDraft },
}

impl ViolationDecision {
    pub fn draft(&self) -> Option<&ViolationDraft> {
        match self {
            ViolationDecision::Create { draft } => Some(draft),
            _ => None,
        }
    }
}

/// Evaluate a detection and apply the at-most-one-open-event rule.
pub fn decide<L: OpenViolationLookup + ?Sized>(
    aoi_id: DbId,
    detection: &DetectionResult,
    config: &AnalysisConfig,
    open: &L,
    detected_at: Timestamp,
) -> ViolationDecision {
    match evaluate_violation(aoi_id, detection, config, detected_at) {
        None => ViolationDecision::BelowThreshold {
            nogo_area_ha: detection.nogo_area_ha,
            threshold_ha: config.min_violation_area_ha,
        },
        Some(draft) if open.has_open(aoi_id, &draft.violation_type) => {
            ViolationDecision::Suppressed {
                violation_type: draft.violation_type,
            }
        }
        Some(draft) => ViolationDecision::Create { draft },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
