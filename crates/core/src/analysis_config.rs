//! Per-AOI analysis configuration: defaults and validation.
//!
//! Exactly one active configuration is consulted per analysis run. When an
//! AOI has none, the runner persists [`AnalysisConfig::default_for`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name given to configurations created on demand.
pub const DEFAULT_CONFIG_NAME: &str = "Auto-generated Analysis Config";

/// Minimum no-go excavation (hectares) that raises a violation.
pub const DEFAULT_MIN_VIOLATION_AREA_HA: f64 = 0.05;

/// Learned anomaly threshold carried for the anomaly stage.
pub const DEFAULT_ADAPTIVE_THRESHOLD: f64 = 0.25;

/// Smoothing kernel size in pixels.
pub const DEFAULT_SMOOTHING_WINDOW: i32 = 5;

/// Minimum confidence the anomaly stage reports against.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.85;

pub const THRESHOLD_METHOD_ISOLATION_FOREST: &str = "isolation_forest";
pub const THRESHOLD_METHOD_STATISTICAL: &str = "statistical";
pub const THRESHOLD_METHOD_HYBRID: &str = "hybrid";

/// All valid threshold method tags.
pub const VALID_THRESHOLD_METHODS: &[&str] = &[
    THRESHOLD_METHOD_ISOLATION_FOREST,
    THRESHOLD_METHOD_STATISTICAL,
    THRESHOLD_METHOD_HYBRID,
];

/// Sentinel-2 scene classification layer masking.
pub const CLOUD_MASK_SCL: &str = "scl";
/// Cloud-probability product masking.
pub const CLOUD_MASK_PROBABILITY: &str = "cloud_probability";

/// All valid cloud mask method tags.
pub const VALID_CLOUD_MASK_METHODS: &[&str] = &[CLOUD_MASK_SCL, CLOUD_MASK_PROBABILITY];

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Parameters for one AOI's analysis runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub aoi_id: DbId,
    pub name: String,
    pub adaptive_threshold: f64,
    pub threshold_method: String,
    pub cloud_mask_method: String,
    pub smoothing_window: i32,
    pub min_violation_area_ha: f64,
    pub min_confidence: f64,
    pub use_ai: bool,
    pub alert_on_anomaly: bool,
    pub is_active: bool,
}

impl AnalysisConfig {
    /// The documented default, used when an AOI has no active config.
    pub fn default_for(aoi_id: DbId) -> Self {
        Self {
            aoi_id,
            name: DEFAULT_CONFIG_NAME.to_string(),
            adaptive_threshold: DEFAULT_ADAPTIVE_THRESHOLD,
            threshold_method: THRESHOLD_METHOD_ISOLATION_FOREST.to_string(),
            cloud_mask_method: CLOUD_MASK_SCL.to_string(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            min_violation_area_ha: DEFAULT_MIN_VIOLATION_AREA_HA,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            use_ai: true,
            alert_on_anomaly: true,
            is_active: true,
        }
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation(
                "analysis config name must not be empty".into(),
            ));
        }
        validate_area_ha(self.min_violation_area_ha, "min_violation_area_ha")?;
        validate_fraction(self.adaptive_threshold, "adaptive_threshold")?;
        validate_fraction(self.min_confidence, "min_confidence")?;
        validate_smoothing_window(self.smoothing_window)?;
        validate_threshold_method(&self.threshold_method)?;
        validate_cloud_mask_method(&self.cloud_mask_method)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Fractions and confidences live in `[0, 1]`.
pub fn validate_fraction(value: f64, field: &str) -> Result<(), CoreError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be between 0.0 and 1.0, got {value}"
        )))
    }
}

/// Areas are finite hectares, zero allowed.
pub fn validate_area_ha(value: f64, field: &str) -> Result<(), CoreError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be a finite area >= 0 ha, got {value}"
        )))
    }
}

/// Validate that a smoothing window is odd and at least 3.
pub fn validate_smoothing_window(window: i32) -> Result<(), CoreError> {
    if window < 3 || window % 2 == 0 {
        return Err(CoreError::Validation(format!(
            "smoothing_window must be an odd value >= 3, got {window}"
        )));
    }
    Ok(())
}

/// Validate a threshold method tag.
pub fn validate_threshold_method(method: &str) -> Result<(), CoreError> {
    if VALID_THRESHOLD_METHODS.contains(&method) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown threshold method: '{method}'. Valid methods: {}",
            VALID_THRESHOLD_METHODS.join(", ")
        )))
    }
}

/// Validate a cloud mask method tag.
pub fn validate_cloud_mask_method(method: &str) -> Result<(), CoreError> {
    if VALID_CLOUD_MASK_METHODS.contains(&method) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown cloud mask method: '{method}'. Valid methods: {}",
            VALID_CLOUD_MASK_METHODS.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
