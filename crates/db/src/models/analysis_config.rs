//! Stored analysis configuration.

use aurora_core::analysis_config::AnalysisConfig;
use aurora_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `analysis_configs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalysisConfigRow {
    pub id: DbId,
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
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<AnalysisConfigRow> for AnalysisConfig {
    fn from(row: AnalysisConfigRow) -> Self {
        AnalysisConfig {
            aoi_id: row.aoi_id,
            name: row.name,
            adaptive_threshold: row.adaptive_threshold,
            threshold_method: row.threshold_method,
            cloud_mask_method: row.cloud_mask_method,
            smoothing_window: row.smoothing_window,
            min_violation_area_ha: row.min_violation_area_ha,
            min_confidence: row.min_confidence,
            use_ai: row.use_ai,
            alert_on_anomaly: row.alert_on_anomaly,
            is_active: row.is_active,
        }
    }
}
