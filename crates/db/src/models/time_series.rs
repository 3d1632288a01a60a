//! Excavation time-series rows (append-only).

use aurora_core::history::TimeSeriesPoint;
use aurora_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `excavation_time_series` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeSeriesRow {
    pub id: DbId,
    pub aoi_id: DbId,
    pub boundary_id: DbId,
    pub recorded_at: Timestamp,
    pub excavated_area_ha: f64,
    pub smoothed_area_ha: f64,
    pub excavation_rate_ha_day: f64,
    pub anomaly_score: f64,
    pub confidence: f64,
    pub ndvi_mean: Option<f64>,
    pub created_at: Timestamp,
}

impl From<TimeSeriesRow> for TimeSeriesPoint {
    fn from(row: TimeSeriesRow) -> Self {
        TimeSeriesPoint {
            boundary_id: row.boundary_id,
            timestamp: row.recorded_at,
            raw_area_ha: row.excavated_area_ha,
            smoothed_area_ha: row.smoothed_area_ha,
            rate_ha_per_day: row.excavation_rate_ha_day,
            anomaly_score: row.anomaly_score,
            confidence: row.confidence,
            ndvi_mean: row.ndvi_mean,
        }
    }
}
