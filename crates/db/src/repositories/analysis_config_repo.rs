//! Repository for the `analysis_configs` table.

use aurora_core::analysis_config::AnalysisConfig;
use aurora_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::analysis_config::AnalysisConfigRow;

const COLUMNS: &str = "\
    id, aoi_id, name, adaptive_threshold, threshold_method, cloud_mask_method, \
    smoothing_window, min_violation_area_ha, min_confidence, use_ai, \
    alert_on_anomaly, is_active, created_at, updated_at";

const INSERT_COLUMNS: &str = "\
    aoi_id, name, adaptive_threshold, threshold_method, cloud_mask_method, \
    smoothing_window, min_violation_area_ha, min_confidence, use_ai, \
    alert_on_anomaly, is_active";

/// Provides query operations for per-AOI analysis configs.
pub struct AnalysisConfigRepo;

impl AnalysisConfigRepo {
    /// The single active config for an AOI, if any.
    pub async fn find_active<'e, E: PgExecutor<'e>>(
        executor: E,
        aoi_id: DbId,
    ) -> Result<Option<AnalysisConfigRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM analysis_configs WHERE aoi_id = $1 AND is_active"
        );
        sqlx::query_as::<_, AnalysisConfigRow>(&query)
            .bind(aoi_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        config: &AnalysisConfig,
    ) -> Result<AnalysisConfigRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO analysis_configs ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnalysisConfigRow>(&query)
            .bind(config.aoi_id)
            .bind(&config.name)
            .bind(config.adaptive_threshold)
            .bind(&config.threshold_method)
            .bind(&config.cloud_mask_method)
            .bind(config.smoothing_window)
            .bind(config.min_violation_area_ha)
            .bind(config.min_confidence)
            .bind(config.use_ai)
            .bind(config.alert_on_anomaly)
            .bind(config.is_active)
            .fetch_one(executor)
            .await
    }
}
