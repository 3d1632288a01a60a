//! Repository for the `excavation_time_series` table (append-only).

use aurora_core::history::TimeSeriesPoint;
use aurora_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgExecutor};

use crate::models::time_series::TimeSeriesRow;

const COLUMNS: &str = "\
    id, aoi_id, boundary_id, recorded_at, excavated_area_ha, smoothed_area_ha, \
    excavation_rate_ha_day, anomaly_score, confidence, ndvi_mean, created_at";

const INSERT_COLUMNS: &str = "\
    aoi_id, boundary_id, recorded_at, excavated_area_ha, smoothed_area_ha, \
    excavation_rate_ha_day, anomaly_score, confidence, ndvi_mean";

const INSERT_PARAMS: usize = 9;

/// Rows per INSERT statement, well under the 65535 bind-parameter limit.
const BATCH_ROWS: usize = 1000;

/// Provides query operations for excavation history.
pub struct TimeSeriesRepo;

impl TimeSeriesRepo {
    /// Append points for an AOI using multi-row INSERTs.
    pub async fn insert_batch(
        conn: &mut PgConnection,
        aoi_id: DbId,
        points: &[TimeSeriesPoint],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for chunk in points.chunks(BATCH_ROWS) {
            let mut query = format!("INSERT INTO excavation_time_series ({INSERT_COLUMNS}) VALUES ");
            let mut param_idx = 1usize;
            for (i, _) in chunk.iter().enumerate() {
                if i > 0 {
                    query.push_str(", ");
                }
                query.push('(');
                for j in 0..INSERT_PARAMS {
                    if j > 0 {
                        query.push_str(", ");
                    }
                    query.push('$');
                    query.push_str(&param_idx.to_string());
                    param_idx += 1;
                }
                query.push(')');
            }

            let mut q = sqlx::query(&query);
            for p in chunk {
                q = q
                    .bind(aoi_id)
                    .bind(p.boundary_id)
                    .bind(p.timestamp)
                    .bind(p.raw_area_ha)
                    .bind(p.smoothed_area_ha)
                    .bind(p.rate_ha_per_day)
                    .bind(p.anomaly_score)
                    .bind(p.confidence)
                    .bind(p.ndvi_mean);
            }
            inserted += q.execute(&mut *conn).await?.rows_affected();
        }
        Ok(inserted)
    }

    /// Points recorded at or after `since`, oldest first.
    pub async fn list_since<'e, E: PgExecutor<'e>>(
        executor: E,
        aoi_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<TimeSeriesRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM excavation_time_series \
             WHERE aoi_id = $1 AND recorded_at >= $2 \
             ORDER BY recorded_at, boundary_id"
        );
        sqlx::query_as::<_, TimeSeriesRow>(&query)
            .bind(aoi_id)
            .bind(since)
            .fetch_all(executor)
            .await
    }

    pub async fn count_for_aoi<'e, E: PgExecutor<'e>>(
        executor: E,
        aoi_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM excavation_time_series WHERE aoi_id = $1")
            .bind(aoi_id)
            .fetch_one(executor)
            .await
    }
}
