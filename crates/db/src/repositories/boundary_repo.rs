//! Repository for the `miner_boundaries` table.

use aurora_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::boundary::{CreateBoundary, MinerBoundary};

const COLUMNS: &str = "id, aoi_id, name, is_legal, created_at";

/// Provides query operations for concession boundaries.
pub struct BoundaryRepo;

impl BoundaryRepo {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        aoi_id: DbId,
        input: &CreateBoundary,
    ) -> Result<MinerBoundary, sqlx::Error> {
        let query = format!(
            "INSERT INTO miner_boundaries (aoi_id, name, is_legal) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MinerBoundary>(&query)
            .bind(aoi_id)
            .bind(&input.name)
            .bind(input.is_legal)
            .fetch_one(executor)
            .await
    }

    /// All boundaries of an AOI in creation order.
    pub async fn list_for_aoi<'e, E: PgExecutor<'e>>(
        executor: E,
        aoi_id: DbId,
    ) -> Result<Vec<MinerBoundary>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM miner_boundaries WHERE aoi_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, MinerBoundary>(&query)
            .bind(aoi_id)
            .fetch_all(executor)
            .await
    }
}
