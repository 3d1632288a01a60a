//! Repository for the `aois` table.

use aurora_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::aoi::{Aoi, CreateAoi};

const COLUMNS: &str = "id, name, description, is_active, created_at, updated_at";

/// Provides CRUD operations for areas of interest.
pub struct AoiRepo;

impl AoiRepo {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateAoi,
    ) -> Result<Aoi, sqlx::Error> {
        let query = format!(
            "INSERT INTO aois (name, description) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Aoi>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Aoi>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM aois WHERE id = $1");
        sqlx::query_as::<_, Aoi>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// IDs of every active AOI, oldest first. Drives the batch scheduler.
    pub async fn list_active_ids<'e, E: PgExecutor<'e>>(
        executor: E,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM aois WHERE is_active ORDER BY id")
            .fetch_all(executor)
            .await
    }
}
