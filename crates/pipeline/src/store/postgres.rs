//! sqlx-backed [`AnalysisStore`].

use async_trait::async_trait;
use aurora_core::analysis_config::AnalysisConfig;
use aurora_core::history::{BoundaryRef, TimeSeriesPoint};
use aurora_core::types::{DbId, Timestamp};
use aurora_db::repositories::{
    AnalysisConfigRepo, AoiRepo, BoundaryRepo, TimeSeriesRepo, ViolationRepo,
};
use aurora_db::DbPool;

use super::{AnalysisStore, RunCommit, RunWrites, ViolationRecord};
use crate::error::PipelineError;

pub struct PgAnalysisStore {
    pool: DbPool,
}

impl PgAnalysisStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn aoi_exists(&self, aoi_id: DbId) -> Result<bool, PipelineError> {
        Ok(AoiRepo::find_by_id(&self.pool, aoi_id).await?.is_some())
    }

    async fn list_active_aois(&self) -> Result<Vec<DbId>, PipelineError> {
        Ok(AoiRepo::list_active_ids(&self.pool).await?)
    }

    async fn list_boundaries(&self, aoi_id: DbId) -> Result<Vec<BoundaryRef>, PipelineError> {
        let rows = BoundaryRepo::list_for_aoi(&self.pool, aoi_id).await?;
        Ok(rows.iter().map(|b| b.boundary_ref()).collect())
    }

    async fn active_config(&self, aoi_id: DbId) -> Result<Option<AnalysisConfig>, PipelineError> {
        let row = AnalysisConfigRepo::find_active(&self.pool, aoi_id).await?;
        Ok(row.map(AnalysisConfig::from))
    }

    async fn has_history(&self, aoi_id: DbId) -> Result<bool, PipelineError> {
        Ok(TimeSeriesRepo::count_for_aoi(&self.pool, aoi_id).await? > 0)
    }

    async fn history_since(
        &self,
        aoi_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<TimeSeriesPoint>, PipelineError> {
        let rows = TimeSeriesRepo::list_since(&self.pool, aoi_id, since).await?;
        Ok(rows.into_iter().map(TimeSeriesPoint::from).collect())
    }

    async fn has_open_violation(
        &self,
        aoi_id: DbId,
        violation_type: &str,
    ) -> Result<bool, PipelineError> {
        Ok(ViolationRepo::has_open(&self.pool, aoi_id, violation_type).await?)
    }

    /// One transaction per run. Any error drops `tx` uncommitted, which
    /// rolls back every statement already issued.
    async fn commit_run(&self, writes: RunWrites) -> Result<RunCommit, PipelineError> {
        let mut tx = self.pool.begin().await?;

        if let Some(config) = &writes.new_config {
            let row = AnalysisConfigRepo::insert(&mut *tx, config).await?;
            tracing::info!(aoi_id = writes.aoi_id, config_id = row.id, "Created default analysis config");
        }

        let points_written = TimeSeriesRepo::insert_batch(&mut *tx, writes.aoi_id, &writes.points).await?;

        let violation = match &writes.violation {
            Some(v) => {
                let event = ViolationRepo::insert(&mut *tx, v.boundary_id, &v.draft).await?;
                Some(ViolationRecord::from(event))
            }
            None => None,
        };

        tx.commit().await?;

        Ok(RunCommit {
            points_written,
            violation,
        })
    }

    async fn resolve_violation(
        &self,
        event_id: DbId,
        resolved_at: Timestamp,
    ) -> Result<Option<ViolationRecord>, PipelineError> {
        let row = ViolationRepo::resolve(&self.pool, event_id, resolved_at).await?;
        Ok(row.map(ViolationRecord::from))
    }
}
