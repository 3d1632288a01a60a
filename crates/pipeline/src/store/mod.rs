//! Persistence seam for analysis runs.
//!
//! [`AnalysisStore`] covers the reads a run needs and a single
//! [`commit_run`](AnalysisStore::commit_run) that applies all of a run's
//! writes or none of them. [`postgres::PgAnalysisStore`] backs it with sqlx;
//! [`memory::MemoryStore`] keeps everything in process for tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use aurora_core::analysis_config::AnalysisConfig;
use aurora_core::history::{BoundaryRef, TimeSeriesPoint};
use aurora_core::types::{DbId, Timestamp};
use aurora_core::violation::{ViolationDraft, LIFECYCLE_VIOLATION_START};
use aurora_db::models::violation::ViolationEvent;
use serde::Serialize;

use crate::error::PipelineError;

pub use memory::MemoryStore;
pub use postgres::PgAnalysisStore;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A stored violation event, independent of the backing store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationRecord {
    pub id: DbId,
    pub aoi_id: DbId,
    pub boundary_id: DbId,
    pub event_type: String,
    pub lifecycle: String,
    pub severity: String,
    pub detected_at: Timestamp,
    pub area_ha: f64,
    pub threshold_ha: f64,
    pub confidence: f64,
    pub requires_manual_review: bool,
    pub description: String,
    pub metadata: serde_json::Value,
    pub is_resolved: bool,
    pub resolved_at: Option<Timestamp>,
}

impl ViolationRecord {
    pub fn from_draft(id: DbId, boundary_id: DbId, draft: &ViolationDraft) -> Self {
        Self {
            id,
            aoi_id: draft.aoi_id,
            boundary_id,
            event_type: draft.violation_type.clone(),
            lifecycle: LIFECYCLE_VIOLATION_START.to_string(),
            severity: draft.severity.as_str().to_string(),
            detected_at: draft.detected_at,
            area_ha: draft.area_ha,
            threshold_ha: draft.threshold_ha,
            confidence: draft.confidence,
            requires_manual_review: draft.requires_manual_review(),
            description: draft.description(),
            metadata: draft.event_metadata(),
            is_resolved: false,
            resolved_at: None,
        }
    }
}

impl From<ViolationEvent> for ViolationRecord {
    fn from(row: ViolationEvent) -> Self {
        Self {
            id: row.id,
            aoi_id: row.aoi_id,
            boundary_id: row.boundary_id,
            event_type: row.event_type,
            lifecycle: row.lifecycle,
            severity: row.severity,
            detected_at: row.detected_at,
            area_ha: row.excavated_area_ha,
            threshold_ha: row.threshold_ha,
            confidence: row.confidence,
            requires_manual_review: row.requires_manual_review,
            description: row.description,
            metadata: row.event_metadata,
            is_resolved: row.is_resolved,
            resolved_at: row.resolved_at,
        }
    }
}

/// Violation to insert, attached to a no-go boundary.
#[derive(Debug, Clone)]
pub struct NewViolation {
    pub boundary_id: DbId,
    pub draft: ViolationDraft,
}

/// Everything one analysis run writes.
#[derive(Debug, Clone)]
pub struct RunWrites {
    pub aoi_id: DbId,
    /// Default config to persist when the AOI had none.
    pub new_config: Option<AnalysisConfig>,
    /// Synthetic baseline followed by this run's points.
    pub points: Vec<TimeSeriesPoint>,
    pub violation: Option<NewViolation>,
}

#[derive(Debug, Clone, Default)]
pub struct RunCommit {
    pub points_written: u64,
    pub violation: Option<ViolationRecord>,
}

// ---------------------------------------------------------------------------
// AnalysisStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn aoi_exists(&self, aoi_id: DbId) -> Result<bool, PipelineError>;

    async fn list_active_aois(&self) -> Result<Vec<DbId>, PipelineError>;

    async fn list_boundaries(&self, aoi_id: DbId) -> Result<Vec<BoundaryRef>, PipelineError>;

    async fn active_config(&self, aoi_id: DbId) -> Result<Option<AnalysisConfig>, PipelineError>;

    async fn has_history(&self, aoi_id: DbId) -> Result<bool, PipelineError>;

    async fn history_since(
        &self,
        aoi_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<TimeSeriesPoint>, PipelineError>;

    async fn has_open_violation(
        &self,
        aoi_id: DbId,
        violation_type: &str,
    ) -> Result<bool, PipelineError>;

    /// Apply all of a run's writes atomically.
    async fn commit_run(&self, writes: RunWrites) -> Result<RunCommit, PipelineError>;

    /// Mark an unresolved event resolved. `None` if no such event is open.
    async fn resolve_violation(
        &self,
        event_id: DbId,
        resolved_at: Timestamp,
    ) -> Result<Option<ViolationRecord>, PipelineError>;
}
