//! Repository for the `violation_events` table.

use aurora_core::types::{DbId, Timestamp};
use aurora_core::violation::{ViolationDraft, LIFECYCLE_VIOLATION_START};
use sqlx::PgExecutor;

use crate::models::violation::ViolationEvent;

const COLUMNS: &str = "\
    id, aoi_id, boundary_id, event_type, lifecycle, severity, detected_at, \
    excavated_area_ha, threshold_ha, confidence, requires_manual_review, \
    description, event_metadata, is_resolved, resolved_at, created_at";

const INSERT_COLUMNS: &str = "\
    aoi_id, boundary_id, event_type, lifecycle, severity, detected_at, \
    excavated_area_ha, threshold_ha, confidence, requires_manual_review, \
    description, event_metadata";

/// Provides query operations for violation events.
pub struct ViolationRepo;

impl ViolationRepo {
    /// Whether an unresolved event of `event_type` exists for the AOI.
    pub async fn has_open<'e, E: PgExecutor<'e>>(
        executor: E,
        aoi_id: DbId,
        event_type: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM violation_events \
                WHERE aoi_id = $1 AND event_type = $2 AND NOT is_resolved)",
        )
        .bind(aoi_id)
        .bind(event_type)
        .fetch_one(executor)
        .await
    }

    /// Insert a new event attached to `boundary_id`.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        boundary_id: DbId,
        draft: &ViolationDraft,
    ) -> Result<ViolationEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO violation_events ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ViolationEvent>(&query)
            .bind(draft.aoi_id)
            .bind(boundary_id)
            .bind(&draft.violation_type)
            .bind(LIFECYCLE_VIOLATION_START)
            .bind(draft.severity.as_str())
            .bind(draft.detected_at)
            .bind(draft.area_ha)
            .bind(draft.threshold_ha)
            .bind(draft.confidence)
            .bind(draft.requires_manual_review())
            .bind(draft.description())
            .bind(draft.event_metadata())
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<ViolationEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM violation_events WHERE id = $1");
        sqlx::query_as::<_, ViolationEvent>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Mark an event resolved. Returns `None` if no unresolved event has
    /// this ID.
    pub async fn resolve<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        resolved_at: Timestamp,
    ) -> Result<Option<ViolationEvent>, sqlx::Error> {
        let query = format!(
            "UPDATE violation_events SET is_resolved = TRUE, resolved_at = $2 \
             WHERE id = $1 AND NOT is_resolved \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ViolationEvent>(&query)
            .bind(id)
            .bind(resolved_at)
            .fetch_optional(executor)
            .await
    }

    /// Events for an AOI, newest first.
    pub async fn list_for_aoi<'e, E: PgExecutor<'e>>(
        executor: E,
        aoi_id: DbId,
    ) -> Result<Vec<ViolationEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM violation_events WHERE aoi_id = $1 ORDER BY detected_at DESC"
        );
        sqlx::query_as::<_, ViolationEvent>(&query)
            .bind(aoi_id)
            .fetch_all(executor)
            .await
    }
}
