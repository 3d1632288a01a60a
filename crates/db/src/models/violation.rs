//! Violation event entity.

use aurora_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `violation_events` table.
///
/// Rows are never updated except to mark them resolved.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ViolationEvent {
    pub id: DbId,
    pub aoi_id: DbId,
    pub boundary_id: DbId,
    pub event_type: String,
    pub lifecycle: String,
    pub severity: String,
    pub detected_at: Timestamp,
    pub excavated_area_ha: f64,
    pub threshold_ha: f64,
    pub confidence: f64,
    pub requires_manual_review: bool,
    pub description: String,
    pub event_metadata: serde_json::Value,
    pub is_resolved: bool,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
