//! Webhook alert subscription entity.

use aurora_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `alert_subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertSubscription {
    pub id: DbId,
    /// `None` subscribes to every AOI.
    pub aoi_id: Option<DbId>,
    pub webhook_url: String,
    pub is_active: bool,
    pub failure_count: i32,
    pub last_alert_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlertSubscription {
    pub aoi_id: Option<DbId>,
    pub webhook_url: String,
}
