//! Area-of-interest entity.

use aurora_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `aois` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Aoi {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAoi {
    pub name: String,
    pub description: Option<String>,
}
