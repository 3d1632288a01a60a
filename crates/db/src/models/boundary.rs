//! Concession boundary entity.

use aurora_core::history::BoundaryRef;
use aurora_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `miner_boundaries` table. `is_legal = false` marks a
/// no-go zone.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MinerBoundary {
    pub id: DbId,
    pub aoi_id: DbId,
    pub name: String,
    pub is_legal: bool,
    pub created_at: Timestamp,
}

impl MinerBoundary {
    pub fn boundary_ref(&self) -> BoundaryRef {
        BoundaryRef {
            id: self.id,
            is_legal: self.is_legal,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBoundary {
    pub name: String,
    pub is_legal: bool,
}
