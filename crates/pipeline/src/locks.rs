//! Per-AOI mutual exclusion.
//!
//! The open-violation check and the violation insert must not interleave
//! between two runs of the same AOI. Every run holds its AOI's guard for its
//! whole duration; runs for different AOIs proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use aurora_core::types::DbId;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct AoiLocks {
    locks: Mutex<HashMap<DbId, Arc<Mutex<()>>>>,
}

impl AoiLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `aoi_id`. Released when the guard drops.
    pub async fn acquire(&self, aoi_id: DbId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().await;
            Arc::clone(map.entry(aoi_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Non-blocking variant. `None` while another run holds the AOI.
    pub async fn try_acquire(&self, aoi_id: DbId) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut map = self.locks.lock().await;
            Arc::clone(map.entry(aoi_id).or_default())
        };
        lock.try_lock_owned().ok()
    }
}
