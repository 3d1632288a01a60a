//! In-process [`AnalysisStore`] for tests and local runs without Postgres.
//!
//! Mirrors the database constraints that matter to a run: at most one
//! unresolved event per (AOI, event type), and all-or-nothing commits.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aurora_core::analysis_config::AnalysisConfig;
use aurora_core::history::{BoundaryRef, TimeSeriesPoint};
use aurora_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;

use super::{AnalysisStore, RunCommit, RunWrites, ViolationRecord};
use crate::error::PipelineError;

#[derive(Default)]
struct MemoryState {
    next_id: DbId,
    /// AOI id -> is_active.
    aois: BTreeMap<DbId, bool>,
    boundaries: Vec<(DbId, BoundaryRef)>,
    configs: HashMap<DbId, AnalysisConfig>,
    points: Vec<(DbId, TimeSeriesPoint)>,
    violations: Vec<ViolationRecord>,
    fail_next_commit: bool,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_aoi(&self, is_active: bool) -> DbId {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.aois.insert(id, is_active);
        id
    }

    pub async fn add_boundary(&self, aoi_id: DbId, is_legal: bool) -> BoundaryRef {
        let mut state = self.state.lock().await;
        let boundary = BoundaryRef {
            id: state.next_id(),
            is_legal,
        };
        state.boundaries.push((aoi_id, boundary));
        boundary
    }

    pub async fn set_config(&self, config: AnalysisConfig) {
        self.state.lock().await.configs.insert(config.aoi_id, config);
    }

    pub async fn insert_points(&self, aoi_id: DbId, points: Vec<TimeSeriesPoint>) {
        let mut state = self.state.lock().await;
        state.points.extend(points.into_iter().map(|p| (aoi_id, p)));
    }

    /// Make the next [`commit_run`](AnalysisStore::commit_run) fail without
    /// applying any write.
    pub async fn fail_next_commit(&self) {
        self.state.lock().await.fail_next_commit = true;
    }

    pub async fn config(&self, aoi_id: DbId) -> Option<AnalysisConfig> {
        self.state.lock().await.configs.get(&aoi_id).cloned()
    }

    pub async fn points(&self, aoi_id: DbId) -> Vec<TimeSeriesPoint> {
        let state = self.state.lock().await;
        state
            .points
            .iter()
            .filter(|(a, _)| *a == aoi_id)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub async fn violations(&self, aoi_id: DbId) -> Vec<ViolationRecord> {
        let state = self.state.lock().await;
        state
            .violations
            .iter()
            .filter(|v| v.aoi_id == aoi_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn aoi_exists(&self, aoi_id: DbId) -> Result<bool, PipelineError> {
        Ok(self.state.lock().await.aois.contains_key(&aoi_id))
    }

    async fn list_active_aois(&self) -> Result<Vec<DbId>, PipelineError> {
        let state = self.state.lock().await;
        Ok(state
            .aois
            .iter()
            .filter(|(_, active)| **active)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn list_boundaries(&self, aoi_id: DbId) -> Result<Vec<BoundaryRef>, PipelineError> {
        let state = self.state.lock().await;
        Ok(state
            .boundaries
            .iter()
            .filter(|(a, _)| *a == aoi_id)
            .map(|(_, b)| *b)
            .collect())
    }

    async fn active_config(&self, aoi_id: DbId) -> Result<Option<AnalysisConfig>, PipelineError> {
        let state = self.state.lock().await;
        Ok(state.configs.get(&aoi_id).filter(|c| c.is_active).cloned())
    }

    async fn has_history(&self, aoi_id: DbId) -> Result<bool, PipelineError> {
        Ok(self.state.lock().await.points.iter().any(|(a, _)| *a == aoi_id))
    }

    async fn history_since(
        &self,
        aoi_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<TimeSeriesPoint>, PipelineError> {
        let state = self.state.lock().await;
        let mut points: Vec<_> = state
            .points
            .iter()
            .filter(|(a, p)| *a == aoi_id && p.timestamp >= since)
            .map(|(_, p)| p.clone())
            .collect();
        points.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.boundary_id.cmp(&b.boundary_id))
        });
        Ok(points)
    }

    async fn has_open_violation(
        &self,
        aoi_id: DbId,
        violation_type: &str,
    ) -> Result<bool, PipelineError> {
        let state = self.state.lock().await;
        Ok(state
            .violations
            .iter()
            .any(|v| v.aoi_id == aoi_id && v.event_type == violation_type && !v.is_resolved))
    }

    async fn commit_run(&self, writes: RunWrites) -> Result<RunCommit, PipelineError> {
        let mut state = self.state.lock().await;

        // Check every constraint before touching state.
        if state.fail_next_commit {
            state.fail_next_commit = false;
            return Err(sqlx::Error::Protocol("injected commit failure".into()).into());
        }
        if let Some(v) = &writes.violation {
            let duplicate = state.violations.iter().any(|e| {
                e.aoi_id == v.draft.aoi_id && e.event_type == v.draft.violation_type && !e.is_resolved
            });
            if duplicate {
                return Err(sqlx::Error::Protocol(format!(
                    "unresolved {} event already exists for AOI {}",
                    v.draft.violation_type, v.draft.aoi_id
                ))
                .into());
            }
        }

        if let Some(config) = writes.new_config {
            state.configs.insert(writes.aoi_id, config);
        }
        let points_written = writes.points.len() as u64;
        state
            .points
            .extend(writes.points.into_iter().map(|p| (writes.aoi_id, p)));

        let violation = match writes.violation {
            Some(v) => {
                let id = state.next_id();
                let record = ViolationRecord::from_draft(id, v.boundary_id, &v.draft);
                state.violations.push(record.clone());
                Some(record)
            }
            None => None,
        };

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
        let mut state = self.state.lock().await;
        let Some(event) = state
            .violations
            .iter_mut()
            .find(|v| v.id == event_id && !v.is_resolved)
        else {
            return Ok(None);
        };
        event.is_resolved = true;
        event.resolved_at = Some(resolved_at);
        Ok(Some(event.clone()))
    }
}
