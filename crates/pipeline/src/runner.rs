//! One analysis run, end to end, plus the report and resolution entry points.

use std::sync::Arc;

use aurora_core::analysis_config::AnalysisConfig;
use aurora_core::anomaly::{detect_anomalies, ZoneAnomaly};
use aurora_core::detection::{detect_excavation, DetectionResult};
use aurora_core::early_warning::EarlyWarningConfig;
use aurora_core::history::{generate_synthetic_history, points_from_detection, HISTORY_INTERVAL_DAYS};
use aurora_core::report::{
    aggregate_by_timestamp, early_warning_report, temporal_report, EarlyWarningReport,
    HistoryPoint, TemporalReport,
};
use aurora_core::spectral::{preprocess, PreprocessStats};
use aurora_core::types::{DbId, Timestamp};
use aurora_core::violation::{
    decide, OpenViolationIndex, ViolationDecision, VIOLATION_EXCAVATION_IN_NOGO_ZONE,
};
use aurora_events::{AlertEvent, EventBus};
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::PipelineError;
use crate::locks::AoiLocks;
use crate::source::{DataOrigin, SceneFetcher, SceneRequest};
use crate::store::{AnalysisStore, NewViolation, RunWrites, ViolationRecord};

/// Imagery window requested per run.
pub const SCENE_WINDOW_DAYS: i64 = 30;

/// Result of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub aoi_id: DbId,
    pub analyzed_at: Timestamp,
    pub data_origin: DataOrigin,
    pub config_created: bool,
    pub synthetic_history_points: usize,
    pub preprocessing: PreprocessStats,
    /// Rounded for display.
    pub detection: DetectionResult,
    pub anomalies: Vec<ZoneAnomaly>,
    pub decision: ViolationDecision,
    /// Set when the decision created an event and the AOI has a no-go
    /// boundary to attach it to.
    pub violation: Option<ViolationRecord>,
    pub time_series_points_written: u64,
}

pub struct AnalysisRunner {
    store: Arc<dyn AnalysisStore>,
    fetcher: SceneFetcher,
    bus: Arc<EventBus>,
    locks: AoiLocks,
    rng: Mutex<StdRng>,
    early_warning: EarlyWarningConfig,
}

impl AnalysisRunner {
    pub fn new(store: Arc<dyn AnalysisStore>, fetcher: SceneFetcher, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            fetcher,
            bus,
            locks: AoiLocks::new(),
            rng: Mutex::new(StdRng::from_os_rng()),
            early_warning: EarlyWarningConfig::default(),
        }
    }

    /// Fix the seed of the detection jitter and synthetic history.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_early_warning(mut self, config: EarlyWarningConfig) -> Self {
        self.early_warning = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn AnalysisStore> {
        &self.store
    }

    /// Run detection for one AOI and commit its writes atomically.
    ///
    /// Holds the AOI's lock for the whole run so the open-violation check
    /// and the insert cannot interleave with another run of the same AOI.
    pub async fn run_analysis(&self, aoi_id: DbId) -> Result<AnalysisOutcome, PipelineError> {
        let _guard = self.locks.acquire(aoi_id).await;

        if !self.store.aoi_exists(aoi_id).await? {
            return Err(PipelineError::AoiNotFound(aoi_id));
        }
        let now = Utc::now();
        let boundaries = self.store.list_boundaries(aoi_id).await?;

        let (config, new_config) = match self.store.active_config(aoi_id).await? {
            Some(config) => (config, None),
            None => {
                let config = AnalysisConfig::default_for(aoi_id);
                tracing::info!(aoi_id, "No active analysis config, using default");
                (config.clone(), Some(config))
            }
        };
        config.validate()?;
        let config_created = new_config.is_some();

        let mut points = Vec::new();
        if !boundaries.is_empty() && !self.store.has_history(aoi_id).await? {
            let end = now - Duration::days(HISTORY_INTERVAL_DAYS);
            let mut rng = self.rng.lock().await;
            points = generate_synthetic_history(&boundaries, end, &mut *rng);
            tracing::info!(aoi_id, points = points.len(), "Generated synthetic baseline history");
        }
        let synthetic_history_points = points.len();

        let scene = self
            .fetcher
            .fetch(&SceneRequest {
                aoi_id,
                start: now - Duration::days(SCENE_WINDOW_DAYS),
                end: now,
            })
            .await?;

        let stats = preprocess(&scene.pixels, scene.cloud);
        let detection = {
            let mut rng = self.rng.lock().await;
            detect_excavation(&stats, &scene.pixels, &config, &mut *rng)
        };
        let anomalies = if config.use_ai {
            detect_anomalies(&scene.pixels)
        } else {
            Vec::new()
        };

        tracing::info!(
            aoi_id,
            total_area_ha = detection.total_area_ha,
            nogo_area_ha = detection.nogo_area_ha,
            confidence = detection.confidence,
            origin = ?scene.origin,
            "Excavation detected"
        );

        let mut open = OpenViolationIndex::new();
        if self
            .store
            .has_open_violation(aoi_id, VIOLATION_EXCAVATION_IN_NOGO_ZONE)
            .await?
        {
            open.mark_open(aoi_id, VIOLATION_EXCAVATION_IN_NOGO_ZONE);
        }
        let decision = decide(aoi_id, &detection, &config, &open, now);

        let violation = match &decision {
            ViolationDecision::Create { draft } => {
                match boundaries.iter().find(|b| !b.is_legal) {
                    Some(nogo) => Some(NewViolation {
                        boundary_id: nogo.id,
                        draft: draft.clone(),
                    }),
                    None => {
                        tracing::warn!(aoi_id, "Violation triggered but AOI has no no-go boundary");
                        None
                    }
                }
            }
            ViolationDecision::Suppressed { violation_type } => {
                tracing::debug!(aoi_id, violation_type, "Open violation exists, not escalating");
                None
            }
            ViolationDecision::BelowThreshold { .. } => None,
        };

        points.extend(points_from_detection(&boundaries, &detection, &stats, now));

        let commit = self
            .store
            .commit_run(RunWrites {
                aoi_id,
                new_config,
                points,
                violation,
            })
            .await?;

        if let Some(v) = &commit.violation {
            tracing::warn!(
                aoi_id,
                violation_id = v.id,
                severity = %v.severity,
                area_ha = v.area_ha,
                requires_manual_review = v.requires_manual_review,
                "Violation event created"
            );
            self.bus.publish(AlertEvent::violation_created(
                aoi_id,
                serde_json::to_value(v).unwrap_or_default(),
            ));
        }

        Ok(AnalysisOutcome {
            aoi_id,
            analyzed_at: now,
            data_origin: scene.origin,
            config_created,
            synthetic_history_points,
            preprocessing: stats,
            detection: detection.rounded(),
            anomalies,
            decision,
            violation: commit.violation,
            time_series_points_written: commit.points_written,
        })
    }

    /// Smoothing, rate and trend over the last `days` of stored history.
    pub async fn temporal_report(&self, aoi_id: DbId, days: u32) -> Result<TemporalReport, PipelineError> {
        let history = self.load_history(aoi_id, days).await?;
        Ok(temporal_report(aoi_id, &history, days))
    }

    /// Full early-warning assessment. Publishes a `warning.predicted` alert
    /// when the predictive alert triggers.
    pub async fn early_warning_report(
        &self,
        aoi_id: DbId,
        days: u32,
    ) -> Result<EarlyWarningReport, PipelineError> {
        let history = self.load_history(aoi_id, days).await?;
        let nogo_zones = self
            .store
            .list_boundaries(aoi_id)
            .await?
            .iter()
            .filter(|b| !b.is_legal)
            .count();

        let report = early_warning_report(aoi_id, &history, nogo_zones, days, &self.early_warning);

        if let Some(risk) = report.risk_assessment() {
            tracing::info!(
                aoi_id,
                total_score = risk.total_score,
                level = risk.level.as_str(),
                "Risk assessed"
            );
            if risk.predictive_alert.triggered {
                self.bus.publish(AlertEvent::warning_predicted(
                    aoi_id,
                    serde_json::to_value(&risk.predictive_alert).unwrap_or_default(),
                ));
            }
        }
        Ok(report)
    }

    pub async fn resolve_violation(&self, event_id: DbId) -> Result<ViolationRecord, PipelineError> {
        let record = self
            .store
            .resolve_violation(event_id, Utc::now())
            .await?
            .ok_or(PipelineError::ViolationNotFound(event_id))?;
        tracing::info!(aoi_id = record.aoi_id, violation_id = record.id, "Violation resolved");
        Ok(record)
    }

    async fn load_history(
        &self,
        aoi_id: DbId,
        days: u32,
    ) -> Result<Vec<HistoryPoint>, PipelineError> {
        if !self.store.aoi_exists(aoi_id).await? {
            return Err(PipelineError::AoiNotFound(aoi_id));
        }
        let since = Utc::now() - Duration::days(i64::from(days));
        let points = self.store.history_since(aoi_id, since).await?;
        Ok(aggregate_by_timestamp(&points))
    }
}
