//! End-to-end analysis runs against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use aurora_core::analysis_config::AnalysisConfig;
use aurora_core::report::ReportStatus;
use aurora_core::violation::{ViolationDecision, VIOLATION_EXCAVATION_IN_NOGO_ZONE};
use aurora_events::bus::{KIND_VIOLATION_CREATED, KIND_WARNING_PREDICTED};
use aurora_events::EventBus;
use aurora_pipeline::batch::{AoiRunStatus, BatchScheduler};
use aurora_pipeline::runner::AnalysisRunner;
use aurora_pipeline::source::{
    DataOrigin, RetryPolicy, SatelliteSource, Scene, SceneFetcher, SceneRequest, SourceError,
    SyntheticSource,
};
use aurora_pipeline::store::MemoryStore;
use aurora_pipeline::PipelineError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct DownSource;

#[async_trait]
impl SatelliteSource for DownSource {
    fn name(&self) -> &str {
        "down"
    }

    async fn fetch_scene(&self, _request: &SceneRequest) -> Result<Scene, SourceError> {
        Err(SourceError::Unavailable("maintenance".into()))
    }
}

fn quick_policy(synthetic_fallback: bool) -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        timeout: Duration::from_millis(100),
        backoff: Duration::ZERO,
        synthetic_fallback,
    }
}

fn runner_with(
    store: Arc<MemoryStore>,
    source: Arc<dyn SatelliteSource>,
    synthetic_fallback: bool,
) -> (Arc<AnalysisRunner>, Arc<EventBus>) {
    let bus = Arc::new(EventBus::default());
    let fetcher = SceneFetcher::new(source, quick_policy(synthetic_fallback));
    let runner = AnalysisRunner::new(store, fetcher, Arc::clone(&bus)).with_seed(42);
    (Arc::new(runner), bus)
}

fn runner(store: Arc<MemoryStore>) -> (Arc<AnalysisRunner>, Arc<EventBus>) {
    runner_with(store, Arc::new(SyntheticSource), false)
}

/// An AOI with one legal and one no-go boundary.
async fn seeded_aoi(store: &MemoryStore) -> (i64, i64) {
    let aoi = store.add_aoi(true).await;
    store.add_boundary(aoi, true).await;
    let nogo = store.add_boundary(aoi, false).await;
    (aoi, nogo.id)
}

// ---------------------------------------------------------------------------
// Analysis runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_run_seeds_history_and_creates_violation() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, nogo_id) = seeded_aoi(&store).await;
    let (runner, bus) = runner(Arc::clone(&store));
    let mut rx = bus.subscribe();

    let outcome = runner.run_analysis(aoi).await.unwrap();

    assert!(outcome.config_created);
    assert_eq!(outcome.data_origin, DataOrigin::Synthetic);
    assert_eq!(outcome.synthetic_history_points, 2 * 131);
    assert_eq!(outcome.time_series_points_written, 2 * 131 + 2);
    assert_eq!(outcome.anomalies.len(), 2);
    assert!(outcome.detection.confidence >= 0.5 && outcome.detection.confidence <= 1.0);
    assert_matches!(outcome.decision, ViolationDecision::Create { .. });

    let violation = outcome.violation.expect("violation should be stored");
    assert_eq!(violation.boundary_id, nogo_id);
    assert_eq!(violation.event_type, VIOLATION_EXCAVATION_IN_NOGO_ZONE);
    assert!(violation.severity == "MEDIUM" || violation.severity == "HIGH");
    assert!(!violation.is_resolved);

    assert_eq!(store.config(aoi).await, Some(AnalysisConfig::default_for(aoi)));
    assert_eq!(store.points(aoi).await.len(), 2 * 131 + 2);
    assert_eq!(store.violations(aoi).await.len(), 1);

    let alert = rx.recv().await.unwrap();
    assert_eq!(alert.kind, KIND_VIOLATION_CREATED);
    assert_eq!(alert.aoi_id, aoi);
    assert_eq!(alert.payload["id"], violation.id);
}

#[tokio::test]
async fn open_violation_suppresses_second_event() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    let (runner, _bus) = runner(Arc::clone(&store));

    runner.run_analysis(aoi).await.unwrap();
    let second = runner.run_analysis(aoi).await.unwrap();

    assert!(!second.config_created);
    assert_eq!(second.synthetic_history_points, 0);
    assert_eq!(second.time_series_points_written, 2);
    assert_matches!(second.decision, ViolationDecision::Suppressed { .. });
    assert!(second.violation.is_none());
    assert_eq!(store.violations(aoi).await.len(), 1);
}

#[tokio::test]
async fn resolution_reopens_the_slot() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    let (runner, _bus) = runner(Arc::clone(&store));

    let first = runner.run_analysis(aoi).await.unwrap().violation.unwrap();
    let resolved = runner.resolve_violation(first.id).await.unwrap();
    assert!(resolved.is_resolved);
    assert!(resolved.resolved_at.is_some());

    // Resolving twice is an error, not a second mutation.
    assert_matches!(
        runner.resolve_violation(first.id).await,
        Err(PipelineError::ViolationNotFound(id)) if id == first.id
    );

    let next = runner.run_analysis(aoi).await.unwrap();
    assert!(next.violation.is_some());
    let all = store.violations(aoi).await;
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|v| !v.is_resolved).count(), 1);
}

#[tokio::test]
async fn no_nogo_boundary_means_no_event() {
    let store = Arc::new(MemoryStore::new());
    let aoi = store.add_aoi(true).await;
    store.add_boundary(aoi, true).await;
    let (runner, _bus) = runner(Arc::clone(&store));

    let outcome = runner.run_analysis(aoi).await.unwrap();
    assert_matches!(outcome.decision, ViolationDecision::Create { .. });
    assert!(outcome.violation.is_none());
    assert!(store.violations(aoi).await.is_empty());
}

#[tokio::test]
async fn high_threshold_keeps_run_below_threshold() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    let mut config = AnalysisConfig::default_for(aoi);
    config.min_violation_area_ha = 50.0;
    store.set_config(config).await;
    let (runner, _bus) = runner(Arc::clone(&store));

    let outcome = runner.run_analysis(aoi).await.unwrap();
    assert!(!outcome.config_created);
    assert_matches!(outcome.decision, ViolationDecision::BelowThreshold { threshold_ha, .. } if threshold_ha == 50.0);
    assert!(store.violations(aoi).await.is_empty());
}

#[tokio::test]
async fn unknown_aoi_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let (runner, _bus) = runner(store);
    assert_matches!(runner.run_analysis(404).await, Err(PipelineError::AoiNotFound(404)));
}

#[tokio::test]
async fn failed_commit_leaves_no_partial_writes() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    store.fail_next_commit().await;
    let (runner, bus) = runner(Arc::clone(&store));
    let mut rx = bus.subscribe();

    assert_matches!(runner.run_analysis(aoi).await, Err(PipelineError::Store(_)));
    assert!(store.config(aoi).await.is_none());
    assert!(store.points(aoi).await.is_empty());
    assert!(store.violations(aoi).await.is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn source_outage_without_fallback_fails_the_run() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    let (runner, _bus) = runner_with(Arc::clone(&store), Arc::new(DownSource), false);

    assert_matches!(
        runner.run_analysis(aoi).await,
        Err(PipelineError::Source(SourceError::Unavailable(_)))
    );
    assert!(store.points(aoi).await.is_empty());
}

#[tokio::test]
async fn source_outage_with_fallback_uses_synthetic_scene() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    let (runner, _bus) = runner_with(Arc::clone(&store), Arc::new(DownSource), true);

    let outcome = runner.run_analysis(aoi).await.unwrap();
    assert_eq!(outcome.data_origin, DataOrigin::Synthetic);
    assert_eq!(outcome.preprocessing.original_pixels, 10_000);
}

#[tokio::test]
async fn concurrent_runs_create_at_most_one_event() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    let (runner, _bus) = runner(Arc::clone(&store));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.run_analysis(aoi).await })
        })
        .collect();
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(store.violations(aoi).await.len(), 1);
    // Synthetic history is generated exactly once.
    assert_eq!(store.points(aoi).await.len(), 2 * 131 + 4 * 2);
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_continues_past_failures() {
    let store = Arc::new(MemoryStore::new());
    let (a, _) = seeded_aoi(&store).await;
    let (b, _) = seeded_aoi(&store).await;
    let (runner, _bus) = runner(Arc::clone(&store));
    let scheduler = BatchScheduler::new(runner);

    let summary = scheduler.run_batch(&[a, 999, b]).await;
    assert_eq!(summary.results.len(), 3);
    assert_eq!(summary.completed(), 2);
    assert_eq!(summary.failed(), 1);
    assert_matches!(
        &summary.results[1].status,
        AoiRunStatus::Failed { message } if message.contains("999")
    );
    assert_matches!(summary.results[2].status, AoiRunStatus::Completed { .. });
}

#[tokio::test]
async fn run_active_skips_inactive_aois() {
    let store = Arc::new(MemoryStore::new());
    let (active, _) = seeded_aoi(&store).await;
    let inactive = store.add_aoi(false).await;
    let (runner, _bus) = runner(Arc::clone(&store));

    let summary = BatchScheduler::new(runner).run_active().await.unwrap();
    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.results[0].aoi_id, active);
    assert!(store.points(inactive).await.is_empty());
}

#[tokio::test]
async fn periodic_scheduler_stops_on_cancel() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    let (runner, _bus) = runner(Arc::clone(&store));
    let scheduler = BatchScheduler::new(runner);
    let cancel = tokio_util::sync::CancellationToken::new();

    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run_periodic(Duration::from_secs(3600), cancel).await })
    };
    // The first tick fires immediately.
    for _ in 0..100 {
        if !store.points(aoi).await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop")
        .unwrap();
    assert!(!store.points(aoi).await.is_empty());
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reports_over_seeded_history() {
    let store = Arc::new(MemoryStore::new());
    let (aoi, _) = seeded_aoi(&store).await;
    let (runner, _bus) = runner(Arc::clone(&store));
    runner.run_analysis(aoi).await.unwrap();

    let temporal = runner.temporal_report(aoi, 90).await.unwrap();
    assert!(temporal.data_points >= 5);
    assert!(temporal.analysis.is_some());
    assert_matches!(temporal.status, ReportStatus::Complete | ReportStatus::Partial { .. });

    let warning = runner.early_warning_report(aoi, 90).await.unwrap();
    let risk = warning.risk_assessment().expect("risk should be assessed");
    assert!((0.0..=100.0).contains(&risk.total_score));
    assert!((0.0..=1.0).contains(&risk.predictive_alert.violation_probability));
}

#[tokio::test]
async fn report_without_history_is_insufficient() {
    let store = Arc::new(MemoryStore::new());
    let aoi = store.add_aoi(true).await;
    let (runner, bus) = runner(Arc::clone(&store));
    let mut rx = bus.subscribe();

    let report = runner.early_warning_report(aoi, 90).await.unwrap();
    assert_eq!(report.data_points_analyzed, 0);
    assert_matches!(report.status, ReportStatus::InsufficientData { required: 2, found: 0, .. });
    assert!(report.analysis.is_none());
    assert!(rx.try_recv().is_err());

    assert_matches!(
        runner.temporal_report(999, 90).await,
        Err(PipelineError::AoiNotFound(999))
    );
}

#[tokio::test]
async fn triggered_prediction_is_published() {
    use aurora_core::history::TimeSeriesPoint;
    use chrono::{Duration as Days, Utc};

    let store = Arc::new(MemoryStore::new());
    let (aoi, nogo_id) = seeded_aoi(&store).await;
    let now = Utc::now();
    // Rapid growth: the area climbs 4-7 ha every 14 days while NDVI falls.
    let areas = [10.0, 14.0, 19.0, 24.0, 29.0, 36.0];
    let ndvi = [0.80, 0.76, 0.71, 0.66, 0.60, 0.55];
    let points = areas
        .iter()
        .enumerate()
        .map(|(i, area)| TimeSeriesPoint {
            boundary_id: nogo_id,
            timestamp: now - Days::days(14 * (areas.len() - i) as i64),
            raw_area_ha: *area,
            smoothed_area_ha: *area,
            rate_ha_per_day: 0.0,
            anomaly_score: 0.0,
            confidence: 0.9,
            ndvi_mean: Some(ndvi[i]),
        })
        .collect();
    store.insert_points(aoi, points).await;

    let (runner, bus) = runner(Arc::clone(&store));
    let mut rx = bus.subscribe();

    let report = runner.early_warning_report(aoi, 90).await.unwrap();
    let alert = &report.risk_assessment().unwrap().predictive_alert;
    assert!(alert.triggered);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind, KIND_WARNING_PREDICTED);
    assert_eq!(event.payload["triggered"], true);
}
