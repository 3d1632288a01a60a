//! Sequential batch scheduler over active AOIs.
//!
//! AOIs are analysed one after another. A failing AOI is recorded as
//! [`AoiRunStatus::Failed`] and the batch moves on.

use std::sync::Arc;
use std::time::Duration;

use aurora_core::types::DbId;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::runner::AnalysisRunner;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AoiRunStatus {
    Completed {
        total_area_ha: f64,
        violation_created: bool,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AoiRunResult {
    pub aoi_id: DbId,
    #[serde(flatten)]
    pub status: AoiRunStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub results: Vec<AoiRunResult>,
}

impl BatchSummary {
    pub fn completed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, AoiRunStatus::Completed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.completed()
    }
}

pub struct BatchScheduler {
    runner: Arc<AnalysisRunner>,
    report_window_days: Option<u32>,
}

impl BatchScheduler {
    pub fn new(runner: Arc<AnalysisRunner>) -> Self {
        Self {
            runner,
            report_window_days: None,
        }
    }

    /// After each successful run, assess early-warning risk over the last
    /// `days` of history so triggered predictions reach the alert bus.
    pub fn with_early_warning(mut self, days: u32) -> Self {
        self.report_window_days = Some(days);
        self
    }

    /// Analyse `aoi_ids` in order.
    pub async fn run_batch(&self, aoi_ids: &[DbId]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for &aoi_id in aoi_ids {
            let status = match self.runner.run_analysis(aoi_id).await {
                Ok(outcome) => {
                    if let Some(days) = self.report_window_days {
                        if let Err(e) = self.runner.early_warning_report(aoi_id, days).await {
                            tracing::warn!(aoi_id, error = %e, "Early-warning assessment failed");
                        }
                    }
                    AoiRunStatus::Completed {
                        total_area_ha: outcome.detection.total_area_ha,
                        violation_created: outcome.violation.is_some(),
                    }
                }
                Err(e) => {
                    tracing::error!(aoi_id, error = %e, "Analysis run failed");
                    AoiRunStatus::Failed {
                        message: e.to_string(),
                    }
                }
            };
            summary.results.push(AoiRunResult { aoi_id, status });
        }

        tracing::info!(
            completed = summary.completed(),
            failed = summary.failed(),
            "Analysis batch finished"
        );
        summary
    }

    /// Analyse every active AOI once.
    pub async fn run_active(&self) -> Result<BatchSummary, PipelineError> {
        let aoi_ids = self.runner.store().list_active_aois().await?;
        Ok(self.run_batch(&aoi_ids).await)
    }

    /// Run [`run_active`](Self::run_active) every `period` until `cancel`
    /// fires. The first batch starts immediately.
    pub async fn run_periodic(&self, period: Duration, cancel: CancellationToken) {
        tracing::info!(interval_secs = period.as_secs(), "Analysis scheduler started");

        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Analysis scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_active().await {
                        tracing::error!(error = %e, "Failed to list active AOIs");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts() {
        let summary = BatchSummary {
            results: vec![
                AoiRunResult {
                    aoi_id: 1,
                    status: AoiRunStatus::Completed {
                        total_area_ha: 8.2,
                        violation_created: true,
                    },
                },
                AoiRunResult {
                    aoi_id: 2,
                    status: AoiRunStatus::Failed {
                        message: "AOI 2 not found".into(),
                    },
                },
            ],
        };
        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn failed_status_serializes_flat() {
        let result = AoiRunResult {
            aoi_id: 4,
            status: AoiRunStatus::Failed {
                message: "boom".into(),
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["aoi_id"], 4);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "boom");
    }
}
