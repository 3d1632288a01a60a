//! Satellite image source and the fetch policy around it.
//!
//! A [`SatelliteSource`] returns one pixel scene for an AOI and time window.
//! [`SceneFetcher`] wraps a source with a per-attempt timeout, a bounded
//! number of attempts, and (unless disabled) a fall back to the
//! [`SyntheticSource`] grid. Synthetic scenes are always marked as such.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aurora_core::spectral::{CloudCover, PixelSample};
use aurora_core::types::{DbId, Timestamp};
use serde::Serialize;

/// Side length of the synthetic pixel grid.
pub const SYNTHETIC_GRID_SIZE: usize = 100;

const SYNTHETIC_NDVI_BASE: f64 = 0.5;
const SYNTHETIC_NDVI_STEP: f64 = 0.01;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Observed,
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct SceneRequest {
    pub aoi_id: DbId,
    pub start: Timestamp,
    pub end: Timestamp,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub pixels: Vec<PixelSample>,
    pub cloud: CloudCover,
    pub origin: DataOrigin,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Satellite source timed out after {0:?}")]
    Timeout(Duration),

    #[error("Satellite source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SatelliteSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn fetch_scene(&self, request: &SceneRequest) -> Result<Scene, SourceError>;
}

// ---------------------------------------------------------------------------
// SyntheticSource
// ---------------------------------------------------------------------------

/// A 100x100 grid whose NDVI rises by 0.01 per row, starting at 0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticSource;

impl SyntheticSource {
    pub fn scene() -> Scene {
        let pixels = (0..SYNTHETIC_GRID_SIZE)
            .flat_map(|x| {
                (0..SYNTHETIC_GRID_SIZE).map(move |y| {
                    PixelSample::new(
                        x * SYNTHETIC_GRID_SIZE + y,
                        SYNTHETIC_NDVI_BASE + SYNTHETIC_NDVI_STEP * x as f64,
                    )
                })
            })
            .collect();
        Scene {
            pixels,
            cloud: CloudCover::Assumed,
            origin: DataOrigin::Synthetic,
        }
    }
}

#[async_trait]
impl SatelliteSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch_scene(&self, _request: &SceneRequest) -> Result<Scene, SourceError> {
        Ok(Self::scene())
    }
}

// ---------------------------------------------------------------------------
// SceneFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts; values below 1 are treated as 1.
    pub max_attempts: u32,
    pub timeout: Duration,
    /// Pause between failed attempts.
    pub backoff: Duration,
    /// Serve a synthetic scene once every attempt has failed.
    pub synthetic_fallback: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(300),
            backoff: Duration::from_secs(2),
            synthetic_fallback: true,
        }
    }
}

pub struct SceneFetcher {
    source: Arc<dyn SatelliteSource>,
    policy: RetryPolicy,
}

impl SceneFetcher {
    pub fn new(source: Arc<dyn SatelliteSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub async fn fetch(&self, request: &SceneRequest) -> Result<Scene, SourceError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_err = SourceError::Unavailable("no attempt made".into());

        for attempt in 1..=attempts {
            let result = tokio::time::timeout(self.policy.timeout, self.source.fetch_scene(request))
                .await
                .unwrap_or(Err(SourceError::Timeout(self.policy.timeout)));

            match result {
                Ok(scene) => {
                    tracing::debug!(
                        aoi_id = request.aoi_id,
                        source = self.source.name(),
                        attempt,
                        pixels = scene.pixels.len(),
                        "Scene fetched"
                    );
                    return Ok(scene);
                }
                Err(e) => {
                    tracing::warn!(
                        aoi_id = request.aoi_id,
                        source = self.source.name(),
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Scene fetch attempt failed"
                    );
                    last_err = e;
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        if self.policy.synthetic_fallback {
            tracing::warn!(
                aoi_id = request.aoi_id,
                source = self.source.name(),
                "All scene fetch attempts failed, using synthetic scene"
            );
            return Ok(SyntheticSource::scene());
        }
        Err(last_err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    /// Fails the first `failures` calls, then returns an observed scene.
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
        hang: bool,
    }

    impl FlakySource {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                hang: false,
            }
        }
    }

    #[async_trait]
    impl SatelliteSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch_scene(&self, _request: &SceneRequest) -> Result<Scene, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            if call < self.failures {
                return Err(SourceError::Unavailable(format!("call {call}")));
            }
            Ok(Scene {
                pixels: vec![PixelSample::new(0, 0.3)],
                cloud: CloudCover::Observed(0.1),
                origin: DataOrigin::Observed,
            })
        }
    }

    fn request() -> SceneRequest {
        let now = Utc::now();
        SceneRequest {
            aoi_id: 1,
            start: now - chrono::Duration::days(30),
            end: now,
        }
    }

    fn policy(max_attempts: u32, synthetic_fallback: bool) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            timeout: Duration::from_millis(50),
            backoff: Duration::ZERO,
            synthetic_fallback,
        }
    }

    // -- synthetic grid ---

    #[test]
    fn synthetic_grid_shape() {
        let scene = SyntheticSource::scene();
        assert_eq!(scene.pixels.len(), 10_000);
        assert_eq!(scene.origin, DataOrigin::Synthetic);
        assert_eq!(scene.pixels[0].ndvi, 0.5);
        assert!((scene.pixels[9_999].ndvi - 1.49).abs() < 1e-9);
        // Same row, same NDVI.
        assert_eq!(scene.pixels[100].ndvi, scene.pixels[199].ndvi);
    }

    // -- retries ---

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let source = Arc::new(FlakySource::new(2));
        let fetcher = SceneFetcher::new(source.clone(), policy(3, false));
        let scene = fetcher.fetch(&request()).await.unwrap();
        assert_eq!(scene.origin, DataOrigin::Observed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let source = Arc::new(FlakySource::new(10));
        let fetcher = SceneFetcher::new(source.clone(), policy(3, false));
        let err = fetcher.fetch(&request()).await.unwrap_err();
        assert_matches!(err, SourceError::Unavailable(_));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn falls_back_to_synthetic_scene() {
        let fetcher = SceneFetcher::new(Arc::new(FlakySource::new(10)), policy(2, true));
        let scene = fetcher.fetch(&request()).await.unwrap();
        assert_eq!(scene.origin, DataOrigin::Synthetic);
        assert_eq!(scene.pixels.len(), 10_000);
    }

    #[tokio::test]
    async fn hung_source_times_out() {
        let mut source = FlakySource::new(0);
        source.hang = true;
        let fetcher = SceneFetcher::new(Arc::new(source), policy(1, false));
        let err = fetcher.fetch(&request()).await.unwrap_err();
        assert_matches!(err, SourceError::Timeout(_));
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let source = Arc::new(FlakySource::new(0));
        let fetcher = SceneFetcher::new(source.clone(), policy(0, false));
        assert!(fetcher.fetch(&request()).await.is_ok());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
