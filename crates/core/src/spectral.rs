//! Spectral preprocessing of a per-pixel sample set.
//!
//! Produces cloud-adjusted NDVI statistics, proxy NBR/NDWI means and the
//! suspicious-pixel counts the detector cross-validates against. Pure: no
//! I/O, and an empty sample set yields neutral defaults instead of an error.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Cloud fraction assumed when no scene classification is available.
pub const FALLBACK_CLOUD_FRACTION: f64 = 0.02;

/// Scenes with fewer cloud pixels than this share of the total are `Good`.
pub const GOOD_QUALITY_CLOUD_SHARE: f64 = 0.05;

/// Added to MAD before dividing so a zero spread cannot divide by zero.
pub const MAD_EPSILON: f64 = 1e-6;

/// Pixels below this NDVI are sparse vegetation or bare soil.
pub const SPARSE_NDVI_CEILING: f64 = 0.4;

/// Deviation score above which a pixel is anomalous.
pub const DEVIATION_THRESHOLD: f64 = 2.0;

/// Deviation score above which an anomalous pixel is high-confidence.
pub const HIGH_CONFIDENCE_DEVIATION: f64 = 3.0;

/// NDVI statistics reported for an empty sample set.
pub const NEUTRAL_NDVI: f64 = 0.5;
/// MAD reported for an empty sample set.
pub const NEUTRAL_MAD: f64 = 0.1;
/// NBR mean reported for an empty sample set.
pub const NEUTRAL_NBR: f64 = 0.2;

/// Offset of the NBR proxy: `nbr = ndvi - NBR_PROXY_OFFSET`.
pub const NBR_PROXY_OFFSET: f64 = 0.3;

/// Green reflectance stand-in used by the NDWI proxy.
pub const NDWI_PROXY_GREEN: f64 = 0.6;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Raw surface reflectance bands, when the source provides them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralBands {
    pub green: f64,
    pub red: f64,
    pub nir: f64,
    pub swir2: f64,
}

/// One spectral observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelSample {
    /// Row-major location index within the scene grid.
    pub index: usize,
    pub ndvi: f64,
    /// Carried through for audit; index math uses the NDVI proxies.
    pub bands: Option<SpectralBands>,
}

impl PixelSample {
    pub fn new(index: usize, ndvi: f64) -> Self {
        Self {
            index,
            ndvi,
            bands: None,
        }
    }
}

/// How the scene's cloud cover is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fraction", rename_all = "snake_case")]
pub enum CloudCover {
    /// Fraction reported by a real cloud classification, in `[0, 1]`.
    Observed(f64),
    /// No classification available; [`FALLBACK_CLOUD_FRACTION`] applies.
    Assumed,
}

impl CloudCover {
    pub fn fraction(self) -> f64 {
        match self {
            CloudCover::Observed(f) if f.is_finite() => f.clamp(0.0, 1.0),
            CloudCover::Observed(_) | CloudCover::Assumed => FALLBACK_CLOUD_FRACTION,
        }
    }
}

// ---------------------------------------------------------------------------
// DataQuality
// ---------------------------------------------------------------------------

/// Preprocessing quality flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataQuality {
    Good,
    Fair,
}

impl DataQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            DataQuality::Good => "GOOD",
            DataQuality::Fair => "FAIR",
        }
    }
}

/// `Good` iff `cloud_pixels < 0.05 * total_pixels`.
pub fn classify_quality(cloud_pixels: usize, total_pixels: usize) -> DataQuality {
    if (cloud_pixels as f64) < GOOD_QUALITY_CLOUD_SHARE * total_pixels as f64 {
        DataQuality::Good
    } else {
        DataQuality::Fair
    }
}

// ---------------------------------------------------------------------------
// PreprocessStats
// ---------------------------------------------------------------------------

/// Aggregate statistics for one scene.
///
/// `masked_pixels == original_pixels - cloud_pixels` and
/// `suspicious_pixels <= masked_pixels` hold for every value produced by
/// [`preprocess`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessStats {
    pub original_pixels: usize,
    pub masked_pixels: usize,
    pub cloud_pixels: usize,
    pub ndvi_mean: f64,
    pub ndvi_median: f64,
    pub ndvi_std: f64,
    pub ndvi_mad: f64,
    pub ndvi_min: f64,
    pub ndvi_max: f64,
    pub nbr_mean: f64,
    pub ndwi_mean: f64,
    pub suspicious_pixels: usize,
    pub high_confidence_pixels: usize,
    pub quality: DataQuality,
}

impl PreprocessStats {
    /// Cloud pixels as a share of all pixels.
    pub fn cloud_fraction(&self) -> f64 {
        if self.original_pixels == 0 {
            0.0
        } else {
            self.cloud_pixels as f64 / self.original_pixels as f64
        }
    }

    /// Suspicious pixels as a share of the retained (masked) pixels.
    pub fn suspicious_fraction(&self) -> f64 {
        if self.masked_pixels == 0 {
            0.0
        } else {
            self.suspicious_pixels as f64 / self.masked_pixels as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Lower median of an ascending slice (`sorted[(n - 1) / 2]`).
///
/// Returns `None` for an empty slice.
pub fn lower_median(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        None
    } else {
        Some(sorted[(sorted.len() - 1) / 2])
    }
}

/// Median absolute deviation around `median`, using the lower median.
pub fn median_absolute_deviation(values: &[f64], median: f64) -> Option<f64> {
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    lower_median(&deviations)
}

/// Robust anomaly score: `|ndvi - median| / (mad + ε)`.
pub fn deviation_score(ndvi: f64, median: f64, mad: f64) -> f64 {
    (ndvi - median).abs() / (mad + MAD_EPSILON)
}

/// Proxy Normalized Burn Ratio derived from NDVI.
pub fn nbr_proxy(ndvi: f64) -> f64 {
    ndvi - NBR_PROXY_OFFSET
}

/// Proxy Normalized Difference Water Index derived from NDVI.
///
/// Returns `0.0` where the denominator vanishes (`ndvi == -0.6`).
pub fn ndwi_proxy(ndvi: f64) -> f64 {
    let denominator = NDWI_PROXY_GREEN + ndvi;
    if denominator.abs() < MAD_EPSILON {
        0.0
    } else {
        (NDWI_PROXY_GREEN - ndvi) / denominator
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// ---------------------------------------------------------------------------
// preprocess
// ---------------------------------------------------------------------------

/// Compute [`PreprocessStats`] for a pixel sample set.
///
/// Cloud pixels are `floor(n * cloud.fraction())`. A pixel is suspicious iff
/// `ndvi < 0.4` and its deviation score exceeds 2.0; high-confidence iff the
/// score also exceeds 3.0.
pub fn preprocess(pixels: &[PixelSample], cloud: CloudCover) -> PreprocessStats {
    let n = pixels.len();
    let cloud_pixels = ((n as f64 * cloud.fraction()).floor() as usize).min(n);
    let masked_pixels = n - cloud_pixels;
    let quality = classify_quality(cloud_pixels, n);

    if n == 0 {
        return PreprocessStats {
            original_pixels: 0,
            masked_pixels: 0,
            cloud_pixels: 0,
            ndvi_mean: NEUTRAL_NDVI,
            ndvi_median: NEUTRAL_NDVI,
            ndvi_std: 0.0,
            ndvi_mad: NEUTRAL_MAD,
            ndvi_min: NEUTRAL_NDVI,
            ndvi_max: NEUTRAL_NDVI,
            nbr_mean: NEUTRAL_NBR,
            ndwi_mean: 0.0,
            suspicious_pixels: 0,
            high_confidence_pixels: 0,
            quality,
        };
    }

    let ndvi: Vec<f64> = pixels.iter().map(|p| p.ndvi).collect();
    let ndvi_mean = mean(&ndvi);
    let variance = ndvi.iter().map(|x| (x - ndvi_mean).powi(2)).sum::<f64>() / n as f64;

    let mut sorted = ndvi.clone();
    sorted.sort_by(f64::total_cmp);
    let ndvi_median = lower_median(&sorted).unwrap_or(NEUTRAL_NDVI);
    let ndvi_mad = median_absolute_deviation(&ndvi, ndvi_median).unwrap_or(NEUTRAL_MAD);

    let nbr_mean = ndvi.iter().map(|&v| nbr_proxy(v)).sum::<f64>() / n as f64;
    let ndwi_mean = ndvi.iter().map(|&v| ndwi_proxy(v)).sum::<f64>() / n as f64;

    let mut suspicious_pixels = 0usize;
    let mut high_confidence_pixels = 0usize;
    for &v in &ndvi {
        let score = deviation_score(v, ndvi_median, ndvi_mad);
        if v < SPARSE_NDVI_CEILING && score > DEVIATION_THRESHOLD {
            suspicious_pixels += 1;
            if score > HIGH_CONFIDENCE_DEVIATION {
                high_confidence_pixels += 1;
            }
        }
    }

    PreprocessStats {
        original_pixels: n,
        masked_pixels,
        cloud_pixels,
        ndvi_mean,
        ndvi_median,
        ndvi_std: variance.sqrt(),
        ndvi_mad,
        ndvi_min: sorted[0],
        ndvi_max: sorted[n - 1],
        nbr_mean,
        ndwi_mean,
        // Every pixel is scored, cloud or not, so cap at the retained count.
        suspicious_pixels: suspicious_pixels.min(masked_pixels),
        high_confidence_pixels: high_confidence_pixels.min(masked_pixels),
        quality,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
