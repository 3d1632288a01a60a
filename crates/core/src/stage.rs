//! Per-stage outcome envelope.
//!
//! Analysis stages never panic or bubble numeric failures to the caller.
//! Too few samples and unexpected numeric failures are both ordinary
//! values, so a report can say exactly which stage did not complete.

use serde::Serialize;

use crate::error::CoreError;

/// Result of a single analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    /// The stage ran to completion.
    Complete(T),
    /// The input series was shorter than the stage's minimum.
    InsufficientData { required: usize, found: usize },
    /// An unguarded numeric failure occurred.
    Error { message: String },
}

impl<T> StageOutcome<T> {
    /// Check a sample count before running a stage.
    pub fn require(required: usize, found: usize) -> Option<Self> {
        (found < required).then_some(Self::InsufficientData { required, found })
    }

    /// Convert a fallible computation into an outcome.
    pub fn from_result(result: Result<T, CoreError>) -> Self {
        match result {
            Ok(value) => Self::Complete(value),
            Err(e) => Self::Error {
                message: e.to_string(),
            },
        }
    }

    pub fn complete(&self) -> Option<&T> {
        match self {
            Self::Complete(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Return a `Computation` error when `value` is NaN or infinite.
pub fn ensure_finite(value: f64, what: &str) -> Result<f64, CoreError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::Computation(format!("{what} is not finite ({value})")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
