use aurora_core::error::CoreError;
use aurora_core::types::DbId;

use crate::source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Satellite source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("AOI {0} not found")]
    AoiNotFound(DbId),

    #[error("No unresolved violation event with id {0}")]
    ViolationNotFound(DbId),
}
