//! Orchestration around the analytics engine.
//!
//! The [`runner::AnalysisRunner`] fetches a scene from a
//! [`source::SatelliteSource`], runs the core stages, and commits the run's
//! writes through an [`store::AnalysisStore`] as one unit. Runs for the same
//! AOI are serialized by [`locks::AoiLocks`]; the [`batch::BatchScheduler`]
//! walks all active AOIs without letting one failure stop the rest.

pub mod batch;
pub mod error;
pub mod locks;
pub mod runner;
pub mod source;
pub mod store;

pub use error::PipelineError;
