//! Repository layer.
//!
//! Each repository is a zero-sized struct with async query methods. Methods
//! take any `PgExecutor` so the same call works against the pool or inside
//! an analysis run's transaction; multi-statement writes take a
//! `&mut PgConnection` instead.

pub mod alert_subscription_repo;
pub mod analysis_config_repo;
pub mod aoi_repo;
pub mod boundary_repo;
pub mod time_series_repo;
pub mod violation_repo;

pub use alert_subscription_repo::AlertSubscriptionRepo;
pub use analysis_config_repo::AnalysisConfigRepo;
pub use aoi_repo::AoiRepo;
pub use boundary_repo::BoundaryRepo;
pub use time_series_repo::TimeSeriesRepo;
pub use violation_repo::ViolationRepo;
