//! Entity structs and DTOs.
//!
//! Each submodule holds a `FromRow` + `Serialize` entity matching the table
//! row and, where rows are created from outside the pipeline, a
//! `Deserialize` create DTO.

pub mod alert_subscription;
pub mod analysis_config;
pub mod aoi;
pub mod boundary;
pub mod time_series;
pub mod violation;
