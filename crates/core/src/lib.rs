//! Excavation detection and early-warning analytics engine.
//!
//! Every module in this crate is pure: callers fetch pixel scenes and stored
//! history, pass them in, and persist whatever comes back. The stages run in
//! the order the modules are listed:
//!
//! - [`spectral`] turns a pixel sample set into cloud-adjusted statistics.
//! - [`detection`] cross-validates two anomaly methods and splits area by zone.
//! - [`violation`] thresholds no-go area, assigns severity, deduplicates.
//! - [`temporal`] smooths stored history and derives rate and trend.
//! - [`early_warning`] combines proximity, spectral shift, rate and trend
//!   into a composite risk score and a predictive alert.
//! - [`report`] composes the temporal and early-warning reports.

pub mod analysis_config;
pub mod anomaly;
pub mod breakpoints;
pub mod detection;
pub mod early_warning;
pub mod error;
pub mod history;
pub mod report;
pub mod spectral;
pub mod stage;
pub mod temporal;
pub mod types;
pub mod violation;
