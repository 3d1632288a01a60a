//! Periodic analysis worker.

pub mod config;
