//! vtriage core - batch video triage pipeline
//!
//! This crate contains all pipeline logic with zero CLI dependencies:
//! discovery of candidate files, a fixed-size worker pool running external
//! transform tools, the review-manifest boundary, and collision-safe
//! disposition of reviewed files into bucket directories.

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod logging;
pub mod models;
pub mod pool;
pub mod probe;
pub mod review;
pub mod run;
pub mod tools;
pub mod transform;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
