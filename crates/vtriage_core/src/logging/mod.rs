//! Run-scoped logging.
//!
//! The run logger is an explicit handle threaded through the pipeline via
//! the run context; there is no global mutable logging state in this crate.
//! (Library diagnostics additionally go through `tracing`.)

mod run_logger;
mod types;

pub use run_logger::RunLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};
