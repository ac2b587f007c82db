//! Queue message types for the worker pool.
//!
//! End-of-stream is a typed variant rather than a magic value, so the
//! at-most-once termination contract is visible in the type system.

use serde::{Deserialize, Serialize};

use super::items::{DerivedArtifact, MediaItem};

/// Envelope carrying one item through the work queue.
///
/// `seq` is the submission ordinal; consumption order across workers is not
/// guaranteed, so downstream consumers re-sort by it.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Submission ordinal, starting at 0.
    pub seq: usize,
    /// The item to transform.
    pub item: MediaItem,
}

/// Message on the work queue.
#[derive(Debug, Clone)]
pub enum WorkMessage {
    /// An item to process.
    Item(WorkItem),
    /// Terminal marker; each worker consumes exactly one and stops.
    EndOfStream,
}

/// Outcome of transforming one item.
///
/// A failed transform is carried as a per-item reason, never as a
/// pool-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformResult {
    /// Submission ordinal of the work item.
    pub seq: usize,
    /// The source item.
    pub item: MediaItem,
    /// Produced artifact, or the reason the item failed.
    pub outcome: Result<DerivedArtifact, String>,
}

impl TransformResult {
    /// Whether the transform succeeded.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The artifact path, if the transform succeeded.
    pub fn artifact_path(&self) -> Option<&std::path::Path> {
        self.outcome.as_ref().ok().map(|a| a.path.as_path())
    }
}

/// Message on the result queue.
#[derive(Debug, Clone)]
pub enum ResultMessage {
    /// One item's result (success or per-item failure).
    Item(TransformResult),
    /// Terminal marker; posted exactly once after all workers finish.
    EndOfStream,
}
