//! Data model shared across the pipeline.

mod disposition;
mod items;
mod messages;

pub use disposition::{CollisionMode, Disposition, DispositionChoice};
pub use items::{ArtifactKind, DerivedArtifact, MediaItem};
pub use messages::{ResultMessage, TransformResult, WorkItem, WorkMessage};
