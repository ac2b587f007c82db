//! Animated thumbnail extraction.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{ArtifactKind, DerivedArtifact, MediaItem};
use crate::tools::ToolRunner;

use super::{Transform, TransformError};

/// Generate a short animated preview beside the source.
///
/// Idempotent: if the destination already exists the stage is skipped and
/// treated as success, so repeated runs over the same directory avoid
/// redundant work.
pub struct ThumbnailTransform {
    runner: Arc<dyn ToolRunner>,
}

impl ThumbnailTransform {
    /// Create a thumbnail stage with the given tool runner.
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }
}

/// Thumbnail destination: `<stem>-thumb.gif` in the source's directory.
pub fn thumbnail_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    source.with_file_name(format!("{}-thumb.gif", stem))
}

impl Transform for ThumbnailTransform {
    fn name(&self) -> &str {
        "thumbnail"
    }

    fn apply(&self, item: &MediaItem) -> Result<DerivedArtifact, TransformError> {
        let dest = thumbnail_path(&item.path);

        if dest.exists() {
            tracing::debug!("Thumbnail already exists, skipping: {}", dest.display());
            return Ok(DerivedArtifact::new(
                ArtifactKind::Thumbnail,
                dest,
                item.path.clone(),
            ));
        }

        let args: Vec<OsString> = vec![
            item.path.as_os_str().to_owned(),
            dest.as_os_str().to_owned(),
        ];

        tracing::debug!("{}", crate::tools::display_command("movie2gif", &args));
        let output = self
            .runner
            .run("movie2gif", &args)
            .map_err(|e| TransformError::Launch {
                tool: "movie2gif".to_string(),
                source: e,
            })?;

        if !output.success {
            return Err(TransformError::ToolFailed {
                tool: "movie2gif".to_string(),
                exit_code: output.exit_code,
                path: item.path.clone(),
            });
        }

        Ok(DerivedArtifact::new(
            ArtifactKind::Thumbnail,
            dest,
            item.path.clone(),
        ))
    }
}
