//! Audio-normalizing re-encode.
//!
//! Probes the source for its peak-volume deficit, then re-encodes with a
//! gain of exactly that deficit so the result peaks at full scale.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{ArtifactKind, DerivedArtifact, MediaItem};
use crate::probe::VolumeProbe;
use crate::tools::ToolRunner;

use super::{Transform, TransformError};

/// Re-encode to MP4 with the measured gain applied.
pub struct NormalizeTransform {
    probe: Arc<dyn VolumeProbe>,
    runner: Arc<dyn ToolRunner>,
}

impl NormalizeTransform {
    /// Create a normalize stage with the given probe and tool runner.
    pub fn new(probe: Arc<dyn VolumeProbe>, runner: Arc<dyn ToolRunner>) -> Self {
        Self { probe, runner }
    }
}

/// Output path for the normalized re-encode: `<stem>.mp4` beside the source,
/// or `<stem>-norm.mp4` when the source is already an .mp4 (never overwrite
/// the input).
pub fn normalized_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let source_is_mp4 = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false);

    let name = if source_is_mp4 {
        format!("{}-norm.mp4", stem)
    } else {
        format!("{}.mp4", stem)
    };

    source.with_file_name(name)
}

impl Transform for NormalizeTransform {
    fn name(&self) -> &str {
        "normalize"
    }

    fn apply(&self, item: &MediaItem) -> Result<DerivedArtifact, TransformError> {
        let deficit = self.probe.max_volume_deficit_db(&item.path)?;
        let dest = normalized_path(&item.path);

        tracing::info!(
            "{}: input max volume = -{:.1} dB, boosting by {:.1} dB",
            item.path.display(),
            deficit,
            deficit
        );

        let args: Vec<OsString> = vec![
            "-i".into(),
            item.path.as_os_str().to_owned(),
            "-filter:a".into(),
            format!("volume={:.1}dB", deficit).into(),
            dest.as_os_str().to_owned(),
        ];

        tracing::debug!("{}", crate::tools::display_command("ffmpeg", &args));
        let output = self
            .runner
            .run("ffmpeg", &args)
            .map_err(|e| TransformError::Launch {
                tool: "ffmpeg".to_string(),
                source: e,
            })?;

        if !output.success {
            return Err(TransformError::ToolFailed {
                tool: "ffmpeg".to_string(),
                exit_code: output.exit_code,
                path: item.path.clone(),
            });
        }

        Ok(DerivedArtifact::new(
            ArtifactKind::NormalizedVideo,
            dest,
            item.path.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;
    use crate::transform::test_support::MockRunner;
    use tempfile::tempdir;

    struct FixedProbe(Result<f64, ()>);

    impl VolumeProbe for FixedProbe {
        fn max_volume_deficit_db(&self, source: &Path) -> Result<f64, ProbeError> {
            self.0
                .map_err(|_| ProbeError::VolumeNotFound(source.to_path_buf()))
        }
    }

    fn item_in(dir: &Path, name: &str) -> MediaItem {
        let p = dir.join(name);
        std::fs::write(&p, b"video").unwrap();
        MediaItem::from_path(&p).unwrap()
    }

    #[test]
    fn output_path_converts_extension() {
        assert_eq!(
            normalized_path(Path::new("/v/clip.AVI")),
            PathBuf::from("/v/clip.mp4")
        );
        assert_eq!(
            normalized_path(Path::new("/v/clip.mp4")),
            PathBuf::from("/v/clip-norm.mp4")
        );
    }

    #[test]
    fn applies_measured_gain() {
        let dir = tempdir().unwrap();
        let item = item_in(dir.path(), "clip.avi");

        let runner = Arc::new(MockRunner::succeeding(false));
        let runner_dyn: Arc<dyn ToolRunner> = runner.clone();
        let transform = NormalizeTransform::new(Arc::new(FixedProbe(Ok(12.3))), runner_dyn);

        let artifact = transform.apply(&item).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::NormalizedVideo);
        assert!(artifact.path.ends_with("clip.mp4"));

        let calls = runner.calls.lock();
        assert_eq!(calls.len(), 1);
        let args = &calls[0].1;
        assert!(args.iter().any(|a| a == "volume=12.3dB"));
    }

    #[test]
    fn probe_failure_is_per_item() {
        let dir = tempdir().unwrap();
        let item = item_in(dir.path(), "clip.avi");

        let runner = Arc::new(MockRunner::succeeding(false));
        let runner_dyn: Arc<dyn ToolRunner> = runner.clone();
        let transform = NormalizeTransform::new(Arc::new(FixedProbe(Err(()))), runner_dyn);

        let err = transform.apply(&item).unwrap_err();
        assert!(matches!(err, TransformError::Probe(_)));
        // Re-encode never attempted
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn tool_failure_is_reported() {
        let dir = tempdir().unwrap();
        let item = item_in(dir.path(), "clip.avi");

        let runner = Arc::new(MockRunner::failing(1));
        let runner_dyn: Arc<dyn ToolRunner> = runner.clone();
        let transform = NormalizeTransform::new(Arc::new(FixedProbe(Ok(3.0))), runner_dyn);

        let err = transform.apply(&item).unwrap_err();
        assert!(matches!(err, TransformError::ToolFailed { exit_code: 1, .. }));
    }
}
