//! Audio peak-level probing via an external analysis invocation.
//!
//! The tool's diagnostic text is an unstable wire format; the parser is a
//! fixed pattern behind a narrow trait so it can be swapped or mocked in
//! tests without invoking the real tool.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::tools::ToolRunner;

// Matches e.g. "[Parsed_volumedetect_0 @ ...] max_volume: -12.3 dB".
static MAX_VOLUME_PAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"max_volume: -([\d.]+) dB").unwrap());

/// Errors from probing one file. Always per-item, never pool-fatal.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The analysis tool could not be launched.
    #[error("Failed to run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The analysis tool exited non-zero.
    #[error("{tool} failed with exit code {exit_code} probing {path}")]
    Tool {
        tool: String,
        exit_code: i32,
        path: PathBuf,
    },

    /// The tool ran but its output contained no volume value.
    #[error("Could not find max volume in tool output for {0}")]
    VolumeNotFound(PathBuf),
}

/// Measures how far below full scale a file's audio peaks.
pub trait VolumeProbe: Send + Sync {
    /// Peak deficit in dB below full scale (a positive number; boosting by
    /// exactly this amount maximizes volume without clipping).
    fn max_volume_deficit_db(&self, source: &Path) -> Result<f64, ProbeError>;
}

/// Probe using ffmpeg's `volumedetect` audio filter.
pub struct FfmpegVolumeProbe {
    runner: Arc<dyn ToolRunner>,
}

impl FfmpegVolumeProbe {
    /// Create a probe backed by the given tool runner.
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }
}

impl VolumeProbe for FfmpegVolumeProbe {
    fn max_volume_deficit_db(&self, source: &Path) -> Result<f64, ProbeError> {
        let args: Vec<OsString> = vec![
            "-i".into(),
            source.as_os_str().to_owned(),
            "-filter:a".into(),
            "volumedetect".into(),
            "-f".into(),
            "null".into(),
            "/dev/null".into(),
        ];

        tracing::debug!("Probing volume: {}", source.display());

        let output = self
            .runner
            .run("ffmpeg", &args)
            .map_err(|e| ProbeError::Launch {
                tool: "ffmpeg".to_string(),
                source: e,
            })?;

        if !output.success {
            return Err(ProbeError::Tool {
                tool: "ffmpeg".to_string(),
                exit_code: output.exit_code,
                path: source.to_path_buf(),
            });
        }

        // volumedetect reports on the error stream
        parse_max_volume(&output.stderr)
            .ok_or_else(|| ProbeError::VolumeNotFound(source.to_path_buf()))
    }
}

/// Extract the max-volume deficit from the tool's diagnostic text.
///
/// Looks for `max_volume: -<float> dB` and returns the float.
pub fn parse_max_volume(diagnostics: &str) -> Option<f64> {
    for line in diagnostics.lines() {
        if let Some(caps) = MAX_VOLUME_PAT.captures(line) {
            if let Ok(v) = caps[1].parse::<f64>() {
                return Some(v);
            }
        }
    }
    None
}
