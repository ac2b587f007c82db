//! Media items and the artifacts derived from them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

// Capture-time convention used by motion cameras: a `YY-MM-DD` directory
// containing `HH-MM-SS_<camera>.mp4` files.
static CAPTURE_DIR_PAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d\d)-(\d\d)-(\d\d)$").unwrap());
static CAPTURE_FILE_PAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d\d)-(\d\d)-(\d\d)_.+").unwrap());

/// A discovered source video file. Immutable once discovered.
///
/// Identity is the absolute source path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Absolute path to the source file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Modification timestamp.
    pub modified: DateTime<Local>,
    /// Capture timestamp parsed from the directory/file-name convention,
    /// if the names match it.
    pub captured: Option<NaiveDateTime>,
}

impl MediaItem {
    /// Build an item from a path, reading its filesystem metadata.
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let meta = fs::metadata(&path)?;
        let modified = meta.modified().map(DateTime::<Local>::from)?;
        let captured = parse_capture_time(&path);

        Ok(Self {
            path,
            size: meta.len(),
            modified,
            captured,
        })
    }

    /// File stem of the source, used to group co-located derived artifacts.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Parse the capture time from `<dir YY-MM-DD>/<HH-MM-SS_name>.<ext>`.
///
/// Returns `None` unless both the parent directory and the file name match
/// the convention.
pub fn parse_capture_time(path: &Path) -> Option<NaiveDateTime> {
    let dir_name = path.parent()?.file_name()?.to_str()?;
    let file_name = path.file_name()?.to_str()?;

    let d = CAPTURE_DIR_PAT.captures(dir_name)?;
    let f = CAPTURE_FILE_PAT.captures(file_name)?;

    let year = 2000 + d[1].parse::<i32>().ok()?;
    let month = d[2].parse::<u32>().ok()?;
    let day = d[3].parse::<u32>().ok()?;
    let hour = f[1].parse::<u32>().ok()?;
    let min = f[2].parse::<u32>().ok()?;
    let sec = f[3].parse::<u32>().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, min, sec)
}

/// Kind of file a transform produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Re-encoded video with audio gain applied.
    NormalizedVideo,
    /// Short animated preview.
    Thumbnail,
}

/// A file produced by a transform from one [`MediaItem`].
///
/// Holds a back-reference to the source path only, not ownership of the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedArtifact {
    /// What kind of artifact this is.
    pub kind: ArtifactKind,
    /// Path to the produced file.
    pub path: PathBuf,
    /// Source file the artifact was derived from.
    pub source: PathBuf,
}

impl DerivedArtifact {
    /// Create an artifact record.
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            source: source.into(),
        }
    }
}
