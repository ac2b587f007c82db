//! Disposition dispatch: collision-safe moves into bucket directories.
//!
//! For each bucketed choice, every co-located file sharing the source's stem
//! (the normalized video, the thumbnail, the original) moves together into
//! `<output_root>/<bucket>/`. Per-file failures are recorded and the run
//! continues; there is no rollback across a stem group.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{CollisionMode, Disposition, DispositionChoice};

/// Per-file dispatch problems. Recorded, never abort the remaining moves.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A bucket directory could not be created.
    #[error("Could not create bucket directory {path}: {source}")]
    BucketUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file could not be moved to its destination.
    #[error("Could not move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The source directory could not be listed for stem siblings.
    #[error("Could not list {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One completed move, for the action log and the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// File that was moved.
    pub file: PathBuf,
    /// Where it landed.
    pub destination: PathBuf,
    /// Bucket label.
    pub bucket: String,
    /// A same-named destination file was deleted first (replace mode).
    pub replaced: bool,
    /// The destination got a `-<n>` suffix (preserve mode).
    pub renamed: bool,
}

/// Outcome of a dispatch pass.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Every completed move.
    pub actions: Vec<ActionRecord>,
    /// Items dispatched per bucket (one per choice, not per file).
    pub counts: BTreeMap<String, usize>,
    /// Per-file problems encountered.
    pub errors: Vec<DispatchError>,
}

impl DispatchReport {
    /// Total number of files moved.
    pub fn moved_files(&self) -> usize {
        self.actions.len()
    }
}

/// Moves reviewed items into their chosen buckets.
pub struct Dispatcher {
    output_root: PathBuf,
    mode: CollisionMode,
}

impl Dispatcher {
    /// Create a dispatcher rooted at `output_root`.
    pub fn new(output_root: impl Into<PathBuf>, mode: CollisionMode) -> Self {
        Self {
            output_root: output_root.into(),
            mode,
        }
    }

    /// Apply every choice. No-action choices leave their files untouched.
    pub fn dispatch_all(&self, choices: &[DispositionChoice]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for choice in choices {
            let bucket = match &choice.disposition {
                Disposition::NoAction => continue,
                Disposition::Bucket(label) => label,
            };

            let bucket_dir = self.output_root.join(bucket);
            if let Err(e) = fs::create_dir_all(&bucket_dir) {
                report.errors.push(DispatchError::BucketUnwritable {
                    path: bucket_dir.clone(),
                    source: e,
                });
                continue;
            }

            let group = match stem_group(&choice.source) {
                Ok(files) => files,
                Err(e) => {
                    report.errors.push(e);
                    continue;
                }
            };

            let mut moved_any = false;
            for file in group {
                match self.move_one(&file, &bucket_dir, bucket) {
                    Ok(action) => {
                        tracing::info!(
                            "Moved {} -> {}",
                            action.file.display(),
                            action.destination.display()
                        );
                        report.actions.push(action);
                        moved_any = true;
                    }
                    Err(e) => {
                        tracing::error!("{}", e);
                        report.errors.push(e);
                    }
                }
            }

            if moved_any {
                *report.counts.entry(bucket.clone()).or_insert(0) += 1;
            }
        }

        report
    }

    fn move_one(
        &self,
        file: &Path,
        bucket_dir: &Path,
        bucket: &str,
    ) -> Result<ActionRecord, DispatchError> {
        let name = file
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("unnamed"));
        let naive_dest = bucket_dir.join(&name);

        let (dest, replaced, renamed) = if naive_dest.exists() {
            match self.mode {
                CollisionMode::Replace => {
                    fs::remove_file(&naive_dest).map_err(|e| DispatchError::MoveFailed {
                        from: file.to_path_buf(),
                        to: naive_dest.clone(),
                        source: e,
                    })?;
                    tracing::warn!("Overwrote {}", naive_dest.display());
                    (naive_dest, true, false)
                }
                CollisionMode::Preserve => (next_free_name(&naive_dest), false, true),
            }
        } else {
            (naive_dest, false, false)
        };

        move_file(file, &dest).map_err(|e| DispatchError::MoveFailed {
            from: file.to_path_buf(),
            to: dest.clone(),
            source: e,
        })?;

        Ok(ActionRecord {
            file: file.to_path_buf(),
            destination: dest,
            bucket: bucket.to_string(),
            replaced,
            renamed,
        })
    }
}

/// All files in the source's directory sharing its stem, source included.
///
/// Matches on equal file stem, so `clip.mp4` groups with `clip.gif` but not
/// with `clip-thumb.gif`; derived artifacts with suffixed stems form their
/// own groups and move with their own choice.
fn stem_group(source: &Path) -> Result<Vec<PathBuf>, DispatchError> {
    let Some(stem) = source.file_stem().map(|s| s.to_owned()) else {
        return Ok(vec![source.to_path_buf()]);
    };
    let Some(dir) = source.parent() else {
        return Ok(vec![source.to_path_buf()]);
    };

    let entries = fs::read_dir(dir).map_err(|e| DispatchError::Unreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut group: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_stem() == Some(stem.as_os_str()))
        .collect();
    group.sort();
    Ok(group)
}

/// First non-colliding `<stem>-<n>.<ext>` beside `dest`.
fn next_free_name(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = dest.extension().map(|e| e.to_string_lossy().to_string());

    for n in 1.. {
        let name = match &ext {
            Some(ext) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", stem, n),
        };
        let candidate = dest.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

/// Rename, falling back to copy+remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
