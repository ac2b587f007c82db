//! Review manifest: the boundary to the external presenter.
//!
//! The pipeline does not render or serve the review page. It writes a typed
//! JSON manifest describing what was processed and which disposition labels
//! are offered, and later consumes the reviewer's selection to build
//! dispatcher input.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CollisionMode, Disposition, DispositionChoice, TransformResult};

/// Reserved disposition label meaning "leave the file where it is".
pub const NO_ACTION_LABEL: &str = "no action";

/// Default manifest file name, written into the output root.
pub const MANIFEST_FILE_NAME: &str = "review.json";

/// Errors reading or writing the manifest.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// The manifest file could not be read or written.
    #[error("Failed to access review manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest contents were not valid JSON.
    #[error("Malformed review manifest {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One reviewable item: a successfully transformed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Manifest-local ordinal, referenced by the reviewer's selection.
    pub id: usize,
    /// Source file path.
    pub source: PathBuf,
    /// Path of the derived artifact shown to the reviewer.
    pub artifact: PathBuf,
    /// Source modification time.
    pub modified: DateTime<Local>,
    /// Capture time parsed from the naming convention, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured: Option<NaiveDateTime>,
}

/// Serializable bundle handed to the external presenter.
///
/// Items are the successes of the transform run, in submission order.
/// Failed items never reach the reviewer; they are reported in the run log
/// and the final tally instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewManifest {
    /// Reviewable items, in submission order.
    pub items: Vec<ReviewItem>,
    /// Disposition labels offered per item, no-action first.
    pub labels: Vec<String>,
    /// Root under which bucket directories are created.
    pub output_root: PathBuf,
    /// Collision handling mode for the subsequent dispatch.
    pub collision_mode: CollisionMode,
    /// Playback speed options offered by the presenter.
    pub speeds: Vec<f64>,
    /// Base URL the review form submits to.
    pub base_url: String,
}

impl ReviewManifest {
    /// Build a manifest from the sorted result stream.
    ///
    /// Only successful results become review items; ids are assigned
    /// densely from 0 in result order.
    pub fn from_results(
        results: &[TransformResult],
        buckets: &[String],
        output_root: &Path,
        collision_mode: CollisionMode,
        speeds: Vec<f64>,
        base_url: String,
    ) -> Self {
        let mut labels = Vec::with_capacity(buckets.len() + 1);
        labels.push(NO_ACTION_LABEL.to_string());
        labels.extend(buckets.iter().cloned());

        let items = results
            .iter()
            .filter_map(|r| {
                r.outcome.as_ref().ok().map(|artifact| (r, artifact))
            })
            .enumerate()
            .map(|(id, (r, artifact))| ReviewItem {
                id,
                source: r.item.path.clone(),
                artifact: artifact.path.clone(),
                modified: r.item.modified,
                captured: r.item.captured,
            })
            .collect();

        Self {
            items,
            labels,
            output_root: output_root.to_path_buf(),
            collision_mode,
            speeds,
            base_url,
        }
    }

    /// Write the manifest as pretty JSON via a temp-file rename.
    pub fn write(&self, path: &Path) -> Result<(), ReviewError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ReviewError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| ReviewError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| ReviewError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::info!("Wrote review manifest: {}", path.display());
        Ok(())
    }

    /// Load a previously written manifest.
    pub fn load(path: &Path) -> Result<Self, ReviewError> {
        let contents = fs::read_to_string(path).map_err(|e| ReviewError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| ReviewError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Look up an item by its manifest id.
    pub fn item(&self, id: usize) -> Option<&ReviewItem> {
        self.items.iter().find(|i| i.id == id)
    }
}

/// The reviewer's submitted selection, keyed by manifest item id.
///
/// Items missing from the map default to no-action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSelection {
    /// Per-item chosen label.
    pub selections: BTreeMap<usize, String>,
}

impl ReviewSelection {
    /// Load a selection file written by the presenter.
    pub fn load(path: &Path) -> Result<Self, ReviewError> {
        let contents = fs::read_to_string(path).map_err(|e| ReviewError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| ReviewError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolve the selection against the manifest into dispatcher input.
    ///
    /// Only labels offered by the manifest are honored: a label outside
    /// `manifest.labels` would otherwise be joined onto the output root by
    /// the dispatcher, so it is logged and treated as no-action, like an
    /// unknown id. Items without a selection get an explicit no-action
    /// choice.
    pub fn into_choices(self, manifest: &ReviewManifest) -> Vec<DispositionChoice> {
        for id in self.selections.keys() {
            if manifest.item(*id).is_none() {
                tracing::warn!("Selection references unknown item id {}", id);
            }
        }

        manifest
            .items
            .iter()
            .map(|item| {
                let disposition = match self.selections.get(&item.id) {
                    Some(label) if manifest.labels.iter().any(|l| l == label) => {
                        Disposition::from_label(label)
                    }
                    Some(label) => {
                        tracing::warn!(
                            "Ignoring label '{}' for item {}: not an offered disposition",
                            label,
                            item.id
                        );
                        Disposition::NoAction
                    }
                    None => Disposition::NoAction,
                };
                DispositionChoice {
                    source: item.source.clone(),
                    disposition,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactKind, DerivedArtifact, MediaItem};
    use tempfile::tempdir;

    fn result_for(dir: &Path, name: &str, seq: usize, ok: bool) -> TransformResult {
        let p = dir.join(name);
        std::fs::write(&p, b"x").unwrap();
        let item = MediaItem::from_path(&p).unwrap();
        let outcome = if ok {
            Ok(DerivedArtifact::new(
                ArtifactKind::Thumbnail,
                p.with_extension("gif"),
                p.clone(),
            ))
        } else {
            Err("probe failed".to_string())
        };
        TransformResult { seq, item, outcome }
    }

    fn buckets() -> Vec<String> {
        ["good", "trash"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn manifest_holds_successes_only_with_dense_ids() {
        let dir = tempdir().unwrap();
        let results = vec![
            result_for(dir.path(), "a.mp4", 0, true),
            result_for(dir.path(), "b.mp4", 1, false),
            result_for(dir.path(), "c.mp4", 2, true),
        ];

        let manifest = ReviewManifest::from_results(
            &results,
            &buckets(),
            dir.path(),
            CollisionMode::Preserve,
            vec![1.0, 2.0],
            "http://127.0.0.1:5000".to_string(),
        );

        assert_eq!(manifest.items.len(), 2);
        assert_eq!(manifest.items[0].id, 0);
        assert_eq!(manifest.items[1].id, 1);
        assert!(manifest.items[1].source.ends_with("c.mp4"));
    }

    #[test]
    fn no_action_label_comes_first() {
        let dir = tempdir().unwrap();
        let manifest = ReviewManifest::from_results(
            &[],
            &buckets(),
            dir.path(),
            CollisionMode::Preserve,
            vec![1.0],
            String::new(),
        );
        assert_eq!(
            manifest.labels,
            vec!["no action".to_string(), "good".to_string(), "trash".to_string()]
        );
    }

    #[test]
    fn manifest_round_trips_through_file() {
        let dir = tempdir().unwrap();
        let results = vec![result_for(dir.path(), "a.mp4", 0, true)];
        let manifest = ReviewManifest::from_results(
            &results,
            &buckets(),
            dir.path(),
            CollisionMode::Replace,
            vec![1.0, 3.0],
            "http://localhost:5000".to_string(),
        );

        let path = dir.path().join(MANIFEST_FILE_NAME);
        manifest.write(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = ReviewManifest::load(&path).unwrap();
        assert_eq!(loaded.items, manifest.items);
        assert_eq!(loaded.collision_mode, CollisionMode::Replace);
        assert_eq!(loaded.labels, manifest.labels);
    }

    #[test]
    fn selection_resolves_to_choices_with_no_action_default() {
        let dir = tempdir().unwrap();
        let results = vec![
            result_for(dir.path(), "a.mp4", 0, true),
            result_for(dir.path(), "b.mp4", 1, true),
            result_for(dir.path(), "c.mp4", 2, true),
        ];
        let manifest = ReviewManifest::from_results(
            &results,
            &buckets(),
            dir.path(),
            CollisionMode::Preserve,
            vec![1.0],
            String::new(),
        );

        let mut selections = BTreeMap::new();
        selections.insert(0, "good".to_string());
        selections.insert(2, NO_ACTION_LABEL.to_string());
        let choices = ReviewSelection { selections }.into_choices(&manifest);

        assert_eq!(choices.len(), 3);
        assert_eq!(choices[0].disposition, Disposition::Bucket("good".to_string()));
        assert_eq!(choices[1].disposition, Disposition::NoAction);
        assert_eq!(choices[2].disposition, Disposition::NoAction);
    }

    #[test]
    fn label_not_offered_by_manifest_is_no_action() {
        let dir = tempdir().unwrap();
        let results = vec![
            result_for(dir.path(), "a.mp4", 0, true),
            result_for(dir.path(), "b.mp4", 1, true),
        ];
        let manifest = ReviewManifest::from_results(
            &results,
            &buckets(),
            dir.path(),
            CollisionMode::Preserve,
            vec![1.0],
            String::new(),
        );

        let mut selections = BTreeMap::new();
        // A path-shaped label must never reach the dispatcher.
        selections.insert(0, "../escaped".to_string());
        selections.insert(1, "excellent".to_string());
        let choices = ReviewSelection { selections }.into_choices(&manifest);

        assert_eq!(choices[0].disposition, Disposition::NoAction);
        assert_eq!(choices[1].disposition, Disposition::NoAction);
    }

    #[test]
    fn unknown_selection_id_is_ignored() {
        let dir = tempdir().unwrap();
        let results = vec![result_for(dir.path(), "a.mp4", 0, true)];
        let manifest = ReviewManifest::from_results(
            &results,
            &buckets(),
            dir.path(),
            CollisionMode::Preserve,
            vec![1.0],
            String::new(),
        );

        let mut selections = BTreeMap::new();
        selections.insert(99, "good".to_string());
        let choices = ReviewSelection { selections }.into_choices(&manifest);

        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].disposition, Disposition::NoAction);
    }

    #[test]
    fn malformed_manifest_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("review.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            ReviewManifest::load(&path),
            Err(ReviewError::Malformed { .. })
        ));
    }
}
