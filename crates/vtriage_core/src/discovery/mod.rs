//! Candidate file discovery.
//!
//! Walks the input paths (files or directories, one level deep), filters by
//! extension and an optional case-insensitive name pattern, and builds the
//! ordered work list. Missing inputs are per-path errors, never fatal; an
//! empty result is a clean "nothing to do" for the caller.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

use crate::models::MediaItem;

/// Per-path discovery problems. Logged and skipped, never fatal.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// An input path does not exist.
    #[error("Input path does not exist: {0}")]
    Missing(PathBuf),

    /// A path could not be read (metadata or directory listing).
    #[error("Could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The name-match pattern failed to compile.
    #[error("Invalid name-match pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Filter applied to candidate file names.
#[derive(Debug, Clone)]
pub struct DiscoveryFilter {
    /// Target extension, with leading dot. Compared case-insensitively.
    pub extension: String,
    /// Optional case-insensitive name pattern.
    pub name_match: Option<Regex>,
    /// Cap on the result list; truncates in stable discovery order.
    pub max_items: Option<usize>,
}

impl DiscoveryFilter {
    /// Filter by extension only.
    pub fn for_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            name_match: None,
            max_items: None,
        }
    }

    /// Set a name-match pattern. Bare patterns are anchored loosely so
    /// `porch` behaves like `^.*porch.*$`.
    pub fn with_name_match(mut self, pattern: &str) -> Result<Self, DiscoveryError> {
        let anchored = anchor_pattern(pattern);
        let re = regex::RegexBuilder::new(&anchored)
            .case_insensitive(true)
            .build()
            .map_err(|e| DiscoveryError::BadPattern {
                pattern: pattern.to_string(),
                source: e,
            })?;
        self.name_match = Some(re);
        Ok(self)
    }

    /// Cap the number of discovered items.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let want = self.extension.trim_start_matches('.');
                e.eq_ignore_ascii_case(want)
            })
            .unwrap_or(false);

        if !ext_ok {
            return false;
        }

        match &self.name_match {
            Some(re) => re.is_match(name),
            None => true,
        }
    }
}

/// Anchor a bare pattern loosely, the way the name filter is documented.
fn anchor_pattern(pattern: &str) -> String {
    let mut p = pattern.to_string();
    if !p.starts_with('^') {
        p = format!("^.*{}", p);
    }
    if !p.ends_with('$') {
        p.push_str(".*$");
    }
    p
}

/// Result of a discovery pass.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Matching items, in stable discovery order.
    pub items: Vec<MediaItem>,
    /// First input directory seen; used as the `${indir}` output-root default.
    pub first_dir: Option<PathBuf>,
    /// Per-path problems encountered (non-fatal).
    pub errors: Vec<DiscoveryError>,
}

impl Discovered {
    /// Whether discovery found nothing to do.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Discover media items under the given roots.
///
/// Each root is a file or a directory; directories are expanded one level
/// (non-recursive). Duplicates across roots are removed by resolved absolute
/// path, keeping the first occurrence.
pub fn discover(roots: &[PathBuf], filter: &DiscoveryFilter) -> Discovered {
    let mut out = Discovered::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for root in roots {
        if root.is_dir() {
            if out.first_dir.is_none() {
                out.first_dir = Some(root.clone());
            }
            match read_dir_sorted(root) {
                Ok(entries) => {
                    for entry in entries {
                        if entry.is_file() && filter.accepts(&entry) {
                            add_item(&entry, &mut seen, &mut out);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Could not list {}: {}", root.display(), e);
                    out.errors.push(DiscoveryError::Unreadable {
                        path: root.clone(),
                        source: e,
                    });
                }
            }
        } else if root.is_file() {
            if out.first_dir.is_none() {
                out.first_dir = root.parent().map(Path::to_path_buf);
            }
            if filter.accepts(root) {
                add_item(root, &mut seen, &mut out);
            }
        } else {
            tracing::error!("{} does not exist", root.display());
            out.errors.push(DiscoveryError::Missing(root.clone()));
        }
    }

    if let Some(max) = filter.max_items {
        out.items.truncate(max);
    }

    tracing::info!(
        "Discovered {} item(s) ({} path error(s))",
        out.items.len(),
        out.errors.len()
    );

    out
}

/// List a directory's entries in stable (name-sorted) order.
fn read_dir_sorted(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

fn add_item(path: &Path, seen: &mut HashSet<PathBuf>, out: &mut Discovered) {
    // Dedupe on the resolved absolute path so the same file reached through
    // two roots is listed once.
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !seen.insert(key) {
        return;
    }

    match MediaItem::from_path(path) {
        Ok(item) => out.items.push(item),
        Err(e) => {
            tracing::error!("Could not stat {}: {}", path.display(), e);
            out.errors.push(DiscoveryError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            });
        }
    }
}
