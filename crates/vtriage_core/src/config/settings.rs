//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a serde default so a partial config file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::CollisionMode;

/// Placeholder output root meaning "first input directory seen".
pub const OUTPUT_ROOT_INDIR: &str = "${indir}";

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Worker pool settings.
    #[serde(default)]
    pub pool: PoolSettings,

    /// File discovery settings.
    #[serde(default)]
    pub discovery: DiscoverySettings,

    /// Disposition dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Review presenter boundary settings.
    #[serde(default)]
    pub review: ReviewSettings,
}

impl Settings {
    /// Resolve the configured output root against the first input directory.
    ///
    /// The `${indir}` placeholder (the default) resolves to `first_input_dir`.
    pub fn resolve_output_root(&self, first_input_dir: &Path) -> PathBuf {
        if self.paths.output_root == OUTPUT_ROOT_INDIR {
            first_input_dir.to_path_buf()
        } else {
            PathBuf::from(&self.paths.output_root)
        }
    }
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root under which bucket directories are created.
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_root() -> String {
    OUTPUT_ROOT_INDIR.to_string()
}

fn default_logs_folder() -> String {
    ".vtriage_logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Number of parallel transform workers (>= 1).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_worker_count() -> usize {
    6
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
        }
    }
}

/// File discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Target file extension, with leading dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Cap on items per run; truncates in stable discovery order.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_extension() -> String {
    ".mp4".to_string()
}

fn default_max_items() -> usize {
    30
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            max_items: default_max_items(),
        }
    }
}

/// Disposition dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Bucket labels, in presentation order.
    #[serde(default = "default_buckets")]
    pub buckets: Vec<String>,

    /// Collision handling mode ("preserve" or "replace").
    #[serde(default = "default_collision_mode")]
    pub collision_mode: String,
}

fn default_buckets() -> Vec<String> {
    ["good", "fair", "other", "trash"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_collision_mode() -> String {
    CollisionMode::Preserve.to_string()
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
            collision_mode: default_collision_mode(),
        }
    }
}

impl DispatchSettings {
    /// Parse the configured collision mode.
    pub fn collision_mode(&self) -> Result<CollisionMode, String> {
        self.collision_mode.parse()
    }
}

/// Review presenter boundary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// Playback speed options offered to the reviewer.
    #[serde(default = "default_speeds")]
    pub speeds: Vec<f64>,

    /// Base URL the review form submits to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_speeds() -> Vec<f64> {
    vec![1.0, 2.0, 3.0, 5.0]
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            speeds: default_speeds(),
            base_url: default_base_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.pool.worker_count, 6);
        assert_eq!(s.discovery.extension, ".mp4");
        assert_eq!(s.dispatch.buckets.len(), 4);
        assert_eq!(s.dispatch.collision_mode().unwrap(), CollisionMode::Preserve);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let s: Settings = toml::from_str(
            r#"
            [pool]
            worker_count = 2
            "#,
        )
        .unwrap();
        assert_eq!(s.pool.worker_count, 2);
        assert_eq!(s.discovery.max_items, 30);
    }

    #[test]
    fn output_root_placeholder_resolves_to_input_dir() {
        let s = Settings::default();
        assert_eq!(
            s.resolve_output_root(Path::new("/videos/in")),
            PathBuf::from("/videos/in")
        );

        let mut s = Settings::default();
        s.paths.output_root = "/sorted".to_string();
        assert_eq!(
            s.resolve_output_root(Path::new("/videos/in")),
            PathBuf::from("/sorted")
        );
    }
}
