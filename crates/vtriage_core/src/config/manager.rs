//! Config manager for loading, validating, and saving settings.
//!
//! Configuration problems are the only fatal error class: the run aborts
//! before any work starts. Writes are atomic (temp file, then rename).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::settings::{Settings, OUTPUT_ROOT_INDIR};

/// Errors that can occur during config operations. All are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages the application configuration file.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Changes are only in memory until `save()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file. Errors if the file does not exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        self.validate()?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if it doesn't exist.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            self.load()
        } else {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            self.settings = Settings::default();
            self.save()?;
            tracing::info!("Created default config at {}", self.config_path.display());
            Ok(())
        }
    }

    /// Persist the current settings atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = toml::to_string_pretty(&self.settings)?;
        let temp_path = self.config_path.with_extension("toml.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }

    /// Create the directories the configuration refers to.
    ///
    /// The config file's parent always; the output root and its logs folder
    /// only when the root is a concrete path (the `${indir}` placeholder is
    /// resolved per run, so those directories are created by the run itself).
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if self.settings.paths.output_root != OUTPUT_ROOT_INDIR {
            let root = PathBuf::from(&self.settings.paths.output_root);
            fs::create_dir_all(root.join(&self.settings.paths.logs_folder))?;
        }
        Ok(())
    }

    /// Validate the loaded settings. Violations abort the run.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.settings.pool.worker_count == 0 {
            return Err(ConfigError::Invalid(
                "pool.worker_count must be at least 1".to_string(),
            ));
        }
        if self.settings.dispatch.buckets.is_empty() {
            return Err(ConfigError::Invalid(
                "dispatch.buckets must not be empty".to_string(),
            ));
        }
        if let Err(e) = self.settings.dispatch.collision_mode() {
            return Err(ConfigError::Invalid(e));
        }
        if self.settings.paths.output_root.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "paths.output_root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
