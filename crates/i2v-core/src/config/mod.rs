//! Configuration management for i2v.
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/i2v/config.toml` on Linux) with defaults for the released
//! illustration2vec models.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for i2v.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Model and backend settings
    pub model: ModelConfig,

    /// Estimation defaults
    pub estimate: EstimateConfig,

    /// Input processing settings
    pub processing: ProcessingConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.i2v.i2v/config.toml
    /// - Linux: ~/.config/i2v/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\i2v\config\config.toml
    ///
    /// Falls back to ~/.i2v/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "i2v", "i2v")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".i2v").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Resolve a model-relative filename. Absolute paths and `~` are honored.
    pub fn resolve(&self, file: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(file).into_owned());
        if expanded.is_absolute() {
            expanded
        } else {
            self.model_dir().join(expanded)
        }
    }

    /// Path of the ONNX model.
    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model.model_file)
    }

    /// Path of the JSON tag list.
    pub fn tags_path(&self) -> PathBuf {
        self.resolve(&self.model.tags_file)
    }

    /// Path of the threshold table, if one is configured.
    pub fn threshold_path(&self) -> Option<PathBuf> {
        self.model.threshold_file.as_deref().map(|f| self.resolve(f))
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
