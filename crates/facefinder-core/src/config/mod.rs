//! Configuration management for FaceFinder.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for FaceFinder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model and session settings
    pub model: ModelConfig,

    /// Face matching settings
    pub matching: MatchingConfig,

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
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.facefinder.facefinder/config.toml
    /// - Linux: ~/.config/facefinder/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\facefinder\config\config.toml
    ///
    /// Falls back to ~/.facefinder/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "facefinder", "facefinder")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".facefinder").join("config.toml")
            })
    }

    /// Get the resolved resource directory path (with ~ expansion).
    pub fn resource_dir(&self) -> PathBuf {
        self.model.resource_dir()
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::ByteOrder;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.input_size, 112);
        assert!(!config.model.quantized);
        assert_eq!(config.model.num_threads, 4);
        assert_eq!(config.model.embedding_width, 192);
        assert_eq!(config.matching.identical_threshold, 1.0);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[model]"));
        assert!(toml.contains("[matching]"));
        assert!(toml.contains("byte_order = \"native\""));
        assert!(!toml.contains("expected_blake3"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [model]
            input_size = 160
            quantized = true
            byte_order = "little"
            "#,
        )
        .unwrap();
        assert_eq!(config.model.input_size, 160);
        assert!(config.model.quantized);
        assert_eq!(config.model.byte_order, ByteOrder::Little);
        assert_eq!(config.model.num_threads, 4);
        assert_eq!(config.output.format, "json");
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let err = Config::from_toml("[model]\nnum_threads = 0\n").unwrap_err();
        assert!(err.to_string().contains("num_threads"));

        let err = Config::from_toml("[model]\nbyte_order = \"middle\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[matching]\nidentical_threshold = 0.8\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!((config.matching.identical_threshold - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_model_options_mirror_config() {
        let mut config = Config::default();
        config.model.quantized = true;
        config.model.input_size = 160;
        let options = config.model.options();
        assert!(options.quantized);
        assert_eq!(options.input_size, 160);
        assert_eq!(options.num_threads, 4);
    }
}
