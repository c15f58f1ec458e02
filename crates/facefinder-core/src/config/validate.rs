//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.model.input_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.input_size must be > 0".into(),
            ));
        }
        if self.model.num_threads == 0 {
            return Err(ConfigError::ValidationError(
                "model.num_threads must be > 0".into(),
            ));
        }
        if self.model.embedding_width == 0 {
            return Err(ConfigError::ValidationError(
                "model.embedding_width must be > 0".into(),
            ));
        }
        if self.model.model_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.model_path must not be empty".into(),
            ));
        }
        if self.model.label_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.label_path must not be empty".into(),
            ));
        }
        if let Some(hash) = &self.model.expected_blake3 {
            if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::ValidationError(
                    "model.expected_blake3 must be a 64-character hex digest".into(),
                ));
            }
        }
        let threshold = self.matching.identical_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::ValidationError(
                "matching.identical_threshold must be a finite value >= 0".into(),
            ));
        }
        if !matches!(self.output.format.as_str(), "json" | "jsonl") {
            return Err(ConfigError::ValidationError(
                "output.format must be \"json\" or \"jsonl\"".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}
