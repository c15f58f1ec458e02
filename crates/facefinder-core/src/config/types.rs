//! Sub-configuration structs with defaults for the bundled MobileFaceNet model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classifier::ClassifierOptions;
use crate::encoding::ByteOrder;

/// Model and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the bundled model and label resources
    pub resource_dir: PathBuf,

    /// Compiled model path inside the resource directory
    pub model_path: String,

    /// Label list path inside the resource directory
    pub label_path: String,

    /// Input side in pixels (face crops are resized to side × side)
    pub input_size: u32,

    /// Whether the model takes 8-bit quantized input
    pub quantized: bool,

    /// Backend worker threads per invocation
    pub num_threads: usize,

    /// Byte order of float input values: "native", "little" or "big"
    pub byte_order: ByteOrder,

    /// Length of one embedding vector
    pub embedding_width: usize,

    /// L2-normalize embeddings before returning them
    pub normalize: bool,

    /// Expected BLAKE3 hex digest of the model file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_blake3: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("~/.facefinder/assets"),
            model_path: "asset:///mobile_face_net.onnx".to_string(),
            label_path: "asset:///labelmap.txt".to_string(),
            input_size: 112,
            quantized: false,
            num_threads: 4,
            byte_order: ByteOrder::Native,
            embedding_width: 192,
            normalize: false,
            expected_blake3: None,
        }
    }
}

impl ModelConfig {
    /// Resource directory with `~` expanded.
    pub fn resource_dir(&self) -> PathBuf {
        let path_str = self.resource_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Session options derived from this config.
    pub fn options(&self) -> ClassifierOptions {
        ClassifierOptions {
            input_size: self.input_size,
            quantized: self.quantized,
            num_threads: self.num_threads,
            byte_order: self.byte_order,
            embedding_width: self.embedding_width,
            normalize: self.normalize,
            expected_blake3: self.expected_blake3.clone(),
        }
    }
}

/// Face matching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Euclidean distance below which two faces count as the same person
    pub identical_threshold: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            identical_threshold: 1.0,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
