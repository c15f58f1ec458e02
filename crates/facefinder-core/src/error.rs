//! Error types for FaceFinder.
//!
//! Load-time errors are fatal to session construction. Per-call errors
//! ([`RecognitionError`]) are returned to the caller and leave the session usable.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for FaceFinder operations.
#[derive(Error, Debug)]
pub enum FaceFinderError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session construction errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Per-call recognition errors
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// Embedding grouping errors
    #[error("Grouping error: {0}")]
    Grouping(#[from] GroupingError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while constructing a classifier session.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Model resource missing, unmappable, or rejected by the backend
    #[error("Failed to load model {path}: {message}")]
    Model { path: PathBuf, message: String },

    /// Label resource missing or unreadable
    #[error("Failed to load labels {path}: {message}")]
    Labels { path: PathBuf, message: String },

    /// Configured byte order disagrees with the backend's expectation
    #[error("Byte order mismatch: configured {configured}, backend expects {expected}")]
    ByteOrderMismatch {
        configured: &'static str,
        expected: &'static str,
    },

    /// Session options are out of range
    #[error("Invalid classifier options: {0}")]
    InvalidOptions(String),
}

/// Errors raised while turning pixels into an input tensor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Pixel array length differs from side × side
    #[error("Pixel count mismatch: expected {expected}, got {actual}")]
    PixelCount { expected: usize, actual: usize },

    /// Bitmap dimensions differ from the model input side
    #[error("Bitmap is {width}x{height}, model expects {expected}x{expected}")]
    Dimensions {
        expected: u32,
        width: u32,
        height: u32,
    },

    /// Write past the end of the encoding buffer
    #[error("Encoding buffer overflow (capacity {capacity} bytes)")]
    BufferOverflow { capacity: usize },
}

/// Errors reported by an inference backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The compiled model could not be loaded
    #[error("Backend failed to load model: {0}")]
    Load(String),

    /// Graph execution failed
    #[error("Backend execution failed: {0}")]
    Execution(String),

    /// Output tensor was missing or had an unexpected shape
    #[error("Backend produced unexpected output: {0}")]
    Output(String),
}

/// Errors from grouping embeddings into persons.
#[derive(Error, Debug)]
pub enum GroupingError {
    /// The distance threshold is not a positive finite number
    #[error("Invalid grouping threshold: {0}")]
    InvalidThreshold(f32),

    /// An embedding has a different width from the first one
    #[error("Embedding {index} ({file}) has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        file: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors from a single recognition call.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The input bitmap could not be encoded
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The backend failed while running the graph
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The session was closed before this call
    #[error("Classifier session is closed")]
    Closed,
}

/// Convenience type alias for FaceFinder results.
pub type Result<T> = std::result::Result<T, FaceFinderError>;

/// Convenience type alias for recognition results.
pub type RecognitionResult<T> = std::result::Result<T, RecognitionError>;
