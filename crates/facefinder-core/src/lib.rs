//! FaceFinder Core - Embeddable face embedding library.
//!
//! FaceFinder turns a cropped face bitmap into a fixed-length embedding
//! vector using a MobileFaceNet-style model. Two embeddings of the same
//! person are close in Euclidean distance.
//!
//! # Architecture
//!
//! A session is a self-contained pipeline with no shared global state:
//!
//! ```text
//! Bitmap (ARGB) → Encode (NHWC, u8 or f32) → Backend (ONNX Runtime) → Embedding
//! ```
//!
//! Model and label files come from a [`ResourceStore`]; the model is
//! memory-mapped read-only and handed to a [`backend::BackendLoader`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use facefinder_core::{Bitmap, Config, FaceClassifier};
//!
//! fn main() -> facefinder_core::Result<()> {
//!     let config = Config::load()?;
//!     let mut classifier = FaceClassifier::from_config(&config.model)?;
//!
//!     let image = image::open("face.jpg").map_err(std::io::Error::other)?;
//!     let bitmap = Bitmap::from_image_resized(&image, classifier.input_size());
//!     let embedding = classifier.recognize(&bitmap)?;
//!     println!("{} dimensions", embedding.len());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod backend;
pub mod bitmap;
pub mod classifier;
pub mod config;
pub mod encoding;
pub mod error;
pub mod grouping;
pub mod labels;
pub mod math;
pub mod output;
pub mod resource;
pub mod types;

// Re-exports for convenient access
pub use backend::{InferenceBackend, OrtLoader};
pub use bitmap::{Bitmap, FaceRect};
pub use classifier::{ClassifierOptions, FaceClassifier};
pub use config::Config;
pub use encoding::{ByteOrder, Precision};
pub use error::{
    BackendError, ConfigError, EncodingError, FaceFinderError, GroupingError, LoadError,
    RecognitionError, RecognitionResult, Result,
};
pub use grouping::{group_faces, PersonGroup};
pub use labels::LabelSet;
pub use output::{read_records, OutputFormat, OutputWriter};
pub use resource::{DirResourceStore, ResourceStore};
pub use types::{ExtractionStats, FaceComparison, FaceEmbedding};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
