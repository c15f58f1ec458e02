//! Face embedding session.
//!
//! A [`FaceClassifier`] owns everything one model needs: the backend handle,
//! the label list, and two buffers allocated once at construction (the
//! encoding buffer and a pixel scratch array). Every recognition call refills
//! those buffers in place, so calls take `&mut self` and a session serves one
//! caller at a time. Use one session per worker, or wrap it in a `Mutex`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use facefinder_core::{Bitmap, ClassifierOptions, DirResourceStore, FaceClassifier, OrtLoader};
//!
//! let store = DirResourceStore::new("/opt/facefinder/assets");
//! let mut classifier = FaceClassifier::create(
//!     &store,
//!     "asset:///mobile_face_net.onnx",
//!     "asset:///labelmap.txt",
//!     ClassifierOptions::new(112, false),
//!     &OrtLoader,
//! )?;
//! let embedding = classifier.recognize(&face_bitmap)?;
//! // embedding is a Vec<f32> with 192 elements
//! classifier.close();
//! ```

use std::collections::BTreeMap;

use crate::backend::{BackendConfig, BackendLoader, InferenceBackend, OrtLoader, OutputTensor};
use crate::bitmap::Bitmap;
use crate::config::ModelConfig;
use crate::encoding::{encode, ByteOrder, EncodedTensor, EncodingBuffer, Precision};
use crate::error::{BackendError, EncodingError, LoadError, RecognitionError, RecognitionResult};
use crate::labels::LabelSet;
use crate::math::l2_normalize_in_place;
use crate::resource::{DirResourceStore, ResourceStore};

/// Settings fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOptions {
    /// Input side in pixels
    pub input_size: u32,
    /// Whether the model takes 8-bit quantized input
    pub quantized: bool,
    /// Backend worker threads per invocation
    pub num_threads: usize,
    /// Byte order of float input values
    pub byte_order: ByteOrder,
    /// Length of one embedding vector
    pub embedding_width: usize,
    /// L2-normalize returned embeddings
    pub normalize: bool,
    /// Expected BLAKE3 hex digest of the model bytes
    pub expected_blake3: Option<String>,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
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

impl ClassifierOptions {
    pub fn new(input_size: u32, quantized: bool) -> Self {
        Self {
            input_size,
            quantized,
            ..Self::default()
        }
    }

    pub fn precision(&self) -> Precision {
        Precision::from_quantized(self.quantized)
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.input_size == 0 {
            return Err(LoadError::InvalidOptions("input_size must be > 0".into()));
        }
        if self.num_threads == 0 {
            return Err(LoadError::InvalidOptions("num_threads must be > 0".into()));
        }
        if self.embedding_width == 0 {
            return Err(LoadError::InvalidOptions(
                "embedding_width must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            num_threads: self.num_threads,
            byte_order: self.byte_order,
            input_side: self.input_size,
            precision: self.precision(),
            embedding_width: self.embedding_width,
        }
    }
}

/// Session extracting face embeddings with a pretrained network.
pub struct FaceClassifier {
    options: ClassifierOptions,
    labels: LabelSet,
    buffer: EncodingBuffer,
    pixels: Box<[u32]>,
    backend: Option<Box<dyn InferenceBackend>>,
}

impl FaceClassifier {
    /// Load the model and labels and allocate the session buffers.
    ///
    /// Resource paths may carry a scheme prefix (`asset:///`). Any failure
    /// is fatal: no partially initialized session is returned.
    pub fn create(
        store: &dyn ResourceStore,
        model_path: &str,
        label_path: &str,
        options: ClassifierOptions,
        loader: &dyn BackendLoader,
    ) -> Result<Self, LoadError> {
        options.validate()?;

        let labels = LabelSet::load(store, label_path)?;

        let model_location = store.locate(model_path);
        let model_error = |message: String| LoadError::Model {
            path: model_location.clone(),
            message,
        };

        let mapped = store
            .open_region(model_path)
            .and_then(|region| region.map())
            .map_err(|e| model_error(e.to_string()))?;

        if let Some(expected) = &options.expected_blake3 {
            let actual = blake3::hash(&mapped).to_hex();
            if !actual.as_str().eq_ignore_ascii_case(expected) {
                return Err(model_error(format!(
                    "Checksum mismatch: expected {expected}, got {actual}"
                )));
            }
        }

        tracing::info!(
            "Loading face model from {:?} ({} bytes, {} threads)",
            model_location,
            mapped.len(),
            options.num_threads
        );
        let backend_config = options.backend_config();
        let mut backend = loader
            .load(mapped, &backend_config)
            .map_err(|e| model_error(e.to_string()))?;

        // Quantized inputs are single bytes, so only float sessions care.
        let expected = backend.expected_byte_order();
        if !options.precision().is_quantized() && !options.byte_order.matches(expected) {
            backend.close();
            return Err(LoadError::ByteOrderMismatch {
                configured: options.byte_order.resolve().name(),
                expected: expected.resolve().name(),
            });
        }

        let side = options.input_size;
        let buffer = EncodingBuffer::new(side, options.precision(), options.byte_order);
        let pixels = vec![0u32; side as usize * side as usize].into_boxed_slice();

        tracing::debug!(
            "Allocated {} byte {} encoding buffer for {}x{} input",
            buffer.capacity(),
            options.precision(),
            side,
            side
        );
        tracing::info!(
            "Face model ready on {} ({} labels, {}-d embeddings)",
            backend.name(),
            labels.len(),
            options.embedding_width
        );

        Ok(Self {
            options,
            labels,
            buffer,
            pixels,
            backend: Some(backend),
        })
    }

    /// Build a session from configuration using the ONNX Runtime backend.
    pub fn from_config(config: &ModelConfig) -> Result<Self, LoadError> {
        let store = DirResourceStore::new(config.resource_dir());
        Self::create(
            &store,
            &config.model_path,
            &config.label_path,
            config.options(),
            &OrtLoader,
        )
    }

    pub fn input_size(&self) -> u32 {
        self.options.input_size
    }

    pub fn precision(&self) -> Precision {
        self.options.precision()
    }

    pub fn embedding_width(&self) -> usize {
        self.options.embedding_width
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    /// Extract the embedding of one `side × side` face bitmap.
    ///
    /// Failures are logged and returned; the session stays usable.
    pub fn recognize(&mut self, bitmap: &Bitmap) -> RecognitionResult<Vec<f32>> {
        let result = self.try_recognize(bitmap);
        if let Err(e) = &result {
            tracing::warn!("Face embedding failed: {e}");
        }
        result
    }

    /// Encode every bitmap into its own input slot and run them in one
    /// backend invocation. Returns the backend's outputs by tensor index.
    ///
    /// An empty slice yields an empty map without touching the backend.
    pub fn recognize_multiple(
        &mut self,
        bitmaps: &[Bitmap],
    ) -> RecognitionResult<BTreeMap<usize, OutputTensor>> {
        let result = self.try_recognize_multiple(bitmaps);
        if let Err(e) = &result {
            tracing::warn!("Batched face embedding of {} images failed: {e}", bitmaps.len());
        }
        result
    }

    /// Batched extraction split into one embedding per input bitmap.
    ///
    /// Expects output 0 shaped `[N, embedding_width]`.
    pub fn recognize_batch(&mut self, bitmaps: &[Bitmap]) -> RecognitionResult<Vec<Vec<f32>>> {
        let mut outputs = self.recognize_multiple(bitmaps)?;
        if bitmaps.is_empty() {
            return Ok(vec![]);
        }

        let width = self.options.embedding_width;
        let embeddings = outputs
            .remove(&0)
            .ok_or_else(|| BackendError::Output("Batch produced no output 0".to_string()))
            .and_then(|tensor| split_rows(&tensor, bitmaps.len(), width));

        match embeddings {
            Ok(mut rows) => {
                if self.options.normalize {
                    rows.iter_mut().for_each(|row| l2_normalize_in_place(row));
                }
                Ok(rows)
            }
            Err(e) => {
                tracing::warn!("Batched face embedding returned bad output: {e}");
                Err(e.into())
            }
        }
    }

    /// Release the backend. Later recognition calls fail with
    /// [`RecognitionError::Closed`]; calling `close` again does nothing.
    pub fn close(&mut self) {
        match self.backend.take() {
            Some(mut backend) => {
                backend.close();
                tracing::debug!("Face classifier closed");
            }
            None => tracing::debug!("Face classifier already closed"),
        }
    }

    fn try_recognize(&mut self, bitmap: &Bitmap) -> RecognitionResult<Vec<f32>> {
        let backend = self.backend.as_mut().ok_or(RecognitionError::Closed)?;
        fill(&mut self.buffer, &mut self.pixels, bitmap)?;

        let mut embedding = vec![0.0f32; self.options.embedding_width];
        backend.run(&EncodedTensor::borrowed(&self.buffer), &mut embedding)?;

        if self.options.normalize {
            l2_normalize_in_place(&mut embedding);
        }
        Ok(embedding)
    }

    fn try_recognize_multiple(
        &mut self,
        bitmaps: &[Bitmap],
    ) -> RecognitionResult<BTreeMap<usize, OutputTensor>> {
        let backend = self.backend.as_mut().ok_or(RecognitionError::Closed)?;
        let mut outputs = BTreeMap::new();
        if bitmaps.is_empty() {
            return Ok(outputs);
        }

        // The shared buffer is rewritten per bitmap; each slot keeps a copy.
        let mut inputs = Vec::with_capacity(bitmaps.len());
        for bitmap in bitmaps {
            fill(&mut self.buffer, &mut self.pixels, bitmap)?;
            inputs.push(EncodedTensor::borrowed(&self.buffer).into_owned());
        }

        backend.run_multiple(&inputs, &mut outputs)?;
        tracing::debug!(
            "Batch of {} images produced {} output tensors",
            bitmaps.len(),
            outputs.len()
        );
        Ok(outputs)
    }
}

impl Drop for FaceClassifier {
    fn drop(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.close();
        }
    }
}

impl std::fmt::Debug for FaceClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceClassifier")
            .field("options", &self.options)
            .field("labels", &self.labels.len())
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

/// Copy a bitmap into the scratch array and encode it into the buffer.
fn fill(
    buffer: &mut EncodingBuffer,
    scratch: &mut [u32],
    bitmap: &Bitmap,
) -> Result<(), EncodingError> {
    let side = buffer.side();
    if bitmap.width() != side || bitmap.height() != side {
        return Err(EncodingError::Dimensions {
            expected: side,
            width: bitmap.width(),
            height: bitmap.height(),
        });
    }
    bitmap.get_pixels(scratch)?;
    encode(buffer, scratch)
}

fn split_rows(
    tensor: &OutputTensor,
    rows: usize,
    width: usize,
) -> Result<Vec<Vec<f32>>, BackendError> {
    if tensor.shape() != [rows, width].as_slice() {
        return Err(BackendError::Output(format!(
            "Expected batch output [{rows}, {width}], got {:?}",
            tensor.shape()
        )));
    }
    Ok(tensor
        .outer_iter()
        .map(|row| row.iter().copied().collect())
        .collect())
}
