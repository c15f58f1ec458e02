//! Inference backend abstraction.
//!
//! The classifier never talks to an engine directly. A [`BackendLoader`] turns
//! a memory-mapped compiled model into a boxed [`InferenceBackend`], which runs
//! the graph over encoded input tensors. [`OrtLoader`] is the ONNX Runtime
//! implementation; tests plug in stubs.

mod onnx;

pub use onnx::{OrtBackend, OrtLoader};

use std::collections::BTreeMap;

use ndarray::ArrayD;

use crate::encoding::{ByteOrder, EncodedTensor, Precision};
use crate::error::BackendError;
use crate::resource::MappedModel;

/// Dense float output tensor, keyed by output index in batched calls.
pub type OutputTensor = ArrayD<f32>;

/// Settings fixed once per session and handed to the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Intra-op worker threads for a single invocation
    pub num_threads: usize,
    /// Byte order of multi-byte values in encoded inputs
    pub byte_order: ByteOrder,
    /// Input side in pixels
    pub input_side: u32,
    /// Input precision
    pub precision: Precision,
    /// Length of one embedding row
    pub embedding_width: usize,
}

/// Engine that executes a compiled model graph.
///
/// Implementations are driven by one caller at a time (`&mut self`) but may
/// parallelize a single invocation internally.
pub trait InferenceBackend: Send {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Byte order this backend reads multi-byte input values in.
    fn expected_byte_order(&self) -> ByteOrder {
        ByteOrder::Native
    }

    /// Run one input and write the single output row into `output`.
    fn run(&mut self, input: &EncodedTensor<'_>, output: &mut [f32]) -> Result<(), BackendError>;

    /// Run all `inputs` in one invocation and fill `outputs` by output index.
    fn run_multiple(
        &mut self,
        inputs: &[EncodedTensor<'_>],
        outputs: &mut BTreeMap<usize, OutputTensor>,
    ) -> Result<(), BackendError>;

    /// Release engine resources. Called at most once.
    fn close(&mut self) {}
}

/// Builds a backend from a compiled model.
pub trait BackendLoader {
    fn load(
        &self,
        model: MappedModel,
        config: &BackendConfig,
    ) -> Result<Box<dyn InferenceBackend>, BackendError>;
}
