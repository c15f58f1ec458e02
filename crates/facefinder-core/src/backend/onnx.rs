//! ONNX Runtime backend.
//!
//! Loads a face embedding network (e.g. MobileFaceNet exported to ONNX) from
//! memory-mapped bytes and runs it over NHWC `[N, side, side, 3]` inputs,
//! `u8` for quantized models and `f32` otherwise.
//!
//! The graph's declared input and output are checked against the session
//! settings at load time, so a model that cannot serve the configured
//! precision, side or embedding width never becomes a session.

use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{DynValue, TensorRef, Value, ValueType};

use super::{BackendConfig, BackendLoader, InferenceBackend, OutputTensor};
use crate::encoding::{ByteOrder, EncodedTensor, Precision, CHANNELS};
use crate::error::BackendError;
use crate::resource::MappedModel;

/// [`BackendLoader`] producing [`OrtBackend`] sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtLoader;

impl BackendLoader for OrtLoader {
    fn load(
        &self,
        model: MappedModel,
        config: &BackendConfig,
    ) -> Result<Box<dyn InferenceBackend>, BackendError> {
        Ok(Box::new(OrtBackend::load(&model, config)?))
    }
}

/// Wraps an ONNX Runtime session for face embedding.
pub struct OrtBackend {
    session: Option<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// Decode target for float inputs, sized once for one image.
    scratch: Vec<f32>,
}

impl OrtBackend {
    /// Build a session from compiled model bytes.
    ///
    /// ONNX Runtime copies what it needs during commit, so the map can be
    /// dropped once this returns.
    pub fn load(model: &[u8], config: &BackendConfig) -> Result<Self, BackendError> {
        let session = Session::builder()
            .map_err(|e| BackendError::Load(format!("Failed to create session builder: {e}")))?
            .with_intra_threads(config.num_threads)
            .map_err(|e| BackendError::Load(format!("Failed to set thread count: {e}")))?
            .commit_from_memory(model)
            .map_err(|e| BackendError::Load(format!("Failed to load ONNX model: {e}")))?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| BackendError::Load("Model declares no inputs".to_string()))?;
        let output = session
            .outputs()
            .first()
            .ok_or_else(|| BackendError::Load("Model declares no outputs".to_string()))?;

        check_signature(
            &TensorSignature::from_value_type(input.dtype()),
            &TensorSignature::from_value_type(output.dtype()),
            config,
        )?;

        let input_name = input.name().to_string();
        tracing::debug!(
            "Loaded ONNX face model (input: {:?}, output: {:?}, threads: {})",
            input_name,
            output.name(),
            config.num_threads
        );

        let scratch = match config.precision {
            Precision::Float => {
                let side = config.input_side as usize;
                Vec::with_capacity(side * side * CHANNELS)
            }
            Precision::Quantized => Vec::new(),
        };

        Ok(Self {
            session: Some(session),
            input_name,
            scratch,
        })
    }

    fn batch_value(inputs: &[EncodedTensor<'_>]) -> Result<DynValue, BackendError> {
        let value = match stack_inputs(inputs)? {
            StackedInput::U8 { shape, data } => Value::from_array((shape, data))
                .map(|v| v.into_dyn())
                .map_err(|e| BackendError::Execution(format!("Failed to create input tensor: {e}")))?,
            StackedInput::F32 { shape, data } => Value::from_array((shape, data))
                .map(|v| v.into_dyn())
                .map_err(|e| BackendError::Execution(format!("Failed to create input tensor: {e}")))?,
        };
        Ok(value)
    }
}

impl InferenceBackend for OrtBackend {
    fn name(&self) -> &str {
        "onnxruntime"
    }

    /// ONNX Runtime reads typed `f32` tensors in host order.
    fn expected_byte_order(&self) -> ByteOrder {
        ByteOrder::Native
    }

    fn run(&mut self, input: &EncodedTensor<'_>, output: &mut [f32]) -> Result<(), BackendError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BackendError::Execution("ONNX session already closed".to_string()))?;
        let name = self.input_name.as_str();
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();

        let outputs = match input.precision() {
            Precision::Quantized => {
                let tensor = TensorRef::from_array_view((shape, input.as_bytes()))
                    .map_err(|e| BackendError::Execution(format!("Failed to create input tensor: {e}")))?;
                session.run(ort::inputs![name => tensor])
            }
            Precision::Float => {
                self.scratch.clear();
                input.decode_f32_into(&mut self.scratch);
                let tensor = TensorRef::from_array_view((shape, self.scratch.as_slice()))
                    .map_err(|e| BackendError::Execution(format!("Failed to create input tensor: {e}")))?;
                session.run(ort::inputs![name => tensor])
            }
        }
        .map_err(|e| BackendError::Execution(format!("ONNX inference failed: {e}")))?;

        let (_, embedding) = outputs
            .iter()
            .next()
            .ok_or_else(|| BackendError::Output("Model produced no outputs".to_string()))?;
        let (shape, data) = embedding
            .try_extract_tensor::<f32>()
            .map_err(|e| BackendError::Output(format!("Failed to extract embedding: {e}")))?;

        copy_embedding(shape, data, output)
    }

    fn run_multiple(
        &mut self,
        inputs: &[EncodedTensor<'_>],
        outputs: &mut BTreeMap<usize, OutputTensor>,
    ) -> Result<(), BackendError> {
        let value = Self::batch_value(inputs)?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BackendError::Execution("ONNX session already closed".to_string()))?;

        let results = session
            .run(ort::inputs![self.input_name.as_str() => value])
            .map_err(|e| BackendError::Execution(format!("ONNX batch inference failed: {e}")))?;

        for (index, (name, value)) in results.iter().enumerate() {
            let (shape, data) = value.try_extract_tensor::<f32>().map_err(|e| {
                BackendError::Output(format!("Failed to extract output {name:?}: {e}"))
            })?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            let tensor = ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|e| {
                BackendError::Output(format!("Output {name:?} has inconsistent shape: {e}"))
            })?;
            outputs.insert(index, tensor);
        }

        Ok(())
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("ONNX session released");
        }
    }
}

/// Copy the output row of a single-image run into `output`.
fn copy_embedding(shape: &[i64], data: &[f32], output: &mut [f32]) -> Result<(), BackendError> {
    // Embedding output is [1, width] (or a bare [width]).
    let width = match shape.len() {
        1 => shape[0] as usize,
        2 => shape[1] as usize,
        _ => {
            return Err(BackendError::Output(format!(
                "Unexpected embedding shape: {:?}",
                shape
            )));
        }
    };
    if width != output.len() || data.len() < width {
        return Err(BackendError::Output(format!(
            "Embedding width {} does not match expected {}",
            width,
            output.len()
        )));
    }

    output.copy_from_slice(&data[..width]);
    Ok(())
}

/// Element type and dimensions a graph declares for one tensor.
/// Dynamic dimensions are negative.
#[derive(Debug, Clone, PartialEq)]
struct TensorSignature {
    element: Option<TensorElementType>,
    dims: Vec<i64>,
}

impl TensorSignature {
    fn from_value_type(value_type: &ValueType) -> Self {
        Self {
            element: value_type.tensor_type(),
            dims: value_type
                .tensor_shape()
                .map(|shape| shape.iter().copied().collect())
                .unwrap_or_default(),
        }
    }
}

/// Reject graphs whose first input or output cannot serve `config`.
fn check_signature(
    input: &TensorSignature,
    output: &TensorSignature,
    config: &BackendConfig,
) -> Result<(), BackendError> {
    let element = match config.precision {
        Precision::Quantized => TensorElementType::Uint8,
        Precision::Float => TensorElementType::Float32,
    };
    match input.element {
        Some(declared) if declared == element => {}
        Some(declared) => {
            return Err(BackendError::Load(format!(
                "Model input is {declared:?}, session is configured for {} input",
                config.precision
            )));
        }
        None => return Err(BackendError::Load("Model input is not a tensor".to_string())),
    }

    if !input.dims.is_empty() {
        let side = i64::from(config.input_side);
        let expected = [-1, side, side, CHANNELS as i64];
        let fits = input.dims.len() == expected.len()
            && input
                .dims
                .iter()
                .zip(expected)
                .skip(1)
                .all(|(&declared, want)| declared < 0 || declared == want);
        if !fits {
            return Err(BackendError::Load(format!(
                "Model input shape {:?} does not accept [N, {side}, {side}, {CHANNELS}]",
                input.dims
            )));
        }
    }

    if let Some(&width) = output.dims.last() {
        if width >= 0 && width as usize != config.embedding_width {
            return Err(BackendError::Load(format!(
                "Model output width {width} does not match embedding_width {}",
                config.embedding_width
            )));
        }
    }
    Ok(())
}

/// Input images concatenated into one NHWC batch.
#[derive(Debug, PartialEq)]
enum StackedInput {
    U8 { shape: Vec<i64>, data: Vec<u8> },
    F32 { shape: Vec<i64>, data: Vec<f32> },
}

fn stack_inputs(inputs: &[EncodedTensor<'_>]) -> Result<StackedInput, BackendError> {
    let first = inputs
        .first()
        .ok_or_else(|| BackendError::Execution("No input tensors".to_string()))?;

    if let Some(odd) = inputs
        .iter()
        .find(|t| t.side() != first.side() || t.precision() != first.precision())
    {
        return Err(BackendError::Execution(format!(
            "Mixed inputs in batch: {}px {} vs {}px {}",
            first.side(),
            first.precision(),
            odd.side(),
            odd.precision()
        )));
    }

    let side = first.side() as i64;
    let shape = vec![inputs.len() as i64, side, side, CHANNELS as i64];

    Ok(match first.precision() {
        Precision::Quantized => {
            let mut data = Vec::with_capacity(inputs.len() * first.as_bytes().len());
            for tensor in inputs {
                data.extend_from_slice(tensor.as_bytes());
            }
            StackedInput::U8 { shape, data }
        }
        Precision::Float => {
            let mut data = Vec::with_capacity(inputs.len() * first.as_bytes().len() / 4);
            for tensor in inputs {
                tensor.decode_f32_into(&mut data);
            }
            StackedInput::F32 { shape, data }
        }
    })
}
