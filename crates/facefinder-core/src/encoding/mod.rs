//! Pixel-to-tensor encoding.
//!
//! Face crops arrive as packed ARGB bitmaps. Before inference they are written
//! into a fixed-capacity [`EncodingBuffer`] in the layout the model expects:
//! - Tensor layout: NHWC `[1, side, side, 3]`, row-major, channel-interleaved
//! - Channel order: RGB (alpha dropped)
//! - Quantized models: one raw `u8` per channel
//! - Float models: one `f32` per channel, normalized via `(c - 128) / 128`

mod buffer;
mod encoder;

pub use buffer::EncodingBuffer;
pub use encoder::{channels, encode, normalize, IMAGE_MEAN, IMAGE_STD};

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Number of color channels written per pixel (RGB).
pub const CHANNELS: usize = 3;

/// Numeric precision of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 8-bit quantized input, raw channel bytes
    Quantized,
    /// 32-bit float input, normalized channels
    Float,
}

impl Precision {
    /// Map the usual `is_quantized` flag onto a precision.
    pub fn from_quantized(quantized: bool) -> Self {
        if quantized {
            Self::Quantized
        } else {
            Self::Float
        }
    }

    /// Bytes written per channel value.
    pub fn bytes_per_channel(self) -> usize {
        match self {
            Self::Quantized => 1,
            Self::Float => 4,
        }
    }

    pub fn is_quantized(self) -> bool {
        matches!(self, Self::Quantized)
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::Quantized => write!(f, "quantized"),
            Precision::Float => write!(f, "float"),
        }
    }
}

/// Byte order used for multi-byte (float) channel values.
///
/// `Native` follows the host; it is resolved to `Little` or `Big` before any
/// comparison against what a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    /// Resolve `Native` to the host's concrete byte order.
    pub fn resolve(self) -> Self {
        match self {
            Self::Native if cfg!(target_endian = "big") => Self::Big,
            Self::Native => Self::Little,
            other => other,
        }
    }

    /// Whether two orders produce identical bytes on this host.
    pub fn matches(self, other: Self) -> bool {
        self.resolve() == other.resolve()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Little => "little",
            Self::Big => "big",
        }
    }

    pub fn f32_to_bytes(self, value: f32) -> [u8; 4] {
        match self.resolve() {
            Self::Big => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        }
    }

    pub fn f32_from_bytes(self, bytes: [u8; 4]) -> f32 {
        match self.resolve() {
            Self::Big => f32::from_be_bytes(bytes),
            _ => f32::from_le_bytes(bytes),
        }
    }
}

/// Total encoded size in bytes of one `side × side` image.
pub fn tensor_len(side: u32, precision: Precision) -> usize {
    let side = side as usize;
    side * side * CHANNELS * precision.bytes_per_channel()
}

/// One encoded input image as handed to an inference backend.
///
/// Single-image calls borrow straight from the shared [`EncodingBuffer`].
/// Batched calls must hold one owned copy per image, since the shared buffer
/// is rewritten for every bitmap in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTensor<'a> {
    data: Cow<'a, [u8]>,
    side: u32,
    precision: Precision,
    byte_order: ByteOrder,
}

impl<'a> EncodedTensor<'a> {
    /// Borrow the current contents of a filled encoding buffer.
    pub fn borrowed(buffer: &'a EncodingBuffer) -> Self {
        Self {
            data: Cow::Borrowed(buffer.as_bytes()),
            side: buffer.side(),
            precision: buffer.precision(),
            byte_order: buffer.byte_order(),
        }
    }

    /// Detach from the shared buffer by copying its bytes.
    pub fn into_owned(self) -> EncodedTensor<'static> {
        EncodedTensor {
            data: Cow::Owned(self.data.into_owned()),
            side: self.side,
            precision: self.precision,
            byte_order: self.byte_order,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// NHWC shape of a single image: `[1, side, side, 3]`.
    pub fn shape(&self) -> [usize; 4] {
        let side = self.side as usize;
        [1, side, side, CHANNELS]
    }

    /// Append the float channel values to `dst`, decoded with this tensor's
    /// byte order. Returns `false` (leaving `dst` untouched) for quantized
    /// tensors.
    pub fn decode_f32_into(&self, dst: &mut Vec<f32>) -> bool {
        if self.precision.is_quantized() {
            return false;
        }
        dst.extend(
            self.data
                .chunks_exact(4)
                .map(|b| self.byte_order.f32_from_bytes([b[0], b[1], b[2], b[3]])),
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_len() {
        assert_eq!(tensor_len(112, Precision::Float), 112 * 112 * 3 * 4);
        assert_eq!(tensor_len(160, Precision::Quantized), 160 * 160 * 3);
    }

    #[test]
    fn test_native_resolves_to_host_order() {
        let resolved = ByteOrder::Native.resolve();
        if cfg!(target_endian = "big") {
            assert_eq!(resolved, ByteOrder::Big);
        } else {
            assert_eq!(resolved, ByteOrder::Little);
        }
        assert!(ByteOrder::Native.matches(resolved));
        assert!(!ByteOrder::Little.matches(ByteOrder::Big));
    }

    #[test]
    fn test_f32_bytes_follow_order() {
        assert_eq!(ByteOrder::Big.f32_to_bytes(1.0), [0x3f, 0x80, 0x00, 0x00]);
        assert_eq!(ByteOrder::Little.f32_to_bytes(1.0), [0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(ByteOrder::Big.f32_from_bytes([0x3f, 0x80, 0x00, 0x00]), 1.0);
    }

    #[test]
    fn test_owned_copy_survives_buffer_rewrite() {
        let mut buffer = EncodingBuffer::new(1, Precision::Quantized, ByteOrder::Native);
        encode(&mut buffer, &[0x00102030]).unwrap();
        let first = EncodedTensor::borrowed(&buffer).into_owned();

        encode(&mut buffer, &[0x00405060]).unwrap();
        assert_eq!(first.as_bytes(), &[0x10, 0x20, 0x30]);
        assert_eq!(buffer.as_bytes(), &[0x40, 0x50, 0x60]);
    }

    #[test]
    fn test_decode_f32_only_for_float() {
        let mut buffer = EncodingBuffer::new(1, Precision::Float, ByteOrder::Big);
        encode(&mut buffer, &[0xFF000000]).unwrap();
        let mut values = vec![7.0];
        assert!(EncodedTensor::borrowed(&buffer).decode_f32_into(&mut values));
        assert_eq!(values, vec![7.0, -1.0, -1.0, -1.0]);

        let quantized = EncodingBuffer::new(1, Precision::Quantized, ByteOrder::Native);
        let mut untouched = Vec::new();
        assert!(!EncodedTensor::borrowed(&quantized).decode_f32_into(&mut untouched));
        assert!(untouched.is_empty());
    }

    #[test]
    fn test_precision_serde_names() {
        assert_eq!(
            serde_json::to_string(&Precision::Quantized).unwrap(),
            "\"quantized\""
        );
        let order: ByteOrder = serde_json::from_str("\"big\"").unwrap();
        assert_eq!(order, ByteOrder::Big);
    }
}
