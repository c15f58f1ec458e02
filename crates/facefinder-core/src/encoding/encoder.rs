//! ARGB pixel encoder for quantized and float models.

use super::{EncodingBuffer, Precision};
use crate::error::EncodingError;

/// Float normalization mean (per-channel).
pub const IMAGE_MEAN: f32 = 128.0;

/// Float normalization std (per-channel).
pub const IMAGE_STD: f32 = 128.0;

/// Split a packed ARGB pixel into `[r, g, b]`. Alpha is ignored.
#[inline]
pub fn channels(pixel: u32) -> [u8; 3] {
    [
        ((pixel >> 16) & 0xFF) as u8,
        ((pixel >> 8) & 0xFF) as u8,
        (pixel & 0xFF) as u8,
    ]
}

/// Map a channel byte from `[0, 255]` onto `[-1.0, 127/128]`.
#[inline]
pub fn normalize(channel: u8) -> f32 {
    (channel as f32 - IMAGE_MEAN) / IMAGE_STD
}

/// Encode a `side × side` ARGB pixel array into `buffer`.
///
/// The buffer is rewound first and ends up exactly full. Pixels are read
/// row-major (outer loop over rows, inner over columns), matching the row-major
/// layout of the source bitmap.
pub fn encode(buffer: &mut EncodingBuffer, pixels: &[u32]) -> Result<(), EncodingError> {
    let side = buffer.side() as usize;
    let expected = side * side;
    if pixels.len() != expected {
        return Err(EncodingError::PixelCount {
            expected,
            actual: pixels.len(),
        });
    }

    buffer.rewind();
    let quantized = buffer.precision() == Precision::Quantized;
    for row in 0..side {
        for col in 0..side {
            let [r, g, b] = channels(pixels[row * side + col]);
            if quantized {
                buffer.put_u8(r)?;
                buffer.put_u8(g)?;
                buffer.put_u8(b)?;
            } else {
                buffer.put_f32(normalize(r))?;
                buffer.put_f32(normalize(g))?;
                buffer.put_f32(normalize(b))?;
            }
        }
    }

    debug_assert!(buffer.is_full());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::ByteOrder;

    fn floats(buffer: &EncodingBuffer) -> Vec<f32> {
        buffer
            .as_bytes()
            .chunks_exact(4)
            .map(|b| buffer.byte_order().f32_from_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn test_quantized_writes_rgb_bytes_row_major() {
        let mut buffer = EncodingBuffer::new(2, Precision::Quantized, ByteOrder::Native);
        let pixels = [0xFF010203, 0xFF040506, 0x00070809, 0x800A0B0C];
        encode(&mut buffer, &pixels).unwrap();

        assert_eq!(buffer.position(), 2 * 2 * 3);
        assert_eq!(
            buffer.as_bytes(),
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
        );
    }

    #[test]
    fn test_row_major_traversal() {
        // Column-major traversal would emit 0, 3, 6, 1, ...
        let side = 3usize;
        let pixels: Vec<u32> = (0..(side * side) as u32).map(|i| i << 16).collect();
        let mut buffer = EncodingBuffer::new(side as u32, Precision::Quantized, ByteOrder::Native);
        encode(&mut buffer, &pixels).unwrap();

        let reds: Vec<u8> = buffer.as_bytes().chunks_exact(3).map(|c| c[0]).collect();
        assert_eq!(reds, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_float_black_and_white() {
        let mut buffer = EncodingBuffer::new(1, Precision::Float, ByteOrder::Native);
        encode(&mut buffer, &[0xFF000000]).unwrap();
        assert_eq!(floats(&buffer), vec![-1.0, -1.0, -1.0]);

        encode(&mut buffer, &[0xFFFFFFFF]).unwrap();
        for v in floats(&buffer) {
            assert!((v - 127.0 / 128.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_float_range_and_length() {
        let side = 8u32;
        let pixels: Vec<u32> = (0..side * side).map(|i| i.wrapping_mul(0x01030507)).collect();
        let mut buffer = EncodingBuffer::new(side, Precision::Float, ByteOrder::Native);
        encode(&mut buffer, &pixels).unwrap();

        let values = floats(&buffer);
        assert_eq!(values.len(), (side * side * 3) as usize);
        assert!(values.iter().all(|&v| (-1.0..1.0).contains(&v)));
    }

    #[test]
    fn test_float_respects_big_endian() {
        let mut buffer = EncodingBuffer::new(1, Precision::Float, ByteOrder::Big);
        // (192 - 128) / 128 = 0.5
        encode(&mut buffer, &[0x00C0C0C0]).unwrap();
        assert_eq!(&buffer.as_bytes()[..4], &0.5f32.to_be_bytes());
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let pixels: Vec<u32> = (0..16u32).map(|i| 0xFF000000 | (i * 0x00111111)).collect();
        let mut buffer = EncodingBuffer::new(4, Precision::Float, ByteOrder::Native);

        encode(&mut buffer, &pixels).unwrap();
        let first = buffer.as_bytes().to_vec();
        encode(&mut buffer, &pixels).unwrap();
        assert_eq!(buffer.as_bytes(), first.as_slice());
    }

    #[test]
    fn test_pixel_count_mismatch_is_reported() {
        let mut buffer = EncodingBuffer::new(4, Precision::Quantized, ByteOrder::Native);
        let err = encode(&mut buffer, &[0u32; 15]).unwrap_err();
        assert_eq!(
            err,
            EncodingError::PixelCount {
                expected: 16,
                actual: 15
            }
        );
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn test_normalize_endpoints() {
        assert_eq!(normalize(0), -1.0);
        assert_eq!(normalize(128), 0.0);
        assert!((normalize(255) - 0.9921875).abs() < 1e-7);
    }
}
