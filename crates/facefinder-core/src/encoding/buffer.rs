//! Fixed-capacity encoding buffer shared across recognition calls.

use super::{tensor_len, ByteOrder, Precision};
use crate::error::EncodingError;

/// Pre-allocated byte region holding one encoded image.
///
/// Capacity is fixed at construction from `side` and `precision`. Each fill
/// starts with [`rewind`](Self::rewind); the storage is never reallocated.
#[derive(Debug)]
pub struct EncodingBuffer {
    data: Box<[u8]>,
    position: usize,
    side: u32,
    precision: Precision,
    byte_order: ByteOrder,
}

impl EncodingBuffer {
    pub fn new(side: u32, precision: Precision, byte_order: ByteOrder) -> Self {
        let capacity = tensor_len(side, precision);
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            position: 0,
            side,
            precision,
            byte_order,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes written since the last rewind.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_full(&self) -> bool {
        self.position == self.data.len()
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

    /// Reset the write position to the start. Contents are left in place.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), EncodingError> {
        let capacity = self.data.len();
        let slot = self
            .data
            .get_mut(self.position)
            .ok_or(EncodingError::BufferOverflow { capacity })?;
        *slot = value;
        self.position += 1;
        Ok(())
    }

    pub fn put_f32(&mut self, value: f32) -> Result<(), EncodingError> {
        let end = self.position + 4;
        let capacity = self.data.len();
        let slot = self
            .data
            .get_mut(self.position..end)
            .ok_or(EncodingError::BufferOverflow { capacity })?;
        slot.copy_from_slice(&self.byte_order.f32_to_bytes(value));
        self.position = end;
        Ok(())
    }

    /// The full backing storage, regardless of the write position.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
