// Owned byte buffer with a read cursor.
//
// Reads consume from the cursor and fail with `TruncatedInput` instead of
// padding; writes always append at the end and leave the cursor alone.
// `pos <= data.len()` holds at all times.

use super::error::{PatchError, Result};
use super::varint;

/// In-memory byte sequence with sequential read/append access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            pos: 0,
        }
    }

    /// Take ownership of `data` with the cursor at the start.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current read cursor.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move the read cursor to an absolute position.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(PatchError::TruncatedInput {
                offset: pos,
                needed: 0,
                available: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Read `n` raw bytes, advancing the cursor.
    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        let available = self.remaining();
        if n > available {
            return Err(PatchError::TruncatedInput {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a 4-byte little-endian integer.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read an unsigned varint.
    pub fn read_varint(&mut self) -> Result<u64> {
        let rest = &self.data[self.pos..];
        let (value, len) =
            varint::read_u64(rest).map_err(|e| PatchError::from_varint(e, self.pos, rest.len()))?;
        self.pos += len;
        Ok(value)
    }

    /// Read an unsigned varint that must fit in 32 bits; `field` names it in errors.
    pub fn read_varint_u32(&mut self, field: &'static str) -> Result<u32> {
        let value = self.read_varint()?;
        u32::try_from(value).map_err(|_| PatchError::Overflow(field))
    }

    /// Read a signed relative offset.
    pub fn read_signed_varint(&mut self) -> Result<i64> {
        let rest = &self.data[self.pos..];
        let (value, len) = varint::read_signed(rest)
            .map_err(|e| PatchError::from_varint(e, self.pos, rest.len()))?;
        self.pos += len;
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Appends
    // -----------------------------------------------------------------------

    pub fn write_u8(&mut self, byte: u8) {
        self.data.push(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_varint(&mut self, value: u64) {
        varint::encode_u64(value, &mut self.data);
    }

    pub fn write_signed_varint(&mut self, value: i64) {
        varint::encode_signed(value, &mut self.data);
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
