// BPS variable-length integer encoding.
//
// Little-endian, 7 data bits per byte.  Unlike LEB128 the *terminating* byte
// carries the high bit, and every continuation subtracts one from the
// remaining value, so each integer has exactly one encoding.
//
// Signed relative offsets are folded into the unsigned space as
// `(|n| << 1) | sign`.

use std::fmt;

/// Maximum encoded length for a 64-bit value (ceil(64/7) = 10).
pub const MAX_VARINT_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Append the encoding of `num` to `out`.
/// Returns the number of bytes written (1..=10).
#[inline]
pub fn encode_u64(mut num: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    loop {
        let low = (num & 0x7F) as u8;
        num >>= 7;
        if num == 0 {
            out.push(low | 0x80);
            break;
        }
        out.push(low);
        num -= 1;
    }
    out.len() - start
}

/// Append the encoding of a signed relative offset to `out`.
///
/// The magnitude must be below 2^63; relative offsets in a BPS patch are
/// bounded by the 32-bit buffer sizes, so this always holds in practice.
#[inline]
pub fn encode_signed(offset: i64, out: &mut Vec<u8>) -> usize {
    encode_u64(zigzag(offset), out)
}

#[inline]
fn zigzag(offset: i64) -> u64 {
    (offset.unsigned_abs() << 1) | u64::from(offset < 0)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode an unsigned varint from the start of `data`.
/// Returns `(value, bytes_consumed)`.
pub fn read_u64(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut value: u64 = 0;
    let mut shift: u64 = 1;
    for (i, &byte) in data.iter().take(MAX_VARINT_LEN).enumerate() {
        let digit = u64::from(byte & 0x7F)
            .checked_mul(shift)
            .ok_or(VarIntError::Overflow)?;
        value = value.checked_add(digit).ok_or(VarIntError::Overflow)?;
        if byte & 0x80 != 0 {
            return Ok((value, i + 1));
        }
        shift = shift.checked_mul(128).ok_or(VarIntError::Overflow)?;
        value = value.checked_add(shift).ok_or(VarIntError::Overflow)?;
    }
    if data.len() > MAX_VARINT_LEN {
        Err(VarIntError::Overflow)
    } else {
        Err(VarIntError::Underflow)
    }
}

/// Decode an unsigned varint that must fit in 32 bits.
pub fn read_u32(data: &[u8]) -> Result<(u32, usize), VarIntError> {
    let (value, len) = read_u64(data)?;
    let value = u32::try_from(value).map_err(|_| VarIntError::Overflow)?;
    Ok((value, len))
}

/// Decode a signed relative offset.
pub fn read_signed(data: &[u8]) -> Result<(i64, usize), VarIntError> {
    let (value, len) = read_u64(data)?;
    // value >> 1 < 2^63, so the cast is lossless.
    let magnitude = (value >> 1) as i64;
    let offset = if value & 1 != 0 { -magnitude } else { magnitude };
    Ok((offset, len))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Encoded byte-length of an unsigned value.
#[inline]
pub fn sizeof_u64(mut num: u64) -> usize {
    let mut len = 1;
    loop {
        num >>= 7;
        if num == 0 {
            return len;
        }
        num -= 1;
        len += 1;
    }
}

/// Encoded byte-length of a signed relative offset.
#[inline]
pub fn sizeof_signed(offset: i64) -> usize {
    sizeof_u64(zigzag(offset))
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarIntError {
    /// Input ended before a terminating byte.
    Underflow,
    /// Value does not fit the requested integer type.
    Overflow,
}

impl fmt::Display for VarIntError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarIntError::Underflow => write!(f, "varint underflow (truncated input)"),
            VarIntError::Overflow => write!(f, "varint overflow"),
        }
    }
}

impl std::error::Error for VarIntError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
