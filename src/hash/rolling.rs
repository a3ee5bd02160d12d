// Window checksum, bucket sizing and forward match comparison.
//
// The window checksum reads 4 bytes little-endian and multiplies by a 32-bit
// LCG constant.  It is recomputed at every position rather than rolled, which
// at this width costs the same and keeps the index build trivially correct.

use super::config::HASH_WINDOW;

/// LCG multiplier for 32-bit hashes.
pub const HASH_MULT_32: u32 = 1_597_334_677;

/// Offset added to stored positions so 0 means "empty bucket".
pub const HASH_CKOFFSET: u32 = 1;

/// Largest table width, in bits.
const MAX_TABLE_BITS: usize = 24;

/// Checksum of the window starting at `base[0]`.
///
/// Returns `None` when fewer than `HASH_WINDOW` bytes remain.
#[inline(always)]
pub fn small_cksum(base: &[u8]) -> Option<u32> {
    let window: [u8; HASH_WINDOW] = base.get(..HASH_WINDOW)?.try_into().ok()?;
    Some(u32::from_le_bytes(window).wrapping_mul(HASH_MULT_32))
}

// ---------------------------------------------------------------------------
// Bucket index computation
// ---------------------------------------------------------------------------

/// Hash table configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashCfg {
    /// Number of buckets (power of 2).
    pub size: usize,
    /// Bit shift: `32 - log2(size)`.
    pub shift: u32,
    /// `size - 1`.
    pub mask: u32,
}

impl HashCfg {
    /// Create a hash config for the given number of slots.
    ///
    /// Uses the smallest power of two >= slots, then one bit less, so the
    /// table is about half as large as the number of indexed positions.
    pub fn new(slots: usize) -> Self {
        let bits = size_hashtable_bits(slots);
        let size = 1usize << bits;
        Self {
            size,
            shift: 32 - bits as u32,
            mask: (size as u32) - 1,
        }
    }

    /// Compute bucket index from a checksum.
    ///
    /// `(cksum >> shift) ^ (cksum & mask)` folds the high bits into range.
    #[inline(always)]
    pub fn bucket(&self, cksum: u32) -> usize {
        ((cksum >> self.shift) ^ (cksum & self.mask)) as usize
    }
}

fn size_hashtable_bits(slots: usize) -> usize {
    for i in 3..=MAX_TABLE_BITS {
        if slots < (1 << i) {
            return i - 1;
        }
    }
    MAX_TABLE_BITS
}

// ---------------------------------------------------------------------------
// Forward match comparison
// ---------------------------------------------------------------------------

/// Number of equal leading bytes of `s1` and `s2`, capped at `n`.
///
/// Compares 8 bytes at a time, then byte by byte.
#[inline]
pub fn forward_match(s1: &[u8], s2: &[u8], n: usize) -> usize {
    let n = n.min(s1.len()).min(s2.len());
    let (a, b) = (&s1[..n], &s2[..n]);

    let mut i = 0;
    for (x, y) in a.chunks_exact(8).zip(b.chunks_exact(8)) {
        if x != y {
            return i + x.iter().zip(y).take_while(|(p, q)| p == q).count();
        }
        i += 8;
    }
    while i < n && a[i] == b[i] {
        i += 1;
    }
    i
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
