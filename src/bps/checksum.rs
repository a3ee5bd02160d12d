// CRC32 (IEEE 802.3 polynomial, reflected, init 0xFFFFFFFF, final xor).
//
// Same function archive tools use for file hashes, so checksums stored in a
// patch compare directly against independently computed CRCs.

/// CRC32 of `data`.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
