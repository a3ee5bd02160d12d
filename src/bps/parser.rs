// BPS patch parser: bytes -> `Patch`.
//
// The trailing patch checksum is verified before any action is decoded, so
// corruption anywhere in the header or action region surfaces as
// `PatchChecksumMismatch` rather than as a structural error.

use log::debug;

use super::buffer::ByteBuffer;
use super::checksum::crc32;
use super::error::{PatchError, Result};
use super::patch::{Action, ActionMode, BPS_MAGIC, CHECKSUM_TRAILER_LEN, MIN_PATCH_LEN, Patch};

/// Parse and validate a serialized patch.
pub fn parse(bytes: &[u8]) -> Result<Patch> {
    parse_buffer(ByteBuffer::from(bytes))
}

/// Parse a patch from an owned buffer, starting at offset 0.
pub fn parse_buffer(mut buf: ByteBuffer) -> Result<Patch> {
    buf.seek(0)?;
    let data = buf.as_slice();

    if data.len() < BPS_MAGIC.len() {
        return Err(PatchError::TruncatedInput {
            offset: 0,
            needed: BPS_MAGIC.len(),
            available: data.len(),
        });
    }
    let magic = [data[0], data[1], data[2], data[3]];
    if magic != BPS_MAGIC {
        return Err(PatchError::BadMagic { found: magic });
    }
    if data.len() < MIN_PATCH_LEN {
        return Err(PatchError::TruncatedInput {
            offset: BPS_MAGIC.len(),
            needed: MIN_PATCH_LEN - BPS_MAGIC.len(),
            available: data.len() - BPS_MAGIC.len(),
        });
    }

    let body_len = data.len() - 4;
    let stored = u32::from_le_bytes([
        data[body_len],
        data[body_len + 1],
        data[body_len + 2],
        data[body_len + 3],
    ]);
    let actual = crc32(&data[..body_len]);
    if stored != actual {
        return Err(PatchError::PatchChecksumMismatch {
            expected: stored,
            actual,
        });
    }

    buf.seek(BPS_MAGIC.len())?;
    let source_size = buf.read_varint_u32("source size")?;
    let target_size = buf.read_varint_u32("target size")?;
    let metadata_len = buf.read_varint()?;
    let metadata_len =
        usize::try_from(metadata_len).map_err(|_| PatchError::Overflow("metadata length"))?;
    let metadata = read_metadata(&mut buf, metadata_len)?;

    let mut actions = Vec::new();
    while buf.remaining() > CHECKSUM_TRAILER_LEN {
        actions.push(read_action(&mut buf)?);
    }
    if buf.remaining() < CHECKSUM_TRAILER_LEN {
        // The last action ran into the checksum trailer.
        return Err(PatchError::TruncatedInput {
            offset: buf.position(),
            needed: CHECKSUM_TRAILER_LEN,
            available: buf.remaining(),
        });
    }

    let source_checksum = buf.read_u32_le()?;
    let target_checksum = buf.read_u32_le()?;
    let patch_checksum = buf.read_u32_le()?;

    debug!(
        "parsed BPS patch: source={source_size} target={target_size} actions={} metadata={}B",
        actions.len(),
        metadata.len()
    );

    Ok(Patch {
        source_size,
        target_size,
        metadata,
        actions,
        source_checksum,
        target_checksum,
        patch_checksum,
    })
}

fn read_metadata(buf: &mut ByteBuffer, len: usize) -> Result<String> {
    // Metadata may never reach into the checksum trailer.
    let available = buf.remaining().saturating_sub(CHECKSUM_TRAILER_LEN);
    if len > available {
        return Err(PatchError::TruncatedInput {
            offset: buf.position(),
            needed: len,
            available,
        });
    }
    let bytes = buf.read_bytes(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| PatchError::InvalidMetadata {
        valid_up_to: e.utf8_error().valid_up_to(),
    })
}

fn read_action(buf: &mut ByteBuffer) -> Result<Action> {
    let opcode = buf.read_varint()?;
    let bits = (opcode & 0x3) as u8;
    let len = u32::try_from((opcode >> 2) + 1).map_err(|_| PatchError::Overflow("action length"))?;
    let mode = ActionMode::from_bits(bits).ok_or(PatchError::UnknownMode(bits))?;

    let action = match mode {
        ActionMode::SourceRead => Action::SourceRead { len },
        ActionMode::TargetRead => {
            let available = buf.remaining().saturating_sub(CHECKSUM_TRAILER_LEN);
            if len as usize > available {
                return Err(PatchError::TruncatedInput {
                    offset: buf.position(),
                    needed: len as usize,
                    available,
                });
            }
            Action::TargetRead {
                bytes: buf.read_bytes(len as usize)?.to_vec(),
            }
        }
        ActionMode::SourceCopy => Action::SourceCopy {
            len,
            offset: buf.read_signed_varint()?,
        },
        ActionMode::TargetCopy => Action::TargetCopy {
            len,
            offset: buf.read_signed_varint()?,
        },
    };
    Ok(action)
}
