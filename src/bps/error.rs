// Error type shared by the BPS parser, applier and patch builder.
//
// Every variant is terminal for the operation that raised it: a patch that
// fails to parse or apply is either corrupt, foreign, or was built wrong.

use thiserror::Error;

use super::varint::VarIntError;

/// Errors produced while parsing, applying or building a BPS patch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The first four bytes are not `BPS1`.
    #[error("invalid BPS magic: expected \"BPS1\", got {found:02X?}")]
    BadMagic { found: [u8; 4] },

    /// A varint or fixed-width field runs past the end of the input.
    #[error("truncated input: needed {needed} byte(s) at offset {offset}, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Action mode outside the defined set (reserved for future format versions).
    #[error("unknown action mode {0}")]
    UnknownMode(u8),

    /// An action reads or writes outside the current source/target extent.
    #[error("action {action} out of bounds: {what} range {start}..{end} exceeds {limit}")]
    OutOfBounds {
        action: usize,
        what: &'static str,
        start: i64,
        end: i64,
        limit: usize,
    },

    /// Source length differs from the size recorded in the patch.
    #[error("source size mismatch: patch expects {expected} bytes, got {actual}")]
    SourceSizeMismatch { expected: u64, actual: u64 },

    #[error("source checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    SourceChecksumMismatch { expected: u32, actual: u32 },

    #[error("target checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    TargetChecksumMismatch { expected: u32, actual: u32 },

    #[error("patch checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    PatchChecksumMismatch { expected: u32, actual: u32 },

    /// A decoded integer does not fit the field it describes.
    #[error("integer overflow in {0}")]
    Overflow(&'static str),

    /// Metadata bytes are not valid UTF-8.
    #[error("patch metadata is not valid UTF-8 (at byte {valid_up_to})")]
    InvalidMetadata { valid_up_to: usize },
}

impl PatchError {
    /// Map a varint failure at `offset` into the codec error space.
    pub(crate) fn from_varint(e: VarIntError, offset: usize, available: usize) -> Self {
        match e {
            VarIntError::Underflow => Self::TruncatedInput {
                offset,
                needed: available + 1,
                available,
            },
            VarIntError::Overflow => Self::Overflow("varint"),
        }
    }
}

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, PatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_checksums_in_hex() {
        let e = PatchError::TargetChecksumMismatch {
            expected: 0xDEADBEEF,
            actual: 0x1,
        };
        assert_eq!(
            e.to_string(),
            "target checksum mismatch: expected 0xDEADBEEF, got 0x00000001"
        );
    }

    #[test]
    fn varint_underflow_maps_to_truncated() {
        let e = PatchError::from_varint(VarIntError::Underflow, 10, 2);
        assert!(matches!(
            e,
            PatchError::TruncatedInput {
                offset: 10,
                needed: 3,
                available: 2
            }
        ));
        let e = PatchError::from_varint(VarIntError::Overflow, 0, 0);
        assert_eq!(e, PatchError::Overflow("varint"));
    }
}
