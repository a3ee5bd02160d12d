// BPS patch format.
//
// Layout of a serialized patch:
//   "BPS1" | source size | target size | metadata length | metadata |
//   actions... | source CRC32 | target CRC32 | patch CRC32
//
// Sizes and lengths are varints, checksums are u32 little-endian, and the
// patch CRC32 covers every byte before it.

pub mod applier;
pub mod buffer;
pub mod checksum;
pub mod error;
pub mod parser;
pub mod patch;
pub mod varint;

pub use applier::apply;
pub use buffer::ByteBuffer;
pub use error::{PatchError, Result};
pub use parser::parse;
pub use patch::{Action, ActionMode, Patch, PatchBuilder, PatchStats, serialize};
