// In-memory BPS patch model and its serialization.
//
// Actions are an explicit enum; the `(length - 1) << 2 | mode` packing only
// happens in `Action::encode` and in the parser.

use std::fmt;

use super::buffer::ByteBuffer;
use super::checksum::crc32;
use super::varint;

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// File identifier at offset 0.
pub const BPS_MAGIC: [u8; 4] = *b"BPS1";

/// Source, target and patch CRC32s at the end of every patch.
pub const CHECKSUM_TRAILER_LEN: usize = 12;

/// Smallest well-formed patch: magic, three one-byte varints, trailer.
pub const MIN_PATCH_LEN: usize = BPS_MAGIC.len() + 3 + CHECKSUM_TRAILER_LEN;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The two-bit mode tag stored in each action opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionMode {
    SourceRead = 0,
    TargetRead = 1,
    SourceCopy = 2,
    TargetCopy = 3,
}

impl ActionMode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::SourceRead),
            1 => Some(Self::TargetRead),
            2 => Some(Self::SourceCopy),
            3 => Some(Self::TargetCopy),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SourceRead => "SourceRead",
            Self::TargetRead => "TargetRead",
            Self::SourceCopy => "SourceCopy",
            Self::TargetCopy => "TargetCopy",
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of the source-to-target transformation.
///
/// Lengths are never zero.  Copy offsets are relative to the running
/// pointer of their buffer, which ends one past the last byte copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Copy `len` bytes of source at the current output position.
    SourceRead { len: u32 },
    /// Literal bytes carried in the patch.
    TargetRead { bytes: Vec<u8> },
    /// Copy `len` bytes of source at `source_ptr + offset`.
    SourceCopy { len: u32, offset: i64 },
    /// Copy `len` bytes of already-written target at `target_ptr + offset`.
    TargetCopy { len: u32, offset: i64 },
}

impl Action {
    pub fn mode(&self) -> ActionMode {
        match self {
            Self::SourceRead { .. } => ActionMode::SourceRead,
            Self::TargetRead { .. } => ActionMode::TargetRead,
            Self::SourceCopy { .. } => ActionMode::SourceCopy,
            Self::TargetCopy { .. } => ActionMode::TargetCopy,
        }
    }

    /// Number of output bytes this action produces.
    pub fn length(&self) -> u32 {
        match self {
            Self::SourceRead { len } | Self::SourceCopy { len, .. } | Self::TargetCopy { len, .. } => {
                *len
            }
            Self::TargetRead { bytes } => bytes.len() as u32,
        }
    }

    /// Relative offset for copy actions.
    pub fn offset(&self) -> Option<i64> {
        match self {
            Self::SourceCopy { offset, .. } | Self::TargetCopy { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    fn opcode(&self) -> u64 {
        (u64::from(self.length()).saturating_sub(1) << 2) | self.mode() as u64
    }

    /// Size of this action once serialized.
    pub fn encoded_len(&self) -> usize {
        let mut n = varint::sizeof_u64(self.opcode());
        match self {
            Self::TargetRead { bytes } => n += bytes.len(),
            Self::SourceCopy { offset, .. } | Self::TargetCopy { offset, .. } => {
                n += varint::sizeof_signed(*offset)
            }
            Self::SourceRead { .. } => {}
        }
        n
    }

    pub(crate) fn encode(&self, out: &mut ByteBuffer) {
        out.write_varint(self.opcode());
        match self {
            Self::TargetRead { bytes } => out.write_bytes(bytes),
            Self::SourceCopy { offset, .. } | Self::TargetCopy { offset, .. } => {
                out.write_signed_varint(*offset)
            }
            Self::SourceRead { .. } => {}
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset() {
            Some(offset) => write!(f, "{} len={} offset={offset:+}", self.mode(), self.length()),
            None => write!(f, "{} len={}", self.mode(), self.length()),
        }
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// A parsed or sealed BPS patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub source_size: u32,
    pub target_size: u32,
    pub metadata: String,
    pub actions: Vec<Action>,
    pub source_checksum: u32,
    pub target_checksum: u32,
    /// CRC32 of every encoded byte before this field.
    pub patch_checksum: u32,
}

/// Per-mode action counts and byte totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub source_reads: usize,
    pub target_reads: usize,
    pub source_copies: usize,
    pub target_copies: usize,
    /// Bytes carried literally by `TargetRead` actions.
    pub literal_bytes: u64,
    /// Bytes produced by the three copy-style actions.
    pub copied_bytes: u64,
}

impl PatchStats {
    pub fn actions(&self) -> usize {
        self.source_reads + self.target_reads + self.source_copies + self.target_copies
    }
}

impl Patch {
    /// Encode everything up to, but excluding, the patch checksum.
    pub(crate) fn encode_body(&self) -> ByteBuffer {
        let actions_len: usize = self.actions.iter().map(Action::encoded_len).sum();
        let mut out = ByteBuffer::with_capacity(
            BPS_MAGIC.len() + 15 + self.metadata.len() + actions_len + CHECKSUM_TRAILER_LEN,
        );
        out.write_bytes(&BPS_MAGIC);
        out.write_varint(u64::from(self.source_size));
        out.write_varint(u64::from(self.target_size));
        out.write_varint(self.metadata.len() as u64);
        out.write_bytes(self.metadata.as_bytes());
        for action in &self.actions {
            action.encode(&mut out);
        }
        out.write_u32_le(self.source_checksum);
        out.write_u32_le(self.target_checksum);
        out
    }

    /// Serialize to the BPS wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.encode_body();
        out.write_u32_le(self.patch_checksum);
        out.into_vec()
    }

    /// Serialized size in bytes.
    pub fn encoded_len(&self) -> usize {
        BPS_MAGIC.len()
            + varint::sizeof_u64(u64::from(self.source_size))
            + varint::sizeof_u64(u64::from(self.target_size))
            + varint::sizeof_u64(self.metadata.len() as u64)
            + self.metadata.len()
            + self.actions.iter().map(Action::encoded_len).sum::<usize>()
            + CHECKSUM_TRAILER_LEN
    }

    /// Whether `source` is the file this patch was made against.
    pub fn validate_source(&self, source: &[u8]) -> bool {
        source.len() as u64 == u64::from(self.source_size)
            && crc32(source) == self.source_checksum
    }

    /// Total bytes the actions write.
    pub fn output_len(&self) -> u64 {
        self.actions.iter().map(|a| u64::from(a.length())).sum()
    }

    pub fn stats(&self) -> PatchStats {
        let mut stats = PatchStats::default();
        for action in &self.actions {
            let len = u64::from(action.length());
            match action.mode() {
                ActionMode::SourceRead => stats.source_reads += 1,
                ActionMode::TargetRead => stats.target_reads += 1,
                ActionMode::SourceCopy => stats.source_copies += 1,
                ActionMode::TargetCopy => stats.target_copies += 1,
            }
            if action.mode() == ActionMode::TargetRead {
                stats.literal_bytes += len;
            } else {
                stats.copied_bytes += len;
            }
        }
        stats
    }
}

/// Serialize a patch (free-function form of [`Patch::to_bytes`]).
pub fn serialize(patch: &Patch) -> Vec<u8> {
    patch.to_bytes()
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Incrementally assembles the action list, then seals it with checksums.
///
/// Zero-length actions are dropped, and consecutive literals are merged
/// into one `TargetRead`.
#[derive(Debug, Clone)]
pub struct PatchBuilder {
    source_size: u32,
    target_size: u32,
    metadata: String,
    actions: Vec<Action>,
}

impl PatchBuilder {
    pub fn new(source_size: u32, target_size: u32) -> Self {
        Self {
            source_size,
            target_size,
            metadata: String::new(),
            actions: Vec::new(),
        }
    }

    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn source_read(&mut self, len: u32) {
        if len > 0 {
            self.actions.push(Action::SourceRead { len });
        }
    }

    pub fn target_read(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(Action::TargetRead { bytes: pending }) = self.actions.last_mut() {
            pending.extend_from_slice(bytes);
        } else {
            self.actions.push(Action::TargetRead {
                bytes: bytes.to_vec(),
            });
        }
    }

    pub fn source_copy(&mut self, len: u32, offset: i64) {
        if len > 0 {
            self.actions.push(Action::SourceCopy { len, offset });
        }
    }

    pub fn target_copy(&mut self, len: u32, offset: i64) {
        if len > 0 {
            self.actions.push(Action::TargetCopy { len, offset });
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Compute the three checksums and produce the immutable patch.
    pub fn seal(self, source: &[u8], target: &[u8]) -> Patch {
        let mut patch = Patch {
            source_size: self.source_size,
            target_size: self.target_size,
            metadata: self.metadata,
            actions: self.actions,
            source_checksum: crc32(source),
            target_checksum: crc32(target),
            patch_checksum: 0,
        };
        patch.patch_checksum = crc32(patch.encode_body().as_slice());
        patch
    }
}
