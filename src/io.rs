// File-level I/O helpers for patch creation and application.
//
// Provides `create_file()`, `apply_file()` and `validate_source_file()`
// convenience functions over the in-memory engine, with buffered output.
// Optionally computes SHA-256 digests of the files involved (feature-gated
// behind `file-io`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::debug;
#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::bps::applier;
use crate::bps::error::PatchError;
use crate::bps::parser;
use crate::bps::patch::Patch;
use crate::engine::{self, CreateOptions};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `create_file()`.
#[derive(Debug, Clone)]
pub struct CreateStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Target file size in bytes.
    pub target_size: u64,
    /// Patch output size in bytes.
    pub patch_size: u64,
    /// Number of actions in the patch.
    pub actions: u64,
    /// SHA-256 of the source file (if `file-io` feature is enabled).
    pub source_sha256: Option<[u8; 32]>,
    /// SHA-256 of the target file (if `file-io` feature is enabled).
    pub target_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `apply_file()`.
#[derive(Debug, Clone)]
pub struct ApplyStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Number of actions applied.
    pub actions: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug)]
pub enum IoError {
    /// I/O error (file open, read, write).
    Io(io::Error),
    /// Patch parse, apply or create error.
    Patch(PatchError),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Patch(e) => write!(f, "patch error: {e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Patch(e) => Some(e),
        }
    }
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<PatchError> for IoError {
    fn from(e: PatchError) -> Self {
        Self::Patch(e)
    }
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// create_file
// ---------------------------------------------------------------------------

/// Create a patch between a source file and target file, writing it to
/// `patch_path`.
///
/// Both inputs are read fully into memory; the diff index needs random
/// access to each.
pub fn create_file(
    source_path: &Path,
    target_path: &Path,
    patch_path: &Path,
    opts: &CreateOptions,
) -> Result<CreateStats, IoError> {
    let source = std::fs::read(source_path)?;
    let target = std::fs::read(target_path)?;

    let patch = engine::create_with_options(&source, &target, opts)?;
    let bytes = patch.to_bytes();
    write_buffered(patch_path, &bytes)?;

    debug!(
        "{} + {} -> {} ({} bytes)",
        source_path.display(),
        target_path.display(),
        patch_path.display(),
        bytes.len()
    );

    Ok(CreateStats {
        source_size: source.len() as u64,
        target_size: target.len() as u64,
        patch_size: bytes.len() as u64,
        actions: patch.actions.len() as u64,
        source_sha256: sha256(&source),
        target_sha256: sha256(&target),
    })
}

// ---------------------------------------------------------------------------
// apply_file
// ---------------------------------------------------------------------------

/// Apply the patch at `patch_path` to a source file, writing the target to
/// `output_path`.
///
/// Nothing is written unless the patch parses and the result passes its
/// target checksum.
pub fn apply_file(
    source_path: &Path,
    patch_path: &Path,
    output_path: &Path,
    verify_source: bool,
) -> Result<ApplyStats, IoError> {
    let source = std::fs::read(source_path)?;
    let patch_bytes = std::fs::read(patch_path)?;
    let patch = parser::parse(&patch_bytes)?;

    let output = applier::apply(&patch, &source, verify_source)?;
    write_buffered(output_path, &output)?;

    Ok(ApplyStats {
        source_size: source.len() as u64,
        patch_size: patch_bytes.len() as u64,
        output_size: output.len() as u64,
        actions: patch.actions.len() as u64,
        output_sha256: sha256(&output),
    })
}

// ---------------------------------------------------------------------------
// Patch file helpers
// ---------------------------------------------------------------------------

/// Read and parse a patch file.
pub fn read_patch_file(patch_path: &Path) -> Result<Patch, IoError> {
    let bytes = std::fs::read(patch_path)?;
    Ok(parser::parse(&bytes)?)
}

/// Check whether a source file is the one the patch was created from.
pub fn validate_source_file(source_path: &Path, patch_path: &Path) -> Result<bool, IoError> {
    let patch = read_patch_file(patch_path)?;
    let source = std::fs::read(source_path)?;
    Ok(patch.validate_source(&source))
}

fn write_buffered(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
    writer.write_all(data)?;
    writer.flush()
}

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
