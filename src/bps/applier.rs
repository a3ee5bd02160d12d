// BPS patch application: `Patch` + source -> target.
//
// Output is written into a buffer of exactly `target_size` bytes, allocated
// only once the actions are known to fill it exactly.  The two
// running pointers are locals of one call.  Target copies may overlap the
// region they are producing (run-length style), so they are copied forward
// byte by byte when the ranges intersect.

use log::{debug, trace};

use super::checksum::crc32;
use super::error::{PatchError, Result};
use super::patch::{Action, Patch};

/// Apply `patch` to `source`, returning the checksum-verified target.
///
/// With `verify_source`, the source CRC32 is compared before any action
/// runs.  The target CRC32 is always verified.
pub fn apply(patch: &Patch, source: &[u8], verify_source: bool) -> Result<Vec<u8>> {
    if verify_source {
        let actual = crc32(source);
        if actual != patch.source_checksum {
            return Err(PatchError::SourceChecksumMismatch {
                expected: patch.source_checksum,
                actual,
            });
        }
    }
    if source.len() as u64 != u64::from(patch.source_size) {
        return Err(PatchError::SourceSizeMismatch {
            expected: u64::from(patch.source_size),
            actual: source.len() as u64,
        });
    }

    let target_len = patch.target_size as usize;
    let written = patch.output_len();
    if written != u64::from(patch.target_size) {
        return Err(PatchError::OutOfBounds {
            action: patch.actions.len(),
            what: "output",
            start: 0,
            end: i64::try_from(written).unwrap_or(i64::MAX),
            limit: target_len,
        });
    }
    let mut target = vec![0u8; target_len];
    let mut out_pos: usize = 0;
    let mut source_ptr: i64 = 0;
    let mut target_ptr: i64 = 0;

    for (index, action) in patch.actions.iter().enumerate() {
        let len = action.length() as usize;
        let out_end = out_pos + len;
        if out_end > target_len {
            return Err(PatchError::OutOfBounds {
                action: index,
                what: "output",
                start: out_pos as i64,
                end: out_end as i64,
                limit: target_len,
            });
        }

        match action {
            Action::SourceRead { .. } => {
                let src = checked_range(index, "source", out_pos as i64, len, source.len())?;
                target[out_pos..out_end].copy_from_slice(&source[src]);
            }
            Action::TargetRead { bytes } => {
                target[out_pos..out_end].copy_from_slice(bytes);
            }
            Action::SourceCopy { offset, .. } => {
                source_ptr = source_ptr
                    .checked_add(*offset)
                    .ok_or(PatchError::Overflow("source pointer"))?;
                let src = checked_range(index, "source copy", source_ptr, len, source.len())?;
                target[out_pos..out_end].copy_from_slice(&source[src]);
                source_ptr += len as i64;
            }
            Action::TargetCopy { offset, .. } => {
                target_ptr = target_ptr
                    .checked_add(*offset)
                    .ok_or(PatchError::Overflow("target pointer"))?;
                // The first byte must already exist; later bytes may be
                // produced by this same action.
                if target_ptr < 0 || target_ptr as usize >= out_pos {
                    return Err(PatchError::OutOfBounds {
                        action: index,
                        what: "target copy",
                        start: target_ptr,
                        end: target_ptr.saturating_add(len as i64),
                        limit: out_pos,
                    });
                }
                let from = target_ptr as usize;
                if from + len <= out_pos {
                    target.copy_within(from..from + len, out_pos);
                } else {
                    for i in 0..len {
                        target[out_pos + i] = target[from + i];
                    }
                }
                target_ptr += len as i64;
            }
        }
        trace!("action {index}: {action} -> output {out_pos}..{out_end}");
        out_pos = out_end;
    }

    let actual = crc32(&target);
    if actual != patch.target_checksum {
        return Err(PatchError::TargetChecksumMismatch {
            expected: patch.target_checksum,
            actual,
        });
    }

    debug!(
        "applied BPS patch: {} actions, {} -> {} bytes",
        patch.actions.len(),
        source.len(),
        target.len()
    );
    Ok(target)
}

/// Validate `start..start+len` against a buffer of `limit` bytes.
fn checked_range(
    action: usize,
    what: &'static str,
    start: i64,
    len: usize,
    limit: usize,
) -> Result<std::ops::Range<usize>> {
    let end = start.saturating_add(len as i64);
    if start < 0 || end > limit as i64 {
        return Err(PatchError::OutOfBounds {
            action,
            what,
            start,
            end,
            limit,
        });
    }
    Ok(start as usize..end as usize)
}
