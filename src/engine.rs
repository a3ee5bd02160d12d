// Diff engine: ties hash/matching to the BPS patch model.
//
// Provides the high-level create/apply APIs that orchestrate:
//   - Match search (hash module) to choose read, copy and literal actions
//   - Patch assembly and sealing (bps module)
//   - Patch application back to the target

use std::fmt;

use log::{debug, trace};

use crate::bps::applier;
use crate::bps::error::{PatchError, Result};
use crate::bps::patch::{Patch, PatchBuilder};
use crate::hash::config;
use crate::hash::matching::{Match, MatchEngine, MatchKind};

// ---------------------------------------------------------------------------
// Create options
// ---------------------------------------------------------------------------

/// Diff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// No references into the target being built: only `SourceRead`,
    /// `SourceCopy` and `TargetRead`.
    Linear,
    /// Also allows `TargetCopy` against bytes already produced.
    #[default]
    Delta,
}

impl DiffMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Delta => "delta",
        }
    }
}

impl fmt::Display for DiffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for patch creation.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub mode: DiffMode,
    /// Search effort (0-9). Maps to matcher profiles.
    pub level: u32,
    /// Free-form UTF-8 text stored in the patch header.
    pub metadata: String,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            mode: DiffMode::Delta,
            level: 6,
            metadata: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// High-level create
// ---------------------------------------------------------------------------

/// Create a sealed patch turning `source` into `target`.
pub fn create(source: &[u8], target: &[u8], mode: DiffMode) -> Result<Patch> {
    create_with_options(
        source,
        target,
        &CreateOptions {
            mode,
            ..Default::default()
        },
    )
}

/// Create with custom options.
///
/// Fails with `Overflow` when either input is larger than the format's
/// 32-bit size fields allow.
pub fn create_with_options(source: &[u8], target: &[u8], opts: &CreateOptions) -> Result<Patch> {
    let source_size = u32::try_from(source.len()).map_err(|_| PatchError::Overflow("source size"))?;
    let target_size = u32::try_from(target.len()).map_err(|_| PatchError::Overflow("target size"))?;

    let config = config::config_for_level(opts.level);
    let mut engine = MatchEngine::new(config, source, target, opts.mode == DiffMode::Delta);
    let mut builder = PatchBuilder::new(source_size, target_size).metadata(opts.metadata.as_str());

    let mut pos = 0usize;
    let mut literal_start = 0usize;
    let mut source_ptr = 0usize;
    let mut target_ptr = 0usize;

    while pos < target.len() {
        let Some(m) = engine.find_best(pos, source_ptr, target_ptr) else {
            pos += 1;
            engine.index_target(pos);
            continue;
        };
        trace!("target {pos}: {:?} from={} len={}", m.kind, m.from, m.length);

        builder.target_read(&target[literal_start..pos]);
        emit(&mut builder, m, &mut source_ptr, &mut target_ptr);
        pos += m.length;
        literal_start = pos;
        engine.index_target(pos);
    }
    builder.target_read(&target[literal_start..]);

    let patch = builder.seal(source, target);
    debug!(
        "created BPS patch: mode={} profile={} {} -> {} bytes, {} actions, {} bytes encoded",
        opts.mode,
        config.name,
        source.len(),
        target.len(),
        patch.actions.len(),
        patch.encoded_len()
    );
    Ok(patch)
}

/// Append the action for `m`, moving the matching running pointer past it.
fn emit(builder: &mut PatchBuilder, m: Match, source_ptr: &mut usize, target_ptr: &mut usize) {
    // Lengths and positions fit in u32/i64 because both inputs were checked
    // against u32::MAX.
    let len = m.length as u32;
    match m.kind {
        MatchKind::SourceRead => builder.source_read(len),
        MatchKind::SourceCopy => {
            builder.source_copy(len, m.from as i64 - *source_ptr as i64);
            *source_ptr = m.from + m.length;
        }
        MatchKind::TargetCopy => {
            builder.target_copy(len, m.from as i64 - *target_ptr as i64);
            *target_ptr = m.from + m.length;
        }
    }
}

// ---------------------------------------------------------------------------
// High-level apply
// ---------------------------------------------------------------------------

/// Parse `patch_bytes` and apply them to `source`, verifying both the source
/// and target checksums.
pub fn apply_bytes(source: &[u8], patch_bytes: &[u8]) -> Result<Vec<u8>> {
    let patch = crate::bps::parser::parse(patch_bytes)?;
    applier::apply(&patch, source, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bps::patch::{Action, ActionMode};

    fn roundtrip(source: &[u8], target: &[u8]) {
        for mode in [DiffMode::Linear, DiffMode::Delta] {
            let patch = create(source, target, mode).expect("create failed");
            let bytes = patch.to_bytes();
            let reconstructed = apply_bytes(source, &bytes).expect("apply failed");
            assert_eq!(
                reconstructed,
                target,
                "roundtrip mismatch (mode={mode}, source={}, target={}, patch={})",
                source.len(),
                target.len(),
                bytes.len()
            );
        }
    }

    fn has_mode(patch: &Patch, mode: ActionMode) -> bool {
        patch.actions.iter().any(|a| a.mode() == mode)
    }

    #[test]
    fn identity_is_single_source_read() {
        for mode in [DiffMode::Linear, DiffMode::Delta] {
            let patch = create(b"AAAA", b"AAAA", mode).unwrap();
            assert_eq!(patch.actions, vec![Action::SourceRead { len: 4 }]);
            assert_eq!(patch.source_checksum, patch.target_checksum);
            assert_eq!(
                patch.to_bytes(),
                [
                    0x42, 0x50, 0x53, 0x31, 0x84, 0x84, 0x80, 0x8c, 0xf1, 0x08, 0x0d, 0x9b, 0xf1,
                    0x08, 0x0d, 0x9b, 0x5d, 0x05, 0x38, 0x70
                ]
            );
        }
    }

    #[test]
    fn identity_below_match_threshold() {
        for data in [&b"A"[..], b"AB", b"ABC"] {
            for mode in [DiffMode::Linear, DiffMode::Delta] {
                let patch = create(data, data, mode).unwrap();
                assert_eq!(
                    patch.actions,
                    vec![Action::SourceRead {
                        len: data.len() as u32
                    }],
                    "{mode} identity of {} bytes",
                    data.len()
                );
                assert_eq!(patch.encoded_len(), 20);
            }
        }
    }

    #[test]
    fn short_tail_match_is_source_read() {
        let patch = create(b"ABCDxy", b"ABCExy", DiffMode::Delta).unwrap();
        assert_eq!(
            patch.actions,
            vec![
                Action::SourceRead { len: 3 },
                Action::TargetRead {
                    bytes: b"E".to_vec()
                },
                Action::SourceRead { len: 2 },
            ]
        );
        assert_eq!(apply_bytes(b"ABCDxy", &patch.to_bytes()).unwrap(), b"ABCExy");
    }

    #[test]
    fn tail_literal() {
        let patch = create(b"ABCD", b"ABCE", DiffMode::Delta).unwrap();
        assert_eq!(
            patch.actions,
            vec![
                Action::SourceRead { len: 3 },
                Action::TargetRead {
                    bytes: b"E".to_vec()
                },
            ]
        );
        assert_eq!(patch.patch_checksum, 0x6A4F_3B0F);
    }

    #[test]
    fn empty_inputs() {
        let patch = create(b"", b"", DiffMode::Delta).unwrap();
        assert!(patch.actions.is_empty());
        assert_eq!(apply_bytes(b"", &patch.to_bytes()).unwrap(), b"");
        roundtrip(b"some source", b"");
        roundtrip(b"", b"ABCDEFGHIJKLMNOPQRSTUVWXYZ");
    }

    #[test]
    fn no_zero_length_actions() {
        let source = b"Hello, world! This is a test of the patch engine.";
        let target = b"Hello, earth! This is a test of the patch engine!!";
        for mode in [DiffMode::Linear, DiffMode::Delta] {
            let patch = create(source, target, mode).unwrap();
            assert!(patch.actions.iter().all(|a| a.length() > 0));
            assert_eq!(patch.output_len(), target.len() as u64);
        }
    }

    #[test]
    fn linear_never_target_copies() {
        let target = b"abcabcabcabcabcabcabcabcabcabc";
        let linear = create(b"", target, DiffMode::Linear).unwrap();
        assert!(!has_mode(&linear, ActionMode::TargetCopy));
        assert_eq!(
            linear.actions,
            vec![Action::TargetRead {
                bytes: target.to_vec()
            }]
        );

        let delta = create(b"", target, DiffMode::Delta).unwrap();
        assert!(has_mode(&delta, ActionMode::TargetCopy));
        assert!(delta.encoded_len() < linear.encoded_len());
    }

    #[test]
    fn moved_block_uses_source_copy() {
        let source = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let target = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let patch = create(source, target, DiffMode::Linear).unwrap();
        assert_eq!(
            patch.actions,
            vec![
                Action::SourceCopy {
                    len: 26,
                    offset: 10
                },
                Action::SourceCopy {
                    len: 10,
                    offset: -36
                },
            ]
        );
        roundtrip(source, target);
    }

    #[test]
    fn roundtrip_small_edit() {
        roundtrip(
            b"Hello, world! This is a test of the patch engine.",
            b"Hello, earth! This is a test of the patch engine.",
        );
    }

    #[test]
    fn roundtrip_repeating_data() {
        roundtrip(
            b"AAAA BBBB CCCC DDDD EEEE FFFF GGGG HHHH",
            b"AAAA CCCC DDDD EEEE xxxx GGGG HHHH IIII",
        );
    }

    #[test]
    fn roundtrip_binary_data() {
        let source: Vec<u8> = (0..=255).cycle().take(4096).collect();
        let mut target = source.clone();
        target[100] = 0xFF;
        target[200] = 0x00;
        target[1000] = 0x42;
        roundtrip(&source, &target);
    }

    #[test]
    fn roundtrip_run_data() {
        roundtrip(b"", &[0xAA; 200]);
        roundtrip(b"\xAA", &[0xAA; 200]);
    }

    #[test]
    fn roundtrip_all_levels() {
        let source = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789abcdefghijklmnopqrstuvwxyz";
        let target = b"ABCDEFGHIJKLMNOP--CHANGED--UVWXYZ0123456789abcdefghijklmnopqrstuvwxyz!!!";

        for level in [0, 3, 6, 9] {
            for mode in [DiffMode::Linear, DiffMode::Delta] {
                let opts = CreateOptions {
                    mode,
                    level,
                    ..Default::default()
                };
                let patch = create_with_options(source, target, &opts).expect("create failed");
                let reconstructed = applier::apply(&patch, source, true).expect("apply failed");
                assert_eq!(reconstructed, target, "level {level} {mode} roundtrip failed");
            }
        }
    }

    #[test]
    fn metadata_is_carried() {
        let opts = CreateOptions {
            metadata: "author=test".into(),
            ..Default::default()
        };
        let patch = create_with_options(b"abc", b"abd", &opts).unwrap();
        assert_eq!(patch.metadata, "author=test");
        let parsed = crate::bps::parser::parse(&patch.to_bytes()).unwrap();
        assert_eq!(parsed.metadata, "author=test");
    }

    #[test]
    fn patch_is_smaller_for_similar_data() {
        let source: Vec<u8> = (0..=255).cycle().take(8192).collect();
        let mut target = source.clone();
        target[4096] ^= 0xFF;
        let patch = create(&source, &target, DiffMode::Delta).unwrap();
        let len = patch.encoded_len();
        assert!(
            len < target.len() / 50,
            "patch ({len}) should be much smaller than target ({})",
            target.len()
        );
    }

    #[test]
    fn deterministic() {
        let source = b"the cat sat on the mat, the cat sat on the hat";
        let target = b"the hat sat on the cat, the mat sat on the cat";
        let a = create(source, target, DiffMode::Delta).unwrap();
        let b = create(source, target, DiffMode::Delta).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn mode_names() {
        assert_eq!(DiffMode::Linear.to_string(), "linear");
        assert_eq!(DiffMode::Delta.name(), "delta");
        assert_eq!(DiffMode::default(), DiffMode::Delta);
    }
}
