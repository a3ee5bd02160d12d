use oxibps::bps::checksum::crc32;
use oxibps::bps::patch::CHECKSUM_TRAILER_LEN;
use oxibps::bps::varint;
use oxibps::{Action, DiffMode, PatchBuilder, PatchError, apply, create, parse, serialize};

// ---------------------------------------------------------------------------
// Known-answer vectors
// ---------------------------------------------------------------------------

const TAIL_LITERAL: [u8; 22] = [
    0x42, 0x50, 0x53, 0x31, 0x84, 0x84, 0x80, 0x88, 0x81, 0x45, 0xA5, 0x20, 0x17, 0xDB, 0x33, 0x10,
    0x10, 0xAC, 0x0F, 0x3B, 0x4F, 0x6A,
];

const EMPTY: [u8; 19] = [
    0x42, 0x50, 0x53, 0x31, 0x80, 0x80, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x93,
    0x1F, 0xD8, 0x5E,
];

#[test]
fn tail_literal_vector() {
    let patch = create(b"ABCD", b"ABCE", DiffMode::Delta).unwrap();
    assert_eq!(serialize(&patch), TAIL_LITERAL);
    assert_eq!(apply(&parse(&TAIL_LITERAL).unwrap(), b"ABCD", true).unwrap(), b"ABCE");
}

#[test]
fn identity_vector() {
    let patch = create(b"AAAA", b"AAAA", DiffMode::Linear).unwrap();
    assert_eq!(patch.actions, vec![Action::SourceRead { len: 4 }]);
    assert_eq!(patch.source_checksum, patch.target_checksum);
    assert_eq!(patch.source_checksum, crc32(b"AAAA"));
}

#[test]
fn empty_vector() {
    for mode in [DiffMode::Linear, DiffMode::Delta] {
        let patch = create(b"", b"", mode).unwrap();
        assert!(patch.actions.is_empty());
        assert_eq!(serialize(&patch), EMPTY);
        assert_eq!(apply(&patch, b"", true).unwrap(), b"");
    }
}

#[test]
fn varint_130() {
    let mut out = Vec::new();
    varint::encode_u64(130, &mut out);
    assert_eq!(out, [0x02, 0x80]);
    assert_eq!(varint::read_u64(&out).unwrap(), (130, 2));
}

// ---------------------------------------------------------------------------
// Corruption detection
// ---------------------------------------------------------------------------

fn sample_patch() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let source: Vec<u8> = b"The quick brown fox jumps over the lazy dog. "
        .iter()
        .copied()
        .cycle()
        .take(400)
        .collect();
    let mut target = source.clone();
    target[50..60].copy_from_slice(b"0123456789");
    target.extend_from_slice(b"and a brand new tail, and a brand new tail");
    let patch = create(&source, &target, DiffMode::Delta).unwrap();
    (source, target, serialize(&patch))
}

#[test]
fn every_flipped_byte_is_detected() {
    let (source, target, bytes) = sample_patch();
    for i in 0..bytes.len() {
        let mut corrupt = bytes.clone();
        corrupt[i] ^= 0x01;
        match parse(&corrupt) {
            Err(_) => {}
            Ok(patch) => {
                let result = apply(&patch, &source, true);
                assert!(
                    result.as_ref().map_or(true, |out| *out != target),
                    "flip at byte {i} went unnoticed"
                );
            }
        }
    }
}

#[test]
fn flipped_action_bytes_fail_patch_checksum() {
    let (_, _, bytes) = sample_patch();
    // Header is magic + three one- or two-byte varints; actions follow.
    let action_region = 10..bytes.len() - CHECKSUM_TRAILER_LEN;
    for i in action_region {
        let mut corrupt = bytes.clone();
        corrupt[i] ^= 0x80;
        assert!(
            matches!(parse(&corrupt), Err(PatchError::PatchChecksumMismatch { .. })),
            "byte {i}"
        );
    }
}

#[test]
fn truncation_is_detected() {
    let (_, _, bytes) = sample_patch();
    for len in 0..bytes.len() {
        assert!(parse(&bytes[..len]).is_err(), "truncated to {len}");
    }
}

#[test]
fn wrong_source_is_rejected() {
    let (source, _, bytes) = sample_patch();
    let patch = parse(&bytes).unwrap();
    let mut other = source.clone();
    other[0] ^= 0xFF;
    assert!(!patch.validate_source(&other));
    assert!(patch.validate_source(&source));
    assert!(matches!(
        apply(&patch, &other, true),
        Err(PatchError::SourceChecksumMismatch { .. })
    ));
    assert!(matches!(
        apply(&patch, &source[1..], false),
        Err(PatchError::SourceSizeMismatch { .. })
    ));
}

// ---------------------------------------------------------------------------
// Hand-built patches
// ---------------------------------------------------------------------------

#[test]
fn hand_built_patch_with_every_action() {
    let source = b"abcdefgh";
    let target = b"abcdxyabcdxyxyxy";
    let mut b = PatchBuilder::new(8, 16).metadata("every action");
    b.source_read(4); // abcd
    b.target_read(b"xy"); // xy
    b.source_copy(4, 0); // abcd
    b.target_copy(2, 4); // xy, from output offset 4
    b.target_copy(4, 4); // xyxy, overlapping its own output from offset 10
    let patch = b.seal(source, target);

    let bytes = serialize(&patch);
    let parsed = parse(&bytes).unwrap();
    assert_eq!(parsed.metadata, "every action");
    assert_eq!(apply(&parsed, source, true).unwrap(), target);

    let stats = parsed.stats();
    assert_eq!(stats.actions(), 5);
    assert_eq!(stats.target_copies, 2);
    assert_eq!(stats.literal_bytes, 2);
}

#[test]
fn delta_mode_beats_linear_on_repetitive_targets() {
    let source = b"header";
    let target: Vec<u8> = b"header"
        .iter()
        .chain(b"0123456789abcdef".repeat(64).iter())
        .copied()
        .collect();
    let linear = create(source, &target, DiffMode::Linear).unwrap();
    let delta = create(source, &target, DiffMode::Delta).unwrap();
    assert!(
        delta.encoded_len() < linear.encoded_len() / 4,
        "delta={} linear={}",
        delta.encoded_len(),
        linear.encoded_len()
    );
    assert_eq!(apply(&linear, source, true).unwrap(), target);
    assert_eq!(apply(&delta, source, true).unwrap(), target);
}
