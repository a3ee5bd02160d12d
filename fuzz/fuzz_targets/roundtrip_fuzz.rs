#![no_main]
use libfuzzer_sys::fuzz_target;
use oxibps::engine::{CreateOptions, DiffMode, create_with_options};
use oxibps::{apply, parse, serialize};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks mode and level, the rest splits into source and target.
    let flags = data[0];
    let payload = &data[1..];
    let split = payload.len() / 2;
    let (source, target) = payload.split_at(split);

    let options = CreateOptions {
        mode: if flags & 1 == 0 {
            DiffMode::Linear
        } else {
            DiffMode::Delta
        },
        level: u32::from(flags >> 1) % 10,
        ..Default::default()
    };
    let patch = create_with_options(source, target, &options).unwrap();
    let bytes = serialize(&patch);
    let parsed = parse(&bytes).unwrap();
    assert_eq!(apply(&parsed, source, true).unwrap(), target);
});
