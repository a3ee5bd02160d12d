#![no_main]
use libfuzzer_sys::fuzz_target;
use oxibps::{PatchBuilder, apply};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let split = usize::from(data[0]).min(data.len() - 1);
    let (source, script) = data[1..].split_at(split);

    // Each (mode, len, offset) triple becomes one action. Most scripts read
    // out of bounds somewhere, which apply must reject without panicking.
    let steps: Vec<(u8, u32, u8)> = script
        .chunks_exact(3)
        .map(|c| (c[0] & 3, u32::from(c[1]) + 1, c[2]))
        .collect();
    let target_size: u32 = steps.iter().map(|&(_, len, _)| len).sum();

    let mut builder = PatchBuilder::new(source.len() as u32, target_size);
    for (mode, len, arg) in steps {
        let offset = i64::from(arg as i8);
        match mode {
            0 => builder.source_read(len),
            1 => builder.target_read(&vec![arg; len as usize]),
            2 => builder.source_copy(len, offset),
            _ => builder.target_copy(len, offset),
        }
    }
    let patch = builder.seal(source, &[]);
    if let Ok(out) = apply(&patch, source, false) {
        assert_eq!(out.len(), target_size as usize);
    }
});
