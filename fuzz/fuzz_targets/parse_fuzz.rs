#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must only ever produce an error.
    if let Ok(patch) = oxibps::parse(data) {
        assert_eq!(oxibps::serialize(&patch), data);
    }
});
