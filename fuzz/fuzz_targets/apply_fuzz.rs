#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First half is a candidate patch document, second half plays the
    // destination buffer. Replay may fail but must never panic or read
    // out of bounds.
    let split = data.len() / 2;
    if let Ok(patch) = rollsync::PatchDoc::from_bytes(&data[..split]) {
        let _ = rollsync::apply_patch(&patch, &data[split..]);
    }
});
