#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(doc) = rollsync::PatchDoc::from_bytes(data) {
        assert_eq!(doc.to_bytes(), data);
    }
});
