#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The parser must reject arbitrary bytes without panicking, and any
    // accepted document must reserialize to the exact input.
    if let Ok(doc) = rollsync::FingerprintDoc::from_bytes(data) {
        assert_eq!(doc.to_bytes(), data);
    }
});
