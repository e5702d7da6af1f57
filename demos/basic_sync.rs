use rollsync::{apply_patch, build_fingerprint, build_patch, suggest_block_size};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let destination = b"The quick brown fox jumps over the lazy dog.".to_vec();
    let source = b"The quick brown cat sits on the lazy mat, watching the dog.".to_vec();

    // Destination side: publish a fingerprint.
    let block_size = suggest_block_size(destination.len() as u64).min(8);
    let fingerprint = build_fingerprint(block_size, &destination)?;

    // Source side: answer with a patch.
    let patch = build_patch(&fingerprint, &source)?;

    // Destination side: rebuild the source version locally.
    let rebuilt = apply_patch(&patch, &destination)?;
    assert_eq!(rebuilt, source);

    println!(
        "fingerprint {} bytes -> patch {} bytes ({} matched blocks, {} literal bytes) -> rebuilt {} bytes",
        fingerprint.to_bytes().len(),
        patch.to_bytes().len(),
        patch.match_count(),
        patch.literal_len(),
        rebuilt.len()
    );

    Ok(())
}
