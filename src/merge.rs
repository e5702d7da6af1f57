// Multi-peer fingerprint union.
//
// Merging lets one source build a single patch against the combined
// holdings of several destinations. Deduplicated entries are renumbered
// densely, so a merged document's block indices are labels, not
// positions: replaying a patch built against it requires a peer that can
// resolve blocks by content, not the positional applicator. Keeping the
// two apart is the caller's responsibility.

use std::collections::HashSet;

use crate::error::Error;
use crate::fingerprint::{BlockFingerprint, FingerprintDoc, Origin};

/// Union one or more fingerprint documents sharing a block size.
///
/// Two entries are identical iff all five 32-bit fields — the weak
/// checksum and the four strong-digest lanes — are equal. Survivors keep
/// their order of first appearance across the inputs and are renumbered
/// `1..=N'`. The result is tagged [`Origin::Merged`].
pub fn merge_fingerprints(docs: &[FingerprintDoc]) -> Result<FingerprintDoc, Error> {
    let first = docs.first().ok_or(Error::Empty)?;
    let block_size = first.block_size();

    for doc in &docs[1..] {
        if doc.block_size() != block_size {
            return Err(Error::BlockSizeMismatch {
                expected: block_size,
                found: doc.block_size(),
            });
        }
    }

    let mut seen: HashSet<(u32, [u32; 4])> = HashSet::new();
    let mut blocks: Vec<BlockFingerprint> = Vec::new();

    for doc in docs {
        for entry in doc.blocks() {
            if seen.insert((entry.weak, entry.strong.0)) {
                blocks.push(BlockFingerprint {
                    index: blocks.len() as u32 + 1,
                    weak: entry.weak,
                    strong: entry.strong,
                });
            }
        }
    }

    tracing::debug!(
        inputs = docs.len(),
        merged_blocks = blocks.len(),
        "fingerprints merged"
    );

    Ok(FingerprintDoc::from_parts(block_size, Origin::Merged, blocks))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
