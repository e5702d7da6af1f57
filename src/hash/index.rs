// Candidate lookup for the matcher.
//
// Buckets block fingerprints by the low 16 bits of their weak checksum.
// A map rather than a flat 65 536-slot array: documents are often small
// and the table lives only for one patch-build call. Within a bucket,
// collisions resolve by linear scan — weak equality first, then the
// caller confirms with the strong digest.

use std::collections::HashMap;

use super::rolling::bucket;
use crate::fingerprint::{BlockFingerprint, FingerprintDoc};

/// Bucketed view over a fingerprint document's blocks.
pub struct MatchIndex<'a> {
    buckets: HashMap<u16, Vec<&'a BlockFingerprint>>,
}

impl<'a> MatchIndex<'a> {
    /// Index every block of `doc`, preserving document order per bucket.
    pub fn build(doc: &'a FingerprintDoc) -> Self {
        let mut buckets: HashMap<u16, Vec<&'a BlockFingerprint>> = HashMap::new();
        for block in doc.blocks() {
            buckets.entry(bucket(block.weak)).or_default().push(block);
        }
        Self { buckets }
    }

    /// Candidates sharing the weak checksum's bucket. May still disagree
    /// on the full weak value; the matcher rejects those before digesting.
    #[inline]
    pub fn candidates(&self, weak: u32) -> &[&'a BlockFingerprint] {
        self.buckets
            .get(&bucket(weak))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
