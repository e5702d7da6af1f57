// Property tests for the engine's core laws: the roundtrip identity, the
// self-patch shape, wire-format identities, rolling-checksum coherence,
// merge cardinality and the serialized-size law.

use proptest::prelude::*;

use rollsync::hash::RollingSum;
use rollsync::{
    apply_patch, build_fingerprint, build_fingerprint_with, build_patch, build_patch_with,
    merge_fingerprints, FingerprintDoc, PatchDoc, ProgressEvent, SyncOptions,
};

/// A source derived from the destination by one contiguous splice:
/// replace `dest[at..at + cut]` with `insert`. Covers mutation, insert,
/// delete, append, prepend and truncation as degenerate cases.
fn splice(dest: &[u8], at: usize, cut: usize, insert: &[u8]) -> Vec<u8> {
    let at = at.min(dest.len());
    let cut = cut.min(dest.len() - at);
    let mut out = Vec::with_capacity(dest.len() - cut + insert.len());
    out.extend_from_slice(&dest[..at]);
    out.extend_from_slice(insert);
    out.extend_from_slice(&dest[at + cut..]);
    out
}

proptest! {
    // apply(build_patch(build_fingerprint(B, d), s), d) == s
    #[test]
    fn prop_spliced_source_roundtrips(
        // Destinations at least one full block long: clamping to very
        // small blocks makes duplicate block content likely, and random
        // data with distinct blocks is the regime this law targets.
        // Empty and sub-block destinations are covered deterministically
        // in roundtrip.rs.
        dest in proptest::collection::vec(any::<u8>(), 64..2048),
        block_size in 8u32..=64,
        at in 0usize..2048,
        cut in 0usize..512,
        insert in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let source = splice(&dest, at, cut, &insert);

        let fingerprint = build_fingerprint(block_size, &dest).unwrap();
        let patch = build_patch(&fingerprint, &source).unwrap();
        let rebuilt = apply_patch(&patch, &dest).unwrap();
        prop_assert_eq!(rebuilt, source);
    }

    // Unrelated buffers degrade to an all-literal patch and still roundtrip.
    #[test]
    fn prop_unrelated_source_roundtrips(
        dest in proptest::collection::vec(any::<u8>(), 64..1024),
        source in proptest::collection::vec(any::<u8>(), 0..1024),
        block_size in 8u32..=64,
    ) {
        let fingerprint = build_fingerprint(block_size, &dest).unwrap();
        let patch = build_patch(&fingerprint, &source).unwrap();
        let rebuilt = apply_patch(&patch, &dest).unwrap();
        prop_assert_eq!(rebuilt, source);
    }

    // Patching a buffer against itself is pure sequential matches.
    #[test]
    fn prop_self_patch_is_sequential_matches(
        dest in proptest::collection::vec(any::<u8>(), 64..2048),
        block_size in 8u32..=64,
    ) {
        let fingerprint = build_fingerprint(block_size, &dest).unwrap();
        let patch = build_patch(&fingerprint, &dest).unwrap();

        let expected_blocks = dest.len().div_ceil(fingerprint.block_size() as usize);
        prop_assert_eq!(patch.patch_count(), 0);
        prop_assert_eq!(patch.match_count(), expected_blocks);
        for (k, &index) in patch.matches().iter().enumerate() {
            prop_assert_eq!(index as usize, k + 1);
        }

        let rebuilt = apply_patch(&patch, &dest).unwrap();
        prop_assert_eq!(rebuilt, dest);
    }

    // serialize ∘ parse is the identity on both documents.
    #[test]
    fn prop_fingerprint_wire_roundtrip(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        block_size in 1u32..=128,
    ) {
        let doc = build_fingerprint(block_size, &data).unwrap();
        let parsed = FingerprintDoc::from_bytes(&doc.to_bytes()).unwrap();
        prop_assert_eq!(&parsed, &doc);
        prop_assert_eq!(parsed.to_bytes(), doc.to_bytes());
    }

    #[test]
    fn prop_patch_wire_roundtrip(
        dest in proptest::collection::vec(any::<u8>(), 0..1024),
        at in 0usize..1024,
        insert in proptest::collection::vec(any::<u8>(), 0..128),
        block_size in 4u32..=32,
    ) {
        let source = splice(&dest, at, 0, &insert);
        let fingerprint = build_fingerprint(block_size, &dest).unwrap();
        let patch = build_patch(&fingerprint, &source).unwrap();

        let parsed = PatchDoc::from_bytes(&patch.to_bytes()).unwrap();
        prop_assert_eq!(&parsed, &patch);
        prop_assert_eq!(parsed.to_bytes(), patch.to_bytes());
    }

    // A chain of rolling updates equals a fresh checksum of the window.
    #[test]
    fn prop_roll_equals_fresh(
        data in proptest::collection::vec(any::<u8>(), 2..512),
        window in 1usize..256,
    ) {
        let window = window.min(data.len() - 1);
        let mut sum = RollingSum::of(&data[..window]);
        for lo in 0..data.len() - window {
            sum = sum.roll(data[lo], data[lo + window], window);
            prop_assert_eq!(sum, RollingSum::of(&data[lo + 1..lo + 1 + window]));
        }
    }

    // Serialized size is exactly 8 + 20·⌈|d|/B⌉ after clamping.
    #[test]
    fn prop_serialized_size_law(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        block_size in 1u32..=8192,
    ) {
        let doc = build_fingerprint(block_size, &data).unwrap();
        let blocks = data.len().div_ceil(doc.block_size() as usize);
        prop_assert_eq!(doc.to_bytes().len(), 8 + 20 * blocks);
    }

    // Merge cardinality: one entry per distinct (weak, strong) 5-tuple,
    // and every input entry appears exactly once.
    #[test]
    fn prop_merge_is_an_exact_union(
        // Buffers no shorter than the block size, so no document gets its
        // block size clamped away from the common 16.
        buffers in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 16..512),
            1..4
        ),
    ) {
        let docs: Vec<_> = buffers
            .iter()
            .map(|buf| build_fingerprint(16, buf).unwrap())
            .collect();
        let merged = merge_fingerprints(&docs).unwrap();

        let mut distinct = std::collections::HashSet::new();
        for doc in &docs {
            for entry in doc.blocks() {
                distinct.insert((entry.weak, entry.strong.0));
            }
        }
        prop_assert_eq!(merged.len(), distinct.len());

        for doc in &docs {
            for entry in doc.blocks() {
                let hits = merged
                    .blocks()
                    .iter()
                    .filter(|m| m.weak == entry.weak && m.strong == entry.strong)
                    .count();
                prop_assert_eq!(hits, 1);
            }
        }
    }

    // Progress percents never decrease and every completed phase ends at 100.
    #[test]
    fn prop_progress_is_monotonic(
        dest in proptest::collection::vec(any::<u8>(), 0..4096),
        at in 0usize..4096,
        insert in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let source = splice(&dest, at, 0, &insert);

        // (phase tag, percent) pairs; monotonicity holds per operation.
        let events = std::cell::RefCell::new(Vec::new());
        let sink = &events;
        let mut opts = SyncOptions::new();
        opts.on_progress = Some(Box::new(move |e: &ProgressEvent| {
            let phase = match e {
                ProgressEvent::Fingerprint { .. } => 0u8,
                ProgressEvent::Patch { .. } => 1,
                ProgressEvent::Apply { .. } => 2,
            };
            sink.borrow_mut().push((phase, e.percent()));
        }));

        let fingerprint = build_fingerprint_with(8, &dest, &mut opts).unwrap();
        let _patch = build_patch_with(&fingerprint, &source, &mut opts).unwrap();
        drop(opts);

        let seen = events.borrow();
        for phase in [0u8, 1] {
            let percents: Vec<u8> = seen
                .iter()
                .filter(|(p, _)| *p == phase)
                .map(|(_, pct)| *pct)
                .collect();
            prop_assert!(!percents.is_empty());
            prop_assert!(percents.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(*percents.last().unwrap(), 100);
        }
    }
}
