// Patch replay: the destination side reconstructs the source.
//
// Matched blocks are copied out of the local destination buffer; literal
// runs are inserted from the patch. Each record first drains pending
// matches up to its anchor, then contributes its literal; matches left
// after the last record are drained at the end. An optional trace sink
// observes every span in exact output order.

use crate::delta::PatchDoc;
use crate::error::Error;
use crate::progress::{percent_of, BlockApplied, BlockSource, ProgressEvent, SyncOptions};

/// Reconstruct the source buffer from `patch` and the destination bytes it
/// was built against.
pub fn apply_patch(patch: &PatchDoc, dest: &[u8]) -> Result<Vec<u8>, Error> {
    apply_patch_with(patch, dest, &mut SyncOptions::new())
}

/// Reconstruct with progress, trace and cancellation support.
///
/// Pairing the right destination buffer with the right patch is the
/// caller's contract; no file identity travels with either document. In
/// particular, a patch built against a *merged* fingerprint references
/// labelled blocks that this positional replay cannot resolve — keeping
/// such patches away from it is also on the caller.
pub fn apply_patch_with(
    patch: &PatchDoc,
    dest: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<Vec<u8>, Error> {
    opts.check_cancelled()?;

    let block = patch.block_size() as usize;
    let dest_blocks = dest.len().div_ceil(block);
    let matches = patch.matches();
    let records = patch.patches();

    // Unchanged-data fast path: no literals and a strictly sequential
    // full cover of the destination. A reordered all-match patch is a
    // different byte sequence and must go through the general replay.
    if records.is_empty()
        && matches.len() == dest_blocks
        && matches
            .iter()
            .enumerate()
            .all(|(k, &index)| index as usize == k + 1)
    {
        opts.emit_progress(ProgressEvent::Apply {
            records_applied: 0,
            total_records: 0,
            percent: 100,
        });
        return Ok(dest.to_vec());
    }

    let total_records = records.len() as u64;
    // Cap the preallocation: an unvalidated patch may claim far more
    // output than its match indices can legally produce.
    let estimate = (matches.len() * block + patch.literal_len()).min(1 << 24);
    let mut out = Vec::with_capacity(estimate);
    let mut m_idx = 0usize;

    for (k, record) in records.iter().enumerate() {
        opts.check_cancelled()?;

        while m_idx < matches.len() && matches[m_idx] <= record.anchor {
            copy_block(matches[m_idx], dest, block, dest_blocks, &mut out, opts)?;
            m_idx += 1;
        }

        out.extend_from_slice(&record.literal);
        opts.emit_trace(BlockApplied {
            block_index: None,
            source: BlockSource::Patch,
            size: record.literal.len(),
        });

        opts.emit_progress(ProgressEvent::Apply {
            records_applied: (k + 1) as u64,
            total_records,
            percent: percent_of((k + 1) as u64, total_records),
        });
    }

    while m_idx < matches.len() {
        copy_block(matches[m_idx], dest, block, dest_blocks, &mut out, opts)?;
        m_idx += 1;
    }

    opts.emit_progress(ProgressEvent::Apply {
        records_applied: total_records,
        total_records,
        percent: 100,
    });

    tracing::debug!(
        output_len = out.len(),
        matched_blocks = matches.len(),
        literal_runs = records.len(),
        "patch applied"
    );

    Ok(out)
}

/// Copy destination block `index` (1-based) into the output; the final
/// block may be shorter than the block size.
fn copy_block(
    index: u32,
    dest: &[u8],
    block: usize,
    dest_blocks: usize,
    out: &mut Vec<u8>,
    opts: &mut SyncOptions<'_>,
) -> Result<(), Error> {
    if index == 0 || index as usize > dest_blocks {
        return Err(Error::corrupt_patch(format!(
            "matched block index {index} outside 1..={dest_blocks}"
        )));
    }

    let start = (index as usize - 1) * block;
    let len = block.min(dest.len() - start);
    out.extend_from_slice(&dest[start..start + len]);

    opts.emit_trace(BlockApplied {
        block_index: Some(index),
        source: BlockSource::Matched,
        size: len,
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{build_patch, PatchRecord};
    use crate::fingerprint::build_fingerprint;
    use crate::progress::Signal;

    fn roundtrip(block_size: u32, dest: &[u8], source: &[u8]) -> Vec<u8> {
        let doc = build_fingerprint(block_size, dest).unwrap();
        let patch = build_patch(&doc, source).unwrap();
        apply_patch(&patch, dest).unwrap()
    }

    #[test]
    fn identity_roundtrips_via_fast_path() {
        let data = b"Hello, World!";
        let doc = build_fingerprint(4, data).unwrap();
        let patch = build_patch(&doc, data).unwrap();

        let mut traces = Vec::new();
        let mut opts = SyncOptions::new();
        opts.on_block_applied = Some(Box::new(|t: &BlockApplied| traces.push(*t)));

        let out = apply_patch_with(&patch, data, &mut opts).unwrap();
        drop(opts);

        assert_eq!(out, data);
        assert!(traces.is_empty(), "fast path must not emit trace events");
    }

    #[test]
    fn fast_path_rejects_reordered_full_cover() {
        // Same match multiset as the identity patch, different order: the
        // guard must fall through to the general replay.
        let dest = b"AAAABBBBCCCC";
        let patch = PatchDoc::from_parts(4, vec![2, 1, 3], Vec::new());
        let out = apply_patch(&patch, dest).unwrap();
        assert_eq!(out, b"BBBBAAAACCCC");
    }

    #[test]
    fn reordered_blocks_reconstruct() {
        let out = roundtrip(5, b"AAAAABBBBBCCCCC", b"CCCCCAAAAABBBBB");
        assert_eq!(out, b"CCCCCAAAAABBBBB");
    }

    #[test]
    fn literal_before_any_match_has_no_pulled_blocks() {
        let out = roundtrip(4, b"World!", b"Hello, World!");
        assert_eq!(out, b"Hello, World!");
    }

    #[test]
    fn trailing_matches_drain_after_last_record() {
        let dest = b"World!";
        let doc = build_fingerprint(4, dest).unwrap();
        let patch = build_patch(&doc, b"Hello, World!").unwrap();

        let mut traces = Vec::new();
        let mut opts = SyncOptions::new();
        opts.on_block_applied = Some(Box::new(|t: &BlockApplied| traces.push(*t)));

        let out = apply_patch_with(&patch, dest, &mut opts).unwrap();
        drop(opts);

        assert_eq!(out, b"Hello, World!");
        assert_eq!(
            traces,
            [
                BlockApplied {
                    block_index: None,
                    source: BlockSource::Patch,
                    size: 7,
                },
                BlockApplied {
                    block_index: Some(1),
                    source: BlockSource::Matched,
                    size: 4,
                },
                BlockApplied {
                    block_index: Some(2),
                    source: BlockSource::Matched,
                    size: 2,
                },
            ]
        );
    }

    #[test]
    fn short_final_block_copies_its_real_length() {
        let out = roundtrip(4, b"abcdef", b"xyabcdef");
        assert_eq!(out, b"xyabcdef");
    }

    #[test]
    fn empty_destination_replays_pure_literal() {
        let out = roundtrip(4, b"", b"Hello, World!");
        assert_eq!(out, b"Hello, World!");
    }

    #[test]
    fn empty_patch_empty_output() {
        let out = roundtrip(4, b"anything here", b"");
        assert_eq!(out, b"");
    }

    #[test]
    fn rejects_out_of_range_block_index() {
        let dest = b"abcd"; // one block
        let patch = PatchDoc::from_parts(4, vec![5], Vec::new());
        assert!(matches!(
            apply_patch(&patch, dest),
            Err(Error::CorruptPatch { .. })
        ));

        let patch = PatchDoc::from_parts(4, vec![0], Vec::new());
        assert!(matches!(
            apply_patch(&patch, dest),
            Err(Error::CorruptPatch { .. })
        ));
    }

    #[test]
    fn rejects_index_beyond_shorter_destination() {
        // A patch built against a longer destination, replayed against a
        // truncated one.
        let patch = PatchDoc::from_parts(
            4,
            vec![1, 2, 3],
            vec![PatchRecord {
                anchor: 3,
                literal: b"tail".to_vec(),
            }],
        );
        let err = apply_patch(&patch, b"abcdefgh").unwrap_err(); // two blocks
        assert!(matches!(err, Error::CorruptPatch { .. }));
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_100() {
        let dest = b"World!";
        let doc = build_fingerprint(4, dest).unwrap();
        let patch = build_patch(&doc, b"Hello, World!").unwrap();

        let mut percents = Vec::new();
        let mut opts = SyncOptions::new();
        opts.on_progress = Some(Box::new(|e: &ProgressEvent| percents.push(e.percent())));

        apply_patch_with(&patch, dest, &mut opts).unwrap();
        drop(opts);

        assert!(!percents.is_empty());
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*percents.last().unwrap(), 100);
    }

    #[test]
    fn cancellation_aborts_replay() {
        let dest = b"World!";
        let doc = build_fingerprint(4, dest).unwrap();
        let patch = build_patch(&doc, b"Hello, World!").unwrap();

        let signal = Signal::new();
        signal.cancel();
        let mut opts = SyncOptions::new();
        opts.signal = Some(signal);

        assert!(matches!(
            apply_patch_with(&patch, dest, &mut opts),
            Err(Error::Cancelled)
        ));
    }
}
