// Patch construction: the source side of the exchange.
//
// Slides a block-sized window over the source buffer. A window whose weak
// checksum and strong digest coincide with a fingerprinted destination
// block becomes a match reference; every byte not covered by a match
// lands in a literal run. Misses advance one byte with an O(1) checksum
// roll; hits jump a whole block and restart the checksum, so the weak
// work stays linear in the source length and strong digests are computed
// only on bucket collisions.
//
// Wire layout (all little-endian):
//
//   offset 0         u32  block size B
//   offset 4         u32  patch count P
//   offset 8         u32  match count M
//   offset 12+4k     u32  matches[k]
//   then P records:  u32 anchor, u32 literal length L, L literal bytes
//
// Records are concatenated with no framing; the reader walks them by
// count and declared length.

use crate::error::Error;
use crate::fingerprint::{FingerprintDoc, MAX_BLOCK_SIZE};
use crate::hash::{MatchIndex, RollingSum, StrongDigest};
use crate::progress::{percent_of, ProgressEvent, SyncOptions, TransferStats};
use crate::wire::{put_u32, DocReader};

/// Header bytes of a patch document.
pub const PATCH_HEADER_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// One literal run, anchored after the last matched block that precedes it.
///
/// `anchor == 0` marks a literal that appears before any match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    pub anchor: u32,
    pub literal: Vec<u8>,
}

/// An immutable patch document: matched destination block indices plus
/// literal runs, sufficient to rebuild the source from the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDoc {
    block_size: u32,
    matches: Vec<u32>,
    patches: Vec<PatchRecord>,
}

impl PatchDoc {
    pub(crate) fn from_parts(block_size: u32, matches: Vec<u32>, patches: Vec<PatchRecord>) -> Self {
        Self {
            block_size,
            matches,
            patches,
        }
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Matched destination block indices, in source order.
    #[inline]
    pub fn matches(&self) -> &[u32] {
        &self.matches
    }

    /// Literal runs, in source order.
    #[inline]
    pub fn patches(&self) -> &[PatchRecord] {
        &self.patches
    }

    /// `M` — number of matched blocks.
    #[inline]
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// `P` — number of literal runs.
    #[inline]
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Total literal payload carried by this patch.
    pub fn literal_len(&self) -> usize {
        self.patches.iter().map(|p| p.literal.len()).sum()
    }

    /// Serialize to the wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let size = PATCH_HEADER_LEN + 4 * self.matches.len() + 8 * self.patches.len()
            + self.literal_len();
        let mut out = Vec::with_capacity(size);
        put_u32(&mut out, self.block_size);
        put_u32(&mut out, self.patches.len() as u32);
        put_u32(&mut out, self.matches.len() as u32);
        for &index in &self.matches {
            put_u32(&mut out, index);
        }
        for record in &self.patches {
            put_u32(&mut out, record.anchor);
            put_u32(&mut out, record.literal.len() as u32);
            out.extend_from_slice(&record.literal);
        }
        out
    }

    /// Parse a patch document, validating counts and literal lengths
    /// against the actual byte length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = DocReader::new(bytes);
        let header = (r.u32(), r.u32(), r.u32());
        let (block_size, patch_count, match_count) = match header {
            (Some(b), Some(p), Some(m)) => (b, p, m),
            _ => return Err(Error::corrupt_patch("document shorter than its header")),
        };

        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(Error::corrupt_patch(format!(
                "header block size {block_size} out of range"
            )));
        }

        let mut matches = Vec::with_capacity((match_count as usize).min(r.remaining() / 4));
        for _ in 0..match_count {
            let index = r
                .u32()
                .ok_or_else(|| Error::corrupt_patch("match list overruns document"))?;
            matches.push(index);
        }

        let mut patches = Vec::with_capacity((patch_count as usize).min(r.remaining() / 8));
        for _ in 0..patch_count {
            let anchor = r
                .u32()
                .ok_or_else(|| Error::corrupt_patch("patch record overruns document"))?;
            let len = r
                .u32()
                .ok_or_else(|| Error::corrupt_patch("patch record overruns document"))?;
            let literal = r.bytes(len as usize).ok_or_else(|| {
                Error::corrupt_patch(format!(
                    "literal of {len} bytes overruns document at offset {}",
                    r.offset()
                ))
            })?;
            patches.push(PatchRecord {
                anchor,
                literal: literal.to_vec(),
            });
        }

        if r.remaining() != 0 {
            return Err(Error::corrupt_patch(format!(
                "{} trailing bytes after the last patch record",
                r.remaining()
            )));
        }

        Ok(Self {
            block_size,
            matches,
            patches,
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build a patch that rewrites the fingerprinted destination into `source`.
pub fn build_patch(fingerprint: &FingerprintDoc, source: &[u8]) -> Result<PatchDoc, Error> {
    build_patch_with(fingerprint, source, &mut SyncOptions::new())
}

/// Build a patch, reporting progress and honouring cancellation through
/// `opts`. Progress (and the cancellation check) fires whenever the cursor
/// has moved more than `10 · block_size` bytes since the last report; a
/// final 100% event is always emitted.
pub fn build_patch_with(
    fingerprint: &FingerprintDoc,
    source: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<PatchDoc, Error> {
    let block = fingerprint.block_size() as usize;
    let index = MatchIndex::build(fingerprint);

    let total_bytes = source.len() as u64;
    let progress_interval = 10 * block;

    let mut i = 0usize;
    let mut have_roll = false;
    let mut sum = RollingSum::default();
    let mut literal: Vec<u8> = Vec::new();
    let mut anchor = 0u32;
    let mut matches: Vec<u32> = Vec::new();
    let mut patches: Vec<PatchRecord> = Vec::new();
    let mut bytes_sent = 0u64;
    let mut last_progress = 0usize;

    while i < source.len() {
        if i - last_progress > progress_interval {
            opts.check_cancelled()?;
            emit_patch_progress(opts, i as u64, total_bytes, block, &matches, &patches, bytes_sent);
            last_progress = i;
        }

        let w = block.min(source.len() - i);
        let window = &source[i..i + w];

        // A full-width window after a miss rolls forward from the previous
        // position; everything else recomputes from scratch.
        sum = if have_roll && w == block {
            sum.roll(source[i - 1], source[i + block - 1], block)
        } else {
            RollingSum::of(window)
        };
        let weak = sum.value();

        // Bucket scan: early-reject on the full weak value, digest the
        // window at most once, confirm on the strong digest.
        let mut hit: Option<u32> = None;
        let mut window_digest: Option<StrongDigest> = None;
        for candidate in index.candidates(weak) {
            if candidate.weak != weak {
                continue;
            }
            let digest =
                *window_digest.get_or_insert_with(|| StrongDigest::compute(window));
            if candidate.strong == digest {
                hit = Some(candidate.index);
                break;
            }
        }

        match hit {
            Some(block_index) => {
                if !literal.is_empty() {
                    bytes_sent += literal.len() as u64;
                    patches.push(PatchRecord {
                        anchor,
                        literal: std::mem::take(&mut literal),
                    });
                }
                matches.push(block_index);
                anchor = block_index;
                // Always a full-block jump, even from a short final window;
                // overshooting the source length just ends the loop.
                i += block;
                have_roll = false;
            }
            None => {
                literal.push(source[i]);
                i += 1;
                have_roll = true;
            }
        }
    }

    if !literal.is_empty() {
        bytes_sent += literal.len() as u64;
        patches.push(PatchRecord { anchor, literal });
    }

    emit_patch_progress(opts, total_bytes, total_bytes, block, &matches, &patches, bytes_sent);

    tracing::debug!(
        source_len = source.len(),
        matches = matches.len(),
        literal_runs = patches.len(),
        literal_bytes = bytes_sent,
        "patch built"
    );

    Ok(PatchDoc {
        block_size: fingerprint.block_size(),
        matches,
        patches,
    })
}

#[allow(clippy::too_many_arguments)]
fn emit_patch_progress(
    opts: &mut SyncOptions<'_>,
    bytes_processed: u64,
    total_bytes: u64,
    block: usize,
    matches: &[u32],
    patches: &[PatchRecord],
    bytes_sent: u64,
) {
    let matches_found = matches.len() as u64;
    opts.emit_progress(ProgressEvent::Patch {
        bytes_processed,
        total_bytes,
        percent: percent_of(bytes_processed, total_bytes),
        matches_found,
        patches_created: patches.len() as u64,
        stats: TransferStats {
            bytes_processed,
            matches_found,
            bytes_matched: matches_found * block as u64,
            bytes_sent,
        },
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
