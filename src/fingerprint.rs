// Block fingerprinting: the destination side of the exchange.
//
// The destination walks its buffer in fixed-size blocks and publishes a
// compact fingerprint document — `(weak, strong)` per block — that the
// source side turns into a patch. Wire layout (all little-endian):
//
//   offset 0        u32   block size B
//   offset 4        u32   block count N
//   offset 8+20i    u32   weak checksum of block i
//   offset 8+20i+4  16 B  strong digest of block i
//
// Exactly `8 + 20·N` bytes; anything else is corrupt.

use crate::error::Error;
use crate::hash::{weak_checksum, StrongDigest};
use crate::progress::{percent_of, Diagnostic, ProgressEvent, SyncOptions};
use crate::wire::{put_u32, DocReader};

/// Largest accepted block size (1 MiB).
pub const MAX_BLOCK_SIZE: u32 = 1 << 20;

/// Blocks processed between progress events while fingerprinting.
const PROGRESS_BLOCK_INTERVAL: u64 = 100;

/// Header bytes of a fingerprint document.
pub const FINGERPRINT_HEADER_LEN: usize = 8;

/// Wire bytes per block entry.
pub const FINGERPRINT_ENTRY_LEN: usize = 20;

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// Checksums of one destination block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFingerprint {
    /// 1-based position of the block; 0 is reserved for "before any match"
    /// in the patch stream.
    pub index: u32,
    pub weak: u32,
    pub strong: StrongDigest,
}

/// How a document's block indices are to be read.
///
/// Positional indices locate real byte ranges of one destination buffer.
/// After a merge they are dense labels only — replaying a patch built
/// against a merged document onto a single peer's buffer is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Positional,
    Merged,
}

/// An immutable fingerprint document: one block size, ordered block
/// checksums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintDoc {
    block_size: u32,
    origin: Origin,
    blocks: Vec<BlockFingerprint>,
}

impl FingerprintDoc {
    pub(crate) fn from_parts(block_size: u32, origin: Origin, blocks: Vec<BlockFingerprint>) -> Self {
        Self {
            block_size,
            origin,
            blocks,
        }
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    #[inline]
    pub fn blocks(&self) -> &[BlockFingerprint] {
        &self.blocks
    }

    /// Number of fingerprinted blocks (`N`).
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Serialized size in bytes: `8 + 20·N`.
    pub fn serialized_len(&self) -> usize {
        FINGERPRINT_HEADER_LEN + FINGERPRINT_ENTRY_LEN * self.blocks.len()
    }

    /// Serialize to the wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_len());
        put_u32(&mut out, self.block_size);
        put_u32(&mut out, self.blocks.len() as u32);
        for block in &self.blocks {
            put_u32(&mut out, block.weak);
            out.extend_from_slice(&block.strong.to_bytes());
        }
        out
    }

    /// Parse a fingerprint document.
    ///
    /// The byte length must equal `8 + 20·N` for the `N` declared in the
    /// header, and the header block size must be in range. Parsed
    /// documents are always [`Origin::Positional`]; the wire carries no
    /// origin flag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = DocReader::new(bytes);
        let block_size = r
            .u32()
            .ok_or_else(|| Error::corrupt_fingerprint("document shorter than its header"))?;
        let count = r
            .u32()
            .ok_or_else(|| Error::corrupt_fingerprint("document shorter than its header"))?;

        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(Error::corrupt_fingerprint(format!(
                "header block size {block_size} out of range"
            )));
        }

        let expected = FINGERPRINT_HEADER_LEN + FINGERPRINT_ENTRY_LEN * count as usize;
        if bytes.len() != expected {
            return Err(Error::corrupt_fingerprint(format!(
                "header declares {count} blocks ({expected} bytes) but document is {} bytes",
                bytes.len()
            )));
        }

        let mut blocks = Vec::with_capacity(count as usize);
        for i in 0..count {
            let weak = r
                .u32()
                .ok_or_else(|| Error::corrupt_fingerprint("truncated block entry"))?;
            let raw = r
                .bytes(16)
                .ok_or_else(|| Error::corrupt_fingerprint("truncated block entry"))?;
            let mut digest = [0u8; 16];
            digest.copy_from_slice(raw);
            blocks.push(BlockFingerprint {
                index: i + 1,
                weak,
                strong: StrongDigest::from_bytes(&digest),
            });
        }

        Ok(Self {
            block_size,
            origin: Origin::Positional,
            blocks,
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fingerprint `data` with the given block size.
pub fn build_fingerprint(block_size: u32, data: &[u8]) -> Result<FingerprintDoc, Error> {
    build_fingerprint_with(block_size, data, &mut SyncOptions::new())
}

/// Fingerprint `data`, reporting progress and honouring cancellation
/// through `opts`.
///
/// Block-size policy: sizes outside `1..=1_048_576` fail with
/// [`Error::InvalidBlockSize`]. A block size larger than the data is
/// silently clamped to `max(1, |data| / 2)` with a non-fatal diagnostic;
/// a block size under 256 against more than 1000 bytes of data warns but
/// proceeds.
pub fn build_fingerprint_with(
    block_size: u32,
    data: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<FingerprintDoc, Error> {
    if block_size == 0 || block_size > MAX_BLOCK_SIZE {
        return Err(Error::InvalidBlockSize {
            block_size: u64::from(block_size),
        });
    }

    let mut effective = block_size;
    if !data.is_empty() && block_size as usize > data.len() {
        effective = ((data.len() / 2) as u32).max(1);
        opts.emit_diagnostic(Diagnostic::BlockSizeClamped {
            requested: block_size,
            clamped: effective,
        });
    }
    if effective < 256 && data.len() > 1000 {
        opts.emit_diagnostic(Diagnostic::BlockSizeBelowRecommended {
            block_size: effective,
            data_len: data.len() as u64,
        });
    }

    let step = effective as usize;
    let total_blocks = data.len().div_ceil(step) as u64;

    let mut blocks = Vec::with_capacity(total_blocks as usize);
    for (i, chunk) in data.chunks(step).enumerate() {
        opts.check_cancelled()?;

        blocks.push(BlockFingerprint {
            index: (i + 1) as u32,
            weak: weak_checksum(chunk),
            strong: StrongDigest::compute(chunk),
        });

        let processed = (i + 1) as u64;
        if processed % PROGRESS_BLOCK_INTERVAL == 0 || processed == total_blocks {
            opts.emit_progress(ProgressEvent::Fingerprint {
                blocks_processed: processed,
                total_blocks,
                percent: percent_of(processed, total_blocks),
            });
        }
    }

    if total_blocks == 0 {
        opts.emit_progress(ProgressEvent::Fingerprint {
            blocks_processed: 0,
            total_blocks: 0,
            percent: 100,
        });
    }

    tracing::debug!(
        block_size = effective,
        blocks = blocks.len(),
        data_len = data.len(),
        "fingerprint built"
    );

    Ok(FingerprintDoc {
        block_size: effective,
        origin: Origin::Positional,
        blocks,
    })
}

/// Recommended block size for a file of the given length.
pub fn suggest_block_size(file_size: u64) -> u32 {
    match file_size {
        0..=49_999 => 512,
        50_000..=499_999 => 2048,
        500_000..=4_999_999 => 4096,
        5_000_000..=49_999_999 => 8192,
        _ => 16384,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
