// Injected capabilities: progress reporting, cancellation, the
// reconstruction trace, and the non-fatal diagnostic channel.
//
// All callbacks run synchronously on the calling thread at defined
// granularities (per block while fingerprinting, every 10·B bytes while
// matching, per record while applying). The engine never assumes a
// callback returns promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Byte accounting carried by patch-phase progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStats {
    /// Source bytes the matcher has consumed.
    pub bytes_processed: u64,
    /// Matched destination blocks so far.
    pub matches_found: u64,
    /// `matches_found · block_size` — bytes the destination already holds.
    pub bytes_matched: u64,
    /// Literal bytes queued for the wire so far.
    pub bytes_sent: u64,
}

/// A progress report from one of the three phases.
///
/// Within a single operation, `percent()` is non-decreasing and the final
/// event always reports 100.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Fingerprint {
        blocks_processed: u64,
        total_blocks: u64,
        percent: u8,
    },
    Patch {
        bytes_processed: u64,
        total_bytes: u64,
        percent: u8,
        matches_found: u64,
        patches_created: u64,
        stats: TransferStats,
    },
    Apply {
        records_applied: u64,
        total_records: u64,
        percent: u8,
    },
}

impl ProgressEvent {
    /// Completion percentage, `0..=100`.
    pub fn percent(&self) -> u8 {
        match *self {
            Self::Fingerprint { percent, .. }
            | Self::Patch { percent, .. }
            | Self::Apply { percent, .. } => percent,
        }
    }
}

/// Integer percentage of `done` over `total`; an empty `total` is complete.
pub(crate) fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        100
    } else {
        ((done.min(total) * 100) / total) as u8
    }
}

// ---------------------------------------------------------------------------
// Reconstruction trace
// ---------------------------------------------------------------------------

/// Where one span of reconstructed output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    /// Copied out of the destination buffer.
    Matched,
    /// Inserted from a patch record's literal bytes.
    Patch,
}

/// One span appended to the output during patch replay, in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockApplied {
    /// Destination block index for matched spans, `None` for literals.
    pub block_index: Option<u32>,
    pub source: BlockSource,
    /// Bytes appended.
    pub size: usize,
}

// ---------------------------------------------------------------------------
// Diagnostics (non-fatal)
// ---------------------------------------------------------------------------

/// Non-fatal warnings from the fingerprint builder's block-size policy.
/// These never abort an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// The requested block size exceeded the data length and was reduced.
    BlockSizeClamped { requested: u32, clamped: u32 },
    /// The block size is below the recommended minimum for this data size.
    BlockSizeBelowRecommended { block_size: u32, data_len: u64 },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::BlockSizeClamped { requested, clamped } => write!(
                f,
                "block size {requested} exceeds data length, clamped to {clamped}"
            ),
            Self::BlockSizeBelowRecommended {
                block_size,
                data_len,
            } => write!(
                f,
                "block size {block_size} is below the recommended minimum of 256 for {data_len} bytes of data"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cloneable cancellation token.
///
/// Cancellation is advisory: the running operation observes it at its next
/// checkpoint, raises [`Error::Cancelled`] and discards partial output.
/// Input buffers are never mutated.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    flag: Arc<AtomicBool>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every operation holding a clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Optional capabilities accepted by every engine operation.
///
/// Absent callbacks disable their channel. The borrowed lifetime lets
/// callbacks capture caller state without `'static` gymnastics.
#[derive(Default)]
pub struct SyncOptions<'a> {
    /// Phase progress sink.
    pub on_progress: Option<Box<dyn FnMut(&ProgressEvent) + 'a>>,
    /// Replay trace sink, consulted only by the applicator.
    pub on_block_applied: Option<Box<dyn FnMut(&BlockApplied) + 'a>>,
    /// Non-fatal warning sink.
    pub on_diagnostic: Option<Box<dyn FnMut(&Diagnostic) + 'a>>,
    /// Cancellation token.
    pub signal: Option<Signal>,
}

impl<'a> SyncOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn emit_progress(&mut self, event: ProgressEvent) {
        if let Some(cb) = self.on_progress.as_mut() {
            cb(&event);
        }
    }

    pub(crate) fn emit_trace(&mut self, event: BlockApplied) {
        if let Some(cb) = self.on_block_applied.as_mut() {
            cb(&event);
        }
    }

    pub(crate) fn emit_diagnostic(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(%diagnostic, "fingerprint diagnostic");
        if let Some(cb) = self.on_diagnostic.as_mut() {
            cb(&diagnostic);
        }
    }

    /// Error out if the caller has requested cancellation.
    pub(crate) fn check_cancelled(&self) -> Result<(), Error> {
        match &self.signal {
            Some(signal) if signal.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for SyncOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_block_applied", &self.on_block_applied.is_some())
            .field("on_diagnostic", &self.on_diagnostic.is_some())
            .field("signal", &self.signal)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
