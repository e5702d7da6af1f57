//! Rollsync: rsync-family binary deltas over in-memory buffers.
//!
//! A *destination* holder fingerprints its version of some bytes
//! ([`build_fingerprint`]); a *source* holder turns that fingerprint into
//! a patch carrying only what the destination lacks ([`build_patch`]);
//! the destination replays the patch against its local bytes to obtain
//! the source version ([`apply_patch`]). Fingerprints from several
//! destinations can be unioned ([`merge_fingerprints`]) so one patch
//! serves a peer group.
//!
//! The engine is a pure byte transformer: no I/O, no transport, no
//! persisted state. Both documents have stable little-endian wire
//! formats (`to_bytes` / `from_bytes`), so independent implementations
//! interoperate.
//!
//! # Quick Start
//!
//! ```
//! use rollsync::{apply_patch, build_fingerprint, build_patch};
//!
//! let destination = b"the quick brown fox";
//! let source = b"the quick red fox";
//!
//! let fingerprint = build_fingerprint(4, destination).unwrap();
//! let patch = build_patch(&fingerprint, source).unwrap();
//! let rebuilt = apply_patch(&patch, destination).unwrap();
//! assert_eq!(rebuilt, source);
//! ```
//!
//! Progress reporting, cancellation, replay tracing and non-fatal
//! diagnostics are injected per call through [`SyncOptions`] via the
//! `*_with` variants.

pub mod apply;
pub mod delta;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod merge;
pub mod progress;
mod wire;

pub use apply::{apply_patch, apply_patch_with};
pub use delta::{build_patch, build_patch_with, PatchDoc, PatchRecord};
pub use error::Error;
pub use fingerprint::{
    build_fingerprint, build_fingerprint_with, suggest_block_size, BlockFingerprint,
    FingerprintDoc, Origin, MAX_BLOCK_SIZE,
};
pub use merge::merge_fingerprints;
pub use progress::{
    BlockApplied, BlockSource, Diagnostic, ProgressEvent, Signal, SyncOptions, TransferStats,
};
