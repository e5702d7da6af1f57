// Checksum kernel for the delta engine.
//
// This module provides:
// - The weak Adler-family rolling checksum (mod 65536) and its O(1) roll
// - The 128-bit strong block digest, viewed as four 32-bit lanes
// - The 16-bit bucket index over block fingerprints

pub mod index;
pub mod rolling;
pub mod strong;

pub use index::MatchIndex;
pub use rolling::{bucket, weak_checksum, RollingSum};
pub use strong::StrongDigest;
