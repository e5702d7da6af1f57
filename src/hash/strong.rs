// Strong block digest.
//
// 128 bits, held as four little-endian 32-bit lanes and compared for
// bit-exact equality. The concrete algorithm (MD5) is a build-time
// constant shared by both peers; the engine only requires a fixed-width
// digest with adequate collision resistance, and nothing on the wire
// identifies the algorithm.

use md5::{Digest, Md5};

/// A block's 128-bit digest as four little-endian 32-bit lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrongDigest(pub [u32; 4]);

impl StrongDigest {
    /// Digest a block of bytes.
    pub fn compute(block: &[u8]) -> Self {
        let raw: [u8; 16] = Md5::digest(block).into();
        Self::from_bytes(&raw)
    }

    /// Reassemble from 16 wire bytes.
    #[inline]
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        let mut lanes = [0u32; 4];
        for (lane, chunk) in lanes.iter_mut().zip(bytes.chunks_exact(4)) {
            *lane = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self(lanes)
    }

    /// The 16-byte wire representation.
    #[inline]
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (chunk, lane) in out.chunks_exact_mut(4).zip(self.0) {
            chunk.copy_from_slice(&lane.to_le_bytes());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
