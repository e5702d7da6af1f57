// Unified error type for the delta engine.
//
// Every operation aborts on the first error; nothing is recovered
// internally. Non-fatal conditions (block-size warnings) travel on the
// diagnostic channel in `progress`, never through this enum.

/// Errors produced by fingerprinting, patch construction, replay and merge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Block size outside the supported range (1..=1_048_576).
    #[error("Block size must be between 1 and 1048576, got {block_size}")]
    InvalidBlockSize { block_size: u64 },

    /// Merge called with no input documents.
    #[error("At least one fingerprint document required")]
    Empty,

    /// Merge inputs disagree on block size.
    #[error("All fingerprint documents must have the same block size: expected {expected}, found {found}")]
    BlockSizeMismatch { expected: u32, found: u32 },

    /// A fingerprint document failed structural validation.
    #[error("Corrupt fingerprint document: {reason}")]
    CorruptFingerprint { reason: String },

    /// A patch document failed structural validation, or a matched block
    /// index does not exist in the destination.
    #[error("Corrupt patch document: {reason}")]
    CorruptPatch { reason: String },

    /// The cancellation signal fired mid-operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn corrupt_fingerprint(reason: impl Into<String>) -> Self {
        Self::CorruptFingerprint {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt_patch(reason: impl Into<String>) -> Self {
        Self::CorruptPatch {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        let e = Error::InvalidBlockSize { block_size: 0 };
        assert_eq!(
            e.to_string(),
            "Block size must be between 1 and 1048576, got 0"
        );

        assert_eq!(
            Error::Empty.to_string(),
            "At least one fingerprint document required"
        );
        assert_eq!(Error::Cancelled.to_string(), "Operation cancelled");

        let e = Error::BlockSizeMismatch {
            expected: 512,
            found: 1024,
        };
        assert!(e.to_string().contains("same block size"));
    }
}
