//! Synthesis error types.

use eigensound_core::CoreError;
use thiserror::Error;

/// Errors raised while turning an eigensystem and an excitation into voices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// Projection or eigensystem failure (for example a length mismatch).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The excitation vector holds a NaN or infinite entry.
    #[error("excitation entry {index} is not finite")]
    NonFiniteExcitation {
        /// Position of the offending entry.
        index: usize,
    },
}

/// Convenience result type for synthesis operations.
pub type Result<T> = core::result::Result<T, SynthError>;
