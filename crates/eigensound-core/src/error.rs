//! Error types for matrix editing and eigen-decomposition.

use thiserror::Error;

/// Errors produced by [`MatrixStore`](crate::MatrixStore) and
/// [`EigenSolver`](crate::EigenSolver).
///
/// Every variant is recoverable: a failed edit leaves the matrix untouched and
/// a failed decomposition leaves the last good [`Eigensystem`](crate::Eigensystem)
/// with whoever holds it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A matrix coordinate lies outside `[0, dimension)`.
    #[error("index ({row}, {col}) out of range for a {dimension}x{dimension} matrix")]
    IndexOutOfRange {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Current matrix dimension.
        dimension: usize,
    },

    /// A vector or band length, or a matrix shape, does not match what the
    /// operation requires.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Length the operation needed.
        expected: usize,
        /// Length that was supplied.
        found: usize,
    },

    /// A matrix dimension of zero or above [`MAX_DIMENSION`](crate::MAX_DIMENSION).
    #[error("invalid matrix dimension {requested} (supported range is 1..={max})")]
    InvalidDimension {
        /// Requested dimension.
        requested: usize,
        /// Largest supported dimension.
        max: usize,
    },

    /// The QR/QL iteration did not isolate an eigenvalue within its
    /// iteration budget (the "singular perturbation" failure).
    #[error("eigenvalue {index} did not converge after {iterations} iterations")]
    NonConvergence {
        /// Index of the trailing eigenvalue being isolated.
        index: usize,
        /// Iterations spent before giving up.
        iterations: usize,
    },

    /// A repeated eigenvalue lacks a full set of eigenvectors, so no
    /// eigenbasis exists (e.g. a Jordan block such as `[[1, c], [0, 1]]`).
    #[error("matrix is defective: eigenvalue {index} has no independent eigenvector")]
    Defective {
        /// Index of the eigenvalue, in deflation order, whose vector failed.
        index: usize,
    },

    /// The matrix contains a NaN or infinite entry.
    #[error("matrix entry ({row}, {col}) is not finite")]
    NonFinite {
        /// Row of the first offending entry.
        row: usize,
        /// Column of the first offending entry.
        col: usize,
    },
}

/// Convenience result type for core operations.
pub type Result<T> = core::result::Result<T, CoreError>;
