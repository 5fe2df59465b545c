//! Eigensound Core - complex operators and their eigen-decomposition
//!
//! This crate holds the linear-algebra half of eigensound: a user-editable
//! complex matrix `H` and a deterministic eigen-solver whose output drives the
//! modal synthesizer and the modal filter.
//!
//! # Core Abstractions
//!
//! ## Operator Storage
//!
//! - [`MatrixStore`] - Editable `H` with an optional Hermitian constraint
//! - [`MatrixSnapshot`] - Immutable copy handed to the solver
//! - [`FactoryPreset`] - Built-in diagonal, tridiagonal and circulant layouts
//! - [`ComplexMatrix`] - Dense row-major complex matrix
//!
//! ## Decomposition
//!
//! - [`EigenSolver`] - Hermitian (tridiagonal QL) and general (Hessenberg QR)
//!   paths behind one call
//! - [`Eigensystem`] - Sorted, phase-normalized eigenpairs
//! - [`Eigenmode`] - One `(λ, v)` pair
//!
//! # Example
//!
//! ```rust
//! use eigensound_core::{Complex64, EigenSolver, MatrixStore};
//!
//! let mut store = MatrixStore::new(3).unwrap();
//! store.set_hermitian(true);
//! store
//!     .load_tridiagonal(&[Complex64::new(1.0, 0.0); 3], &[Complex64::new(0.5, 0.0); 2])
//!     .unwrap();
//!
//! let system = EigenSolver::new().compute(&store.snapshot()).unwrap();
//! assert_eq!(system.len(), 3);
//! assert!(system.orthonormality_error() < 1e-10);
//! ```
//!
//! # Design Principles
//!
//! - **Deterministic**: identical input yields bit-identical output
//! - **Fail loudly**: non-convergence, bad indices and non-finite values are
//!   errors, never silent garbage
//! - **Off the audio thread**: solving allocates; only the result crosses
//!   into real-time code

pub mod eigen;
pub mod error;
pub mod matrix;
pub mod store;

pub use eigen::{EigenSolver, Eigenmode, Eigensystem, SolverConfig, SolverPath};
pub use error::{CoreError, Result};
pub use matrix::ComplexMatrix;
pub use num_complex::Complex64;
pub use store::{
    COUPLING_NUDGE, DIAGONAL_NUDGE, FactoryPreset, MAX_DIMENSION, MatrixSnapshot, MatrixStore,
};
