//! Eigen-decomposition of the operator `H`.
//!
//! [`EigenSolver::compute`] picks one of two paths:
//!
//! - **Hermitian**: when the snapshot's Hermitian flag is set and the matrix
//!   passes a relative `‖H - H†‖` check, a tridiagonal QL solver returns real
//!   eigenvalues and an orthonormal eigenbasis.
//! - **General**: otherwise, Hessenberg QR yields complex eigenvalues and
//!   inverse iteration recovers unit-norm eigenvectors.
//!
//! Either way the result is sorted by ascending real part (ties by imaginary
//! part) and every eigenvector is phase-normalized so that its first
//! largest-magnitude component is real and positive. Two solves of the same
//! matrix therefore produce identical output.

mod general;
mod hermitian;
mod householder;

use crate::error::{CoreError, Result};
use crate::matrix::ComplexMatrix;
use crate::store::MatrixSnapshot;
use core::cmp::Ordering;
use num_complex::Complex64;

/// Which algorithm produced an [`Eigensystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverPath {
    /// Tridiagonal QL on a verified Hermitian matrix.
    Hermitian,
    /// Hessenberg QR plus inverse iteration.
    General,
}

/// One eigenpair `(λ, v)` with `‖v‖ = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Eigenmode {
    value: Complex64,
    vector: Vec<Complex64>,
}

impl Eigenmode {
    /// The eigenvalue `λ`.
    pub fn value(&self) -> Complex64 {
        self.value
    }

    /// The unit eigenvector `v`.
    pub fn vector(&self) -> &[Complex64] {
        &self.vector
    }

    /// Inner product `⟨v, x⟩ = Σ conj(v_i) x_i`.
    ///
    /// Callers guarantee `x.len()` equals the dimension; extra entries are
    /// ignored and missing ones count as zero.
    pub fn project(&self, x: &[Complex64]) -> Complex64 {
        self.vector.iter().zip(x).map(|(v, xi)| v.conj() * xi).sum()
    }
}

/// Ordered eigenpairs of one matrix revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Eigensystem {
    modes: Vec<Eigenmode>,
    path: SolverPath,
    revision: u64,
}

impl Eigensystem {
    /// Builds an eigensystem from explicit pairs.
    ///
    /// Vectors are normalized and phase-fixed, and pairs are sorted exactly as
    /// the solver does. Every vector must have one entry per pair.
    pub fn from_pairs(pairs: Vec<(Complex64, Vec<Complex64>)>, path: SolverPath) -> Result<Self> {
        let n = pairs.len();
        if n == 0 {
            return Err(CoreError::InvalidDimension {
                requested: 0,
                max: crate::MAX_DIMENSION,
            });
        }
        if let Some((_, bad)) = pairs.iter().find(|(_, v)| v.len() != n) {
            return Err(CoreError::DimensionMismatch {
                expected: n,
                found: bad.len(),
            });
        }
        let modes = pairs
            .into_iter()
            .map(|(value, mut vector)| {
                normalize_phase(&mut vector);
                Eigenmode { value, vector }
            })
            .collect();
        Ok(Self::sorted(modes, path, 0))
    }

    fn sorted(mut modes: Vec<Eigenmode>, path: SolverPath, revision: u64) -> Self {
        modes.sort_by(|a, b| compare_eigenvalues(a.value, b.value));
        Self {
            modes,
            path,
            revision,
        }
    }

    /// Number of modes (equals the matrix dimension).
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Always `false` for solver output; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Modes in sorted order.
    pub fn modes(&self) -> &[Eigenmode] {
        &self.modes
    }

    /// Mode `k`, if in range.
    pub fn mode(&self, k: usize) -> Option<&Eigenmode> {
        self.modes.get(k)
    }

    /// Eigenvalues in sorted order.
    pub fn eigenvalues(&self) -> impl Iterator<Item = Complex64> + '_ {
        self.modes.iter().map(|m| m.value)
    }

    /// Algorithm that produced this result.
    pub fn path(&self) -> SolverPath {
        self.path
    }

    /// Store revision of the solved snapshot (0 for hand-built systems).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns `true` when every eigenvalue and eigenvector entry is finite.
    pub fn is_finite(&self) -> bool {
        self.modes.iter().all(|m| {
            is_finite(m.value) && m.vector.iter().copied().all(is_finite)
        })
    }

    /// Modal amplitudes `a_k = ⟨v_k, x⟩` for every mode.
    pub fn project(&self, x: &[Complex64]) -> Result<Vec<Complex64>> {
        if x.len() != self.len() {
            return Err(CoreError::DimensionMismatch {
                expected: self.len(),
                found: x.len(),
            });
        }
        Ok(self.modes.iter().map(|m| m.project(x)).collect())
    }

    /// Largest `‖H v_k - λ_k v_k‖` over all modes.
    pub fn max_residual(&self, h: &ComplexMatrix) -> Result<f64> {
        let mut worst: f64 = 0.0;
        for mode in &self.modes {
            let hv = h.mul_vec(&mode.vector)?;
            let r = hv
                .iter()
                .zip(&mode.vector)
                .map(|(a, b)| (a - b * mode.value).norm_sqr())
                .sum::<f64>()
                .sqrt();
            worst = worst.max(r);
        }
        Ok(worst)
    }

    /// Largest `|⟨v_i, v_j⟩ - δ_ij|` over all pairs.
    pub fn orthonormality_error(&self) -> f64 {
        let mut worst: f64 = 0.0;
        for (i, a) in self.modes.iter().enumerate() {
            for (j, b) in self.modes.iter().enumerate() {
                let dot = a.project(&b.vector);
                let target = if i == j { Complex64::ONE } else { Complex64::ZERO };
                worst = worst.max((dot - target).norm());
            }
        }
        worst
    }
}

/// Solver tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// QR/QL iterations allowed per eigenvalue before reporting
    /// [`CoreError::NonConvergence`].
    pub max_iterations_per_eigenvalue: usize,
    /// Relative tolerance for accepting a flagged matrix as Hermitian.
    pub hermitian_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations_per_eigenvalue: 30,
            hermitian_tolerance: 1e-9,
        }
    }
}

/// Deterministic eigen-decomposition of square complex matrices.
///
/// ## Example
///
/// ```rust
/// use eigensound_core::{Complex64, EigenSolver, MatrixStore};
///
/// let mut store = MatrixStore::new(2).unwrap();
/// store.load_diagonal(&[Complex64::new(3.0, 0.0), Complex64::new(-1.0, 0.0)]).unwrap();
/// let system = EigenSolver::new().compute(&store.snapshot()).unwrap();
/// assert_eq!(system.mode(0).unwrap().value(), Complex64::new(-1.0, 0.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EigenSolver {
    config: SolverConfig,
}

impl EigenSolver {
    /// Solver with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Solver with explicit settings.
    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Current settings.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Decomposes a store snapshot.
    pub fn compute(&self, snapshot: &MatrixSnapshot) -> Result<Eigensystem> {
        let mut system = self.compute_matrix(snapshot.matrix(), snapshot.hermitian())?;
        system.revision = snapshot.revision();
        Ok(system)
    }

    /// Decomposes `h`, using the Hermitian path when `hermitian` is set and
    /// the matrix actually is Hermitian within tolerance.
    pub fn compute_matrix(&self, h: &ComplexMatrix, hermitian: bool) -> Result<Eigensystem> {
        if !h.is_square() {
            return Err(CoreError::DimensionMismatch {
                expected: h.rows(),
                found: h.cols(),
            });
        }
        if h.rows() == 0 {
            return Err(CoreError::InvalidDimension {
                requested: 0,
                max: crate::MAX_DIMENSION,
            });
        }
        if let Some((row, col)) = h.first_non_finite() {
            return Err(CoreError::NonFinite { row, col });
        }

        let max_iterations = self.config.max_iterations_per_eigenvalue;
        let use_hermitian = hermitian && h.is_hermitian(self.config.hermitian_tolerance);
        if hermitian && !use_hermitian {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                defect = h.hermitian_defect(),
                "matrix flagged Hermitian failed verification, using general solver"
            );
        }

        let mut modes: Vec<Eigenmode> = if use_hermitian {
            hermitian::solve(h, max_iterations)?
                .into_iter()
                .map(|(value, vector)| Eigenmode {
                    value: Complex64::new(value, 0.0),
                    vector,
                })
                .collect()
        } else {
            let values = general::eigenvalues(h, max_iterations)?;
            let vectors = general::eigenvectors(h, &values)?;
            values
                .into_iter()
                .zip(vectors)
                .map(|(value, vector)| Eigenmode { value, vector })
                .collect()
        };

        for mode in &mut modes {
            normalize_phase(&mut mode.vector);
        }
        let path = if use_hermitian {
            SolverPath::Hermitian
        } else {
            SolverPath::General
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(dimension = h.rows(), ?path, "eigensystem computed");

        Ok(Eigensystem::sorted(modes, path, 0))
    }
}

/// Ascending real part, ties broken by ascending imaginary part.
fn compare_eigenvalues(a: Complex64, b: Complex64) -> Ordering {
    a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im))
}

/// Scales `v` to unit norm and rotates it so the first component of maximal
/// magnitude is real and positive.
fn normalize_phase(v: &mut [Complex64]) {
    let mut pivot = Complex64::ZERO;
    let mut best = 0.0;
    for &z in v.iter() {
        let mag = z.norm();
        if mag > best {
            best = mag;
            pivot = z;
        }
    }
    let len = v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
    if best == 0.0 || len == 0.0 {
        return;
    }
    let rotate = pivot.conj() / (best * len);
    for z in v.iter_mut() {
        *z *= rotate;
    }
}

fn is_finite(z: Complex64) -> bool {
    z.re.is_finite() && z.im.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn phase_normalization_makes_pivot_positive() {
        let mut v = vec![c(0.0, 0.3), c(0.0, -2.0), c(1.0, 1.0)];
        normalize_phase(&mut v);
        assert!(v[1].im.abs() < 1e-15);
        assert!(v[1].re > 0.0);
        let len: f64 = v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
        assert!((len - 1.0).abs() < 1e-12);
    }

    #[test]
    fn phase_normalization_picks_first_of_ties() {
        let mut v = vec![c(0.0, 1.0), c(1.0, 0.0)];
        normalize_phase(&mut v);
        assert!(v[0].re > 0.0 && v[0].im.abs() < 1e-15);
    }

    #[test]
    fn ordering_breaks_ties_on_imaginary() {
        let mut values = vec![c(1.0, 2.0), c(0.0, 5.0), c(1.0, -3.0), c(-1.0, 0.0)];
        values.sort_by(|a, b| compare_eigenvalues(*a, *b));
        assert_eq!(values, vec![c(-1.0, 0.0), c(0.0, 5.0), c(1.0, -3.0), c(1.0, 2.0)]);
    }

    #[test]
    fn one_by_one() {
        let h = ComplexMatrix::from_diagonal(&[c(0.5, -2.0)]);
        let system = EigenSolver::new().compute_matrix(&h, false).unwrap();
        assert_eq!(system.len(), 1);
        assert_eq!(system.modes()[0].value(), c(0.5, -2.0));
        assert_eq!(system.modes()[0].vector(), &[Complex64::ONE]);
    }

    #[test]
    fn rejects_non_square_and_non_finite() {
        let solver = EigenSolver::new();
        let wide = ComplexMatrix::zeros(2, 3);
        assert!(matches!(
            solver.compute_matrix(&wide, false),
            Err(CoreError::DimensionMismatch { .. })
        ));
        let mut bad = ComplexMatrix::identity(2);
        bad[(1, 0)] = c(f64::INFINITY, 0.0);
        assert_eq!(
            solver.compute_matrix(&bad, false),
            Err(CoreError::NonFinite { row: 1, col: 0 })
        );
    }

    #[test]
    fn unverified_hermitian_flag_falls_back_to_general() {
        let h = ComplexMatrix::from_rows(&[
            vec![c(1.0, 0.0), c(1.0, 0.0)],
            vec![c(0.0, 0.0), c(2.0, 0.0)],
        ])
        .unwrap();
        let system = EigenSolver::new().compute_matrix(&h, true).unwrap();
        assert_eq!(system.path(), SolverPath::General);
    }

    #[test]
    fn from_pairs_sorts_and_validates() {
        let system = Eigensystem::from_pairs(
            vec![
                (c(2.0, 0.0), vec![Complex64::ONE, Complex64::ZERO]),
                (c(-2.0, 0.0), vec![Complex64::ZERO, c(0.0, 3.0)]),
            ],
            SolverPath::General,
        )
        .unwrap();
        assert_eq!(system.mode(0).unwrap().value(), c(-2.0, 0.0));
        let v = system.mode(0).unwrap().vector();
        assert_eq!(v[0], Complex64::ZERO);
        assert!((v[1] - Complex64::ONE).norm() < 1e-15);

        assert!(Eigensystem::from_pairs(
            vec![(Complex64::ONE, vec![Complex64::ONE, Complex64::ZERO])],
            SolverPath::General
        )
        .is_err());
    }

    #[test]
    fn project_checks_length() {
        let h = ComplexMatrix::identity(3);
        let system = EigenSolver::new().compute_matrix(&h, true).unwrap();
        assert!(system.project(&[Complex64::ONE]).is_err());
        assert_eq!(system.project(&[Complex64::ONE; 3]).unwrap().len(), 3);
    }
}
