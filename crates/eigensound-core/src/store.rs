//! Editable operator storage with an optional Hermitian constraint.
//!
//! [`MatrixStore`] owns the square matrix `H` the user edits. When the
//! Hermitian flag is on, every write keeps `H = H†` by mirroring the
//! conjugate into the transposed cell, so the solver can take the
//! real-eigenvalue path.
//!
//! Every successful mutation bumps a revision counter. Snapshots carry that
//! revision so consumers can tell whether a published eigensystem is stale.

use crate::error::{CoreError, Result};
use crate::matrix::ComplexMatrix;
use core::fmt;
use core::str::FromStr;
use num_complex::Complex64;

/// Largest supported matrix dimension.
pub const MAX_DIMENSION: usize = 64;

/// Real-part step applied by [`MatrixStore::nudge`] on the diagonal.
pub const DIAGONAL_NUDGE: f64 = -0.05;

/// Real-part step applied by [`MatrixStore::nudge`] off the diagonal.
pub const COUPLING_NUDGE: f64 = 0.1;

/// Coupling strength used by the built-in band presets.
const FACTORY_COUPLING: f64 = 0.5;

/// Built-in matrix layouts, parameterized only by dimension.
///
/// The diagonal entries follow `-0.1 + 1.5(k+1)i`, a slowly decaying ladder
/// of evenly spaced frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactoryPreset {
    /// Uncoupled ladder.
    #[default]
    Diagonal,
    /// Ladder plus nearest-neighbour coupling.
    Tridiagonal,
    /// Tridiagonal plus a wrap-around coupling between the first and last mode.
    Circulant,
}

impl FactoryPreset {
    /// All presets in display order.
    pub const ALL: [FactoryPreset; 3] = [Self::Diagonal, Self::Tridiagonal, Self::Circulant];

    /// Lowercase name used by configuration files and the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Self::Diagonal => "diagonal",
            Self::Tridiagonal => "tridiagonal",
            Self::Circulant => "circulant",
        }
    }

    /// Diagonal value of mode `k`.
    pub fn ladder(k: usize) -> Complex64 {
        Complex64::new(-0.1, 1.5 * (k + 1) as f64)
    }
}

impl fmt::Display for FactoryPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FactoryPreset {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diagonal" | "diag" => Ok(Self::Diagonal),
            "tridiagonal" | "tri" => Ok(Self::Tridiagonal),
            "circulant" | "circ" => Ok(Self::Circulant),
            other => Err(format!(
                "unknown preset '{other}' (expected diagonal, tridiagonal or circulant)"
            )),
        }
    }
}

/// Immutable copy of the store state, safe to hand to another thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSnapshot {
    matrix: ComplexMatrix,
    hermitian: bool,
    revision: u64,
}

impl MatrixSnapshot {
    /// The captured matrix.
    pub fn matrix(&self) -> &ComplexMatrix {
        &self.matrix
    }

    /// Whether the Hermitian flag was on at capture time.
    pub fn hermitian(&self) -> bool {
        self.hermitian
    }

    /// Store revision at capture time.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Matrix dimension.
    pub fn dimension(&self) -> usize {
        self.matrix.rows()
    }
}

/// The editable operator `H`.
///
/// Created as the identity with the Hermitian flag off.
///
/// ## Example
///
/// ```rust
/// use eigensound_core::{MatrixStore, Complex64};
///
/// let mut store = MatrixStore::new(3).unwrap();
/// store.set_hermitian(true);
/// store.set(0, 1, Complex64::new(0.0, 1.0)).unwrap();
/// assert_eq!(store.get(1, 0).unwrap(), Complex64::new(0.0, -1.0));
/// ```
#[derive(Debug, Clone)]
pub struct MatrixStore {
    matrix: ComplexMatrix,
    hermitian: bool,
    revision: u64,
}

impl MatrixStore {
    /// Creates an `n x n` identity store.
    pub fn new(n: usize) -> Result<Self> {
        check_dimension(n)?;
        Ok(Self {
            matrix: ComplexMatrix::identity(n),
            hermitian: false,
            revision: 0,
        })
    }

    /// Current dimension.
    pub fn dimension(&self) -> usize {
        self.matrix.rows()
    }

    /// Whether writes are kept Hermitian.
    pub fn hermitian(&self) -> bool {
        self.hermitian
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Borrow the live matrix.
    pub fn matrix(&self) -> &ComplexMatrix {
        &self.matrix
    }

    /// Reallocates to the `n x n` identity.
    ///
    /// The revision always bumps, so any eigensystem solved before the call
    /// is stale even when `n` equals the current dimension.
    pub fn resize(&mut self, n: usize) -> Result<()> {
        check_dimension(n)?;
        self.matrix = ComplexMatrix::identity(n);
        self.bump();
        Ok(())
    }

    /// Reads one entry.
    pub fn get(&self, i: usize, j: usize) -> Result<Complex64> {
        self.check_index(i, j)?;
        Ok(self.matrix[(i, j)])
    }

    /// Writes one entry.
    ///
    /// With the Hermitian flag on, `H[j][i]` becomes `conj(z)` and a diagonal
    /// write keeps only the real part. Out-of-range coordinates and
    /// non-finite values are rejected without touching the matrix.
    pub fn set(&mut self, i: usize, j: usize, z: Complex64) -> Result<()> {
        self.check_index(i, j)?;
        if !z.re.is_finite() || !z.im.is_finite() {
            return Err(CoreError::NonFinite { row: i, col: j });
        }
        self.write(i, j, z);
        self.bump();
        Ok(())
    }

    /// Adds `delta` to one entry, with the same mirroring rules as [`set`](Self::set).
    pub fn adjust(&mut self, i: usize, j: usize, delta: Complex64) -> Result<()> {
        let current = self.get(i, j)?;
        self.set(i, j, current + delta)
    }

    /// Applies the fixed edit step used by pointer interaction: diagonal cells
    /// gain damping, off-diagonal cells gain coupling.
    pub fn nudge(&mut self, i: usize, j: usize) -> Result<()> {
        let step = if i == j { DIAGONAL_NUDGE } else { COUPLING_NUDGE };
        self.adjust(i, j, Complex64::new(step, 0.0))
    }

    /// Sets the Hermitian flag.
    ///
    /// Enabling it replaces `H` with its Hermitian part `(H + H†) / 2`.
    pub fn set_hermitian(&mut self, on: bool) {
        if on == self.hermitian {
            return;
        }
        self.hermitian = on;
        if on {
            self.matrix = self.matrix.hermitian_part();
            for k in 0..self.dimension() {
                self.matrix[(k, k)].im = 0.0;
            }
        }
        self.bump();
    }

    /// Replaces `H` with a diagonal matrix; the dimension becomes `d.len()`.
    pub fn load_diagonal(&mut self, d: &[Complex64]) -> Result<()> {
        check_dimension(d.len())?;
        check_finite(d)?;
        self.matrix = ComplexMatrix::from_diagonal(d);
        self.enforce_hermitian();
        self.bump();
        Ok(())
    }

    /// Replaces `H` with `d` on the diagonal and `off` on both neighbouring
    /// bands.
    ///
    /// The super-diagonal takes `off`; the sub-diagonal takes `conj(off)`
    /// when the Hermitian flag is on and `off` otherwise.
    pub fn load_tridiagonal(&mut self, d: &[Complex64], off: &[Complex64]) -> Result<()> {
        self.load_tridiagonal_bands(d, off, off)
    }

    /// Replaces `H` with explicit diagonal, super-diagonal and sub-diagonal
    /// bands.
    ///
    /// `upper` and `lower` hold `n - 1` entries each. `lower` is ignored when
    /// the Hermitian flag is on; the conjugate of `upper` is mirrored instead.
    pub fn load_tridiagonal_bands(
        &mut self,
        d: &[Complex64],
        upper: &[Complex64],
        lower: &[Complex64],
    ) -> Result<()> {
        let n = d.len();
        check_dimension(n)?;
        let bands = n - 1;
        for band in [upper, lower] {
            if band.len() != bands {
                return Err(CoreError::DimensionMismatch {
                    expected: bands,
                    found: band.len(),
                });
            }
        }
        check_finite(d)?;
        check_finite(upper)?;
        check_finite(lower)?;

        let mut m = ComplexMatrix::from_diagonal(d);
        for k in 0..bands {
            m[(k, k + 1)] = upper[k];
            m[(k + 1, k)] = lower[k];
        }
        self.matrix = m;
        self.enforce_hermitian();
        self.bump();
        Ok(())
    }

    /// Replaces `H` with the circulant matrix whose first row is `row`:
    /// `H[k][j] = row[(j - k) mod n]`.
    pub fn load_circulant(&mut self, row: &[Complex64]) -> Result<()> {
        let n = row.len();
        check_dimension(n)?;
        check_finite(row)?;
        self.matrix = ComplexMatrix::from_fn(n, n, |k, j| row[(j + n - k) % n]);
        self.enforce_hermitian();
        self.bump();
        Ok(())
    }

    /// Loads one of the built-in layouts at dimension `n`.
    ///
    /// Couplings sit on the super-diagonal (and the `(0, n - 1)` corner for
    /// [`FactoryPreset::Circulant`]); the lower triangle is only populated by
    /// Hermitian mirroring.
    pub fn load_factory(&mut self, preset: FactoryPreset, n: usize) -> Result<()> {
        check_dimension(n)?;
        let d: Vec<Complex64> = (0..n).map(FactoryPreset::ladder).collect();
        let coupling = Complex64::new(FACTORY_COUPLING, 0.0);
        let mut m = ComplexMatrix::from_diagonal(&d);
        if preset != FactoryPreset::Diagonal {
            for k in 0..n - 1 {
                m[(k, k + 1)] = coupling;
            }
        }
        if preset == FactoryPreset::Circulant && n > 2 {
            m[(0, n - 1)] = coupling;
        }
        self.matrix = m;
        self.enforce_hermitian();
        self.bump();
        Ok(())
    }

    /// Captures the current state.
    pub fn snapshot(&self) -> MatrixSnapshot {
        MatrixSnapshot {
            matrix: self.matrix.clone(),
            hermitian: self.hermitian,
            revision: self.revision,
        }
    }

    fn write(&mut self, i: usize, j: usize, z: Complex64) {
        if !self.hermitian {
            self.matrix[(i, j)] = z;
        } else if i == j {
            self.matrix[(i, i)] = Complex64::new(z.re, 0.0);
        } else {
            self.matrix[(i, j)] = z;
            self.matrix[(j, i)] = z.conj();
        }
    }

    /// Mirrors the upper triangle onto the lower one and zeroes the imaginary
    /// part of the diagonal when the Hermitian flag is on.
    fn enforce_hermitian(&mut self) {
        if !self.hermitian {
            return;
        }
        let n = self.dimension();
        for r in 0..n {
            self.matrix[(r, r)].im = 0.0;
            for c in r + 1..n {
                self.matrix[(c, r)] = self.matrix[(r, c)].conj();
            }
        }
    }

    fn check_index(&self, i: usize, j: usize) -> Result<()> {
        let n = self.dimension();
        if i >= n || j >= n {
            return Err(CoreError::IndexOutOfRange {
                row: i,
                col: j,
                dimension: n,
            });
        }
        Ok(())
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

fn check_dimension(n: usize) -> Result<()> {
    if n == 0 || n > MAX_DIMENSION {
        return Err(CoreError::InvalidDimension {
            requested: n,
            max: MAX_DIMENSION,
        });
    }
    Ok(())
}

fn check_finite(values: &[Complex64]) -> Result<()> {
    match values
        .iter()
        .position(|z| !z.re.is_finite() || !z.im.is_finite())
    {
        Some(k) => Err(CoreError::NonFinite { row: k, col: k }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn new_is_identity_non_hermitian() {
        let store = MatrixStore::new(4).unwrap();
        assert!(!store.hermitian());
        assert_eq!(store.matrix(), &ComplexMatrix::identity(4));
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert!(matches!(
            MatrixStore::new(0),
            Err(CoreError::InvalidDimension { requested: 0, .. })
        ));
        assert!(MatrixStore::new(MAX_DIMENSION + 1).is_err());
        assert!(MatrixStore::new(MAX_DIMENSION).is_ok());
    }

    #[test]
    fn set_mirrors_when_hermitian() {
        let mut store = MatrixStore::new(3).unwrap();
        store.set_hermitian(true);
        store.set(0, 2, c(0.3, -0.7)).unwrap();
        assert_eq!(store.get(0, 2).unwrap(), c(0.3, -0.7));
        assert_eq!(store.get(2, 0).unwrap(), c(0.3, 0.7));
    }

    #[test]
    fn diagonal_write_drops_imaginary_when_hermitian() {
        let mut store = MatrixStore::new(2).unwrap();
        store.set_hermitian(true);
        store.set(1, 1, c(2.0, 5.0)).unwrap();
        assert_eq!(store.get(1, 1).unwrap(), c(2.0, 0.0));
    }

    #[test]
    fn set_without_hermitian_leaves_transpose_alone() {
        let mut store = MatrixStore::new(3).unwrap();
        store.set(0, 1, c(1.0, 1.0)).unwrap();
        assert_eq!(store.get(1, 0).unwrap(), Complex64::ZERO);
    }

    #[test]
    fn out_of_range_write_is_rejected_and_harmless() {
        let mut store = MatrixStore::new(3).unwrap();
        let before = store.snapshot();
        let err = store.set(3, 0, Complex64::ONE).unwrap_err();
        assert_eq!(
            err,
            CoreError::IndexOutOfRange {
                row: 3,
                col: 0,
                dimension: 3
            }
        );
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn non_finite_write_is_rejected() {
        let mut store = MatrixStore::new(2).unwrap();
        assert!(store.set(0, 0, c(f64::NAN, 0.0)).is_err());
        assert_eq!(store.get(0, 0).unwrap(), Complex64::ONE);
    }

    #[test]
    fn enabling_hermitian_takes_hermitian_part() {
        let mut store = MatrixStore::new(2).unwrap();
        store.set(0, 1, c(2.0, 0.0)).unwrap();
        store.set_hermitian(true);
        assert_eq!(store.get(0, 1).unwrap(), c(1.0, 0.0));
        assert_eq!(store.get(1, 0).unwrap(), c(1.0, 0.0));
        assert!(store.matrix().is_hermitian(0.0));
    }

    #[test]
    fn load_diagonal_adopts_length() {
        let mut store = MatrixStore::new(2).unwrap();
        store
            .load_diagonal(&[c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0), c(4.0, 0.0)])
            .unwrap();
        assert_eq!(store.dimension(), 4);
        assert_eq!(store.get(3, 3).unwrap(), c(4.0, 0.0));
        assert_eq!(store.get(0, 3).unwrap(), Complex64::ZERO);
    }

    #[test]
    fn tridiagonal_lower_band_follows_flag() {
        let d = [c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0)];
        let off = [c(0.5, 0.25), c(-0.5, 1.0)];

        let mut store = MatrixStore::new(3).unwrap();
        store.load_tridiagonal(&d, &off).unwrap();
        assert_eq!(store.get(0, 1).unwrap(), off[0]);
        assert_eq!(store.get(1, 0).unwrap(), off[0]);
        assert_eq!(store.get(0, 2).unwrap(), Complex64::ZERO);

        store.set_hermitian(true);
        store.load_tridiagonal(&d, &off).unwrap();
        assert_eq!(store.get(1, 0).unwrap(), off[0].conj());
        assert_eq!(store.get(2, 1).unwrap(), off[1].conj());
    }

    #[test]
    fn tridiagonal_checks_band_length() {
        let mut store = MatrixStore::new(3).unwrap();
        let d = [Complex64::ONE; 3];
        let err = store.load_tridiagonal(&d, &[Complex64::ONE]).unwrap_err();
        assert_eq!(
            err,
            CoreError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(store.matrix(), &ComplexMatrix::identity(3));
    }

    #[test]
    fn explicit_bands_may_differ() {
        let mut store = MatrixStore::new(3).unwrap();
        let d = [Complex64::ONE; 3];
        store
            .load_tridiagonal_bands(&d, &[c(1.0, 0.0); 2], &[c(-1.0, 0.0); 2])
            .unwrap();
        assert_eq!(store.get(0, 1).unwrap(), c(1.0, 0.0));
        assert_eq!(store.get(2, 1).unwrap(), c(-1.0, 0.0));

        store.set_hermitian(true);
        store
            .load_tridiagonal_bands(&d, &[c(1.0, 2.0); 2], &[c(-1.0, 0.0); 2])
            .unwrap();
        assert_eq!(store.get(2, 1).unwrap(), c(1.0, -2.0));
    }

    #[test]
    fn circulant_rows_are_rotations() {
        let row = [c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0)];
        let mut store = MatrixStore::new(1).unwrap();
        store.load_circulant(&row).unwrap();
        assert_eq!(store.get(1, 0).unwrap(), c(3.0, 0.0));
        assert_eq!(store.get(1, 1).unwrap(), c(1.0, 0.0));
        assert_eq!(store.get(2, 0).unwrap(), c(2.0, 0.0));
    }

    #[test]
    fn resize_resets_to_identity() {
        let mut store = MatrixStore::new(2).unwrap();
        store.set(0, 1, c(7.0, 0.0)).unwrap();
        let before = store.revision();
        store.resize(4).unwrap();
        assert_eq!(store.matrix(), &ComplexMatrix::identity(4));
        assert!(store.revision() > before);
        assert!(store.resize(0).is_err());
        assert_eq!(store.dimension(), 4);
    }

    #[test]
    fn nudge_steps() {
        let mut store = MatrixStore::new(2).unwrap();
        store.nudge(0, 0).unwrap();
        store.nudge(0, 1).unwrap();
        assert!((store.get(0, 0).unwrap().re - 0.95).abs() < 1e-12);
        assert!((store.get(0, 1).unwrap().re - 0.1).abs() < 1e-12);
    }

    #[test]
    fn revision_bumps_on_mutation_only() {
        let mut store = MatrixStore::new(2).unwrap();
        let r0 = store.revision();
        store.set(0, 0, c(2.0, 0.0)).unwrap();
        assert_eq!(store.revision(), r0 + 1);
        let _ = store.set(5, 5, Complex64::ONE);
        assert_eq!(store.revision(), r0 + 1);
    }

    #[test]
    fn factory_presets() {
        let mut store = MatrixStore::new(1).unwrap();
        store.load_factory(FactoryPreset::Circulant, 4).unwrap();
        assert_eq!(store.dimension(), 4);
        assert_eq!(store.get(2, 2).unwrap(), c(-0.1, 4.5));
        assert_eq!(store.get(0, 3).unwrap(), c(0.5, 0.0));
        assert_eq!(store.get(3, 0).unwrap(), Complex64::ZERO);
        assert_eq!(store.get(2, 1).unwrap(), Complex64::ZERO);

        store.set_hermitian(true);
        store.load_factory(FactoryPreset::Tridiagonal, 3).unwrap();
        assert_eq!(store.get(1, 0).unwrap(), c(0.5, 0.0));
        assert_eq!(store.get(1, 1).unwrap(), c(-0.1, 0.0));

        for preset in FactoryPreset::ALL {
            assert_eq!(preset.name().parse::<FactoryPreset>().unwrap(), preset);
        }
        assert!("bogus".parse::<FactoryPreset>().is_err());
    }
}
