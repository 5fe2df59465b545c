//! Dense complex matrix storage.
//!
//! [`ComplexMatrix`] is a row-major grid of [`Complex64`] values. It is the
//! value type shared by the store, the solver and the test suites; editing
//! invariants (Hermitian mirroring, presets) live in
//! [`MatrixStore`](crate::MatrixStore), not here.

use crate::error::{CoreError, Result};
use core::ops::{Index, IndexMut};
use num_complex::Complex64;

/// Row-major dense complex matrix.
///
/// Shapes need not be square; the solver rejects non-square input with
/// [`CoreError::DimensionMismatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
}

impl ComplexMatrix {
    /// Creates a `rows x cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Complex64::ZERO; rows * cols],
        }
    }

    /// Creates the `n x n` identity.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = Complex64::ONE;
        }
        m
    }

    /// Creates a square matrix with `values` on the diagonal.
    pub fn from_diagonal(values: &[Complex64]) -> Self {
        let n = values.len();
        let mut m = Self::zeros(n, n);
        for (i, &v) in values.iter().enumerate() {
            m[(i, i)] = v;
        }
        m
    }

    /// Creates a matrix by evaluating `f(row, col)` for every entry.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> Complex64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    /// Creates a matrix from a list of rows.
    ///
    /// Ragged input fails with [`CoreError::DimensionMismatch`].
    pub fn from_rows(rows: &[Vec<Complex64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(CoreError::DimensionMismatch {
                    expected: cols,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `true` when rows == cols.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Entry at `(row, col)`, or `None` when out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<Complex64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    /// Borrow one row.
    pub fn row(&self, row: usize) -> &[Complex64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Raw row-major entries.
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Conjugate transpose `H†`.
    pub fn conjugate_transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |r, c| self[(c, r)].conj())
    }

    /// Hermitian part `(H + H†) / 2`. Only meaningful for square matrices.
    pub fn hermitian_part(&self) -> Self {
        debug_assert!(self.is_square());
        Self::from_fn(self.rows, self.cols, |r, c| {
            (self[(r, c)] + self[(c, r)].conj()) * 0.5
        })
    }

    /// Frobenius norm `sqrt(sum |h_ij|^2)`.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt()
    }

    /// Frobenius norm of `H - H†`.
    pub fn hermitian_defect(&self) -> f64 {
        if !self.is_square() {
            return f64::INFINITY;
        }
        let mut sum = 0.0;
        for r in 0..self.rows {
            for c in 0..self.cols {
                sum += (self[(r, c)] - self[(c, r)].conj()).norm_sqr();
            }
        }
        sum.sqrt()
    }

    /// Returns `true` when `‖H - H†‖ <= tolerance · ‖H‖`.
    ///
    /// The zero matrix is Hermitian for any tolerance.
    pub fn is_hermitian(&self, tolerance: f64) -> bool {
        self.is_square() && self.hermitian_defect() <= tolerance * self.frobenius_norm()
    }

    /// Position of the first NaN or infinite entry, if any.
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.data
            .iter()
            .position(|z| !z.re.is_finite() || !z.im.is_finite())
            .map(|i| (i / self.cols, i % self.cols))
    }

    /// Matrix-vector product `H x`.
    ///
    /// Fails with [`CoreError::DimensionMismatch`] when `x.len() != cols`.
    pub fn mul_vec(&self, x: &[Complex64]) -> Result<Vec<Complex64>> {
        if x.len() != self.cols {
            return Err(CoreError::DimensionMismatch {
                expected: self.cols,
                found: x.len(),
            });
        }
        Ok((0..self.rows)
            .map(|r| self.row(r).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect())
    }
}

impl Index<(usize, usize)> for ComplexMatrix {
    type Output = Complex64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &Complex64 {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for ComplexMatrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Complex64 {
        &mut self.data[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn identity_has_unit_diagonal() {
        let m = ComplexMatrix::identity(3);
        for r in 0..3 {
            for col in 0..3 {
                let expected = if r == col { Complex64::ONE } else { Complex64::ZERO };
                assert_eq!(m[(r, col)], expected);
            }
        }
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows = vec![vec![c(1.0, 0.0), c(2.0, 0.0)], vec![c(3.0, 0.0)]];
        assert_eq!(
            ComplexMatrix::from_rows(&rows),
            Err(CoreError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn hermitian_part_is_hermitian() {
        let m = ComplexMatrix::from_fn(3, 3, |r, col| c(r as f64 + 0.5, col as f64 - 1.0));
        let h = m.hermitian_part();
        assert!(h.is_hermitian(1e-12));
        assert!(!m.is_hermitian(1e-12));
    }

    #[test]
    fn conjugate_transpose_swaps_shape() {
        let m = ComplexMatrix::from_fn(2, 3, |r, col| c(r as f64, col as f64));
        let t = m.conjugate_transpose();
        assert_eq!((t.rows(), t.cols()), (3, 2));
        assert_eq!(t[(2, 1)], c(1.0, -2.0));
    }

    #[test]
    fn first_non_finite_reports_position() {
        let mut m = ComplexMatrix::identity(3);
        m[(1, 2)] = c(f64::NAN, 0.0);
        assert_eq!(m.first_non_finite(), Some((1, 2)));
    }

    #[test]
    fn mul_vec_checks_length() {
        let m = ComplexMatrix::identity(2);
        assert!(m.mul_vec(&[Complex64::ONE]).is_err());
        let y = m.mul_vec(&[c(1.0, 2.0), c(3.0, 4.0)]).unwrap();
        assert_eq!(y, vec![c(1.0, 2.0), c(3.0, 4.0)]);
    }
}
