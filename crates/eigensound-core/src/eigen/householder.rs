//! Unitary reduction to upper Hessenberg form.
//!
//! Applied to a Hermitian matrix the same reduction yields a Hermitian
//! tridiagonal matrix, so both solver paths share it.

use crate::matrix::ComplexMatrix;
use num_complex::Complex64;

/// Reduces `a` in place to upper Hessenberg form `Q† A Q`.
pub(crate) fn reduce(a: &mut ComplexMatrix) {
    reduce_inner(a, None);
}

/// Reduces `a` in place and returns the unitary `Q` with `A = Q H Q†`.
pub(crate) fn reduce_with_transform(a: &mut ComplexMatrix) -> ComplexMatrix {
    let mut q = ComplexMatrix::identity(a.rows());
    reduce_inner(a, Some(&mut q));
    q
}

fn reduce_inner(a: &mut ComplexMatrix, mut q: Option<&mut ComplexMatrix>) {
    let n = a.rows();
    let mut v: Vec<Complex64> = Vec::with_capacity(n);

    for k in 0..n.saturating_sub(2) {
        let tail: f64 = (k + 2..n).map(|i| a[(i, k)].norm_sqr()).sum();
        if tail == 0.0 {
            continue;
        }

        // Reflector P = I - 2vv† mapping column k below the diagonal onto alpha·e1.
        let x0 = a[(k + 1, k)];
        let x0_abs = x0.norm();
        let norm = (x0.norm_sqr() + tail).sqrt();
        let phase = if x0_abs > 0.0 {
            x0 / x0_abs
        } else {
            Complex64::ONE
        };
        let alpha = -phase * norm;

        v.clear();
        v.push(x0 - alpha);
        v.extend((k + 2..n).map(|i| a[(i, k)]));
        let v_norm = v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
        if v_norm == 0.0 {
            continue;
        }
        for z in &mut v {
            *z /= v_norm;
        }

        reflect_rows(a, &v, k + 1, k);
        reflect_cols(a, &v, k + 1);
        if let Some(q) = q.as_deref_mut() {
            reflect_cols(q, &v, k + 1);
        }

        a[(k + 1, k)] = alpha;
        for i in k + 2..n {
            a[(i, k)] = Complex64::ZERO;
        }
    }
}

/// `A ← P A` on rows `offset..`, columns `first_col..`.
fn reflect_rows(a: &mut ComplexMatrix, v: &[Complex64], offset: usize, first_col: usize) {
    for j in first_col..a.cols() {
        let w: Complex64 = v
            .iter()
            .enumerate()
            .map(|(i, vi)| vi.conj() * a[(offset + i, j)])
            .sum();
        for (i, vi) in v.iter().enumerate() {
            a[(offset + i, j)] -= vi * w * 2.0;
        }
    }
}

/// `A ← A P` on columns `offset..`, all rows.
fn reflect_cols(a: &mut ComplexMatrix, v: &[Complex64], offset: usize) {
    for r in 0..a.rows() {
        let s: Complex64 = v
            .iter()
            .enumerate()
            .map(|(j, vj)| a[(r, offset + j)] * vj)
            .sum();
        for (j, vj) in v.iter().enumerate() {
            a[(r, offset + j)] -= s * vj.conj() * 2.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> ComplexMatrix {
        ComplexMatrix::from_fn(n, n, |r, c| {
            Complex64::new(((r * 7 + c * 3) % 5) as f64 - 2.0, ((r + 2 * c) % 3) as f64 - 1.0)
        })
    }

    fn product(a: &ComplexMatrix, b: &ComplexMatrix) -> ComplexMatrix {
        ComplexMatrix::from_fn(a.rows(), b.cols(), |r, c| {
            (0..a.cols()).map(|k| a[(r, k)] * b[(k, c)]).sum()
        })
    }

    #[test]
    fn result_is_hessenberg() {
        let mut a = sample(6);
        reduce(&mut a);
        for r in 0..6_usize {
            for c in 0..r.saturating_sub(1) {
                assert_eq!(a[(r, c)], Complex64::ZERO, "({r}, {c})");
            }
        }
    }

    #[test]
    fn transform_reconstructs_input() {
        let original = sample(5);
        let mut h = original.clone();
        let q = reduce_with_transform(&mut h);
        let rebuilt = product(&product(&q, &h), &q.conjugate_transpose());
        for r in 0..5 {
            for c in 0..5 {
                assert!((rebuilt[(r, c)] - original[(r, c)]).norm() < 1e-12);
            }
        }
    }

    #[test]
    fn hermitian_input_becomes_tridiagonal() {
        let mut a = sample(5).hermitian_part();
        reduce(&mut a);
        for r in 0..5 {
            for c in r + 2..5 {
                assert!(a[(r, c)].norm() < 1e-12, "({r}, {c}) = {}", a[(r, c)]);
            }
        }
    }
}
