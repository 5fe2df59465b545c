//! Hermitian path: tridiagonalization followed by implicit QL.
//!
//! The Householder reduction leaves a Hermitian tridiagonal matrix with
//! complex off-diagonals. A diagonal phase similarity `D` makes it real
//! symmetric, and the classic implicit-shift QL iteration (`tql2`) finishes
//! the job on reals. Eigenvectors come back as `Q · D · Z`, orthonormal up to
//! rounding, and eigenvalues are exactly real.

use super::householder;
use crate::error::{CoreError, Result};
use crate::matrix::ComplexMatrix;
use num_complex::Complex64;

/// Returns `(eigenvalue, unit eigenvector)` pairs in no particular order.
pub(crate) fn solve(h: &ComplexMatrix, max_iterations: usize) -> Result<Vec<(f64, Vec<Complex64>)>> {
    let n = h.rows();
    let mut a = h.clone();
    let q = householder::reduce_with_transform(&mut a);

    let mut d: Vec<f64> = (0..n).map(|i| a[(i, i)].re).collect();
    let mut e = vec![0.0; n];
    let mut phase = vec![Complex64::ONE; n];
    for i in 0..n.saturating_sub(1) {
        let sub = a[(i + 1, i)];
        let mag = sub.norm();
        e[i] = mag;
        phase[i + 1] = if mag > 0.0 { phase[i] * sub / mag } else { phase[i] };
    }

    let mut z = vec![0.0; n * n];
    for i in 0..n {
        z[i * n + i] = 1.0;
    }
    tql2(&mut d, &mut e, &mut z, max_iterations)?;

    Ok((0..n)
        .map(|k| {
            let vector = (0..n)
                .map(|r| {
                    (0..n)
                        .map(|j| q[(r, j)] * phase[j] * z[j * n + k])
                        .sum::<Complex64>()
                })
                .collect();
            (d[k], vector)
        })
        .collect())
}

/// Implicit QL on a real symmetric tridiagonal matrix.
///
/// `d` holds the diagonal, `e[i]` the coupling between `i` and `i + 1`
/// (`e[n - 1]` is ignored). On return `d` holds eigenvalues and column `k`
/// of the row-major `z` the matching eigenvector, rotated from the input `z`.
fn tql2(d: &mut [f64], e: &mut [f64], z: &mut [f64], max_iterations: usize) -> Result<()> {
    let n = d.len();
    if n < 2 {
        return Ok(());
    }
    e[n - 1] = 0.0;

    let mut f = 0.0;
    let mut tst1: f64 = 0.0;
    for l in 0..n {
        tst1 = tst1.max(d[l].abs() + e[l].abs());
        let mut m = l;
        while m < n - 1 && e[m].abs() > f64::EPSILON * tst1 {
            m += 1;
        }

        if m > l {
            let mut iterations = 0;
            loop {
                if iterations == max_iterations {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(index = l, iterations, "tql2 failed to converge");
                    return Err(CoreError::NonConvergence {
                        index: l,
                        iterations,
                    });
                }
                iterations += 1;

                let g = d[l];
                let mut p = (d[l + 1] - g) / (2.0 * e[l]);
                let mut r = p.hypot(1.0);
                if p < 0.0 {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let h = g - d[l];
                for di in &mut d[l + 2..] {
                    *di -= h;
                }
                f += h;

                p = d[m];
                let mut c = 1.0;
                let mut c2 = c;
                let mut c3 = c;
                let el1 = e[l + 1];
                let mut s = 0.0;
                let mut s2 = 0.0;
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    let g = c * e[i];
                    let h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);
                    for k in 0..n {
                        let zk1 = z[k * n + i + 1];
                        let zk = z[k * n + i];
                        z[k * n + i + 1] = s * zk + c * zk1;
                        z[k * n + i] = c * zk - s * zk1;
                    }
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                if e[l].abs() <= f64::EPSILON * tst1 {
                    break;
                }
            }
        }
        d[l] += f;
        e[l] = 0.0;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_by_two_real_symmetric() {
        let h = ComplexMatrix::from_rows(&[
            vec![Complex64::new(2.0, 0.0), Complex64::new(1.0, 0.0)],
            vec![Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.0)],
        ])
        .unwrap();
        let mut pairs = solve(&h, 30).unwrap();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!((pairs[0].0 - 1.0).abs() < 1e-12);
        assert!((pairs[1].0 - 3.0).abs() < 1e-12);
    }

    #[test]
    fn complex_coupling_gives_unit_residual_vectors() {
        let i = Complex64::I;
        let h = ComplexMatrix::from_rows(&[
            vec![Complex64::new(1.0, 0.0), i * 0.5, Complex64::ZERO],
            vec![-i * 0.5, Complex64::new(2.0, 0.0), Complex64::new(0.25, 0.25)],
            vec![Complex64::ZERO, Complex64::new(0.25, -0.25), Complex64::new(-1.0, 0.0)],
        ])
        .unwrap();
        for (lambda, v) in solve(&h, 30).unwrap() {
            let hv = h.mul_vec(&v).unwrap();
            let residual: f64 = hv
                .iter()
                .zip(&v)
                .map(|(a, b)| (a - b * lambda).norm_sqr())
                .sum::<f64>()
                .sqrt();
            assert!(residual < 1e-10, "residual {residual} for {lambda}");
            let norm: f64 = v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn zero_iteration_budget_fails_on_coupled_matrix() {
        let h = ComplexMatrix::from_rows(&[
            vec![Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
            vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
        ])
        .unwrap();
        assert!(matches!(
            solve(&h, 0),
            Err(CoreError::NonConvergence { .. })
        ));
    }
}
