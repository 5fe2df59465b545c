//! General path: Hessenberg QR for eigenvalues, inverse iteration for vectors.
//!
//! Eigenvalues come from an explicitly shifted complex QR iteration with
//! Wilkinson shifts and deflation from the bottom. Each eigenvector is then
//! recovered by a few steps of inverse iteration on the original matrix,
//! orthogonalized against earlier vectors that share a (numerically)
//! repeated eigenvalue so that degenerate modes stay distinct.

use super::householder;
use crate::error::{CoreError, Result};
use crate::matrix::ComplexMatrix;
use num_complex::Complex64;

/// Every this many iterations without deflation an exceptional shift is used.
const EXCEPTIONAL_SHIFT_PERIOD: usize = 10;

/// Inverse iteration steps per eigenvector.
const INVERSE_ITERATION_STEPS: usize = 3;

/// Relative distance under which two eigenvalues are treated as one cluster.
const CLUSTER_TOLERANCE: f64 = 1e-8;

/// Largest accepted `‖(H - λI)x‖ / ‖H‖_F` for a returned eigenvector.
const RESIDUAL_TOLERANCE: f64 = 1e-8;

/// Eigenvalues of a square matrix, in deflation order.
pub(crate) fn eigenvalues(h: &ComplexMatrix, max_iterations: usize) -> Result<Vec<Complex64>> {
    let n = h.rows();
    let mut a = h.clone();
    householder::reduce(&mut a);

    let norm = a.frobenius_norm();
    let mut values = vec![Complex64::ZERO; n];
    let mut rotations: Vec<(f64, Complex64)> = Vec::with_capacity(n);
    let mut hi = n - 1;
    let mut iterations = 0;

    loop {
        if hi == 0 {
            values[0] = a[(0, 0)];
            break;
        }

        // Lowest row of the unreduced block ending at `hi`.
        let mut lo = hi;
        while lo > 0 {
            let mut scale = a[(lo - 1, lo - 1)].l1_norm() + a[(lo, lo)].l1_norm();
            if scale == 0.0 {
                scale = norm;
            }
            if a[(lo, lo - 1)].l1_norm() <= f64::EPSILON * scale {
                a[(lo, lo - 1)] = Complex64::ZERO;
                break;
            }
            lo -= 1;
        }

        if lo == hi {
            values[hi] = a[(hi, hi)];
            hi -= 1;
            iterations = 0;
            continue;
        }

        if iterations == max_iterations {
            #[cfg(feature = "tracing")]
            tracing::warn!(index = hi, iterations, "shifted QR failed to converge");
            return Err(CoreError::NonConvergence {
                index: hi,
                iterations,
            });
        }
        iterations += 1;

        let shift = if iterations % EXCEPTIONAL_SHIFT_PERIOD == 0 {
            exceptional_shift(&a, hi)
        } else {
            wilkinson_shift(&a, hi)
        };
        qr_step(&mut a, lo, hi, shift, &mut rotations);
    }
    Ok(values)
}

/// Eigenvalue of the trailing 2x2 block closest to its bottom-right entry.
fn wilkinson_shift(a: &ComplexMatrix, hi: usize) -> Complex64 {
    let p = a[(hi - 1, hi - 1)];
    let b = a[(hi - 1, hi)];
    let c = a[(hi, hi - 1)];
    let d = a[(hi, hi)];

    let half = (p - d) * 0.5;
    let disc = (half * half + b * c).sqrt();
    let denom = if (half + disc).norm() >= (half - disc).norm() {
        half + disc
    } else {
        half - disc
    };
    if denom.norm() == 0.0 {
        d
    } else {
        d - b * c / denom
    }
}

fn exceptional_shift(a: &ComplexMatrix, hi: usize) -> Complex64 {
    let mut s = a[(hi, hi - 1)].l1_norm();
    if hi >= 2 {
        s += a[(hi - 1, hi - 2)].l1_norm();
    }
    a[(hi, hi)] + Complex64::new(0.75 * s, -0.4375 * s)
}

/// One explicit shifted QR step on the active block `lo..=hi`.
fn qr_step(
    a: &mut ComplexMatrix,
    lo: usize,
    hi: usize,
    shift: Complex64,
    rotations: &mut Vec<(f64, Complex64)>,
) {
    for i in lo..=hi {
        a[(i, i)] -= shift;
    }

    rotations.clear();
    for k in lo..hi {
        let (c, s) = givens(a[(k, k)], a[(k + 1, k)]);
        rotations.push((c, s));
        for j in k..=hi {
            let x = a[(k, j)];
            let y = a[(k + 1, j)];
            a[(k, j)] = x * c + s * y;
            a[(k + 1, j)] = y * c - s.conj() * x;
        }
    }

    for (offset, &(c, s)) in rotations.iter().enumerate() {
        let k = lo + offset;
        for i in lo..=(k + 1).min(hi) {
            let x = a[(i, k)];
            let y = a[(i, k + 1)];
            a[(i, k)] = x * c + y * s.conj();
            a[(i, k + 1)] = y * c - x * s;
        }
    }

    for i in lo..=hi {
        a[(i, i)] += shift;
    }
}

/// Rotation `[[c, s], [-s̄, c]]` that zeroes `b` in `(a, b)ᵀ`.
fn givens(a: Complex64, b: Complex64) -> (f64, Complex64) {
    let a_abs = a.norm();
    let b_abs = b.norm();
    if b_abs == 0.0 {
        return (1.0, Complex64::ZERO);
    }
    if a_abs == 0.0 {
        return (0.0, Complex64::ONE);
    }
    let nu = a_abs.hypot(b_abs);
    (a_abs / nu, (a / a_abs) * b.conj() / nu)
}

/// Unit eigenvectors for `values`, one per entry, by inverse iteration on `h`.
///
/// A repeated eigenvalue with fewer independent eigenvectors than its
/// multiplicity (a defective matrix) is reported as
/// [`CoreError::Defective`] instead of padding the cluster with vectors that
/// do not satisfy `Hx = λx`.
pub(crate) fn eigenvectors(h: &ComplexMatrix, values: &[Complex64]) -> Result<Vec<Vec<Complex64>>> {
    let n = h.rows();
    let norm = h.frobenius_norm().max(f64::MIN_POSITIVE);
    let tiny = f64::EPSILON * norm;
    let cluster = CLUSTER_TOLERANCE * norm;

    let mut vectors: Vec<Vec<Complex64>> = Vec::with_capacity(values.len());
    for (k, &lambda) in values.iter().enumerate() {
        let lu = ShiftedLu::factor(h, lambda, tiny);
        let siblings: Vec<usize> = (0..k)
            .filter(|&j| (values[j] - lambda).norm() <= cluster)
            .collect();

        let mut x = start_vector(n, siblings.len());
        orthogonalize(&mut x, siblings.iter().map(|&j| vectors[j].as_slice()));
        // The start may already lie in the span of the siblings; walk the basis.
        let mut basis = 0;
        while vector_norm(&x) < 1e-6 && basis < n {
            x.fill(Complex64::ZERO);
            x[basis] = Complex64::ONE;
            orthogonalize(&mut x, siblings.iter().map(|&j| vectors[j].as_slice()));
            basis += 1;
        }
        normalize(&mut x);

        for step in 0..INVERSE_ITERATION_STEPS {
            lu.solve_in_place(&mut x);
            orthogonalize(&mut x, siblings.iter().map(|&j| vectors[j].as_slice()));
            let len = vector_norm(&x);
            if !len.is_finite() || len == 0.0 {
                return Err(CoreError::NonConvergence {
                    index: k,
                    iterations: step + 1,
                });
            }
            for z in &mut x {
                *z /= len;
            }
        }
        if residual(h, lambda, &x) > RESIDUAL_TOLERANCE * norm {
            return Err(CoreError::Defective { index: k });
        }
        vectors.push(x);
    }
    Ok(vectors)
}

/// `‖(H - λI)x‖₂`.
fn residual(h: &ComplexMatrix, lambda: Complex64, x: &[Complex64]) -> f64 {
    (0..h.rows())
        .map(|i| {
            let hx: Complex64 = h.row(i).iter().zip(x).map(|(a, b)| a * b).sum();
            (hx - lambda * x[i]).norm_sqr()
        })
        .sum::<f64>()
        .sqrt()
}

/// LU factorization of `H - λI` with partial pivoting.
///
/// Pivots smaller than `tiny` are replaced by `tiny`, which is what makes the
/// exactly singular case usable for inverse iteration.
struct ShiftedLu {
    n: usize,
    lu: Vec<Complex64>,
    pivots: Vec<usize>,
}

impl ShiftedLu {
    fn factor(h: &ComplexMatrix, lambda: Complex64, tiny: f64) -> Self {
        let n = h.rows();
        let mut lu = h.as_slice().to_vec();
        for i in 0..n {
            lu[i * n + i] -= lambda;
        }
        let mut pivots = vec![0; n];

        for k in 0..n {
            let mut p = k;
            let mut best = lu[k * n + k].norm();
            for i in k + 1..n {
                let mag = lu[i * n + k].norm();
                if mag > best {
                    best = mag;
                    p = i;
                }
            }
            pivots[k] = p;
            if p != k {
                for j in 0..n {
                    lu.swap(k * n + j, p * n + j);
                }
            }
            if best < tiny {
                lu[k * n + k] = Complex64::new(tiny, 0.0);
            }
            let pivot = lu[k * n + k];
            for i in k + 1..n {
                let factor = lu[i * n + k] / pivot;
                lu[i * n + k] = factor;
                for j in k + 1..n {
                    let upper = lu[k * n + j];
                    lu[i * n + j] -= factor * upper;
                }
            }
        }
        Self { n, lu, pivots }
    }

    fn solve_in_place(&self, b: &mut [Complex64]) {
        let n = self.n;
        for k in 0..n {
            b.swap(k, self.pivots[k]);
        }
        for i in 0..n {
            for j in 0..i {
                let t = self.lu[i * n + j] * b[j];
                b[i] -= t;
            }
        }
        for i in (0..n).rev() {
            for j in i + 1..n {
                let t = self.lu[i * n + j] * b[j];
                b[i] -= t;
            }
            b[i] /= self.lu[i * n + i];
        }
    }
}

/// Deterministic, asymmetric start vector; `seed` separates cluster siblings.
///
/// A symmetric start such as all-ones can be exactly orthogonal to a
/// degenerate eigenspace after Gram-Schmidt, which stalls the iteration.
fn start_vector(n: usize, seed: usize) -> Vec<Complex64> {
    const GOLDEN: f64 = 0.618_033_988_749_895;
    let stride = (seed + 1) as f64;
    (0..n)
        .map(|i| Complex64::new(0.5 + ((i + 1) as f64 * stride * GOLDEN).fract(), 0.0))
        .collect()
}

fn orthogonalize<'a>(x: &mut [Complex64], against: impl Iterator<Item = &'a [Complex64]>) {
    for v in against {
        let overlap: Complex64 = v.iter().zip(x.iter()).map(|(vi, xi)| vi.conj() * xi).sum();
        for (xi, vi) in x.iter_mut().zip(v) {
            *xi -= overlap * vi;
        }
    }
}

fn vector_norm(x: &[Complex64]) -> f64 {
    x.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt()
}

fn normalize(x: &mut [Complex64]) {
    let len = vector_norm(x);
    if len > 0.0 {
        for z in x.iter_mut() {
            *z /= len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn sorted(mut v: Vec<Complex64>) -> Vec<Complex64> {
        v.sort_by(|a, b| a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im)));
        v
    }

    #[test]
    fn upper_triangular_eigenvalues_are_diagonal() {
        let h = ComplexMatrix::from_rows(&[
            vec![c(1.0, 2.0), c(3.0, 0.0), c(0.5, 0.5)],
            vec![Complex64::ZERO, c(-1.0, 0.0), c(2.0, -1.0)],
            vec![Complex64::ZERO, Complex64::ZERO, c(0.0, 5.0)],
        ])
        .unwrap();
        let values = sorted(eigenvalues(&h, 30).unwrap());
        let expected = [c(-1.0, 0.0), c(0.0, 5.0), c(1.0, 2.0)];
        for (got, want) in values.iter().zip(expected) {
            assert!((got - want).norm() < 1e-10, "{got} vs {want}");
        }
    }

    #[test]
    fn rotation_generator_has_imaginary_pair() {
        // [[0, -1], [1, 0]] has eigenvalues ±i.
        let h = ComplexMatrix::from_rows(&[
            vec![Complex64::ZERO, c(-1.0, 0.0)],
            vec![c(1.0, 0.0), Complex64::ZERO],
        ])
        .unwrap();
        let values = sorted(eigenvalues(&h, 30).unwrap());
        assert!((values[0] - c(0.0, -1.0)).norm() < 1e-12);
        assert!((values[1] - c(0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn inverse_iteration_satisfies_eigen_equation() {
        let h = ComplexMatrix::from_fn(5, 5, |r, col| {
            c(((r * 3 + col) % 4) as f64 - 1.5, ((r + col * 2) % 3) as f64 * 0.5)
        });
        let values = eigenvalues(&h, 30).unwrap();
        let vectors = eigenvectors(&h, &values).unwrap();
        for (lambda, v) in values.iter().zip(&vectors) {
            let hv = h.mul_vec(v).unwrap();
            let residual = hv
                .iter()
                .zip(v)
                .map(|(a, b)| (a - b * lambda).norm_sqr())
                .sum::<f64>()
                .sqrt();
            assert!(residual < 1e-8, "residual {residual} for {lambda}");
            assert!((vector_norm(v) - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn repeated_eigenvalues_get_distinct_vectors() {
        let h = ComplexMatrix::from_diagonal(&[c(2.0, 1.0), c(2.0, 1.0), c(-3.0, 0.0)]);
        let values = eigenvalues(&h, 30).unwrap();
        let vectors = eigenvectors(&h, &values).unwrap();
        let twins: Vec<&Vec<Complex64>> = values
            .iter()
            .zip(&vectors)
            .filter(|(v, _)| (**v - c(2.0, 1.0)).norm() < 1e-9)
            .map(|(_, x)| x)
            .collect();
        assert_eq!(twins.len(), 2);
        let overlap: Complex64 = twins[0]
            .iter()
            .zip(twins[1].iter())
            .map(|(a, b)| a.conj() * b)
            .sum();
        assert!(overlap.norm() < 1e-9);
    }

    #[test]
    fn zero_budget_fails_on_unreduced_block() {
        let h = ComplexMatrix::from_rows(&[
            vec![Complex64::ZERO, c(-1.0, 0.0)],
            vec![c(1.0, 0.0), Complex64::ZERO],
        ])
        .unwrap();
        assert_eq!(
            eigenvalues(&h, 0),
            Err(CoreError::NonConvergence {
                index: 1,
                iterations: 0
            })
        );
    }
}
