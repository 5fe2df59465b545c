//! Integration tests for eigensound-core.
//!
//! Drives the store and the solver together the way the control thread does:
//! edit, snapshot, solve. Covers the reference scenario, failure reporting,
//! Hermitian toggling and the factory presets.

use eigensound_core::{
    Complex64, ComplexMatrix, CoreError, EigenSolver, FactoryPreset, MatrixStore, SolverConfig,
    SolverPath,
};

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn basis(n: usize, k: usize) -> Vec<Complex64> {
    (0..n)
        .map(|i| if i == k { Complex64::ONE } else { Complex64::ZERO })
        .collect()
}

fn assert_close(a: &[Complex64], b: &[Complex64], tol: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).norm() <= tol, "{x} vs {y}");
    }
}

// ============================================================================
// 1. Reference scenario
// ============================================================================

#[test]
fn three_mode_diagonal_scenario() {
    let mut store = MatrixStore::new(3).unwrap();
    store
        .load_diagonal(&[c(1.0, 2.0), c(0.0, 5.0), c(-1.0, 0.0)])
        .unwrap();
    let system = EigenSolver::new().compute(&store.snapshot()).unwrap();

    let values: Vec<Complex64> = system.eigenvalues().collect();
    assert_close(&values, &[c(-1.0, 0.0), c(0.0, 5.0), c(1.0, 2.0)], 1e-12);

    assert_close(system.modes()[0].vector(), &basis(3, 2), 1e-12);
    assert_close(system.modes()[1].vector(), &basis(3, 1), 1e-12);
    assert_close(system.modes()[2].vector(), &basis(3, 0), 1e-12);
    assert_eq!(system.revision(), store.revision());
}

#[test]
fn repeated_solves_are_identical() {
    let mut store = MatrixStore::new(1).unwrap();
    store.load_factory(FactoryPreset::Circulant, 6).unwrap();
    let solver = EigenSolver::new();
    let a = solver.compute(&store.snapshot()).unwrap();
    let b = solver.compute(&store.snapshot()).unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// 2. Failure reporting
// ============================================================================

#[test]
fn tiny_iteration_budget_reports_non_convergence() {
    let d: Vec<Complex64> = (0..5).map(FactoryPreset::ladder).collect();
    let mut store = MatrixStore::new(1).unwrap();
    store.load_tridiagonal(&d, &[c(0.5, 0.0); 4]).unwrap();
    let solver = EigenSolver::with_config(SolverConfig {
        max_iterations_per_eigenvalue: 1,
        ..SolverConfig::default()
    });
    let err = solver.compute(&store.snapshot()).unwrap_err();
    assert!(matches!(err, CoreError::NonConvergence { .. }), "got {err:?}");
}

#[test]
fn tiny_iteration_budget_fails_on_hermitian_path_too() {
    let mut store = MatrixStore::new(1).unwrap();
    store.set_hermitian(true);
    store.load_factory(FactoryPreset::Tridiagonal, 6).unwrap();
    let solver = EigenSolver::with_config(SolverConfig {
        max_iterations_per_eigenvalue: 1,
        ..SolverConfig::default()
    });
    assert!(matches!(
        solver.compute(&store.snapshot()),
        Err(CoreError::NonConvergence { .. })
    ));
}

#[test]
fn out_of_range_edit_leaves_solution_unchanged() {
    let mut store = MatrixStore::new(1).unwrap();
    store.load_factory(FactoryPreset::Tridiagonal, 4).unwrap();
    let solver = EigenSolver::new();
    let before = solver.compute(&store.snapshot()).unwrap();

    assert!(matches!(
        store.set(4, 0, c(9.0, 9.0)),
        Err(CoreError::IndexOutOfRange { .. })
    ));
    let after = solver.compute(&store.snapshot()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn defective_matrix_is_reported() {
    // Identity plus one coupling nudge: a 2x2 Jordan block at λ = 1.
    let mut store = MatrixStore::new(2).unwrap();
    store.nudge(0, 1).unwrap();
    let err = EigenSolver::new().compute(&store.snapshot()).unwrap_err();
    assert!(matches!(err, CoreError::Defective { .. }), "got {err:?}");

    // A repeated eigenvalue with a full eigenspace still decomposes.
    let h = ComplexMatrix::from_rows(&[
        vec![c(1.0, 0.0), c(0.0, 0.0), c(0.5, 0.0)],
        vec![c(0.0, 0.0), c(1.0, 0.0), c(0.25, 0.0)],
        vec![c(0.0, 0.0), c(0.0, 0.0), c(2.0, 0.0)],
    ])
    .unwrap();
    let system = EigenSolver::new().compute_matrix(&h, false).unwrap();
    assert!(system.max_residual(&h).unwrap() < 1e-9);
}

// ============================================================================
// 3. Hermitian mode
// ============================================================================

#[test]
fn toggling_hermitian_off_keeps_matrix() {
    let mut store = MatrixStore::new(3).unwrap();
    store.set(0, 1, c(0.0, 2.0)).unwrap();
    store.set_hermitian(true);
    let symmetrized = store.matrix().clone();
    store.set_hermitian(false);
    assert_eq!(store.matrix(), &symmetrized);
    assert_eq!(symmetrized[(0, 1)], c(0.0, 1.0));
    assert_eq!(symmetrized[(1, 0)], c(0.0, -1.0));
}

#[test]
fn hermitian_presets_take_real_path() {
    let mut store = MatrixStore::new(1).unwrap();
    store.set_hermitian(true);
    let solver = EigenSolver::new();
    for preset in FactoryPreset::ALL {
        store.load_factory(preset, 6).unwrap();
        let system = solver.compute(&store.snapshot()).unwrap();
        assert_eq!(system.path(), SolverPath::Hermitian, "{preset}");
        assert!(system.eigenvalues().all(|v| v.im == 0.0));
        assert!(system.orthonormality_error() < 1e-10, "{preset}");
        assert!(system.max_residual(store.matrix()).unwrap() < 1e-10);
    }
}

#[test]
fn coupled_two_level_system() {
    // [[0, g], [g, 0]] splits into ±g with symmetric/antisymmetric modes.
    let g = 0.75;
    let mut store = MatrixStore::new(1).unwrap();
    store.set_hermitian(true);
    store
        .load_tridiagonal(&[Complex64::ZERO; 2], &[c(g, 0.0)])
        .unwrap();
    let system = EigenSolver::new().compute(&store.snapshot()).unwrap();

    let s = std::f64::consts::FRAC_1_SQRT_2;
    assert!((system.modes()[0].value().re + g).abs() < 1e-12);
    assert!((system.modes()[1].value().re - g).abs() < 1e-12);
    assert_close(system.modes()[0].vector(), &[c(s, 0.0), c(-s, 0.0)], 1e-12);
    assert_close(system.modes()[1].vector(), &[c(s, 0.0), c(s, 0.0)], 1e-12);
}

// ============================================================================
// 4. General path
// ============================================================================

#[test]
fn non_normal_matrix_has_unit_eigenvectors() {
    let mut store = MatrixStore::new(1).unwrap();
    store
        .load_tridiagonal_bands(
            &[c(-0.1, 1.5), c(-0.2, 3.0), c(-0.3, 4.5), c(0.1, 6.0)],
            &[c(0.5, 0.0); 3],
            &[c(0.0, -0.25); 3],
        )
        .unwrap();
    let system = EigenSolver::new().compute(&store.snapshot()).unwrap();

    assert_eq!(system.path(), SolverPath::General);
    assert!(system.is_finite());
    assert!(system.max_residual(store.matrix()).unwrap() < 1e-9);
    for mode in system.modes() {
        let pivot = mode
            .vector()
            .iter()
            .copied()
            .fold(Complex64::ZERO, |best, z| if z.norm() > best.norm() { z } else { best });
        assert!(pivot.re > 0.0 && pivot.im.abs() < 1e-12);
    }
}

#[test]
fn circulant_eigenvalues_follow_dft() {
    // A real symmetric circulant row [a, b, 0, ..., 0, b] has eigenvalues
    // a + 2b·cos(2πk/n).
    let n = 8;
    let (a, b) = (0.3, 0.4);
    let mut row = vec![Complex64::ZERO; n];
    row[0] = c(a, 0.0);
    row[1] = c(b, 0.0);
    row[n - 1] = c(b, 0.0);

    let mut store = MatrixStore::new(1).unwrap();
    store.load_circulant(&row).unwrap();
    let system = EigenSolver::new().compute(&store.snapshot()).unwrap();

    let mut expected: Vec<f64> = (0..n)
        .map(|k| a + 2.0 * b * (std::f64::consts::TAU * k as f64 / n as f64).cos())
        .collect();
    expected.sort_by(f64::total_cmp);
    for (got, want) in system.eigenvalues().zip(expected) {
        assert!((got.re - want).abs() < 1e-9, "{got} vs {want}");
        assert!(got.im.abs() < 1e-9);
    }
}

#[test]
fn non_square_matrix_is_rejected() {
    let h = ComplexMatrix::zeros(3, 2);
    assert!(matches!(
        EigenSolver::new().compute_matrix(&h, false),
        Err(CoreError::DimensionMismatch {
            expected: 3,
            found: 2
        })
    ));
}
