//! Integration test suite to verify the mathematical correctness of the Krylov decompositions.
//!
//! # Test Methodology
//!
//! Every run of the Arnoldi or Lanczos process must produce a pair `(V, H)` with three
//! properties that can be checked without knowing the exact answer:
//!
//! 1.  **Orthonormality:** `V^H V = I` up to rounding, as long as the basis is short enough
//!     for the Lanczos recurrence not to have lost orthogonality.
//! 2.  **Recurrence identity:** `A V[:, 0..m] = V[:, 0..m+1] H`, which holds to rounding
//!     level relative to `‖A‖` for any `m`.
//! 3.  **Structure:** `H` is upper Hessenberg for Arnoldi, symmetric tridiagonal (with equal
//!     sub- and super-diagonals) for Lanczos.
//!
//! These are checked on dense, sparse and complex problems built from a seeded random
//! generator. A second group of tests pins down small problems whose result is known
//! exactly: happy breakdowns, the 2×2 trace scenario, resizing, and the error paths.

use anyhow::{Result, ensure};
use faer::{
    Mat, MatRef, c64, mat,
    sparse::{SparseColMat, Triplet},
    traits::{ComplexField, math_utils::zero},
};
use krylov_subspace::{
    Coefficient, KrylovOptions, KrylovStatus, KrylovSubspace, LinearOperator, MatrixFree,
    Subspace, arnoldi_into, build_krylov_subspace, krylov_subspace_into, lanczos_into,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Tolerance on `‖I - V^H V‖_F` for the short bases used below.
const ORTHO_TOLERANCE: f64 = 1e-8;

/// Tolerance on `‖A V_m - V_{m+1} H‖_F / ‖A‖∞`.
const RESIDUAL_TOLERANCE: f64 = 1e-12;

fn orthogonality_loss<T: ComplexField<Real = f64>>(v: MatRef<'_, T>) -> f64 {
    (Mat::<T>::identity(v.ncols(), v.ncols()) - v.adjoint() * v).norm_l2()
}

/// Residual of the Arnoldi relation, applying `A` one column at a time.
fn recurrence_residual<T, U, O>(operator: &O, ks: &KrylovSubspace<T, U>) -> f64
where
    T: ComplexField<Real = f64>,
    U: Coefficient<T>,
    O: LinearOperator<T> + ?Sized,
{
    let m = ks.m();
    let v = ks.basis();
    let mut av = Mat::<T>::zeros(ks.n(), m);
    for j in 0..m {
        operator.apply(av.col_mut(j), v.col(j));
    }
    (av - v * ks.hessenberg()).norm_l2()
}

fn ensure_hessenberg<U: ComplexField>(h: MatRef<'_, U>) -> Result<()> {
    for j in 0..h.ncols() {
        for i in j + 2..h.nrows() {
            ensure!(h[(i, j)] == zero::<U>(), "H[{i}, {j}] is below the sub-diagonal");
        }
    }
    Ok(())
}

fn ensure_symmetric_tridiagonal<U: ComplexField>(h: MatRef<'_, U>) -> Result<()> {
    ensure_hessenberg(h)?;
    let m = h.ncols();
    for j in 0..m {
        for i in 0..j.saturating_sub(1) {
            ensure!(h[(i, j)] == zero::<U>(), "H[{i}, {j}] is above the super-diagonal");
        }
    }
    for i in 0..m.saturating_sub(1) {
        ensure!(h[(i, i + 1)] == h[(i + 1, i)], "H is not symmetric at ({i}, {})", i + 1);
    }
    Ok(())
}

/// `diag(1, 2, …, n)` stored sparse, with a reproducible random `b`.
fn diagonal_problem(n: usize) -> (SparseColMat<usize, f64>, Mat<f64>) {
    let triplets: Vec<_> = (0..n)
        .map(|i| Triplet {
            row: i,
            col: i,
            val: (i + 1) as f64,
        })
        .collect();
    let a = SparseColMat::try_new_from_triplets(n, n, &triplets).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let b = Mat::from_fn(n, 1, |_, _| rng.random());
    (a, b)
}

/// Random non-symmetric sparse matrix with a dominant diagonal and two off-diagonal bands.
fn random_sparse_problem(n: usize) -> (SparseColMat<usize, f64>, Mat<f64>) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut triplets = Vec::with_capacity(3 * n);
    for i in 0..n {
        triplets.push(Triplet {
            row: i,
            col: i,
            val: 4.0 + rng.random::<f64>(),
        });
        if i + 1 < n {
            triplets.push(Triplet {
                row: i,
                col: i + 1,
                val: rng.random::<f64>() - 0.5,
            });
        }
        if i >= 3 {
            triplets.push(Triplet {
                row: i,
                col: i - 3,
                val: rng.random::<f64>(),
            });
        }
    }
    let a = SparseColMat::try_new_from_triplets(n, n, &triplets).unwrap();
    let b = Mat::from_fn(n, 1, |_, _| rng.random());
    (a, b)
}

/// Dense matrix with independent uniform entries; not symmetric.
fn random_dense_problem(n: usize) -> (Mat<f64>, Mat<f64>) {
    let mut rng = StdRng::seed_from_u64(42);
    let a = Mat::from_fn(n, n, |_, _| rng.random::<f64>() - 0.5);
    let b = Mat::from_fn(n, 1, |_, _| rng.random());
    (a, b)
}

fn random_complex(rng: &mut StdRng) -> c64 {
    c64::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5)
}

/// Dense complex matrix, neither Hermitian nor symmetric.
fn complex_general_problem(n: usize) -> (Mat<c64>, Mat<c64>) {
    let mut rng = StdRng::seed_from_u64(11);
    let a = Mat::from_fn(n, n, |_, _| random_complex(&mut rng));
    let b = Mat::from_fn(n, 1, |_, _| random_complex(&mut rng));
    (a, b)
}

/// `B + B^H` for a random complex `B`, Hermitian to the last bit.
fn complex_hermitian_problem(n: usize) -> (Mat<c64>, Mat<c64>) {
    let mut rng = StdRng::seed_from_u64(23);
    let base = Mat::from_fn(n, n, |_, _| random_complex(&mut rng));
    let a = Mat::from_fn(n, n, |i, j| base[(i, j)] + base[(j, i)].conj());
    let b = Mat::from_fn(n, 1, |_, _| random_complex(&mut rng));
    (a, b)
}

/// A macro to generate the boilerplate for each decomposition test.
///
/// This macro abstracts the common test structure:
/// 1. Build the problem `(A, b)` with `$problem`.
/// 2. Run `$driver` for `$m` steps into a `KrylovSubspace<$t, $u>`.
/// 3. Check that no breakdown occurred, then orthonormality, the recurrence identity,
///    and the structure of `H` (`$structure`).
macro_rules! generate_decomposition_test {
    ($test_name:ident, $problem:expr, $t:ty, $u:ty, $driver:ident, $m:expr, $structure:ident) => {
        #[test]
        fn $test_name() -> Result<()> {
            let (a, b) = $problem;
            let n = b.nrows();
            let m = $m;
            let mut ks = KrylovSubspace::<$t, $u>::new(n, m);

            let status = $driver(&mut ks, &a, b.col(0), &KrylovOptions::default())?;
            ensure!(
                status == KrylovStatus::Completed { m },
                "unexpected status {:?}",
                status
            );

            let loss = orthogonality_loss(ks.basis());
            ensure!(loss < ORTHO_TOLERANCE, "orthogonality loss too high: {}", loss);

            let opnorm = LinearOperator::opnorm_inf(&a).unwrap();
            let residual = recurrence_residual(&a, &ks) / opnorm;
            ensure!(
                residual < RESIDUAL_TOLERANCE,
                "recurrence residual too high: {}",
                residual
            );

            $structure(ks.coefficients())?;
            ensure!((ks.beta() - b.norm_l2()).abs() < 1e-12 * b.norm_l2());
            Ok(())
        }
    };
}

// --- Decomposition properties ---

generate_decomposition_test!(
    test_arnoldi_sparse_diagonal,
    diagonal_problem(100),
    f64,
    f64,
    arnoldi_into,
    12,
    ensure_hessenberg
);

// The spectrum is clustered around 4.5, so single-pass MGS loses orthogonality by
// roughly a factor of 7 per step; 8 steps keep the loss near 1e-10.
generate_decomposition_test!(
    test_arnoldi_sparse_non_symmetric,
    random_sparse_problem(80),
    f64,
    f64,
    arnoldi_into,
    8,
    ensure_hessenberg
);

generate_decomposition_test!(
    test_arnoldi_dense_non_symmetric,
    random_dense_problem(60),
    f64,
    f64,
    arnoldi_into,
    12,
    ensure_hessenberg
);

generate_decomposition_test!(
    test_arnoldi_complex_general,
    complex_general_problem(40),
    c64,
    c64,
    arnoldi_into,
    10,
    ensure_hessenberg
);

generate_decomposition_test!(
    test_lanczos_sparse_diagonal,
    diagonal_problem(100),
    f64,
    f64,
    lanczos_into,
    12,
    ensure_symmetric_tridiagonal
);

generate_decomposition_test!(
    test_lanczos_complex_hermitian,
    complex_hermitian_problem(40),
    c64,
    f64,
    lanczos_into,
    10,
    ensure_symmetric_tridiagonal
);

// --- Incomplete orthogonalization ---

#[test]
fn test_iop_full_depth_matches_default() -> Result<()> {
    let (a, b) = random_dense_problem(30);
    let m = 10;

    let mut full = KrylovSubspace::<f64, f64>::new(30, m);
    arnoldi_into(&mut full, &a, b.col(0), &KrylovOptions::default())?;

    for iop in [m, m + 5] {
        let mut windowed = KrylovSubspace::<f64, f64>::new(30, m);
        let options = KrylovOptions::default().with_iop(iop);
        arnoldi_into(&mut windowed, &a, b.col(0), &options)?;

        let h_diff = (full.coefficients() - windowed.coefficients()).norm_l2();
        let v_diff = (full.basis() - windowed.basis()).norm_l2();
        ensure!(h_diff < 1e-14, "iop = {iop}: H differs by {h_diff}");
        ensure!(v_diff < 1e-14, "iop = {iop}: V differs by {v_diff}");
    }
    Ok(())
}

#[test]
fn test_short_iop_window_keeps_recurrence() -> Result<()> {
    let (a, b) = random_sparse_problem(50);
    let mut ks = KrylovSubspace::<f64, f64>::new(50, 12);
    arnoldi_into(&mut ks, &a, b.col(0), &KrylovOptions::default().with_iop(3))?;

    // Only the window of 3 columns above the sub-diagonal is populated.
    let h = ks.coefficients();
    for j in 0..ks.m() {
        for i in 0..(j + 1).saturating_sub(3) {
            ensure!(h[(i, j)] == 0.0, "H[{i}, {j}] outside the window");
        }
    }
    let residual = recurrence_residual(&a, &ks) / LinearOperator::opnorm_inf(&a).unwrap();
    ensure!(residual < RESIDUAL_TOLERANCE, "residual {residual}");
    Ok(())
}

// --- Happy breakdown ---

#[test]
fn test_happy_breakdown_on_identity() -> Result<()> {
    let a: Mat<f64> = Mat::identity(3, 3);
    let b: Mat<f64> = mat![[1.0], [0.0], [0.0]];
    let options = KrylovOptions::default().with_m(2);

    let output = build_krylov_subspace(&a, b.col(0), &options)?;
    ensure!(output.status == KrylovStatus::HappyBreakdown { m: 1 });
    ensure!(output.subspace.m() == 1);
    ensure!(output.subspace.hessenberg()[(0, 0)] == 1.0);

    // Same result when the Hermitian probe is bypassed.
    let mut ks = KrylovSubspace::<f64, f64>::new(3, 2);
    let status = arnoldi_into(&mut ks, &a, b.col(0), &options)?;
    ensure!(status == KrylovStatus::HappyBreakdown { m: 1 });
    ensure!(ks.m() == 1 && ks.maxiter() == 2);
    ensure!(ks.coefficients()[(0, 0)] == 1.0);
    ensure!(ks.basis().shape() == (3, 2));
    Ok(())
}

#[test]
fn test_invariant_subspace_of_diagonal_operator() -> Result<()> {
    // b only excites 3 of the 20 eigenvectors.
    let (a, _) = diagonal_problem(20);
    let mut b = Mat::<f64>::zeros(20, 1);
    b[(2, 0)] = 1.0;
    b[(9, 0)] = -2.0;
    b[(15, 0)] = 0.5;

    let mut ks = KrylovSubspace::<f64, f64>::new(20, 10);
    let status = lanczos_into(&mut ks, &a, b.col(0), &KrylovOptions::default())?;
    ensure!(status == KrylovStatus::HappyBreakdown { m: 3 }, "{status:?}");

    // The Ritz values of an invariant subspace are exact eigenvalues: trace 3 + 10 + 16.
    let trace: f64 = (0..3).map(|i| ks.coefficients()[(i, i)]).sum();
    ensure!((trace - 29.0).abs() < 1e-10, "trace = {trace}");
    ensure_symmetric_tridiagonal(ks.coefficients())?;
    Ok(())
}

#[test]
fn test_zero_seed_is_a_degenerate_breakdown() -> Result<()> {
    let (a, _) = random_dense_problem(5);
    let b = Mat::<f64>::zeros(5, 1);
    let mut ks = KrylovSubspace::<f64, f64>::new(5, 3);

    let status = arnoldi_into(&mut ks, &a, b.col(0), &KrylovOptions::default())?;
    ensure!(status == KrylovStatus::HappyBreakdown { m: 1 });
    ensure!(ks.beta() == 0.0);
    let basis = ks.basis();
    for j in 0..basis.ncols() {
        for i in 0..basis.nrows() {
            ensure!(basis[(i, j)].is_finite(), "non-finite entry at ({i}, {j})");
        }
    }
    Ok(())
}

// --- Container semantics ---

#[test]
fn test_resize_discards_previous_run() -> Result<()> {
    let (a, b) = diagonal_problem(10);
    let mut ks = KrylovSubspace::<f64, f64>::new(10, 4);
    lanczos_into(&mut ks, &a, b.col(0), &KrylovOptions::default())?;
    ensure!(ks.basis().norm_l2() > 0.0);

    ks.resize(6);
    ensure!(ks.m() == 6 && ks.maxiter() == 6);
    ensure!(ks.basis().shape() == (10, 7));
    ensure!(ks.coefficients().shape() == (7, 6));
    ensure!(ks.basis().norm_l2() == 0.0);
    ensure!(ks.coefficients().norm_l2() == 0.0);
    Ok(())
}

#[test]
fn test_driver_grows_capacity_on_demand() -> Result<()> {
    let (a, b) = diagonal_problem(10);
    let mut ks = KrylovSubspace::<f64, f64>::new(10, 2);
    let status = lanczos_into(&mut ks, &a, b.col(0), &KrylovOptions::default().with_m(5))?;
    ensure!(status == KrylovStatus::Completed { m: 5 });
    ensure!(ks.maxiter() == 5);

    // A smaller request afterwards reuses the storage.
    lanczos_into(&mut ks, &a, b.col(0), &KrylovOptions::default().with_m(3))?;
    ensure!(ks.m() == 3 && ks.maxiter() == 5);
    ensure!(ks.basis().shape() == (10, 4));
    Ok(())
}

// --- Dispatcher ---

#[test]
fn test_two_by_two_diagonal_scenario() -> Result<()> {
    let a: Mat<f64> = mat![[2.0, 0.0], [0.0, 3.0]];
    let b: Mat<f64> = mat![[1.0], [1.0]];

    let output = build_krylov_subspace(&a, b.col(0), &KrylovOptions::default().with_m(2))?;
    let Subspace::Hermitian(ks) = &output.subspace else {
        anyhow::bail!("diag(2, 3) must take the Lanczos path");
    };
    ensure!(ks.m() == 2);

    let h = ks.coefficients();
    ensure!((h[(0, 0)] + h[(1, 1)] - 5.0).abs() < 1e-12, "trace != 5");
    ensure!(h[(0, 1)] == h[(1, 0)]);
    ensure!((h[(1, 0)] - 0.5).abs() < 1e-12);
    ensure!(recurrence_residual(&a, ks) < 1e-12);
    Ok(())
}

#[test]
fn test_dispatch_complex_hermitian_uses_real_coefficients() -> Result<()> {
    let (a, b) = complex_hermitian_problem(16);
    let output = build_krylov_subspace(&a, b.col(0), &KrylovOptions::default().with_m(6))?;
    match &output.subspace {
        Subspace::Hermitian(ks) => {
            ensure!(ks.m() == 6);
            ensure!(recurrence_residual(&a, ks) < 1e-10);
        }
        Subspace::General(_) => anyhow::bail!("B + B^H must be detected as Hermitian"),
    }
    Ok(())
}

#[test]
fn test_dispatch_sparse_non_symmetric_uses_arnoldi() -> Result<()> {
    let (a, b) = random_sparse_problem(40);
    let output = build_krylov_subspace(&a, b.col(0), &KrylovOptions::default())?;
    ensure!(!output.subspace.is_hermitian());
    // Default capacity is min(30, n).
    ensure!(output.subspace.m() == 30);
    ensure!(output.subspace.basis().shape() == (40, 31));
    ensure_hessenberg(output.subspace.hessenberg().as_ref())?;
    Ok(())
}

#[test]
fn test_hermitian_override_into_caller_storage() -> Result<()> {
    let (a, b) = diagonal_problem(30);
    let mut general = KrylovSubspace::<f64, f64>::new(30, 8);
    let mut forced = KrylovSubspace::<f64, f64>::new(30, 8);

    krylov_subspace_into(
        &mut general,
        &a,
        b.col(0),
        &KrylovOptions::default().with_hermitian(false),
    )?;
    krylov_subspace_into(&mut forced, &a, b.col(0), &KrylovOptions::default())?;

    // Arnoldi on a symmetric operator fills H[i, j] for i < j - 1 with rounding noise only.
    let diff = (general.coefficients() - forced.coefficients()).norm_l2();
    ensure!(diff < 1e-10, "Arnoldi and Lanczos disagree by {diff}");
    ensure_symmetric_tridiagonal(forced.coefficients())?;
    Ok(())
}

#[test]
fn test_matrix_free_operator_needs_a_norm() -> Result<()> {
    let (a, b) = random_dense_problem(12);
    let op = MatrixFree::<f64, _>::new(a.as_ref());

    let err = build_krylov_subspace(&op, b.col(0), &KrylovOptions::default()).unwrap_err();
    ensure!(err.to_string().contains("opnorm"), "unexpected error: {err}");

    let norm = LinearOperator::opnorm_inf(&a).unwrap();
    let output = build_krylov_subspace(
        &op,
        b.col(0),
        &KrylovOptions::default().with_m(6).with_opnorm_fn(|| norm),
    )?;
    ensure!(output.status == KrylovStatus::Completed { m: 6 });

    let declared = MatrixFree::<f64, _>::new(a.as_ref()).with_opnorm(norm);
    let mut ks = KrylovSubspace::<f64, f64>::new(12, 6);
    arnoldi_into(&mut ks, &declared, b.col(0), &KrylovOptions::default())?;
    ensure!(recurrence_residual(&a, &ks) / norm < RESIDUAL_TOLERANCE);
    Ok(())
}

// --- Error paths ---

#[test]
fn test_dimension_mismatch_leaves_subspace_untouched() -> Result<()> {
    let (a, b) = diagonal_problem(8);
    let mut ks = KrylovSubspace::<f64, f64>::new(8, 4);
    lanczos_into(&mut ks, &a, b.col(0), &KrylovOptions::default().with_m(3))?;
    let beta = ks.beta();
    let basis = ks.basis().to_owned();

    let short = Mat::<f64>::zeros(7, 1);
    let err = lanczos_into(&mut ks, &a, short.col(0), &KrylovOptions::default()).unwrap_err();
    ensure!(err.is_dimension_mismatch());
    ensure!(
        err.to_string() == "Dimension mismatch for starting vector b: expected 8, found 7."
    );
    ensure!(ks.m() == 3 && ks.beta() == beta);
    ensure!(ks.basis().to_owned() == basis);

    let (other, _) = diagonal_problem(9);
    let err = arnoldi_into(&mut ks, &other, b.col(0), &KrylovOptions::default()).unwrap_err();
    ensure!(err.is_dimension_mismatch());
    Ok(())
}

#[test]
fn test_non_square_operator_is_rejected() -> Result<()> {
    let a = Mat::<f64>::zeros(4, 3);
    let b = Mat::<f64>::zeros(4, 1);
    let err = build_krylov_subspace(&a, b.col(0), &KrylovOptions::default()).unwrap_err();
    ensure!(err.is_dimension_mismatch());
    ensure!(err.to_string() == "Operator must be square, but has 4 rows and 3 columns.");
    Ok(())
}

#[test]
fn test_zero_dimension_request_is_rejected() -> Result<()> {
    let (a, b) = diagonal_problem(4);
    let mut ks = KrylovSubspace::<f64, f64>::new(4, 2);
    let err = arnoldi_into(&mut ks, &a, b.col(0), &KrylovOptions::default().with_m(0))
        .unwrap_err();
    ensure!(!err.is_dimension_mismatch());
    ensure!(ks.m() == 2);
    Ok(())
}
