//! Symmetric Lanczos iteration.
//!
//! For a Hermitian operator the Arnoldi coefficients above the first super-diagonal
//! vanish in exact arithmetic, so the new vector only has to be orthogonalized against
//! the two most recent basis vectors:
//!
//! ```text
//! β_j v_{j+1} = A v_j - α_j v_j - β_{j-1} v_{j-1}
//! ```
//!
//! The coefficients `α_j` and `β_j` are written straight into the main diagonal and the
//! first sub-diagonal of `H`. The super-diagonal is filled once, at the end of the run,
//! by mirroring the sub-diagonal, so that `H` is the symmetric tridiagonal matrix
//! `T_m` plus the trailing `β_{m-1}` entry.
//!
//! No re-orthogonalization is performed. In floating point the basis gradually loses
//! orthogonality as Ritz values converge; the `orthogonality` binary measures this.

use faer::{
    MatMut,
    prelude::*,
    traits::{ComplexField, math_utils::zero},
};

use super::{KrylovStatus, axpy_neg, begin_run, is_happy_breakdown, normalize};
use crate::{
    error::KrylovError, operator::LinearOperator, options::KrylovOptions, scalar::Coefficient,
    subspace::KrylovSubspace,
};

/// Performs step `j` (zero-based) of the Lanczos three-term recurrence.
///
/// Reads `v[:, j]` and, for `j > 0`, `v[:, j - 1]` and `β_{j-1} = h[j, j - 1]`. Writes
/// `α_j` into `h[j, j]`, `β_j` into `h[j + 1, j]` and the next basis vector into
/// `v[:, j + 1]`. Returns `β_j`.
///
/// # Panics
/// Panics if `v` has fewer than `j + 2` columns or `h` is smaller than `(j + 2) × (j + 1)`.
pub fn lanczos_step<T, U, O>(
    j: usize,
    operator: &O,
    v: MatMut<'_, T>,
    mut h: MatMut<'_, U>,
) -> T::Real
where
    T: ComplexField,
    U: Coefficient<T>,
    O: LinearOperator<T> + ?Sized,
{
    let (basis, next) = v.split_at_col_mut(j + 1);
    let basis = basis.into_const();
    let v_curr = basis.col(j);
    let mut y = next.col_mut(0);
    operator.apply(y.rb_mut(), v_curr);

    // alpha_j = <v_j, A v_j>, real for a Hermitian operator.
    let alpha = U::extract(&(v_curr.adjoint() * y.rb()));
    axpy_neg(&alpha.embed(), v_curr, y.rb_mut());
    h[(j, j)] = alpha;

    // The first step has no predecessor to remove.
    if j > 0 {
        let beta_prev = h[(j, j - 1)].embed();
        axpy_neg(&beta_prev, basis.col(j - 1), y.rb_mut());
    }

    // beta_j = ||y||, then v_{j+1} = y / beta_j.
    let beta = y.rb().norm_l2();
    h[(j + 1, j)] = U::from_norm(&beta);
    normalize(y, &beta);
    beta
}

/// Copies the sub-diagonal of the leading `m × m` block of `h` onto its super-diagonal.
fn mirror_subdiagonal<U: Clone>(mut h: MatMut<'_, U>, m: usize) {
    for i in 0..m.saturating_sub(1) {
        let beta = h[(i + 1, i)].clone();
        h[(i, i + 1)] = beta;
    }
}

/// Runs the Lanczos process on `ks`, overwriting its basis, coefficients and `β`.
///
/// The operator is assumed to be Hermitian; this is not checked. On return the active
/// block of `H` is tridiagonal with equal sub- and super-diagonals, also after a happy
/// breakdown.
///
/// # Errors
/// Same conditions as [`crate::algorithms::arnoldi::arnoldi_into`].
///
/// # Example
///
/// ```
/// use faer::{Mat, c64};
/// use krylov_subspace::{KrylovOptions, KrylovSubspace, lanczos_into};
///
/// // A complex Hermitian operator still yields real Lanczos coefficients.
/// let a = Mat::<c64>::from_fn(3, 3, |i, j| match (i, j) {
///     (0, 1) => c64::new(0.0, 1.0),
///     (1, 0) => c64::new(0.0, -1.0),
///     _ if i == j => c64::new(2.0, 0.0),
///     _ => c64::new(0.0, 0.0),
/// });
/// let b = Mat::<c64>::from_fn(3, 1, |_, _| c64::new(1.0, 0.0));
///
/// let mut ks = KrylovSubspace::<c64, f64>::new(3, 2);
/// lanczos_into(&mut ks, &a, b.col(0), &KrylovOptions::default()).unwrap();
/// assert_eq!(ks.superdiagonal()[0], ks.subdiagonal()[0]);
/// ```
pub fn lanczos_into<T, U, O>(
    ks: &mut KrylovSubspace<T, U>,
    operator: &O,
    b: ColRef<'_, T>,
    options: &KrylovOptions<'_, T::Real>,
) -> Result<KrylovStatus, KrylovError>
where
    T: ComplexField,
    U: Coefficient<T>,
    O: LinearOperator<T> + ?Sized,
{
    let setup = begin_run(ks, operator, b, options)?;
    let m = setup.m;
    log::debug!(
        "Lanczos: n = {}, m = {}, tolerance = {:?}",
        ks.n(),
        m,
        setup.vtol
    );

    // --- Main iteration ---
    let zero_value = zero::<T::Real>();
    let mut status = KrylovStatus::Completed { m };
    let (mut v, mut h) = ks.active_mut();
    for j in 0..m {
        let beta = lanczos_step(j, operator, v.rb_mut(), h.rb_mut());
        log::trace!("Lanczos step {j}: beta = {beta:?}");
        // Breakdown check before v_{j+1} is used by the next step.
        if is_happy_breakdown(&beta, &setup.vtol, &zero_value) {
            status = KrylovStatus::HappyBreakdown { m: j + 1 };
            break;
        }
    }
    // --- Finalization ---
    // Only the sub-diagonal was written during the loop.
    mirror_subdiagonal(h, status.m());

    if let KrylovStatus::HappyBreakdown { m } = status {
        log::debug!("Lanczos: happy breakdown, subspace truncated to m = {m}.");
        ks.m = m;
    }
    Ok(status)
}
