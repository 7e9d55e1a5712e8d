//! Arnoldi iteration with an incomplete orthogonalization window.
//!
//! For a general operator the new vector `A v_j` has to be orthogonalized against the
//! previous basis vectors explicitly. [`arnoldi_step`] does this with modified
//! Gram-Schmidt over the `iop` most recent vectors `v_{j-iop+1}, …, v_j`. With
//! `iop >= j + 1` this is the classical full Arnoldi process and `H` is upper
//! Hessenberg with all entries above the sub-diagonal populated; with a smaller window
//! only a band of width `iop` above the sub-diagonal is filled, and the basis is only
//! locally orthogonal.

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

/// Performs step `j` (zero-based) of the Arnoldi process.
///
/// Reads `v[:, 0..=j]`, writes the next basis vector into `v[:, j + 1]` and the
/// coefficients into `h[0..=j+1, j]`. Returns the norm `β` of the orthogonalized vector
/// before normalization, which is also stored in `h[j + 1, j]`. When `β` is exactly zero
/// the new column is left as the zero vector.
///
/// # Panics
/// Panics if `v` has fewer than `j + 2` columns or `h` is smaller than `(j + 2) × (j + 1)`.
pub fn arnoldi_step<T, U, O>(
    j: usize,
    iop: usize,
    operator: &O,
    v: MatMut<'_, T>,
    mut h: MatMut<'_, U>,
) -> T::Real
where
    T: ComplexField,
    U: Coefficient<T>,
    O: LinearOperator<T> + ?Sized,
{
    // Columns 0..=j are read-only for this step; column j + 1 receives A v_j.
    let (basis, next) = v.split_at_col_mut(j + 1);
    let basis = basis.into_const();
    let mut y = next.col_mut(0);
    operator.apply(y.rb_mut(), basis.col(j));

    // Modified Gram-Schmidt against the `iop` most recent vectors only.
    for i in (j + 1).saturating_sub(iop)..=j {
        let vi = basis.col(i);
        let coeff = U::extract(&(vi.adjoint() * y.rb()));
        axpy_neg(&coeff.embed(), vi, y.rb_mut());
        h[(i, j)] = coeff;
    }

    // Sub-diagonal entry, then v_{j+1} = y / beta.
    let beta = y.rb().norm_l2();
    h[(j + 1, j)] = U::from_norm(&beta);
    normalize(y, &beta);
    beta
}

/// Runs the Arnoldi process on `ks`, overwriting its basis, coefficients and `β`.
///
/// `options.iop == 0` orthogonalizes against the full basis. On a happy breakdown after
/// step `j` the active dimension shrinks to `j + 1` and
/// [`KrylovStatus::HappyBreakdown`] is returned.
///
/// # Errors
/// Returns a [`KrylovError`] without touching `ks` if the operator is not square, if
/// its dimension or the length of `b` differ from `ks.n()`, if the requested `m` is zero,
/// or if no operator norm is available.
///
/// # Example
///
/// ```
/// use faer::{Mat, mat};
/// use krylov_subspace::{KrylovOptions, KrylovSubspace, arnoldi_into};
///
/// let a: Mat<f64> = mat![[1.0, 2.0, 0.0], [0.0, 1.0, 3.0], [4.0, 0.0, 1.0]];
/// let b: Mat<f64> = mat![[1.0], [0.0], [0.0]];
///
/// let mut ks = KrylovSubspace::<f64, f64>::new(3, 3);
/// let status = arnoldi_into(&mut ks, &a, b.col(0), &KrylovOptions::default()).unwrap();
/// assert_eq!(status.m(), 3);
/// assert_eq!(ks.beta(), 1.0);
/// ```
pub fn arnoldi_into<T, U, O>(
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
    let iop = if options.iop == 0 { m } else { options.iop };
    log::debug!(
        "Arnoldi: n = {}, m = {}, iop = {}, tolerance = {:?}",
        ks.n(),
        m,
        iop,
        setup.vtol
    );

    // --- Main iteration ---
    let zero_value = zero::<T::Real>();
    let mut status = KrylovStatus::Completed { m };
    let (mut v, mut h) = ks.active_mut();
    for j in 0..m {
        let beta = arnoldi_step(j, iop, operator, v.rb_mut(), h.rb_mut());
        log::trace!("Arnoldi step {j}: beta = {beta:?}");
        // Invariant subspace found: V[:, 0..=j] spans it and H is complete.
        if is_happy_breakdown(&beta, &setup.vtol, &zero_value) {
            status = KrylovStatus::HappyBreakdown { m: j + 1 };
            break;
        }
    }

    // --- Finalization ---
    if let KrylovStatus::HappyBreakdown { m } = status {
        log::debug!("Arnoldi: happy breakdown, subspace truncated to m = {m}.");
        ks.m = m;
    }
    Ok(status)
}
