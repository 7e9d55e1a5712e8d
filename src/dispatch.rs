//! Top-level entry points that pick the Krylov process for an operator.
//!
//! The Hermitian decision is taken exactly once, here, either from
//! [`KrylovOptions::hermitian`] or by probing [`LinearOperator::is_hermitian`]. Hermitian
//! operators are routed to the Lanczos driver, everything else to Arnoldi.
//!
//! Operator and starting vector share a single scalar type `T`; mixing e.g. a real
//! operator with a complex vector requires converting one of them first.

use faer::{Mat, MatRef, prelude::*, traits::ComplexField};

use crate::{
    algorithms::{KrylovStatus, arnoldi::arnoldi_into, lanczos::lanczos_into, validate_dimensions},
    error::{KrylovError, KrylovErrorKind},
    operator::LinearOperator,
    options::{DEFAULT_MAXITER, KrylovOptions},
    scalar::Coefficient,
    subspace::KrylovSubspace,
};

/// A subspace allocated by [`build_krylov_subspace`], tagged by the path that built it.
#[derive(Debug, Clone)]
pub enum Subspace<T: ComplexField> {
    /// Built by Lanczos; the coefficients are real and `H` is tridiagonal.
    Hermitian(KrylovSubspace<T, T::Real>),
    /// Built by Arnoldi; `H` is upper Hessenberg.
    General(KrylovSubspace<T, T>),
}

impl<T> Subspace<T>
where
    T: ComplexField + Coefficient<T>,
    T::Real: Coefficient<T>,
{
    pub fn is_hermitian(&self) -> bool {
        matches!(self, Self::Hermitian(_))
    }

    pub fn n(&self) -> usize {
        match self {
            Self::Hermitian(ks) => ks.n(),
            Self::General(ks) => ks.n(),
        }
    }

    pub fn m(&self) -> usize {
        match self {
            Self::Hermitian(ks) => ks.m(),
            Self::General(ks) => ks.m(),
        }
    }

    pub fn beta(&self) -> T::Real {
        match self {
            Self::Hermitian(ks) => ks.beta(),
            Self::General(ks) => ks.beta(),
        }
    }

    /// Active basis `V[:, 0..m+1]`.
    pub fn basis(&self) -> MatRef<'_, T> {
        match self {
            Self::Hermitian(ks) => ks.basis(),
            Self::General(ks) => ks.basis(),
        }
    }

    /// Active coefficient block `H[0..m+1, 0..m]` in the vector scalar type.
    pub fn hessenberg(&self) -> Mat<T> {
        match self {
            Self::Hermitian(ks) => ks.hessenberg(),
            Self::General(ks) => ks.hessenberg(),
        }
    }
}

/// Result of [`build_krylov_subspace`].
#[derive(Debug, Clone)]
pub struct KrylovOutput<T: ComplexField> {
    pub subspace: Subspace<T>,
    pub status: KrylovStatus,
}

/// Fills a caller-owned subspace, choosing Lanczos or Arnoldi for `operator`.
///
/// This is the allocation-free entry point for repeated runs. A real coefficient type
/// `U = T::Real` with complex `T` is only meaningful for Hermitian operators: Arnoldi
/// keeps the real part of each projection coefficient.
///
/// # Errors
/// See [`arnoldi_into`].
pub fn krylov_subspace_into<T, U, O>(
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
    if options.resolve_hermitian::<T, O>(operator) {
        log::debug!("Operator is Hermitian, using Lanczos.");
        lanczos_into(ks, operator, b, options)
    } else {
        log::debug!("Operator is not Hermitian, using Arnoldi.");
        arnoldi_into(ks, operator, b, options)
    }
}

/// Allocates a subspace and builds the Krylov decomposition of `operator` seeded by `b`.
///
/// The capacity is `options.m`, or `min(30, n)` when unset. Hermitian operators get a
/// [`Subspace::Hermitian`] with real coefficients, others a [`Subspace::General`].
///
/// # Errors
/// Fails on dimension mismatches, on a zero target dimension (which includes `n == 0`),
/// and when no operator norm can be resolved.
///
/// # Example
///
/// ```
/// use faer::{Mat, mat};
/// use krylov_subspace::{KrylovOptions, build_krylov_subspace};
///
/// let a: Mat<f64> = mat![[2.0, 0.0], [0.0, 3.0]];
/// let b: Mat<f64> = mat![[1.0], [1.0]];
///
/// let output = build_krylov_subspace(&a, b.col(0), &KrylovOptions::default()).unwrap();
/// assert!(output.subspace.is_hermitian());
///
/// let h = output.subspace.hessenberg();
/// assert!((h[(0, 0)] + h[(1, 1)] - 5.0).abs() < 1e-12);
/// ```
pub fn build_krylov_subspace<T, O>(
    operator: &O,
    b: ColRef<'_, T>,
    options: &KrylovOptions<'_, T::Real>,
) -> Result<KrylovOutput<T>, KrylovError>
where
    T: ComplexField + Coefficient<T>,
    T::Real: Coefficient<T>,
    O: LinearOperator<T> + ?Sized,
{
    let n = b.nrows();
    validate_dimensions(n, operator, b)?;
    let capacity = options.m.unwrap_or(Ord::min(DEFAULT_MAXITER, n));
    if capacity == 0 {
        return Err(KrylovErrorKind::InputError(
            "The subspace dimension `m` must be positive.".to_string(),
        )
        .into());
    }

    if options.resolve_hermitian::<T, O>(operator) {
        log::debug!("Operator is Hermitian, using Lanczos with real coefficients.");
        let mut ks = KrylovSubspace::<T, T::Real>::new(n, capacity);
        let status = lanczos_into(&mut ks, operator, b, options)?;
        Ok(KrylovOutput {
            subspace: Subspace::Hermitian(ks),
            status,
        })
    } else {
        log::debug!("Operator is not Hermitian, using Arnoldi.");
        let mut ks = KrylovSubspace::<T, T>::new(n, capacity);
        let status = arnoldi_into(&mut ks, operator, b, options)?;
        Ok(KrylovOutput {
            subspace: Subspace::General(ks),
            status,
        })
    }
}
