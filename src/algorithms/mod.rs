//! Arnoldi and Lanczos drivers that fill a [`KrylovSubspace`].
//!
//! Both drivers share the same entry protocol:
//!
//! 1. validate every dimension and the requested subspace size, before any mutation;
//! 2. resolve the operator norm used to scale the breakdown tolerance;
//! 3. size the container for `m` steps, growing it when `m` exceeds its capacity;
//! 4. zero the active block of `H`, store `β = ‖b‖₂` and write `V[:, 0] = b / β`.
//!
//! They then differ only in the single-step routine: [`arnoldi`] orthogonalizes the new
//! vector against a window of the `iop` most recent basis vectors, [`lanczos`] uses the
//! three-term recurrence valid for Hermitian operators.
//!
//! A happy breakdown (the new vector is numerically zero, `β < tol · ‖A‖∞`) is a
//! successful outcome: the run stops early and shrinks `m` to the number of completed
//! steps. It is reported through [`KrylovStatus`], never as an error.

pub mod arnoldi;
pub mod lanczos;

use faer::{
    prelude::*,
    unzip, zip,
    traits::{
        ComplexField,
        math_utils::{mul, mul_real, recip, sub, zero},
    },
};

use crate::{
    error::{KrylovError, KrylovErrorKind},
    operator::LinearOperator,
    options::KrylovOptions,
    scalar::Coefficient,
    subspace::KrylovSubspace,
};

/// Terminal state of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KrylovStatus {
    /// All `m` requested steps were performed.
    Completed { m: usize },
    /// The iteration found an invariant subspace after `m` steps.
    HappyBreakdown { m: usize },
}

impl KrylovStatus {
    /// Final dimension of the subspace.
    pub fn m(&self) -> usize {
        match *self {
            Self::Completed { m } | Self::HappyBreakdown { m } => m,
        }
    }

    pub fn is_breakdown(&self) -> bool {
        matches!(self, Self::HappyBreakdown { .. })
    }
}

/// Quantities fixed at driver entry.
pub(crate) struct RunSetup<R> {
    pub(crate) m: usize,
    /// Absolute breakdown threshold, `tol · opnorm`.
    pub(crate) vtol: R,
}

/// Checks that `operator` and `b` fit a subspace of ambient dimension `n`.
pub(crate) fn validate_dimensions<T, O>(
    n: usize,
    operator: &O,
    b: ColRef<'_, T>,
) -> Result<(), KrylovError>
where
    T: ComplexField,
    O: LinearOperator<T> + ?Sized,
{
    if operator.nrows() != operator.ncols() {
        return Err(KrylovErrorKind::NonSquareOperator {
            nrows: operator.nrows(),
            ncols: operator.ncols(),
        }
        .into());
    }
    if operator.ncols() != n {
        return Err(KrylovErrorKind::DimensionMismatch {
            context: "operator",
            expected: n,
            actual: operator.ncols(),
        }
        .into());
    }
    if b.nrows() != n {
        return Err(KrylovErrorKind::DimensionMismatch {
            context: "starting vector b",
            expected: n,
            actual: b.nrows(),
        }
        .into());
    }
    Ok(())
}

/// Runs the shared entry protocol and leaves `ks` ready for step `j = 0`.
///
/// On error `ks` is left untouched.
pub(crate) fn begin_run<T, U, O>(
    ks: &mut KrylovSubspace<T, U>,
    operator: &O,
    b: ColRef<'_, T>,
    options: &KrylovOptions<'_, T::Real>,
) -> Result<RunSetup<T::Real>, KrylovError>
where
    T: ComplexField,
    U: Coefficient<T>,
    O: LinearOperator<T> + ?Sized,
{
    let n = ks.n();
    validate_dimensions(n, operator, b)?;

    let m = options.m.unwrap_or_else(|| Ord::min(ks.maxiter(), n));
    if m == 0 {
        return Err(KrylovErrorKind::InputError(
            "The subspace dimension `m` must be positive.".to_string(),
        )
        .into());
    }
    let opnorm = options.resolve_opnorm::<T, O>(operator)?;
    let vtol = mul(&options.tol, &opnorm);

    ks.prepare(m);
    let beta = b.norm_l2();
    let (mut v, mut h) = ks.active_mut();
    h.fill(zero());
    let mut v0 = v.rb_mut().col_mut(0);
    v0.copy_from(b);
    normalize(v0, &beta);
    ks.beta = beta;

    Ok(RunSetup { m, vtol })
}

/// `y ← y - alpha · x`.
pub(crate) fn axpy_neg<T: ComplexField>(alpha: &T, x: ColRef<'_, T>, y: ColMut<'_, T>) {
    zip!(y, x).for_each(|unzip!(yk, xk)| *yk = sub(&*yk, &mul(alpha, xk)));
}

/// Scales `y` by `1 / beta`. A zero `beta` leaves `y` as is, which is then the zero vector.
pub(crate) fn normalize<T: ComplexField>(y: ColMut<'_, T>, beta: &T::Real) {
    if *beta == zero::<T::Real>() {
        return;
    }
    let inv = recip(beta);
    zip!(y).for_each(|unzip!(yk)| *yk = mul_real(&*yk, &inv));
}

#[inline]
pub(crate) fn is_happy_breakdown<R: PartialOrd>(beta: &R, vtol: &R, zero_value: &R) -> bool {
    beta < vtol || beta == zero_value
}
