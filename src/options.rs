//! Entry-point configuration for building a Krylov subspace.

use std::fmt;

use faer::traits::{ComplexField, RealField};

use crate::{
    error::{KrylovError, KrylovErrorKind},
    operator::LinearOperator,
};

/// Default relative tolerance for happy-breakdown detection.
pub const DEFAULT_TOL: f64 = 1e-7;

/// Default capacity of a freshly allocated subspace.
pub const DEFAULT_MAXITER: usize = 30;

/// An operator norm override: either a known value or a function computing it on demand.
///
/// The function form is evaluated at most once per run, when the driver starts.
pub enum OpNorm<'a, R> {
    /// A precomputed norm.
    Value(R),
    /// A norm computed lazily at driver entry.
    Deferred(Box<dyn Fn() -> R + 'a>),
}

impl<R: fmt::Debug> fmt::Debug for OpNorm<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Options recognized by the drivers and the dispatcher.
///
/// ```
/// use krylov_subspace::KrylovOptions;
///
/// let options = KrylovOptions::<f64>::default()
///     .with_m(10)
///     .with_tol(1e-10)
///     .with_iop(3)
///     .with_opnorm(2.0);
/// assert_eq!(options.m, Some(10));
/// ```
#[derive(Debug)]
pub struct KrylovOptions<'a, R> {
    /// Target subspace dimension. `None` means `min(capacity, n)`.
    pub m: Option<usize>,
    /// Breakdown tolerance, relative to the operator norm.
    pub tol: R,
    /// Orthogonalization depth for the general case. `0` means full depth.
    pub iop: usize,
    /// Overrides the Hermitian probe of the operator.
    pub hermitian: Option<bool>,
    /// Overrides the operator's own infinity norm.
    pub opnorm: Option<OpNorm<'a, R>>,
}

impl<R: RealField> Default for KrylovOptions<'_, R> {
    fn default() -> Self {
        Self {
            m: None,
            tol: R::from_f64_impl(DEFAULT_TOL),
            iop: 0,
            hermitian: None,
            opnorm: None,
        }
    }
}

impl<'a, R: RealField> KrylovOptions<'a, R> {
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = Some(m);
        self
    }

    pub fn with_tol(mut self, tol: R) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_iop(mut self, iop: usize) -> Self {
        self.iop = iop;
        self
    }

    pub fn with_hermitian(mut self, hermitian: bool) -> Self {
        self.hermitian = Some(hermitian);
        self
    }

    pub fn with_opnorm(mut self, opnorm: R) -> Self {
        self.opnorm = Some(OpNorm::Value(opnorm));
        self
    }

    pub fn with_opnorm_fn(mut self, opnorm: impl Fn() -> R + 'a) -> Self {
        self.opnorm = Some(OpNorm::Deferred(Box::new(opnorm)));
        self
    }

    /// Resolves the operator norm used to scale the breakdown tolerance.
    ///
    /// Falls back to [`LinearOperator::opnorm_inf`] when no override is set.
    pub(crate) fn resolve_opnorm<T, O>(&self, operator: &O) -> Result<R, KrylovError>
    where
        T: ComplexField<Real = R>,
        O: LinearOperator<T> + ?Sized,
    {
        match &self.opnorm {
            Some(OpNorm::Value(value)) => Ok(value.clone()),
            Some(OpNorm::Deferred(compute)) => Ok(compute()),
            None => operator.opnorm_inf().ok_or_else(|| {
                KrylovErrorKind::InputError(
                    "the operator does not provide an infinity norm; supply `opnorm` explicitly"
                        .to_string(),
                )
                .into()
            }),
        }
    }

    /// Resolves the Hermitian flag, probing the operator only when no override is set.
    pub(crate) fn resolve_hermitian<T, O>(&self, operator: &O) -> bool
    where
        T: ComplexField<Real = R>,
        O: LinearOperator<T> + ?Sized,
    {
        self.hermitian.unwrap_or_else(|| operator.is_hermitian())
    }
}
