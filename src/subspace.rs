//! The Krylov subspace container.
//!
//! A [`KrylovSubspace`] owns the basis matrix `V` (`n × (maxiter + 1)`) and the
//! coefficient matrix `H` (`(maxiter + 1) × maxiter`) filled in by the Arnoldi and
//! Lanczos drivers. After a run with final dimension `m` they satisfy
//!
//! ```text
//! A · V[:, 0..m] = V[:, 0..m+1] · H[0..m+1, 0..m]
//! ```
//!
//! The storage is allocated once and reused across runs. Every view handed out by
//! the accessors is computed from the live value of `m`, and borrows the container,
//! so no view can outlive a subsequent run or [`KrylovSubspace::resize`].

use faer::{
    Mat, MatMut, MatRef,
    prelude::*,
    traits::{ComplexField, math_utils::zero},
};

use crate::{options::DEFAULT_MAXITER, scalar::Coefficient};

/// Orthonormal Krylov basis `V` together with its Hessenberg coefficients `H`.
///
/// `T` is the scalar type of the vectors, `U` the scalar type of the coefficients
/// (`T::Real` for Hermitian operators, `T` otherwise).
#[derive(Debug, Clone)]
pub struct KrylovSubspace<T: ComplexField, U> {
    pub(crate) m: usize,
    pub(crate) maxiter: usize,
    pub(crate) beta: T::Real,
    pub(crate) v: Mat<T>,
    pub(crate) h: Mat<U>,
}

impl<T: ComplexField, U: Coefficient<T>> KrylovSubspace<T, U> {
    /// Allocates a subspace of ambient dimension `n` able to hold `maxiter` steps.
    ///
    /// `V` and `H` are zero-filled and `m` starts at `maxiter`.
    ///
    /// # Panics
    /// Panics if `maxiter == 0`.
    pub fn new(n: usize, maxiter: usize) -> Self {
        assert!(maxiter > 0, "Krylov subspace capacity must be positive.");
        Self {
            m: maxiter,
            maxiter,
            beta: zero(),
            v: Mat::zeros(n, maxiter + 1),
            h: Mat::zeros(maxiter + 1, maxiter),
        }
    }

    /// Allocates a subspace with the default capacity of 30 steps.
    pub fn with_default_capacity(n: usize) -> Self {
        Self::new(n, DEFAULT_MAXITER)
    }

    /// Dimension of the ambient vector space.
    #[inline]
    pub fn n(&self) -> usize {
        self.v.nrows()
    }

    /// Current active dimension.
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    /// Allocated capacity.
    #[inline]
    pub fn maxiter(&self) -> usize {
        self.maxiter
    }

    /// 2-norm of the starting vector of the last run.
    #[inline]
    pub fn beta(&self) -> T::Real {
        self.beta.clone()
    }

    /// Active basis `V[:, 0..m+1]`.
    pub fn basis(&self) -> MatRef<'_, T> {
        self.v.as_ref().get(.., 0..self.m + 1)
    }

    /// Active coefficient block `H[0..m+1, 0..m]`.
    pub fn coefficients(&self) -> MatRef<'_, U> {
        self.h.as_ref().get(0..self.m + 1, 0..self.m)
    }

    /// Main diagonal of the active block (`α` of the Lanczos recurrence).
    pub fn diagonal(&self) -> ColRef<'_, U> {
        self.h
            .as_ref()
            .submatrix(0, 0, self.m, self.m)
            .diagonal()
            .column_vector()
    }

    /// First sub-diagonal of the active block (`β` of the Lanczos recurrence).
    ///
    /// It has `m` entries, the last being `H[m, m-1]`.
    pub fn subdiagonal(&self) -> ColRef<'_, U> {
        self.h
            .as_ref()
            .submatrix(1, 0, self.m, self.m)
            .diagonal()
            .column_vector()
    }

    /// First super-diagonal of the active block, `m - 1` entries.
    pub fn superdiagonal(&self) -> ColRef<'_, U> {
        self.h
            .as_ref()
            .submatrix(0, 1, self.m - 1, self.m - 1)
            .diagonal()
            .column_vector()
    }

    /// Active coefficient block lifted into the vector scalar type.
    pub fn hessenberg(&self) -> Mat<T> {
        let h = self.coefficients();
        Mat::from_fn(h.nrows(), h.ncols(), |i, j| h[(i, j)].embed())
    }

    /// Destructively reallocates the storage for `maxiter` steps.
    ///
    /// This is expensive: both matrices are replaced by fresh zero-filled buffers and
    /// all previous contents are dropped. Sets `m = maxiter`.
    ///
    /// # Panics
    /// Panics if `maxiter == 0`.
    pub fn resize(&mut self, maxiter: usize) {
        assert!(maxiter > 0, "Krylov subspace capacity must be positive.");
        log::debug!(
            "Resizing Krylov subspace from capacity {} to {}.",
            self.maxiter,
            maxiter
        );
        let n = self.n();
        self.v = Mat::zeros(n, maxiter + 1);
        self.h = Mat::zeros(maxiter + 1, maxiter);
        self.m = maxiter;
        self.maxiter = maxiter;
    }

    /// Sets the active dimension, growing the storage first when `m` exceeds capacity.
    pub(crate) fn prepare(&mut self, m: usize) {
        if m > self.maxiter {
            self.resize(m);
        } else {
            self.m = m;
        }
    }

    /// Splits the container into the live views a driver writes to.
    pub(crate) fn active_mut(&mut self) -> (MatMut<'_, T>, MatMut<'_, U>) {
        let m = self.m;
        (
            self.v.as_mut().get_mut(.., 0..m + 1),
            self.h.as_mut().get_mut(0..m + 1, 0..m),
        )
    }
}
