//! This module defines the operator capability consumed by the Krylov iterations.
//!
//! Arnoldi and Lanczos never look at individual matrix entries: the only thing the
//! iteration needs from `A` is the action `y = A x`. Two optional capabilities are
//! used once, at the entry point, and never inside the loop:
//!
//! - whether `A` is Hermitian (symmetric in the real case), which selects the
//!   three-term Lanczos recurrence;
//! - the infinity norm of `A`, which scales the happy-breakdown tolerance.
//!
//! Both default to "unknown" ([`false`] and [`None`]), so a matrix-free operator only
//! has to provide its dimensions and its action. Dense and sparse [`faer`] matrices
//! probe their stored entries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use faer::{
    Accum, Mat, MatMut, MatRef, Par,
    dyn_stack::{MemBuffer, MemStack},
    linalg::matmul::matmul,
    matrix_free::LinOp,
    prelude::*,
    sparse::{SparseColMat, SparseColMatRef, linalg::matmul::sparse_dense_matmul},
    traits::{
        ComplexField,
        math_utils::{abs, add, conj, max, one, zero},
    },
};

/// Represents a square linear operator that can be applied to a vector.
///
/// # Example
///
/// ```
/// use faer::{Mat, mat};
/// use krylov_subspace::LinearOperator;
///
/// let a: Mat<f64> = mat![[2.0, 1.0], [1.0, 3.0]];
/// let x = Mat::<f64>::from_fn(2, 1, |_, _| 1.0);
/// let mut y = Mat::<f64>::zeros(2, 1);
///
/// a.apply(y.col_mut(0), x.col(0));
/// assert_eq!(y[(0, 0)], 3.0);
/// assert!(a.is_hermitian());
/// assert_eq!(a.opnorm_inf(), Some(4.0));
/// ```
pub trait LinearOperator<T: ComplexField> {
    /// Returns the number of rows of the operator.
    fn nrows(&self) -> usize;

    /// Returns the number of columns of the operator.
    fn ncols(&self) -> usize;

    /// Computes `out = A * rhs`, overwriting `out`.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `rhs` does not have `ncols()` rows or `out` does not
    /// have `nrows()` rows. The drivers validate dimensions before the first call.
    fn apply(&self, out: ColMut<'_, T>, rhs: ColRef<'_, T>);

    /// Reports whether the operator is Hermitian (symmetric for real scalars).
    fn is_hermitian(&self) -> bool {
        false
    }

    /// Returns the induced infinity norm (maximum absolute row sum), if known.
    fn opnorm_inf(&self) -> Option<T::Real> {
        None
    }
}

/// Exact Hermitian test on a dense view: `a[i, j] == conj(a[j, i])` for all entries.
fn dense_is_hermitian<T: ComplexField>(a: MatRef<'_, T>) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }
    let n = a.nrows();
    (0..n).all(|j| (j..n).all(|i| a[(i, j)] == conj(&a[(j, i)])))
}

fn dense_opnorm_inf<T: ComplexField>(a: MatRef<'_, T>) -> T::Real {
    let mut norm = zero::<T::Real>();
    for i in 0..a.nrows() {
        let mut row_sum = zero::<T::Real>();
        for j in 0..a.ncols() {
            row_sum = add(&row_sum, &abs(&a[(i, j)]));
        }
        norm = max(&norm, &row_sum);
    }
    norm
}

impl<'a, T: ComplexField> LinearOperator<T> for MatRef<'a, T> {
    #[inline]
    fn nrows(&self) -> usize {
        (*self).nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        (*self).ncols()
    }

    #[inline]
    fn apply(&self, out: ColMut<'_, T>, rhs: ColRef<'_, T>) {
        assert_eq!(
            (*self).ncols(),
            rhs.nrows(),
            "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
            (*self).ncols(),
            rhs.nrows(),
        );
        matmul(
            out.as_mat_mut(),
            Accum::Replace,
            *self,
            rhs.as_mat(),
            one::<T>(),
            Par::Seq,
        );
    }

    fn is_hermitian(&self) -> bool {
        dense_is_hermitian(*self)
    }

    fn opnorm_inf(&self) -> Option<T::Real> {
        Some(dense_opnorm_inf(*self))
    }
}

impl<'a, T: ComplexField> LinearOperator<T> for MatMut<'a, T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.rb().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.rb().ncols()
    }

    #[inline]
    fn apply(&self, out: ColMut<'_, T>, rhs: ColRef<'_, T>) {
        LinearOperator::apply(&self.rb(), out, rhs)
    }

    fn is_hermitian(&self) -> bool {
        dense_is_hermitian(self.rb())
    }

    fn opnorm_inf(&self) -> Option<T::Real> {
        Some(dense_opnorm_inf(self.rb()))
    }
}

impl<T: ComplexField> LinearOperator<T> for Mat<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.as_ref().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.as_ref().ncols()
    }

    #[inline]
    fn apply(&self, out: ColMut<'_, T>, rhs: ColRef<'_, T>) {
        LinearOperator::apply(&self.as_ref(), out, rhs)
    }

    fn is_hermitian(&self) -> bool {
        dense_is_hermitian(self.as_ref())
    }

    fn opnorm_inf(&self) -> Option<T::Real> {
        Some(dense_opnorm_inf(self.as_ref()))
    }
}

impl<'a, T: ComplexField> LinearOperator<T> for SparseColMatRef<'a, usize, T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.symbolic().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.symbolic().ncols()
    }

    #[inline]
    fn apply(&self, out: ColMut<'_, T>, rhs: ColRef<'_, T>) {
        sparse_dense_matmul(
            out.as_mat_mut(),
            Accum::Replace,
            *self,
            rhs.as_mat(),
            one::<T>(),
            Par::Seq,
        );
    }

    /// Compares every stored entry with its mirrored entry; absent entries count as zero.
    fn is_hermitian(&self) -> bool {
        let shape = self.symbolic();
        if shape.nrows() != shape.ncols() {
            return false;
        }
        let entries: HashMap<(usize, usize), &T> = self
            .triplet_iter()
            .map(|t| ((t.row, t.col), t.val))
            .collect();
        let zero_value = zero::<T>();
        entries.iter().all(|(&(i, j), &val)| {
            let mirrored = entries.get(&(j, i)).copied().unwrap_or(&zero_value);
            *val == conj(mirrored)
        })
    }

    fn opnorm_inf(&self) -> Option<T::Real> {
        let mut row_sums = vec![zero::<T::Real>(); self.symbolic().nrows()];
        for t in self.triplet_iter() {
            row_sums[t.row] = add(&row_sums[t.row], &abs(t.val));
        }
        Some(
            row_sums
                .iter()
                .fold(zero::<T::Real>(), |norm, row_sum| max(&norm, row_sum)),
        )
    }
}

impl<T: ComplexField> LinearOperator<T> for SparseColMat<usize, T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.symbolic().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.symbolic().ncols()
    }

    #[inline]
    fn apply(&self, out: ColMut<'_, T>, rhs: ColRef<'_, T>) {
        LinearOperator::apply(&self.as_ref(), out, rhs)
    }

    fn is_hermitian(&self) -> bool {
        LinearOperator::<T>::is_hermitian(&self.as_ref())
    }

    fn opnorm_inf(&self) -> Option<T::Real> {
        LinearOperator::<T>::opnorm_inf(&self.as_ref())
    }
}

/// Adapts any [`faer::matrix_free::LinOp`] to the [`LinearOperator`] contract.
///
/// A matrix-free operator cannot be probed, so its symmetry and infinity norm are
/// declared by the caller. Without a declared norm the caller has to supply
/// [`crate::options::OpNorm`] explicitly when building a subspace.
pub struct MatrixFree<T: ComplexField, O> {
    op: O,
    hermitian: bool,
    opnorm: Option<T::Real>,
    par: Par,
    // Scratch for one `apply`, sized for `par` and reused across products.
    scratch: RefCell<MemBuffer>,
    _marker: PhantomData<T>,
}

impl<T: ComplexField, O: LinOp<T>> MatrixFree<T, O> {
    /// Wraps `op`, assumed non-Hermitian with unknown norm, applied sequentially.
    pub fn new(op: O) -> Self {
        let scratch = RefCell::new(MemBuffer::new(op.apply_scratch(1, Par::Seq)));
        Self {
            op,
            hermitian: false,
            opnorm: None,
            par: Par::Seq,
            scratch,
            _marker: PhantomData,
        }
    }

    /// Declares whether the wrapped operator is Hermitian.
    pub fn hermitian(mut self, hermitian: bool) -> Self {
        self.hermitian = hermitian;
        self
    }

    /// Declares the infinity norm of the wrapped operator.
    pub fn with_opnorm(mut self, opnorm: T::Real) -> Self {
        self.opnorm = Some(opnorm);
        self
    }

    /// Sets the parallelism forwarded to `LinOp::apply`.
    pub fn with_par(mut self, par: Par) -> Self {
        self.par = par;
        self.scratch = RefCell::new(MemBuffer::new(self.op.apply_scratch(1, par)));
        self
    }

    /// Returns the wrapped operator.
    pub fn inner(&self) -> &O {
        &self.op
    }
}

impl<T: ComplexField, O: fmt::Debug> fmt::Debug for MatrixFree<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixFree")
            .field("op", &self.op)
            .field("hermitian", &self.hermitian)
            .field("opnorm", &self.opnorm)
            .field("par", &self.par)
            .finish_non_exhaustive()
    }
}

impl<T: ComplexField, O: LinOp<T>> LinearOperator<T> for MatrixFree<T, O> {
    #[inline]
    fn nrows(&self) -> usize {
        self.op.nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.op.ncols()
    }

    fn apply(&self, out: ColMut<'_, T>, rhs: ColRef<'_, T>) {
        let mut mem = self.scratch.borrow_mut();
        let stack = MemStack::new(&mut mem);
        self.op.apply(out.as_mat_mut(), rhs.as_mat(), self.par, stack);
    }

    fn is_hermitian(&self) -> bool {
        self.hermitian
    }

    fn opnorm_inf(&self) -> Option<T::Real> {
        self.opnorm.clone()
    }
}
