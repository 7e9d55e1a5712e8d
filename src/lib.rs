//! Krylov subspace construction by the Arnoldi and Lanczos processes.
//!
//! Given a square linear operator A and a starting vector b, this crate builds an
//! orthonormal basis V of the Krylov subspace
//!
//! ```text
//! K_m(A, b) = span{b, Ab, A²b, …, A^(m-1) b}
//! ```
//!
//! together with the projected coefficient matrix H, so that
//! `A V[:, 0..m] = V[:, 0..m+1] H`. The pair (V, H) is the building block of
//! exponential integrators, matrix-function evaluation f(A)b and eigenvalue
//! approximations; those consumers are out of scope here.
//!
//! Built on the [`faer`] linear algebra framework. The operator is anything implementing
//! [`LinearOperator`]: dense and sparse [`faer`] matrices out of the box, and any
//! [`faer::matrix_free::LinOp`] through the [`MatrixFree`] adapter.
//!
//! ## Algorithms
//!
//! **Arnoldi** ([`arnoldi_into`]): general operators. H is upper Hessenberg. An
//! incomplete orthogonalization depth `iop` limits each step to the `iop` most recent
//! basis vectors.
//!
//! **Lanczos** ([`lanczos_into`]): Hermitian operators. H is real symmetric tridiagonal
//! and each step costs a single product and two vector updates, independently of `m`.
//!
//! Both stop early on a *happy breakdown*: when the next direction has norm below
//! `tol · ‖A‖∞` the subspace is A-invariant, and the active dimension shrinks to the
//! number of completed steps. This is reported through [`KrylovStatus`], not as an error.
//!
//! ## Example Usage
//!
//! ```rust
//! use faer::Mat;
//! use krylov_subspace::{KrylovOptions, KrylovSubspace, build_krylov_subspace, krylov_subspace_into};
//!
//! // 1D Laplacian, symmetric, so the Lanczos path is taken.
//! let n = 50;
//! let a = Mat::<f64>::from_fn(n, n, |i, j| {
//!     if i == j { 2.0 }
//!     else if i.abs_diff(j) == 1 { -1.0 }
//!     else { 0.0 }
//! });
//! let b = Mat::<f64>::from_fn(n, 1, |i, _| (i + 1) as f64);
//!
//! // One-shot: allocates a subspace of capacity min(30, n).
//! let output = build_krylov_subspace(&a, b.col(0), &KrylovOptions::default()).unwrap();
//! assert!(output.subspace.is_hermitian());
//! assert_eq!(output.status.m(), 30);
//!
//! // Reusing a caller-owned subspace across runs.
//! let mut ks = KrylovSubspace::<f64, f64>::new(n, 10);
//! let options = KrylovOptions::default().with_m(10);
//! krylov_subspace_into(&mut ks, &a, b.col(0), &options).unwrap();
//!
//! let v = ks.basis();
//! let residual = &a * v.get(.., 0..10) - v * ks.hessenberg();
//! assert!(residual.norm_l2() < 1e-10);
//! ```

pub mod algorithms;
pub mod dispatch;
pub mod error;
pub mod operator;
pub mod options;
pub mod scalar;
pub mod subspace;
pub mod utils;

pub use algorithms::{KrylovStatus, arnoldi::arnoldi_into, lanczos::lanczos_into};
pub use dispatch::{KrylovOutput, Subspace, build_krylov_subspace, krylov_subspace_into};
pub use error::KrylovError;
pub use operator::{LinearOperator, MatrixFree};
pub use options::{KrylovOptions, OpNorm};
pub use scalar::Coefficient;
pub use subspace::KrylovSubspace;
