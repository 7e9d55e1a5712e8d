//! This module defines the custom error types for the library.
//!
//! Every failure a Krylov run can report before touching the subspace is collected
//! into a single enum, [`KrylovErrorKind`], hidden behind the public [`KrylovError`].
//!
//! A happy breakdown is deliberately absent from this list: it is a valid terminal
//! state of the iteration and is reported through
//! [`crate::algorithms::KrylovStatus::HappyBreakdown`] instead.
use thiserror::Error;

/// Represents all possible errors that can occur while building a Krylov subspace.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct KrylovError(#[from] KrylovErrorKind);

impl KrylovError {
    /// Returns `true` if the error was caused by incompatible dimensions.
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(
            self.0,
            KrylovErrorKind::DimensionMismatch { .. } | KrylovErrorKind::NonSquareOperator { .. }
        )
    }
}

/// Private enum containing the distinct kinds of errors.
#[derive(Error, Debug, PartialEq)]
pub(crate) enum KrylovErrorKind {
    /// Two dimensions that must agree do not, e.g. the length of `b` and the
    /// ambient dimension of the subspace.
    #[error("Dimension mismatch for {context}: expected {expected}, found {actual}.")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The operator must map the ambient space onto itself.
    #[error("Operator must be square, but has {nrows} rows and {ncols} columns.")]
    NonSquareOperator { nrows: usize, ncols: usize },

    /// Indicates that an invalid input parameter was provided to a function.
    #[error("Invalid input parameter: {0}")]
    InputError(String),
}

impl PartialEq for KrylovError {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
