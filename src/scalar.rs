//! Coefficient extraction for the Hessenberg matrix `H`.
//!
//! The basis vectors always live in the operator's scalar type `T`, but the
//! coefficients may be stored in a different type `U`. For a Hermitian operator the
//! Lanczos coefficients are real even when `T` is complex, so they are stored in
//! `T::Real`; for a general operator `U = T`.
//!
//! [`Coefficient`] is the single conversion point between the two. It is resolved at
//! monomorphization time: there are no runtime type checks in the iteration.

use faer::{c32, c64, traits::ComplexField};

/// A scalar type that can hold projection coefficients of vectors with elements of type `T`.
pub trait Coefficient<T: ComplexField>: ComplexField {
    /// Converts an inner product into a stored coefficient.
    ///
    /// For a real coefficient type this keeps the real part of the (possibly complex)
    /// inner product, otherwise it is the identity.
    fn extract(value: &T) -> Self;

    /// Lifts a stored coefficient back into the vector scalar type.
    fn embed(&self) -> T;

    /// Stores a vector norm as a coefficient.
    fn from_norm(value: &T::Real) -> Self;
}

macro_rules! impl_real_coefficient {
    ($real:ty, $complex:ty) => {
        impl Coefficient<$real> for $real {
            #[inline]
            fn extract(value: &$real) -> Self {
                *value
            }

            #[inline]
            fn embed(&self) -> $real {
                *self
            }

            #[inline]
            fn from_norm(value: &$real) -> Self {
                *value
            }
        }

        impl Coefficient<$complex> for $real {
            #[inline]
            fn extract(value: &$complex) -> Self {
                value.re
            }

            #[inline]
            fn embed(&self) -> $complex {
                <$complex>::new(*self, 0.0)
            }

            #[inline]
            fn from_norm(value: &$real) -> Self {
                *value
            }
        }

        impl Coefficient<$complex> for $complex {
            #[inline]
            fn extract(value: &$complex) -> Self {
                *value
            }

            #[inline]
            fn embed(&self) -> $complex {
                *self
            }

            #[inline]
            fn from_norm(value: &$real) -> Self {
                <$complex>::new(*value, 0.0)
            }
        }
    };
}

impl_real_coefficient!(f32, c32);
impl_real_coefficient!(f64, c64);
