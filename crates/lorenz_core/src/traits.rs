use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// Floating-point type the field and the schemes are generic over (`f64` in practice,
/// `f32` where single precision is enough).
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` coefficient into the scalar type, NaN if it has no representation.
pub(crate) fn constant<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// An autonomous vector field `x' = f(x)` on `R^n`.
///
/// Time never enters the right-hand side; callers own the clock.
pub trait VectorField<T: Scalar> {
    fn dimension(&self) -> usize;

    /// Writes `f(x)` into `out`. Both slices have length [`dimension`](Self::dimension).
    fn eval(&self, x: &[T], out: &mut [T]);
}

/// A fixed-step explicit scheme.
pub trait OneStep<T: Scalar> {
    /// Replaces `state` with its image after one step of size `h`.
    fn advance(&mut self, field: &impl VectorField<T>, state: &mut [T], h: T);
}
