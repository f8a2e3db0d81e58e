//! Numeric trait bounds for matrix values, dimension indices and stored types.

use core::fmt::{Debug, Display};
use core::hash::Hash;
use core::ops::{AddAssign, SubAssign};

use num_traits::{AsPrimitive, Bounded, ConstOne, ConstZero, Unsigned, Zero};

/// Trait for types that can be fallibly created from a `usize`.
pub trait TryFromUsize: TryFrom<usize> + Copy {
    /// Tries to create a value from a `usize`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented.
    fn try_from_usize(v: usize) -> Result<Self, Self::Error> {
        Self::try_from(v)
    }
}
impl<T: TryFrom<usize> + Copy> TryFromUsize for T {}

/// Trait for types usable as matrix values.
pub trait MatrixValue:
    Copy + PartialEq + PartialOrd + Debug + Zero + Send + Sync + 'static
{
}
impl<T: Copy + PartialEq + PartialOrd + Debug + Zero + Send + Sync + 'static> MatrixValue for T {}

/// Trait for unsigned integers usable as row/column indices.
pub trait MatrixIndex:
    Unsigned
    + Copy
    + Eq
    + Ord
    + Hash
    + Debug
    + Display
    + Bounded
    + AsPrimitive<usize>
    + TryFromUsize
    + ConstZero
    + ConstOne
    + AddAssign
    + SubAssign
    + Send
    + Sync
    + 'static
{
}
impl<
    T: Unsigned
        + Copy
        + Eq
        + Ord
        + Hash
        + Debug
        + Display
        + Bounded
        + AsPrimitive<usize>
        + TryFromUsize
        + ConstZero
        + ConstOne
        + AddAssign
        + SubAssign
        + Send
        + Sync
        + 'static,
> MatrixIndex for T
{
}

/// Trait for the index and pointer types a sparse layout stores internally.
///
/// Stored types may be narrower than the [`MatrixIndex`](crate::traits::MatrixIndex)
/// exposed at the interface; they only need to reach `usize` for addressing.
pub trait StoredIndex: Copy + Ord + Debug + AsPrimitive<usize> + Send + Sync + 'static {}
impl<T: Copy + Ord + Debug + AsPrimitive<usize> + Send + Sync + 'static> StoredIndex for T {}

/// Converts a `usize` known to be in range into an index type.
///
/// Callers must have already established that `v` fits; a failure here means
/// the matrix reached an illegal state.
pub(crate) fn index_from_usize<I: MatrixIndex>(v: usize) -> I {
    I::try_from_usize(v).unwrap_or_else(|_| {
        unreachable!("the matrix is in an illegal state where a dimension index does not fit its index type")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_usize() {
        assert_eq!(u8::try_from_usize(200), Ok(200_u8));
        assert!(u8::try_from_usize(300).is_err());
        assert_eq!(u32::try_from_usize(70_000), Ok(70_000_u32));
    }

    #[test]
    fn test_index_from_usize() {
        let x: u16 = index_from_usize(1234);
        assert_eq!(x, 1234);
    }
}
