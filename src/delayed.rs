//! Submodule collecting the delayed decorators: combining, casting,
//! transposition, block subsetting, forced-dense reinterpretation and
//! element-wise operations.

pub mod bind;
pub mod cast;
pub mod forced_dense;
pub mod isometric;
pub mod subset_block;
pub mod transpose;

use std::sync::Arc;

use num_traits::AsPrimitive;

pub use bind::{DelayedBind, make_delayed_bind};
pub use cast::DelayedCast;
pub use forced_dense::ForcedDense;
pub use isometric::{
    AddScalar, AddVector, BinaryAdd, BinaryMultiply, BinaryOperation, BinarySubtract,
    CompareOperation, CompareScalar, DelayedBinaryIsometric, DelayedUnaryIsometric, DivideScalar,
    MultiplyScalar, SubtractScalar, UnaryOperation,
};
pub use subset_block::DelayedSubsetBlock;
pub use transpose::DelayedTranspose;

use crate::errors::MatrixError;
use crate::traits::matrix::SharedMatrix;
use crate::traits::numeric::{MatrixIndex, MatrixValue};

/// Wraps a matrix in a delayed transposition.
pub fn make_delayed_transpose<V: MatrixValue, I: MatrixIndex>(
    inner: SharedMatrix<V, I>,
) -> SharedMatrix<V, I> {
    Arc::new(DelayedTranspose::new(inner))
}

/// Restricts one dimension of a matrix to a contiguous block.
///
/// # Errors
///
/// As for [`DelayedSubsetBlock::new`].
pub fn make_delayed_subset_block<V: MatrixValue, I: MatrixIndex>(
    inner: SharedMatrix<V, I>,
    by_row: bool,
    start: I,
    length: I,
) -> Result<SharedMatrix<V, I>, MatrixError> {
    Ok(Arc::new(DelayedSubsetBlock::new(inner, by_row, start, length)?))
}

/// Re-types a matrix for exposure with a different value and index type.
///
/// # Errors
///
/// As for [`DelayedCast::new`].
pub fn make_delayed_cast<VO, IO, VI, II>(
    inner: SharedMatrix<VI, II>,
) -> Result<SharedMatrix<VO, IO>, MatrixError>
where
    VO: MatrixValue,
    IO: MatrixIndex,
    VI: MatrixValue + AsPrimitive<VO>,
    II: MatrixIndex,
{
    Ok(Arc::new(DelayedCast::<VO, IO, VI, II>::new(inner)?))
}

/// Wraps a matrix so it reports itself as dense.
pub fn make_forced_dense<V: MatrixValue, I: MatrixIndex>(
    inner: SharedMatrix<V, I>,
) -> SharedMatrix<V, I> {
    Arc::new(ForcedDense::new(inner))
}

/// Attaches an element-wise operation to a matrix.
///
/// # Errors
///
/// As for [`DelayedUnaryIsometric::new`].
pub fn make_delayed_unary_isometric<V: MatrixValue, I: MatrixIndex>(
    inner: SharedMatrix<V, I>,
    operation: Arc<dyn UnaryOperation<V, I>>,
) -> Result<SharedMatrix<V, I>, MatrixError> {
    Ok(Arc::new(DelayedUnaryIsometric::new(inner, operation)?))
}

/// Attaches an entry-corresponding operation to a pair of matrices.
///
/// # Errors
///
/// As for [`DelayedBinaryIsometric::new`].
pub fn make_delayed_binary_isometric<V: MatrixValue, I: MatrixIndex>(
    left: SharedMatrix<V, I>,
    right: SharedMatrix<V, I>,
    operation: Arc<dyn BinaryOperation<V>>,
) -> Result<SharedMatrix<V, I>, MatrixError> {
    Ok(Arc::new(DelayedBinaryIsometric::new(left, right, operation)?))
}
