//! Submodule providing delayed element-wise operations and the helper
//! protocol they are parametrized over.

pub mod arith;
pub mod binary;
pub mod unary;

pub use arith::{
    AddScalar, AddVector, BinaryAdd, BinaryMultiply, BinarySubtract, CompareOperation,
    CompareScalar, DivideScalar, MultiplyScalar, SubtractScalar,
};
pub use binary::DelayedBinaryIsometric;
pub use unary::DelayedUnaryIsometric;

use crate::errors::MatrixError;
use crate::traits::extractor::Subset;

/// An element-wise transformation applied to one matrix.
///
/// The decorator owns the extraction; the operation only rewrites slices of
/// fetched values. `row` and `i` name the target dimension and index of the
/// fetch, so operations may vary along either dimension.
pub trait UnaryOperation<V, I>: Send + Sync {
    /// Whether a structural zero always maps to zero, allowing sparse
    /// extraction to stay sparse.
    fn preserves_sparsity(&self) -> bool;

    /// The value a structural zero maps to, for a fetch of target index `i`.
    ///
    /// Consulted when the wrapped matrix is sparse but the operation moves
    /// zeros, and only if [`UnaryOperation::uniform_fill`] holds for the
    /// fetch direction.
    fn fill(&self, row: bool, i: I) -> V;

    /// Whether [`UnaryOperation::fill`] is constant across the non-target
    /// dimension of a fetch along `row`. Operations varying along the
    /// non-target dimension must return false, at which point zeros are
    /// expanded through [`UnaryOperation::dense`] instead.
    fn uniform_fill(&self, row: bool) -> bool {
        let _ = row;
        true
    }

    /// Transforms a dense slice in place. The slice covers the given subset
    /// of the non-target dimension, in subset order.
    fn dense(&self, row: bool, i: I, subset: &Subset<I>, buffer: &mut [V]);

    /// Transforms the values of a sparse slice in place; `indices` holds the
    /// non-target coordinate of each value.
    fn sparse(&self, row: bool, i: I, values: &mut [V], indices: &[I]);

    /// Checks the operation against the shape of the matrix it is being
    /// attached to.
    ///
    /// # Errors
    ///
    /// Implementations fail with [`MatrixError`] when the operation cannot be
    /// applied, e.g. a mismatched addend vector or an unrepresentable result.
    fn validate(&self, nrow: I, ncol: I) -> Result<(), MatrixError> {
        let _ = (nrow, ncol);
        Ok(())
    }
}

/// An entry-corresponding transformation of two equally shaped matrices.
///
/// Binary operations are value-only: the result at any position depends on
/// the two input values alone. Operations that can produce non-zeros from
/// two structural zeros must report that they do not preserve sparsity, at
/// which point extraction degrades to dense assembly.
pub trait BinaryOperation<V>: Send + Sync {
    /// Whether two structural zeros always map to zero.
    fn preserves_sparsity(&self) -> bool;

    /// Combines one left value with the corresponding right value.
    fn apply(&self, left: V, right: V) -> V;

    /// Checks the operation before it is attached.
    ///
    /// # Errors
    ///
    /// Implementations fail with [`MatrixError`] when the operation is not
    /// expressible for the value type.
    fn validate(&self) -> Result<(), MatrixError> {
        Ok(())
    }
}
