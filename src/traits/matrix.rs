//! Submodule defining the polymorphic matrix concept.

use std::sync::Arc;

use crate::errors::MatrixError;
use crate::impls::oracles::{ReplayDenseExtractor, ReplaySparseExtractor};
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    Subset,
};
use crate::traits::numeric::MatrixIndex;
use crate::traits::oracle::SharedOracle;

/// A logically immutable two-dimensional array of values of type `V`, indexed
/// along both dimensions by the integer type `I`.
///
/// Matrices are freely shared across threads; extraction happens through
/// stateful extractors obtained from the factory methods, each of which is
/// exclusively owned by its caller. Extractor factories validate their
/// arguments and allocate all workspaces up front, so fetching itself never
/// fails.
pub trait Matrix<V: 'static, I: MatrixIndex>: Send + Sync {
    /// Number of rows.
    fn nrow(&self) -> I;

    /// Number of columns.
    fn ncol(&self) -> I;

    /// Whether the matrix is best treated as sparse.
    fn is_sparse(&self) -> bool {
        self.is_sparse_proportion() > 0.5
    }

    /// Advisory proportion of the matrix that is stored sparsely, in `[0, 1]`.
    ///
    /// Constant over the lifetime of the matrix.
    fn is_sparse_proportion(&self) -> f64;

    /// Whether iteration over rows is expected to be faster than over columns.
    fn prefer_rows(&self) -> bool {
        self.prefer_rows_proportion() > 0.5
    }

    /// Advisory proportion of the underlying storage that is row-oriented.
    ///
    /// Constant over the lifetime of the matrix.
    fn prefer_rows_proportion(&self) -> f64;

    /// Whether extraction along the given dimension actually consults oracle
    /// predictions, here or in some wrapped matrix.
    fn uses_oracle(&self, row: bool) -> bool;

    /// Extent of the dimension selected by `row`.
    fn extent(&self, row: bool) -> I {
        if row { self.nrow() } else { self.ncol() }
    }

    /// Creates a dense extractor along the chosen dimension.
    ///
    /// The subset applies to the non-target dimension.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] if the subset does not fit
    /// the non-target dimension.
    fn dense<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 'a>, MatrixError>;

    /// Creates a sparse extractor along the chosen dimension.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] if the subset does not fit
    /// the non-target dimension.
    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 'a>, MatrixError>;

    /// Creates a dense extractor whose target sequence is fixed by `oracle`.
    ///
    /// Matrices that do not consult predictions serve this through a replay
    /// wrapper over the myopic extractor.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] if the subset does not fit
    /// the non-target dimension.
    fn dense_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularDenseExtractor<V, I> + 'a>, MatrixError> {
        Ok(Box::new(ReplayDenseExtractor::new(oracle, self.dense(row, subset, options)?)))
    }

    /// Creates a sparse extractor whose target sequence is fixed by `oracle`.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] if the subset does not fit
    /// the non-target dimension.
    fn sparse_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularSparseExtractor<V, I> + 'a>, MatrixError> {
        Ok(Box::new(ReplaySparseExtractor::new(oracle, self.sparse(row, subset, options)?)))
    }
}

/// Shared handle to a [`Matrix`].
pub type SharedMatrix<V, I> = Arc<dyn Matrix<V, I>>;
