//! Submodule providing delayed transposition.

use crate::errors::MatrixError;
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    Subset,
};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue};
use crate::traits::oracle::SharedOracle;

/// Delayed transposition of a matrix.
///
/// Swaps the dimensions and inverts the target flag on every forwarded
/// request; nothing else changes, so extraction costs exactly what it costs
/// on the wrapped matrix.
pub struct DelayedTranspose<V, I> {
    inner: SharedMatrix<V, I>,
}

impl<V, I> DelayedTranspose<V, I> {
    /// Wraps a matrix.
    pub fn new(inner: SharedMatrix<V, I>) -> Self {
        Self { inner }
    }
}

impl<V: MatrixValue, I: MatrixIndex> Matrix<V, I> for DelayedTranspose<V, I> {
    fn nrow(&self) -> I {
        self.inner.ncol()
    }

    fn ncol(&self) -> I {
        self.inner.nrow()
    }

    fn is_sparse_proportion(&self) -> f64 {
        self.inner.is_sparse_proportion()
    }

    fn prefer_rows_proportion(&self) -> f64 {
        1.0 - self.inner.prefer_rows_proportion()
    }

    fn uses_oracle(&self, row: bool) -> bool {
        self.inner.uses_oracle(!row)
    }

    fn dense<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 'a>, MatrixError> {
        self.inner.dense(!row, subset, options)
    }

    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 'a>, MatrixError> {
        self.inner.sparse(!row, subset, options)
    }

    fn dense_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularDenseExtractor<V, I> + 'a>, MatrixError> {
        self.inner.dense_with_oracle(!row, oracle, subset, options)
    }

    fn sparse_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularSparseExtractor<V, I> + 'a>, MatrixError> {
        self.inner.sparse_with_oracle(!row, oracle, subset, options)
    }
}
