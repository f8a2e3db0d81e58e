//! Submodule providing the forced-dense reinterpretation.

use crate::errors::MatrixError;
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    Subset,
};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue};
use crate::traits::oracle::SharedOracle;

/// Wrapper that reports its contents as dense regardless of storage.
///
/// Useful when a structurally sparse matrix is dense enough that
/// sparsity-aware consumers would lose to their dense counterparts. Every
/// request is forwarded untouched; only the sparsity advisories change.
pub struct ForcedDense<V, I> {
    inner: SharedMatrix<V, I>,
}

impl<V, I> ForcedDense<V, I> {
    /// Wraps a matrix.
    pub fn new(inner: SharedMatrix<V, I>) -> Self {
        Self { inner }
    }
}

impl<V: MatrixValue, I: MatrixIndex> Matrix<V, I> for ForcedDense<V, I> {
    fn nrow(&self) -> I {
        self.inner.nrow()
    }

    fn ncol(&self) -> I {
        self.inner.ncol()
    }

    fn is_sparse_proportion(&self) -> f64 {
        0.0
    }

    fn prefer_rows_proportion(&self) -> f64 {
        self.inner.prefer_rows_proportion()
    }

    fn uses_oracle(&self, row: bool) -> bool {
        self.inner.uses_oracle(row)
    }

    fn dense<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 'a>, MatrixError> {
        self.inner.dense(row, subset, options)
    }

    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 'a>, MatrixError> {
        self.inner.sparse(row, subset, options)
    }

    fn dense_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularDenseExtractor<V, I> + 'a>, MatrixError> {
        self.inner.dense_with_oracle(row, oracle, subset, options)
    }

    fn sparse_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularSparseExtractor<V, I> + 'a>, MatrixError> {
        self.inner.sparse_with_oracle(row, oracle, subset, options)
    }
}
