//! Submodule providing the stock oracle implementations and the replay
//! wrappers that serve oracle-aware requests from myopic extractors.

use crate::errors::MatrixError;
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    SparseRange, Subset,
};
use crate::traits::matrix::Matrix;
use crate::traits::numeric::{MatrixIndex, index_from_usize};
use crate::traits::oracle::{Oracle, SharedOracle};
use std::sync::Arc;

/// Predicts accesses along a consecutive run of the target dimension.
#[derive(Clone, Copy, Debug)]
pub struct ConsecutiveOracle<I> {
    start: I,
    length: usize,
}

impl<I: MatrixIndex> ConsecutiveOracle<I> {
    /// Creates an oracle predicting `start, start + 1, …, start + length - 1`.
    pub fn new(start: I, length: usize) -> Self {
        Self { start, length }
    }
}

impl<I: MatrixIndex> Oracle<I> for ConsecutiveOracle<I> {
    fn total(&self) -> usize {
        self.length
    }

    fn get(&self, i: usize) -> I {
        debug_assert!(i < self.length, "prediction {i} requested from an oracle of {} predictions", self.length);
        index_from_usize(self.start.as_() + i)
    }
}

/// Predicts accesses from an explicit sequence of target indices.
#[derive(Clone, Debug)]
pub struct FixedVectorOracle<I> {
    sequence: Vec<I>,
}

impl<I: MatrixIndex> FixedVectorOracle<I> {
    /// Creates an oracle predicting exactly the given sequence.
    pub fn new(sequence: Vec<I>) -> Self {
        Self { sequence }
    }
}

impl<I: MatrixIndex> Oracle<I> for FixedVectorOracle<I> {
    fn total(&self) -> usize {
        self.sequence.len()
    }

    fn get(&self, i: usize) -> I {
        self.sequence[i]
    }
}

/// Serves oracle-aware dense requests by replaying the predictions against a
/// myopic extractor.
pub struct ReplayDenseExtractor<'a, V, I> {
    oracle: SharedOracle<I>,
    used: usize,
    inner: Box<dyn DenseExtractor<V, I> + 'a>,
}

impl<'a, V, I> ReplayDenseExtractor<'a, V, I> {
    /// Wraps a myopic extractor.
    pub fn new(oracle: SharedOracle<I>, inner: Box<dyn DenseExtractor<V, I> + 'a>) -> Self {
        Self { oracle, used: 0, inner }
    }
}

impl<V, I: MatrixIndex> OracularDenseExtractor<V, I> for ReplayDenseExtractor<'_, V, I> {
    fn fetch<'s>(&'s mut self, buffer: &'s mut [V]) -> &'s [V] {
        let i = self.oracle.get(self.used);
        self.used += 1;
        self.inner.fetch(i, buffer)
    }
}

/// Serves oracle-aware sparse requests by replaying the predictions against a
/// myopic extractor.
pub struct ReplaySparseExtractor<'a, V, I> {
    oracle: SharedOracle<I>,
    used: usize,
    inner: Box<dyn SparseExtractor<V, I> + 'a>,
}

impl<'a, V, I> ReplaySparseExtractor<'a, V, I> {
    /// Wraps a myopic extractor.
    pub fn new(oracle: SharedOracle<I>, inner: Box<dyn SparseExtractor<V, I> + 'a>) -> Self {
        Self { oracle, used: 0, inner }
    }
}

impl<V, I: MatrixIndex> OracularSparseExtractor<V, I> for ReplaySparseExtractor<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let i = self.oracle.get(self.used);
        self.used += 1;
        self.inner.fetch(i, values, indices)
    }
}

/// Creates an oracle-aware dense extractor for a consecutive scan of
/// `[start, start + length)` along the chosen dimension.
///
/// # Errors
///
/// Propagates any factory failure from the matrix.
pub fn consecutive_dense<'a, V: 'static, I: MatrixIndex>(
    matrix: &'a dyn Matrix<V, I>,
    row: bool,
    start: usize,
    length: usize,
    subset: Subset<I>,
    options: &Options,
) -> Result<Box<dyn OracularDenseExtractor<V, I> + 'a>, MatrixError> {
    let oracle = Arc::new(ConsecutiveOracle::new(index_from_usize::<I>(start), length));
    matrix.dense_with_oracle(row, oracle, subset, options)
}

/// Creates an oracle-aware sparse extractor for a consecutive scan of
/// `[start, start + length)` along the chosen dimension.
///
/// # Errors
///
/// Propagates any factory failure from the matrix.
pub fn consecutive_sparse<'a, V: 'static, I: MatrixIndex>(
    matrix: &'a dyn Matrix<V, I>,
    row: bool,
    start: usize,
    length: usize,
    subset: Subset<I>,
    options: &Options,
) -> Result<Box<dyn OracularSparseExtractor<V, I> + 'a>, MatrixError> {
    let oracle = Arc::new(ConsecutiveOracle::new(index_from_usize::<I>(start), length));
    matrix.sparse_with_oracle(row, oracle, subset, options)
}
