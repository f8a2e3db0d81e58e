//! Submodule providing delayed contiguous subsetting along one dimension.

use std::sync::Arc;

use crate::errors::{LayoutError, MatrixError};
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    SparseRange, Subset,
};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue};
use crate::traits::oracle::{Oracle, SharedOracle};

/// Delayed restriction of one dimension to a contiguous block.
///
/// Requests along the subsetted dimension translate the target index by the
/// block start; requests along the other dimension translate the subset
/// descriptor instead and shift any reported sparse indices back into the
/// block-local coordinate space.
pub struct DelayedSubsetBlock<V, I> {
    inner: SharedMatrix<V, I>,
    by_row: bool,
    start: I,
    length: I,
}

impl<V: MatrixValue, I: MatrixIndex> DelayedSubsetBlock<V, I> {
    /// Restricts the rows (`by_row`) or columns of `inner` to
    /// `[start, start + length)`.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] when the block exceeds the
    /// subsetted dimension.
    pub fn new(
        inner: SharedMatrix<V, I>,
        by_row: bool,
        start: I,
        length: I,
    ) -> Result<Self, MatrixError> {
        let extent = inner.extent(by_row);
        if start.as_() + length.as_() > extent.as_() {
            return Err(LayoutError::BlockOutOfBounds {
                start: start.as_(),
                length: length.as_(),
                extent: extent.as_(),
            }
            .into());
        }
        Ok(Self { inner, by_row, start, length })
    }

    /// Rewrites a subset over the block into child coordinates.
    fn translate(&self, subset: Subset<I>) -> Subset<I> {
        match subset {
            Subset::Full => Subset::Block { start: self.start, length: self.length },
            Subset::Block { start, length } => {
                Subset::Block { start: start + self.start, length }
            }
            Subset::Index(list) => {
                let shifted: Vec<I> = list.iter().map(|&i| i + self.start).collect();
                Subset::Index(shifted.into())
            }
        }
    }
}

impl<V: MatrixValue, I: MatrixIndex> Matrix<V, I> for DelayedSubsetBlock<V, I> {
    fn nrow(&self) -> I {
        if self.by_row { self.length } else { self.inner.nrow() }
    }

    fn ncol(&self) -> I {
        if self.by_row { self.inner.ncol() } else { self.length }
    }

    fn is_sparse_proportion(&self) -> f64 {
        self.inner.is_sparse_proportion()
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
        if row == self.by_row {
            let inner = self.inner.dense(row, subset, options)?;
            Ok(Box::new(OffsetDense { inner, offset: self.start }))
        } else {
            subset.validate(self.length)?;
            // Dense output is positional, so translating the selection is all
            // that is needed.
            self.inner.dense(row, self.translate(subset), options)
        }
    }

    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 'a>, MatrixError> {
        if row == self.by_row {
            let inner = self.inner.sparse(row, subset, options)?;
            Ok(Box::new(OffsetSparse { inner, offset: self.start }))
        } else {
            subset.validate(self.length)?;
            let capacity = subset.len(self.length);
            let inner = self.inner.sparse(row, self.translate(subset), options)?;
            Ok(Box::new(ShiftSparse {
                inner,
                shift: self.start,
                vscratch: vec![V::zero(); capacity],
                iscratch: vec![I::ZERO; capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        }
    }

    fn dense_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularDenseExtractor<V, I> + 'a>, MatrixError> {
        if row == self.by_row {
            let oracle = Arc::new(OffsetOracle { inner: oracle, offset: self.start });
            self.inner.dense_with_oracle(row, oracle, subset, options)
        } else {
            subset.validate(self.length)?;
            self.inner.dense_with_oracle(row, oracle, self.translate(subset), options)
        }
    }

    fn sparse_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularSparseExtractor<V, I> + 'a>, MatrixError> {
        if row == self.by_row {
            let oracle = Arc::new(OffsetOracle { inner: oracle, offset: self.start });
            self.inner.sparse_with_oracle(row, oracle, subset, options)
        } else {
            subset.validate(self.length)?;
            let capacity = subset.len(self.length);
            let inner = self.inner.sparse_with_oracle(row, oracle, self.translate(subset), options)?;
            Ok(Box::new(ShiftOracularSparse {
                inner,
                shift: self.start,
                vscratch: vec![V::zero(); capacity],
                iscratch: vec![I::ZERO; capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        }
    }
}

/// Oracle adaptor adding the block offset to every prediction.
struct OffsetOracle<I> {
    inner: SharedOracle<I>,
    offset: I,
}

impl<I: MatrixIndex> Oracle<I> for OffsetOracle<I> {
    fn total(&self) -> usize {
        self.inner.total()
    }

    fn get(&self, i: usize) -> I {
        self.inner.get(i) + self.offset
    }
}

/// Dense extraction along the subsetted dimension.
struct OffsetDense<'a, V, I> {
    inner: Box<dyn DenseExtractor<V, I> + 'a>,
    offset: I,
}

impl<V, I: MatrixIndex> DenseExtractor<V, I> for OffsetDense<'_, V, I> {
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        self.inner.fetch(i + self.offset, buffer)
    }
}

/// Sparse extraction along the subsetted dimension.
struct OffsetSparse<'a, V, I> {
    inner: Box<dyn SparseExtractor<V, I> + 'a>,
    offset: I,
}

impl<V, I: MatrixIndex> SparseExtractor<V, I> for OffsetSparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        self.inner.fetch(i + self.offset, values, indices)
    }
}

fn shift_into<'s, V: Copy, I: MatrixIndex>(
    range: SparseRange<'_, V, I>,
    shift: I,
    values: &'s mut [V],
    indices: &'s mut [I],
    needs_value: bool,
    needs_index: bool,
) -> SparseRange<'s, V, I> {
    let n = range.number;
    if needs_value {
        values[..n].copy_from_slice(&range.value.unwrap_or(&[])[..n]);
    }
    if needs_index {
        for (k, idx) in range.index.unwrap_or(&[]).iter().enumerate() {
            indices[k] = *idx - shift;
        }
    }
    SparseRange {
        number: n,
        value: if needs_value { Some(&values[..n]) } else { None },
        index: if needs_index { Some(&indices[..n]) } else { None },
    }
}

/// Sparse extraction along the other dimension, shifting reported indices
/// back into block-local coordinates.
struct ShiftSparse<'a, V, I> {
    inner: Box<dyn SparseExtractor<V, I> + 'a>,
    shift: I,
    vscratch: Vec<V>,
    iscratch: Vec<I>,
    needs_value: bool,
    needs_index: bool,
}

impl<V: MatrixValue, I: MatrixIndex> SparseExtractor<V, I> for ShiftSparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { inner, shift, vscratch, iscratch, needs_value, needs_index } = self;
        let range = inner.fetch(i, vscratch, iscratch);
        shift_into(range, *shift, values, indices, *needs_value, *needs_index)
    }
}

/// Oracle-aware flavor of [`ShiftSparse`].
struct ShiftOracularSparse<'a, V, I> {
    inner: Box<dyn OracularSparseExtractor<V, I> + 'a>,
    shift: I,
    vscratch: Vec<V>,
    iscratch: Vec<I>,
    needs_value: bool,
    needs_index: bool,
}

impl<V: MatrixValue, I: MatrixIndex> OracularSparseExtractor<V, I>
    for ShiftOracularSparse<'_, V, I>
{
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { inner, shift, vscratch, iscratch, needs_value, needs_index } = self;
        let range = inner.fetch(vscratch, iscratch);
        shift_into(range, *shift, values, indices, *needs_value, *needs_index)
    }
}
