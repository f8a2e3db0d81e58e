//! Submodule providing the delayed binary isometric decorator.

use std::sync::Arc;

use crate::delayed::isometric::BinaryOperation;
use crate::errors::{LayoutError, MatrixError};
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    SparseRange, Subset,
};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue, index_from_usize};
use crate::traits::oracle::SharedOracle;

/// Delayed entry-corresponding combination of two equally shaped matrices.
///
/// Both children are fetched per request and combined value by value. Sparse
/// extraction merges the two ordered non-zero sets when the operation
/// preserves zeros; otherwise it degrades to dense assembly over every
/// subset position.
pub struct DelayedBinaryIsometric<V, I> {
    left: SharedMatrix<V, I>,
    right: SharedMatrix<V, I>,
    operation: Arc<dyn BinaryOperation<V>>,
}

impl<V: MatrixValue, I: MatrixIndex> DelayedBinaryIsometric<V, I> {
    /// Attaches an operation to a pair of matrices.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] when the shapes disagree,
    /// and propagates the operation's own validation.
    pub fn new(
        left: SharedMatrix<V, I>,
        right: SharedMatrix<V, I>,
        operation: Arc<dyn BinaryOperation<V>>,
    ) -> Result<Self, MatrixError> {
        if left.nrow() != right.nrow() {
            return Err(LayoutError::DimensionMismatch {
                by_row: false,
                expected: left.nrow().as_(),
                found: right.nrow().as_(),
            }
            .into());
        }
        if left.ncol() != right.ncol() {
            return Err(LayoutError::DimensionMismatch {
                by_row: true,
                expected: left.ncol().as_(),
                found: right.ncol().as_(),
            }
            .into());
        }
        operation.validate()?;
        Ok(Self { left, right, operation })
    }

    fn merges(&self) -> bool {
        self.operation.preserves_sparsity() && self.left.is_sparse() && self.right.is_sparse()
    }
}

impl<V: MatrixValue, I: MatrixIndex> Matrix<V, I> for DelayedBinaryIsometric<V, I> {
    fn nrow(&self) -> I {
        self.left.nrow()
    }

    fn ncol(&self) -> I {
        self.left.ncol()
    }

    fn is_sparse_proportion(&self) -> f64 {
        if self.operation.preserves_sparsity() {
            (self.left.is_sparse_proportion() + self.right.is_sparse_proportion()) / 2.0
        } else {
            0.0
        }
    }

    fn prefer_rows_proportion(&self) -> f64 {
        (self.left.prefer_rows_proportion() + self.right.prefer_rows_proportion()) / 2.0
    }

    fn uses_oracle(&self, row: bool) -> bool {
        self.left.uses_oracle(row) || self.right.uses_oracle(row)
    }

    fn dense<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        let capacity = subset.len(self.extent(!row));
        let left = self.left.dense(row, subset.clone(), options)?;
        let right = self.right.dense(row, subset, options)?;
        Ok(Box::new(BinaryDense {
            left,
            right,
            operation: self.operation.clone(),
            lscratch: vec![V::zero(); capacity],
            rscratch: vec![V::zero(); capacity],
        }))
    }

    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        let capacity = subset.len(self.extent(!row));
        if self.merges() {
            // The merge needs ordered indices from both children no matter
            // what the caller asked for.
            let child_options = Options {
                extract_value: options.extract_value,
                extract_index: true,
                ordered_index: true,
            };
            let left = self.left.sparse(row, subset.clone(), &child_options)?;
            let right = self.right.sparse(row, subset, &child_options)?;
            Ok(Box::new(BinarySparse {
                left,
                right,
                operation: self.operation.clone(),
                lvalues: vec![V::zero(); capacity],
                lindices: vec![I::ZERO; capacity],
                rvalues: vec![V::zero(); capacity],
                rindices: vec![I::ZERO; capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        } else {
            let left = self.left.dense(row, subset.clone(), options)?;
            let right = self.right.dense(row, subset.clone(), options)?;
            Ok(Box::new(DensifiedBinarySparse {
                left,
                right,
                operation: self.operation.clone(),
                subset,
                lscratch: vec![V::zero(); capacity],
                rscratch: vec![V::zero(); capacity],
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
        subset.validate(self.extent(!row))?;
        let capacity = subset.len(self.extent(!row));
        let left = self.left.dense_with_oracle(row, oracle.clone(), subset.clone(), options)?;
        let right = self.right.dense_with_oracle(row, oracle, subset, options)?;
        Ok(Box::new(BinaryOracularDense {
            left,
            right,
            operation: self.operation.clone(),
            lscratch: vec![V::zero(); capacity],
            rscratch: vec![V::zero(); capacity],
        }))
    }

    fn sparse_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularSparseExtractor<V, I> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        let capacity = subset.len(self.extent(!row));
        if self.merges() {
            let child_options = Options {
                extract_value: options.extract_value,
                extract_index: true,
                ordered_index: true,
            };
            let left =
                self.left.sparse_with_oracle(row, oracle.clone(), subset.clone(), &child_options)?;
            let right = self.right.sparse_with_oracle(row, oracle, subset, &child_options)?;
            Ok(Box::new(BinaryOracularSparse {
                left,
                right,
                operation: self.operation.clone(),
                lvalues: vec![V::zero(); capacity],
                lindices: vec![I::ZERO; capacity],
                rvalues: vec![V::zero(); capacity],
                rindices: vec![I::ZERO; capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        } else {
            let left =
                self.left.dense_with_oracle(row, oracle.clone(), subset.clone(), options)?;
            let right = self.right.dense_with_oracle(row, oracle, subset.clone(), options)?;
            Ok(Box::new(DensifiedBinaryOracularSparse {
                left,
                right,
                operation: self.operation.clone(),
                subset,
                lscratch: vec![V::zero(); capacity],
                rscratch: vec![V::zero(); capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        }
    }
}

fn combine_dense<'s, V: MatrixValue>(
    left: &[V],
    right: &[V],
    operation: &dyn BinaryOperation<V>,
    buffer: &'s mut [V],
) -> &'s [V] {
    let n = left.len();
    for (k, out) in buffer[..n].iter_mut().enumerate() {
        *out = operation.apply(left[k], right[k]);
    }
    &buffer[..n]
}

/// Merges two ordered sparse ranges, applying the operation with a zero
/// stand-in for whichever side lacks an entry.
#[allow(clippy::too_many_arguments)]
fn merge_sparse<'s, V: MatrixValue, I: MatrixIndex>(
    left: &SparseRange<'_, V, I>,
    right: &SparseRange<'_, V, I>,
    operation: &dyn BinaryOperation<V>,
    values: &'s mut [V],
    indices: &'s mut [I],
    needs_value: bool,
    needs_index: bool,
) -> SparseRange<'s, V, I> {
    let lindex = left.index.unwrap_or(&[]);
    let rindex = right.index.unwrap_or(&[]);
    let lvalue = left.value.unwrap_or(&[]);
    let rvalue = right.value.unwrap_or(&[]);

    let mut a = 0;
    let mut b = 0;
    let mut n = 0;
    let mut push = |idx: I, l: Option<V>, r: Option<V>, n: &mut usize| {
        if needs_value {
            values[*n] =
                operation.apply(l.unwrap_or_else(V::zero), r.unwrap_or_else(V::zero));
        }
        if needs_index {
            indices[*n] = idx;
        }
        *n += 1;
    };

    while a < left.number && b < right.number {
        let li = lindex[a];
        let ri = rindex[b];
        if li < ri {
            push(li, lvalue.get(a).copied(), None, &mut n);
            a += 1;
        } else if li > ri {
            push(ri, None, rvalue.get(b).copied(), &mut n);
            b += 1;
        } else {
            push(li, lvalue.get(a).copied(), rvalue.get(b).copied(), &mut n);
            a += 1;
            b += 1;
        }
    }
    while a < left.number {
        push(lindex[a], lvalue.get(a).copied(), None, &mut n);
        a += 1;
    }
    while b < right.number {
        push(rindex[b], None, rvalue.get(b).copied(), &mut n);
        b += 1;
    }

    SparseRange {
        number: n,
        value: if needs_value { Some(&values[..n]) } else { None },
        index: if needs_index { Some(&indices[..n]) } else { None },
    }
}

/// Dense extraction combining both children.
struct BinaryDense<'a, V, I> {
    left: Box<dyn DenseExtractor<V, I> + 'a>,
    right: Box<dyn DenseExtractor<V, I> + 'a>,
    operation: Arc<dyn BinaryOperation<V>>,
    lscratch: Vec<V>,
    rscratch: Vec<V>,
}

impl<V: MatrixValue, I: MatrixIndex> DenseExtractor<V, I> for BinaryDense<'_, V, I> {
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let Self { left, right, operation, lscratch, rscratch } = self;
        let l = left.fetch(i, lscratch);
        let r = right.fetch(i, rscratch);
        combine_dense(l, r, operation.as_ref(), buffer)
    }
}

/// Sparse extraction merging both children's non-zero sets.
struct BinarySparse<'a, V, I> {
    left: Box<dyn SparseExtractor<V, I> + 'a>,
    right: Box<dyn SparseExtractor<V, I> + 'a>,
    operation: Arc<dyn BinaryOperation<V>>,
    lvalues: Vec<V>,
    lindices: Vec<I>,
    rvalues: Vec<V>,
    rindices: Vec<I>,
    needs_value: bool,
    needs_index: bool,
}

impl<V: MatrixValue, I: MatrixIndex> SparseExtractor<V, I> for BinarySparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self {
            left,
            right,
            operation,
            lvalues,
            lindices,
            rvalues,
            rindices,
            needs_value,
            needs_index,
        } = self;
        let lrange = left.fetch(i, lvalues, lindices);
        let rrange = right.fetch(i, rvalues, rindices);
        merge_sparse(&lrange, &rrange, operation.as_ref(), values, indices, *needs_value, *needs_index)
    }
}

/// Sparse extraction when the operation does not preserve zeros: every
/// subset position is materialized from dense fetches.
struct DensifiedBinarySparse<'a, V, I> {
    left: Box<dyn DenseExtractor<V, I> + 'a>,
    right: Box<dyn DenseExtractor<V, I> + 'a>,
    operation: Arc<dyn BinaryOperation<V>>,
    subset: Subset<I>,
    lscratch: Vec<V>,
    rscratch: Vec<V>,
    needs_value: bool,
    needs_index: bool,
}

fn densified_binary<'s, V: MatrixValue, I: MatrixIndex>(
    left: &[V],
    right: &[V],
    operation: &dyn BinaryOperation<V>,
    subset: &Subset<I>,
    n: usize,
    values: &'s mut [V],
    indices: &'s mut [I],
    needs_value: bool,
    needs_index: bool,
) -> SparseRange<'s, V, I> {
    if needs_value {
        combine_dense(left, right, operation, &mut values[..n]);
    }
    if needs_index {
        for (k, out) in indices[..n].iter_mut().enumerate() {
            *out = index_from_usize(subset.coordinate(k));
        }
    }
    SparseRange {
        number: n,
        value: if needs_value { Some(&values[..n]) } else { None },
        index: if needs_index { Some(&indices[..n]) } else { None },
    }
}

impl<V: MatrixValue, I: MatrixIndex> SparseExtractor<V, I> for DensifiedBinarySparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { left, right, operation, subset, lscratch, rscratch, needs_value, needs_index } =
            self;
        let n = lscratch.len();
        let l = left.fetch(i, lscratch);
        let r = right.fetch(i, rscratch);
        densified_binary(l, r, operation.as_ref(), subset, n, values, indices, *needs_value, *needs_index)
    }
}

/// Oracle-aware flavor of [`BinaryDense`]; both children share the oracle
/// and advance in lockstep.
struct BinaryOracularDense<'a, V, I> {
    left: Box<dyn OracularDenseExtractor<V, I> + 'a>,
    right: Box<dyn OracularDenseExtractor<V, I> + 'a>,
    operation: Arc<dyn BinaryOperation<V>>,
    lscratch: Vec<V>,
    rscratch: Vec<V>,
}

impl<V: MatrixValue, I: MatrixIndex> OracularDenseExtractor<V, I>
    for BinaryOracularDense<'_, V, I>
{
    fn fetch<'s>(&'s mut self, buffer: &'s mut [V]) -> &'s [V] {
        let Self { left, right, operation, lscratch, rscratch } = self;
        let l = left.fetch(lscratch);
        let r = right.fetch(rscratch);
        combine_dense(l, r, operation.as_ref(), buffer)
    }
}

/// Oracle-aware flavor of [`BinarySparse`].
struct BinaryOracularSparse<'a, V, I> {
    left: Box<dyn OracularSparseExtractor<V, I> + 'a>,
    right: Box<dyn OracularSparseExtractor<V, I> + 'a>,
    operation: Arc<dyn BinaryOperation<V>>,
    lvalues: Vec<V>,
    lindices: Vec<I>,
    rvalues: Vec<V>,
    rindices: Vec<I>,
    needs_value: bool,
    needs_index: bool,
}

impl<V: MatrixValue, I: MatrixIndex> OracularSparseExtractor<V, I>
    for BinaryOracularSparse<'_, V, I>
{
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self {
            left,
            right,
            operation,
            lvalues,
            lindices,
            rvalues,
            rindices,
            needs_value,
            needs_index,
        } = self;
        let lrange = left.fetch(lvalues, lindices);
        let rrange = right.fetch(rvalues, rindices);
        merge_sparse(&lrange, &rrange, operation.as_ref(), values, indices, *needs_value, *needs_index)
    }
}

/// Oracle-aware flavor of [`DensifiedBinarySparse`].
struct DensifiedBinaryOracularSparse<'a, V, I> {
    left: Box<dyn OracularDenseExtractor<V, I> + 'a>,
    right: Box<dyn OracularDenseExtractor<V, I> + 'a>,
    operation: Arc<dyn BinaryOperation<V>>,
    subset: Subset<I>,
    lscratch: Vec<V>,
    rscratch: Vec<V>,
    needs_value: bool,
    needs_index: bool,
}

impl<V: MatrixValue, I: MatrixIndex> OracularSparseExtractor<V, I>
    for DensifiedBinaryOracularSparse<'_, V, I>
{
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { left, right, operation, subset, lscratch, rscratch, needs_value, needs_index } =
            self;
        let n = lscratch.len();
        let l = left.fetch(lscratch);
        let r = right.fetch(rscratch);
        densified_binary(l, r, operation.as_ref(), subset, n, values, indices, *needs_value, *needs_index)
    }
}
