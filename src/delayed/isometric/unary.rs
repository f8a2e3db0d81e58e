//! Submodule providing the delayed unary isometric decorator.

use std::sync::Arc;

use crate::delayed::isometric::UnaryOperation;
use crate::errors::MatrixError;
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    SparseRange, Subset,
};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue, index_from_usize};
use crate::traits::oracle::SharedOracle;

/// Delayed element-wise transformation of a matrix.
///
/// Fetches are forwarded to the wrapped matrix, then the operation rewrites
/// the fetched slice. Sparse extraction stays sparse only when both the
/// matrix and the operation allow it; otherwise every subset position is
/// materialized.
pub struct DelayedUnaryIsometric<V, I> {
    inner: SharedMatrix<V, I>,
    operation: Arc<dyn UnaryOperation<V, I>>,
}

impl<V: MatrixValue, I: MatrixIndex> DelayedUnaryIsometric<V, I> {
    /// Attaches an operation to a matrix.
    ///
    /// # Errors
    ///
    /// Propagates the operation's own shape validation.
    pub fn new(
        inner: SharedMatrix<V, I>,
        operation: Arc<dyn UnaryOperation<V, I>>,
    ) -> Result<Self, MatrixError> {
        operation.validate(inner.nrow(), inner.ncol())?;
        Ok(Self { inner, operation })
    }

    fn densifies(&self) -> bool {
        !(self.operation.preserves_sparsity() && self.inner.is_sparse())
    }
}

impl<V: MatrixValue, I: MatrixIndex> Matrix<V, I> for DelayedUnaryIsometric<V, I> {
    fn nrow(&self) -> I {
        self.inner.nrow()
    }

    fn ncol(&self) -> I {
        self.inner.ncol()
    }

    fn is_sparse_proportion(&self) -> f64 {
        if self.operation.preserves_sparsity() {
            self.inner.is_sparse_proportion()
        } else {
            0.0
        }
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
        subset.validate(self.extent(!row))?;
        let capacity = subset.len(self.extent(!row));
        let inner = self.inner.dense(row, subset.clone(), options)?;
        Ok(Box::new(UnaryDense {
            inner,
            operation: self.operation.clone(),
            row,
            subset,
            scratch: vec![V::zero(); capacity],
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
        if !self.densifies() {
            let child_options = Options {
                extract_value: options.extract_value,
                extract_index: true,
                ordered_index: options.ordered_index,
            };
            let inner = self.inner.sparse(row, subset, &child_options)?;
            Ok(Box::new(UnarySparse {
                inner,
                operation: self.operation.clone(),
                row,
                vscratch: vec![V::zero(); capacity],
                iscratch: vec![I::ZERO; capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        } else if self.inner.is_sparse() && self.operation.uniform_fill(row) {
            // The wrapped matrix is sparse and zeros all map to the same
            // value, so the stored entries are fetched sparsely and the gaps
            // filled in afterwards.
            let child_options =
                Options { extract_value: true, extract_index: true, ordered_index: true };
            let inner = self.inner.sparse(row, subset.clone(), &child_options)?;
            Ok(Box::new(FilledUnarySparse {
                inner,
                operation: self.operation.clone(),
                row,
                subset,
                vscratch: vec![V::zero(); capacity],
                iscratch: vec![I::ZERO; capacity],
                tvalues: vec![V::zero(); capacity],
                tindices: vec![I::ZERO; capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        } else {
            let inner = self.inner.dense(row, subset.clone(), options)?;
            Ok(Box::new(DensifiedUnarySparse {
                inner,
                operation: self.operation.clone(),
                row,
                subset,
                scratch: vec![V::zero(); capacity],
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
        let inner =
            self.inner.dense_with_oracle(row, oracle.clone(), subset.clone(), options)?;
        Ok(Box::new(UnaryOracularDense {
            inner,
            operation: self.operation.clone(),
            row,
            subset,
            scratch: vec![V::zero(); capacity],
            oracle,
            used: 0,
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
        if !self.densifies() {
            let child_options = Options {
                extract_value: options.extract_value,
                extract_index: true,
                ordered_index: options.ordered_index,
            };
            let inner =
                self.inner.sparse_with_oracle(row, oracle.clone(), subset, &child_options)?;
            Ok(Box::new(UnaryOracularSparse {
                inner,
                operation: self.operation.clone(),
                row,
                vscratch: vec![V::zero(); capacity],
                iscratch: vec![I::ZERO; capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
                oracle,
                used: 0,
            }))
        } else if self.inner.is_sparse() && self.operation.uniform_fill(row) {
            let child_options =
                Options { extract_value: true, extract_index: true, ordered_index: true };
            let inner =
                self.inner.sparse_with_oracle(row, oracle.clone(), subset.clone(), &child_options)?;
            Ok(Box::new(FilledUnaryOracularSparse {
                inner,
                operation: self.operation.clone(),
                row,
                subset,
                vscratch: vec![V::zero(); capacity],
                iscratch: vec![I::ZERO; capacity],
                tvalues: vec![V::zero(); capacity],
                tindices: vec![I::ZERO; capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
                oracle,
                used: 0,
            }))
        } else {
            let inner =
                self.inner.dense_with_oracle(row, oracle.clone(), subset.clone(), options)?;
            Ok(Box::new(DensifiedUnaryOracularSparse {
                inner,
                operation: self.operation.clone(),
                row,
                subset,
                scratch: vec![V::zero(); capacity],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
                oracle,
                used: 0,
            }))
        }
    }
}

fn transformed_dense<'s, V: MatrixValue, I: MatrixIndex>(
    source: &[V],
    operation: &dyn UnaryOperation<V, I>,
    row: bool,
    i: I,
    subset: &Subset<I>,
    buffer: &'s mut [V],
) -> &'s [V] {
    let n = source.len();
    buffer[..n].copy_from_slice(source);
    operation.dense(row, i, subset, &mut buffer[..n]);
    &buffer[..n]
}

/// Dense extraction with the operation applied in place.
struct UnaryDense<'a, V, I> {
    inner: Box<dyn DenseExtractor<V, I> + 'a>,
    operation: Arc<dyn UnaryOperation<V, I>>,
    row: bool,
    subset: Subset<I>,
    scratch: Vec<V>,
}

impl<V: MatrixValue, I: MatrixIndex> DenseExtractor<V, I> for UnaryDense<'_, V, I> {
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let Self { inner, operation, row, subset, scratch } = self;
        let source = inner.fetch(i, scratch);
        transformed_dense(source, operation.as_ref(), *row, i, subset, buffer)
    }
}

/// Sparse extraction when the operation preserves structural zeros.
struct UnarySparse<'a, V, I> {
    inner: Box<dyn SparseExtractor<V, I> + 'a>,
    operation: Arc<dyn UnaryOperation<V, I>>,
    row: bool,
    vscratch: Vec<V>,
    iscratch: Vec<I>,
    needs_value: bool,
    needs_index: bool,
}

fn transformed_sparse<'s, V: MatrixValue, I: MatrixIndex>(
    range: SparseRange<'_, V, I>,
    operation: &dyn UnaryOperation<V, I>,
    row: bool,
    i: I,
    values: &'s mut [V],
    indices: &'s mut [I],
    needs_value: bool,
    needs_index: bool,
) -> SparseRange<'s, V, I> {
    let n = range.number;
    let fetched = range.index.unwrap_or(&[]);
    if needs_value {
        values[..n].copy_from_slice(&range.value.unwrap_or(&[])[..n]);
        operation.sparse(row, i, &mut values[..n], fetched);
    }
    if needs_index {
        indices[..n].copy_from_slice(fetched);
    }
    SparseRange {
        number: n,
        value: if needs_value { Some(&values[..n]) } else { None },
        index: if needs_index { Some(&indices[..n]) } else { None },
    }
}

impl<V: MatrixValue, I: MatrixIndex> SparseExtractor<V, I> for UnarySparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { inner, operation, row, vscratch, iscratch, needs_value, needs_index } = self;
        let range = inner.fetch(i, vscratch, iscratch);
        transformed_sparse(range, operation.as_ref(), *row, i, values, indices, *needs_value, *needs_index)
    }
}

fn densified_sparse<'s, V: MatrixValue, I: MatrixIndex>(
    source: Option<&[V]>,
    operation: &dyn UnaryOperation<V, I>,
    row: bool,
    i: I,
    subset: &Subset<I>,
    n: usize,
    values: &'s mut [V],
    indices: &'s mut [I],
    needs_value: bool,
    needs_index: bool,
) -> SparseRange<'s, V, I> {
    if needs_value {
        if let Some(source) = source {
            values[..n].copy_from_slice(source);
        }
        operation.dense(row, i, subset, &mut values[..n]);
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

/// Sparse extraction when the operation turns zeros into non-zeros: every
/// subset position is reported.
struct DensifiedUnarySparse<'a, V, I> {
    inner: Box<dyn DenseExtractor<V, I> + 'a>,
    operation: Arc<dyn UnaryOperation<V, I>>,
    row: bool,
    subset: Subset<I>,
    scratch: Vec<V>,
    needs_value: bool,
    needs_index: bool,
}

impl<V: MatrixValue, I: MatrixIndex> SparseExtractor<V, I> for DensifiedUnarySparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { inner, operation, row, subset, scratch, needs_value, needs_index } = self;
        let n = scratch.len();
        let source = if *needs_value { Some(&*inner.fetch(i, scratch)) } else { None };
        densified_sparse(
            source,
            operation.as_ref(),
            *row,
            i,
            subset,
            n,
            values,
            indices,
            *needs_value,
            *needs_index,
        )
    }
}

/// Oracle-aware flavor of [`UnaryDense`]; the oracle is re-consulted to know
/// which target index each fetch lands on.
struct UnaryOracularDense<'a, V, I> {
    inner: Box<dyn OracularDenseExtractor<V, I> + 'a>,
    operation: Arc<dyn UnaryOperation<V, I>>,
    row: bool,
    subset: Subset<I>,
    scratch: Vec<V>,
    oracle: SharedOracle<I>,
    used: usize,
}

impl<V: MatrixValue, I: MatrixIndex> OracularDenseExtractor<V, I>
    for UnaryOracularDense<'_, V, I>
{
    fn fetch<'s>(&'s mut self, buffer: &'s mut [V]) -> &'s [V] {
        let Self { inner, operation, row, subset, scratch, oracle, used } = self;
        let i = oracle.get(*used);
        *used += 1;
        let source = inner.fetch(scratch);
        transformed_dense(source, operation.as_ref(), *row, i, subset, buffer)
    }
}

/// Oracle-aware flavor of [`UnarySparse`].
struct UnaryOracularSparse<'a, V, I> {
    inner: Box<dyn OracularSparseExtractor<V, I> + 'a>,
    operation: Arc<dyn UnaryOperation<V, I>>,
    row: bool,
    vscratch: Vec<V>,
    iscratch: Vec<I>,
    needs_value: bool,
    needs_index: bool,
    oracle: SharedOracle<I>,
    used: usize,
}

impl<V: MatrixValue, I: MatrixIndex> OracularSparseExtractor<V, I>
    for UnaryOracularSparse<'_, V, I>
{
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { inner, operation, row, vscratch, iscratch, needs_value, needs_index, oracle, used } =
            self;
        let i = oracle.get(*used);
        *used += 1;
        let range = inner.fetch(vscratch, iscratch);
        transformed_sparse(range, operation.as_ref(), *row, i, values, indices, *needs_value, *needs_index)
    }
}

/// Oracle-aware flavor of [`DensifiedUnarySparse`].
struct DensifiedUnaryOracularSparse<'a, V, I> {
    inner: Box<dyn OracularDenseExtractor<V, I> + 'a>,
    operation: Arc<dyn UnaryOperation<V, I>>,
    row: bool,
    subset: Subset<I>,
    scratch: Vec<V>,
    needs_value: bool,
    needs_index: bool,
    oracle: SharedOracle<I>,
    used: usize,
}

impl<V: MatrixValue, I: MatrixIndex> OracularSparseExtractor<V, I>
    for DensifiedUnaryOracularSparse<'_, V, I>
{
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self {
            inner,
            operation,
            row,
            subset,
            scratch,
            needs_value,
            needs_index,
            oracle,
            used,
        } = self;
        let i = oracle.get(*used);
        *used += 1;
        let n = scratch.len();
        let source = if *needs_value { Some(&*inner.fetch(scratch)) } else { None };
        densified_sparse(
            source,
            operation.as_ref(),
            *row,
            i,
            subset,
            n,
            values,
            indices,
            *needs_value,
            *needs_index,
        )
    }
}

/// Sparse extraction over a sparse matrix whose operation moves zeros to one
/// shared value: stored entries are transformed and the gaps take the fill.
struct FilledUnarySparse<'a, V, I> {
    inner: Box<dyn SparseExtractor<V, I> + 'a>,
    operation: Arc<dyn UnaryOperation<V, I>>,
    row: bool,
    subset: Subset<I>,
    vscratch: Vec<V>,
    iscratch: Vec<I>,
    tvalues: Vec<V>,
    tindices: Vec<I>,
    needs_value: bool,
    needs_index: bool,
}

#[allow(clippy::too_many_arguments)]
fn filled_sparse<'s, V: MatrixValue, I: MatrixIndex>(
    entries: Option<(usize, &[V], &[I])>,
    operation: &dyn UnaryOperation<V, I>,
    row: bool,
    i: I,
    subset: &Subset<I>,
    n: usize,
    values: &'s mut [V],
    indices: &'s mut [I],
    needs_index: bool,
) -> SparseRange<'s, V, I> {
    let needs_value = entries.is_some();
    if let Some((number, tvalues, tindices)) = entries {
        let fill = operation.fill(row, i);
        let mut e = 0;
        for (k, out) in values[..n].iter_mut().enumerate() {
            if e < number && tindices[e].as_() == subset.coordinate(k) {
                *out = tvalues[e];
                e += 1;
            } else {
                *out = fill;
            }
        }
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

impl<V: MatrixValue, I: MatrixIndex> SparseExtractor<V, I> for FilledUnarySparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self {
            inner,
            operation,
            row,
            subset,
            vscratch,
            iscratch,
            tvalues,
            tindices,
            needs_value,
            needs_index,
        } = self;
        let n = vscratch.len();
        let entries = if *needs_value {
            let number;
            {
                let range = inner.fetch(i, vscratch, iscratch);
                number = range.number;
                tvalues[..number].copy_from_slice(&range.value.unwrap_or(&[])[..number]);
                tindices[..number].copy_from_slice(&range.index.unwrap_or(&[])[..number]);
            }
            operation.sparse(*row, i, &mut tvalues[..number], &tindices[..number]);
            Some((number, &tvalues[..number], &tindices[..number]))
        } else {
            None
        };
        filled_sparse(entries, operation.as_ref(), *row, i, subset, n, values, indices, *needs_index)
    }
}

/// Oracle-aware flavor of [`FilledUnarySparse`].
struct FilledUnaryOracularSparse<'a, V, I> {
    inner: Box<dyn OracularSparseExtractor<V, I> + 'a>,
    operation: Arc<dyn UnaryOperation<V, I>>,
    row: bool,
    subset: Subset<I>,
    vscratch: Vec<V>,
    iscratch: Vec<I>,
    tvalues: Vec<V>,
    tindices: Vec<I>,
    needs_value: bool,
    needs_index: bool,
    oracle: SharedOracle<I>,
    used: usize,
}

impl<V: MatrixValue, I: MatrixIndex> OracularSparseExtractor<V, I>
    for FilledUnaryOracularSparse<'_, V, I>
{
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self {
            inner,
            operation,
            row,
            subset,
            vscratch,
            iscratch,
            tvalues,
            tindices,
            needs_value,
            needs_index,
            oracle,
            used,
        } = self;
        let i = oracle.get(*used);
        *used += 1;
        let n = vscratch.len();
        let entries = if *needs_value {
            let number;
            {
                let range = inner.fetch(vscratch, iscratch);
                number = range.number;
                tvalues[..number].copy_from_slice(&range.value.unwrap_or(&[])[..number]);
                tindices[..number].copy_from_slice(&range.index.unwrap_or(&[])[..number]);
            }
            operation.sparse(*row, i, &mut tvalues[..number], &tindices[..number]);
            Some((number, &tvalues[..number], &tindices[..number]))
        } else {
            None
        };
        filled_sparse(entries, operation.as_ref(), *row, i, subset, n, values, indices, *needs_index)
    }
}
