//! Submodule providing delayed conversion of the value and index types.

use std::sync::Arc;

use num_traits::AsPrimitive;

use crate::errors::{LayoutError, MatrixError};
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    SparseRange, Subset,
};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue, index_from_usize};
use crate::traits::oracle::{Oracle, SharedOracle};

/// Delayed re-typing of a matrix: values and indices are converted
/// element-wise at extraction time.
///
/// The wrapped matrix works in its own types; every request is translated on
/// the way down and every result converted on the way back up through
/// per-extractor scratch buffers sized at construction.
pub struct DelayedCast<VO, IO, VI, II> {
    inner: SharedMatrix<VI, II>,
    _interface: core::marker::PhantomData<fn() -> (VO, IO)>,
}

impl<VO, IO, VI, II> DelayedCast<VO, IO, VI, II>
where
    VO: MatrixValue,
    IO: MatrixIndex,
    VI: MatrixValue + AsPrimitive<VO>,
    II: MatrixIndex,
{
    /// Wraps a matrix for exposure with the value type `VO` and index type
    /// `IO`.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] when either extent of the
    /// wrapped matrix does not fit in `IO`.
    pub fn new(inner: SharedMatrix<VI, II>) -> Result<Self, MatrixError> {
        for extent in [inner.nrow().as_(), inner.ncol().as_()] {
            if IO::try_from_usize(extent).is_err() {
                return Err(LayoutError::ExtentOverflow { extent }.into());
            }
        }
        Ok(Self { inner, _interface: core::marker::PhantomData })
    }

    fn translate(&self, subset: Subset<IO>) -> Subset<II> {
        match subset {
            Subset::Full => Subset::Full,
            Subset::Block { start, length } => Subset::Block {
                start: index_from_usize(start.as_()),
                length: index_from_usize(length.as_()),
            },
            Subset::Index(list) => {
                let converted: Vec<II> = list.iter().map(|&i| index_from_usize(i.as_())).collect();
                Subset::Index(converted.into())
            }
        }
    }

    fn capacity(&self, row: bool, subset: &Subset<IO>) -> usize {
        subset.len(index_from_usize(self.inner.extent(!row).as_()))
    }
}

impl<VO, IO, VI, II> Matrix<VO, IO> for DelayedCast<VO, IO, VI, II>
where
    VO: MatrixValue,
    IO: MatrixIndex,
    VI: MatrixValue + AsPrimitive<VO>,
    II: MatrixIndex,
{
    fn nrow(&self) -> IO {
        index_from_usize(self.inner.nrow().as_())
    }

    fn ncol(&self) -> IO {
        index_from_usize(self.inner.ncol().as_())
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
        subset: Subset<IO>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<VO, IO> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        let capacity = self.capacity(row, &subset);
        let inner = self.inner.dense(row, self.translate(subset), options)?;
        Ok(Box::new(CastDense { inner, vscratch: vec![VI::zero(); capacity], _interface: core::marker::PhantomData }))
    }

    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<IO>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<VO, IO> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        let capacity = self.capacity(row, &subset);
        let inner = self.inner.sparse(row, self.translate(subset), options)?;
        Ok(Box::new(CastSparse {
            inner,
            vscratch: vec![VI::zero(); capacity],
            iscratch: vec![II::ZERO; capacity],
            needs_value: options.extract_value,
            needs_index: options.extract_index,
            _interface: core::marker::PhantomData,
        }))
    }

    fn dense_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<IO>,
        subset: Subset<IO>,
        options: &Options,
    ) -> Result<Box<dyn OracularDenseExtractor<VO, IO> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        let capacity = self.capacity(row, &subset);
        let oracle = Arc::new(CastOracle { inner: oracle, _cast: core::marker::PhantomData });
        let inner = self.inner.dense_with_oracle(row, oracle, self.translate(subset), options)?;
        Ok(Box::new(CastOracularDense { inner, vscratch: vec![VI::zero(); capacity], _interface: core::marker::PhantomData }))
    }

    fn sparse_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<IO>,
        subset: Subset<IO>,
        options: &Options,
    ) -> Result<Box<dyn OracularSparseExtractor<VO, IO> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        let capacity = self.capacity(row, &subset);
        let oracle = Arc::new(CastOracle { inner: oracle, _cast: core::marker::PhantomData });
        let inner = self.inner.sparse_with_oracle(row, oracle, self.translate(subset), options)?;
        Ok(Box::new(CastOracularSparse {
            inner,
            vscratch: vec![VI::zero(); capacity],
            iscratch: vec![II::ZERO; capacity],
            needs_value: options.extract_value,
            needs_index: options.extract_index,
            _interface: core::marker::PhantomData,
        }))
    }
}

/// Oracle adaptor converting predictions into the wrapped index type.
struct CastOracle<IO, II> {
    inner: SharedOracle<IO>,
    _cast: core::marker::PhantomData<fn() -> II>,
}

impl<IO: MatrixIndex, II: MatrixIndex> Oracle<II> for CastOracle<IO, II> {
    fn total(&self) -> usize {
        self.inner.total()
    }

    fn get(&self, i: usize) -> II {
        index_from_usize(self.inner.get(i).as_())
    }
}

struct CastDense<'a, VO, IO, VI, II> {
    inner: Box<dyn DenseExtractor<VI, II> + 'a>,
    vscratch: Vec<VI>,
    _interface: core::marker::PhantomData<fn() -> (VO, IO)>,
}

struct CastSparse<'a, VO, IO, VI, II> {
    inner: Box<dyn SparseExtractor<VI, II> + 'a>,
    vscratch: Vec<VI>,
    iscratch: Vec<II>,
    needs_value: bool,
    needs_index: bool,
    _interface: core::marker::PhantomData<fn() -> (VO, IO)>,
}

struct CastOracularDense<'a, VO, IO, VI, II> {
    inner: Box<dyn OracularDenseExtractor<VI, II> + 'a>,
    vscratch: Vec<VI>,
    _interface: core::marker::PhantomData<fn() -> (VO, IO)>,
}

struct CastOracularSparse<'a, VO, IO, VI, II> {
    inner: Box<dyn OracularSparseExtractor<VI, II> + 'a>,
    vscratch: Vec<VI>,
    iscratch: Vec<II>,
    needs_value: bool,
    needs_index: bool,
    _interface: core::marker::PhantomData<fn() -> (VO, IO)>,
}

fn convert_dense<'s, VO, VI>(source: &[VI], buffer: &'s mut [VO]) -> &'s [VO]
where
    VO: MatrixValue,
    VI: MatrixValue + AsPrimitive<VO>,
{
    for (out, value) in buffer.iter_mut().zip(source) {
        *out = value.as_();
    }
    &buffer[..source.len()]
}

fn convert_sparse<'s, VO, IO, VI, II>(
    range: SparseRange<'_, VI, II>,
    values: &'s mut [VO],
    indices: &'s mut [IO],
    needs_value: bool,
    needs_index: bool,
) -> SparseRange<'s, VO, IO>
where
    VO: MatrixValue,
    IO: MatrixIndex,
    VI: MatrixValue + AsPrimitive<VO>,
    II: MatrixIndex,
{
    let n = range.number;
    if needs_value {
        for (out, value) in values[..n].iter_mut().zip(range.value.unwrap_or(&[])) {
            *out = value.as_();
        }
    }
    if needs_index {
        for (out, idx) in indices[..n].iter_mut().zip(range.index.unwrap_or(&[])) {
            *out = index_from_usize(idx.as_());
        }
    }
    SparseRange {
        number: n,
        value: if needs_value { Some(&values[..n]) } else { None },
        index: if needs_index { Some(&indices[..n]) } else { None },
    }
}

impl<VO, IO, VI, II> DenseExtractor<VO, IO> for CastDense<'_, VO, IO, VI, II>
where
    VO: MatrixValue,
    IO: MatrixIndex,
    VI: MatrixValue + AsPrimitive<VO>,
    II: MatrixIndex,
{
    fn fetch<'s>(&'s mut self, i: IO, buffer: &'s mut [VO]) -> &'s [VO] {
        let Self { inner, vscratch, .. } = self;
        let source = inner.fetch(index_from_usize(i.as_()), vscratch);
        convert_dense(source, buffer)
    }
}

impl<VO, IO, VI, II> SparseExtractor<VO, IO> for CastSparse<'_, VO, IO, VI, II>
where
    VO: MatrixValue,
    IO: MatrixIndex,
    VI: MatrixValue + AsPrimitive<VO>,
    II: MatrixIndex,
{
    fn fetch<'s>(
        &'s mut self,
        i: IO,
        values: &'s mut [VO],
        indices: &'s mut [IO],
    ) -> SparseRange<'s, VO, IO> {
        let Self { inner, vscratch, iscratch, needs_value, needs_index, .. } = self;
        let range = inner.fetch(index_from_usize(i.as_()), vscratch, iscratch);
        convert_sparse(range, values, indices, *needs_value, *needs_index)
    }
}

impl<VO, IO, VI, II> OracularDenseExtractor<VO, IO> for CastOracularDense<'_, VO, IO, VI, II>
where
    VO: MatrixValue,
    IO: MatrixIndex,
    VI: MatrixValue + AsPrimitive<VO>,
    II: MatrixIndex,
{
    fn fetch<'s>(&'s mut self, buffer: &'s mut [VO]) -> &'s [VO] {
        let Self { inner, vscratch, .. } = self;
        let source = inner.fetch(vscratch);
        convert_dense(source, buffer)
    }
}

impl<VO, IO, VI, II> OracularSparseExtractor<VO, IO> for CastOracularSparse<'_, VO, IO, VI, II>
where
    VO: MatrixValue,
    IO: MatrixIndex,
    VI: MatrixValue + AsPrimitive<VO>,
    II: MatrixIndex,
{
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [VO],
        indices: &'s mut [IO],
    ) -> SparseRange<'s, VO, IO> {
        let Self { inner, vscratch, iscratch, needs_value, needs_index, .. } = self;
        let range = inner.fetch(vscratch, iscratch);
        convert_sparse(range, values, indices, *needs_value, *needs_index)
    }
}
