//! Submodule providing the compressed sparse storage engine.

use core::marker::PhantomData;

use num_traits::AsPrimitive;

use crate::errors::{LayoutError, MatrixError};
use crate::impls::secondary::{IndexRuns, SecondaryCursors};
use crate::traits::extractor::{
    DenseExtractor, Options, SparseExtractor, SparseRange, Subset,
};
use crate::traits::matrix::Matrix;
use crate::traits::numeric::{MatrixIndex, MatrixValue, StoredIndex, index_from_usize};

/// A compressed sparse matrix.
///
/// The non-zeros of primary element `p` occupy
/// `values[pointers[p]..pointers[p + 1]]`, with the corresponding secondary
/// indices strictly increasing within each run. The stored value, stored
/// index and pointer types are independent of the interface types, so narrow
/// storage (say u8 values with u16 indices) can back a wider interface.
#[derive(Clone, Debug)]
pub struct CompressedSparseMatrix<V, I, SV = V, SI = I, P = usize> {
    values: Vec<SV>,
    indices: Vec<SI>,
    pointers: Vec<P>,
    nrow: I,
    ncol: I,
    csr: bool,
    _interface: PhantomData<fn() -> (V, I)>,
}

/// A compressed sparse matrix whose primary dimension is the rows.
pub type CompressedSparseRowMatrix<V, I, SV = V, SI = I, P = usize> =
    CompressedSparseMatrix<V, I, SV, SI, P>;

/// A compressed sparse matrix whose primary dimension is the columns.
pub type CompressedSparseColumnMatrix<V, I, SV = V, SI = I, P = usize> =
    CompressedSparseMatrix<V, I, SV, SI, P>;

impl<V, I, SV, SI, P> CompressedSparseMatrix<V, I, SV, SI, P>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
    P: StoredIndex,
{
    /// Creates a compressed sparse row matrix.
    ///
    /// # Errors
    ///
    /// If `check` is set, fails with [`MatrixError::InvalidArgument`] when the
    /// layout invariants do not hold: matching value/index lengths, one
    /// pointer per row plus one, non-decreasing pointers starting at zero and
    /// ending at the number of non-zeros, and strictly increasing in-bounds
    /// indices within each row.
    pub fn csr(
        nrow: I,
        ncol: I,
        values: Vec<SV>,
        indices: Vec<SI>,
        pointers: Vec<P>,
        check: bool,
    ) -> Result<Self, MatrixError> {
        Self::new(nrow, ncol, values, indices, pointers, true, check)
    }

    /// Creates a compressed sparse column matrix.
    ///
    /// # Errors
    ///
    /// As for [`CompressedSparseMatrix::csr`], with the pointer array sized
    /// by the columns.
    pub fn csc(
        nrow: I,
        ncol: I,
        values: Vec<SV>,
        indices: Vec<SI>,
        pointers: Vec<P>,
        check: bool,
    ) -> Result<Self, MatrixError> {
        Self::new(nrow, ncol, values, indices, pointers, false, check)
    }

    fn new(
        nrow: I,
        ncol: I,
        values: Vec<SV>,
        indices: Vec<SI>,
        pointers: Vec<P>,
        csr: bool,
        check: bool,
    ) -> Result<Self, MatrixError> {
        let out = Self { values, indices, pointers, nrow, ncol, csr, _interface: PhantomData };
        if check {
            out.validate()?;
        }
        Ok(out)
    }

    fn validate(&self) -> Result<(), LayoutError> {
        if self.values.len() != self.indices.len() {
            return Err(LayoutError::LengthMismatch {
                values: self.values.len(),
                indices: self.indices.len(),
            });
        }

        let primary = self.primary_extent();
        if self.pointers.len() != primary + 1 {
            return Err(LayoutError::PointerCountMismatch {
                expected: primary + 1,
                found: self.pointers.len(),
            });
        }
        if self.pointers[0].as_() != 0 {
            return Err(LayoutError::NonZeroFirstPointer);
        }
        if self.pointers[primary].as_() != self.indices.len() {
            return Err(LayoutError::PointerTotalMismatch {
                last: self.pointers[primary].as_(),
                nonzeros: self.indices.len(),
            });
        }

        let secondary = self.secondary_extent();
        for p in 0..primary {
            let start = self.pointers[p].as_();
            let end = self.pointers[p + 1].as_();
            if end < start {
                return Err(LayoutError::DecreasingPointers { primary: p });
            }
            let run = &self.indices[start..end];
            for window in run.windows(2) {
                if window[0] >= window[1] {
                    return Err(LayoutError::UnsortedIndices { primary: p });
                }
            }
            if let Some(last) = run.last() {
                if last.as_() >= secondary {
                    return Err(LayoutError::IndexOutOfBounds {
                        primary: p,
                        index: last.as_(),
                        extent: secondary,
                    });
                }
            }
        }
        Ok(())
    }

    /// Extent of the primary (storage-aligned) dimension.
    fn primary_extent(&self) -> usize {
        if self.csr { self.nrow.as_() } else { self.ncol.as_() }
    }

    /// Extent of the secondary dimension.
    fn secondary_extent(&self) -> usize {
        if self.csr { self.ncol.as_() } else { self.nrow.as_() }
    }

    /// The index run of one primary element.
    fn run(&self, p: usize) -> &[SI] {
        &self.indices[self.pointers[p].as_()..self.pointers[p + 1].as_()]
    }
}

impl<V, I, SV, SI, P> Matrix<V, I> for CompressedSparseMatrix<V, I, SV, SI, P>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
    P: StoredIndex,
{
    fn nrow(&self) -> I {
        self.nrow
    }

    fn ncol(&self) -> I {
        self.ncol
    }

    fn is_sparse_proportion(&self) -> f64 {
        1.0
    }

    fn prefer_rows_proportion(&self) -> f64 {
        if self.csr { 1.0 } else { 0.0 }
    }

    fn uses_oracle(&self, _row: bool) -> bool {
        false
    }

    fn dense<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        _options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        if row == self.csr {
            Ok(Box::new(PrimaryDense { matrix: self, subset }))
        } else {
            let cursors = self.secondary_cursors(&subset);
            Ok(Box::new(SecondaryDense { matrix: self, subset, cursors }))
        }
    }

    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 'a>, MatrixError> {
        subset.validate(self.extent(!row))?;
        let needs_value = options.extract_value;
        let needs_index = options.extract_index;
        if row == self.csr {
            Ok(Box::new(PrimarySparse { matrix: self, subset, needs_value, needs_index }))
        } else {
            let cursors = self.secondary_cursors(&subset);
            Ok(Box::new(SecondarySparse { matrix: self, subset, cursors, needs_value, needs_index }))
        }
    }
}

impl<V, I, SV, SI, P> CompressedSparseMatrix<V, I, SV, SI, P>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
    P: StoredIndex,
{
    /// Builds the cursor cache for a secondary-dimension extractor whose
    /// primary selection is `subset`.
    fn secondary_cursors(&self, subset: &Subset<I>) -> SecondaryCursors {
        let runs = CompressedRuns { indices: &self.indices, pointers: &self.pointers };
        let primary = index_from_usize::<I>(self.primary_extent());
        SecondaryCursors::new(
            self.secondary_extent(),
            subset.len(primary),
            |k| subset.coordinate(k),
            &runs,
        )
    }

    /// Locates the stored span of primary element `p` overlapping the
    /// secondary block `[first, last)`.
    fn primary_span(&self, p: usize, first: usize, last: usize) -> (usize, usize) {
        let base = self.pointers[p].as_();
        let run = self.run(p);
        // Jump ahead only when the block actually cuts into the run.
        let lo = if first > 0 { run.partition_point(|x| x.as_() < first) } else { 0 };
        let hi = if last < self.secondary_extent() {
            lo + run[lo..].partition_point(|x| x.as_() < last)
        } else {
            run.len()
        };
        (base + lo, base + hi)
    }
}

/// Slice view over the monolithic index array, one run per primary element.
struct CompressedRuns<'a, SI, P> {
    indices: &'a [SI],
    pointers: &'a [P],
}

impl<SI: StoredIndex, P: StoredIndex> IndexRuns for CompressedRuns<'_, SI, P> {
    type Stored = SI;

    fn run(&self, primary: usize) -> &[SI] {
        &self.indices[self.pointers[primary].as_()..self.pointers[primary + 1].as_()]
    }
}

/// Dense extraction along the primary dimension.
struct PrimaryDense<'a, V, I, SV, SI, P> {
    matrix: &'a CompressedSparseMatrix<V, I, SV, SI, P>,
    subset: Subset<I>,
}

impl<V, I, SV, SI, P> DenseExtractor<V, I> for PrimaryDense<'_, V, I, SV, SI, P>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
    P: StoredIndex,
{
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let m = self.matrix;
        let p = i.as_();
        let secondary = index_from_usize::<I>(m.secondary_extent());
        let n = self.subset.len(secondary);
        buffer[..n].fill(V::zero());
        match &self.subset {
            Subset::Full => {
                let (start, end) = m.primary_span(p, 0, m.secondary_extent());
                for offset in start..end {
                    buffer[m.indices[offset].as_()] = m.values[offset].as_();
                }
            }
            Subset::Block { start: bs, length } => {
                let first = bs.as_();
                let (start, end) = m.primary_span(p, first, first + length.as_());
                for offset in start..end {
                    buffer[m.indices[offset].as_() - first] = m.values[offset].as_();
                }
            }
            Subset::Index(list) => {
                let base = m.pointers[p].as_();
                let run = m.run(p);
                let mut j = 0;
                let mut c = 0;
                while j < run.len() && c < list.len() {
                    let stored = run[j].as_();
                    let wanted = list[c].as_();
                    if stored < wanted {
                        j += 1;
                    } else if stored > wanted {
                        c += 1;
                    } else {
                        buffer[c] = m.values[base + j].as_();
                        j += 1;
                        c += 1;
                    }
                }
            }
        }
        &buffer[..n]
    }
}

/// Sparse extraction along the primary dimension.
struct PrimarySparse<'a, V, I, SV, SI, P> {
    matrix: &'a CompressedSparseMatrix<V, I, SV, SI, P>,
    subset: Subset<I>,
    needs_value: bool,
    needs_index: bool,
}

impl<V, I, SV, SI, P> SparseExtractor<V, I> for PrimarySparse<'_, V, I, SV, SI, P>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
    P: StoredIndex,
{
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let m = self.matrix;
        let p = i.as_();
        let mut n = 0;
        let mut emit = |offset: usize| {
            if self.needs_value {
                values[n] = m.values[offset].as_();
            }
            if self.needs_index {
                indices[n] = index_from_usize(m.indices[offset].as_());
            }
            n += 1;
        };
        match &self.subset {
            Subset::Full => {
                let start = m.pointers[p].as_();
                let end = m.pointers[p + 1].as_();
                for offset in start..end {
                    emit(offset);
                }
            }
            Subset::Block { start: bs, length } => {
                let first = bs.as_();
                let (start, end) = m.primary_span(p, first, first + length.as_());
                for offset in start..end {
                    emit(offset);
                }
            }
            Subset::Index(list) => {
                let base = m.pointers[p].as_();
                let run = m.run(p);
                let mut j = 0;
                let mut c = 0;
                while j < run.len() && c < list.len() {
                    let stored = run[j].as_();
                    let wanted = list[c].as_();
                    if stored < wanted {
                        j += 1;
                    } else if stored > wanted {
                        c += 1;
                    } else {
                        emit(base + j);
                        j += 1;
                        c += 1;
                    }
                }
            }
        }
        SparseRange {
            number: n,
            value: if self.needs_value { Some(&values[..n]) } else { None },
            index: if self.needs_index { Some(&indices[..n]) } else { None },
        }
    }
}

/// Dense extraction along the secondary dimension, through the cursor cache.
struct SecondaryDense<'a, V, I, SV, SI, P> {
    matrix: &'a CompressedSparseMatrix<V, I, SV, SI, P>,
    subset: Subset<I>,
    cursors: SecondaryCursors,
}

impl<V, I, SV, SI, P> DenseExtractor<V, I> for SecondaryDense<'_, V, I, SV, SI, P>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
    P: StoredIndex,
{
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let Self { matrix, subset, cursors } = self;
        let primary = index_from_usize::<I>(matrix.primary_extent());
        let n = subset.len(primary);
        buffer[..n].fill(V::zero());
        let runs = CompressedRuns { indices: &matrix.indices, pointers: &matrix.pointers };
        cursors.search(i.as_(), |k| subset.coordinate(k), &runs, |k, offset| {
            let base = matrix.pointers[subset.coordinate(k)].as_();
            buffer[k] = matrix.values[base + offset].as_();
        });
        &buffer[..n]
    }
}

/// Sparse extraction along the secondary dimension, through the cursor cache.
struct SecondarySparse<'a, V, I, SV, SI, P> {
    matrix: &'a CompressedSparseMatrix<V, I, SV, SI, P>,
    subset: Subset<I>,
    cursors: SecondaryCursors,
    needs_value: bool,
    needs_index: bool,
}

impl<V, I, SV, SI, P> SparseExtractor<V, I> for SecondarySparse<'_, V, I, SV, SI, P>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
    P: StoredIndex,
{
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { matrix, subset, cursors, needs_value, needs_index } = self;
        let runs = CompressedRuns { indices: &matrix.indices, pointers: &matrix.pointers };
        let mut n = 0;
        cursors.search(i.as_(), |k| subset.coordinate(k), &runs, |k, offset| {
            let p = subset.coordinate(k);
            if *needs_value {
                let base = matrix.pointers[p].as_();
                values[n] = matrix.values[base + offset].as_();
            }
            if *needs_index {
                indices[n] = index_from_usize(p);
            }
            n += 1;
        });
        SparseRange {
            number: n,
            value: if *needs_value { Some(&values[..n]) } else { None },
            index: if *needs_index { Some(&indices[..n]) } else { None },
        }
    }
}
