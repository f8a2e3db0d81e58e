//! Submodule providing the fragmented sparse storage engine, where each
//! primary element owns its value and index fragments.

use core::marker::PhantomData;

use num_traits::AsPrimitive;

use crate::errors::{LayoutError, MatrixError};
use crate::impls::secondary::{IndexRuns, SecondaryCursors};
use crate::traits::extractor::{
    DenseExtractor, Options, SparseExtractor, SparseRange, Subset,
};
use crate::traits::matrix::Matrix;
use crate::traits::numeric::{MatrixIndex, MatrixValue, StoredIndex, index_from_usize};

/// A sparse matrix holding one value fragment and one index fragment per
/// primary element.
///
/// Same access semantics as
/// [`CompressedSparseMatrix`](crate::impls::compressed::CompressedSparseMatrix),
/// with each run bounded by its own fragment length instead of a pointer
/// pair.
#[derive(Clone, Debug)]
pub struct FragmentedSparseMatrix<V, I, SV = V, SI = I> {
    values: Vec<Vec<SV>>,
    indices: Vec<Vec<SI>>,
    nrow: I,
    ncol: I,
    csr: bool,
    _interface: PhantomData<fn() -> (V, I)>,
}

impl<V, I, SV, SI> FragmentedSparseMatrix<V, I, SV, SI>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
{
    /// Creates a fragmented sparse matrix with one fragment per row.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] when the fragment count
    /// does not match the rows, a value fragment and its index fragment
    /// differ in length, or an index fragment is not strictly increasing
    /// within the column extent.
    pub fn by_row(
        nrow: I,
        ncol: I,
        values: Vec<Vec<SV>>,
        indices: Vec<Vec<SI>>,
    ) -> Result<Self, MatrixError> {
        Self::new(nrow, ncol, values, indices, true)
    }

    /// Creates a fragmented sparse matrix with one fragment per column.
    ///
    /// # Errors
    ///
    /// As for [`FragmentedSparseMatrix::by_row`], with the fragment count
    /// matched against the columns.
    pub fn by_column(
        nrow: I,
        ncol: I,
        values: Vec<Vec<SV>>,
        indices: Vec<Vec<SI>>,
    ) -> Result<Self, MatrixError> {
        Self::new(nrow, ncol, values, indices, false)
    }

    fn new(
        nrow: I,
        ncol: I,
        values: Vec<Vec<SV>>,
        indices: Vec<Vec<SI>>,
        csr: bool,
    ) -> Result<Self, MatrixError> {
        let out = Self { values, indices, nrow, ncol, csr, _interface: PhantomData };
        out.validate()?;
        Ok(out)
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let primary = self.primary_extent();
        if self.values.len() != primary {
            return Err(LayoutError::PointerCountMismatch {
                expected: primary,
                found: self.values.len(),
            });
        }
        if self.indices.len() != primary {
            return Err(LayoutError::PointerCountMismatch {
                expected: primary,
                found: self.indices.len(),
            });
        }

        let secondary = self.secondary_extent();
        for p in 0..primary {
            if self.values[p].len() != self.indices[p].len() {
                return Err(LayoutError::RaggedFragment {
                    primary: p,
                    values: self.values[p].len(),
                    indices: self.indices[p].len(),
                });
            }
            let run = &self.indices[p];
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

    fn primary_extent(&self) -> usize {
        if self.csr { self.nrow.as_() } else { self.ncol.as_() }
    }

    fn secondary_extent(&self) -> usize {
        if self.csr { self.ncol.as_() } else { self.nrow.as_() }
    }

    fn secondary_cursors(&self, subset: &Subset<I>) -> SecondaryCursors {
        let runs = FragmentedRuns { indices: &self.indices };
        let primary = index_from_usize::<I>(self.primary_extent());
        SecondaryCursors::new(
            self.secondary_extent(),
            subset.len(primary),
            |k| subset.coordinate(k),
            &runs,
        )
    }
}

impl<V, I, SV, SI> Matrix<V, I> for FragmentedSparseMatrix<V, I, SV, SI>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
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
            Ok(Box::new(FragmentPrimaryDense { matrix: self, subset }))
        } else {
            let cursors = self.secondary_cursors(&subset);
            Ok(Box::new(FragmentSecondaryDense { matrix: self, subset, cursors }))
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
            Ok(Box::new(FragmentPrimarySparse { matrix: self, subset, needs_value, needs_index }))
        } else {
            let cursors = self.secondary_cursors(&subset);
            Ok(Box::new(FragmentSecondarySparse {
                matrix: self,
                subset,
                cursors,
                needs_value,
                needs_index,
            }))
        }
    }
}

/// One run per primary element, straight from the fragments.
struct FragmentedRuns<'a, SI> {
    indices: &'a [Vec<SI>],
}

impl<SI: StoredIndex> IndexRuns for FragmentedRuns<'_, SI> {
    type Stored = SI;

    fn run(&self, primary: usize) -> &[SI] {
        &self.indices[primary]
    }
}

/// Dense extraction along the primary dimension.
struct FragmentPrimaryDense<'a, V, I, SV, SI> {
    matrix: &'a FragmentedSparseMatrix<V, I, SV, SI>,
    subset: Subset<I>,
}

impl<V, I, SV, SI> DenseExtractor<V, I> for FragmentPrimaryDense<'_, V, I, SV, SI>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
{
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let m = self.matrix;
        let p = i.as_();
        let run = &m.indices[p];
        let fragment = &m.values[p];
        let secondary = index_from_usize::<I>(m.secondary_extent());
        let n = self.subset.len(secondary);
        buffer[..n].fill(V::zero());
        match &self.subset {
            Subset::Full => {
                for (offset, idx) in run.iter().enumerate() {
                    buffer[idx.as_()] = fragment[offset].as_();
                }
            }
            Subset::Block { start, length } => {
                let first = start.as_();
                let last = first + length.as_();
                let lo = run.partition_point(|x| x.as_() < first);
                for offset in lo..run.len() {
                    let idx = run[offset].as_();
                    if idx >= last {
                        break;
                    }
                    buffer[idx - first] = fragment[offset].as_();
                }
            }
            Subset::Index(list) => {
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
                        buffer[c] = fragment[j].as_();
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
struct FragmentPrimarySparse<'a, V, I, SV, SI> {
    matrix: &'a FragmentedSparseMatrix<V, I, SV, SI>,
    subset: Subset<I>,
    needs_value: bool,
    needs_index: bool,
}

impl<V, I, SV, SI> SparseExtractor<V, I> for FragmentPrimarySparse<'_, V, I, SV, SI>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
{
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let m = self.matrix;
        let p = i.as_();
        let run = &m.indices[p];
        let fragment = &m.values[p];
        let mut n = 0;
        let mut emit = |offset: usize| {
            if self.needs_value {
                values[n] = fragment[offset].as_();
            }
            if self.needs_index {
                indices[n] = index_from_usize(run[offset].as_());
            }
            n += 1;
        };
        match &self.subset {
            Subset::Full => {
                for offset in 0..run.len() {
                    emit(offset);
                }
            }
            Subset::Block { start, length } => {
                let first = start.as_();
                let last = first + length.as_();
                let lo = run.partition_point(|x| x.as_() < first);
                for offset in lo..run.len() {
                    if run[offset].as_() >= last {
                        break;
                    }
                    emit(offset);
                }
            }
            Subset::Index(list) => {
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
                        emit(j);
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

/// Dense extraction along the secondary dimension.
struct FragmentSecondaryDense<'a, V, I, SV, SI> {
    matrix: &'a FragmentedSparseMatrix<V, I, SV, SI>,
    subset: Subset<I>,
    cursors: SecondaryCursors,
}

impl<V, I, SV, SI> DenseExtractor<V, I> for FragmentSecondaryDense<'_, V, I, SV, SI>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
{
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let Self { matrix, subset, cursors } = self;
        let primary = index_from_usize::<I>(matrix.primary_extent());
        let n = subset.len(primary);
        buffer[..n].fill(V::zero());
        let runs = FragmentedRuns { indices: &matrix.indices };
        cursors.search(i.as_(), |k| subset.coordinate(k), &runs, |k, offset| {
            buffer[k] = matrix.values[subset.coordinate(k)][offset].as_();
        });
        &buffer[..n]
    }
}

/// Sparse extraction along the secondary dimension.
struct FragmentSecondarySparse<'a, V, I, SV, SI> {
    matrix: &'a FragmentedSparseMatrix<V, I, SV, SI>,
    subset: Subset<I>,
    cursors: SecondaryCursors,
    needs_value: bool,
    needs_index: bool,
}

impl<V, I, SV, SI> SparseExtractor<V, I> for FragmentSecondarySparse<'_, V, I, SV, SI>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    SI: StoredIndex,
{
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { matrix, subset, cursors, needs_value, needs_index } = self;
        let runs = FragmentedRuns { indices: &matrix.indices };
        let mut n = 0;
        cursors.search(i.as_(), |k| subset.coordinate(k), &runs, |k, offset| {
            let p = subset.coordinate(k);
            if *needs_value {
                values[n] = matrix.values[p][offset].as_();
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

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> FragmentedSparseMatrix<f64, u32> {
        // 3 x 4, stored by row:
        // [[0, 8, 0, 9],
        //  [0, 0, 0, 0],
        //  [6, 0, 7, 0]]
        FragmentedSparseMatrix::by_row(
            3,
            4,
            vec![vec![8.0, 9.0], vec![], vec![6.0, 7.0]],
            vec![vec![1, 3], vec![], vec![0, 2]],
        )
        .unwrap()
    }

    #[test]
    fn test_validation() {
        let ragged: Result<FragmentedSparseMatrix<f64, u32>, _> =
            FragmentedSparseMatrix::by_row(2, 2, vec![vec![1.0], vec![]], vec![vec![], vec![]]);
        assert!(matches!(
            ragged,
            Err(MatrixError::InvalidArgument(LayoutError::RaggedFragment { primary: 0, .. }))
        ));

        let unsorted: Result<FragmentedSparseMatrix<f64, u32>, _> = FragmentedSparseMatrix::by_row(
            2,
            4,
            vec![vec![1.0, 2.0], vec![]],
            vec![vec![2, 2], vec![]],
        );
        assert!(matches!(
            unsorted,
            Err(MatrixError::InvalidArgument(LayoutError::UnsortedIndices { primary: 0 }))
        ));
    }

    #[test]
    fn test_primary_access() {
        let m = example();
        let mut work = m.dense(true, Subset::Full, &Options::default()).unwrap();
        let mut buffer = vec![0.0; 4];
        assert_eq!(work.fetch(0, &mut buffer), &[0.0, 8.0, 0.0, 9.0]);
        assert_eq!(work.fetch(1, &mut buffer), &[0.0; 4]);
        assert_eq!(work.fetch(2, &mut buffer), &[6.0, 0.0, 7.0, 0.0]);
    }

    #[test]
    fn test_secondary_access() {
        let m = example();
        let expected = [[0.0, 0.0, 6.0], [8.0, 0.0, 0.0], [0.0, 0.0, 7.0], [9.0, 0.0, 0.0]];
        let mut work = m.dense(false, Subset::Full, &Options::default()).unwrap();
        let mut buffer = vec![0.0; 3];
        for (c, column) in expected.iter().enumerate() {
            assert_eq!(work.fetch(c as u32, &mut buffer), column.as_slice());
        }
        for (c, column) in expected.iter().enumerate().rev() {
            assert_eq!(work.fetch(c as u32, &mut buffer), column.as_slice(), "reversed at {c}");
        }
    }

    #[test]
    fn test_secondary_sparse_block() {
        let m = example();
        let subset = Subset::Block { start: 1, length: 2 };
        let mut work = m.sparse(false, subset, &Options::default()).unwrap();
        let mut values = vec![0.0; 2];
        let mut indices = vec![0_u32; 2];
        let range = work.fetch(0, &mut values, &mut indices);
        assert_eq!(range.number, 1);
        assert_eq!(range.value.unwrap(), &[6.0]);
        assert_eq!(range.index.unwrap(), &[2]);
    }
}
