//! Submodule providing the dense storage engine, in row-major and
//! column-major flavors.

use crate::errors::{LayoutError, MatrixError};
use crate::traits::extractor::{
    DenseExtractor, Options, SparseExtractor, SparseRange, Subset,
};
use crate::traits::matrix::Matrix;
use crate::traits::numeric::{MatrixIndex, MatrixValue, index_from_usize};

/// A dense matrix backed by a single contiguous buffer.
///
/// The layout is chosen at construction; extraction along the major axis
/// returns slices of the backing buffer without copying, extraction along the
/// minor axis copies strided values into the caller's buffer.
#[derive(Clone, Debug)]
pub struct DenseMatrix<V, I> {
    values: Vec<V>,
    nrow: I,
    ncol: I,
    row_major: bool,
}

impl<V: MatrixValue, I: MatrixIndex> DenseMatrix<V, I> {
    /// Creates a dense matrix from values laid out one row after another.
    ///
    /// # Errors
    ///
    /// Fails with [`LayoutError::BufferSizeMismatch`] if the buffer does not
    /// hold exactly `nrow * ncol` values.
    pub fn new_row_major(nrow: I, ncol: I, values: Vec<V>) -> Result<Self, MatrixError> {
        Self::new(nrow, ncol, values, true)
    }

    /// Creates a dense matrix from values laid out one column after another.
    ///
    /// # Errors
    ///
    /// Fails with [`LayoutError::BufferSizeMismatch`] if the buffer does not
    /// hold exactly `nrow * ncol` values.
    pub fn new_column_major(nrow: I, ncol: I, values: Vec<V>) -> Result<Self, MatrixError> {
        Self::new(nrow, ncol, values, false)
    }

    fn new(nrow: I, ncol: I, values: Vec<V>, row_major: bool) -> Result<Self, MatrixError> {
        if values.len() != nrow.as_() * ncol.as_() {
            return Err(LayoutError::BufferSizeMismatch {
                nrow: nrow.as_(),
                ncol: ncol.as_(),
                found: values.len(),
            }
            .into());
        }
        Ok(Self { values, nrow, ncol, row_major })
    }

    /// Whether the backing buffer is laid out one row after another.
    pub fn is_row_major(&self) -> bool {
        self.row_major
    }

    /// Extent of the minor (fast-moving) storage dimension.
    fn minor_extent(&self) -> usize {
        if self.row_major { self.ncol.as_() } else { self.nrow.as_() }
    }
}

impl<V: MatrixValue, I: MatrixIndex> Matrix<V, I> for DenseMatrix<V, I> {
    fn nrow(&self) -> I {
        self.nrow
    }

    fn ncol(&self) -> I {
        self.ncol
    }

    fn is_sparse_proportion(&self) -> f64 {
        0.0
    }

    fn prefer_rows_proportion(&self) -> f64 {
        if self.row_major { 1.0 } else { 0.0 }
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
        if row == self.row_major {
            Ok(Box::new(AlignedDense { matrix: self, subset }))
        } else {
            Ok(Box::new(StridedDense { matrix: self, subset }))
        }
    }

    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 'a>, MatrixError> {
        let scratch = vec![V::zero(); subset.len(self.extent(!row))];
        let inner = self.dense(row, subset.clone(), options)?;
        Ok(Box::new(DenseToSparse {
            inner,
            subset,
            scratch,
            needs_value: options.extract_value,
            needs_index: options.extract_index,
        }))
    }
}

/// Dense extraction along the major axis: slices of the backing buffer.
struct AlignedDense<'a, V, I> {
    matrix: &'a DenseMatrix<V, I>,
    subset: Subset<I>,
}

impl<V: MatrixValue, I: MatrixIndex> DenseExtractor<V, I> for AlignedDense<'_, V, I> {
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let minor = self.matrix.minor_extent();
        let offset = i.as_() * minor;
        match &self.subset {
            Subset::Full => &self.matrix.values[offset..offset + minor],
            Subset::Block { start, length } => {
                let start = offset + start.as_();
                &self.matrix.values[start..start + length.as_()]
            }
            Subset::Index(list) => {
                for (k, j) in list.iter().enumerate() {
                    buffer[k] = self.matrix.values[offset + j.as_()];
                }
                &buffer[..list.len()]
            }
        }
    }
}

/// Dense extraction along the minor axis: strided copies.
struct StridedDense<'a, V, I> {
    matrix: &'a DenseMatrix<V, I>,
    subset: Subset<I>,
}

impl<V: MatrixValue, I: MatrixIndex> DenseExtractor<V, I> for StridedDense<'_, V, I> {
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let minor = self.matrix.minor_extent();
        let n = self.subset.len(self.matrix.extent(self.matrix.row_major));
        for k in 0..n {
            buffer[k] = self.matrix.values[self.subset.coordinate(k) * minor + i.as_()];
        }
        &buffer[..n]
    }
}

/// Sparse adaptor over a dense extractor, emitting the non-zero entries.
struct DenseToSparse<'a, V, I> {
    inner: Box<dyn DenseExtractor<V, I> + 'a>,
    subset: Subset<I>,
    scratch: Vec<V>,
    needs_value: bool,
    needs_index: bool,
}

impl<V: MatrixValue, I: MatrixIndex> SparseExtractor<V, I> for DenseToSparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { inner, subset, scratch, needs_value, needs_index } = self;
        let dense = inner.fetch(i, scratch);
        let mut n = 0;
        for (k, v) in dense.iter().enumerate() {
            if !v.is_zero() {
                if *needs_value {
                    values[n] = *v;
                }
                if *needs_index {
                    indices[n] = index_from_usize(subset.coordinate(k));
                }
                n += 1;
            }
        }
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

    fn example() -> DenseMatrix<f64, u32> {
        // 2 x 3: [[1, 0, 2], [0, 3, 0]]
        DenseMatrix::new_row_major(2, 3, vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0]).unwrap()
    }

    #[test]
    fn test_shape_and_hints() {
        let m = example();
        assert_eq!(m.nrow(), 2);
        assert_eq!(m.ncol(), 3);
        assert!(!m.is_sparse());
        assert!(m.prefer_rows());
        assert!(!m.uses_oracle(true));
    }

    #[test]
    fn test_buffer_size_checked() {
        let result: Result<DenseMatrix<f64, u32>, _> =
            DenseMatrix::new_row_major(2, 3, vec![0.0; 5]);
        assert!(matches!(
            result,
            Err(MatrixError::InvalidArgument(LayoutError::BufferSizeMismatch { .. }))
        ));
    }

    #[test]
    fn test_aligned_fetch_returns_backing_slice() {
        let m = example();
        let mut work = m.dense(true, Subset::Full, &Options::default()).unwrap();
        let mut buffer = vec![0.0; 3];
        assert_eq!(work.fetch(0, &mut buffer), &[1.0, 0.0, 2.0]);
        assert_eq!(work.fetch(1, &mut buffer), &[0.0, 3.0, 0.0]);
        // The buffer was never written to along the aligned path.
        assert_eq!(buffer, vec![0.0; 3]);
    }

    #[test]
    fn test_strided_fetch() {
        let m = example();
        let mut work = m.dense(false, Subset::Full, &Options::default()).unwrap();
        let mut buffer = vec![0.0; 2];
        assert_eq!(work.fetch(0, &mut buffer), &[1.0, 0.0]);
        assert_eq!(work.fetch(1, &mut buffer), &[0.0, 3.0]);
        assert_eq!(work.fetch(2, &mut buffer), &[2.0, 0.0]);
    }

    #[test]
    fn test_sparse_emits_non_zeros_only() {
        let m = example();
        let mut work = m.sparse(true, Subset::Full, &Options::default()).unwrap();
        let mut values = vec![0.0; 3];
        let mut indices = vec![0_u32; 3];
        let range = work.fetch(0, &mut values, &mut indices);
        assert_eq!(range.number, 2);
        assert_eq!(range.value.unwrap(), &[1.0, 2.0]);
        assert_eq!(range.index.unwrap(), &[0, 2]);
    }

    #[test]
    fn test_sparse_respects_options() {
        let m = example();
        let options = Options { extract_value: false, ..Options::default() };
        let mut work = m.sparse(true, Subset::Full, &options).unwrap();
        let mut indices = vec![0_u32; 3];
        let range = work.fetch(0, &mut [], &mut indices);
        assert_eq!(range.number, 2);
        assert!(range.value.is_none());
        assert_eq!(range.index.unwrap(), &[0, 2]);
    }

    #[test]
    fn test_indexed_subset() {
        let m = example();
        let subset = Subset::Index(vec![0_u32, 2].into());
        let mut work = m.dense(true, subset, &Options::default()).unwrap();
        let mut buffer = vec![0.0; 2];
        assert_eq!(work.fetch(0, &mut buffer), &[1.0, 2.0]);
    }
}
