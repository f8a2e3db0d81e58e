//! Submodule defining the extractor protocol: subsets, options, sparse ranges
//! and the four extractor capabilities.

use std::sync::Arc;

use crate::errors::LayoutError;
use crate::traits::numeric::MatrixIndex;

/// Shared handle to a sorted, duplicate-free index list.
pub type SharedIndices<I> = Arc<[I]>;

/// Selection applied to the non-target dimension of an extraction.
#[derive(Clone, Debug)]
pub enum Subset<I> {
    /// Every element of the dimension.
    Full,
    /// The contiguous elements `[start, start + length)`.
    Block {
        /// First selected element.
        start: I,
        /// Number of selected elements.
        length: I,
    },
    /// An explicit ascending, duplicate-free list of elements.
    Index(SharedIndices<I>),
}

impl<I: MatrixIndex> Subset<I> {
    /// Number of selected elements, given the extent of the dimension.
    pub fn len(&self, extent: I) -> usize {
        match self {
            Self::Full => extent.as_(),
            Self::Block { length, .. } => length.as_(),
            Self::Index(list) => list.len(),
        }
    }

    /// Whether the selection is empty, given the extent of the dimension.
    pub fn is_empty(&self, extent: I) -> bool {
        self.len(extent) == 0
    }

    /// The dimension coordinate of the `k`-th selected element.
    pub fn coordinate(&self, k: usize) -> usize {
        match self {
            Self::Full => k,
            Self::Block { start, .. } => start.as_() + k,
            Self::Index(list) => list[k].as_(),
        }
    }

    /// Checks that the selection fits in a dimension of the given extent.
    pub(crate) fn validate(&self, extent: I) -> Result<(), LayoutError> {
        match self {
            Self::Full => Ok(()),
            Self::Block { start, length } => {
                if start.as_() + length.as_() > extent.as_() {
                    return Err(LayoutError::BlockOutOfBounds {
                        start: start.as_(),
                        length: length.as_(),
                        extent: extent.as_(),
                    });
                }
                Ok(())
            }
            Self::Index(list) => {
                for (position, window) in list.windows(2).enumerate() {
                    if window[0] >= window[1] {
                        return Err(LayoutError::UnsortedSubset { position: position + 1 });
                    }
                }
                if let Some(last) = list.last() {
                    if last.as_() >= extent.as_() {
                        return Err(LayoutError::SubsetOutOfBounds {
                            index: last.as_(),
                            extent: extent.as_(),
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

/// Options applied at extractor construction, immutable thereafter.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Whether sparse extraction should materialize the value array.
    pub extract_value: bool,
    /// Whether sparse extraction should materialize the index array.
    pub extract_index: bool,
    /// Whether sparse indices must come back in strictly increasing order.
    pub ordered_index: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { extract_value: true, extract_index: true, ordered_index: true }
    }
}

/// A view of the non-zero entries of one row or column.
///
/// Either array may be absent when the extractor was configured not to
/// materialize it through [`Options`]. When both are present they are
/// parallel, and the indices are strictly increasing if the extractor was
/// asked for ordered output.
#[derive(Clone, Copy, Debug)]
pub struct SparseRange<'a, V, I> {
    /// Number of non-zero entries.
    pub number: usize,
    /// Values of the non-zero entries, if materialized.
    pub value: Option<&'a [V]>,
    /// Non-target-dimension indices of the non-zero entries, if materialized.
    pub index: Option<&'a [I]>,
}

/// A stateful reader of dense rows or columns, driven by caller indices.
pub trait DenseExtractor<V, I> {
    /// Retrieves row or column `i`, restricted to the extractor's subset.
    ///
    /// The returned slice either aliases `buffer` or memory owned by the
    /// matrix; it is valid until the next fetch on this extractor. `buffer`
    /// must be at least as long as the subset.
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V];
}

/// A stateful reader of sparse rows or columns, driven by caller indices.
pub trait SparseExtractor<V, I> {
    /// Retrieves the non-zero entries of row or column `i`, restricted to the
    /// extractor's subset.
    ///
    /// The returned range may alias the buffers or matrix-owned memory, and
    /// is valid until the next fetch. Each buffer must be at least as long as
    /// the subset unless the corresponding array was disabled through
    /// [`Options`], in which case it may be empty.
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I>;
}

/// A dense reader whose target sequence is fixed by an oracle.
///
/// The k-th call retrieves the oracle's k-th prediction. Calling `fetch` more
/// than `total()` times is a programming error and may panic.
pub trait OracularDenseExtractor<V, I> {
    /// Retrieves the next predicted row or column.
    fn fetch<'s>(&'s mut self, buffer: &'s mut [V]) -> &'s [V];
}

/// A sparse reader whose target sequence is fixed by an oracle.
pub trait OracularSparseExtractor<V, I> {
    /// Retrieves the non-zero entries of the next predicted row or column.
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I>;
}
