//! Submodule defining construction-time invariant violations.

/// Errors raised when a matrix, subset or decorator is built from arguments
/// that violate its structural invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The value and index arrays of a sparse layout differ in length.
    #[error("values ({values}) and indices ({indices}) should have the same length")]
    LengthMismatch {
        /// Number of stored values.
        values: usize,
        /// Number of stored indices.
        indices: usize,
    },
    /// The pointer array does not have one more entry than the primary extent.
    #[error("expected {expected} pointers but found {found}")]
    PointerCountMismatch {
        /// Primary extent plus one.
        expected: usize,
        /// Length of the provided pointer array.
        found: usize,
    },
    /// The first pointer of a compressed layout is not zero.
    #[error("the first pointer should be zero")]
    NonZeroFirstPointer,
    /// The last pointer does not equal the number of stored non-zeros.
    #[error("the last pointer ({last}) should equal the number of non-zeros ({nonzeros})")]
    PointerTotalMismatch {
        /// Value of the last pointer.
        last: usize,
        /// Number of stored non-zeros.
        nonzeros: usize,
    },
    /// The pointer array decreases at the given primary element.
    #[error("pointers should be non-decreasing (violated at primary element {primary})")]
    DecreasingPointers {
        /// Primary element at which the violation was detected.
        primary: usize,
    },
    /// The stored indices of one primary element are not strictly increasing.
    #[error("indices should be strictly increasing within primary element {primary}")]
    UnsortedIndices {
        /// Offending primary element.
        primary: usize,
    },
    /// A stored index lies outside the secondary extent.
    #[error("index {index} in primary element {primary} exceeds the extent {extent}")]
    IndexOutOfBounds {
        /// Primary element holding the offending index.
        primary: usize,
        /// The offending index.
        index: usize,
        /// Secondary extent of the matrix.
        extent: usize,
    },
    /// A fragmented layout has a value fragment and an index fragment of
    /// different lengths.
    #[error("fragment {primary} has {values} values but {indices} indices")]
    RaggedFragment {
        /// Offending primary element.
        primary: usize,
        /// Length of the value fragment.
        values: usize,
        /// Length of the index fragment.
        indices: usize,
    },
    /// The dense backing buffer does not match the requested shape.
    #[error("a {nrow} by {ncol} matrix cannot be backed by {found} values")]
    BufferSizeMismatch {
        /// Requested number of rows.
        nrow: usize,
        /// Requested number of columns.
        ncol: usize,
        /// Length of the provided buffer.
        found: usize,
    },
    /// Matrices being combined disagree on the non-target extent.
    #[error("all combined matrices should share the non-target extent {expected}, not {found}")]
    DimensionMismatch {
        /// Whether the matrices were being combined by row.
        by_row: bool,
        /// Extent of the first matrix.
        expected: usize,
        /// Extent of the offending matrix.
        found: usize,
    },
    /// A contiguous block subset does not fit in the dimension.
    #[error("block [{start}, {start} + {length}) exceeds the extent {extent}")]
    BlockOutOfBounds {
        /// Start of the block.
        start: usize,
        /// Length of the block.
        length: usize,
        /// Extent of the subsetted dimension.
        extent: usize,
    },
    /// An indexed subset is not strictly increasing.
    #[error("subset indices should be strictly increasing (violated at position {position})")]
    UnsortedSubset {
        /// Position of the first out-of-order entry.
        position: usize,
    },
    /// An indexed subset contains an entry outside the dimension.
    #[error("subset index {index} exceeds the extent {extent}")]
    SubsetOutOfBounds {
        /// The offending subset entry.
        index: usize,
        /// Extent of the subsetted dimension.
        extent: usize,
    },
    /// A dimension extent does not fit in the requested index type.
    #[error("extent {extent} does not fit in the requested index type")]
    ExtentOverflow {
        /// The offending extent.
        extent: usize,
    },
    /// A matrix handed to the layered pipeline contains a negative value.
    #[error("all values should be non-negative (violated in row {row})")]
    NegativeValue {
        /// Row holding the offending value.
        row: usize,
    },
    /// Triplet arrays of mismatched lengths were handed to the compressor.
    #[error("triplet arrays should have the same length ({values}, {primary}, {secondary})")]
    TripletLengthMismatch {
        /// Length of the value array.
        values: usize,
        /// Length of the primary index array.
        primary: usize,
        /// Length of the secondary index array.
        secondary: usize,
    },
}
