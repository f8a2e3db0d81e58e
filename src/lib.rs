#![doc = include_str!("../README.md")]

pub mod convert;
pub mod delayed;
pub mod errors;
pub mod impls;
pub mod layered;
pub mod market;
pub mod parallel;
pub mod traits;
pub mod triplets;

/// Prelude module re-exporting the public surface of the crate.
pub mod prelude {
    pub use crate::convert::{
        CompressedSparseContents, FragmentedSparseContents, convert_to_compressed_sparse,
        convert_to_dense, convert_to_fragmented_sparse, count_compressed_sparse_non_zeros,
        fill_compressed_sparse_contents, retrieve_compressed_sparse_contents,
        retrieve_fragmented_sparse_contents,
    };
    pub use crate::delayed::*;
    pub use crate::errors::{LayoutError, MatrixError, ParseError, ParseErrorKind};
    pub use crate::impls::*;
    pub use crate::layered::{
        LayeredMatrixData, convert_to_layered_sparse, load_layered_sparse_matrix_from_buffer,
        load_layered_sparse_matrix_from_file,
    };
    pub use crate::market::*;
    pub use crate::parallel::parallelize;
    pub use crate::traits::*;
    pub use crate::triplets::compress_sparse_triplets;
}
