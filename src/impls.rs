//! Submodule collecting the concrete storage engines and oracle
//! implementations.

pub mod compressed;
pub mod dense;
pub mod fragmented;
pub mod oracles;
pub(crate) mod secondary;

pub use compressed::{
    CompressedSparseColumnMatrix, CompressedSparseMatrix, CompressedSparseRowMatrix,
};
pub use dense::DenseMatrix;
pub use fragmented::FragmentedSparseMatrix;
pub use oracles::{
    ConsecutiveOracle, FixedVectorOracle, ReplayDenseExtractor, ReplaySparseExtractor,
    consecutive_dense, consecutive_sparse,
};
