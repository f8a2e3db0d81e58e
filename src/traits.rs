//! Submodule collecting the abstract protocol of the crate: the matrix
//! concept, the extractor capabilities, the oracle and the numeric bounds.

pub mod extractor;
pub mod matrix;
pub mod numeric;
pub mod oracle;

pub use extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SharedIndices,
    SparseExtractor, SparseRange, Subset,
};
pub use matrix::{Matrix, SharedMatrix};
pub use numeric::{MatrixIndex, MatrixValue, StoredIndex, TryFromUsize};
pub use oracle::{Oracle, SharedOracle};
