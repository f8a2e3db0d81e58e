//! Submodule providing MatrixMarket coordinate-format parsing and loading.

pub mod load;
pub mod parser;

pub use load::{
    Compression, MarketHeader, inspect_buffer, inspect_file, load_sparse_matrix_from_buffer,
    load_sparse_matrix_from_file,
};
pub use parser::{CoordinateParser, TripletSink, parse_source};
