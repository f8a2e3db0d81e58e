//! Submodule defining the error taxonomy of the crate.

pub mod layout;
pub mod parse;

pub use layout::LayoutError;
pub use parse::{ParseError, ParseErrorKind};

/// Top-level error returned by the fallible operations of this crate.
#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    /// A constructor or extractor factory received arguments violating its
    /// documented invariants.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] LayoutError),
    /// A MatrixMarket source could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The requested behavior was compiled out or is not expressible for the
    /// chosen value type.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// An arithmetic helper was asked for a result that the value type cannot
    /// represent.
    #[error("domain error: {0}")]
    Domain(String),
    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
