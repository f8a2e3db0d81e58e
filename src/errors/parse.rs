//! Submodule defining MatrixMarket parsing errors.

/// Error raised while parsing a MatrixMarket coordinate source.
///
/// The line number is 1-based, matching what a text editor would show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line on which the failure was detected.
    pub line: usize,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

/// The ways a MatrixMarket coordinate source can be malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// A numeric field contained something other than an ASCII digit.
    #[error("values should be non-negative integers")]
    UnexpectedCharacter,
    /// A line did not contain exactly three fields.
    #[error("each line should contain three values")]
    FieldCount,
    /// A row index was zero; the format is 1-based.
    #[error("row index must be positive")]
    ZeroRowIndex,
    /// A column index was zero; the format is 1-based.
    #[error("column index must be positive")]
    ZeroColumnIndex,
    /// A row index exceeded the extent declared in the header.
    #[error("row index out of range")]
    RowOutOfRange,
    /// A column index exceeded the extent declared in the header.
    #[error("column index out of range")]
    ColumnOutOfRange,
    /// More data lines were present than the header declared.
    #[error("more lines present than specified in the header ({declared})")]
    TooManyLines {
        /// Line count declared in the header.
        declared: usize,
    },
    /// Fewer data lines were present than the header declared.
    #[error("detected {found} lines but {declared} specified in the header")]
    TooFewLines {
        /// Line count declared in the header.
        declared: usize,
        /// Data lines actually read.
        found: usize,
    },
    /// The source ended before a header line was seen.
    #[error("no header line specifying the dimensions")]
    MissingHeader,
    /// A numeric field overflowed the accumulator.
    #[error("numeric field is too large")]
    NumberOverflow,
    /// A parsed value does not fit in the requested output type.
    #[error("value does not fit in the requested output type")]
    ValueOverflow,
}
