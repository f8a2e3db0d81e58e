//! Submodule providing the streaming MatrixMarket coordinate parser.

use std::io::Read;

use crate::errors::{MatrixError, ParseError, ParseErrorKind};

/// Receiver of parsed coordinate data.
///
/// The parser pushes the header exactly once, then one record per data line
/// with 0-based coordinates. A sink may return a [`ParseErrorKind`] to abort;
/// the parser attaches the offending 1-based line number.
pub trait TripletSink {
    /// Called once with the header's `(nrow, ncol, nlines)`.
    ///
    /// # Errors
    ///
    /// Returns the failure kind to abort parsing.
    fn dimensions(&mut self, nrow: usize, ncol: usize, nlines: usize)
    -> Result<(), ParseErrorKind>;

    /// Called per data line with 0-based coordinates and the 0-based data
    /// line index.
    ///
    /// # Errors
    ///
    /// Returns the failure kind to abort parsing.
    fn record(
        &mut self,
        row: usize,
        column: usize,
        value: u64,
        line: usize,
    ) -> Result<(), ParseErrorKind>;

    /// Whether parsing should stop once the header has been seen.
    fn preamble_only(&self) -> bool {
        false
    }
}

/// Byte-stream state machine for the MatrixMarket coordinate format.
///
/// Feed arbitrary chunks through [`CoordinateParser::consume`] and flush with
/// [`CoordinateParser::finish`]; a missing trailing newline is tolerated.
/// Comment lines start with `%`, fields hold non-negative decimal integers
/// separated by blanks, and the first non-comment line carries the
/// dimensions.
#[derive(Default)]
pub struct CoordinateParser {
    current_line: usize,
    data_lines: usize,
    passed_preamble: bool,
    in_comment: bool,
    field: usize,
    non_empty: bool,
    row: u64,
    column: u64,
    value: u64,
    nrow: usize,
    ncol: usize,
    nlines: usize,
    done: bool,
}

impl CoordinateParser {
    /// Feeds one chunk of bytes through the state machine.
    ///
    /// # Errors
    ///
    /// Fails with [`ParseError`] on malformed content, carrying the 1-based
    /// line number.
    pub fn consume<S: TripletSink>(
        &mut self,
        buffer: &[u8],
        sink: &mut S,
    ) -> Result<(), ParseError> {
        for &byte in buffer {
            if self.done {
                break;
            }
            self.step(byte, sink)?;
        }
        Ok(())
    }

    /// Whether the sink asked to stop after the preamble and the preamble has
    /// been seen.
    pub fn finished_early(&self) -> bool {
        self.done
    }

    /// Flushes a final unterminated line and checks the line-count totals.
    ///
    /// # Errors
    ///
    /// Fails with [`ParseError`] when the header never appeared or the data
    /// line count does not match it.
    pub fn finish<S: TripletSink>(&mut self, sink: &mut S) -> Result<(), ParseError> {
        if self.done {
            return Ok(());
        }
        if self.field != 0 || self.non_empty {
            self.end_line(sink)?;
        }
        if !self.passed_preamble {
            return Err(self.fail(ParseErrorKind::MissingHeader));
        }
        if self.data_lines != self.nlines {
            return Err(self.fail(ParseErrorKind::TooFewLines {
                declared: self.nlines,
                found: self.data_lines,
            }));
        }
        Ok(())
    }

    fn fail(&self, kind: ParseErrorKind) -> ParseError {
        ParseError { line: self.current_line + 1, kind }
    }

    fn step<S: TripletSink>(&mut self, byte: u8, sink: &mut S) -> Result<(), ParseError> {
        if self.in_comment {
            if byte == b'\n' {
                self.in_comment = false;
                self.current_line += 1;
            }
            return Ok(());
        }
        match byte {
            b'%' if self.field == 0 && !self.non_empty => {
                self.in_comment = true;
                Ok(())
            }
            b'\n' => self.end_line(sink),
            b' ' | b'\t' | b'\r' => {
                if self.non_empty {
                    self.field += 1;
                    self.non_empty = false;
                }
                Ok(())
            }
            b'0'..=b'9' => {
                self.non_empty = true;
                let digit = u64::from(byte - b'0');
                let slot = match self.field {
                    0 => &mut self.row,
                    1 => &mut self.column,
                    _ => &mut self.value,
                };
                let updated = slot.checked_mul(10).and_then(|x| x.checked_add(digit));
                match updated {
                    Some(v) => {
                        *slot = v;
                        Ok(())
                    }
                    None => Err(self.fail(ParseErrorKind::NumberOverflow)),
                }
            }
            _ => Err(self.fail(ParseErrorKind::UnexpectedCharacter)),
        }
    }

    fn end_line<S: TripletSink>(&mut self, sink: &mut S) -> Result<(), ParseError> {
        // Exactly three fields, whether or not the last one was followed by
        // trailing blanks.
        let three = (self.field == 3 && !self.non_empty) || (self.field == 2 && self.non_empty);
        if !three {
            return Err(self.fail(ParseErrorKind::FieldCount));
        }

        if self.passed_preamble {
            if self.row == 0 {
                return Err(self.fail(ParseErrorKind::ZeroRowIndex));
            }
            if self.row as usize > self.nrow {
                return Err(self.fail(ParseErrorKind::RowOutOfRange));
            }
            if self.column == 0 {
                return Err(self.fail(ParseErrorKind::ZeroColumnIndex));
            }
            if self.column as usize > self.ncol {
                return Err(self.fail(ParseErrorKind::ColumnOutOfRange));
            }
            if self.data_lines >= self.nlines {
                return Err(self.fail(ParseErrorKind::TooManyLines { declared: self.nlines }));
            }
            sink.record(self.row as usize - 1, self.column as usize - 1, self.value, self.data_lines)
                .map_err(|kind| self.fail(kind))?;
            self.data_lines += 1;
        } else {
            self.nrow = self.row as usize;
            self.ncol = self.column as usize;
            self.nlines = self.value as usize;
            sink.dimensions(self.nrow, self.ncol, self.nlines).map_err(|kind| self.fail(kind))?;
            self.passed_preamble = true;
            if sink.preamble_only() {
                self.done = true;
            }
        }

        self.field = 0;
        self.non_empty = false;
        self.row = 0;
        self.column = 0;
        self.value = 0;
        self.current_line += 1;
        Ok(())
    }
}

/// Drives the parser over a byte source with the given read-buffer size.
///
/// # Errors
///
/// Fails with [`MatrixError::Parse`] on malformed content or
/// [`MatrixError::Io`] when the source cannot be read.
pub fn parse_source<R: Read, S: TripletSink>(
    mut reader: R,
    sink: &mut S,
    bufsize: usize,
) -> Result<(), MatrixError> {
    let mut parser = CoordinateParser::default();
    let mut buffer = vec![0_u8; bufsize.max(1)];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        parser.consume(&buffer[..n], sink)?;
        if parser.finished_early() {
            return Ok(());
        }
    }
    parser.finish(sink)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Recorder {
        header: Option<(usize, usize, usize)>,
        records: Vec<(usize, usize, u64, usize)>,
        stop_after_header: bool,
    }

    impl TripletSink for Recorder {
        fn dimensions(
            &mut self,
            nrow: usize,
            ncol: usize,
            nlines: usize,
        ) -> Result<(), ParseErrorKind> {
            self.header = Some((nrow, ncol, nlines));
            Ok(())
        }

        fn record(
            &mut self,
            row: usize,
            column: usize,
            value: u64,
            line: usize,
        ) -> Result<(), ParseErrorKind> {
            self.records.push((row, column, value, line));
            Ok(())
        }

        fn preamble_only(&self) -> bool {
            self.stop_after_header
        }
    }

    fn parse(text: &str) -> Result<Recorder, MatrixError> {
        let mut recorder = Recorder::default();
        parse_source(text.as_bytes(), &mut recorder, 7)?;
        Ok(recorder)
    }

    const SIMPLE: &str = "%%MatrixMarket matrix coordinate integer general\n3 2 2\n1 1 5\n3 2 7\n";

    #[test]
    fn test_simple_document() {
        let recorder = parse(SIMPLE).unwrap();
        assert_eq!(recorder.header, Some((3, 2, 2)));
        assert_eq!(recorder.records, vec![(0, 0, 5, 0), (2, 1, 7, 1)]);
    }

    #[test]
    fn test_missing_trailing_newline() {
        let recorder = parse(SIMPLE.trim_end()).unwrap();
        assert_eq!(recorder.records.len(), 2);
        assert_eq!(recorder.records[1], (2, 1, 7, 1));
    }

    #[test]
    fn test_comments_and_blanks() {
        let text = "% a comment\n%%another\n3 2 1\n% interior comment\n2\t1   9\n";
        let recorder = parse(text).unwrap();
        assert_eq!(recorder.header, Some((3, 2, 1)));
        assert_eq!(recorder.records, vec![(1, 0, 9, 0)]);
    }

    #[test]
    fn test_no_data_lines() {
        let recorder = parse("%%MatrixMarket\n4 5 0\n").unwrap();
        assert_eq!(recorder.header, Some((4, 5, 0)));
        assert!(recorder.records.is_empty());
    }

    #[test]
    fn test_rejects_non_digits() {
        let err = parse("3 2 1\n1 -1 5\n").unwrap_err();
        match err {
            MatrixError::Parse(parse) => {
                assert_eq!(parse.line, 2);
                assert_eq!(parse.kind, ParseErrorKind::UnexpectedCharacter);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_field_counts() {
        let err = parse("3 2 1\n1 1\n").unwrap_err();
        match err {
            MatrixError::Parse(parse) => {
                assert_eq!(parse.line, 2);
                assert_eq!(parse.kind, ParseErrorKind::FieldCount);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        let err = parse("3 2 1\n4 1 5\n").unwrap_err();
        match err {
            MatrixError::Parse(parse) => assert_eq!(parse.kind, ParseErrorKind::RowOutOfRange),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = parse("3 2 1\n0 1 5\n").unwrap_err();
        match err {
            MatrixError::Parse(parse) => assert_eq!(parse.kind, ParseErrorKind::ZeroRowIndex),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_line_count_mismatches() {
        let err = parse("3 2 2\n1 1 5\n").unwrap_err();
        match err {
            MatrixError::Parse(parse) => {
                assert_eq!(parse.kind, ParseErrorKind::TooFewLines { declared: 2, found: 1 });
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = parse("3 2 1\n1 1 5\n2 2 6\n").unwrap_err();
        match err {
            MatrixError::Parse(parse) => {
                assert_eq!(parse.kind, ParseErrorKind::TooManyLines { declared: 1 });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_missing_header() {
        let err = parse("% only comments\n").unwrap_err();
        match err {
            MatrixError::Parse(parse) => assert_eq!(parse.kind, ParseErrorKind::MissingHeader),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_preamble_only_stops_early() {
        let mut recorder = Recorder { stop_after_header: true, ..Recorder::default() };
        // The data would be malformed, but the sink never sees it.
        parse_source("3 2 1\nnot data".as_bytes(), &mut recorder, 4).unwrap();
        assert_eq!(recorder.header, Some((3, 2, 1)));
        assert!(recorder.records.is_empty());
    }
}
