//! Submodule providing the MatrixMarket loaders and header inspection.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use num_traits::{AsPrimitive, NumCast};

use crate::errors::{LayoutError, MatrixError, ParseErrorKind};
use crate::impls::compressed::CompressedSparseMatrix;
use crate::market::parser::{TripletSink, parse_source};
use crate::traits::matrix::SharedMatrix;
use crate::traits::numeric::{MatrixIndex, MatrixValue, StoredIndex};
use crate::triplets::compress_sparse_triplets;

/// How a MatrixMarket source is compressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    /// Plain text.
    None,
    /// Gzip (or zlib) compressed.
    Gzip,
    /// Sniff the gzip magic bytes `1f 8b` and decide.
    Detect,
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[cfg(feature = "gzip")]
fn decompressing_reader<R: Read + 'static>(reader: R) -> Result<Box<dyn Read>, MatrixError> {
    Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
}

#[cfg(not(feature = "gzip"))]
fn decompressing_reader<R: Read + 'static>(_reader: R) -> Result<Box<dyn Read>, MatrixError> {
    Err(MatrixError::UnsupportedConfiguration(
        "gzip sources need the `gzip` feature".into(),
    ))
}

/// Opens a file as a byte stream, decompressing as requested.
pub(crate) fn open_file(path: &Path, compression: Compression) -> Result<Box<dyn Read>, MatrixError> {
    let compression = match compression {
        Compression::Detect => {
            let mut magic = [0_u8; 2];
            let mut probe = File::open(path)?;
            let read = probe.read(&mut magic)?;
            if read == 2 && magic == GZIP_MAGIC { Compression::Gzip } else { Compression::None }
        }
        other => other,
    };
    let file = File::open(path)?;
    match compression {
        Compression::Gzip => decompressing_reader(file),
        _ => Ok(Box::new(file)),
    }
}

/// Opens an in-memory buffer as a byte stream, decompressing as requested.
pub(crate) fn open_buffer<'b>(
    buffer: &'b [u8],
    compression: Compression,
) -> Result<Box<dyn Read + 'b>, MatrixError> {
    let gzip = match compression {
        Compression::Gzip => true,
        Compression::None => false,
        Compression::Detect => buffer.len() >= 2 && buffer[..2] == GZIP_MAGIC,
    };
    if gzip {
        #[cfg(feature = "gzip")]
        {
            return Ok(Box::new(flate2::read::MultiGzDecoder::new(buffer)));
        }
        #[cfg(not(feature = "gzip"))]
        {
            return Err(MatrixError::UnsupportedConfiguration(
                "gzip sources need the `gzip` feature".into(),
            ));
        }
    }
    Ok(Box::new(buffer))
}

/// Dimensions declared in a MatrixMarket header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarketHeader {
    /// Number of rows.
    pub nrow: usize,
    /// Number of columns.
    pub ncol: usize,
    /// Number of data lines.
    pub nlines: usize,
}

#[derive(Default)]
struct Inspector {
    header: Option<MarketHeader>,
}

impl TripletSink for Inspector {
    fn dimensions(&mut self, nrow: usize, ncol: usize, nlines: usize)
    -> Result<(), ParseErrorKind> {
        self.header = Some(MarketHeader { nrow, ncol, nlines });
        Ok(())
    }

    fn record(&mut self, _: usize, _: usize, _: u64, _: usize) -> Result<(), ParseErrorKind> {
        Ok(())
    }

    fn preamble_only(&self) -> bool {
        true
    }
}

fn finish_inspection(inspector: Inspector, line_hint: usize) -> Result<MarketHeader, MatrixError> {
    inspector.header.ok_or_else(|| {
        crate::errors::ParseError { line: line_hint, kind: ParseErrorKind::MissingHeader }.into()
    })
}

/// Reads only the header of a MatrixMarket file.
///
/// # Errors
///
/// Fails with [`MatrixError::Parse`] when no header is present, or
/// [`MatrixError::Io`] on read failure.
pub fn inspect_file<P: AsRef<Path>>(
    path: P,
    compression: Compression,
    bufsize: usize,
) -> Result<MarketHeader, MatrixError> {
    let mut inspector = Inspector::default();
    parse_source(open_file(path.as_ref(), compression)?, &mut inspector, bufsize)?;
    finish_inspection(inspector, 1)
}

/// Reads only the header of an in-memory MatrixMarket document.
///
/// # Errors
///
/// As for [`inspect_file`].
pub fn inspect_buffer(
    buffer: &[u8],
    compression: Compression,
    bufsize: usize,
) -> Result<MarketHeader, MatrixError> {
    let mut inspector = Inspector::default();
    parse_source(open_buffer(buffer, compression)?, &mut inspector, bufsize)?;
    finish_inspection(inspector, 1)
}

/// Triplet accumulator behind the simple loader.
///
/// Row and column indices are stored as u16 when the corresponding extent
/// allows it, halving the memory spent on large files of small matrices.
struct TripletStore<V> {
    nrow: usize,
    ncol: usize,
    values: Vec<V>,
    short_rows: Vec<u16>,
    long_rows: Vec<u32>,
    short_cols: Vec<u16>,
    long_cols: Vec<u32>,
}

impl<V> TripletStore<V> {
    fn new() -> Self {
        Self {
            nrow: 0,
            ncol: 0,
            values: Vec::new(),
            short_rows: Vec::new(),
            long_rows: Vec::new(),
            short_cols: Vec::new(),
            long_cols: Vec::new(),
        }
    }

    fn short_rows(&self) -> bool {
        self.nrow <= <usize as From<u16>>::from(u16::MAX)
    }

    fn short_cols(&self) -> bool {
        self.ncol <= <usize as From<u16>>::from(u16::MAX)
    }
}

impl<V: NumCast> TripletSink for TripletStore<V> {
    fn dimensions(&mut self, nrow: usize, ncol: usize, nlines: usize)
    -> Result<(), ParseErrorKind> {
        self.nrow = nrow;
        self.ncol = ncol;
        self.values.reserve_exact(nlines);
        if self.short_rows() {
            self.short_rows.reserve_exact(nlines);
        } else {
            self.long_rows.reserve_exact(nlines);
        }
        if self.short_cols() {
            self.short_cols.reserve_exact(nlines);
        } else {
            self.long_cols.reserve_exact(nlines);
        }
        Ok(())
    }

    fn record(
        &mut self,
        row: usize,
        column: usize,
        value: u64,
        _line: usize,
    ) -> Result<(), ParseErrorKind> {
        let value = V::from(value).ok_or(ParseErrorKind::ValueOverflow)?;
        self.values.push(value);
        if self.short_rows() {
            self.short_rows.push(row as u16);
        } else {
            self.long_rows.push(row as u32);
        }
        if self.short_cols() {
            self.short_cols.push(column as u16);
        } else {
            self.long_cols.push(column as u32);
        }
        Ok(())
    }
}

fn assemble<V, I, RI, CI>(
    nrow: usize,
    ncol: usize,
    mut values: Vec<V>,
    mut rows: Vec<RI>,
    mut cols: Vec<CI>,
) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue + AsPrimitive<V>,
    I: MatrixIndex,
    RI: StoredIndex,
    CI: StoredIndex,
{
    for extent in [nrow, ncol] {
        if I::try_from_usize(extent).is_err() {
            return Err(LayoutError::ExtentOverflow { extent }.into());
        }
    }
    let pointers = compress_sparse_triplets(ncol, &mut values, &mut cols, &mut rows)?;
    let matrix = CompressedSparseMatrix::<V, I, V, RI, usize>::csc(
        crate::traits::numeric::index_from_usize(nrow),
        crate::traits::numeric::index_from_usize(ncol),
        values,
        rows,
        pointers,
        false,
    )?;
    Ok(Arc::new(matrix))
}

fn build_simple<V, I>(store: TripletStore<V>) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue + AsPrimitive<V>,
    I: MatrixIndex,
{
    let TripletStore { nrow, ncol, values, short_rows, long_rows, short_cols, long_cols } = store;
    match (nrow <= <usize as From<u16>>::from(u16::MAX), ncol <= <usize as From<u16>>::from(u16::MAX)) {
        (true, true) => assemble(nrow, ncol, values, short_rows, short_cols),
        (true, false) => assemble(nrow, ncol, values, short_rows, long_cols),
        (false, true) => assemble(nrow, ncol, values, long_rows, short_cols),
        (false, false) => assemble(nrow, ncol, values, long_rows, long_cols),
    }
}

/// Loads a sparse non-negative integer matrix from a MatrixMarket coordinate
/// file, stored in memory as compressed sparse columns.
///
/// # Errors
///
/// Fails with [`MatrixError::Parse`] on malformed content,
/// [`MatrixError::Io`] on read failure,
/// [`MatrixError::UnsupportedConfiguration`] for compressed input without the
/// `gzip` feature, and [`MatrixError::InvalidArgument`] when an extent does
/// not fit the index type.
pub fn load_sparse_matrix_from_file<V, I, P>(
    path: P,
    compression: Compression,
    bufsize: usize,
) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue + NumCast + AsPrimitive<V>,
    I: MatrixIndex,
    P: AsRef<Path>,
{
    let mut store = TripletStore::new();
    parse_source(open_file(path.as_ref(), compression)?, &mut store, bufsize)?;
    build_simple(store)
}

/// Loads a sparse non-negative integer matrix from an in-memory MatrixMarket
/// document.
///
/// # Errors
///
/// As for [`load_sparse_matrix_from_file`].
pub fn load_sparse_matrix_from_buffer<V, I>(
    buffer: &[u8],
    compression: Compression,
    bufsize: usize,
) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue + NumCast + AsPrimitive<V>,
    I: MatrixIndex,
{
    let mut store = TripletStore::new();
    parse_source(open_buffer(buffer, compression)?, &mut store, bufsize)?;
    build_simple(store)
}
