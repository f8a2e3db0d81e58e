//! Submodule providing the streaming layered loader: two passes of the
//! MatrixMarket parser over the same source.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use num_traits::AsPrimitive;

use crate::delayed::bind::DelayedBind;
use crate::errors::{LayoutError, MatrixError, ParseErrorKind};
use crate::impls::compressed::CompressedSparseMatrix;
use crate::layered::assignment::{LayeredMatrixData, categorize, compute_new_indices};
use crate::market::load::{Compression, open_buffer, open_file};
use crate::market::parser::{TripletSink, parse_source};
use crate::traits::matrix::SharedMatrix;
use crate::traits::numeric::{MatrixIndex, MatrixValue, StoredIndex, TryFromUsize, index_from_usize};
use crate::triplets::compress_sparse_triplets;

/// First pass: classify each row by its largest value and count its entries.
#[derive(Default)]
struct LineClassifier {
    nrow: usize,
    ncol: usize,
    category: Vec<u8>,
    lines_per_row: Vec<usize>,
}

impl TripletSink for LineClassifier {
    fn dimensions(&mut self, nrow: usize, ncol: usize, _nlines: usize)
    -> Result<(), ParseErrorKind> {
        self.nrow = nrow;
        self.ncol = ncol;
        self.category = vec![0; nrow];
        self.lines_per_row = vec![0; nrow];
        Ok(())
    }

    fn record(&mut self, row: usize, _column: usize, value: u64, _line: usize)
    -> Result<(), ParseErrorKind> {
        self.category[row] = self.category[row].max(categorize(value));
        self.lines_per_row[row] += 1;
        Ok(())
    }
}

/// Output of the first pass, driving the second.
struct LineAssignments {
    nrow: usize,
    ncol: usize,
    category: Vec<u8>,
    index: Vec<usize>,
    rows_per_category: [usize; 3],
    lines_per_category: [usize; 3],
    permutation: Vec<usize>,
}

impl LineClassifier {
    fn finish(self) -> LineAssignments {
        let remapping = compute_new_indices(&self.category);
        let mut lines_per_category = [0_usize; 3];
        for (&cat, &lines) in self.category.iter().zip(&self.lines_per_row) {
            lines_per_category[usize::from(cat)] += lines;
        }
        LineAssignments {
            nrow: self.nrow,
            ncol: self.ncol,
            category: self.category,
            index: remapping.new_indices,
            rows_per_category: remapping.per_category,
            lines_per_category,
            permutation: remapping.permutation,
        }
    }
}

/// Second pass: write each entry into its tier's pre-sized triplet arrays,
/// with rows already renumbered into tier-local space.
struct LayeredTripletBuilder<'a, RI> {
    assignments: &'a LineAssignments,
    rows8: Vec<RI>,
    cols8: Vec<u32>,
    data8: Vec<u8>,
    rows16: Vec<RI>,
    cols16: Vec<u32>,
    data16: Vec<u16>,
    rows32: Vec<RI>,
    cols32: Vec<u32>,
    data32: Vec<u32>,
    counters: [usize; 3],
}

impl<'a, RI: StoredIndex + TryFromUsize> LayeredTripletBuilder<'a, RI> {
    fn new(assignments: &'a LineAssignments) -> Self {
        let [n8, n16, n32] = assignments.lines_per_category;
        Self {
            assignments,
            rows8: vec![stored_row::<RI>(0); n8],
            cols8: vec![0; n8],
            data8: vec![0; n8],
            rows16: vec![stored_row::<RI>(0); n16],
            cols16: vec![0; n16],
            data16: vec![0; n16],
            rows32: vec![stored_row::<RI>(0); n32],
            cols32: vec![0; n32],
            data32: vec![0; n32],
            counters: [0; 3],
        }
    }

    fn finish<V, I>(self) -> Result<SharedMatrix<V, I>, MatrixError>
    where
        V: MatrixValue,
        I: MatrixIndex,
        u8: AsPrimitive<V>,
        u16: AsPrimitive<V>,
        u32: AsPrimitive<V>,
    {
        let assignments = self.assignments;
        let ncol = assignments.ncol;
        for extent in [assignments.nrow, ncol] {
            if I::try_from_usize(extent).is_err() {
                return Err(LayoutError::ExtentOverflow { extent }.into());
            }
        }

        let mut collated: Vec<SharedMatrix<V, I>> = Vec::new();
        if assignments.rows_per_category[0] > 0 {
            collated.push(tier_matrix(
                assignments.rows_per_category[0],
                ncol,
                self.data8,
                self.rows8,
                self.cols8,
            )?);
        }
        if assignments.rows_per_category[1] > 0 {
            collated.push(tier_matrix(
                assignments.rows_per_category[1],
                ncol,
                self.data16,
                self.rows16,
                self.cols16,
            )?);
        }
        if assignments.rows_per_category[2] > 0 {
            collated.push(tier_matrix(
                assignments.rows_per_category[2],
                ncol,
                self.data32,
                self.rows32,
                self.cols32,
            )?);
        }

        match collated.len() {
            0 => {
                // No rows at all: an empty compressed column matrix keeps the
                // declared column extent.
                let matrix = CompressedSparseMatrix::<V, I, u8, RI, usize>::csc(
                    I::ZERO,
                    index_from_usize(ncol),
                    Vec::new(),
                    Vec::new(),
                    vec![0; ncol + 1],
                    false,
                )?;
                Ok(Arc::new(matrix))
            }
            1 => {
                let mut collated = collated;
                Ok(collated.pop().unwrap_or_else(|| unreachable!()))
            }
            _ => Ok(Arc::new(DelayedBind::new(collated, true)?)),
        }
    }
}

fn stored_row<RI: TryFromUsize>(row: usize) -> RI {
    RI::try_from_usize(row).unwrap_or_else(|_| {
        unreachable!("the layered builder is in an illegal state where a row does not fit its tier index type")
    })
}

/// Compresses one tier's triplets into a compressed sparse column matrix.
fn tier_matrix<V, I, SV, RI>(
    nrow: usize,
    ncol: usize,
    mut values: Vec<SV>,
    mut rows: Vec<RI>,
    mut cols: Vec<u32>,
) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    RI: StoredIndex,
{
    let pointers = compress_sparse_triplets(ncol, &mut values, &mut cols, &mut rows)?;
    let matrix = CompressedSparseMatrix::<V, I, SV, RI, usize>::csc(
        index_from_usize(nrow),
        index_from_usize(ncol),
        values,
        rows,
        pointers,
        false,
    )?;
    Ok(Arc::new(matrix))
}

impl<RI: StoredIndex + TryFromUsize> TripletSink for LayeredTripletBuilder<'_, RI> {
    fn dimensions(&mut self, _nrow: usize, _ncol: usize, _nlines: usize)
    -> Result<(), ParseErrorKind> {
        Ok(())
    }

    fn record(&mut self, row: usize, column: usize, value: u64, _line: usize)
    -> Result<(), ParseErrorKind> {
        let cat = usize::from(self.assignments.category[row]);
        let local = stored_row::<RI>(self.assignments.index[row]);
        let at = self.counters[cat];
        match cat {
            0 => {
                self.rows8[at] = local;
                self.cols8[at] = column as u32;
                self.data8[at] = value as u8;
            }
            1 => {
                self.rows16[at] = local;
                self.cols16[at] = column as u32;
                self.data16[at] = value as u16;
            }
            _ => {
                self.rows32[at] = local;
                self.cols32[at] = column as u32;
                self.data32[at] = value as u32;
            }
        }
        self.counters[cat] = at + 1;
        Ok(())
    }
}

fn load_layered<V, I, R, F>(open: F, bufsize: usize) -> Result<LayeredMatrixData<V, I>, MatrixError>
where
    V: MatrixValue,
    I: MatrixIndex,
    u8: AsPrimitive<V>,
    u16: AsPrimitive<V>,
    u32: AsPrimitive<V>,
    R: Read,
    F: Fn() -> Result<R, MatrixError>,
{
    let mut classifier = LineClassifier::default();
    parse_source(open()?, &mut classifier, bufsize)?;
    let assignments = classifier.finish();

    // Tier-local row indices shrink to u16 whenever the row count allows.
    let matrix = if assignments.nrow <= usize::from(u16::MAX) {
        let mut builder = LayeredTripletBuilder::<u16>::new(&assignments);
        parse_source(open()?, &mut builder, bufsize)?;
        builder.finish::<V, I>()?
    } else {
        let mut builder = LayeredTripletBuilder::<u32>::new(&assignments);
        parse_source(open()?, &mut builder, bufsize)?;
        builder.finish::<V, I>()?
    };

    Ok(LayeredMatrixData { matrix, permutation: assignments.permutation })
}

/// Loads a MatrixMarket coordinate file as a layered sparse matrix.
///
/// The file is scanned twice: once to classify each row by its largest value
/// and once to build the tiered submatrices.
///
/// # Errors
///
/// As for
/// [`load_sparse_matrix_from_file`](crate::market::load_sparse_matrix_from_file).
pub fn load_layered_sparse_matrix_from_file<V, I, P>(
    path: P,
    compression: Compression,
    bufsize: usize,
) -> Result<LayeredMatrixData<V, I>, MatrixError>
where
    V: MatrixValue,
    I: MatrixIndex,
    u8: AsPrimitive<V>,
    u16: AsPrimitive<V>,
    u32: AsPrimitive<V>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    load_layered(|| open_file(path, compression), bufsize)
}

/// Loads an in-memory MatrixMarket document as a layered sparse matrix, with
/// two passes over the buffer.
///
/// # Errors
///
/// As for [`load_layered_sparse_matrix_from_file`].
pub fn load_layered_sparse_matrix_from_buffer<V, I>(
    buffer: &[u8],
    compression: Compression,
    bufsize: usize,
) -> Result<LayeredMatrixData<V, I>, MatrixError>
where
    V: MatrixValue,
    I: MatrixIndex,
    u8: AsPrimitive<V>,
    u16: AsPrimitive<V>,
    u32: AsPrimitive<V>,
{
    load_layered(|| open_buffer(buffer, compression), bufsize)
}
