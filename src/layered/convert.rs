//! Submodule providing in-memory conversion of a matrix into its layered
//! sparse form.

use std::sync::Arc;

use num_traits::AsPrimitive;

use crate::delayed::bind::DelayedBind;
use crate::errors::{LayoutError, MatrixError};
use crate::impls::compressed::CompressedSparseMatrix;
use crate::impls::oracles::{consecutive_dense, consecutive_sparse};
use crate::layered::assignment::{LayeredMatrixData, RowRemapping, categorize, compute_new_indices};
use crate::traits::extractor::{Options, Subset};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue, StoredIndex, TryFromUsize, index_from_usize};

/// Reorders the rows of an integer matrix into u8/u16/u32 value tiers.
///
/// Each row lands in the smallest tier holding its largest value; the tier
/// submatrices are stacked by row and the reordering is reported as a
/// permutation, with original row `r` found at row `permutation[r]` of the
/// output.
///
/// # Errors
///
/// Fails with [`MatrixError::InvalidArgument`] when a negative value is
/// encountered, and propagates extractor-factory failures.
pub fn convert_to_layered_sparse<V, I>(
    matrix: &dyn Matrix<V, I>,
) -> Result<LayeredMatrixData<V, I>, MatrixError>
where
    V: MatrixValue + AsPrimitive<u64> + AsPrimitive<u8> + AsPrimitive<u16> + AsPrimitive<u32>,
    I: MatrixIndex,
    u8: AsPrimitive<V>,
    u16: AsPrimitive<V>,
    u32: AsPrimitive<V>,
{
    if matrix.nrow().as_() <= usize::from(u16::MAX) {
        convert_with_row_type::<V, I, u16>(matrix)
    } else {
        convert_with_row_type::<V, I, u32>(matrix)
    }
}

/// One value tier under construction: compressed columns of a single stored
/// width.
struct Tier<SV, RI> {
    data: Vec<SV>,
    rows: Vec<RI>,
    pointers: Vec<usize>,
}

impl<SV: Copy + num_traits::Zero, RI: Copy> Tier<SV, RI> {
    fn growing() -> Self {
        Self { data: Vec::new(), rows: Vec::new(), pointers: vec![0] }
    }

    /// Sizes the tier from per-column counts (offset by one for summing),
    /// returning the per-column write cursors.
    fn from_counts(mut counts: Vec<usize>, row_zero: RI) -> (Self, Vec<usize>) {
        for c in 1..counts.len() {
            counts[c] += counts[c - 1];
        }
        let total = counts.last().copied().unwrap_or(0);
        let cursors = counts[..counts.len() - 1].to_vec();
        (
            Self { data: vec![SV::zero(); total], rows: vec![row_zero; total], pointers: counts },
            cursors,
        )
    }

    fn write(&mut self, cursor: &mut usize, value: SV, row: RI) {
        self.data[*cursor] = value;
        self.rows[*cursor] = row;
        *cursor += 1;
    }

    fn push(&mut self, value: SV, row: RI) {
        self.data.push(value);
        self.rows.push(row);
    }

    fn close_column(&mut self) {
        self.pointers.push(self.data.len());
    }
}

fn tier_to_matrix<V, I, SV, RI>(
    tier: Tier<SV, RI>,
    nrow: usize,
    ncol: usize,
) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + AsPrimitive<V>,
    RI: StoredIndex,
{
    let matrix = CompressedSparseMatrix::<V, I, SV, RI, usize>::csc(
        index_from_usize(nrow),
        index_from_usize(ncol),
        tier.data,
        tier.rows,
        tier.pointers,
        false,
    )?;
    Ok(Arc::new(matrix))
}

fn local_row<RI: TryFromUsize>(row: usize) -> RI {
    RI::try_from_usize(row).unwrap_or_else(|_| {
        unreachable!("the layered conversion is in an illegal state where a row does not fit its tier index type")
    })
}

fn convert_with_row_type<V, I, RI>(
    matrix: &dyn Matrix<V, I>,
) -> Result<LayeredMatrixData<V, I>, MatrixError>
where
    V: MatrixValue + AsPrimitive<u64> + AsPrimitive<u8> + AsPrimitive<u16> + AsPrimitive<u32>,
    I: MatrixIndex,
    u8: AsPrimitive<V>,
    u16: AsPrimitive<V>,
    u32: AsPrimitive<V>,
    RI: StoredIndex + TryFromUsize,
{
    let nrow = matrix.nrow().as_();
    let ncol = matrix.ncol().as_();

    let (tier8, tier16, tier32, remapping) = if matrix.prefer_rows() {
        convert_by_row::<V, I, RI>(matrix, nrow, ncol)?
    } else {
        convert_by_column::<V, I, RI>(matrix, nrow, ncol)?
    };

    let mut collated: Vec<SharedMatrix<V, I>> = Vec::new();
    if remapping.per_category[0] > 0 {
        collated.push(tier_to_matrix(tier8, remapping.per_category[0], ncol)?);
    }
    if remapping.per_category[1] > 0 {
        collated.push(tier_to_matrix(tier16, remapping.per_category[1], ncol)?);
    }
    if remapping.per_category[2] > 0 {
        collated.push(tier_to_matrix(tier32, remapping.per_category[2], ncol)?);
    }

    let combined = match collated.len() {
        0 => tier_to_matrix::<V, I, u8, RI>(
            Tier { data: Vec::new(), rows: Vec::new(), pointers: vec![0; ncol + 1] },
            0,
            ncol,
        )?,
        1 => {
            let mut collated = collated;
            collated.pop().unwrap_or_else(|| unreachable!())
        }
        _ => Arc::new(DelayedBind::new(collated, true)?),
    };

    Ok(LayeredMatrixData { matrix: combined, permutation: remapping.permutation })
}

/// Routes one entry into the tier chosen for its row.
#[allow(clippy::too_many_arguments)]
fn write_tiered<V, RI>(
    tier8: &mut Tier<u8, RI>,
    tier16: &mut Tier<u16, RI>,
    tier32: &mut Tier<u32, RI>,
    cursors: [&mut Vec<usize>; 3],
    cat: u8,
    column: usize,
    local: RI,
    value: V,
) where
    V: MatrixValue + AsPrimitive<u8> + AsPrimitive<u16> + AsPrimitive<u32>,
    RI: Copy,
{
    let [cursors8, cursors16, cursors32] = cursors;
    match cat {
        0 => tier8.write(&mut cursors8[column], value.as_(), local),
        1 => tier16.write(&mut cursors16[column], value.as_(), local),
        _ => tier32.write(&mut cursors32[column], value.as_(), local),
    }
}

type TierTriple<RI> = (Tier<u8, RI>, Tier<u16, RI>, Tier<u32, RI>);

fn convert_by_row<V, I, RI>(
    matrix: &dyn Matrix<V, I>,
    nrow: usize,
    ncol: usize,
) -> Result<(Tier<u8, RI>, Tier<u16, RI>, Tier<u32, RI>, RowRemapping), MatrixError>
where
    V: MatrixValue + AsPrimitive<u64> + AsPrimitive<u8> + AsPrimitive<u16> + AsPrimitive<u32>,
    I: MatrixIndex,
    RI: StoredIndex + TryFromUsize,
{
    let mut category = vec![0_u8; nrow];
    let mut counts: [Vec<usize>; 3] = core::array::from_fn(|_| vec![0; ncol + 1]);
    let sparse_input = matrix.is_sparse();

    // First pass: classify each row and tally the entries per column, so the
    // tier pointers can be sized up front.
    if sparse_input {
        let mut work =
            consecutive_sparse(matrix, true, 0, nrow, Subset::Full, &Options::default())?;
        let mut vbuf = vec![V::zero(); ncol];
        let mut ibuf = vec![I::ZERO; ncol];
        for (r, cat) in category.iter_mut().enumerate() {
            let range = work.fetch(&mut vbuf, &mut ibuf);
            let values = range.value.unwrap_or(&[]);
            let indices = range.index.unwrap_or(&[]);
            *cat = classify_row(values, r)?;
            for (value, idx) in values.iter().zip(indices) {
                if !value.is_zero() {
                    counts[usize::from(*cat)][idx.as_() + 1] += 1;
                }
            }
        }
    } else {
        let mut work = consecutive_dense(matrix, true, 0, nrow, Subset::Full, &Options::default())?;
        let mut buffer = vec![V::zero(); ncol];
        for (r, cat) in category.iter_mut().enumerate() {
            let fetched = work.fetch(&mut buffer);
            *cat = classify_row(fetched, r)?;
            for (c, value) in fetched.iter().enumerate() {
                if !value.is_zero() {
                    counts[usize::from(*cat)][c + 1] += 1;
                }
            }
        }
    }

    let remapping = compute_new_indices(&category);
    let [counts8, counts16, counts32] = counts;
    let (mut tier8, mut cursors8) = Tier::<u8, RI>::from_counts(counts8, local_row(0));
    let (mut tier16, mut cursors16) = Tier::<u16, RI>::from_counts(counts16, local_row(0));
    let (mut tier32, mut cursors32) = Tier::<u32, RI>::from_counts(counts32, local_row(0));

    // Second pass: write every entry at its tier's per-column cursor, rows
    // renumbered into tier-local space. Iterating rows in order keeps the
    // row indices strictly increasing within each column of each tier.
    if sparse_input {
        let mut work =
            consecutive_sparse(matrix, true, 0, nrow, Subset::Full, &Options::default())?;
        let mut vbuf = vec![V::zero(); ncol];
        let mut ibuf = vec![I::ZERO; ncol];
        for r in 0..nrow {
            let range = work.fetch(&mut vbuf, &mut ibuf);
            let values = range.value.unwrap_or(&[]);
            let indices = range.index.unwrap_or(&[]);
            for (value, idx) in values.iter().zip(indices) {
                if !value.is_zero() {
                    write_tiered(
                        &mut tier8,
                        &mut tier16,
                        &mut tier32,
                        [&mut cursors8, &mut cursors16, &mut cursors32],
                        category[r],
                        idx.as_(),
                        local_row(remapping.new_indices[r]),
                        *value,
                    );
                }
            }
        }
    } else {
        let mut work = consecutive_dense(matrix, true, 0, nrow, Subset::Full, &Options::default())?;
        let mut buffer = vec![V::zero(); ncol];
        for r in 0..nrow {
            let fetched = work.fetch(&mut buffer);
            for (c, value) in fetched.iter().enumerate() {
                if !value.is_zero() {
                    write_tiered(
                        &mut tier8,
                        &mut tier16,
                        &mut tier32,
                        [&mut cursors8, &mut cursors16, &mut cursors32],
                        category[r],
                        c,
                        local_row(remapping.new_indices[r]),
                        *value,
                    );
                }
            }
        }
    }

    Ok((tier8, tier16, tier32, remapping))
}

fn convert_by_column<V, I, RI>(
    matrix: &dyn Matrix<V, I>,
    nrow: usize,
    ncol: usize,
) -> Result<(Tier<u8, RI>, Tier<u16, RI>, Tier<u32, RI>, RowRemapping), MatrixError>
where
    V: MatrixValue + AsPrimitive<u64> + AsPrimitive<u8> + AsPrimitive<u16> + AsPrimitive<u32>,
    I: MatrixIndex,
    RI: StoredIndex + TryFromUsize,
{
    let mut maxima = vec![0_u64; nrow];
    let sparse_input = matrix.is_sparse();

    // First pass: per-row maxima, accumulated across columns.
    if sparse_input {
        let mut work =
            consecutive_sparse(matrix, false, 0, ncol, Subset::Full, &Options::default())?;
        let mut vbuf = vec![V::zero(); nrow];
        let mut ibuf = vec![I::ZERO; nrow];
        for _ in 0..ncol {
            let range = work.fetch(&mut vbuf, &mut ibuf);
            let values = range.value.unwrap_or(&[]);
            let indices = range.index.unwrap_or(&[]);
            for (value, idx) in values.iter().zip(indices) {
                let r = idx.as_();
                check_non_negative(*value, r)?;
                maxima[r] = maxima[r].max(value.as_());
            }
        }
    } else {
        let mut work =
            consecutive_dense(matrix, false, 0, ncol, Subset::Full, &Options::default())?;
        let mut buffer = vec![V::zero(); nrow];
        for _ in 0..ncol {
            let fetched = work.fetch(&mut buffer);
            for (r, value) in fetched.iter().enumerate() {
                check_non_negative(*value, r)?;
                maxima[r] = maxima[r].max(value.as_());
            }
        }
    }

    let category: Vec<u8> = maxima.into_iter().map(categorize).collect();
    let remapping = compute_new_indices(&category);

    let (mut tier8, mut tier16, mut tier32): TierTriple<RI> =
        (Tier::growing(), Tier::growing(), Tier::growing());

    // Second pass: append column by column; the pointers of each tier grow
    // as its columns close. Ascending rows within a column stay ascending
    // after renumbering, as tier-local indices preserve row order.
    if sparse_input {
        let mut work =
            consecutive_sparse(matrix, false, 0, ncol, Subset::Full, &Options::default())?;
        let mut vbuf = vec![V::zero(); nrow];
        let mut ibuf = vec![I::ZERO; nrow];
        for _ in 0..ncol {
            let range = work.fetch(&mut vbuf, &mut ibuf);
            let values = range.value.unwrap_or(&[]);
            let indices = range.index.unwrap_or(&[]);
            for (value, idx) in values.iter().zip(indices) {
                if !value.is_zero() {
                    let r = idx.as_();
                    push_tiered(&mut tier8, &mut tier16, &mut tier32, category[r], local_row::<RI>(remapping.new_indices[r]), *value);
                }
            }
            tier8.close_column();
            tier16.close_column();
            tier32.close_column();
        }
    } else {
        let mut work =
            consecutive_dense(matrix, false, 0, ncol, Subset::Full, &Options::default())?;
        let mut buffer = vec![V::zero(); nrow];
        for _ in 0..ncol {
            let fetched = work.fetch(&mut buffer);
            for (r, value) in fetched.iter().enumerate() {
                if !value.is_zero() {
                    push_tiered(&mut tier8, &mut tier16, &mut tier32, category[r], local_row::<RI>(remapping.new_indices[r]), *value);
                }
            }
            tier8.close_column();
            tier16.close_column();
            tier32.close_column();
        }
    }

    Ok((tier8, tier16, tier32, remapping))
}

/// Appends one entry to the tier chosen for its row.
fn push_tiered<V, RI>(
    tier8: &mut Tier<u8, RI>,
    tier16: &mut Tier<u16, RI>,
    tier32: &mut Tier<u32, RI>,
    cat: u8,
    local: RI,
    value: V,
) where
    V: MatrixValue + AsPrimitive<u8> + AsPrimitive<u16> + AsPrimitive<u32>,
    RI: Copy,
{
    match cat {
        0 => tier8.push(value.as_(), local),
        1 => tier16.push(value.as_(), local),
        _ => tier32.push(value.as_(), local),
    }
}

fn classify_row<V>(values: &[V], row: usize) -> Result<u8, MatrixError>
where
    V: MatrixValue + AsPrimitive<u64>,
{
    let mut max = 0_u64;
    for value in values {
        check_non_negative(*value, row)?;
        max = max.max(value.as_());
    }
    Ok(categorize(max))
}

fn check_non_negative<V: MatrixValue>(value: V, row: usize) -> Result<(), MatrixError> {
    if value < V::zero() {
        return Err(LayoutError::NegativeValue { row }.into());
    }
    Ok(())
}
