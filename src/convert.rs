//! Submodule providing conversions between matrix representations.

use std::sync::Arc;

use num_traits::AsPrimitive;

use crate::errors::{LayoutError, MatrixError};
use crate::impls::compressed::CompressedSparseMatrix;
use crate::impls::dense::DenseMatrix;
use crate::impls::fragmented::FragmentedSparseMatrix;
use crate::impls::oracles::{consecutive_dense, consecutive_sparse};
use crate::parallel::{partition, run_partitioned};
use crate::traits::extractor::{Options, Subset};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue, StoredIndex, TryFromUsize, index_from_usize};

fn stored_index_from<SI: TryFromUsize>(x: usize) -> SI {
    SI::try_from_usize(x).unwrap_or_else(|_| {
        unreachable!("the conversion target is in an illegal state where an index does not fit its stored type")
    })
}

/// Carves `slice` into consecutive pieces of the given lengths.
fn carve<'a, T>(mut slice: &'a mut [T], lengths: &[usize]) -> Vec<&'a mut [T]> {
    let mut parts = Vec::with_capacity(lengths.len());
    for &length in lengths {
        let (head, tail) = slice.split_at_mut(length);
        parts.push(head);
        slice = tail;
    }
    parts
}

/// Counts the structural non-zeros of every row (or column) of a matrix.
///
/// For sparse matrices every stored entry is counted, even those holding an
/// actual zero; for dense matrices only non-zero values count.
///
/// # Errors
///
/// Fails with [`MatrixError::InvalidArgument`] when `output` does not match
/// the target extent, and propagates extractor-factory failures.
pub fn count_compressed_sparse_non_zeros<V, I>(
    matrix: &dyn Matrix<V, I>,
    by_row: bool,
    output: &mut [usize],
    threads: usize,
) -> Result<(), MatrixError>
where
    V: MatrixValue,
    I: MatrixIndex,
{
    let primary = matrix.extent(by_row).as_();
    let secondary = matrix.extent(!by_row).as_();
    if output.len() != primary {
        return Err(LayoutError::PointerCountMismatch { expected: primary, found: output.len() }
            .into());
    }
    output.fill(0);

    if by_row == matrix.prefer_rows() {
        let ranges = partition(primary, threads.max(1));
        let lengths: Vec<usize> = ranges.iter().map(|&(_, length)| length).collect();
        let parts: Vec<_> =
            ranges.iter().map(|&(start, _)| start).zip(carve(output, &lengths)).collect();
        run_partitioned(parts, |_, (start, counts)| {
            if matrix.is_sparse() {
                let options = Options {
                    extract_value: false,
                    extract_index: false,
                    ordered_index: false,
                };
                let mut work = consecutive_sparse(
                    matrix,
                    by_row,
                    start,
                    counts.len(),
                    Subset::Full,
                    &options,
                )?;
                for slot in counts.iter_mut() {
                    *slot = work.fetch(&mut [], &mut []).number;
                }
            } else {
                let mut buffer = vec![V::zero(); secondary];
                let mut work = consecutive_dense(
                    matrix,
                    by_row,
                    start,
                    counts.len(),
                    Subset::Full,
                    &Options::default(),
                )?;
                for slot in counts.iter_mut() {
                    let fetched = work.fetch(&mut buffer);
                    *slot = fetched.iter().filter(|x| !x.is_zero()).count();
                }
            }
            Ok(())
        })?;
    } else {
        // The matrix iterates faster the other way, so scan that way and
        // tally per-worker before summing.
        let ranges = partition(secondary, threads.max(1));
        let tallies = run_partitioned(ranges, |_, (start, length)| {
            let mut counts = vec![0_usize; primary];
            if matrix.is_sparse() {
                let options =
                    Options { extract_value: false, extract_index: true, ordered_index: false };
                let mut work =
                    consecutive_sparse(matrix, !by_row, start, length, Subset::Full, &options)?;
                let mut indices = vec![I::ZERO; primary];
                for _ in 0..length {
                    let range = work.fetch(&mut [], &mut indices);
                    for idx in range.index.unwrap_or(&[]) {
                        counts[idx.as_()] += 1;
                    }
                }
            } else {
                let mut buffer = vec![V::zero(); primary];
                let mut work = consecutive_dense(
                    matrix,
                    !by_row,
                    start,
                    length,
                    Subset::Full,
                    &Options::default(),
                )?;
                for _ in 0..length {
                    let fetched = work.fetch(&mut buffer);
                    for (p, value) in fetched.iter().enumerate() {
                        counts[p] += usize::from(!value.is_zero());
                    }
                }
            }
            Ok(counts)
        })?;
        for tally in tallies {
            for (slot, count) in output.iter_mut().zip(tally) {
                *slot += count;
            }
        }
    }
    Ok(())
}

/// Fills pre-allocated compressed-sparse arrays from a matrix, given the
/// cumulative pointers produced from [`count_compressed_sparse_non_zeros`].
///
/// # Errors
///
/// Fails with [`MatrixError::InvalidArgument`] when `pointers` does not match
/// the target extent, and propagates extractor-factory failures.
pub fn fill_compressed_sparse_contents<V, I, SV, SI>(
    matrix: &dyn Matrix<V, I>,
    by_row: bool,
    pointers: &[usize],
    output_values: &mut [SV],
    output_indices: &mut [SI],
    threads: usize,
) -> Result<(), MatrixError>
where
    V: MatrixValue + AsPrimitive<SV>,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static,
    SI: StoredIndex + TryFromUsize,
{
    let primary = matrix.extent(by_row).as_();
    let secondary = matrix.extent(!by_row).as_();
    if pointers.len() != primary + 1 {
        return Err(LayoutError::PointerCountMismatch {
            expected: primary + 1,
            found: pointers.len(),
        }
        .into());
    }

    let ranges = partition(primary, threads.max(1));
    let spans: Vec<usize> = ranges
        .iter()
        .map(|&(start, length)| pointers[start + length] - pointers[start])
        .collect();
    let value_parts = carve(output_values, &spans);
    let index_parts = carve(output_indices, &spans);
    let parts: Vec<_> = ranges.iter().copied().zip(value_parts.into_iter().zip(index_parts)).collect();

    let consistent = by_row == matrix.prefer_rows();
    run_partitioned(parts, |_, ((start, length), (vpart, ipart))| {
        let base = pointers[start];
        if consistent {
            if matrix.is_sparse() {
                let options = Options { ordered_index: false, ..Options::default() };
                let mut work =
                    consecutive_sparse(matrix, by_row, start, length, Subset::Full, &options)?;
                let mut vbuf = vec![V::zero(); secondary];
                let mut ibuf = vec![I::ZERO; secondary];
                for p in start..start + length {
                    // Fetch into full-width scratch first: the output spans
                    // only hold this range's non-zeros, while the extractor
                    // may use the whole non-target extent.
                    let range = work.fetch(&mut vbuf, &mut ibuf);
                    let offset = pointers[p] - base;
                    let fetched_values = range.value.unwrap_or(&[]);
                    let fetched_indices = range.index.unwrap_or(&[]);
                    for k in 0..range.number {
                        vpart[offset + k] = fetched_values[k].as_();
                        ipart[offset + k] = stored_index_from(fetched_indices[k].as_());
                    }
                }
            } else {
                let mut buffer = vec![V::zero(); secondary];
                let mut work = consecutive_dense(
                    matrix,
                    by_row,
                    start,
                    length,
                    Subset::Full,
                    &Options::default(),
                )?;
                for p in start..start + length {
                    let fetched = work.fetch(&mut buffer);
                    let mut offset = pointers[p] - base;
                    for (s, value) in fetched.iter().enumerate() {
                        if !value.is_zero() {
                            vpart[offset] = value.as_();
                            ipart[offset] = stored_index_from(s);
                            offset += 1;
                        }
                    }
                }
            }
        } else {
            let subset = Subset::Block {
                start: index_from_usize::<I>(start),
                length: index_from_usize::<I>(length),
            };
            let mut cursors: Vec<usize> =
                pointers[start..start + length].iter().map(|p| p - base).collect();
            if matrix.is_sparse() {
                let options = Options { ordered_index: false, ..Options::default() };
                let mut work =
                    consecutive_sparse(matrix, !by_row, 0, secondary, subset, &options)?;
                let mut vbuf = vec![V::zero(); length];
                let mut ibuf = vec![I::ZERO; length];
                for s in 0..secondary {
                    let range = work.fetch(&mut vbuf, &mut ibuf);
                    let fetched_values = range.value.unwrap_or(&[]);
                    let fetched_indices = range.index.unwrap_or(&[]);
                    for k in 0..range.number {
                        let cursor = &mut cursors[fetched_indices[k].as_() - start];
                        vpart[*cursor] = fetched_values[k].as_();
                        ipart[*cursor] = stored_index_from(s);
                        *cursor += 1;
                    }
                }
            } else {
                let mut buffer = vec![V::zero(); length];
                let mut work = consecutive_dense(
                    matrix,
                    !by_row,
                    0,
                    secondary,
                    subset,
                    &Options::default(),
                )?;
                for s in 0..secondary {
                    let fetched = work.fetch(&mut buffer);
                    for (k, value) in fetched.iter().enumerate() {
                        if !value.is_zero() {
                            let cursor = &mut cursors[k];
                            vpart[*cursor] = value.as_();
                            ipart[*cursor] = stored_index_from(s);
                            *cursor += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    })?;
    Ok(())
}

/// Compressed-sparse arrays produced by
/// [`retrieve_compressed_sparse_contents`].
#[derive(Clone, Debug)]
pub struct CompressedSparseContents<SV, SI> {
    /// Values of the structural non-zeros.
    pub value: Vec<SV>,
    /// Secondary indices of the structural non-zeros.
    pub index: Vec<SI>,
    /// Cumulative offsets, one per primary element plus one.
    pub pointers: Vec<usize>,
}

/// Extracts the full contents of a matrix in compressed sparse form.
///
/// With `two_pass` the matrix is scanned once to size the output and once to
/// fill it, which is memory-optimal; otherwise a fragmented retrieval is
/// concatenated, trading transient memory for a single scan.
///
/// # Errors
///
/// Propagates extractor-factory failures.
pub fn retrieve_compressed_sparse_contents<V, I, SV, SI>(
    matrix: &dyn Matrix<V, I>,
    by_row: bool,
    two_pass: bool,
    threads: usize,
) -> Result<CompressedSparseContents<SV, SI>, MatrixError>
where
    V: MatrixValue + AsPrimitive<SV>,
    I: MatrixIndex,
    SV: Copy + Send + Sync + 'static + num_traits::Zero,
    SI: StoredIndex + TryFromUsize,
{
    let primary = matrix.extent(by_row).as_();
    let mut pointers = vec![0_usize; primary + 1];

    if !two_pass {
        let fragmented = retrieve_fragmented_sparse_contents::<V, I>(matrix, by_row, threads)?;
        for (p, fragment) in fragmented.values.iter().enumerate() {
            pointers[p + 1] = pointers[p] + fragment.len();
        }
        let total = pointers[primary];
        let mut value = Vec::with_capacity(total);
        let mut index = Vec::with_capacity(total);
        for (fragment_values, fragment_indices) in
            fragmented.values.into_iter().zip(fragmented.indices)
        {
            value.extend(fragment_values.into_iter().map(|x| AsPrimitive::<SV>::as_(x)));
            index.extend(fragment_indices.into_iter().map(|x| stored_index_from::<SI>(x.as_())));
        }
        return Ok(CompressedSparseContents { value, index, pointers });
    }

    count_compressed_sparse_non_zeros(matrix, by_row, &mut pointers[1..], threads)?;
    for p in 1..=primary {
        pointers[p] += pointers[p - 1];
    }
    let total = pointers[primary];
    let mut value = vec![SV::zero(); total];
    let mut index = vec![stored_index_from::<SI>(0); total];
    fill_compressed_sparse_contents(matrix, by_row, &pointers, &mut value, &mut index, threads)?;
    Ok(CompressedSparseContents { value, index, pointers })
}

/// Fragmented per-primary arrays produced by
/// [`retrieve_fragmented_sparse_contents`].
#[derive(Clone, Debug)]
pub struct FragmentedSparseContents<V, I> {
    /// One value fragment per primary element.
    pub values: Vec<Vec<V>>,
    /// One index fragment per primary element, strictly increasing.
    pub indices: Vec<Vec<I>>,
}

/// Extracts the full contents of a matrix as one fragment per row (or
/// column).
///
/// # Errors
///
/// Propagates extractor-factory failures.
pub fn retrieve_fragmented_sparse_contents<V, I>(
    matrix: &dyn Matrix<V, I>,
    by_row: bool,
    threads: usize,
) -> Result<FragmentedSparseContents<V, I>, MatrixError>
where
    V: MatrixValue,
    I: MatrixIndex,
{
    let primary = matrix.extent(by_row).as_();
    let secondary = matrix.extent(!by_row).as_();
    let mut values: Vec<Vec<V>> = vec![Vec::new(); primary];
    let mut indices: Vec<Vec<I>> = vec![Vec::new(); primary];

    let ranges = partition(primary, threads.max(1));
    let lengths: Vec<usize> = ranges.iter().map(|&(_, length)| length).collect();
    let value_parts = carve(&mut values, &lengths);
    let index_parts = carve(&mut indices, &lengths);
    let parts: Vec<_> = ranges.iter().copied().zip(value_parts.into_iter().zip(index_parts)).collect();

    let consistent = by_row == matrix.prefer_rows();
    run_partitioned(parts, |_, ((start, length), (vpart, ipart))| {
        if consistent {
            if matrix.is_sparse() {
                let mut work = consecutive_sparse(
                    matrix,
                    by_row,
                    start,
                    length,
                    Subset::Full,
                    &Options::default(),
                )?;
                let mut vbuf = vec![V::zero(); secondary];
                let mut ibuf = vec![I::ZERO; secondary];
                for k in 0..length {
                    let range = work.fetch(&mut vbuf, &mut ibuf);
                    vpart[k] = range.value.unwrap_or(&[]).to_vec();
                    ipart[k] = range.index.unwrap_or(&[]).to_vec();
                }
            } else {
                let mut work = consecutive_dense(
                    matrix,
                    by_row,
                    start,
                    length,
                    Subset::Full,
                    &Options::default(),
                )?;
                let mut buffer = vec![V::zero(); secondary];
                for k in 0..length {
                    let fetched = work.fetch(&mut buffer);
                    for (s, value) in fetched.iter().enumerate() {
                        if !value.is_zero() {
                            vpart[k].push(*value);
                            ipart[k].push(index_from_usize(s));
                        }
                    }
                }
            }
        } else {
            let subset = Subset::Block {
                start: index_from_usize::<I>(start),
                length: index_from_usize::<I>(length),
            };
            if matrix.is_sparse() {
                let mut work = consecutive_sparse(
                    matrix,
                    !by_row,
                    0,
                    secondary,
                    subset,
                    &Options::default(),
                )?;
                let mut vbuf = vec![V::zero(); length];
                let mut ibuf = vec![I::ZERO; length];
                for s in 0..secondary {
                    let range = work.fetch(&mut vbuf, &mut ibuf);
                    let fetched_values = range.value.unwrap_or(&[]);
                    let fetched_indices = range.index.unwrap_or(&[]);
                    for k in 0..range.number {
                        let local = fetched_indices[k].as_() - start;
                        vpart[local].push(fetched_values[k]);
                        ipart[local].push(index_from_usize(s));
                    }
                }
            } else {
                let mut work = consecutive_dense(
                    matrix,
                    !by_row,
                    0,
                    secondary,
                    subset,
                    &Options::default(),
                )?;
                let mut buffer = vec![V::zero(); length];
                for s in 0..secondary {
                    let fetched = work.fetch(&mut buffer);
                    for (k, value) in fetched.iter().enumerate() {
                        if !value.is_zero() {
                            vpart[k].push(*value);
                            ipart[k].push(index_from_usize(s));
                        }
                    }
                }
            }
        }
        Ok(())
    })?;

    Ok(FragmentedSparseContents { values, indices })
}

/// Converts any matrix into a compressed sparse matrix oriented by `to_row`.
///
/// # Errors
///
/// Propagates extractor-factory failures.
pub fn convert_to_compressed_sparse<V, I>(
    matrix: &dyn Matrix<V, I>,
    to_row: bool,
    two_pass: bool,
    threads: usize,
) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue + AsPrimitive<V>,
    I: MatrixIndex,
{
    let contents =
        retrieve_compressed_sparse_contents::<V, I, V, I>(matrix, to_row, two_pass, threads)?;
    let nrow = matrix.nrow();
    let ncol = matrix.ncol();
    let converted = if to_row {
        CompressedSparseMatrix::<V, I, V, I, usize>::csr(
            nrow,
            ncol,
            contents.value,
            contents.index,
            contents.pointers,
            false,
        )?
    } else {
        CompressedSparseMatrix::<V, I, V, I, usize>::csc(
            nrow,
            ncol,
            contents.value,
            contents.index,
            contents.pointers,
            false,
        )?
    };
    Ok(Arc::new(converted))
}

/// Converts any matrix into a fragmented sparse matrix oriented by `to_row`.
///
/// # Errors
///
/// Propagates extractor-factory failures.
pub fn convert_to_fragmented_sparse<V, I>(
    matrix: &dyn Matrix<V, I>,
    to_row: bool,
    threads: usize,
) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue + AsPrimitive<V>,
    I: MatrixIndex,
{
    let contents = retrieve_fragmented_sparse_contents::<V, I>(matrix, to_row, threads)?;
    let nrow = matrix.nrow();
    let ncol = matrix.ncol();
    let converted = if to_row {
        FragmentedSparseMatrix::<V, I>::by_row(nrow, ncol, contents.values, contents.indices)?
    } else {
        FragmentedSparseMatrix::<V, I>::by_column(nrow, ncol, contents.values, contents.indices)?
    };
    Ok(Arc::new(converted))
}

/// Converts any matrix into a dense matrix, row-major when `to_row` is set.
///
/// # Errors
///
/// Propagates extractor-factory failures.
pub fn convert_to_dense<V, I>(
    matrix: &dyn Matrix<V, I>,
    to_row: bool,
    threads: usize,
) -> Result<SharedMatrix<V, I>, MatrixError>
where
    V: MatrixValue,
    I: MatrixIndex,
{
    let major = matrix.extent(to_row).as_();
    let minor = matrix.extent(!to_row).as_();
    let mut values = vec![V::zero(); major * minor];

    let ranges = partition(major, threads.max(1));
    let spans: Vec<usize> = ranges.iter().map(|&(_, length)| length * minor).collect();
    let parts: Vec<_> = ranges.iter().copied().zip(carve(&mut values, &spans)).collect();
    run_partitioned(parts, |_, ((start, length), chunk)| {
        let mut work =
            consecutive_dense(matrix, to_row, start, length, Subset::Full, &Options::default())?;
        let mut scratch = vec![V::zero(); minor];
        for slot in chunk.chunks_mut(minor).take(length) {
            let fetched = work.fetch(&mut scratch);
            slot.copy_from_slice(fetched);
        }
        Ok(())
    })?;

    let nrow = matrix.nrow();
    let ncol = matrix.ncol();
    let converted = if to_row {
        DenseMatrix::new_row_major(nrow, ncol, values)?
    } else {
        DenseMatrix::new_column_major(nrow, ncol, values)?
    };
    Ok(Arc::new(converted))
}
