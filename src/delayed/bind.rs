//! Submodule providing delayed combining of matrices along one dimension.

use std::sync::Arc;

use crate::errors::{LayoutError, MatrixError};
use crate::impls::dense::DenseMatrix;
use crate::impls::oracles::{ConsecutiveOracle, FixedVectorOracle, ReplayDenseExtractor, ReplaySparseExtractor};
use crate::traits::extractor::{
    DenseExtractor, Options, OracularDenseExtractor, OracularSparseExtractor, SparseExtractor,
    SparseRange, Subset,
};
use crate::traits::matrix::{Matrix, SharedMatrix};
use crate::traits::numeric::{MatrixIndex, MatrixValue, index_from_usize};
use crate::traits::oracle::{Oracle, SharedOracle};

/// Delayed combining of matrices by row or by column.
///
/// Requests along the bound dimension route to the one child owning the
/// target index; requests along the other dimension query every child and
/// concatenate, shifting sparse indices by each child's cumulative offset.
/// Children contributing no rows or columns are dropped at construction.
pub struct DelayedBind<V, I> {
    children: Vec<SharedMatrix<V, I>>,
    by_row: bool,
    otherdim: I,
    cumulative: Vec<usize>,
    mapping: Vec<usize>,
    sparse_proportion: f64,
    by_row_proportion: f64,
    uses_oracle: [bool; 2],
}

impl<V: MatrixValue, I: MatrixIndex> DelayedBind<V, I> {
    /// Combines the given matrices along the rows (`by_row`) or columns.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::InvalidArgument`] when the children disagree
    /// on the non-bound extent, or the combined extent does not fit in `I`.
    pub fn new(children: Vec<SharedMatrix<V, I>>, by_row: bool) -> Result<Self, MatrixError> {
        let mut kept = Vec::with_capacity(children.len());
        let mut cumulative = vec![0_usize];
        let mut otherdim = I::ZERO;
        for (x, child) in children.into_iter().enumerate() {
            let (primary, secondary) = if by_row {
                (child.nrow(), child.ncol())
            } else {
                (child.ncol(), child.nrow())
            };
            if x == 0 {
                otherdim = secondary;
            } else if otherdim != secondary {
                return Err(LayoutError::DimensionMismatch {
                    by_row,
                    expected: otherdim.as_(),
                    found: secondary.as_(),
                }
                .into());
            }
            // Children without any primary extent contribute nothing; drop
            // them so extraction never pays for their overhead.
            if primary > I::ZERO {
                let total = cumulative.last().copied().unwrap_or(0) + primary.as_();
                cumulative.push(total);
                kept.push(child);
            }
        }

        let total = cumulative.last().copied().unwrap_or(0);
        if I::try_from_usize(total).is_err() {
            return Err(LayoutError::ExtentOverflow { extent: total }.into());
        }

        let mut mapping = Vec::with_capacity(total);
        for (x, window) in cumulative.windows(2).enumerate() {
            mapping.extend(std::iter::repeat_n(x, window[1] - window[0]));
        }

        let mut sparse_proportion = 0.0;
        let mut by_row_proportion = 0.0;
        let mut denominator = 0.0;
        for child in &kept {
            let weight = child.nrow().as_() as f64 * child.ncol().as_() as f64;
            denominator += weight;
            sparse_proportion += weight * child.is_sparse_proportion();
            by_row_proportion += weight * child.prefer_rows_proportion();
        }
        if denominator > 0.0 {
            sparse_proportion /= denominator;
            by_row_proportion /= denominator;
        }

        let mut uses_oracle = [false; 2];
        for (d, flag) in uses_oracle.iter_mut().enumerate() {
            *flag = kept.iter().any(|child| child.uses_oracle(d == 1));
        }

        Ok(Self {
            children: kept,
            by_row,
            otherdim,
            cumulative,
            mapping,
            sparse_proportion,
            by_row_proportion,
            uses_oracle,
        })
    }

    fn combined_extent(&self) -> usize {
        self.cumulative.last().copied().unwrap_or(0)
    }
}

/// Combines matrices along one dimension, returning the sole child unchanged
/// and turning an empty list into an empty matrix.
///
/// # Errors
///
/// As for [`DelayedBind::new`].
pub fn make_delayed_bind<V: MatrixValue, I: MatrixIndex>(
    children: Vec<SharedMatrix<V, I>>,
    by_row: bool,
) -> Result<SharedMatrix<V, I>, MatrixError> {
    match children.len() {
        0 => Ok(Arc::new(DenseMatrix::new_row_major(I::ZERO, I::ZERO, Vec::new())?)),
        1 => {
            let mut children = children;
            Ok(children.pop().unwrap_or_else(|| unreachable!()))
        }
        _ => Ok(Arc::new(DelayedBind::new(children, by_row)?)),
    }
}

/// Splits a contiguous block of the combined dimension into per-child
/// `(child, start, length)` pieces, in child order.
fn partition_block(
    cumulative: &[usize],
    mapping: &[usize],
    start: usize,
    length: usize,
) -> Vec<(usize, usize, usize)> {
    let mut parts = Vec::new();
    if length == 0 || mapping.is_empty() {
        return parts;
    }
    let first_child = mapping[start];
    let mut piece_start = start - cumulative[first_child];
    let block_end = start + length;
    for child in first_child..cumulative.len() - 1 {
        let child_end = cumulative[child + 1];
        let not_final = block_end > child_end;
        let piece_end = (if not_final { child_end } else { block_end }) - cumulative[child];
        parts.push((child, piece_start, piece_end - piece_start));
        if !not_final {
            break;
        }
        piece_start = 0;
    }
    parts
}

/// Splits an ascending index list over the combined dimension into
/// per-child child-local lists, in child order.
fn partition_index<I: MatrixIndex>(
    cumulative: &[usize],
    mapping: &[usize],
    indices: &[I],
) -> Vec<(usize, Vec<I>)> {
    let mut parts: Vec<(usize, Vec<I>)> = Vec::new();
    let mut counter = 0;
    while counter < indices.len() {
        let first = indices[counter].as_();
        let child = mapping[first];
        let lower = cumulative[child];
        let upper = cumulative[child + 1];
        let mut piece = vec![index_from_usize::<I>(first - lower)];
        counter += 1;
        while counter < indices.len() && indices[counter].as_() < upper {
            piece.push(index_from_usize(indices[counter].as_() - lower));
            counter += 1;
        }
        parts.push((child, piece));
    }
    parts
}

/// Per-child pieces of a subset over the combined dimension.
struct ParallelLayout<I> {
    /// `(child, subset, selected-count, cumulative-offset)` per piece.
    pieces: Vec<(usize, Subset<I>, usize, usize)>,
}

impl<V: MatrixValue, I: MatrixIndex> DelayedBind<V, I> {
    fn parallel_layout(&self, subset: &Subset<I>) -> ParallelLayout<I> {
        let pieces = match subset {
            Subset::Full => self
                .children
                .iter()
                .enumerate()
                .map(|(x, child)| {
                    let count = if self.by_row { child.nrow().as_() } else { child.ncol().as_() };
                    (x, Subset::Full, count, self.cumulative[x])
                })
                .collect(),
            Subset::Block { start, length } => {
                partition_block(&self.cumulative, &self.mapping, start.as_(), length.as_())
                    .into_iter()
                    .map(|(x, piece_start, piece_length)| {
                        let piece = Subset::Block {
                            start: index_from_usize(piece_start),
                            length: index_from_usize(piece_length),
                        };
                        (x, piece, piece_length, self.cumulative[x])
                    })
                    .collect()
            }
            Subset::Index(list) => {
                partition_index(&self.cumulative, &self.mapping, list)
                    .into_iter()
                    .map(|(x, piece)| {
                        let count = piece.len();
                        (x, Subset::Index(piece.into()), count, self.cumulative[x])
                    })
                    .collect()
            }
        };
        ParallelLayout { pieces }
    }
}

impl<V: MatrixValue, I: MatrixIndex> Matrix<V, I> for DelayedBind<V, I> {
    fn nrow(&self) -> I {
        if self.by_row { index_from_usize(self.combined_extent()) } else { self.otherdim }
    }

    fn ncol(&self) -> I {
        if self.by_row { self.otherdim } else { index_from_usize(self.combined_extent()) }
    }

    fn is_sparse_proportion(&self) -> f64 {
        self.sparse_proportion
    }

    fn prefer_rows_proportion(&self) -> f64 {
        self.by_row_proportion
    }

    fn uses_oracle(&self, row: bool) -> bool {
        self.uses_oracle[usize::from(row)]
    }

    fn dense<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn DenseExtractor<V, I> + 'a>, MatrixError> {
        if self.children.len() == 1 {
            return self.children[0].dense(row, subset, options);
        }
        if row == self.by_row {
            let mut extractors = Vec::with_capacity(self.children.len());
            for child in &self.children {
                extractors.push(child.dense(row, subset.clone(), options)?);
            }
            Ok(Box::new(PerpendicularDense {
                cumulative: &self.cumulative,
                mapping: &self.mapping,
                extractors,
            }))
        } else {
            subset.validate(self.extent(!row))?;
            let layout = self.parallel_layout(&subset);
            let mut extractors = Vec::with_capacity(layout.pieces.len());
            let mut counts = Vec::with_capacity(layout.pieces.len());
            let mut scratch = 0;
            for (x, piece, count, _) in layout.pieces {
                extractors.push(self.children[x].dense(row, piece, options)?);
                scratch = scratch.max(count);
                counts.push(count);
            }
            Ok(Box::new(ParallelDense { extractors, counts, scratch: vec![V::zero(); scratch] }))
        }
    }

    fn sparse<'a>(
        &'a self,
        row: bool,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn SparseExtractor<V, I> + 'a>, MatrixError> {
        if self.children.len() == 1 {
            return self.children[0].sparse(row, subset, options);
        }
        if row == self.by_row {
            let mut extractors = Vec::with_capacity(self.children.len());
            for child in &self.children {
                extractors.push(child.sparse(row, subset.clone(), options)?);
            }
            Ok(Box::new(PerpendicularSparse {
                cumulative: &self.cumulative,
                mapping: &self.mapping,
                extractors,
            }))
        } else {
            subset.validate(self.extent(!row))?;
            let layout = self.parallel_layout(&subset);
            let mut extractors = Vec::with_capacity(layout.pieces.len());
            let mut offsets = Vec::with_capacity(layout.pieces.len());
            let mut scratch = 0;
            for (x, piece, count, offset) in layout.pieces {
                extractors.push(self.children[x].sparse(row, piece, options)?);
                scratch = scratch.max(count);
                offsets.push(offset);
            }
            Ok(Box::new(ParallelSparse {
                extractors,
                offsets,
                vscratch: vec![V::zero(); scratch],
                iscratch: vec![I::ZERO; scratch],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        }
    }

    fn dense_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularDenseExtractor<V, I> + 'a>, MatrixError> {
        if self.children.len() == 1 {
            return self.children[0].dense_with_oracle(row, oracle, subset, options);
        }
        if !self.uses_oracle(row) {
            return Ok(Box::new(ReplayDenseExtractor::new(oracle, self.dense(row, subset, options)?)));
        }
        if row == self.by_row {
            let plan = segment_predictions(&self.cumulative, &self.mapping, oracle.as_ref());
            let mut extractors: Vec<Option<Box<dyn OracularDenseExtractor<V, I> + 'a>>> =
                (0..self.children.len()).map(|_| None).collect();
            for (x, suboracle) in plan.suboracles.into_iter().enumerate() {
                if let Some(suboracle) = suboracle {
                    extractors[x] = Some(self.children[x].dense_with_oracle(
                        row,
                        suboracle,
                        subset.clone(),
                        options,
                    )?);
                }
            }
            Ok(Box::new(PerpendicularOracularDense {
                segments: plan.segments,
                extractors,
                used: 0,
            }))
        } else {
            subset.validate(self.extent(!row))?;
            let layout = self.parallel_layout(&subset);
            let mut extractors = Vec::with_capacity(layout.pieces.len());
            let mut counts = Vec::with_capacity(layout.pieces.len());
            let mut scratch = 0;
            for (x, piece, count, _) in layout.pieces {
                extractors.push(self.children[x].dense_with_oracle(
                    row,
                    oracle.clone(),
                    piece,
                    options,
                )?);
                scratch = scratch.max(count);
                counts.push(count);
            }
            Ok(Box::new(ParallelOracularDense {
                extractors,
                counts,
                scratch: vec![V::zero(); scratch],
            }))
        }
    }

    fn sparse_with_oracle<'a>(
        &'a self,
        row: bool,
        oracle: SharedOracle<I>,
        subset: Subset<I>,
        options: &Options,
    ) -> Result<Box<dyn OracularSparseExtractor<V, I> + 'a>, MatrixError> {
        if self.children.len() == 1 {
            return self.children[0].sparse_with_oracle(row, oracle, subset, options);
        }
        if !self.uses_oracle(row) {
            return Ok(Box::new(ReplaySparseExtractor::new(oracle, self.sparse(row, subset, options)?)));
        }
        if row == self.by_row {
            let plan = segment_predictions(&self.cumulative, &self.mapping, oracle.as_ref());
            let mut extractors: Vec<Option<Box<dyn OracularSparseExtractor<V, I> + 'a>>> =
                (0..self.children.len()).map(|_| None).collect();
            for (x, suboracle) in plan.suboracles.into_iter().enumerate() {
                if let Some(suboracle) = suboracle {
                    extractors[x] = Some(self.children[x].sparse_with_oracle(
                        row,
                        suboracle,
                        subset.clone(),
                        options,
                    )?);
                }
            }
            Ok(Box::new(PerpendicularOracularSparse {
                segments: plan.segments,
                extractors,
                used: 0,
            }))
        } else {
            subset.validate(self.extent(!row))?;
            let layout = self.parallel_layout(&subset);
            let mut extractors = Vec::with_capacity(layout.pieces.len());
            let mut offsets = Vec::with_capacity(layout.pieces.len());
            let mut scratch = 0;
            for (x, piece, count, offset) in layout.pieces {
                extractors.push(self.children[x].sparse_with_oracle(
                    row,
                    oracle.clone(),
                    piece,
                    options,
                )?);
                scratch = scratch.max(count);
                offsets.push(offset);
            }
            Ok(Box::new(ParallelOracularSparse {
                extractors,
                offsets,
                vscratch: vec![V::zero(); scratch],
                iscratch: vec![I::ZERO; scratch],
                needs_value: options.extract_value,
                needs_index: options.extract_index,
            }))
        }
    }
}

/// Routing plan for perpendicular oracle-aware extraction.
struct SegmentPlan<I> {
    /// Child chosen by each prediction, in prediction order.
    segments: Vec<usize>,
    /// Child-local oracle per child, absent when a child is never predicted.
    suboracles: Vec<Option<SharedOracle<I>>>,
}

/// Splits a parent oracle into per-child oracles: a consecutive run when the
/// child's predictions are contiguous, an explicit list otherwise.
fn segment_predictions<I: MatrixIndex>(
    cumulative: &[usize],
    mapping: &[usize],
    oracle: &dyn Oracle<I>,
) -> SegmentPlan<I> {
    struct Gathered<I> {
        consecutive: bool,
        start: usize,
        number: usize,
        list: Vec<I>,
    }

    impl<I: MatrixIndex> Gathered<I> {
        fn add(&mut self, p: usize) {
            if self.consecutive {
                if self.number == 0 {
                    self.start = p;
                    self.number = 1;
                    return;
                }
                if self.start + self.number == p {
                    self.number += 1;
                    return;
                }
                self.consecutive = false;
                self.list = (self.start..self.start + self.number).map(index_from_usize).collect();
            }
            self.list.push(index_from_usize(p));
        }
    }

    let nchildren = cumulative.len() - 1;
    let mut gathered: Vec<Gathered<I>> = (0..nchildren)
        .map(|_| Gathered { consecutive: true, start: 0, number: 0, list: Vec::new() })
        .collect();

    let total = oracle.total();
    let mut segments = Vec::with_capacity(total);
    for i in 0..total {
        let prediction = oracle.get(i).as_();
        let choice = mapping[prediction];
        segments.push(choice);
        gathered[choice].add(prediction - cumulative[choice]);
    }

    let suboracles = gathered
        .into_iter()
        .map(|g| -> Option<SharedOracle<I>> {
            if g.consecutive {
                if g.number > 0 {
                    Some(Arc::new(ConsecutiveOracle::new(index_from_usize(g.start), g.number)))
                } else {
                    None
                }
            } else {
                Some(Arc::new(FixedVectorOracle::new(g.list)))
            }
        })
        .collect();

    SegmentPlan { segments, suboracles }
}

/// Dense extraction along the bound dimension: route to the owning child.
struct PerpendicularDense<'a, V, I> {
    cumulative: &'a [usize],
    mapping: &'a [usize],
    extractors: Vec<Box<dyn DenseExtractor<V, I> + 'a>>,
}

impl<V, I: MatrixIndex> DenseExtractor<V, I> for PerpendicularDense<'_, V, I> {
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let chosen = self.mapping[i.as_()];
        let local = index_from_usize(i.as_() - self.cumulative[chosen]);
        self.extractors[chosen].fetch(local, buffer)
    }
}

/// Sparse extraction along the bound dimension: route to the owning child.
struct PerpendicularSparse<'a, V, I> {
    cumulative: &'a [usize],
    mapping: &'a [usize],
    extractors: Vec<Box<dyn SparseExtractor<V, I> + 'a>>,
}

impl<V, I: MatrixIndex> SparseExtractor<V, I> for PerpendicularSparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let chosen = self.mapping[i.as_()];
        let local = index_from_usize(i.as_() - self.cumulative[chosen]);
        self.extractors[chosen].fetch(local, values, indices)
    }
}

/// Dense extraction along the other dimension: concatenate child slices.
struct ParallelDense<'a, V, I> {
    extractors: Vec<Box<dyn DenseExtractor<V, I> + 'a>>,
    counts: Vec<usize>,
    scratch: Vec<V>,
}

impl<V: MatrixValue, I: MatrixIndex> DenseExtractor<V, I> for ParallelDense<'_, V, I> {
    fn fetch<'s>(&'s mut self, i: I, buffer: &'s mut [V]) -> &'s [V] {
        let mut offset = 0;
        for (extractor, &count) in self.extractors.iter_mut().zip(&self.counts) {
            let part = extractor.fetch(i, &mut self.scratch[..count]);
            buffer[offset..offset + count].copy_from_slice(part);
            offset += count;
        }
        &buffer[..offset]
    }
}

/// Sparse extraction along the other dimension: concatenate child ranges,
/// shifting indices by each child's cumulative offset.
struct ParallelSparse<'a, V, I> {
    extractors: Vec<Box<dyn SparseExtractor<V, I> + 'a>>,
    offsets: Vec<usize>,
    vscratch: Vec<V>,
    iscratch: Vec<I>,
    needs_value: bool,
    needs_index: bool,
}

fn append_shifted<V: Copy, I: MatrixIndex>(
    range: &SparseRange<'_, V, I>,
    offset: usize,
    n: usize,
    values: &mut [V],
    indices: &mut [I],
    needs_value: bool,
    needs_index: bool,
) -> usize {
    let number = range.number;
    if needs_value {
        values[n..n + number].copy_from_slice(&range.value.unwrap_or(&[])[..number]);
    }
    if needs_index {
        for (k, idx) in range.index.unwrap_or(&[]).iter().enumerate() {
            indices[n + k] = index_from_usize(idx.as_() + offset);
        }
    }
    n + number
}

impl<V: MatrixValue, I: MatrixIndex> SparseExtractor<V, I> for ParallelSparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        i: I,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { extractors, offsets, vscratch, iscratch, needs_value, needs_index } = self;
        let mut n = 0;
        for (extractor, &offset) in extractors.iter_mut().zip(offsets.iter()) {
            let range = extractor.fetch(i, vscratch, iscratch);
            n = append_shifted(&range, offset, n, values, indices, *needs_value, *needs_index);
        }
        SparseRange {
            number: n,
            value: if *needs_value { Some(&values[..n]) } else { None },
            index: if *needs_index { Some(&indices[..n]) } else { None },
        }
    }
}

/// Oracle-aware flavor of [`PerpendicularDense`].
struct PerpendicularOracularDense<'a, V, I> {
    segments: Vec<usize>,
    extractors: Vec<Option<Box<dyn OracularDenseExtractor<V, I> + 'a>>>,
    used: usize,
}

impl<V, I> OracularDenseExtractor<V, I> for PerpendicularOracularDense<'_, V, I> {
    fn fetch<'s>(&'s mut self, buffer: &'s mut [V]) -> &'s [V] {
        let chosen = self.segments[self.used];
        self.used += 1;
        match self.extractors[chosen].as_mut() {
            Some(extractor) => extractor.fetch(buffer),
            None => unreachable!("predictions routed to a child without an extractor"),
        }
    }
}

/// Oracle-aware flavor of [`PerpendicularSparse`].
struct PerpendicularOracularSparse<'a, V, I> {
    segments: Vec<usize>,
    extractors: Vec<Option<Box<dyn OracularSparseExtractor<V, I> + 'a>>>,
    used: usize,
}

impl<V, I> OracularSparseExtractor<V, I> for PerpendicularOracularSparse<'_, V, I> {
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let chosen = self.segments[self.used];
        self.used += 1;
        match self.extractors[chosen].as_mut() {
            Some(extractor) => extractor.fetch(values, indices),
            None => unreachable!("predictions routed to a child without an extractor"),
        }
    }
}

/// Oracle-aware flavor of [`ParallelDense`]; children share the parent
/// oracle and advance in lockstep.
struct ParallelOracularDense<'a, V, I> {
    extractors: Vec<Box<dyn OracularDenseExtractor<V, I> + 'a>>,
    counts: Vec<usize>,
    scratch: Vec<V>,
}

impl<V: MatrixValue, I: MatrixIndex> OracularDenseExtractor<V, I>
    for ParallelOracularDense<'_, V, I>
{
    fn fetch<'s>(&'s mut self, buffer: &'s mut [V]) -> &'s [V] {
        let mut offset = 0;
        for (extractor, &count) in self.extractors.iter_mut().zip(&self.counts) {
            let part = extractor.fetch(&mut self.scratch[..count]);
            buffer[offset..offset + count].copy_from_slice(part);
            offset += count;
        }
        &buffer[..offset]
    }
}

/// Oracle-aware flavor of [`ParallelSparse`].
struct ParallelOracularSparse<'a, V, I> {
    extractors: Vec<Box<dyn OracularSparseExtractor<V, I> + 'a>>,
    offsets: Vec<usize>,
    vscratch: Vec<V>,
    iscratch: Vec<I>,
    needs_value: bool,
    needs_index: bool,
}

impl<V: MatrixValue, I: MatrixIndex> OracularSparseExtractor<V, I>
    for ParallelOracularSparse<'_, V, I>
{
    fn fetch<'s>(
        &'s mut self,
        values: &'s mut [V],
        indices: &'s mut [I],
    ) -> SparseRange<'s, V, I> {
        let Self { extractors, offsets, vscratch, iscratch, needs_value, needs_index } = self;
        let mut n = 0;
        for (extractor, &offset) in extractors.iter_mut().zip(offsets.iter()) {
            let range = extractor.fetch(vscratch, iscratch);
            n = append_shifted(&range, offset, n, values, indices, *needs_value, *needs_index);
        }
        SparseRange {
            number: n,
            value: if *needs_value { Some(&values[..n]) } else { None },
            index: if *needs_index { Some(&indices[..n]) } else { None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_block() {
        let cumulative = [0_usize, 3, 5, 9];
        let mapping = [0, 0, 0, 1, 1, 2, 2, 2, 2];
        assert_eq!(partition_block(&cumulative, &mapping, 0, 9), vec![(0, 0, 3), (1, 0, 2), (2, 0, 4)]);
        assert_eq!(partition_block(&cumulative, &mapping, 1, 3), vec![(0, 1, 2), (1, 0, 1)]);
        assert_eq!(partition_block(&cumulative, &mapping, 3, 2), vec![(1, 0, 2)]);
        assert_eq!(partition_block(&cumulative, &mapping, 6, 3), vec![(2, 1, 3)]);
        assert!(partition_block(&cumulative, &mapping, 4, 0).is_empty());
    }

    #[test]
    fn test_partition_index() {
        let cumulative = [0_usize, 3, 5, 9];
        let mapping = [0, 0, 0, 1, 1, 2, 2, 2, 2];
        let parts = partition_index(&cumulative, &mapping, &[0_u32, 2, 3, 7, 8]);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], (0, vec![0, 2]));
        assert_eq!(parts[1], (1, vec![0]));
        assert_eq!(parts[2], (2, vec![2, 3]));
    }

    #[test]
    fn test_segment_predictions() {
        let cumulative = [0_usize, 5, 10];
        let mapping: Vec<usize> = (0..10).map(|i| usize::from(i >= 5)).collect();
        let oracle = FixedVectorOracle::new(vec![0_u32, 1, 2, 5, 6, 7, 3, 8]);
        let plan = segment_predictions(&cumulative, &mapping, &oracle);
        assert_eq!(plan.segments, vec![0, 0, 0, 1, 1, 1, 0, 1]);

        // Child 0 sees 0, 1, 2, 3 (scattered after the jump back), child 1
        // sees 0, 1, 2, 3 in prediction order.
        let first = plan.suboracles[0].as_ref().unwrap();
        let collected: Vec<u32> = (0..first.total()).map(|i| first.get(i)).collect();
        assert_eq!(collected, vec![0, 1, 2, 3]);
        let second = plan.suboracles[1].as_ref().unwrap();
        let collected: Vec<u32> = (0..second.total()).map(|i| second.get(i)).collect();
        assert_eq!(collected, vec![0, 1, 2, 3]);
    }
}
