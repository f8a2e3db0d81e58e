//! Submodule providing in-place compression of sparse triplet data.

use crate::errors::{LayoutError, MatrixError};
use crate::traits::numeric::StoredIndex;

/// Sorts triplet data in place by `(primary, secondary)` and returns the
/// pointer array of the resulting compressed layout.
///
/// The three arrays describe one non-zero element per position. On return
/// they are reordered so that primary indices are grouped and secondary
/// indices increase within each group, and the returned vector holds
/// `num_primary + 1` cumulative offsets into them. The reordering is done
/// through a cycle walk over the sorted permutation, so no second copy of
/// the data is made.
///
/// # Errors
///
/// Fails with [`MatrixError::InvalidArgument`] when the arrays differ in
/// length or a primary index is out of bounds.
pub fn compress_sparse_triplets<V, PI, SI>(
    num_primary: usize,
    values: &mut [V],
    primary: &mut [PI],
    secondary: &mut [SI],
) -> Result<Vec<usize>, MatrixError>
where
    V: Copy,
    PI: StoredIndex,
    SI: StoredIndex,
{
    let n = values.len();
    if primary.len() != n || secondary.len() != n {
        return Err(LayoutError::TripletLengthMismatch {
            values: n,
            primary: primary.len(),
            secondary: secondary.len(),
        }
        .into());
    }
    for (position, p) in primary.iter().enumerate() {
        if p.as_() >= num_primary {
            return Err(LayoutError::IndexOutOfBounds {
                primary: position,
                index: p.as_(),
                extent: num_primary,
            }
            .into());
        }
    }

    let mut order: Vec<usize> = (0..n).collect();

    // Sorting the permutation rather than the data itself. Mostly-compressed
    // input is common, so an already-grouped primary array only pays for
    // per-group sorts of the secondary indices that actually need it.
    if primary.is_sorted() {
        let mut start = 0;
        while start < n {
            let mut end = start + 1;
            while end < n && primary[end] == primary[start] {
                end += 1;
            }
            if !secondary[start..end].is_sorted() {
                order[start..end].sort_unstable_by_key(|&x| secondary[x]);
            }
            start = end;
        }
    } else {
        order.sort_unstable_by_key(|&x| (primary[x], secondary[x]));
    }

    // Applying the permutation in place, one rotation cycle at a time.
    const DONE: usize = usize::MAX;
    for i in 0..n {
        if order[i] == DONE {
            continue;
        }
        let mut current = i;
        let mut replacement = order[i];
        order[i] = DONE;
        while replacement != i {
            values.swap(current, replacement);
            primary.swap(current, replacement);
            secondary.swap(current, replacement);
            current = replacement;
            let next = order[replacement];
            order[replacement] = DONE;
            replacement = next;
        }
    }

    // Collating the counts into cumulative pointers.
    let mut pointers = vec![0_usize; num_primary + 1];
    for p in primary.iter() {
        pointers[p.as_() + 1] += 1;
    }
    for i in 1..pointers.len() {
        pointers[i] += pointers[i - 1];
    }
    Ok(pointers)
}
