//! Submodule providing row classification and permutation synthesis for the
//! layered pipeline.

use crate::traits::matrix::SharedMatrix;

/// A layered matrix together with the row permutation produced while
/// building it.
///
/// Row `r` of the original input lives at row `permutation[r]` of `matrix`.
pub struct LayeredMatrixData<V, I> {
    /// The layered matrix; rows are grouped by value tier.
    pub matrix: SharedMatrix<V, I>,
    /// New position of each original row.
    pub permutation: Vec<usize>,
}

/// Value tier of a row, from its largest entry: u8, u16 or u32.
pub(crate) fn categorize(max: u64) -> u8 {
    if max > u64::from(u16::MAX) {
        2
    } else if max > u64::from(u8::MAX) {
        1
    } else {
        0
    }
}

/// Within-tier positions and the overall permutation for a classified set of
/// rows.
pub(crate) struct RowRemapping {
    /// Number of rows per tier.
    pub per_category: [usize; 3],
    /// Position of each row within its tier.
    pub new_indices: Vec<usize>,
    /// New overall position of each row once tiers are stacked.
    pub permutation: Vec<usize>,
}

pub(crate) fn compute_new_indices(category: &[u8]) -> RowRemapping {
    let mut per_category = [0_usize; 3];
    let mut new_indices = Vec::with_capacity(category.len());
    for &cat in category {
        let slot = &mut per_category[usize::from(cat)];
        new_indices.push(*slot);
        *slot += 1;
    }

    let offsets = [0, per_category[0], per_category[0] + per_category[1]];
    let permutation = category
        .iter()
        .zip(&new_indices)
        .map(|(&cat, &within)| offsets[usize::from(cat)] + within)
        .collect();

    RowRemapping { per_category, new_indices, permutation }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_boundaries() {
        assert_eq!(categorize(0), 0);
        assert_eq!(categorize(255), 0);
        assert_eq!(categorize(256), 1);
        assert_eq!(categorize(65535), 1);
        assert_eq!(categorize(65536), 2);
    }

    #[test]
    fn test_compute_new_indices() {
        let remapping = compute_new_indices(&[1, 0, 2, 0, 1]);
        assert_eq!(remapping.per_category, [2, 2, 1]);
        assert_eq!(remapping.new_indices, vec![0, 0, 0, 1, 1]);
        // Tier 0 rows come first, then tier 1, then tier 2.
        assert_eq!(remapping.permutation, vec![2, 0, 4, 1, 3]);
    }
}
