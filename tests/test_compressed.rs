//! Access-equivalence and boundary tests for the compressed sparse engine.

mod common;

use common::{check_access, simulate, to_csc, to_csr};
use delayed_matrix::prelude::*;

#[test]
fn test_csc_access() {
    let reference = simulate(14, 10, 0.2, 100);
    check_access(to_csc(&reference).as_ref(), &reference);
}

#[test]
fn test_csr_access() {
    let reference = simulate(10, 14, 0.2, 101);
    check_access(to_csr(&reference).as_ref(), &reference);
}

#[test]
fn test_denser_content() {
    let reference = simulate(9, 9, 0.8, 102);
    check_access(to_csc(&reference).as_ref(), &reference);
    check_access(to_csr(&reference).as_ref(), &reference);
}

#[test]
fn test_empty_shapes() {
    for (nrow, ncol) in [(0, 5), (5, 0), (0, 0)] {
        let reference = simulate(nrow, ncol, 0.3, 103);
        check_access(to_csc(&reference).as_ref(), &reference);
        check_access(to_csr(&reference).as_ref(), &reference);
    }
}

#[test]
fn test_identity_secondary_paths() {
    // A 10x10 identity stored by column; row extraction crosses the grain.
    let values = vec![1.0; 10];
    let indices: Vec<u32> = (0..10).collect();
    let pointers: Vec<usize> = (0..=10).collect();
    let matrix: CompressedSparseMatrix<f64, u32> =
        CompressedSparseMatrix::csc(10, 10, values, indices, pointers, true).unwrap();

    let mut work = matrix.dense(true, Subset::Full, &Options::default()).unwrap();
    let mut buffer = vec![0.0; 10];
    let mut expected = vec![0.0; 10];
    expected[5] = 1.0;
    assert_eq!(work.fetch(5, &mut buffer), expected.as_slice());

    // Ascending, descending and random orders against the same extractor
    // state.
    let mut work = matrix.dense(true, Subset::Full, &Options::default()).unwrap();
    for r in 0..10_u32 {
        let fetched = work.fetch(r, &mut buffer);
        assert_eq!(fetched[r as usize], 1.0);
        assert_eq!(fetched.iter().sum::<f64>(), 1.0);
    }
    for r in (0..10_u32).rev() {
        let fetched = work.fetch(r, &mut buffer);
        assert_eq!(fetched[r as usize], 1.0);
    }
    for r in [3_u32, 8, 1, 9, 0, 5, 5, 2] {
        let fetched = work.fetch(r, &mut buffer);
        assert_eq!(fetched[r as usize], 1.0, "random jump to {r}");
        assert_eq!(fetched.iter().sum::<f64>(), 1.0);
    }
}

#[test]
fn test_factories_validate_subsets() {
    let reference = simulate(6, 6, 0.4, 104);
    let matrix = to_csc(&reference);

    let oversized = Subset::Block { start: 4_u32, length: 4 };
    assert!(matches!(
        matrix.dense(true, oversized, &Options::default()),
        Err(MatrixError::InvalidArgument(LayoutError::BlockOutOfBounds { .. }))
    ));

    let unsorted = Subset::Index(vec![3_u32, 1].into());
    assert!(matches!(
        matrix.sparse(false, unsorted, &Options::default()),
        Err(MatrixError::InvalidArgument(LayoutError::UnsortedSubset { .. }))
    ));
}
