//! Tests for transposition, block subsetting, casting and the forced-dense
//! wrapper.

mod common;

use std::sync::Arc;

use common::{Reference, check_access, simulate, to_csc, to_csr, to_dense_row};
use delayed_matrix::prelude::*;

fn transposed(reference: &Reference) -> Reference {
    let mut values = Vec::with_capacity(reference.values.len());
    for c in 0..reference.ncol {
        for r in 0..reference.nrow {
            values.push(reference.get(r, c));
        }
    }
    Reference { nrow: reference.ncol, ncol: reference.nrow, values }
}

#[test]
fn test_transpose_access() {
    let reference = simulate(9, 13, 0.3, 400);
    let matrix = make_delayed_transpose(to_csc(&reference));
    check_access(matrix.as_ref(), &transposed(&reference));
}

#[test]
fn test_transpose_involution() {
    let reference = simulate(9, 13, 0.3, 401);
    let twice = make_delayed_transpose(make_delayed_transpose(to_csr(&reference)));
    check_access(twice.as_ref(), &reference);
}

#[test]
fn test_subset_block_rows() {
    let reference = simulate(12, 7, 0.4, 402);
    let matrix = make_delayed_subset_block(to_csc(&reference), true, 3_u32, 6).unwrap();
    let sliced = Reference {
        nrow: 6,
        ncol: reference.ncol,
        values: reference.values[3 * reference.ncol..9 * reference.ncol].to_vec(),
    };
    check_access(matrix.as_ref(), &sliced);
}

#[test]
fn test_subset_block_columns() {
    let reference = simulate(7, 12, 0.4, 403);
    let matrix = make_delayed_subset_block(to_csr(&reference), false, 2_u32, 8).unwrap();
    let mut values = Vec::new();
    for r in 0..reference.nrow {
        for c in 2..10 {
            values.push(reference.get(r, c));
        }
    }
    let sliced = Reference { nrow: reference.nrow, ncol: 8, values };
    check_access(matrix.as_ref(), &sliced);
}

#[test]
fn test_subset_block_validation() {
    let matrix = to_csr(&simulate(5, 5, 0.5, 404));
    assert!(matches!(
        make_delayed_subset_block(matrix, true, 3_u32, 4),
        Err(MatrixError::InvalidArgument(LayoutError::BlockOutOfBounds { .. }))
    ));
}

#[test]
fn test_cast_value_and_index_types() {
    // A u32-valued matrix exposed as doubles with narrower indices.
    let values: Vec<u32> = vec![3, 0, 7, 1, 0, 9];
    let inner: SharedMatrix<u32, u32> =
        Arc::new(DenseMatrix::new_row_major(2_u32, 3, values).unwrap());
    let cast: SharedMatrix<f64, u16> = make_delayed_cast(inner).unwrap();
    assert_eq!(cast.nrow(), 2_u16);
    assert_eq!(cast.ncol(), 3_u16);

    let mut work = cast.dense(true, Subset::Full, &Options::default()).unwrap();
    let mut buffer = vec![0.0; 3];
    assert_eq!(work.fetch(0, &mut buffer), &[3.0, 0.0, 7.0]);
    assert_eq!(work.fetch(1, &mut buffer), &[1.0, 0.0, 9.0]);

    let mut work = cast.sparse(false, Subset::Full, &Options::default()).unwrap();
    let mut values = vec![0.0; 2];
    let mut indices = vec![0_u16; 2];
    let range = work.fetch(2, &mut values, &mut indices);
    assert_eq!(range.number, 2);
    assert_eq!(range.value.unwrap(), &[7.0, 9.0]);
    assert_eq!(range.index.unwrap(), &[0, 1]);
}

#[test]
fn test_cast_full_equivalence() {
    let reference = simulate(8, 6, 0.4, 405);
    let cast: SharedMatrix<f64, u32> =
        make_delayed_cast::<f64, u32, f64, u32>(to_csc(&reference)).unwrap();
    check_access(cast.as_ref(), &reference);
}

#[test]
fn test_cast_rejects_narrow_index_types() {
    let inner: SharedMatrix<f64, u32> = to_dense_row(&simulate(300, 2, 0.5, 406));
    let result = make_delayed_cast::<f64, u8, f64, u32>(inner);
    assert!(matches!(
        result,
        Err(MatrixError::InvalidArgument(LayoutError::ExtentOverflow { extent: 300 }))
    ));
}

#[test]
fn test_forced_dense_overrides_sparsity_only() {
    let reference = simulate(10, 5, 0.2, 407);
    let sparse = to_csc(&reference);
    assert!(sparse.is_sparse());

    let forced = make_forced_dense(sparse);
    assert!(!forced.is_sparse());
    assert_eq!(forced.is_sparse_proportion(), 0.0);
    check_access(forced.as_ref(), &reference);
}
