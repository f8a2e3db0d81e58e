//! Access-equivalence tests for the dense storage engine.

mod common;

use common::{check_access, simulate, to_dense_column, to_dense_row};

#[test]
fn test_row_major_access() {
    let reference = simulate(13, 9, 0.7, 42);
    check_access(to_dense_row(&reference).as_ref(), &reference);
}

#[test]
fn test_column_major_access() {
    let reference = simulate(13, 9, 0.7, 43);
    check_access(to_dense_column(&reference).as_ref(), &reference);
}

#[test]
fn test_fully_dense_content() {
    let reference = simulate(6, 6, 1.0, 44);
    check_access(to_dense_row(&reference).as_ref(), &reference);
}

#[test]
fn test_empty_shapes() {
    for (nrow, ncol) in [(0, 7), (7, 0), (0, 0)] {
        let reference = simulate(nrow, ncol, 0.5, 45);
        check_access(to_dense_row(&reference).as_ref(), &reference);
        check_access(to_dense_column(&reference).as_ref(), &reference);
    }
}

#[test]
fn test_single_row_and_column() {
    let reference = simulate(1, 8, 0.6, 46);
    check_access(to_dense_row(&reference).as_ref(), &reference);
    let reference = simulate(8, 1, 0.6, 47);
    check_access(to_dense_column(&reference).as_ref(), &reference);
}
