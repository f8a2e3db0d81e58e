//! Access-equivalence tests for the fragmented sparse engine.

mod common;

use std::sync::Arc;

use common::{check_access, simulate, to_fragmented};
use delayed_matrix::prelude::*;

#[test]
fn test_fragmented_row_access() {
    let reference = simulate(12, 8, 0.25, 200);
    check_access(to_fragmented(&reference).as_ref(), &reference);
}

#[test]
fn test_fragmented_column_access() {
    let reference = simulate(8, 12, 0.25, 201);
    let mut values = Vec::new();
    let mut indices = Vec::new();
    for c in 0..reference.ncol {
        let mut column_values = Vec::new();
        let mut column_indices = Vec::new();
        for r in 0..reference.nrow {
            let x = reference.get(r, c);
            if x != 0.0 {
                column_values.push(x);
                column_indices.push(r as u32);
            }
        }
        values.push(column_values);
        indices.push(column_indices);
    }
    let matrix: SharedMatrix<f64, u32> = Arc::new(
        FragmentedSparseMatrix::by_column(
            reference.nrow as u32,
            reference.ncol as u32,
            values,
            indices,
        )
        .unwrap(),
    );
    check_access(matrix.as_ref(), &reference);
}

#[test]
fn test_empty_fragments() {
    let reference = simulate(5, 0, 0.0, 202);
    check_access(to_fragmented(&reference).as_ref(), &reference);
}
