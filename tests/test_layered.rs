//! Tests for the layered sparse pipeline, both streaming and in-memory.

mod common;

use std::sync::Arc;

use common::{Reference, simulate};
use delayed_matrix::prelude::*;

/// A matrix whose per-row maxima straddle all three value tiers.
fn tiered_reference() -> Reference {
    let maxima = [10_u64, 1, 10, 1000, 10000, 100000, 1, 100000];
    let ncol = 5;
    let mut values = Vec::new();
    for (r, &max) in maxima.iter().enumerate() {
        for c in 0..ncol {
            // A couple of small entries around each row's defining maximum.
            let x = match c {
                0 => max,
                2 => (r as u64 % 3) + 1,
                4 => max / 2,
                _ => 0,
            };
            values.push(x as f64);
        }
    }
    Reference { nrow: maxima.len(), ncol, values }
}

fn expected_category(max: f64) -> u8 {
    if max > 65535.0 {
        2
    } else if max > 255.0 {
        1
    } else {
        0
    }
}

fn check_layering(data: &LayeredMatrixData<f64, u32>, reference: &Reference) {
    let matrix = data.matrix.as_ref();
    assert_eq!(matrix.nrow() as usize, reference.nrow);
    assert_eq!(matrix.ncol() as usize, reference.ncol);
    assert_eq!(data.permutation.len(), reference.nrow);

    // Permuted rows recover the original ones exactly.
    let mut work = matrix.dense(true, Subset::Full, &Options::default()).unwrap();
    let mut buffer = vec![0.0; reference.ncol];
    for r in 0..reference.nrow {
        let coords: Vec<usize> = (0..reference.ncol).collect();
        let expected = reference.expected(true, r, &coords);
        let fetched = work.fetch(data.permutation[r] as u32, &mut buffer);
        assert_eq!(fetched, expected.as_slice(), "row {r}");
    }

    // Tier order: u8 rows first, then u16, then u32.
    let categories: Vec<u8> = (0..reference.nrow)
        .map(|r| {
            let coords: Vec<usize> = (0..reference.ncol).collect();
            let row = reference.expected(true, r, &coords);
            expected_category(row.iter().fold(0.0, |a: f64, &b| a.max(b)))
        })
        .collect();
    let mut ordering: Vec<(usize, u8)> = (0..reference.nrow)
        .map(|r| (data.permutation[r], categories[r]))
        .collect();
    ordering.sort_unstable();
    let sorted: Vec<u8> = ordering.iter().map(|&(_, cat)| cat).collect();
    assert!(sorted.windows(2).all(|w| w[0] <= w[1]), "tiers should be stacked in order");
}

fn to_market_text(reference: &Reference) -> String {
    let mut text = format!(
        "%%MatrixMarket matrix coordinate integer general\n{} {} {}\n",
        reference.nrow,
        reference.ncol,
        reference.values.iter().filter(|&&x| x != 0.0).count()
    );
    for r in 0..reference.nrow {
        for c in 0..reference.ncol {
            let x = reference.get(r, c);
            if x != 0.0 {
                text.push_str(&format!("{} {} {}\n", r + 1, c + 1, x as u64));
            }
        }
    }
    text
}

#[test]
fn test_layered_load_from_buffer() {
    let reference = tiered_reference();
    let text = to_market_text(&reference);
    let data: LayeredMatrixData<f64, u32> =
        load_layered_sparse_matrix_from_buffer(text.as_bytes(), Compression::None, 64).unwrap();
    check_layering(&data, &reference);
}

#[test]
fn test_layered_load_from_file() {
    let reference = tiered_reference();
    let path =
        std::env::temp_dir().join(format!("delayed-matrix-layered-{}.mtx", std::process::id()));
    std::fs::write(&path, to_market_text(&reference)).unwrap();
    let data: LayeredMatrixData<f64, u32> =
        load_layered_sparse_matrix_from_file(&path, Compression::None, 32).unwrap();
    std::fs::remove_file(&path).ok();
    check_layering(&data, &reference);
}

#[test]
fn test_layered_conversion_from_sparse() {
    let reference = tiered_reference();
    let matrix = common::to_csc(&reference);
    let data = convert_to_layered_sparse(matrix.as_ref()).unwrap();
    check_layering(&data, &reference);
}

#[test]
fn test_layered_conversion_from_row_preferring_input() {
    let reference = tiered_reference();
    let matrix = common::to_csr(&reference);
    let data = convert_to_layered_sparse(matrix.as_ref()).unwrap();
    check_layering(&data, &reference);
}

#[test]
fn test_layered_conversion_from_dense() {
    let reference = tiered_reference();
    let matrix = common::to_dense_row(&reference);
    let data = convert_to_layered_sparse(matrix.as_ref()).unwrap();
    check_layering(&data, &reference);
}

#[test]
fn test_single_tier_input_stays_whole() {
    // Everything fits u8, so no combining happens and the permutation is
    // the identity.
    let reference = simulate(6, 4, 0.5, 700);
    let matrix = common::to_csc(&reference);
    let data = convert_to_layered_sparse(matrix.as_ref()).unwrap();
    assert_eq!(data.permutation, (0..6).collect::<Vec<_>>());
    check_layering(&data, &reference);
}

#[test]
fn test_negative_values_rejected() {
    let negative: SharedMatrix<f64, u32> = Arc::new(
        DenseMatrix::new_row_major(2_u32, 2, vec![1.0, -3.0, 0.0, 2.0]).unwrap(),
    );
    assert!(matches!(
        convert_to_layered_sparse(negative.as_ref()),
        Err(MatrixError::InvalidArgument(LayoutError::NegativeValue { row: 0 }))
    ));
}

#[test]
fn test_layered_matches_simple_loader() {
    let reference = tiered_reference();
    let text = to_market_text(&reference);
    let simple: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(text.as_bytes(), Compression::None, 64).unwrap();
    let layered: LayeredMatrixData<f64, u32> =
        load_layered_sparse_matrix_from_buffer(text.as_bytes(), Compression::None, 64).unwrap();

    let mut simple_work = simple.dense(true, Subset::Full, &Options::default()).unwrap();
    let mut layered_work =
        layered.matrix.dense(true, Subset::Full, &Options::default()).unwrap();
    let mut a = vec![0.0; reference.ncol];
    let mut b = vec![0.0; reference.ncol];
    for r in 0..reference.nrow {
        let direct = simple_work.fetch(r as u32, &mut a).to_vec();
        let permuted = layered_work.fetch(layered.permutation[r] as u32, &mut b);
        assert_eq!(direct, permuted, "row {r}");
    }
}
