//! Tests for representation conversions, triplet compression and parallel
//! dispatch over real conversions.

mod common;

use common::{check_access, simulate, to_csc, to_csr, to_dense_column, to_dense_row};
use delayed_matrix::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[test]
fn test_round_trip_through_dense() {
    let reference = simulate(11, 9, 0.3, 800);
    let original = to_csc(&reference);
    let densified = convert_to_dense(original.as_ref(), true, 1).unwrap();
    assert!(!densified.is_sparse());
    check_access(densified.as_ref(), &reference);

    let recompressed = convert_to_compressed_sparse(densified.as_ref(), false, true, 1).unwrap();
    assert!(recompressed.is_sparse());
    check_access(recompressed.as_ref(), &reference);
}

#[test]
fn test_convert_to_compressed_each_orientation() {
    let reference = simulate(10, 12, 0.3, 801);
    for source in [to_dense_row(&reference), to_dense_column(&reference), to_csc(&reference)] {
        for to_row in [true, false] {
            for two_pass in [false, true] {
                let converted =
                    convert_to_compressed_sparse(source.as_ref(), to_row, two_pass, 1).unwrap();
                assert_eq!(converted.prefer_rows(), to_row);
                check_access(converted.as_ref(), &reference);
            }
        }
    }
}

#[test]
fn test_convert_with_threads() {
    let reference = simulate(40, 23, 0.2, 802);
    let source = to_csc(&reference);
    for threads in [2, 5] {
        let converted = convert_to_compressed_sparse(source.as_ref(), true, true, threads).unwrap();
        check_access(converted.as_ref(), &reference);
        let densified = convert_to_dense(source.as_ref(), false, threads).unwrap();
        check_access(densified.as_ref(), &reference);
    }
}

#[test]
fn test_convert_to_fragmented() {
    let reference = simulate(9, 14, 0.35, 803);
    for to_row in [true, false] {
        let converted =
            convert_to_fragmented_sparse(to_dense_row(&reference).as_ref(), to_row, 2).unwrap();
        assert!(converted.is_sparse());
        assert_eq!(converted.prefer_rows(), to_row);
        check_access(converted.as_ref(), &reference);
    }
}

#[test]
fn test_count_and_fill_by_hand() {
    let reference = simulate(8, 6, 0.4, 804);
    let matrix = to_csr(&reference);

    // Count along columns (against the grain), then fill pre-sized arrays.
    let mut counts = vec![0_usize; reference.ncol];
    count_compressed_sparse_non_zeros(matrix.as_ref(), false, &mut counts, 2).unwrap();
    for (c, &count) in counts.iter().enumerate() {
        let expected =
            (0..reference.nrow).filter(|&r| reference.get(r, c) != 0.0).count();
        assert_eq!(count, expected, "column {c}");
    }

    let mut pointers = vec![0_usize; reference.ncol + 1];
    for c in 0..reference.ncol {
        pointers[c + 1] = pointers[c] + counts[c];
    }
    let total = pointers[reference.ncol];
    let mut values = vec![0.0_f64; total];
    let mut indices = vec![0_u32; total];
    fill_compressed_sparse_contents(
        matrix.as_ref(),
        false,
        &pointers,
        &mut values,
        &mut indices,
        2,
    )
    .unwrap();

    let rebuilt: CompressedSparseMatrix<f64, u32> = CompressedSparseMatrix::csc(
        reference.nrow as u32,
        reference.ncol as u32,
        values,
        indices,
        pointers,
        true,
    )
    .unwrap();
    check_access(&rebuilt, &reference);
}

#[test]
fn test_retrieve_contents_two_pass_matches_one_pass() {
    let reference = simulate(12, 7, 0.3, 805);
    let matrix = to_dense_row(&reference);
    let one: CompressedSparseContents<f64, u32> =
        retrieve_compressed_sparse_contents(matrix.as_ref(), true, false, 1).unwrap();
    let two: CompressedSparseContents<f64, u32> =
        retrieve_compressed_sparse_contents(matrix.as_ref(), true, true, 3).unwrap();
    assert_eq!(one.pointers, two.pointers);
    assert_eq!(one.index, two.index);
    assert_eq!(one.value, two.value);
}

#[test]
fn test_retrieve_fragmented_contents() {
    let reference = simulate(6, 10, 0.4, 806);
    let contents: FragmentedSparseContents<f64, u32> =
        retrieve_fragmented_sparse_contents(to_csc(&reference).as_ref(), true, 2).unwrap();
    assert_eq!(contents.values.len(), reference.nrow);
    for (r, (values, indices)) in
        contents.values.iter().zip(&contents.indices).enumerate()
    {
        let expected: Vec<(u32, f64)> = (0..reference.ncol)
            .filter_map(|c| {
                let x = reference.get(r, c);
                (x != 0.0).then_some((c as u32, x))
            })
            .collect();
        let fetched: Vec<(u32, f64)> =
            indices.iter().copied().zip(values.iter().copied()).collect();
        assert_eq!(fetched, expected, "row {r}");
    }
}

#[test]
fn test_triplet_compression_round_trip() {
    // A known triplet stream on a 20x30 grid, scrambled and recompressed.
    let mut rng = StdRng::seed_from_u64(807);
    let mut cells: Vec<(u32, u32)> = (0..20_u32)
        .flat_map(|r| (0..30_u32).map(move |c| (r, c)))
        .collect();
    cells.shuffle(&mut rng);
    cells.truncate(100);

    let entries: Vec<(u32, u32, f64)> = cells
        .iter()
        .enumerate()
        .map(|(k, &(r, c))| (r, c, (k + 1) as f64))
        .collect();

    // Deterministic reference ordering: by column, then row.
    let mut reference = entries.clone();
    reference.sort_unstable_by_key(|&(r, c, _)| (c, r));
    let reference_values: Vec<f64> = reference.iter().map(|&(_, _, v)| v).collect();
    let reference_rows: Vec<u32> = reference.iter().map(|&(r, _, _)| r).collect();

    let mut scrambled = entries;
    scrambled.shuffle(&mut rng);
    let mut values: Vec<f64> = scrambled.iter().map(|&(_, _, v)| v).collect();
    let mut rows: Vec<u32> = scrambled.iter().map(|&(r, _, _)| r).collect();
    let mut cols: Vec<u32> = scrambled.iter().map(|&(_, c, _)| c).collect();

    let pointers = compress_sparse_triplets(30, &mut values, &mut cols, &mut rows).unwrap();
    assert_eq!(pointers.len(), 31);
    assert_eq!(pointers[30], 100);
    assert_eq!(values, reference_values);
    assert_eq!(rows, reference_rows);
    for c in 0..30 {
        for k in pointers[c]..pointers[c + 1] {
            assert_eq!(cols[k], c as u32);
        }
    }
}

#[test]
fn test_parallelize_is_exercised_through_conversions() {
    // Worker counts beyond the task count are clamped.
    let used = parallelize(|_, _, _| Ok(()), 3, 16).unwrap();
    assert_eq!(used, 3);

    let reference = simulate(5, 5, 0.5, 808);
    let converted =
        convert_to_compressed_sparse(to_csc(&reference).as_ref(), true, true, 16).unwrap();
    check_access(converted.as_ref(), &reference);
}
