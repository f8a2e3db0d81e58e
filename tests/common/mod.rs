//! Shared helpers for the integration tests: simulated inputs, storage
//! builders and an access-equivalence harness that drives every extractor
//! flavor against a reference dense image.

use std::sync::Arc;

use delayed_matrix::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A row-major dense image serving as ground truth.
#[derive(Clone, Debug)]
pub struct Reference {
    pub nrow: usize,
    pub ncol: usize,
    pub values: Vec<f64>,
}

impl Reference {
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.values[r * self.ncol + c]
    }

    /// The dense slice a fetch of target `i` over the given non-target
    /// coordinates should produce.
    pub fn expected(&self, row: bool, i: usize, coords: &[usize]) -> Vec<f64> {
        coords
            .iter()
            .map(|&c| if row { self.get(i, c) } else { self.get(c, i) })
            .collect()
    }
}

/// Simulates a sparse dense image with the given non-zero density; values
/// are small positive integers stored as doubles.
pub fn simulate(nrow: usize, ncol: usize, density: f64, seed: u64) -> Reference {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..nrow * ncol)
        .map(|_| {
            if rng.r#gen::<f64>() < density { f64::from(rng.gen_range(1..100_u32)) } else { 0.0 }
        })
        .collect();
    Reference { nrow, ncol, values }
}

/// Builds a compressed sparse column matrix from the reference image.
pub fn to_csc(reference: &Reference) -> SharedMatrix<f64, u32> {
    let mut values = Vec::new();
    let mut indices = Vec::new();
    let mut pointers = vec![0_usize];
    for c in 0..reference.ncol {
        for r in 0..reference.nrow {
            let x = reference.get(r, c);
            if x != 0.0 {
                values.push(x);
                indices.push(r as u32);
            }
        }
        pointers.push(values.len());
    }
    Arc::new(
        CompressedSparseMatrix::csc(
            reference.nrow as u32,
            reference.ncol as u32,
            values,
            indices,
            pointers,
            true,
        )
        .unwrap(),
    )
}

/// Builds a compressed sparse row matrix from the reference image.
pub fn to_csr(reference: &Reference) -> SharedMatrix<f64, u32> {
    let mut values = Vec::new();
    let mut indices = Vec::new();
    let mut pointers = vec![0_usize];
    for r in 0..reference.nrow {
        for c in 0..reference.ncol {
            let x = reference.get(r, c);
            if x != 0.0 {
                values.push(x);
                indices.push(c as u32);
            }
        }
        pointers.push(values.len());
    }
    Arc::new(
        CompressedSparseMatrix::csr(
            reference.nrow as u32,
            reference.ncol as u32,
            values,
            indices,
            pointers,
            true,
        )
        .unwrap(),
    )
}

/// Builds a row-major dense matrix from the reference image.
pub fn to_dense_row(reference: &Reference) -> SharedMatrix<f64, u32> {
    Arc::new(
        DenseMatrix::new_row_major(
            reference.nrow as u32,
            reference.ncol as u32,
            reference.values.clone(),
        )
        .unwrap(),
    )
}

/// Builds a column-major dense matrix from the reference image.
pub fn to_dense_column(reference: &Reference) -> SharedMatrix<f64, u32> {
    let mut values = Vec::with_capacity(reference.nrow * reference.ncol);
    for c in 0..reference.ncol {
        for r in 0..reference.nrow {
            values.push(reference.get(r, c));
        }
    }
    Arc::new(
        DenseMatrix::new_column_major(reference.nrow as u32, reference.ncol as u32, values)
            .unwrap(),
    )
}

/// Builds a fragmented sparse row matrix from the reference image.
pub fn to_fragmented(reference: &Reference) -> SharedMatrix<f64, u32> {
    let mut values = Vec::with_capacity(reference.nrow);
    let mut indices = Vec::with_capacity(reference.nrow);
    for r in 0..reference.nrow {
        let mut row_values = Vec::new();
        let mut row_indices = Vec::new();
        for c in 0..reference.ncol {
            let x = reference.get(r, c);
            if x != 0.0 {
                row_values.push(x);
                row_indices.push(c as u32);
            }
        }
        values.push(row_values);
        indices.push(row_indices);
    }
    Arc::new(
        FragmentedSparseMatrix::by_row(
            reference.nrow as u32,
            reference.ncol as u32,
            values,
            indices,
        )
        .unwrap(),
    )
}

/// The subsets exercised by the harness, with their coordinate lists.
fn subset_cases(extent: usize) -> Vec<(Subset<u32>, Vec<usize>)> {
    let mut cases = vec![(Subset::Full, (0..extent).collect::<Vec<_>>())];
    if extent > 0 {
        let start = extent / 4;
        let length = extent - start - extent / 5;
        cases.push((
            Subset::Block { start: start as u32, length: length as u32 },
            (start..start + length).collect(),
        ));
        let picked: Vec<usize> = (0..extent).step_by(3).collect();
        let list: Vec<u32> = picked.iter().map(|&x| x as u32).collect();
        cases.push((Subset::Index(list.into()), picked));
    }
    cases
}

fn unpack_sparse(range: &SparseRange<'_, f64, u32>, coords: &[usize]) -> Vec<f64> {
    let indices = range.index.expect("harness always extracts indices");
    let values = range.value.expect("harness always extracts values");
    let mut dense = vec![0.0; coords.len()];
    for (value, idx) in values.iter().zip(indices) {
        let position = coords
            .iter()
            .position(|&c| c == *idx as usize)
            .expect("sparse output index should be a subset coordinate");
        dense[position] = *value;
    }
    dense
}

/// Checks every extractor flavor of `matrix` against the reference image.
pub fn check_access(matrix: &dyn Matrix<f64, u32>, reference: &Reference) {
    assert_eq!(matrix.nrow() as usize, reference.nrow);
    assert_eq!(matrix.ncol() as usize, reference.ncol);
    let options = Options::default();

    for row in [true, false] {
        let target = if row { reference.nrow } else { reference.ncol };
        let other = if row { reference.ncol } else { reference.nrow };

        for (subset, coords) in subset_cases(other) {
            let mut buffer = vec![0.0; coords.len()];
            let mut values = vec![0.0; coords.len()];
            let mut indices = vec![0_u32; coords.len()];

            // Dense, ascending then descending on the same extractor.
            let mut dense = matrix.dense(row, subset.clone(), &options).unwrap();
            for i in 0..target {
                let fetched = dense.fetch(i as u32, &mut buffer);
                assert_eq!(fetched, reference.expected(row, i, &coords), "dense row={row} i={i}");
            }
            for i in (0..target).rev() {
                let fetched = dense.fetch(i as u32, &mut buffer);
                assert_eq!(fetched, reference.expected(row, i, &coords), "dense rev row={row} i={i}");
            }

            // Sparse, with ordering checked.
            let mut sparse = matrix.sparse(row, subset.clone(), &options).unwrap();
            for i in 0..target {
                let range = sparse.fetch(i as u32, &mut values, &mut indices);
                let fetched = range.index.unwrap();
                assert!(
                    fetched.windows(2).all(|w| w[0] < w[1]),
                    "sparse output should be strictly ascending (row={row} i={i})"
                );
                assert_eq!(
                    unpack_sparse(&range, &coords),
                    reference.expected(row, i, &coords),
                    "sparse row={row} i={i}"
                );
            }

            // Sparse with each output array disabled in turn.
            let value_only =
                Options { extract_index: false, ..Options::default() };
            let mut sparse = matrix.sparse(row, subset.clone(), &value_only).unwrap();
            for i in 0..target {
                let range = sparse.fetch(i as u32, &mut values, &mut []);
                assert!(range.index.is_none());
                let expected = reference.expected(row, i, &coords);
                let nonzero = expected.iter().filter(|&&x| x != 0.0).count();
                assert!(range.number >= nonzero, "value-only row={row} i={i}");
            }
            let index_only =
                Options { extract_value: false, ..Options::default() };
            let mut sparse = matrix.sparse(row, subset.clone(), &index_only).unwrap();
            for i in 0..target {
                let range = sparse.fetch(i as u32, &mut [], &mut indices);
                assert!(range.value.is_none());
                let fetched = range.index.unwrap();
                assert!(fetched.windows(2).all(|w| w[0] < w[1]));
            }

            // Oracular, over a jumpy but valid prediction sequence.
            let mut predictions: Vec<u32> = (0..target as u32).collect();
            predictions.extend((0..target as u32).rev());
            predictions.extend((0..target as u32).step_by(2));
            let oracle: SharedOracle<u32> =
                Arc::new(FixedVectorOracle::new(predictions.clone()));
            let mut dense =
                matrix.dense_with_oracle(row, oracle.clone(), subset.clone(), &options).unwrap();
            for &i in &predictions {
                let fetched = dense.fetch(&mut buffer);
                assert_eq!(
                    fetched,
                    reference.expected(row, i as usize, &coords),
                    "oracular dense row={row} i={i}"
                );
            }
            let mut sparse =
                matrix.sparse_with_oracle(row, oracle, subset.clone(), &options).unwrap();
            for &i in &predictions {
                let range = sparse.fetch(&mut values, &mut indices);
                assert_eq!(
                    unpack_sparse(&range, &coords),
                    reference.expected(row, i as usize, &coords),
                    "oracular sparse row={row} i={i}"
                );
            }
        }
    }
}
