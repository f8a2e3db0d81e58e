//! Tests for the MatrixMarket loaders against files, buffers and gzip.

mod common;

use delayed_matrix::prelude::*;

const SIMPLE: &str = "%%MatrixMarket matrix coordinate integer general\n3 2 2\n1 1 5\n3 2 7\n";

fn dense_image(matrix: &dyn Matrix<f64, u32>) -> Vec<Vec<f64>> {
    let ncol = matrix.ncol() as usize;
    let mut work = matrix.dense(true, Subset::Full, &Options::default()).unwrap();
    let mut buffer = vec![0.0; ncol];
    (0..matrix.nrow())
        .map(|r| work.fetch(r, &mut buffer).to_vec())
        .collect()
}

#[test]
fn test_load_from_buffer() {
    let matrix: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(SIMPLE.as_bytes(), Compression::None, 64).unwrap();
    assert_eq!(matrix.nrow(), 3);
    assert_eq!(matrix.ncol(), 2);
    assert!(matrix.is_sparse());
    assert!(!matrix.prefer_rows());
    assert_eq!(
        dense_image(matrix.as_ref()),
        vec![vec![5.0, 0.0], vec![0.0, 0.0], vec![0.0, 7.0]]
    );
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("delayed-matrix-simple-{}.mtx", std::process::id()));
    std::fs::write(&path, SIMPLE).unwrap();
    let matrix: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_file(&path, Compression::None, 16).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(
        dense_image(matrix.as_ref()),
        vec![vec![5.0, 0.0], vec![0.0, 0.0], vec![0.0, 7.0]]
    );
}

#[test]
fn test_missing_trailing_newline_is_equivalent() {
    let trimmed: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(SIMPLE.trim_end().as_bytes(), Compression::None, 64)
            .unwrap();
    let terminated: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(SIMPLE.as_bytes(), Compression::None, 64).unwrap();
    assert_eq!(dense_image(trimmed.as_ref()), dense_image(terminated.as_ref()));
}

#[test]
fn test_no_data_lines_gives_all_zero_matrix() {
    let matrix: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(b"4 3 0\n", Compression::None, 64).unwrap();
    assert_eq!(matrix.nrow(), 4);
    assert_eq!(matrix.ncol(), 3);
    assert_eq!(dense_image(matrix.as_ref()), vec![vec![0.0; 3]; 4]);
}

#[test]
fn test_parse_errors_carry_line_numbers() {
    let bad = "3 2 2\n1 1 5\n1 2.5 7\n";
    let err = match load_sparse_matrix_from_buffer::<f64, u32>(bad.as_bytes(), Compression::None, 64) {
        Err(e) => e,
        Ok(_) => panic!("expected an error"),
    };
    match err {
        MatrixError::Parse(parse) => {
            assert_eq!(parse.line, 3);
            assert_eq!(parse.kind, ParseErrorKind::UnexpectedCharacter);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_inspect_header() {
    let header = inspect_buffer(SIMPLE.as_bytes(), Compression::None, 64).unwrap();
    assert_eq!(header, MarketHeader { nrow: 3, ncol: 2, nlines: 2 });
}

#[cfg(feature = "gzip")]
#[test]
fn test_gzip_roundtrip() {
    use std::io::Write;

    let mut encoder =
        flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(SIMPLE.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let explicit: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(&compressed, Compression::Gzip, 32).unwrap();
    let detected: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(&compressed, Compression::Detect, 32).unwrap();
    assert_eq!(dense_image(explicit.as_ref()), dense_image(detected.as_ref()));
    assert_eq!(
        dense_image(explicit.as_ref()),
        vec![vec![5.0, 0.0], vec![0.0, 0.0], vec![0.0, 7.0]]
    );

    let path =
        std::env::temp_dir().join(format!("delayed-matrix-gz-{}.mtx.gz", std::process::id()));
    std::fs::write(&path, &compressed).unwrap();
    let from_file: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_file(&path, Compression::Detect, 32).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(dense_image(from_file.as_ref()), dense_image(explicit.as_ref()));

    // Plain text is still recognized as such under detection.
    let plain: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(SIMPLE.as_bytes(), Compression::Detect, 32).unwrap();
    assert_eq!(dense_image(plain.as_ref()), dense_image(explicit.as_ref()));
}

#[test]
fn test_loaded_matrix_full_access() {
    // A bigger simulated document, checked through every extractor flavor.
    let reference = common::simulate(20, 15, 0.25, 600);
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
    let matrix: SharedMatrix<f64, u32> =
        load_sparse_matrix_from_buffer(text.as_bytes(), Compression::None, 64).unwrap();
    common::check_access(matrix.as_ref(), &reference);
}
