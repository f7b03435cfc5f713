//! Unit tests for correlation-based redundancy pruning

use faer::Mat;
use polars::prelude::*;
use squadfeat::pipeline::{
    correlation_matrix, find_correlated_pairs, redundant_from_matrix, select_redundant,
    CorrelationMatrix,
};

#[path = "common/mod.rs"]
mod common;

/// A-B and B-C correlate at ~0.957, A-C only at ~0.83
fn chain_dataframe() -> DataFrame {
    df! {
        "A" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "B" => [2.0f64, 1.5, 2.5, 5.0, 4.5, 5.5, 8.0, 9.0, 8.0, 9.0],
        "C" => [3.0f64, 1.0, 2.0, 6.0, 4.0, 5.0, 9.0, 10.0, 7.0, 8.0],
    }
    .unwrap()
}

#[test]
fn test_chain_drops_every_later_member() {
    let df = chain_dataframe();

    // C only clears the threshold against B, which is itself dropped
    let matrix = correlation_matrix(&df).unwrap();
    assert!(matrix.get(0, 1) > 0.95 && matrix.get(1, 2) > 0.95);
    assert!((matrix.get(0, 2) - 0.830303).abs() < 1e-6);

    let dropped = select_redundant(&df, 0.95).unwrap();
    assert_eq!(dropped, vec!["B", "C"]);

    // Above the A-B / B-C level nothing is redundant
    assert!(select_redundant(&df, 0.96).unwrap().is_empty());
}

#[test]
fn test_chain_on_hand_built_matrix() {
    let corr = [[1.0, 0.99, 0.5], [0.99, 1.0, 0.99], [0.5, 0.99, 1.0]];
    let matrix = CorrelationMatrix {
        columns: vec!["A".into(), "B".into(), "C".into()],
        values: Mat::from_fn(3, 3, |i, j| corr[i][j]),
    };

    assert_eq!(redundant_from_matrix(&matrix, 0.95), vec!["B", "C"]);
}

#[test]
fn test_first_column_of_pair_is_kept() {
    let df = df! {
        "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
        "y" => [-2.0f64, -4.0, -6.0, -8.0, -10.0],
    }
    .unwrap();
    assert_eq!(select_redundant(&df, 0.9).unwrap(), vec!["y"]);

    // Swapping column order swaps the survivor
    let swapped = df.select(["y", "x"]).unwrap();
    assert_eq!(select_redundant(&swapped, 0.9).unwrap(), vec!["x"]);
}

#[test]
fn test_threshold_is_strict() {
    let df = df! {
        "x" => [1.0f64, 2.0, 3.0],
        "y" => [2.0f64, 4.0, 6.0],
    }
    .unwrap();
    // |r| = 1.0 is not strictly above 1.0
    assert!(select_redundant(&df, 1.0).unwrap().is_empty());
}

#[test]
fn test_constant_column_never_dropped() {
    let df = df! {
        "a" => [1.0f64, 2.0, 3.0, 4.0],
        "constant" => [7.0f64, 7.0, 7.0, 7.0],
        "b" => [4.0f64, 3.0, 2.0, 1.0],
    }
    .unwrap();

    let matrix = correlation_matrix(&df).unwrap();
    assert!(matrix.get(0, 1).is_nan());
    assert!(matrix.get(1, 2).is_nan());

    // b is dropped against a, the constant column is left alone
    assert_eq!(select_redundant(&df, 0.5).unwrap(), vec!["b"]);
}

#[test]
fn test_fewer_than_two_numeric_columns_is_a_no_op() {
    let df = df! {
        "Squad" => ["A", "B", "C"],
        "Tkl" => [1.0f64, 2.0, 3.0],
    }
    .unwrap();
    assert!(select_redundant(&df, 0.5).unwrap().is_empty());

    let empty = DataFrame::empty();
    assert!(select_redundant(&empty, 0.5).unwrap().is_empty());
}

#[test]
fn test_non_numeric_columns_ignored() {
    let df = df! {
        "Squad" => ["A", "B", "C", "D"],
        "x" => [1.0f64, 2.0, 3.0, 4.0],
        "y" => [1.5f64, 2.5, 3.5, 4.5],
    }
    .unwrap();

    let matrix = correlation_matrix(&df).unwrap();
    assert_eq!(matrix.columns, vec!["x", "y"]);
    assert_eq!(select_redundant(&df, 0.9).unwrap(), vec!["y"]);
}

#[test]
fn test_pairwise_complete_with_nulls() {
    // Only rows 0, 1, 3 have both values, and there y = 2x
    let df = df! {
        "x" => [Some(1.0f64), Some(2.0), None, Some(4.0)],
        "y" => [Some(2.0f64), Some(4.0), Some(100.0), Some(8.0)],
    }
    .unwrap();

    let matrix = correlation_matrix(&df).unwrap();
    assert!((matrix.get(0, 1) - 1.0).abs() < 1e-12);
}

#[test]
fn test_no_correlation_found_high_threshold() {
    let df = df! {
        "a" => [1.0f64, 5.0, 2.0, 8.0, 3.0, 7.0, 4.0, 6.0, 9.0, 0.0],
        "b" => [9.0f64, 2.0, 7.0, 1.0, 6.0, 3.0, 8.0, 4.0, 0.0, 5.0],
    }
    .unwrap();

    let pairs = find_correlated_pairs(&df, 0.95).unwrap();
    assert!(
        pairs.is_empty(),
        "Weakly related data should have no pairs at 0.95, got {:?}",
        pairs
    );
}

#[test]
fn test_pairs_sorted_by_correlation_descending() {
    let df = chain_dataframe();
    let pairs = find_correlated_pairs(&df, 0.5).unwrap();

    assert_eq!(pairs.len(), 3);
    for window in pairs.windows(2) {
        assert!(window[0].correlation.abs() >= window[1].correlation.abs());
    }
    let last = pairs.last().unwrap();
    assert_eq!((last.feature1.as_str(), last.feature2.as_str()), ("A", "C"));
}

#[test]
fn test_invalid_threshold_rejected() {
    let df = chain_dataframe();
    assert!(select_redundant(&df, 0.0).is_err());
    assert!(select_redundant(&df, 1.01).is_err());
    assert!(find_correlated_pairs(&df, -0.5).is_err());
}

#[test]
fn test_matrix_method_matches_pairwise_on_wide_table() {
    // 20 columns, no nulls: the fast path is taken
    let df = common::create_large_test_dataframe(200, 20);
    let matrix = correlation_matrix(&df).unwrap();
    assert_eq!(matrix.len(), 20);

    // Nulls force the pairwise path; compare on a column pair
    let mut with_null = df.clone();
    let mut first: Vec<Option<f64>> = common::f64_values(&df, "feature_0");
    first[0] = None;
    with_null
        .replace("feature_0", Series::new("feature_0".into(), first))
        .unwrap();
    let pairwise = correlation_matrix(&with_null).unwrap();

    for i in 1..20 {
        for j in (i + 1)..20 {
            assert!(
                (matrix.get(i, j) - pairwise.get(i, j)).abs() < 1e-9,
                "Mismatch at ({}, {})",
                i,
                j
            );
        }
    }
    for i in 0..20 {
        assert!((matrix.get(i, i) - 1.0).abs() < 1e-9);
    }
}
