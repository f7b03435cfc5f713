//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A small defensive-actions table shaped like the raw exports.
///
/// - `Squad`, `Season`: text key columns (dropped by the text stage)
/// - `Rk`: sequential rank, unique per row
/// - `Tkl`: clean numeric feature
/// - `Tkl_dup`: exactly 2 * `Tkl` (redundant)
/// - `Blocks_sparse`: 4 of 6 missing
/// - `Const90`: zero variance, name matches the `90` pattern
/// - `Int`: independent feature
pub fn create_defensive_dataframe() -> DataFrame {
    df! {
        "Squad" => ["Alavés", "Betis", "Celta", "Alavés", "Betis", "Celta"],
        "Season" => ["2020-2021", "2020-2021", "2020-2021", "2021-2022", "2021-2022", "2021-2022"],
        "Rk" => [1i64, 2, 3, 4, 5, 6],
        "Tkl" => [10.0f64, 12.0, 10.0, 14.0, 12.0, 14.0],
        "Tkl_dup" => [20.0f64, 24.0, 20.0, 28.0, 24.0, 28.0],
        "Blocks_sparse" => [Some(1.0f64), None, None, None, None, Some(3.0)],
        "Const90" => [5.0f64; 6],
        "Int" => [3.0f64, 1.0, 3.0, 2.0, 1.0, 2.0],
    }
    .unwrap()
}

/// Create a larger random numeric DataFrame for stress tests
pub fn create_large_test_dataframe(rows: usize, cols: usize) -> DataFrame {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    let columns: Vec<Column> = (0..cols)
        .map(|i| {
            let values: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>()).collect();
            Column::new(format!("feature_{}", i).into(), values)
        })
        .collect();

    DataFrame::new(columns).unwrap()
}

/// Write a DataFrame as CSV into `dir/name`
pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = write_csv(temp_dir.path(), "test_data.csv", df);
    (temp_dir, path)
}

/// Column names of a DataFrame as owned strings
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols = column_names(df);
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols = column_names(df);
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}

/// String values of a column, nulls rendered as `None`
pub fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

/// Float values of a column
pub fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .iter()
        .collect()
}
