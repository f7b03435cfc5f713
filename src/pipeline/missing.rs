//! Missing value analysis and reduction

use polars::prelude::*;

/// Analyze missing values in the dataset.
///
/// Returns `(column, null_fraction)` for every column, sorted by missing
/// ratio descending. Float NaN cells count as missing.
pub fn analyze_missing_values(df: &DataFrame) -> Vec<(String, f64)> {
    // Handle empty DataFrame
    if df.height() == 0 {
        return Vec::new();
    }

    let total = df.height() as f64;

    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|column| {
            let nan_count = match column.dtype() {
                DataType::Float32 | DataType::Float64 => column
                    .as_materialized_series()
                    .cast(&DataType::Float64)
                    .ok()
                    .and_then(|s| s.f64().ok().map(|ca| ca.into_iter().flatten().filter(|v| v.is_nan()).count()))
                    .unwrap_or(0),
                _ => 0,
            };
            let missing = (column.null_count() + nan_count) as f64;
            (column.name().to_string(), missing / total)
        })
        .collect();

    // Sort by missing ratio descending
    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    missing_ratios
}

/// Get features to drop based on missing value threshold.
///
/// The comparison is strict: a ratio exactly at the threshold is kept.
pub fn get_features_above_threshold(missing_ratios: &[(String, f64)], threshold: f64) -> Vec<String> {
    missing_ratios
        .iter()
        .filter(|(_, ratio)| *ratio > threshold)
        .map(|(name, _)| name.clone())
        .collect()
}
