//! Correlation-based redundancy pruning

use anyhow::Result;
use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;

use super::table::{numeric_column_names, TableError};

/// Represents a correlated pair of features
#[derive(Debug, Clone)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// Signed Pearson correlation matrix over the numeric columns of a table.
///
/// Entries are NaN where the correlation is undefined (a constant column, or
/// fewer than two rows where both values are present).
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Mat<f64>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }
}

/// Threshold for auto-selecting matrix vs pairwise correlation computation.
/// Matrix multiplication is more efficient when there are many columns.
const MATRIX_METHOD_COLUMN_THRESHOLD: usize = 15;

/// Compute the correlation matrix of all numeric columns, in column order.
///
/// Uses a single matrix product when there are many columns and none of them
/// contain nulls; otherwise falls back to pairwise-complete correlation, one
/// pair per rayon task.
pub fn correlation_matrix(df: &DataFrame) -> Result<CorrelationMatrix> {
    let names = numeric_column_names(df);
    let columns = extract_float_columns(df, &names)?;
    let has_nulls = columns.iter().any(|c| c.iter().any(Option::is_none));

    let values = if names.len() >= MATRIX_METHOD_COLUMN_THRESHOLD && !has_nulls {
        let dense: Vec<Vec<f64>> = columns
            .iter()
            .map(|c| c.iter().map(|v| v.unwrap_or(0.0)).collect())
            .collect();
        compute_correlation_matrix_fast(&dense)
    } else {
        compute_correlation_matrix_pairwise(&columns)
    };

    Ok(CorrelationMatrix {
        columns: names,
        values,
    })
}

/// Columns to drop as redundant under the greedy upper-triangle rule.
///
/// Column `j` is dropped when any earlier column `i` (whether or not `i` is
/// itself dropped) has `|corr(i, j)| > threshold`. The first member of a
/// correlated chain therefore survives and every later member goes, even if
/// it only correlates with an already dropped column. NaN correlations never
/// trigger a drop. Results are returned in column order.
pub fn select_redundant(df: &DataFrame, threshold: f64) -> Result<Vec<String>> {
    validate_threshold(threshold)?;

    let numeric = numeric_column_names(df);
    if numeric.len() < 2 {
        return Ok(Vec::new());
    }

    let matrix = correlation_matrix(df)?;
    Ok(redundant_from_matrix(&matrix, threshold))
}

/// Apply the greedy upper-triangle rule to a precomputed matrix.
pub fn redundant_from_matrix(matrix: &CorrelationMatrix, threshold: f64) -> Vec<String> {
    let n = matrix.len();
    (1..n)
        .filter(|&j| (0..j).any(|i| exceeds(matrix.get(i, j), threshold)))
        .map(|j| matrix.columns[j].clone())
        .collect()
}

/// Find all pairs whose absolute correlation exceeds `threshold`,
/// sorted by absolute correlation descending.
pub fn find_correlated_pairs(df: &DataFrame, threshold: f64) -> Result<Vec<CorrelatedPair>> {
    validate_threshold(threshold)?;

    let matrix = correlation_matrix(df)?;
    let n = matrix.len();

    let mut pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let corr = matrix.get(i, j);
            if exceeds(corr, threshold) {
                pairs.push(CorrelatedPair {
                    feature1: matrix.columns[i].clone(),
                    feature2: matrix.columns[j].clone(),
                    correlation: corr,
                });
            }
        }
    }

    pairs.sort_by(|a, b| {
        b.correlation
            .abs()
            .partial_cmp(&a.correlation.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(pairs)
}

fn exceeds(corr: f64, threshold: f64) -> bool {
    !corr.is_nan() && corr.abs() > threshold
}

fn validate_threshold(threshold: f64) -> Result<(), TableError> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(TableError::InvalidThreshold {
            name: "correlation threshold",
            range: "(0, 1]",
            value: threshold,
        })
    }
}

/// Cast the named columns to `f64` and pull their values out.
fn extract_float_columns(df: &DataFrame, names: &[String]) -> Result<Vec<Vec<Option<f64>>>> {
    names
        .iter()
        .map(|name| {
            let series = df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            let values = series
                .f64()?
                .iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();
            Ok(values)
        })
        .collect()
}

/// Pairwise-complete Pearson correlation for every upper-triangle pair.
fn compute_correlation_matrix_pairwise(columns: &[Vec<Option<f64>>]) -> Mat<f64> {
    let n = columns.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();

    let computed: Vec<(usize, usize, f64)> = pairs
        .par_iter()
        .map(|&(i, j)| {
            let corr = compute_pearson_correlation(&columns[i], &columns[j]).unwrap_or(f64::NAN);
            (i, j, corr)
        })
        .collect();

    let mut matrix = Mat::<f64>::from_fn(n, n, |i, j| if i == j { 1.0 } else { f64::NAN });
    for (i, j, corr) in computed {
        matrix[(i, j)] = corr;
        matrix[(j, i)] = corr;
    }
    matrix
}

/// Pearson correlation using Welford's single-pass algorithm over the rows
/// where both values are present.
fn compute_pearson_correlation(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let mut n = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;

    for (x, y) in xs.iter().zip(ys.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            n += 1.0;
            let dx = x - mean_x;
            let dy = y - mean_y;
            mean_x += dx / n;
            mean_y += dy / n;
            var_x += dx * (x - mean_x);
            var_y += dy * (y - mean_y);
            cov_xy += dx * (y - mean_y);
        }
    }

    if n < 2.0 || var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    let corr = cov_xy / (var_x.sqrt() * var_y.sqrt());
    Some(corr.clamp(-1.0, 1.0))
}

/// Correlation matrix via `R = Z^T Z` on standardised, null-free columns.
///
/// Constant columns are left out of the product and get NaN entries.
fn compute_correlation_matrix_fast(columns: &[Vec<f64>]) -> Mat<f64> {
    let n_cols = columns.len();
    let n_rows = columns.first().map(Vec::len).unwrap_or(0);

    let standardized: Vec<Option<Vec<f64>>> = columns
        .par_iter()
        .map(|col| {
            if n_rows < 2 {
                return None;
            }
            let first = col[0];
            if col.iter().all(|&x| x == first) {
                return None;
            }
            let count = n_rows as f64;
            let mean = col.iter().sum::<f64>() / count;
            let ss: f64 = col.iter().map(|x| (x - mean) * (x - mean)).sum();
            if ss <= 0.0 {
                return None;
            }
            let norm = ss.sqrt();
            Some(col.iter().map(|x| (x - mean) / norm).collect())
        })
        .collect();

    let valid: Vec<usize> = standardized
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.as_ref().map(|_| i))
        .collect();

    let mut z = Mat::<f64>::zeros(n_rows, valid.len());
    for (col_idx, &orig) in valid.iter().enumerate() {
        if let Some(values) = &standardized[orig] {
            for (row_idx, &v) in values.iter().enumerate() {
                z[(row_idx, col_idx)] = v;
            }
        }
    }
    let product = z.transpose() * &z;

    let mut matrix = Mat::<f64>::from_fn(n_cols, n_cols, |i, j| if i == j { 1.0 } else { f64::NAN });
    for (a, &i) in valid.iter().enumerate() {
        for (b, &j) in valid.iter().enumerate() {
            if i != j {
                matrix[(i, j)] = product[(a, b)].clamp(-1.0, 1.0);
            }
        }
    }
    matrix
}
