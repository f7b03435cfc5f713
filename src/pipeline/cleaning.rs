//! Feature selection pipeline
//!
//! Prunes a table down to the numeric columns worth keeping for clustering.
//! Stages run in a fixed order and each one sees the table left by the
//! previous stage, so statistics are recomputed on a shrinking column set:
//!
//! 1. text/id columns (except those listed in `drop_exact`)
//! 2. columns whose non-null distinct count equals the row count
//! 3. columns whose missing fraction exceeds `miss_thresh`
//! 4. text columns dominated by one value (nulls count as a value)
//! 5. numeric columns with variance at or below `zero_var_thresh`
//! 6. numeric columns redundant under the greedy correlation rule
//! 7. name patterns, then every `drop_exact` name
//!
//! The strict variant appends two more stages removing player-count (`Pl`)
//! and age columns, which do not aggregate comparably across leagues.

use std::collections::HashMap;

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::correlation::select_redundant;
use super::missing::{analyze_missing_values, get_features_above_threshold};
use super::table::{
    drop_columns, numeric_column_names, table_from_columns, text_column_names, TableError,
};

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Text,
    Unique,
    Missing,
    Dominant,
    Variance,
    Correlation,
    Pattern,
    Exact,
    PlayerCount,
    Age,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Text => "Text / ID",
            Stage::Unique => "Unique values",
            Stage::Missing => "High missing",
            Stage::Dominant => "Dominant category",
            Stage::Variance => "Near-zero variance",
            Stage::Correlation => "High correlation",
            Stage::Pattern => "Name pattern",
            Stage::Exact => "Explicit drop",
            Stage::PlayerCount => "Player count (Pl)",
            Stage::Age => "Age",
        }
    }
}

/// Per-stage switches. Everything is on by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    pub text: bool,
    pub unique: bool,
    pub missing: bool,
    pub dominant: bool,
    pub variance: bool,
    pub correlation: bool,
    pub names: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            text: true,
            unique: true,
            missing: true,
            dominant: true,
            variance: true,
            correlation: true,
            names: true,
        }
    }
}

/// Thresholds and name lists driving [`clean`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Drop columns whose null fraction is strictly above this.
    pub miss_thresh: f64,
    /// Drop text columns whose most frequent value share is strictly above this.
    pub dom_thresh: f64,
    /// Drop numeric columns whose variance is at or below this.
    pub zero_var_thresh: f64,
    /// Correlation threshold handed to the redundancy pruner.
    pub corr_thresh: f64,
    /// Case-sensitive substrings; any matching column is dropped.
    pub drop_name_patterns: Vec<String>,
    /// Kept through the text stage, then dropped unconditionally at the end.
    pub drop_exact: Vec<String>,
    /// Also drop `Pl` and `Age` columns (case-insensitive).
    pub strict: bool,
    pub stages: StageToggles,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            miss_thresh: 0.5,
            dom_thresh: 0.95,
            zero_var_thresh: 0.0,
            corr_thresh: 0.9999,
            drop_name_patterns: Vec::new(),
            drop_exact: Vec::new(),
            strict: false,
            stages: StageToggles::default(),
        }
    }
}

impl CleaningConfig {
    pub fn with_miss_thresh(mut self, value: f64) -> Self {
        self.miss_thresh = value;
        self
    }

    pub fn with_dom_thresh(mut self, value: f64) -> Self {
        self.dom_thresh = value;
        self
    }

    pub fn with_zero_var_thresh(mut self, value: f64) -> Self {
        self.zero_var_thresh = value;
        self
    }

    pub fn with_corr_thresh(mut self, value: f64) -> Self {
        self.corr_thresh = value;
        self
    }

    pub fn with_patterns<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.drop_name_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_drop_exact<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.drop_exact = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Check every threshold is inside its meaningful range.
    pub fn validate(&self) -> Result<(), TableError> {
        let unit = |name: &'static str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(TableError::InvalidThreshold {
                    name,
                    range: "[0, 1]",
                    value,
                })
            }
        };
        unit("miss_thresh", self.miss_thresh)?;
        unit("dom_thresh", self.dom_thresh)?;
        if self.zero_var_thresh < 0.0 || self.zero_var_thresh.is_nan() {
            return Err(TableError::InvalidThreshold {
                name: "zero_var_thresh",
                range: "[0, inf)",
                value: self.zero_var_thresh,
            });
        }
        if !(self.corr_thresh > 0.0 && self.corr_thresh <= 1.0) {
            return Err(TableError::InvalidThreshold {
                name: "corr_thresh",
                range: "(0, 1]",
                value: self.corr_thresh,
            });
        }
        Ok(())
    }
}

/// Columns removed by one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageDrops {
    pub stage: Stage,
    pub columns: Vec<String>,
}

/// Columns removed by a pipeline run, grouped by stage in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DropReport {
    pub initial_columns: usize,
    pub final_columns: usize,
    pub stages: Vec<StageDrops>,
}

impl DropReport {
    fn record(&mut self, stage: Stage, columns: Vec<String>) {
        self.stages.push(StageDrops { stage, columns });
    }

    /// Columns dropped by `stage`; empty if the stage did not run.
    pub fn dropped_by(&self, stage: Stage) -> &[String] {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.columns.as_slice())
            .unwrap_or(&[])
    }

    /// True when `stage` ran, whether or not it removed anything.
    pub fn ran(&self, stage: Stage) -> bool {
        self.stages.iter().any(|s| s.stage == stage)
    }

    pub fn total_dropped(&self) -> usize {
        self.stages.iter().map(|s| s.columns.len()).sum()
    }
}

/// Output of [`clean`].
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub frame: DataFrame,
    pub report: DropReport,
}

/// Run every enabled stage over `df` and return the reduced table.
pub fn clean(df: &DataFrame, config: &CleaningConfig) -> Result<CleaningOutcome> {
    config.validate()?;

    let toggles = &config.stages;
    let mut report = DropReport {
        initial_columns: df.width(),
        ..Default::default()
    };
    let mut current = df.clone();

    let mut apply = |stage: Stage, to_drop: Vec<String>, frame: &mut DataFrame| {
        *frame = drop_columns(frame, &to_drop);
        report.record(stage, to_drop);
    };

    if toggles.text {
        let to_drop = text_id_columns(&current, &config.drop_exact);
        apply(Stage::Text, to_drop, &mut current);
    }

    if toggles.unique {
        let to_drop = unique_columns(&current)?;
        apply(Stage::Unique, to_drop, &mut current);
    }

    if toggles.missing {
        let ratios = analyze_missing_values(&current);
        let mut to_drop = get_features_above_threshold(&ratios, config.miss_thresh);
        sort_by_position(&current, &mut to_drop);
        apply(Stage::Missing, to_drop, &mut current);
    }

    if toggles.dominant {
        let to_drop = dominant_category_columns(&current, config.dom_thresh)?;
        apply(Stage::Dominant, to_drop, &mut current);
    }

    if toggles.variance {
        let to_drop = low_variance_columns(&current, config.zero_var_thresh)?;
        apply(Stage::Variance, to_drop, &mut current);
    }

    if toggles.correlation {
        let to_drop = select_redundant(&current, config.corr_thresh)?;
        apply(Stage::Correlation, to_drop, &mut current);
    }

    if toggles.names {
        let to_drop = pattern_columns(&current, &config.drop_name_patterns);
        apply(Stage::Pattern, to_drop, &mut current);

        let to_drop = exact_columns(&current, &config.drop_exact);
        apply(Stage::Exact, to_drop, &mut current);
    }

    if config.strict {
        let to_drop = columns_containing_ignore_case(&current, "pl");
        apply(Stage::PlayerCount, to_drop, &mut current);

        let to_drop = columns_containing_ignore_case(&current, "age");
        apply(Stage::Age, to_drop, &mut current);
    }

    report.final_columns = current.width();

    Ok(CleaningOutcome {
        frame: current,
        report,
    })
}

/// Like [`clean`], but the `keys` columns bypass every stage and are put back
/// in front of the surviving features.
pub fn clean_keep_keys(
    df: &DataFrame,
    keys: &[String],
    config: &CleaningConfig,
) -> Result<CleaningOutcome> {
    let present: Vec<String> = keys
        .iter()
        .filter(|k| df.column(k.as_str()).is_ok())
        .cloned()
        .collect();

    let features = drop_columns(df, &present);
    let outcome = clean(&features, config)?;

    let mut columns: Vec<Column> = present
        .iter()
        .map(|k| df.column(k.as_str()).cloned())
        .collect::<PolarsResult<_>>()?;
    columns.extend(outcome.frame.get_columns().iter().cloned());

    let frame = if columns.is_empty() {
        outcome.frame
    } else {
        table_from_columns(columns)?
    };

    Ok(CleaningOutcome {
        frame,
        report: outcome.report,
    })
}

/// Stage 1: text/categorical columns not listed in `exempt`.
pub fn text_id_columns(df: &DataFrame, exempt: &[String]) -> Vec<String> {
    text_column_names(df)
        .into_iter()
        .filter(|name| !exempt.contains(name))
        .collect()
}

/// Stage 2: columns whose non-null distinct count equals the row count.
pub fn unique_columns(df: &DataFrame) -> Result<Vec<String>> {
    let height = df.height();
    let mut out = Vec::new();
    for column in df.get_columns() {
        let distinct = column.as_materialized_series().drop_nulls().n_unique()?;
        if distinct == height {
            out.push(column.name().to_string());
        }
    }
    Ok(out)
}

/// Stage 4: text columns where the most frequent value (null included) takes
/// more than `threshold` of the rows.
pub fn dominant_category_columns(df: &DataFrame, threshold: f64) -> Result<Vec<String>> {
    let height = df.height();
    if height == 0 {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for name in text_column_names(df) {
        let as_text = df
            .column(&name)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let mut counts: HashMap<Option<&str>, usize> = HashMap::new();
        for value in as_text.str()?.iter() {
            *counts.entry(value).or_insert(0) += 1;
        }
        let top = counts.values().copied().max().unwrap_or(0);
        if top as f64 / height as f64 > threshold {
            out.push(name);
        }
    }
    Ok(out)
}

/// Population variance of the non-null values, or `None` when there are none.
pub fn column_variance(column: &Column) -> Result<Option<f64>> {
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    let values: Vec<f64> = series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();

    if values.is_empty() {
        return Ok(None);
    }
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    // Rounding in the mean leaves a tiny positive variance on constant columns
    if max == min {
        return Ok(Some(0.0));
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Ok(Some(var))
}

/// Stage 5: numeric columns with variance at or below `threshold`.
/// All-null numeric columns have no variance and are dropped too.
pub fn low_variance_columns(df: &DataFrame, threshold: f64) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for name in numeric_column_names(df) {
        let keep = match column_variance(df.column(&name)?)? {
            Some(var) => var > threshold,
            None => false,
        };
        if !keep {
            out.push(name);
        }
    }
    Ok(out)
}

/// Stage 7a: columns containing any pattern (case-sensitive).
pub fn pattern_columns(df: &DataFrame, patterns: &[String]) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| patterns.iter().any(|p| name.as_str().contains(p.as_str())))
        .map(|name| name.to_string())
        .collect()
}

/// Stage 7b: the `drop_exact` names still present.
pub fn exact_columns(df: &DataFrame, names: &[String]) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| names.iter().any(|n| n == name.as_str()))
        .map(|name| name.to_string())
        .collect()
}

/// Strict stages: columns whose name contains `needle`, ignoring case.
pub fn columns_containing_ignore_case(df: &DataFrame, needle: &str) -> Vec<String> {
    let needle = needle.to_lowercase();
    df.get_column_names()
        .into_iter()
        .filter(|name| name.as_str().to_lowercase().contains(&needle))
        .map(|name| name.to_string())
        .collect()
}

fn sort_by_position(df: &DataFrame, names: &mut [String]) {
    let order: HashMap<&str, usize> = df
        .get_column_names()
        .into_iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    names.sort_by_key(|n| order.get(n.as_str()).copied().unwrap_or(usize::MAX));
}
