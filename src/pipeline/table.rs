//! Table model helpers shared by every pipeline stage
//!
//! A table is a polars `DataFrame`. This module adds the small amount of
//! schema vocabulary the stages need: column kinds, derived column
//! descriptors, key validation and the crate's error type.

use std::path::PathBuf;

use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the table-level operations of the library.
#[derive(Debug, Error)]
pub enum TableError {
    /// A join key column is absent from one of the tables.
    #[error("table '{table}' has no join key column '{column}'")]
    MissingKeyColumn { table: String, column: String },

    /// A join key column contains null cells.
    #[error("table '{table}' has {count} null value(s) in join key column '{column}'")]
    NullKey {
        table: String,
        column: String,
        count: usize,
    },

    /// Columns of unequal length were assembled into one table.
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A directory scan produced nothing to merge.
    #[error("no tables found to merge in {}", .dir.display())]
    NoSourcesFound { dir: PathBuf },

    /// A threshold outside its allowed range.
    #[error("{name} must be in {range}, got {value}")]
    InvalidThreshold {
        name: &'static str,
        range: &'static str,
        value: f64,
    },

    /// A file extension the loader does not understand.
    #[error("unsupported file format '{extension}' (supported: csv, parquet)")]
    UnsupportedFormat { extension: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    pub fn of(dtype: &DataType) -> Self {
        if dtype.is_primitive_numeric() {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }
}

/// Derived description of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
}

/// Describe every column of a table, in column order.
pub fn describe_columns(df: &DataFrame) -> Vec<ColumnDescriptor> {
    df.get_columns()
        .iter()
        .map(|col| ColumnDescriptor {
            name: col.name().to_string(),
            kind: ColumnKind::of(col.dtype()),
            nullable: col.null_count() > 0,
        })
        .collect()
}

/// Names of the numeric columns, in column order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    names_of_kind(df, ColumnKind::Numeric)
}

/// Names of the text/categorical columns, in column order.
pub fn text_column_names(df: &DataFrame) -> Vec<String> {
    names_of_kind(df, ColumnKind::Text)
}

fn names_of_kind(df: &DataFrame, kind: ColumnKind) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| ColumnKind::of(col.dtype()) == kind)
        .map(|col| col.name().to_string())
        .collect()
}

/// Return a new table without the named columns. Unknown names are ignored.
pub fn drop_columns(df: &DataFrame, names: &[String]) -> DataFrame {
    if names.is_empty() {
        return df.clone();
    }
    df.drop_many(names.iter().map(|s| s.as_str()))
}

/// Build a table from columns, checking that every column has the same length.
pub fn table_from_columns(columns: Vec<Column>) -> Result<DataFrame, TableError> {
    if let Some(first) = columns.first() {
        let expected = first.len();
        if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
            return Err(TableError::LengthMismatch {
                column: bad.name().to_string(),
                expected,
                actual: bad.len(),
            });
        }
    }
    Ok(DataFrame::new(columns)?)
}

/// Check that every key column is present and free of nulls.
pub fn validate_keys(df: &DataFrame, keys: &[String], table: &str) -> Result<(), TableError> {
    for key in keys {
        let column = df
            .column(key)
            .map_err(|_| TableError::MissingKeyColumn {
                table: table.to_string(),
                column: key.clone(),
            })?;
        let nulls = column.null_count();
        if nulls > 0 {
            return Err(TableError::NullKey {
                table: table.to_string(),
                column: key.clone(),
                count: nulls,
            });
        }
    }
    Ok(())
}

/// Render the key columns of a table as one string tuple per row.
///
/// Key values are compared textually so that a season stored as an integer in
/// one table still matches the same season stored as a string in another.
pub fn key_tuples(df: &DataFrame, keys: &[String]) -> Result<Vec<Vec<String>>, TableError> {
    let height = df.height();
    let mut tuples: Vec<Vec<String>> = vec![Vec::with_capacity(keys.len()); height];

    for key in keys {
        let as_text = df
            .column(key)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let ca = as_text.str()?;
        for (tuple, value) in tuples.iter_mut().zip(ca.iter()) {
            tuple.push(value.unwrap_or_default().to_string());
        }
    }

    Ok(tuples)
}
