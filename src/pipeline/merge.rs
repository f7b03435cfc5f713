//! Multi-table merge engine
//!
//! Joins an ordered list of per-metric tables on a compound key, renaming
//! colliding non-key columns with a source-derived suffix, and stacks
//! same-metric tables from several leagues into one union table.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::loader::{list_table_files, TableSink, TableSource};
use super::table::{key_tuples, table_from_columns, validate_keys, ColumnKind, TableError};

/// A table together with the identifier of the source it came from.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub frame: DataFrame,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }
}

/// Join semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinHow {
    /// Only key tuples present on both sides.
    #[default]
    Inner,
    /// Every left row; unmatched right cells become null.
    Left,
    /// Union of key tuples; missing cells become null.
    Outer,
}

impl std::str::FromStr for JoinHow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinHow::Inner),
            "left" => Ok(JoinHow::Left),
            "outer" | "full" => Ok(JoinHow::Outer),
            other => Err(format!("unknown join type '{other}' (expected inner, left or outer)")),
        }
    }
}

impl std::fmt::Display for JoinHow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JoinHow::Inner => "inner",
            JoinHow::Left => "left",
            JoinHow::Outer => "outer",
        };
        f.write_str(name)
    }
}

/// Bookkeeping for one fold step of [`merge_tables`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinStep {
    pub source: String,
    pub rows_left: usize,
    pub rows_right: usize,
    pub rows_out: usize,
    /// `(original, renamed)` for every colliding column of the right side.
    pub renamed: Vec<(String, String)>,
    /// Key tuples occurring more than once on the accumulated side.
    pub duplicate_keys_left: usize,
    /// Key tuples occurring more than once on the incoming side.
    pub duplicate_keys_right: usize,
    /// Rows produced beyond one per matched key tuple.
    pub fanout_rows: usize,
}

impl JoinStep {
    /// A duplicated key on either side means cartesian expansion may occur.
    pub fn is_degenerate(&self) -> bool {
        self.duplicate_keys_left > 0 || self.duplicate_keys_right > 0
    }
}

/// Output of [`merge_tables`].
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub frame: DataFrame,
    /// Tables that took part, in fold order.
    pub sources: Vec<String>,
    /// Tables removed by the exclusion predicate.
    pub excluded: Vec<String>,
    pub joins: Vec<JoinStep>,
}

impl MergeOutcome {
    pub fn degenerate_joins(&self) -> impl Iterator<Item = &JoinStep> {
        self.joins.iter().filter(|j| j.is_degenerate())
    }
}

/// Exclusion used for team statistics: goalkeeping and overall tables are
/// aggregated at a different granularity.
pub fn default_exclude(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("overall") || lower.contains("goalkeeping")
}

/// Build an exclusion predicate from case-insensitive name substrings.
pub fn exclude_containing(needles: &[String]) -> impl Fn(&str) -> bool + '_ {
    move |name: &str| {
        let lower = name.to_lowercase();
        needles.iter().any(|n| lower.contains(&n.to_lowercase()))
    }
}

/// Join `tables` left to right on `keys`.
///
/// Tables whose name satisfies `exclude` are skipped. Key columns appear once,
/// first, in `keys` order. A right-hand non-key column whose name is already
/// taken becomes `<name>__<source>`, with a numeric suffix if needed.
pub fn merge_tables(
    tables: Vec<NamedTable>,
    keys: &[String],
    how: JoinHow,
    exclude: Option<&dyn Fn(&str) -> bool>,
) -> Result<MergeOutcome> {
    let (kept, excluded): (Vec<NamedTable>, Vec<NamedTable>) = tables
        .into_iter()
        .partition(|t| !exclude.map(|f| f(&t.name)).unwrap_or(false));
    let excluded: Vec<String> = excluded.into_iter().map(|t| t.name).collect();

    let mut iter = kept.into_iter();
    let first = iter.next().ok_or_else(|| TableError::NoSourcesFound {
        dir: PathBuf::from("<memory>"),
    })?;

    validate_keys(&first.frame, keys, &first.name)?;
    let mut sources = vec![first.name.clone()];
    let mut acc = keys_first(&first.frame, keys)?;
    let mut joins = Vec::new();

    for right in iter {
        validate_keys(&right.frame, keys, &right.name)?;
        let (frame, step) = join_pair(&acc, &right, keys, how)
            .with_context(|| format!("Failed to join table '{}'", right.name))?;
        acc = frame;
        sources.push(right.name);
        joins.push(step);
    }

    Ok(MergeOutcome {
        frame: acc,
        sources,
        excluded,
        joins,
    })
}

/// Reorder so the key columns come first.
fn keys_first(df: &DataFrame, keys: &[String]) -> Result<DataFrame> {
    let mut columns: Vec<Column> = keys
        .iter()
        .map(|k| df.column(k.as_str()).cloned())
        .collect::<PolarsResult<_>>()?;
    columns.extend(
        df.get_columns()
            .iter()
            .filter(|c| !keys.iter().any(|k| k == c.name().as_str()))
            .cloned(),
    );
    Ok(table_from_columns(columns)?)
}

fn index_by_key(tuples: Vec<Vec<String>>) -> (HashMap<Vec<String>, Vec<IdxSize>>, usize) {
    let mut index: HashMap<Vec<String>, Vec<IdxSize>> = HashMap::new();
    for (row, tuple) in tuples.into_iter().enumerate() {
        index.entry(tuple).or_default().push(row as IdxSize);
    }
    let duplicates = index.values().filter(|rows| rows.len() > 1).count();
    (index, duplicates)
}

/// Pick a name for `name` that collides with nothing in `taken`.
fn disambiguate(name: &str, source: &str, taken: &HashSet<String>) -> String {
    let base = format!("{name}__{source}");
    if !taken.contains(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}__{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn join_pair(
    left: &DataFrame,
    right: &NamedTable,
    keys: &[String],
    how: JoinHow,
) -> Result<(DataFrame, JoinStep)> {
    let left_tuples = key_tuples(left, keys)?;
    let right_tuples = key_tuples(&right.frame, keys)?;
    let (left_index, duplicate_keys_left) = index_by_key(left_tuples.clone());
    let (right_index, duplicate_keys_right) = index_by_key(right_tuples.clone());

    let mut left_rows: Vec<Option<IdxSize>> = Vec::new();
    let mut right_rows: Vec<Option<IdxSize>> = Vec::new();
    let mut matched_right: HashSet<&Vec<String>> = HashSet::new();

    for (row, tuple) in left_tuples.iter().enumerate() {
        match right_index.get(tuple) {
            Some(matches) => {
                matched_right.insert(tuple);
                for &r in matches {
                    left_rows.push(Some(row as IdxSize));
                    right_rows.push(Some(r));
                }
            }
            None if how != JoinHow::Inner => {
                left_rows.push(Some(row as IdxSize));
                right_rows.push(None);
            }
            None => {}
        }
    }

    if how == JoinHow::Outer {
        for (row, tuple) in right_tuples.iter().enumerate() {
            if !left_index.contains_key(tuple) {
                left_rows.push(None);
                right_rows.push(Some(row as IdxSize));
            }
        }
    }

    // One row per matched key tuple is the expectation; anything above is fan-out.
    let matched_pairs: usize = matched_right
        .iter()
        .map(|t| left_index[*t].len() * right_index[*t].len())
        .sum();
    let fanout_rows = matched_pairs - matched_right.len();

    let left_idx: IdxCa = left_rows.iter().copied().collect();
    let right_idx: IdxCa = right_rows.iter().copied().collect();
    let left_taken = left.take(&left_idx)?;
    let right_taken = right.frame.take(&right_idx)?;

    let mut taken: HashSet<String> = left
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    let mut renamed = Vec::new();
    let mut columns: Vec<Column> = Vec::with_capacity(left.width() + right.frame.width());

    // Rows with a left side come first; right-only rows (outer) follow.
    let split = left_rows.iter().take_while(|r| r.is_some()).count();
    for key in keys {
        let l = left.column(key.as_str())?.as_materialized_series();
        let head: IdxCa = left_rows[..split].iter().copied().collect();
        let mut merged = l.take(&head)?;
        if split < right_rows.len() {
            let r = right
                .frame
                .column(key.as_str())?
                .as_materialized_series()
                .cast(l.dtype())?;
            let tail: IdxCa = right_rows[split..].iter().copied().collect();
            merged.append(&r.take(&tail)?)?;
        }
        columns.push(merged.into_column());
    }
    columns.extend(
        left_taken
            .get_columns()
            .iter()
            .filter(|c| !keys.iter().any(|k| k == c.name().as_str()))
            .cloned(),
    );

    for column in right_taken.get_columns() {
        let name = column.name().to_string();
        if keys.contains(&name) {
            continue;
        }
        let mut column = column.clone();
        if taken.contains(&name) {
            let new_name = disambiguate(&name, &right.name, &taken);
            column.rename(new_name.as_str().into());
            renamed.push((name, new_name.clone()));
            taken.insert(new_name);
        } else {
            taken.insert(name);
        }
        columns.push(column);
    }

    let frame = table_from_columns(columns)?;
    let step = JoinStep {
        source: right.name.clone(),
        rows_left: left.height(),
        rows_right: right.frame.height(),
        rows_out: frame.height(),
        renamed,
        duplicate_keys_left,
        duplicate_keys_right,
        fanout_rows,
    };

    Ok((frame, step))
}

/// Load every table file in `dir` (file-name order), merge, and save.
pub fn merge_directory(
    source: &dyn TableSource,
    sink: &dyn TableSink,
    dir: &Path,
    output: &Path,
    keys: &[String],
    how: JoinHow,
    exclude: Option<&dyn Fn(&str) -> bool>,
) -> Result<MergeOutcome> {
    let files = list_table_files(dir)?;

    let mut tables = Vec::with_capacity(files.len());
    for path in &files {
        let name = table_stem(path);
        if exclude.map(|f| f(&name)).unwrap_or(false) {
            continue;
        }
        let frame = source.load(path)?;
        tables.push(NamedTable::new(name, frame));
    }

    if tables.is_empty() {
        return Err(TableError::NoSourcesFound {
            dir: dir.to_path_buf(),
        }
        .into());
    }

    let mut outcome = merge_tables(tables, keys, how, None)?;
    outcome.excluded = files
        .iter()
        .map(|p| table_stem(p))
        .filter(|n| exclude.map(|f| f(n)).unwrap_or(false))
        .collect();

    sink.save(&outcome.frame, output)?;
    Ok(outcome)
}

/// File stem used as a table's source identifier.
pub fn table_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string()
}

/// Output of [`concat_tables`].
#[derive(Debug, Clone)]
pub struct ConcatOutcome {
    pub frame: DataFrame,
    /// Columns present in every input.
    pub common_columns: Vec<String>,
    /// Columns missing from at least one input.
    pub differing_columns: Vec<String>,
}

/// Stack tables vertically, taking the union of their columns.
///
/// Columns keep first-seen order. Cells a table does not have become null.
/// When inputs disagree on a column's type, numeric types widen to `Float64`
/// and anything else to `String`.
pub fn concat_tables(tables: &[DataFrame]) -> Result<ConcatOutcome> {
    let mut order: Vec<String> = Vec::new();
    let mut dtypes: HashMap<String, DataType> = HashMap::new();
    let mut presence: HashMap<String, usize> = HashMap::new();

    for df in tables {
        for column in df.get_columns() {
            let name = column.name().to_string();
            *presence.entry(name.clone()).or_insert(0) += 1;
            match dtypes.get(&name) {
                None => {
                    order.push(name.clone());
                    dtypes.insert(name, column.dtype().clone());
                }
                Some(existing) if existing != column.dtype() => {
                    let widened = widen(existing, column.dtype());
                    dtypes.insert(name, widened);
                }
                Some(_) => {}
            }
        }
    }

    let (common_columns, differing_columns): (Vec<String>, Vec<String>) = order
        .iter()
        .cloned()
        .partition(|name| presence.get(name).copied() == Some(tables.len()));

    let mut stacked: Option<DataFrame> = None;
    for df in tables {
        let columns: Vec<Column> = order
            .iter()
            .map(|name| {
                let dtype = &dtypes[name];
                match df.column(name.as_str()) {
                    Ok(c) => c.cast(dtype),
                    Err(_) => Ok(Column::full_null(name.as_str().into(), df.height(), dtype)),
                }
            })
            .collect::<PolarsResult<_>>()?;
        let aligned = table_from_columns(columns)?;
        stacked = Some(match stacked {
            None => aligned,
            Some(mut acc) => {
                acc.vstack_mut(&aligned)?;
                acc
            }
        });
    }

    let mut frame = stacked.unwrap_or_else(DataFrame::empty);
    frame.as_single_chunk_par();

    Ok(ConcatOutcome {
        frame,
        common_columns,
        differing_columns,
    })
}

fn widen(a: &DataType, b: &DataType) -> DataType {
    if a == &DataType::Null {
        return b.clone();
    }
    if b == &DataType::Null {
        return a.clone();
    }
    if ColumnKind::of(a) == ColumnKind::Numeric && ColumnKind::of(b) == ColumnKind::Numeric {
        DataType::Float64
    } else {
        DataType::String
    }
}
