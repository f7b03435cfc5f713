//! End-to-end run: ingest league folders, clean each metric, merge.
//!
//! Layout produced under `output_dir`:
//!
//! ```text
//! merged_not_cleaned/<metric>.csv     union of one metric across leagues
//! cleaned/<metric>.csv                the same after feature selection
//! merged/all_metrics_with_keys.csv    all cleaned metrics joined on the keys
//! merged/all_metrics.csv              the feature matrix without keys
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::cleaning::{clean_keep_keys, CleaningConfig, DropReport};
use super::loader::{list_table_files, TableSink, TableSource};
use super::merge::{
    concat_tables, exclude_containing, merge_tables, table_stem, JoinHow, JoinStep, NamedTable,
};
use super::season::{attach_season_columns, SourceLeague, LEAGUE_COLUMN, SEASON_COLUMN};
use super::table::{drop_columns, validate_keys, TableError};

/// Canonical squad key column.
pub const SQUAD_COLUMN: &str = "squad";

/// One folder of raw per-metric tables for a single league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSource {
    pub label: String,
    pub dir: PathBuf,
}

impl std::str::FromStr for LeagueSource {
    type Err = String;

    /// Parse `LABEL=DIR`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, dir) = s
            .split_once('=')
            .ok_or_else(|| format!("expected LABEL=DIR, got '{s}'"))?;
        let label = label.trim();
        let dir = dir.trim();
        if label.is_empty() || dir.is_empty() {
            return Err(format!("expected LABEL=DIR, got '{s}'"));
        }
        Ok(LeagueSource {
            label: label.to_string(),
            dir: PathBuf::from(dir),
        })
    }
}

/// Everything a run needs; passed in explicitly, never read from globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub sources: Vec<LeagueSource>,
    pub output_dir: PathBuf,
    /// Raw season column name in the source tables.
    pub season_column: String,
    /// Raw squad column name in the source tables.
    pub squad_column: String,
    pub how: JoinHow,
    pub cleaning: CleaningConfig,
    /// Use the strict variant for the pass over the merged table.
    pub final_strict: bool,
    /// Columns removed right after loading; absent names are ignored.
    pub drop_columns: Vec<String>,
    /// Case-insensitive substrings of metric names left out of the merge.
    pub exclude: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output_dir: PathBuf::from("output"),
            season_column: "Season".to_string(),
            squad_column: "Squad".to_string(),
            how: JoinHow::Inner,
            cleaning: CleaningConfig::default(),
            final_strict: false,
            drop_columns: Vec::new(),
            exclude: vec!["overall".to_string(), "goalkeeping".to_string()],
        }
    }
}

impl DriverConfig {
    /// Load a config from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Join keys of every ingested table.
    pub fn keys(&self) -> Vec<String> {
        vec![
            SEASON_COLUMN.to_string(),
            SQUAD_COLUMN.to_string(),
            LEAGUE_COLUMN.to_string(),
        ]
    }

    pub fn not_cleaned_dir(&self) -> PathBuf {
        self.output_dir.join("merged_not_cleaned")
    }

    pub fn cleaned_dir(&self) -> PathBuf {
        self.output_dir.join("cleaned")
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.output_dir.join("merged")
    }

    pub fn merged_with_keys_path(&self) -> PathBuf {
        self.merged_dir().join("all_metrics_with_keys.csv")
    }

    pub fn feature_matrix_path(&self) -> PathBuf {
        self.merged_dir().join("all_metrics.csv")
    }
}

/// A file that could not be ingested or cleaned.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub league: String,
    pub path: PathBuf,
    pub error: String,
}

/// One ingested raw table.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedTable {
    pub league: String,
    pub metric: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub unrecognized_seasons: Vec<String>,
    pub replaced_columns: Vec<String>,
}

/// Per-metric union and cleaning result.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub metric: String,
    pub leagues: Vec<String>,
    pub rows: usize,
    pub differing_columns: Vec<String>,
    pub drops: DropReport,
    pub cleaned_path: PathBuf,
}

/// What happened during [`run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub ingested: Vec<IngestedTable>,
    pub failures: Vec<SourceFailure>,
    pub metrics: Vec<MetricSummary>,
    pub excluded: Vec<String>,
    pub joins: Vec<JoinStep>,
    pub final_drops: DropReport,
    pub final_rows: usize,
    pub final_features: usize,
    pub outputs: Vec<PathBuf>,
}

impl RunReport {
    pub fn unrecognized_seasons(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ingested.iter().flat_map(|t| {
            t.unrecognized_seasons
                .iter()
                .map(move |s| (t.league.as_str(), s.as_str()))
        })
    }
}

/// Load one raw table and give it canonical key columns.
pub fn ingest_table(
    source: &dyn TableSource,
    path: &Path,
    league: &SourceLeague,
    config: &DriverConfig,
) -> Result<(DataFrame, IngestedTable)> {
    let raw = source.load(path)?;
    let raw = drop_columns(&raw, &config.drop_columns);
    let outcome = attach_season_columns(&raw, &config.season_column, league)?;

    let mut frame = outcome.frame;
    let squad = frame
        .get_column_names()
        .into_iter()
        .find(|n| n.as_str().eq_ignore_ascii_case(&config.squad_column))
        .map(|n| n.to_string())
        .ok_or_else(|| TableError::MissingKeyColumn {
            table: table_stem(path),
            column: config.squad_column.clone(),
        })?;
    if squad != SQUAD_COLUMN {
        frame.rename(&squad, SQUAD_COLUMN.into())?;
    }
    validate_keys(&frame, &config.keys(), &table_stem(path))?;

    let info = IngestedTable {
        league: league.label().to_string(),
        metric: table_stem(path),
        rows_in: outcome.rows_in,
        rows_out: frame.height(),
        unrecognized_seasons: outcome.unrecognized,
        replaced_columns: outcome.replaced_columns,
    };
    Ok((frame, info))
}

/// Run the whole pipeline. Per-file failures are recorded and skipped.
pub fn run(
    config: &DriverConfig,
    source: &dyn TableSource,
    sink: &dyn TableSink,
) -> Result<RunReport> {
    config.cleaning.validate()?;
    let keys = config.keys();
    let mut report = RunReport::default();

    // metric name -> (league, table), metrics in name order
    let mut by_metric: BTreeMap<String, Vec<(String, DataFrame)>> = BTreeMap::new();

    for league_source in &config.sources {
        let league = SourceLeague::from_label(&league_source.label);
        let files = match list_table_files(&league_source.dir) {
            Ok(files) => files,
            Err(e) => {
                report.failures.push(SourceFailure {
                    league: league_source.label.clone(),
                    path: league_source.dir.clone(),
                    error: format!("{e:#}"),
                });
                continue;
            }
        };

        for path in files {
            match ingest_table(source, &path, &league, config) {
                Ok((frame, info)) => {
                    by_metric
                        .entry(info.metric.clone())
                        .or_default()
                        .push((info.league.clone(), frame));
                    report.ingested.push(info);
                }
                Err(e) => report.failures.push(SourceFailure {
                    league: league_source.label.clone(),
                    path,
                    error: format!("{e:#}"),
                }),
            }
        }
    }

    if by_metric.is_empty() {
        let dir = config
            .sources
            .first()
            .map(|s| s.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        return Err(TableError::NoSourcesFound { dir }.into());
    }

    let mut cleaned_tables = Vec::new();
    for (metric, parts) in by_metric {
        let leagues: Vec<String> = parts.iter().map(|(l, _)| l.clone()).collect();
        let frames: Vec<DataFrame> = parts.into_iter().map(|(_, f)| f).collect();

        let union_path = config.not_cleaned_dir().join(format!("{metric}.csv"));
        let cleaned_path = config.cleaned_dir().join(format!("{metric}.csv"));
        let processed = concat_tables(&frames)
            .with_context(|| format!("Failed to stack metric '{metric}'"))
            .and_then(|union| {
                sink.save(&union.frame, &union_path)?;
                let cleaned = clean_keep_keys(&union.frame, &keys, &config.cleaning)?;
                sink.save(&cleaned.frame, &cleaned_path)?;
                Ok((union, cleaned))
            });
        let (union, cleaned) = match processed {
            Ok(done) => done,
            Err(e) => {
                report.failures.push(SourceFailure {
                    league: leagues.join(", "),
                    path: PathBuf::from(&metric),
                    error: format!("{e:#}"),
                });
                continue;
            }
        };
        report.outputs.push(union_path);
        report.outputs.push(cleaned_path.clone());

        report.metrics.push(MetricSummary {
            metric: metric.clone(),
            leagues,
            rows: union.frame.height(),
            differing_columns: union.differing_columns,
            drops: cleaned.report,
            cleaned_path,
        });
        cleaned_tables.push(NamedTable::new(metric, cleaned.frame));
    }

    let exclude = exclude_containing(&config.exclude);
    let merged = merge_tables(
        cleaned_tables,
        &keys,
        config.how,
        Some(&exclude as &dyn Fn(&str) -> bool),
    )?;
    report.excluded = merged.excluded;
    report.joins = merged.joins;

    let final_config = config.cleaning.clone().strict(config.final_strict || config.cleaning.strict);
    let final_clean = clean_keep_keys(&merged.frame, &keys, &final_config)?;
    report.final_drops = final_clean.report;
    report.final_rows = final_clean.frame.height();

    let with_keys_path = config.merged_with_keys_path();
    sink.save(&final_clean.frame, &with_keys_path)?;
    report.outputs.push(with_keys_path);

    let features = drop_columns(&final_clean.frame, &keys);
    report.final_features = features.width();
    let matrix_path = config.feature_matrix_path();
    sink.save(&features, &matrix_path)?;
    report.outputs.push(matrix_path);

    Ok(report)
}
