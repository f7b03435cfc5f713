//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::{CleaningConfig, JoinHow, LeagueSource, DEFAULT_INFER_SCHEMA_LENGTH};

/// squadfeat - Curate per-metric team statistics into one feature matrix
#[derive(Parser, Debug)]
#[command(name = "squadfeat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, global = true, default_value_t = DEFAULT_INFER_SCHEMA_LENGTH)]
    pub infer_schema_length: usize,

    /// Skip interactive confirmation prompts
    #[arg(long, global = true, default_value = "false")]
    pub no_confirm: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest league folders, clean every metric, and merge them
    Run(RunArgs),

    /// Run the feature selection pipeline over a single table
    Clean(CleanArgs),

    /// Merge every table in a directory on a compound key
    Merge(MergeArgs),

    /// Split a raw season column into canonical season and league columns
    Seasons(SeasonsArgs),
}

/// Thresholds shared by `run` and `clean`
#[derive(Args, Debug, Clone)]
pub struct CleaningArgs {
    /// Missing value threshold - drop columns with a null fraction above this ratio
    #[arg(long, default_value = "0.5", value_parser = validate_unit_interval)]
    pub missing_threshold: f64,

    /// Dominance threshold - drop text columns whose most frequent value exceeds this share
    #[arg(long, default_value = "0.95", value_parser = validate_unit_interval)]
    pub dominant_threshold: f64,

    /// Variance threshold - drop numeric columns with variance at or below this value
    #[arg(long, default_value = "0.0")]
    pub variance_threshold: f64,

    /// Correlation threshold - drop the later column of pairs with |r| above this value
    #[arg(long, default_value = "0.9999", value_parser = validate_correlation_threshold)]
    pub correlation_threshold: f64,

    /// Drop columns whose name contains any of these substrings (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub drop_patterns: Vec<String>,

    /// Columns kept through the text stage and dropped at the end (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub drop_exact: Vec<String>,

    /// Also drop player-count (Pl) and age columns
    #[arg(long, default_value = "false")]
    pub strict: bool,
}

impl CleaningArgs {
    pub fn to_config(&self) -> CleaningConfig {
        CleaningConfig::default()
            .with_miss_thresh(self.missing_threshold)
            .with_dom_thresh(self.dominant_threshold)
            .with_zero_var_thresh(self.variance_threshold)
            .with_corr_thresh(self.correlation_threshold)
            .with_patterns(self.drop_patterns.iter().cloned())
            .with_drop_exact(self.drop_exact.iter().cloned())
            .strict(self.strict)
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// League source as LABEL=DIR (repeatable), e.g. "La Liga=Data/LaLiga 17-25"
    #[arg(short, long = "source")]
    pub sources: Vec<LeagueSource>,

    /// JSON pipeline configuration; command-line sources are appended to it.
    /// Cleaning and join settings then come from the file only.
    #[arg(
        short,
        long,
        conflicts_with_all = [
            "how",
            "final_strict",
            "drop_columns",
            "missing_threshold",
            "dominant_threshold",
            "variance_threshold",
            "correlation_threshold",
            "drop_patterns",
            "drop_exact",
            "strict",
        ]
    )]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Join type used when merging metrics: inner, left or outer
    #[arg(long, default_value = "inner")]
    pub how: JoinHow,

    /// Apply the strict variant to the merged table only
    #[arg(long, default_value = "false")]
    pub final_strict: bool,

    /// Columns to drop right after loading each raw table (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[command(flatten)]
    pub cleaning: CleaningArgs,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path. Defaults to the input with a '_clean' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Columns that bypass every stage and stay in the output (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub keep: Vec<String>,

    #[command(flatten)]
    pub cleaning: CleaningArgs,
}

impl CleanArgs {
    /// Get the output path, deriving from input if not explicitly provided.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| suffixed_path(&self.input, "clean"))
    }
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Directory holding the tables to merge
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Join key columns (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "Season,Squad")]
    pub keys: Vec<String>,

    /// Join type: inner, left or outer
    #[arg(long, default_value = "inner")]
    pub how: JoinHow,

    /// Skip tables whose name contains any of these (comma-separated, case-insensitive)
    #[arg(long, value_delimiter = ',', default_value = "overall,goalkeeping")]
    pub exclude: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SeasonsArgs {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path. Defaults to the input with a '_with_season_liga' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Raw season column
    #[arg(long, default_value = "Season")]
    pub column: String,

    /// League label of the source (e.g. "La Liga", "Liga Femenina", "Top 5")
    #[arg(long)]
    pub league: Option<String>,
}

impl SeasonsArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| suffixed_path(&self.input, "with_season_liga"))
    }
}

/// `dir/stem.ext` -> `dir/stem_<suffix>.ext`
fn suffixed_path(input: &Path, suffix: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv");
    parent.join(format!("{}_{}.{}", stem, suffix, extension))
}

/// Validator for ratio thresholds
fn validate_unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!("threshold must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for the correlation threshold
fn validate_correlation_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "correlation threshold must be in (0.0, 1.0], got {}",
            value
        ))
    }
}
