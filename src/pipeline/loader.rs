//! Dataset loading and saving for CSV and Parquet files

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

use super::table::TableError;

/// Default number of rows used for CSV schema inference.
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 10_000;

/// Something that can produce a table from a path.
pub trait TableSource {
    fn load(&self, path: &Path) -> Result<DataFrame>;
}

/// Something that can persist a table at a path.
pub trait TableSink {
    fn save(&self, df: &DataFrame, path: &Path) -> Result<()>;
}

/// File-system backed source and sink; format chosen by extension.
#[derive(Debug, Clone)]
pub struct FileStore {
    pub infer_schema_length: usize,
}

impl Default for FileStore {
    fn default() -> Self {
        Self {
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }
}

impl FileStore {
    pub fn new(infer_schema_length: usize) -> Self {
        Self {
            infer_schema_length,
        }
    }
}

impl TableSource for FileStore {
    fn load(&self, path: &Path) -> Result<DataFrame> {
        load_dataset(path, self.infer_schema_length)
    }
}

impl TableSink for FileStore {
    fn save(&self, df: &DataFrame, path: &Path) -> Result<()> {
        save_dataset(df, path)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset from a file (CSV or Parquet based on extension).
///
/// Column order and header names are preserved as written. `infer_schema_length`
/// of 0 means a full scan.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = extension_of(path);

    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let df = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(schema_length)
            .finish()
            .and_then(|lf| lf.collect())
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .and_then(|lf| lf.collect())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => return Err(TableError::UnsupportedFormat { extension }.into()),
    };

    Ok(df)
}

/// Save dataset to file (CSV or Parquet based on extension), creating parent
/// directories as needed.
pub fn save_dataset(df: &DataFrame, path: &Path) -> Result<()> {
    let extension = extension_of(path);
    if extension != "csv" && extension != "parquet" {
        return Err(TableError::UnsupportedFormat { extension }.into());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut df = df.clone();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    match extension.as_str() {
        "csv" => {
            let mut file = file;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        _ => {
            ParquetWriter::new(file)
                .finish(&mut df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
    }

    Ok(())
}

/// Table files (`.csv`, `.parquet`) directly inside `dir`, sorted by file name.
pub fn list_table_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && matches!(extension_of(&path).as_str(), "csv" | "parquet") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Read only the header of a dataset.
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let extension = extension_of(path);
    let schema = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()?
            .collect_schema()?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())?.collect_schema()?,
        _ => return Err(TableError::UnsupportedFormat { extension }.into()),
    };
    Ok(schema.iter_names().map(|n| n.to_string()).collect())
}
