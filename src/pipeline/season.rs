//! Season label normalisation
//!
//! Raw statistics tables carry a single `Season` cell such as `2020-2021`,
//! `2020-2021 Premier League`, `2024-2025-femenino` or, for the aggregated
//! Top 5 export, several `season league` tokens joined by `;`. This module
//! turns those cells into a canonical `(season, league)` pair and attaches
//! them to a table as the `season` and `league` join-key columns.

use polars::prelude::*;
use serde::Serialize;

use super::table::{table_from_columns, TableError};

/// League assigned when a label is a bare `YYYY-YYYY` season.
pub const DEFAULT_LEAGUE: &str = "La Liga";

/// League assigned when a label cannot be parsed.
pub const UNKNOWN_LEAGUE: &str = "Unknown";

/// Canonical season column added to ingested tables.
pub const SEASON_COLUMN: &str = "season";

/// League column added to ingested tables.
pub const LEAGUE_COLUMN: &str = "league";

const FEMENINO_SUFFIX: &str = "-femenino";

/// A canonical season plus the league it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonLiga {
    pub season: String,
    pub league: String,
}

impl SeasonLiga {
    pub fn new(season: impl Into<String>, league: impl Into<String>) -> Self {
        Self {
            season: season.into(),
            league: league.into(),
        }
    }

    /// False when the raw label matched none of the known shapes.
    pub fn is_recognized(&self) -> bool {
        self.league != UNKNOWN_LEAGUE
    }
}

/// Parse one raw season label into a `(season, league)` pair.
///
/// Rules, first match wins:
/// 1. `YYYY-YYYY` → `(raw, "La Liga")`
/// 2. `YYYY-YYYY <league>` → `(YYYY-YYYY, normalize_league(league))`
/// 3. `YYYY-YYYY-<league>` → `(YYYY-YYYY, normalize_league(league))`
/// 4. anything else → `(raw, "Unknown")`
pub fn normalize(raw: &str) -> SeasonLiga {
    let s = raw.trim();

    let Some(season) = leading_season(s) else {
        return SeasonLiga::new(s, UNKNOWN_LEAGUE);
    };
    let rest = &s[season.len()..];

    if rest.is_empty() {
        return SeasonLiga::new(season, DEFAULT_LEAGUE);
    }

    if rest.starts_with(char::is_whitespace) {
        let league = rest.trim_start();
        if !league.is_empty() {
            return SeasonLiga::new(season, normalize_league(league));
        }
    } else if let Some(league) = rest.strip_prefix('-') {
        if !league.is_empty() {
            return SeasonLiga::new(season, normalize_league(league));
        }
    }

    SeasonLiga::new(s, UNKNOWN_LEAGUE)
}

/// Expand a cell holding several `;`-separated labels into one pair per label.
pub fn expand_multi(raw: &str) -> Vec<SeasonLiga> {
    raw.split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(normalize)
        .collect()
}

/// Canonical display form of a league name.
pub fn normalize_league(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.eq_ignore_ascii_case("la liga") {
        return DEFAULT_LEAGUE.to_string();
    }
    if is_all_uppercase(&collapsed) {
        return collapsed;
    }
    title_case(&collapsed)
}

/// Returns the `YYYY-YYYY` prefix of `s`, if present.
fn leading_season(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    if bytes.len() < 9 {
        return None;
    }
    let shape_ok = bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..9].iter().all(u8::is_ascii_digit);
    shape_ok.then(|| &s[..9])
}

/// Same notion as Python's `str.isupper`: at least one cased character and no
/// lowercase ones.
fn is_all_uppercase(s: &str) -> bool {
    let mut has_cased = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

/// Capitalise the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// How a source folder labels its seasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLeague {
    /// Spanish first division; bare `YYYY-YYYY` labels.
    LaLiga,
    /// Spanish women's league; labels carry a `-femenino` suffix.
    LigaFemenina,
    /// Aggregated export of the five major leagues; one cell, many labels.
    Top5,
    /// Any other league, named by the driver.
    Other(String),
}

impl SourceLeague {
    /// Map a driver-supplied label onto a known source kind.
    pub fn from_label(label: &str) -> Self {
        let key = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match key.as_str() {
            "la liga" | "laliga" => SourceLeague::LaLiga,
            "liga femenina" | "liga f" | "ligaf" => SourceLeague::LigaFemenina,
            "top 5" | "top5" => SourceLeague::Top5,
            _ => SourceLeague::Other(label.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SourceLeague::LaLiga => DEFAULT_LEAGUE,
            SourceLeague::LigaFemenina => "Liga Femenina",
            SourceLeague::Top5 => "Top 5",
            SourceLeague::Other(label) => label,
        }
    }

    /// True when one raw cell may expand into several rows.
    pub fn is_multi(&self) -> bool {
        matches!(self, SourceLeague::Top5)
    }

    /// Normalise one label with the conventions of this source.
    pub fn normalize(&self, raw: &str) -> SeasonLiga {
        match self {
            SourceLeague::LaLiga => force_league(normalize(raw), DEFAULT_LEAGUE),
            SourceLeague::LigaFemenina => {
                let trimmed = raw.trim();
                let stripped = strip_suffix_ignore_case(trimmed, FEMENINO_SUFFIX).unwrap_or(trimmed);
                force_league(normalize(stripped), self.label())
            }
            SourceLeague::Top5 => normalize(raw),
            SourceLeague::Other(label) => {
                let parsed = normalize(raw);
                if parsed.is_recognized() && leading_season(raw.trim()) == Some(raw.trim()) {
                    SeasonLiga::new(parsed.season, label.clone())
                } else {
                    parsed
                }
            }
        }
    }

    /// Normalise a cell into every pair it denotes.
    ///
    /// Always yields at least one pair: a multi-label cell with no labels in
    /// it comes back once, unrecognised.
    pub fn expand(&self, raw: &str) -> Vec<SeasonLiga> {
        if !self.is_multi() {
            return vec![self.normalize(raw)];
        }
        let pairs = expand_multi(raw);
        if pairs.is_empty() {
            vec![SeasonLiga::new(raw.trim(), UNKNOWN_LEAGUE)]
        } else {
            pairs
        }
    }
}

fn force_league(parsed: SeasonLiga, league: &str) -> SeasonLiga {
    if parsed.is_recognized() {
        SeasonLiga::new(parsed.season, league)
    } else {
        parsed
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    let tail = s.get(cut..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &s[..cut])
}

/// Result of attaching season/league columns to a table.
#[derive(Debug, Clone)]
pub struct SeasonOutcome {
    pub frame: DataFrame,
    /// Raw labels that matched no known shape, in row order.
    pub unrecognized: Vec<String>,
    /// Rows in the input table.
    pub rows_in: usize,
    /// Pre-existing `season`/`league` columns overwritten by the canonical ones.
    pub replaced_columns: Vec<String>,
}

/// Find the raw season column, accepting either `Season` or `season`.
pub fn find_season_column(df: &DataFrame, preferred: &str) -> Option<String> {
    let names = df.get_column_names();
    if names.iter().any(|n| n.as_str() == preferred) {
        return Some(preferred.to_string());
    }
    names
        .iter()
        .find(|n| n.as_str().eq_ignore_ascii_case(preferred))
        .map(|n| n.to_string())
}

/// Replace the raw season column by canonical `season` and `league` columns.
///
/// The two key columns are placed first. For multi-label sources each input
/// row is repeated once per label it carries.
pub fn attach_season_columns(
    df: &DataFrame,
    season_column: &str,
    source: &SourceLeague,
) -> Result<SeasonOutcome, TableError> {
    let raw_name = find_season_column(df, season_column).ok_or_else(|| {
        TableError::MissingKeyColumn {
            table: source.label().to_string(),
            column: season_column.to_string(),
        }
    })?;

    let raw = df
        .column(&raw_name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let raw = raw.str()?;

    let mut row_index: Vec<IdxSize> = Vec::with_capacity(df.height());
    let mut seasons: Vec<String> = Vec::with_capacity(df.height());
    let mut leagues: Vec<String> = Vec::with_capacity(df.height());
    let mut unrecognized = Vec::new();

    for (row, value) in raw.iter().enumerate() {
        let value = value.unwrap_or_default();
        for pair in source.expand(value) {
            if !pair.is_recognized() {
                unrecognized.push(pair.season.clone());
            }
            row_index.push(row as IdxSize);
            seasons.push(pair.season);
            leagues.push(pair.league);
        }
    }

    let rest = df.drop(&raw_name)?;
    let rest = if source.is_multi() {
        let idx = IdxCa::from_vec("idx".into(), row_index);
        rest.take(&idx)?
    } else {
        rest
    };

    let mut columns = vec![
        Column::new(SEASON_COLUMN.into(), seasons),
        Column::new(LEAGUE_COLUMN.into(), leagues),
    ];
    let mut replaced_columns = Vec::new();
    for column in rest.get_columns() {
        let name = column.name().as_str();
        if name == SEASON_COLUMN || name == LEAGUE_COLUMN {
            replaced_columns.push(name.to_string());
        } else {
            columns.push(column.clone());
        }
    }

    Ok(SeasonOutcome {
        frame: table_from_columns(columns)?,
        unrecognized,
        rows_in: df.height(),
        replaced_columns,
    })
}
