//! Tests for season label normalisation and key attachment

use polars::prelude::*;
use squadfeat::pipeline::{
    attach_season_columns, expand_multi, normalize, SeasonLiga, SourceLeague, TableError,
    LEAGUE_COLUMN, SEASON_COLUMN, UNKNOWN_LEAGUE,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_documented_examples() {
    assert_eq!(
        normalize("2020-2021 Premier League"),
        SeasonLiga::new("2020-2021", "Premier League")
    );
    assert_eq!(normalize("2020-2021"), SeasonLiga::new("2020-2021", "La Liga"));
    assert_eq!(
        SourceLeague::LigaFemenina.normalize("2020-2021-femenino"),
        SeasonLiga::new("2020-2021", "Liga Femenina")
    );
}

#[test]
fn test_league_name_casing() {
    assert_eq!(normalize("2019-2020 serie a").league, "Serie A");
    assert_eq!(normalize("2019-2020 LA LIGA").league, "La Liga");
    assert_eq!(normalize("2019-2020 EPL").league, "EPL");
    assert_eq!(normalize("2019-2020-ligue 1").league, "Ligue 1");
}

#[test]
fn test_unrecognized_label_passes_through() {
    let parsed = normalize("Season 2020");
    assert_eq!(parsed.season, "Season 2020");
    assert_eq!(parsed.league, UNKNOWN_LEAGUE);

    // La Liga sources keep the Unknown marker rather than forcing their league
    assert_eq!(SourceLeague::LaLiga.normalize("20/21").league, UNKNOWN_LEAGUE);
}

#[test]
fn test_multi_label_cell_expands() {
    let pairs = expand_multi("2023-2024 Bundesliga;2023-2024 Ligue 1 ; bogus");
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0], SeasonLiga::new("2023-2024", "Bundesliga"));
    assert_eq!(pairs[1], SeasonLiga::new("2023-2024", "Ligue 1"));
    assert!(!pairs[2].is_recognized());
}

#[test]
fn test_source_labels() {
    assert_eq!(SourceLeague::from_label("LaLiga"), SourceLeague::LaLiga);
    assert_eq!(SourceLeague::from_label("top  5"), SourceLeague::Top5);
    assert_eq!(
        SourceLeague::from_label("Eredivisie"),
        SourceLeague::Other("Eredivisie".to_string())
    );
    assert!(SourceLeague::Top5.is_multi());
    assert!(!SourceLeague::LaLiga.is_multi());
}

#[test]
fn test_attach_puts_keys_first_and_drops_raw_column() {
    let df = create_defensive_dataframe();
    let outcome = attach_season_columns(&df, "Season", &SourceLeague::LaLiga).unwrap();
    let out = &outcome.frame;

    let names = column_names(out);
    assert_eq!(&names[..3], &[SEASON_COLUMN, LEAGUE_COLUMN, "Squad"]);
    assert_missing_columns(out, &["Season"]);
    assert_eq!(out.height(), df.height());
    assert!(outcome.unrecognized.is_empty());
    assert!(str_values(out, LEAGUE_COLUMN)
        .iter()
        .all(|l| l.as_deref() == Some("La Liga")));
}

#[test]
fn test_attach_reports_unrecognized_labels() {
    let df = df! {
        "Squad" => ["Betis", "Celta", "Girona"],
        "season" => ["2020-2021", "Temporada 20/21", "2021-2022"],
    }
    .unwrap();

    // The lower-case column is accepted for a "Season" request
    let outcome = attach_season_columns(&df, "Season", &SourceLeague::LaLiga).unwrap();
    assert_eq!(outcome.unrecognized, vec!["Temporada 20/21"]);
    assert_eq!(
        str_values(&outcome.frame, LEAGUE_COLUMN),
        vec![
            Some("La Liga".to_string()),
            Some(UNKNOWN_LEAGUE.to_string()),
            Some("La Liga".to_string()),
        ]
    );
}

#[test]
fn test_attach_expands_top5_rows_in_order() {
    let df = df! {
        "Squad" => ["Bayern", "Milan"],
        "Season" => ["2022-2023 Bundesliga; 2023-2024 Bundesliga", "2023-2024 Serie A"],
        "Gls" => [90i64, 60],
    }
    .unwrap();

    let outcome = attach_season_columns(&df, "Season", &SourceLeague::Top5).unwrap();
    let out = &outcome.frame;

    assert_eq!(outcome.rows_in, 2);
    assert_shape(out, 3, 4);
    assert_eq!(
        str_values(out, "Squad"),
        vec![
            Some("Bayern".to_string()),
            Some("Bayern".to_string()),
            Some("Milan".to_string()),
        ]
    );
    assert_eq!(
        str_values(out, SEASON_COLUMN),
        vec![
            Some("2022-2023".to_string()),
            Some("2023-2024".to_string()),
            Some("2023-2024".to_string()),
        ]
    );
    assert_eq!(f64_values(out, "Gls"), vec![Some(90.0), Some(90.0), Some(60.0)]);
}

#[test]
fn test_attach_without_season_column_fails() {
    let df = df! { "Squad" => ["Betis"] }.unwrap();
    let err = attach_season_columns(&df, "Season", &SourceLeague::LaLiga).unwrap_err();
    assert!(matches!(err, TableError::MissingKeyColumn { .. }));
}

#[test]
fn test_top5_row_without_labels_is_kept_as_unrecognized() {
    let df = df! {
        "Squad" => ["Arsenal", "Lens", "Lazio"],
        "Season" => [Some("2024-2025 Premier League"), None, Some(" ; ")],
        "Gls" => [69i64, 40, 60],
    }
    .unwrap();

    let outcome = attach_season_columns(&df, "Season", &SourceLeague::Top5).unwrap();
    let out = &outcome.frame;

    assert_eq!(outcome.rows_in, 3);
    assert_eq!(out.height(), 3);
    assert_eq!(outcome.unrecognized, vec!["", ";"]);
    assert_eq!(
        str_values(out, LEAGUE_COLUMN),
        vec![
            Some("Premier League".to_string()),
            Some(UNKNOWN_LEAGUE.to_string()),
            Some(UNKNOWN_LEAGUE.to_string()),
        ]
    );
    assert_eq!(f64_values(out, "Gls"), vec![Some(69.0), Some(40.0), Some(60.0)]);
}

#[test]
fn test_existing_canonical_columns_are_reported_when_replaced() {
    let df = df! {
        "Squad" => ["Betis", "Celta"],
        "Season" => ["2020-2021", "2021-2022"],
        "season" => ["old", "old"],
        "Tkl" => [12i64, 15],
    }
    .unwrap();

    let outcome = attach_season_columns(&df, "Season", &SourceLeague::LaLiga).unwrap();
    assert_eq!(outcome.replaced_columns, vec![SEASON_COLUMN]);
    assert_eq!(column_names(&outcome.frame), vec![SEASON_COLUMN, LEAGUE_COLUMN, "Squad", "Tkl"]);
    assert_eq!(
        str_values(&outcome.frame, SEASON_COLUMN),
        vec![Some("2020-2021".to_string()), Some("2021-2022".to_string())]
    );

    let clean_input = df.drop("season").unwrap();
    let outcome = attach_season_columns(&clean_input, "Season", &SourceLeague::LaLiga).unwrap();
    assert!(outcome.replaced_columns.is_empty());
}
