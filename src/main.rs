//! squadfeat: Team statistics curation CLI
//!
//! Ingests per-metric team statistics from several league folders, cleans
//! them for clustering, and merges them into one feature matrix.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use squadfeat::cli::{
    confirm_overwrite, CleanArgs, Cli, Commands, MergeArgs, RunArgs, SeasonsArgs,
};
use squadfeat::pipeline::{
    attach_season_columns, clean_keep_keys, driver, exclude_containing, merge_directory,
    DriverConfig, FileStore, SourceLeague, TableSink, TableSource, DEFAULT_LEAGUE,
};
use squadfeat::report::{display_drop_report, display_joins, display_run_summary, export_run_report};
use squadfeat::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_failure, print_info, print_step_header, print_step_time,
    print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = FileStore::new(cli.infer_schema_length);

    match &cli.command {
        Commands::Run(args) => run_pipeline(args, &store, cli.no_confirm),
        Commands::Clean(args) => run_clean(args, &store, cli.no_confirm),
        Commands::Merge(args) => run_merge(args, &store, cli.no_confirm),
        Commands::Seasons(args) => run_seasons(args, &store, cli.no_confirm),
    }
}

/// Build the driver configuration from an optional JSON file plus flags.
fn driver_config(args: &RunArgs) -> Result<DriverConfig> {
    let mut config = match &args.config {
        Some(path) => DriverConfig::from_json_file(path)?,
        None => DriverConfig {
            cleaning: args.cleaning.to_config(),
            how: args.how,
            final_strict: args.final_strict,
            drop_columns: args.drop_columns.clone(),
            ..Default::default()
        },
    };

    config.sources.extend(args.sources.iter().cloned());
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    if config.sources.is_empty() {
        anyhow::bail!("At least one source is required. Use -s/--source \"LABEL=DIR\" or --config.");
    }
    Ok(config)
}

fn run_pipeline(args: &RunArgs, store: &FileStore, no_confirm: bool) -> Result<()> {
    let config = driver_config(args)?;

    print_banner(env!("CARGO_PKG_VERSION"));
    let sources: Vec<(String, &std::path::Path)> = config
        .sources
        .iter()
        .map(|s| (s.label.clone(), s.dir.as_path()))
        .collect();
    print_config(
        &sources,
        &config.output_dir,
        config.cleaning.miss_thresh,
        config.cleaning.corr_thresh,
        &config.how.to_string(),
    );

    if !no_confirm && !confirm_overwrite(&config.output_dir)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    print_step_header(1, "Ingest, Clean and Merge");
    let step_start = Instant::now();
    let spinner = create_spinner("Processing league sources...");
    let report = driver::run(&config, store, store)?;
    if report.failures.is_empty() {
        finish_with_success(&spinner, "All sources processed");
    } else {
        finish_with_warning(
            &spinner,
            &format!("{} source file(s) skipped", report.failures.len()),
        );
        for failure in &report.failures {
            print_failure(&format!("{}: {}", failure.path.display(), failure.error));
        }
    }
    print_count("table(s) ingested", report.ingested.len(), None);
    let unrecognized = report.unrecognized_seasons().count();
    if unrecognized > 0 {
        print_warning(&format!("{} unrecognized season label(s)", unrecognized));
    }
    for table in report.ingested.iter().filter(|t| !t.replaced_columns.is_empty()) {
        print_warning(&format!(
            "{}/{}: replaced existing column(s) {}",
            table.league,
            table.metric,
            table.replaced_columns.join(", ")
        ));
    }
    print_step_time(step_start.elapsed());

    print_step_header(2, "Save Results");
    for path in &report.outputs {
        print_info(&format!("{}", path.display()));
    }
    if let Some(report_path) = &args.report {
        export_run_report(&config, &report, report_path)?;
        print_success(&format!("Run report written to {}", report_path.display()));
    }

    display_run_summary(&report);
    print_completion();
    Ok(())
}

fn run_clean(args: &CleanArgs, store: &FileStore, no_confirm: bool) -> Result<()> {
    let output = args.output_path();
    if !no_confirm && !confirm_overwrite(&output)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let spinner = create_spinner("Loading dataset...");
    let df = store.load(&args.input)?;
    finish_with_success(
        &spinner,
        &format!("Loaded {} rows × {} columns", df.height(), df.width()),
    );

    let config = args.cleaning.to_config();
    let outcome = clean_keep_keys(&df, &args.keep, &config)
        .with_context(|| format!("Failed to clean {}", args.input.display()))?;

    store.save(&outcome.frame, &output)?;
    print_success(&format!("Saved to {}", output.display()));
    display_drop_report("CLEANING SUMMARY", &outcome.report);
    Ok(())
}

fn run_merge(args: &MergeArgs, store: &FileStore, no_confirm: bool) -> Result<()> {
    if !no_confirm && !confirm_overwrite(&args.output)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let exclude = exclude_containing(&args.exclude);
    let outcome = merge_directory(
        store,
        store,
        &args.dir,
        &args.output,
        &args.keys,
        args.how,
        Some(&exclude as &dyn Fn(&str) -> bool),
    )?;

    print_info(&format!("Merged {} table(s): {}", outcome.sources.len(), outcome.sources.join(", ")));
    if !outcome.excluded.is_empty() {
        print_info(&format!("Excluded: {}", outcome.excluded.join(", ")));
    }
    display_joins(&outcome.joins);
    print_success(&format!(
        "Saved {} rows × {} columns to {}",
        outcome.frame.height(),
        outcome.frame.width(),
        args.output.display()
    ));
    Ok(())
}

fn run_seasons(args: &SeasonsArgs, store: &FileStore, no_confirm: bool) -> Result<()> {
    let output: PathBuf = args.output_path();
    if !no_confirm && !confirm_overwrite(&output)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let df = store.load(&args.input)?;
    let source = args
        .league
        .as_deref()
        .map(SourceLeague::from_label)
        .unwrap_or_else(|| SourceLeague::Other(DEFAULT_LEAGUE.to_string()));
    let outcome = attach_season_columns(&df, &args.column, &source)?;

    store.save(&outcome.frame, &output)?;
    print_success(&format!("Saved to {}", output.display()));

    for name in &outcome.replaced_columns {
        print_warning(&format!("Existing '{name}' column replaced by the canonical one"));
    }

    if outcome.unrecognized.is_empty() {
        print_info("Every season label was recognized");
    } else {
        print_count("unrecognized season label(s)", outcome.unrecognized.len(), None);
        for label in &outcome.unrecognized {
            println!("        {} {}", style("•").dim(), label);
        }
    }
    Ok(())
}
