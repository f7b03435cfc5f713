//! Console summaries of cleaning and merge results

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{DropReport, JoinStep, RunReport};

fn indent(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn count_cell(count: usize) -> Cell {
    Cell::new(count).fg(if count == 0 { Color::White } else { Color::Red })
}

/// Build the per-stage table for one drop report.
pub fn drop_report_table(report: &DropReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Stage").add_attribute(Attribute::Bold),
        Cell::new("Dropped").add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec![
        Cell::new("📁 Initial Columns"),
        Cell::new(report.initial_columns),
    ]);
    for stage in &report.stages {
        table.add_row(vec![
            Cell::new(stage.stage.label()),
            count_cell(stage.columns.len()),
        ]);
    }
    table.add_row(vec![
        Cell::new("✅ Final Columns"),
        Cell::new(report.final_columns)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    let reduction_pct = if report.initial_columns > 0 {
        (report.initial_columns.saturating_sub(report.final_columns) as f64
            / report.initial_columns as f64)
            * 100.0
    } else {
        0.0
    };
    let color = if reduction_pct > 30.0 {
        Color::Green
    } else if reduction_pct > 10.0 {
        Color::Yellow
    } else {
        Color::Cyan
    };
    table.add_row(vec![
        Cell::new("📉 Reduction"),
        Cell::new(format!("{:.1}%", reduction_pct))
            .fg(color)
            .add_attribute(Attribute::Bold),
    ]);

    table
}

/// Print a drop report with the dropped column names per stage.
pub fn display_drop_report(title: &str, report: &DropReport) {
    section("📋", title);
    indent(&drop_report_table(report));

    if report.total_dropped() == 0 {
        return;
    }

    section("📝", "DROPPED COLUMNS");
    for stage in report.stages.iter().filter(|s| !s.columns.is_empty()) {
        println!(
            "      {} {}:",
            style(stage.stage.label()).yellow(),
            style(format!("({})", stage.columns.len())).dim()
        );
        for column in &stage.columns {
            println!("        {} {}", style("•").dim(), column);
        }
        println!();
    }
}

/// Build the table describing each fold step of a merge.
pub fn join_table(joins: &[JoinStep]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Joined").add_attribute(Attribute::Bold),
        Cell::new("Rows left").add_attribute(Attribute::Bold),
        Cell::new("Rows right").add_attribute(Attribute::Bold),
        Cell::new("Rows out").add_attribute(Attribute::Bold),
        Cell::new("Renamed").add_attribute(Attribute::Bold),
        Cell::new("Fan-out").add_attribute(Attribute::Bold),
    ]);

    for join in joins {
        let fanout = Cell::new(join.fanout_rows).fg(if join.is_degenerate() {
            Color::Yellow
        } else {
            Color::White
        });
        table.add_row(vec![
            Cell::new(&join.source),
            Cell::new(join.rows_left),
            Cell::new(join.rows_right),
            Cell::new(join.rows_out),
            Cell::new(join.renamed.len()),
            fanout,
        ]);
    }
    table
}

/// Print the merge steps and any duplicate-key warnings.
pub fn display_joins(joins: &[JoinStep]) {
    if joins.is_empty() {
        return;
    }
    section("🔗", "MERGE STEPS");
    indent(&join_table(joins));

    for join in joins.iter().filter(|j| j.is_degenerate()) {
        println!(
            "      {} '{}': {} duplicated key(s) on the merged side, {} on the incoming side, {} extra row(s)",
            style("⚠️").yellow(),
            join.source,
            join.duplicate_keys_left,
            join.duplicate_keys_right,
            join.fanout_rows
        );
    }
}

/// Print the final summary of a full run.
pub fn display_run_summary(report: &RunReport) {
    section("📋", "RUN SUMMARY");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Leagues").add_attribute(Attribute::Bold),
        Cell::new("Rows").add_attribute(Attribute::Bold),
        Cell::new("Columns in").add_attribute(Attribute::Bold),
        Cell::new("Columns out").add_attribute(Attribute::Bold),
    ]);
    for metric in &report.metrics {
        table.add_row(vec![
            Cell::new(&metric.metric),
            Cell::new(metric.leagues.join(", ")),
            Cell::new(metric.rows),
            Cell::new(metric.drops.initial_columns),
            Cell::new(metric.drops.final_columns).fg(Color::Green),
        ]);
    }
    indent(&table);

    display_joins(&report.joins);
    display_drop_report("MERGED TABLE CLEANING", &report.final_drops);

    let unrecognized: Vec<(&str, &str)> = report.unrecognized_seasons().collect();
    if !unrecognized.is_empty() {
        section("❓", "UNRECOGNIZED SEASON LABELS");
        for (league, label) in &unrecognized {
            println!("        {} {} ({})", style("•").dim(), label, style(league).dim());
        }
    }

    if !report.excluded.is_empty() {
        println!();
        println!(
            "      {} {}",
            style("Excluded from merge:").dim(),
            report.excluded.join(", ")
        );
    }

    if !report.failures.is_empty() {
        section("✗", "SKIPPED SOURCES");
        for failure in &report.failures {
            println!(
                "        {} {} [{}]: {}",
                style("•").dim(),
                failure.path.display(),
                failure.league,
                style(&failure.error).red()
            );
        }
    }

    println!();
    println!(
        "      Final matrix: {} rows × {} features",
        style(report.final_rows).yellow().bold(),
        style(report.final_features).yellow().bold()
    );
}
