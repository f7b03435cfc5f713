//! JSON run report
//!
//! Bundles the driver's [`RunReport`] with metadata (timestamp, version,
//! effective configuration) so a run can be audited after the fact.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{DriverConfig, RunReport};

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub squadfeat_version: String,
    pub config: DriverConfig,
}

/// Stage totals across every cleaned metric and the merged table
#[derive(Debug, Clone, Serialize)]
pub struct StageTotal {
    pub stage: String,
    pub dropped: usize,
}

/// Complete run report as written to disk
#[derive(Debug, Clone, Serialize)]
pub struct RunReportDocument<'a> {
    pub metadata: ReportMetadata,
    pub stage_totals: Vec<StageTotal>,
    pub unrecognized_season_count: usize,
    pub run: &'a RunReport,
}

/// Sum dropped columns per stage over all metric reports and the final pass.
pub fn stage_totals(report: &RunReport) -> Vec<StageTotal> {
    let mut totals: Vec<StageTotal> = Vec::new();
    let all = report
        .metrics
        .iter()
        .map(|m| &m.drops)
        .chain(std::iter::once(&report.final_drops));

    for drops in all {
        for stage in &drops.stages {
            let label = stage.stage.label().to_string();
            match totals.iter_mut().find(|t| t.stage == label) {
                Some(total) => total.dropped += stage.columns.len(),
                None => totals.push(StageTotal {
                    stage: label,
                    dropped: stage.columns.len(),
                }),
            }
        }
    }
    totals
}

/// Build the document for `report`.
pub fn build_run_report<'a>(config: &DriverConfig, report: &'a RunReport) -> RunReportDocument<'a> {
    RunReportDocument {
        metadata: ReportMetadata {
            timestamp: Utc::now().to_rfc3339(),
            squadfeat_version: env!("CARGO_PKG_VERSION").to_string(),
            config: config.clone(),
        },
        stage_totals: stage_totals(report),
        unrecognized_season_count: report.unrecognized_seasons().count(),
        run: report,
    }
}

/// Export the run report to a JSON file
pub fn export_run_report(config: &DriverConfig, report: &RunReport, output_path: &Path) -> Result<()> {
    let document = build_run_report(config, report);
    let json = serde_json::to_string_pretty(&document)
        .context("Failed to serialize run report to JSON")?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run report to {}", output_path.display()))?;

    Ok(())
}
