//! Report command handler

use crate::commands::SummaryLevel;
use crate::config::{CliConfig, ProjectConfig, ThemeSetting};
use crate::error::{CliError, CliResult};
use crate::output::{colored_percentage, Reporter};
use crate::ReportArgs;
use srcprof::coverage::formatters::{Cell, Table};
use srcprof::coverage::{
    source_hash, CoverageReport, CoverageTotals, HtmlFormatter, HtmlReportConfig,
    InstrumentationMetadata, LcovFormatter, ReportAggregator, METADATA_FILE,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Source file that no longer matches its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashMismatch {
    /// File content differs from what was instrumented
    Changed(PathBuf),
    /// File is gone
    Missing(PathBuf),
}

impl fmt::Display for HashMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed(path) => write!(f, "{} changed since instrumentation", path.display()),
            Self::Missing(path) => write!(f, "{} not found", path.display()),
        }
    }
}

/// Compare each unit's recorded hash with the file under `root`
#[must_use]
pub fn check_source_hashes(metadata: &InstrumentationMetadata, root: &Path) -> Vec<HashMismatch> {
    metadata
        .units
        .iter()
        .filter_map(|unit| match std::fs::read_to_string(root.join(&unit.path)) {
            Ok(text) if source_hash(&text) == unit.source_hash => None,
            Ok(_) => Some(HashMismatch::Changed(unit.path.clone())),
            Err(_) => Some(HashMismatch::Missing(unit.path.clone())),
        })
        .collect()
}

fn metric_cells(name: String, totals: &CoverageTotals) -> Vec<Cell> {
    vec![
        Cell::text(name),
        Cell::Coverage(totals.blocks),
        Cell::Coverage(totals.branches),
        Cell::Coverage(totals.lines),
        Cell::Count(totals.hits),
    ]
}

/// Printable summary at one level of the report
#[must_use]
pub fn summary_table(report: &CoverageReport, level: SummaryLevel) -> Table {
    let first = match level {
        SummaryLevel::Package => "Package",
        SummaryLevel::Class => "Class",
        SummaryLevel::Method => "Method",
    };
    let mut table = Table::new([first, "Blocks", "Branches", "Lines", "Hits"]);
    match level {
        SummaryLevel::Package => {
            for package in &report.packages {
                table.push_row(metric_cells(
                    package.display_name().to_string(),
                    &package.totals,
                ));
            }
        }
        SummaryLevel::Class => {
            for class in report.classes() {
                table.push_row(metric_cells(class.name.clone(), &class.totals));
            }
        }
        SummaryLevel::Method => {
            for class in report.classes() {
                for method in &class.methods {
                    table.push_row(metric_cells(
                        format!("{}.{}", class.name, method.name),
                        &method.totals,
                    ));
                }
            }
        }
    }
    table
}

/// Sort a table by a header name, ignoring case
fn sort_by_name(table: &mut Table, name: &str) -> CliResult<()> {
    let column = table
        .headers()
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            CliError::invalid_argument(format!(
                "unknown sort column `{name}` (expected one of: {})",
                table.headers().join(", ")
            ))
        })?;
    table.sort_by_column(column)?;
    Ok(())
}

/// Execute the report command
pub fn execute_report(
    config: &CliConfig,
    project: &ProjectConfig,
    args: &ReportArgs,
) -> CliResult<CoverageReport> {
    let use_color = config.color.should_color();
    let reporter = Reporter::new(use_color, config.verbosity.is_quiet());
    let out_dir = args.output.clone().unwrap_or_else(|| project.output.clone());

    let metadata_path = args
        .metadata
        .clone()
        .unwrap_or_else(|| out_dir.join(METADATA_FILE));
    let metadata = InstrumentationMetadata::load(&metadata_path)?;

    let counts = if args.counts.is_empty() {
        vec![out_dir.join(&project.snapshot_file)]
    } else {
        args.counts.clone()
    };
    let mut aggregator = ReportAggregator::new(&metadata);
    for path in &counts {
        aggregator.add_snapshot_file(path)?;
    }

    let source_root = args
        .source_root
        .clone()
        .or_else(|| project.report.source_root.clone());
    if let Some(root) = &source_root {
        for mismatch in check_source_hashes(&metadata, root) {
            warn!(%mismatch, "Source does not match metadata");
            reporter.warning(&mismatch.to_string());
        }
    }

    let report = aggregator.report();
    let mut table = summary_table(&report, args.level);
    if let Some(column) = &args.sort {
        sort_by_name(&mut table, column)?;
    }
    reporter.heading(&format!(
        "Coverage from {} snapshot(s)",
        report.snapshot_count
    ));
    reporter.plain(&table.render_text());
    reporter.plain(&format!(
        "blocks {}  branches {}  lines {}  hits {}",
        colored_percentage(report.totals.blocks.percentage(), use_color),
        colored_percentage(report.totals.branches.percentage(), use_color),
        colored_percentage(report.totals.lines.percentage(), use_color),
        report.totals.hits
    ));

    if let Some(dir) = &args.html {
        let theme: ThemeSetting = args.theme.map_or(project.report.theme, Into::into);
        let html_config = HtmlReportConfig {
            title: project.report.title.clone(),
            theme: theme.into(),
            source_root,
            hot_blocks: project.report.hot_blocks,
            ..HtmlReportConfig::default()
        };
        let pages = HtmlFormatter::new(&report)
            .with_config(html_config)
            .write_to_dir(dir)?;
        reporter.success(&format!(
            "HTML report: {} ({} page(s))",
            dir.join("index.html").display(),
            pages.len()
        ));
    }
    if let Some(path) = &args.lcov {
        LcovFormatter::new(&report).save(path)?;
        reporter.success(&format!("LCOV: {}", path.display()));
    }
    if let Some(path) = &args.json {
        report.save_json(path)?;
        reporter.success(&format!("JSON: {}", path.display()));
    }
    Ok(report)
}
