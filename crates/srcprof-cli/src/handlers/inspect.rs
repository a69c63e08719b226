//! Inspect command handler

use crate::config::{CliConfig, ProjectConfig};
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::InspectArgs;
use srcprof::coverage::formatters::{Cell, Table};
use srcprof::coverage::{instrument_source, ExtractionOutcome, InstrumentedUnit, Side};

/// One row per block: id, kind, lines, owner and decision side
#[must_use]
pub fn block_table(outcome: &ExtractionOutcome) -> Table {
    let mut table = Table::new(["Id", "Kind", "Lines", "Class", "Method", "Decision"]);
    for block in &outcome.blocks {
        let lines = if block.start_line == block.end_line {
            block.start_line.to_string()
        } else {
            format!("{}-{}", block.start_line, block.end_line)
        };
        let decision = block.decision.map_or_else(String::new, |d| {
            let side = match d.side {
                Side::True => "T",
                Side::False => "F",
            };
            format!("d{}{side}", d.id.as_u32())
        });
        let kind = if block.is_synthetic() {
            format!("{} (synthetic)", block.kind)
        } else {
            block.kind.to_string()
        };
        table.push_row(vec![
            Cell::Count(u64::from(block.id.as_u32())),
            Cell::text(kind),
            Cell::text(lines),
            Cell::text(block.class_name.clone()),
            Cell::text(block.method_name.clone().unwrap_or_default()),
            Cell::text(decision),
        ]);
    }
    table
}

/// Execute the inspect command
pub fn execute_inspect(
    config: &CliConfig,
    project: &ProjectConfig,
    args: &InspectArgs,
) -> CliResult<InstrumentedUnit> {
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let source = std::fs::read_to_string(&args.file).map_err(|e| {
        CliError::invalid_argument(format!("cannot read {}: {e}", args.file.display()))
    })?;
    let unit = instrument_source(&args.file, &source, &project.instrument_config())?;

    if args.rewritten {
        reporter.data(&unit.rewritten);
    } else if args.json {
        let value = serde_json::json!({
            "path": unit.outcome.path,
            "package": unit.outcome.package,
            "source_hash": unit.source_hash,
            "blocks": unit.outcome.blocks,
            "decisions": unit.outcome.decisions,
        });
        let text = serde_json::to_string_pretty(&value).map_err(srcprof::ProfError::from)?;
        reporter.data(&text);
    } else {
        reporter.heading(&format!(
            "{}: {} block(s), {} decision(s)",
            args.file.display(),
            unit.outcome.blocks.len(),
            unit.outcome.decisions.len()
        ));
        reporter.data(&block_table(&unit.outcome).render_text());
    }
    Ok(unit)
}
