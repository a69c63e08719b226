//! Instrument command handler

use crate::config::{CliConfig, ProjectConfig};
use crate::error::CliResult;
use crate::output::Reporter;
use crate::InstrumentArgs;
use glob::Pattern;
use srcprof::coverage::{collect_sources, BatchInstrumenter, BatchSummary, SourceFile};
use srcprof::InstrumentConfig;
use std::path::PathBuf;
use tracing::debug;

/// Merge project settings with command-line overrides
#[must_use]
pub fn build_instrument_config(project: &ProjectConfig, args: &InstrumentArgs) -> InstrumentConfig {
    let mut config = project.instrument_config();
    if let Some(class) = &args.counter_class {
        config.counter_class.clone_from(class);
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.no_support_class {
        config.emit_support_class = false;
    }
    config
}

/// Drop sources whose relative path matches any pattern.
///
/// Returns the kept sources and the number dropped.
pub fn apply_excludes(
    sources: Vec<SourceFile>,
    patterns: &[String],
) -> CliResult<(Vec<SourceFile>, usize)> {
    let patterns = patterns
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<Result<Vec<_>, _>>()?;
    let before = sources.len();
    let kept: Vec<SourceFile> = sources
        .into_iter()
        .filter(|source| {
            let excluded = patterns.iter().any(|p| p.matches_path(&source.relative));
            if excluded {
                debug!(file = %source.relative.display(), "Excluded");
            }
            !excluded
        })
        .collect();
    let dropped = before - kept.len();
    Ok((kept, dropped))
}

/// Execute the instrument command
pub fn execute_instrument(
    config: &CliConfig,
    project: &ProjectConfig,
    args: &InstrumentArgs,
) -> CliResult<BatchSummary> {
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let instrument_config = build_instrument_config(project, args);
    let output: PathBuf = args.output.clone().unwrap_or_else(|| project.output.clone());

    let mut patterns = project.exclude.clone();
    patterns.extend(args.exclude.iter().cloned());
    let (sources, excluded) = apply_excludes(collect_sources(&args.inputs)?, &patterns)?;
    if sources.is_empty() {
        reporter.warning("No source files found");
    }

    let batch = BatchInstrumenter::new(&instrument_config);
    let result = batch.instrument(&sources)?;
    let summary = batch.write(&result, &output)?;

    for skipped in &summary.skipped {
        reporter.warning(&format!(
            "Copied {} unmodified: {}",
            skipped.path.display(),
            skipped.reason
        ));
    }
    if excluded > 0 && config.verbosity.is_verbose() {
        reporter.info(&format!("Excluded {excluded} file(s) by pattern"));
    }
    reporter.success(&format!(
        "Instrumented {}/{} file(s): {} counters, {} decisions",
        summary.instrumented, summary.files, summary.counter_count, summary.decision_count
    ));
    reporter.info(&format!("Metadata: {}", summary.metadata_path.display()));
    if let Some(support) = &summary.support_class_path {
        reporter.info(&format!("Counter class: {}", support.display()));
    }
    Ok(summary)
}
