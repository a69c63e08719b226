//! Merge command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::MergeArgs;
use srcprof::coverage::{CountsSnapshot, InstrumentationMetadata};
use std::path::PathBuf;

/// Load and merge snapshot files element-wise
pub fn merge_files(paths: &[PathBuf]) -> CliResult<CountsSnapshot> {
    let snapshots = paths
        .iter()
        .map(|p| CountsSnapshot::load(p))
        .collect::<Result<Vec<_>, _>>()?;
    CountsSnapshot::merge_all(&snapshots)?
        .ok_or_else(|| CliError::invalid_argument("no snapshots to merge"))
}

/// Execute the merge command
pub fn execute_merge(config: &CliConfig, args: &MergeArgs) -> CliResult<CountsSnapshot> {
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let merged = merge_files(&args.inputs)?;
    if let Some(path) = &args.metadata {
        merged.validate_against(&InstrumentationMetadata::load(path)?)?;
    }
    merged.save(&args.output)?;
    reporter.success(&format!(
        "Merged {} snapshot(s) into {}: {} counters, {} hits",
        args.inputs.len(),
        args.output.display(),
        merged.len(),
        merged.total_hits()
    ));
    Ok(merged)
}
