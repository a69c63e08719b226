//! Batch Instrumentation
//!
//! Instruments a whole source tree. Files are parsed and extracted in
//! parallel with unit-local ids; counter ranges are then assigned in sorted
//! path order, so the final ids never depend on thread scheduling.

use super::extractor::{extract_blocks, ExtractionOutcome};
use super::instrumenter::InstrumentedUnit;
use super::metadata::{InstrumentationMetadata, METADATA_FILE};
use super::support::{counter_class_path, render_counter_class};
use crate::config::{InstrumentConfig, LambdaOverrides};
use crate::result::{ProfError, ProfResult};
use crate::syntax;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

/// Extension of instrumentable files
pub const SOURCE_EXTENSION: &str = "java";

/// One input file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Path relative to its root; used in metadata and the output tree
    pub relative: PathBuf,
    /// Directory the relative path starts from
    pub root: PathBuf,
}

impl SourceFile {
    /// Path on disk
    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        self.root.join(&self.relative)
    }
}

/// Gather source files from files and directories, sorted by relative path.
///
/// Directories are walked recursively for `.java` files; explicitly named
/// files are taken as given.
pub fn collect_sources(inputs: &[PathBuf]) -> ProfResult<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk(input, input, &mut sources)?;
        } else if input.is_file() {
            let root = input
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            let relative = input
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| ProfError::MissingInput {
                    path: input.clone(),
                })?;
            sources.push(SourceFile { relative, root });
        } else {
            return Err(ProfError::MissingInput {
                path: input.clone(),
            });
        }
    }
    sources.sort();
    sources.dedup_by(|a, b| a.relative == b.relative);
    Ok(sources)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<SourceFile>) -> ProfResult<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            walk(root, &path, out)?;
        } else if path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
            if let Ok(relative) = path.strip_prefix(root) {
                out.push(SourceFile {
                    relative: relative.to_path_buf(),
                    root: root.to_path_buf(),
                });
            }
        }
    }
    Ok(())
}

/// File left uninstrumented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Relative path
    pub path: PathBuf,
    /// Why the file was skipped
    pub reason: String,
}

/// One successfully instrumented file
#[derive(Debug, Clone)]
pub struct BatchUnit {
    /// Input file
    pub source_file: SourceFile,
    /// Rewritten unit with global ids
    pub unit: InstrumentedUnit,
}

/// In-memory result of instrumenting a set of files
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Instrumented files in counter order
    pub units: Vec<BatchUnit>,
    /// Files that could not be instrumented
    pub skipped: Vec<(SourceFile, SkippedFile)>,
    /// Whole-program metadata
    pub metadata: InstrumentationMetadata,
}

/// What a batch run wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files considered
    pub files: usize,
    /// Files instrumented
    pub instrumented: usize,
    /// Files copied unmodified
    pub skipped: Vec<SkippedFile>,
    /// Total counters
    pub counter_count: u32,
    /// Total decisions
    pub decision_count: usize,
    /// Metadata file
    pub metadata_path: PathBuf,
    /// Generated counter class, if written
    pub support_class_path: Option<PathBuf>,
}

type Extracted = Result<(String, ExtractionOutcome), ProfError>;

/// Instruments many files with one configuration
#[derive(Debug, Clone)]
pub struct BatchInstrumenter<'a> {
    config: &'a InstrumentConfig,
}

impl<'a> BatchInstrumenter<'a> {
    /// Create a batch instrumenter
    #[must_use]
    pub fn new(config: &'a InstrumentConfig) -> Self {
        Self { config }
    }

    fn thread_count(&self, files: usize) -> usize {
        let available = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        self.config.threads.unwrap_or(available).clamp(1, files.max(1))
    }

    /// Parse and extract every file in parallel, ids starting at zero per file
    fn extract_all(&self, sources: &[SourceFile]) -> ProfResult<Vec<Extracted>> {
        let threads = self.thread_count(sources.len());
        let chunk = sources.len().div_ceil(threads).max(1);
        let overrides = &self.config.lambda_overrides;

        let chunks: Vec<ProfResult<Vec<Extracted>>> = thread::scope(|scope| {
            let handles: Vec<_> = sources
                .chunks(chunk)
                .map(|files| {
                    scope.spawn(move || {
                        files
                            .iter()
                            .map(|file| -> ProfResult<Extracted> {
                                let bytes = std::fs::read(file.full_path())?;
                                Ok(decode_source(&file.relative, bytes)
                                    .and_then(|text| extract_one(&file.relative, text, overrides)))
                            })
                            .collect::<ProfResult<Vec<Extracted>>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(ProfError::invalid_state("extraction worker panicked"))
                    })
                })
                .collect()
        });

        let mut results = Vec::with_capacity(sources.len());
        for part in chunks {
            results.extend(part?);
        }
        Ok(results)
    }

    /// Instrument files in memory
    pub fn instrument(&self, sources: &[SourceFile]) -> ProfResult<BatchResult> {
        self.config.validate()?;
        let extracted = self.extract_all(sources)?;

        let mut units = Vec::new();
        let mut skipped = Vec::new();
        let mut block_base = 0u32;
        let mut decision_base = 0u32;
        for (file, result) in sources.iter().zip(extracted) {
            match result {
                Ok((text, outcome)) => {
                    let blocks = outcome.blocks.len() as u32;
                    let decisions = outcome.decisions.len() as u32;
                    let outcome = outcome.rebased(block_base, decision_base);
                    block_base += blocks;
                    decision_base += decisions;
                    units.push(BatchUnit {
                        source_file: file.clone(),
                        unit: InstrumentedUnit::from_outcome(&text, outcome, self.config),
                    });
                }
                Err(e) if e.is_file_scoped() => {
                    warn!(file = %file.relative.display(), error = %e, "Skipping file");
                    skipped.push((
                        file.clone(),
                        SkippedFile {
                            path: file.relative.clone(),
                            reason: e.to_string(),
                        },
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        let metadata = InstrumentationMetadata::from_units(
            units.iter().map(|u| u.unit.unit_metadata()).collect(),
            &self.config.counter_class,
        );
        debug!(
            units = units.len(),
            skipped = skipped.len(),
            counters = metadata.counter_count,
            "Instrumented batch"
        );
        Ok(BatchResult {
            units,
            skipped,
            metadata,
        })
    }

    /// Write a batch result into an output directory
    pub fn write(&self, result: &BatchResult, out_dir: &Path) -> ProfResult<BatchSummary> {
        std::fs::create_dir_all(out_dir)?;
        for unit in &result.units {
            write_file(&out_dir.join(&unit.source_file.relative), &unit.unit.rewritten)?;
        }
        for (file, _) in &result.skipped {
            let target = out_dir.join(&file.relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(file.full_path(), &target)?;
        }

        let support_class_path = if self.config.emit_support_class {
            let path = out_dir.join(counter_class_path(self.config));
            write_file(
                &path,
                &render_counter_class(self.config, result.metadata.counter_count),
            )?;
            Some(path)
        } else {
            None
        };

        let metadata_path = out_dir.join(METADATA_FILE);
        result.metadata.save(&metadata_path)?;

        let summary = BatchSummary {
            files: result.units.len() + result.skipped.len(),
            instrumented: result.units.len(),
            skipped: result.skipped.iter().map(|(_, s)| s.clone()).collect(),
            counter_count: result.metadata.counter_count,
            decision_count: result.metadata.decisions().count(),
            metadata_path,
            support_class_path,
        };
        info!(
            files = summary.files,
            instrumented = summary.instrumented,
            skipped = summary.skipped.len(),
            counters = summary.counter_count,
            "Instrumentation complete"
        );
        Ok(summary)
    }

    /// Collect, instrument and write in one go
    pub fn run(&self, inputs: &[PathBuf], out_dir: &Path) -> ProfResult<BatchSummary> {
        let sources = collect_sources(inputs)?;
        let result = self.instrument(&sources)?;
        self.write(&result, out_dir)
    }
}

/// Decode file bytes as UTF-8, reporting the first bad line as a parse error
fn decode_source(relative: &Path, bytes: Vec<u8>) -> ProfResult<String> {
    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
        ProfError::parse(relative, line, "source is not valid UTF-8")
    })
}

fn extract_one(
    relative: &Path,
    text: String,
    overrides: &LambdaOverrides,
) -> Extracted {
    let unit = syntax::parse(relative, &text)?;
    let outcome = extract_blocks(&unit, &text, overrides)?;
    Ok((text, outcome))
}

fn write_file(path: &Path, contents: &str) -> ProfResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
