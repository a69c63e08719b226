//! Block Coverage and Profiling
//!
//! Enumerates the instrumentable regions of a compilation unit, rewrites
//! the source so that entering a region bumps its counter, and turns the
//! counts recorded by instrumented runs into coverage and hot-path reports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  SRCPROF COVERAGE                                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CompilationUnit → BlockExtractor → Instrumenter → rewritten src │
//! │                          ↓                ↓                      │
//! │                   Block / Decision   InstrumentationMetadata     │
//! │                                           ↓                      │
//! │  CountsSnapshot(s) ──────────────→ ReportAggregator → Report     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Block ids are global counter slots. Within a unit they follow pre-order
//! document order; across units they follow sorted path order.

mod aggregator;
mod batch;
pub(crate) mod block;
mod extractor;
pub mod formatters;
mod instrumenter;
mod metadata;
pub(crate) mod report;
mod runtime;
mod snapshot;
mod support;

pub use aggregator::{ReportAggregator, FIELD_LEVEL_METHOD};
pub use batch::{
    collect_sources, BatchInstrumenter, BatchResult, BatchSummary, BatchUnit, SkippedFile,
    SourceFile, SOURCE_EXTENSION,
};
pub use block::{
    Block, BlockId, BlockKind, BodyShape, DecisionId, DecisionKind, DecisionPoint, DecisionRef,
    Side,
};
pub use extractor::{extract_blocks, BlockExtractor, ExtractionOutcome};
pub use formatters::{HtmlFormatter, HtmlReportConfig, LcovFormatter, Theme};
pub use instrumenter::{
    apply_inserts, instrument_source, CodeInsert, InsertPhase, InstrumentedUnit, Instrumenter,
};
pub use metadata::{
    source_hash, InstrumentationMetadata, UnitMetadata, METADATA_FILE, METADATA_FORMAT_VERSION,
};
pub use report::{
    BlockCoverage, ClassCoverage, CoverageReport, CoverageTotals, FileCoverage, HotBlock,
    LineCoverage, Metric, MethodCoverage, PackageCoverage,
};
pub use runtime::{branch, inc, CounterRuntime, FlushGuard};
pub use snapshot::CountsSnapshot;
pub use support::{counter_class_path, render_counter_class, SNAPSHOT_PROPERTY};
