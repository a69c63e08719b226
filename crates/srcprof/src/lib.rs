//! srcprof: block-level source instrumentation and coverage aggregation
//!
//! Instruments Java-like sources so that running the program records how
//! often every executable region was entered, then merges the recorded
//! counts into block, branch and line coverage plus hot-path profiles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SRCPROF Pipeline                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  source ─► syntax::parse ─► BlockExtractor ─► Instrumenter       │
//! │                                  │                 │             │
//! │                                  ▼                 ▼             │
//! │                     InstrumentationMetadata   rewritten source   │
//! │                                  │                 │ (run)       │
//! │                                  ▼                 ▼             │
//! │   CoverageReport ◄── ReportAggregator ◄── CountsSnapshot(s)      │
//! │        │                                                         │
//! │        ▼                                                         │
//! │   HTML / LCOV / JSON                                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use srcprof::coverage::{instrument_source, CountsSnapshot, ReportAggregator};
//! use srcprof::InstrumentConfig;
//! use std::path::Path;
//!
//! let source = "class A { int abs(int x) { if (x < 0) { return -x; } return x; } }";
//! let config = InstrumentConfig::default();
//! let unit = instrument_source(Path::new("A.java"), source, &config).unwrap();
//! assert!(unit.rewritten.contains("auxiliary.__Counter.inc(0);"));
//!
//! let metadata = unit.into_metadata(&config);
//! let mut aggregator = ReportAggregator::new(&metadata);
//! aggregator
//!     .add_snapshot(&CountsSnapshot::new(vec![1, 0, 1]))
//!     .unwrap();
//! let report = aggregator.report();
//! assert_eq!(report.totals.branches.covered, 1);
//! assert_eq!(report.totals.branches.total, 2);
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod config;
mod result;

/// Structural front-end: lexer, parser and tree types
pub mod syntax;

/// Block extraction, instrumentation, counters and coverage reporting
#[allow(clippy::missing_panics_doc, clippy::redundant_closure_for_method_calls)]
pub mod coverage;

pub use config::{InstrumentConfig, InstrumentConfigBuilder, LambdaOverrides};
pub use result::{ProfError, ProfResult};
