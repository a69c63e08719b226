//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// srcprof: block-level instrumentation and coverage for Java-like sources
#[derive(Parser, Debug)]
#[command(name = "srcprof")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Project configuration file (default: ./srcprof.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Instrument source files and directories
    Instrument(InstrumentArgs),

    /// Aggregate counts snapshots into a coverage report
    Report(ReportArgs),

    /// Merge counts snapshots into one file
    Merge(MergeArgs),

    /// Print the block inventory of one source file
    Inspect(InspectArgs),
}

/// Arguments for the instrument command
#[derive(Parser, Debug)]
pub struct InstrumentArgs {
    /// Source files or directories
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory for the instrumented tree and metadata
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Glob pattern of relative paths to leave uninstrumented (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Extraction worker threads
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Fully qualified counter class
    #[arg(long)]
    pub counter_class: Option<String>,

    /// Do not write the counter class source
    #[arg(long)]
    pub no_support_class: bool,
}

/// Arguments for the report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Instrumentation output directory holding metadata and counts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Metadata file (default: <OUTPUT>/metadata.json)
    #[arg(long)]
    pub metadata: Option<PathBuf>,

    /// Counts snapshot (repeatable; default: <OUTPUT>/counts.dat)
    #[arg(long)]
    pub counts: Vec<PathBuf>,

    /// Write an HTML report into this directory
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Write an LCOV tracefile
    #[arg(long)]
    pub lcov: Option<PathBuf>,

    /// Write the report as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Column of the printed summary to sort by
    #[arg(long)]
    pub sort: Option<String>,

    /// Level of the printed summary
    #[arg(long, default_value = "class")]
    pub level: SummaryLevel,

    /// Directory holding the original sources
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// HTML color theme
    #[arg(long)]
    pub theme: Option<ThemeArg>,
}

/// Rows of the printed summary
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SummaryLevel {
    /// One row per package
    Package,
    /// One row per class
    #[default]
    Class,
    /// One row per method
    Method,
}

/// HTML theme argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeArg {
    /// Light background
    Light,
    /// Dark background
    Dark,
}

impl From<ThemeArg> for crate::config::ThemeSetting {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
        }
    }
}

/// Arguments for the merge command
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Counts snapshots to merge
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Merged snapshot file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Check the merged counts against this metadata file
    #[arg(long)]
    pub metadata: Option<PathBuf>,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Source file
    pub file: PathBuf,

    /// Print the instrumented source instead of the block table
    #[arg(long)]
    pub rewritten: bool,

    /// Print blocks and decisions as JSON
    #[arg(long, conflicts_with = "rewritten")]
    pub json: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
