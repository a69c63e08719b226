//! srcprof CLI Library
//!
//! Command-line interface over the srcprof instrumentation and coverage
//! pipeline: `instrument`, `report`, `merge` and `inspect`.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, InspectArgs, InstrumentArgs, MergeArgs, ReportArgs, SummaryLevel,
    ThemeArg,
};
pub use config::{
    CliConfig, ColorChoice, ProjectConfig, ReportSettings, ThemeSetting, Verbosity,
    PROJECT_CONFIG_FILE,
};
pub use error::{CliError, CliResult};
pub use output::{colored_percentage, Reporter};
