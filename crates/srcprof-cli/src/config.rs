//! CLI configuration
//!
//! Runtime flags ([`CliConfig`]) come from the command line; project
//! settings ([`ProjectConfig`]) come from an optional `srcprof.yaml`.

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use srcprof::coverage::Theme;
use srcprof::{InstrumentConfig, LambdaOverrides};
use std::path::{Path, PathBuf};

/// Project configuration file looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "srcprof.yaml";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter for this level
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().features().colors_supported(),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

/// HTML theme as written in the project file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSetting {
    /// Light background
    #[default]
    Light,
    /// Dark background
    Dark,
}

impl From<ThemeSetting> for Theme {
    fn from(setting: ThemeSetting) -> Self {
        match setting {
            ThemeSetting::Light => Self::Light,
            ThemeSetting::Dark => Self::Dark,
        }
    }
}

/// `report` section of the project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Page title
    pub title: String,
    /// Color theme
    pub theme: ThemeSetting,
    /// Rows in the hottest-blocks table
    pub hot_blocks: usize,
    /// Directory holding the original sources, for annotated pages
    pub source_root: Option<PathBuf>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Coverage Report".to_string(),
            theme: ThemeSetting::Light,
            hot_blocks: 20,
            source_root: None,
        }
    }
}

/// Contents of `srcprof.yaml`
///
/// ```yaml
/// counter_class: auxiliary.__Counter
/// output: build/instrumented
/// exclude: ["**/generated/**"]
/// lambda:
///   void_calls: [subscribe]
/// report:
///   theme: dark
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Fully qualified counter class
    pub counter_class: String,
    /// Snapshot file name written by instrumented programs
    pub snapshot_file: String,
    /// Whether to write the counter class source
    pub emit_support_class: bool,
    /// Extraction worker threads
    pub threads: Option<usize>,
    /// Instrumentation output directory
    pub output: PathBuf,
    /// Glob patterns of source paths to leave alone
    pub exclude: Vec<String>,
    /// Lambda classification overrides
    pub lambda: LambdaOverrides,
    /// Report rendering settings
    pub report: ReportSettings,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let defaults = InstrumentConfig::default();
        Self {
            counter_class: defaults.counter_class,
            snapshot_file: defaults.snapshot_file,
            emit_support_class: defaults.emit_support_class,
            threads: None,
            output: PathBuf::from("srcprof-out"),
            exclude: Vec::new(),
            lambda: LambdaOverrides::default(),
            report: ReportSettings::default(),
        }
    }
}

impl ProjectConfig {
    /// Parse a project file
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    /// Parse project settings from YAML text
    pub fn from_yaml(text: &str) -> CliResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Load the explicit file, or `srcprof.yaml` in `dir` when present
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> CliResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default = dir.join(PROJECT_CONFIG_FILE);
        if default.is_file() {
            tracing::debug!(path = %default.display(), "Using project config");
            Self::load(&default)
        } else {
            Ok(Self::default())
        }
    }

    /// Instrumentation settings for the library
    #[must_use]
    pub fn instrument_config(&self) -> InstrumentConfig {
        let mut builder = InstrumentConfig::builder()
            .counter_class(self.counter_class.clone())
            .snapshot_file(self.snapshot_file.clone())
            .emit_support_class(self.emit_support_class)
            .lambda_overrides(self.lambda.clone());
        if let Some(threads) = self.threads {
            builder = builder.threads(threads);
        }
        builder.build()
    }
}
