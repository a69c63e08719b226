//! Instrumentation configuration.

use crate::result::{ProfError, ProfResult};
use serde::{Deserialize, Serialize};

/// Default fully qualified name of the generated counter class
pub const DEFAULT_COUNTER_CLASS: &str = "auxiliary.__Counter";

/// Default snapshot file name written by the instrumented program
pub const DEFAULT_SNAPSHOT_FILE: &str = "counts.dat";

/// Extra method names for classifying expression-bodied lambdas.
///
/// A lambda whose body could be either a value or a statement is rewritten
/// with `return` when it is passed to a value call and without it when it is
/// passed to a void call. These lists extend the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaOverrides {
    /// Methods whose functional argument produces a value
    #[serde(default)]
    pub value_calls: Vec<String>,
    /// Methods whose functional argument returns nothing
    #[serde(default)]
    pub void_calls: Vec<String>,
}

/// Instrumentation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentConfig {
    /// Fully qualified counter class referenced by inserted statements
    pub counter_class: String,
    /// File name the instrumented program writes its counts to
    pub snapshot_file: String,
    /// Whether batch instrumentation writes the counter class source
    pub emit_support_class: bool,
    /// Lambda classification overrides
    pub lambda_overrides: LambdaOverrides,
    /// Worker threads for batch extraction; `None` uses available parallelism
    pub threads: Option<usize>,
}

impl InstrumentConfig {
    /// Create a builder for instrumentation config
    #[must_use]
    pub fn builder() -> InstrumentConfigBuilder {
        InstrumentConfigBuilder::default()
    }

    /// Package part of the counter class name
    #[must_use]
    pub fn counter_package(&self) -> &str {
        self.counter_class
            .rsplit_once('.')
            .map_or("", |(package, _)| package)
    }

    /// Simple name of the counter class
    #[must_use]
    pub fn counter_simple_name(&self) -> &str {
        self.counter_class
            .rsplit_once('.')
            .map_or(self.counter_class.as_str(), |(_, name)| name)
    }

    /// Check that the configuration can produce compilable output.
    ///
    /// The counter class must live in a named package, since classes in
    /// named packages cannot reference the default package.
    pub fn validate(&self) -> ProfResult<()> {
        let parts: Vec<&str> = self.counter_class.split('.').collect();
        if parts.len() < 2 || !parts.iter().all(|p| is_java_identifier(p)) {
            return Err(ProfError::invalid_state(format!(
                "counter class `{}` must be a package-qualified identifier",
                self.counter_class
            )));
        }
        if self.snapshot_file.is_empty() {
            return Err(ProfError::invalid_state("snapshot file name is empty"));
        }
        if self.threads == Some(0) {
            return Err(ProfError::invalid_state("thread count must be positive"));
        }
        Ok(())
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            counter_class: DEFAULT_COUNTER_CLASS.to_string(),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
            emit_support_class: true,
            lambda_overrides: LambdaOverrides::default(),
            threads: None,
        }
    }
}

fn is_java_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Builder for instrumentation configuration
#[derive(Debug, Default)]
pub struct InstrumentConfigBuilder {
    counter_class: Option<String>,
    snapshot_file: Option<String>,
    skip_support_class: bool,
    lambda_overrides: LambdaOverrides,
    threads: Option<usize>,
}

impl InstrumentConfigBuilder {
    /// Set the fully qualified counter class name
    #[must_use]
    pub fn counter_class(mut self, name: impl Into<String>) -> Self {
        self.counter_class = Some(name.into());
        self
    }

    /// Set the snapshot file name
    #[must_use]
    pub fn snapshot_file(mut self, name: impl Into<String>) -> Self {
        self.snapshot_file = Some(name.into());
        self
    }

    /// Enable or disable writing the counter class source
    #[must_use]
    pub fn emit_support_class(mut self, enabled: bool) -> Self {
        self.skip_support_class = !enabled;
        self
    }

    /// Treat calls to `name` as consuming a value-producing lambda
    #[must_use]
    pub fn value_call(mut self, name: impl Into<String>) -> Self {
        self.lambda_overrides.value_calls.push(name.into());
        self
    }

    /// Treat calls to `name` as consuming a void lambda
    #[must_use]
    pub fn void_call(mut self, name: impl Into<String>) -> Self {
        self.lambda_overrides.void_calls.push(name.into());
        self
    }

    /// Replace the lambda overrides wholesale
    #[must_use]
    pub fn lambda_overrides(mut self, overrides: LambdaOverrides) -> Self {
        self.lambda_overrides = overrides;
        self
    }

    /// Set the number of extraction threads
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> InstrumentConfig {
        InstrumentConfig {
            counter_class: self
                .counter_class
                .unwrap_or_else(|| DEFAULT_COUNTER_CLASS.to_string()),
            snapshot_file: self
                .snapshot_file
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_FILE.to_string()),
            emit_support_class: !self.skip_support_class,
            lambda_overrides: self.lambda_overrides,
            threads: self.threads,
        }
    }
}
