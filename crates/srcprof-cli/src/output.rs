//! Console output

use console::{style, Term};

/// Status and result printer.
///
/// Results go to stdout; warnings and failures go to stderr.
#[derive(Debug)]
pub struct Reporter {
    out: Term,
    err: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            use_color,
            quiet,
        }
    }

    fn prefix(&self, glyph: &'static str, plain: &'static str, paint: fn(&str) -> String) -> String {
        if self.use_color {
            paint(glyph)
        } else {
            plain.to_string()
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("✓", "OK", |g| style(g).green().bold().to_string());
        let _ = self.out.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = self.prefix("✗", "FAIL", |g| style(g).red().bold().to_string());
        let _ = self.err.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("⚠", "WARN", |g| style(g).yellow().bold().to_string());
        let _ = self.err.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("ℹ", "INFO", |g| style(g).blue().bold().to_string());
        let _ = self.out.write_line(&format!("{prefix} {message}"));
    }

    /// Print a bold section heading
    pub fn heading(&self, title: &str) {
        if self.quiet {
            return;
        }
        let text = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            title.to_string()
        };
        let _ = self.out.write_line(&text);
    }

    /// Print preformatted text as is
    pub fn plain(&self, text: &str) {
        if self.quiet {
            return;
        }
        let _ = self.out.write_str(text);
        if !text.ends_with('\n') {
            let _ = self.out.write_line("");
        }
    }

    /// Print data that is the command's product; never suppressed
    pub fn data(&self, text: &str) {
        let _ = self.out.write_str(text);
        if !text.ends_with('\n') {
            let _ = self.out.write_line("");
        }
    }
}

/// Percentage colored by threshold
#[must_use]
pub fn colored_percentage(percentage: f64, use_color: bool) -> String {
    let text = format!("{percentage:.1}%");
    if !use_color {
        return text;
    }
    if percentage >= 80.0 {
        style(text).green().to_string()
    } else if percentage >= 50.0 {
        style(text).yellow().to_string()
    } else {
        style(text).red().to_string()
    }
}
