//! Coverage Report Formatters
//!
//! HTML, LCOV and plain-text tables. JSON export lives on the report itself.

mod html;
mod lcov;
mod table;

pub use html::{HtmlFormatter, HtmlReportConfig, Theme};
pub use lcov::LcovFormatter;
pub use table::{Cell, SortOrder, Table};

/// Escape text for HTML element content and attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
