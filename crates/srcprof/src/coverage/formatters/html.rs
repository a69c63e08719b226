//! HTML Report Formatter
//!
//! Static report: an index page with one sortable table per level and one
//! annotated source page per file. Styling is minimal and inline; sorting is
//! left to an optional external script.

use super::escape_html;
use super::table::{Cell, Table};
use crate::coverage::metadata::source_hash;
use crate::coverage::report::{CoverageReport, CoverageTotals, FileCoverage};
use crate::result::ProfResult;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Colour scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    /// Dark text on light background
    #[default]
    Light,
    /// Light text on dark background
    Dark,
}

impl Theme {
    const fn css(self) -> &'static str {
        match self {
            Self::Light => {
                "body{font-family:sans-serif;color:#222;background:#fff}\
                 table{border-collapse:collapse;margin-bottom:1.5em}\
                 th,td{border:1px solid #ccc;padding:2px 8px}\
                 th{background:#eee;cursor:pointer}\
                 td.metric{text-align:right}\
                 tr.c td.code{background:#dfd}tr.nc td.code{background:#fdd}\
                 td.code{font-family:monospace;white-space:pre}"
            }
            Self::Dark => {
                "body{font-family:sans-serif;color:#ddd;background:#1e1e1e}\
                 table{border-collapse:collapse;margin-bottom:1.5em}\
                 th,td{border:1px solid #444;padding:2px 8px}\
                 th{background:#333;cursor:pointer}\
                 td.metric{text-align:right}\
                 tr.c td.code{background:#1f3d1f}tr.nc td.code{background:#4a1f1f}\
                 td.code{font-family:monospace;white-space:pre}"
            }
        }
    }
}

/// HTML report options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlReportConfig {
    /// Page title
    pub title: String,
    /// Colour scheme
    pub theme: Theme,
    /// URL of the client-side table sorter; no script tag when `None`
    pub sorter_script: Option<String>,
    /// Directory the report's source paths are relative to
    pub source_root: Option<PathBuf>,
    /// Rows in the hottest-blocks table
    pub hot_blocks: usize,
}

impl Default for HtmlReportConfig {
    fn default() -> Self {
        Self {
            title: "Coverage Report".to_string(),
            theme: Theme::Light,
            sorter_script: None,
            source_root: None,
            hot_blocks: 20,
        }
    }
}

/// HTML report generator
#[derive(Debug)]
pub struct HtmlFormatter<'a> {
    report: &'a CoverageReport,
    config: HtmlReportConfig,
}

impl<'a> HtmlFormatter<'a> {
    /// Create a formatter with default options
    #[must_use]
    pub fn new(report: &'a CoverageReport) -> Self {
        Self {
            report,
            config: HtmlReportConfig::default(),
        }
    }

    /// Replace the options
    #[must_use]
    pub fn with_config(mut self, config: HtmlReportConfig) -> Self {
        self.config = config;
        self
    }

    /// File name of a source page.
    ///
    /// Separators are flattened for readability; a digest of the full path
    /// keeps `a/B.java` and `a_B.java` apart.
    #[must_use]
    pub fn source_page_name(path: &Path) -> String {
        let text = path.to_string_lossy();
        let flat: String = text
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        let digest = source_hash(&text);
        format!("{flat}-{}.html", &digest[..8])
    }

    fn page(&self, title: &str, body: &str) -> String {
        let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(out, "<title>{}</title>", escape_html(title));
        let _ = writeln!(out, "<style>{}</style>", self.config.theme.css());
        if let Some(script) = &self.config.sorter_script {
            let _ = writeln!(out, "<script src=\"{}\" defer></script>", escape_html(script));
        }
        out.push_str("</head>\n<body>\n");
        let _ = writeln!(out, "<h1>{}</h1>", escape_html(title));
        out.push_str(body);
        out.push_str("</body>\n</html>\n");
        out
    }

    fn metric_cells(totals: &CoverageTotals) -> [Cell; 4] {
        [
            Cell::Coverage(totals.blocks),
            Cell::Coverage(totals.branches),
            Cell::Coverage(totals.lines),
            Cell::Count(totals.hits),
        ]
    }

    /// Tables of the index page, in page order
    #[must_use]
    pub fn index_tables(&self) -> Vec<(&'static str, Table)> {
        let metric_headers = ["Blocks", "Branches", "Lines", "Hits"];

        let mut summary = Table::new(["Scope"].into_iter().chain(metric_headers));
        let mut row = vec![Cell::text("Total")];
        row.extend(Self::metric_cells(&self.report.totals));
        summary.push_row(row);

        let mut packages = Table::new(["Package"].into_iter().chain(metric_headers));
        for package in &self.report.packages {
            let mut row = vec![Cell::text(package.display_name())];
            row.extend(Self::metric_cells(&package.totals));
            packages.push_row(row);
        }

        let mut classes = Table::new(["Class", "File"].into_iter().chain(metric_headers));
        for class in self.report.classes() {
            let mut row = vec![
                Cell::text(&class.name),
                Cell::Link {
                    text: class.file.display().to_string(),
                    href: Self::source_page_name(&class.file),
                },
            ];
            row.extend(Self::metric_cells(&class.totals));
            classes.push_row(row);
        }

        let mut methods = Table::new(["Class", "Method", "Line"].into_iter().chain(metric_headers));
        for class in self.report.classes() {
            for method in &class.methods {
                let mut row = vec![
                    Cell::text(&class.name),
                    Cell::text(&method.name),
                    Cell::text(method.line.to_string()),
                ];
                row.extend(Self::metric_cells(&method.totals));
                methods.push_row(row);
            }
        }

        let mut hot = Table::new(["Block", "Kind", "Class", "Method", "Line", "Hits"]);
        for block in self.report.hottest_blocks(self.config.hot_blocks) {
            hot.push_row(vec![
                Cell::text(block.id.to_string()),
                Cell::text(block.kind.label()),
                Cell::text(block.class_name),
                Cell::text(block.method_name),
                Cell::text(block.line.to_string()),
                Cell::Count(block.hits),
            ]);
        }

        vec![
            ("Summary", summary),
            ("Packages", packages),
            ("Classes", classes),
            ("Methods", methods),
            ("Hottest blocks", hot),
        ]
    }

    /// Index page
    #[must_use]
    pub fn index_html(&self) -> String {
        let mut body = String::new();
        let _ = writeln!(
            body,
            "<p>{} snapshot(s) merged</p>",
            self.report.snapshot_count
        );
        for (heading, table) in self.index_tables() {
            let _ = writeln!(body, "<h2>{heading}</h2>");
            body.push_str(&table.render_html());
        }
        self.page(&self.config.title, &body)
    }

    /// Annotated source page; `source` is `None` when the file is unavailable
    #[must_use]
    pub fn source_html(&self, file: &FileCoverage, source: Option<&str>) -> String {
        let title = file.path.display().to_string();
        let mut body = String::new();
        let _ = writeln!(
            body,
            "<p><a href=\"index.html\">index</a> &middot; lines {:.1}% ({}/{})</p>",
            file.totals.lines.percentage(),
            file.totals.lines.covered,
            file.totals.lines.total
        );
        let Some(source) = source else {
            body.push_str("<p>Source file not available.</p>\n");
            return self.page(&title, &body);
        };

        body.push_str("<table class=\"source\">\n<tbody>\n");
        for (index, text) in source.lines().enumerate() {
            let number = index as u32 + 1;
            let (class, hits) = match file.line(number) {
                Some(line) if line.is_covered() => (" class=\"c\"", line.hits.to_string()),
                Some(_) => (" class=\"nc\"", "0".to_string()),
                None => ("", String::new()),
            };
            let _ = writeln!(
                body,
                "<tr{class}><td class=\"metric\">{number}</td><td class=\"metric\">{hits}</td><td class=\"code\">{}</td></tr>",
                escape_html(text)
            );
        }
        body.push_str("</tbody>\n</table>\n");
        self.page(&title, &body)
    }

    /// Write the index and every source page into `dir`
    pub fn write_to_dir(&self, dir: &Path) -> ProfResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.report.files.len() + 1);

        let index = dir.join("index.html");
        std::fs::write(&index, self.index_html())?;
        written.push(index);

        for file in &self.report.files {
            let source = self.config.source_root.as_ref().and_then(|root| {
                let path = root.join(&file.path);
                match std::fs::read_to_string(&path) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Source not readable");
                        None
                    }
                }
            });
            let page = dir.join(Self::source_page_name(&file.path));
            std::fs::write(&page, self.source_html(file, source.as_deref()))?;
            written.push(page);
        }
        debug!(dir = %dir.display(), pages = written.len(), "Wrote HTML report");
        Ok(written)
    }
}
