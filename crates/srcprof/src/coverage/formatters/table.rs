//! Report tables and the column sort contract.
//!
//! HTML pages are sorted client-side by an external script. [`Table`]
//! implements the same rules so text tables and tests agree with it:
//!
//! - the first sort of a metric column is descending, any other ascending
//! - sorting the active column again reverses the rows instead of re-sorting
//! - coverage cells compare by percentage, then by total
//! - other metric cells compare by total
//! - text cells compare numerically when both parse, else lexicographically
//! - exactly one header carries the active indicator

use super::escape_html;
use crate::coverage::report::Metric;
use crate::result::{ProfError, ProfResult};
use std::cmp::Ordering;
use std::fmt::Write;

/// One table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Plain text
    Text(String),
    /// Text with a link target
    Link {
        /// Visible text
        text: String,
        /// Relative URL
        href: String,
    },
    /// Numeric metric
    Count(u64),
    /// Covered-of-total metric
    Coverage(Metric),
}

impl Cell {
    /// Plain text cell
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Whether the cell is a metric cell
    #[must_use]
    pub const fn is_metric(&self) -> bool {
        matches!(self, Self::Count(_) | Self::Coverage(_))
    }

    /// Total used for metric comparison
    #[must_use]
    pub const fn total(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            Self::Coverage(m) => Some(m.total as u64),
            Self::Text(_) | Self::Link { .. } => None,
        }
    }

    /// Displayed text
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) | Self::Link { text: s, .. } => s.clone(),
            Self::Count(n) => n.to_string(),
            Self::Coverage(m) => format!("{:.1}% ({}/{})", m.percentage(), m.covered, m.total),
        }
    }

    /// Order two cells of the same column
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Coverage(a), Self::Coverage(b)) => a
                .percentage()
                .total_cmp(&b.percentage())
                .then(a.total.cmp(&b.total)),
            (a, b) if a.is_metric() && b.is_metric() => a.total().cmp(&b.total()),
            (a, b) => {
                let (a, b) = (a.display(), b.display());
                match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                    (Ok(x), Ok(y)) => x.total_cmp(&y),
                    _ => a.cmp(&b),
                }
            }
        }
    }

    fn render_html(&self, out: &mut String) {
        match self {
            Self::Text(s) => {
                let _ = write!(out, "<td>{}</td>", escape_html(s));
            }
            Self::Link { text, href } => {
                let _ = write!(
                    out,
                    "<td><a href=\"{}\">{}</a></td>",
                    escape_html(href),
                    escape_html(text)
                );
            }
            Self::Count(n) => {
                let _ = write!(out, "<td class=\"metric\">{n}</td>");
            }
            Self::Coverage(m) => {
                let _ = write!(
                    out,
                    "<td class=\"metric coverage\" data-percentage=\"{:.2}\" data-total=\"{}\">{}</td>",
                    m.percentage(),
                    m.total,
                    escape_html(&self.display())
                );
            }
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

impl SortOrder {
    const fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    const fn indicator(self) -> &'static str {
        match self {
            Self::Ascending => "\u{25b2}",
            Self::Descending => "\u{25bc}",
        }
    }
}

/// Sortable report table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    sorted: Option<(usize, SortOrder)>,
}

impl Table {
    /// Create an empty table
    #[must_use]
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            sorted: None,
        }
    }

    /// Append a data row
    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Column headers
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows in current order
    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Active sort column and direction
    #[must_use]
    pub const fn sorted(&self) -> Option<(usize, SortOrder)> {
        self.sorted
    }

    /// Index of a header by name, case-insensitive
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Whether a column holds metric cells, judged by its first row
    #[must_use]
    pub fn is_metric_column(&self, column: usize) -> bool {
        self.rows
            .first()
            .and_then(|row| row.get(column))
            .is_some_and(Cell::is_metric)
    }

    /// Displayed values of one column
    #[must_use]
    pub fn column_values(&self, column: usize) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(column).map(Cell::display).unwrap_or_default())
            .collect()
    }

    /// Sort as if the column header was clicked
    pub fn sort_by_column(&mut self, column: usize) -> ProfResult<SortOrder> {
        if column >= self.headers.len() {
            return Err(ProfError::invalid_state(format!(
                "no column {column} in a table of {}",
                self.headers.len()
            )));
        }
        let order = match self.sorted {
            Some((active, order)) if active == column => {
                self.rows.reverse();
                order.reversed()
            }
            _ => {
                let order = if self.is_metric_column(column) {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                };
                let empty = Cell::text("");
                self.rows.sort_by(|a, b| {
                    let a = a.get(column).unwrap_or(&empty);
                    let b = b.get(column).unwrap_or(&empty);
                    match order {
                        SortOrder::Ascending => a.compare(b),
                        SortOrder::Descending => b.compare(a),
                    }
                });
                order
            }
        };
        self.sorted = Some((column, order));
        Ok(order)
    }

    /// Header text with the active indicator, if any
    #[must_use]
    pub fn header_label(&self, column: usize) -> String {
        let header = self.headers.get(column).cloned().unwrap_or_default();
        match self.sorted {
            Some((active, order)) if active == column => format!("{header} {}", order.indicator()),
            _ => header,
        }
    }

    /// Render as an HTML table tagged for the external sorter
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::from("<table class=\"sortable\">\n<thead><tr>");
        for (i, header) in self.headers.iter().enumerate() {
            match self.sorted {
                Some((active, order)) if active == i => {
                    let class = match order {
                        SortOrder::Ascending => "sorted-asc",
                        SortOrder::Descending => "sorted-desc",
                    };
                    let _ = write!(
                        out,
                        "<th class=\"{class}\">{}<span class=\"indicator\">{}</span></th>",
                        escape_html(header),
                        order.indicator()
                    );
                }
                _ => {
                    let _ = write!(out, "<th>{}</th>", escape_html(header));
                }
            }
        }
        out.push_str("</tr></thead>\n<tbody>\n");
        for row in &self.rows {
            out.push_str("<tr>");
            for cell in row {
                cell.render_html(&mut out);
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>\n");
        out
    }

    /// Render as aligned plain text
    #[must_use]
    pub fn render_text(&self) -> String {
        let labels: Vec<String> = (0..self.headers.len()).map(|i| self.header_label(i)).collect();
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(Cell::display).collect())
            .collect();
        let widths: Vec<usize> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(label.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        let line = |out: &mut String, values: &[String]| {
            let padded: Vec<String> = values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{v:<w$}"))
                .collect();
            out.push_str(padded.join("  ").trim_end());
            out.push('\n');
        };
        line(&mut out, &labels);
        for row in &cells {
            line(&mut out, row);
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn totals(table: &Table, column: usize) -> Vec<u64> {
        table
            .rows()
            .iter()
            .map(|r| r[column].total().unwrap())
            .collect()
    }

    #[test]
    fn test_metric_column_first_sort_descending_then_reverse() {
        let mut table = Table::new(["Class", "Blocks"]);
        table.push_row(vec![Cell::text("A"), Cell::Coverage(Metric::new(3, 10))]);
        table.push_row(vec![Cell::text("B"), Cell::Coverage(Metric::new(3, 5))]);
        table.push_row(vec![Cell::text("C"), Cell::Coverage(Metric::new(14, 20))]);

        assert_eq!(table.sort_by_column(1).unwrap(), SortOrder::Descending);
        assert_eq!(totals(&table, 1), vec![20, 5, 10]);
        assert_eq!(table.sort_by_column(1).unwrap(), SortOrder::Ascending);
        assert_eq!(totals(&table, 1), vec![10, 5, 20]);
    }

    #[test]
    fn test_plain_metric_compares_by_total() {
        let mut table = Table::new(["Hits"]);
        for n in [10, 5, 20] {
            table.push_row(vec![Cell::Count(n)]);
        }
        table.sort_by_column(0).unwrap();
        assert_eq!(totals(&table, 0), vec![20, 10, 5]);
    }

    #[test]
    fn test_coverage_ties_fall_back_to_total() {
        let mut table = Table::new(["Lines"]);
        table.push_row(vec![Cell::Coverage(Metric::new(1, 2))]);
        table.push_row(vec![Cell::Coverage(Metric::new(4, 8))]);
        table.sort_by_column(0).unwrap();
        assert_eq!(totals(&table, 0), vec![8, 2]);
    }

    #[test]
    fn test_text_column_sorts_numerically_when_numbers() {
        let mut table = Table::new(["Line"]);
        for v in ["10", "2", "33"] {
            table.push_row(vec![Cell::text(v)]);
        }
        assert_eq!(table.sort_by_column(0).unwrap(), SortOrder::Ascending);
        assert_eq!(table.column_values(0), vec!["2", "10", "33"]);
    }

    #[test]
    fn test_text_column_sorts_lexicographically_otherwise() {
        let mut table = Table::new(["Name"]);
        for v in ["beta", "10", "alpha"] {
            table.push_row(vec![Cell::text(v)]);
        }
        table.sort_by_column(0).unwrap();
        assert_eq!(table.column_values(0), vec!["10", "alpha", "beta"]);
    }

    #[test]
    fn test_switching_columns_resorts_with_default_order() {
        let mut table = Table::new(["Name", "Hits"]);
        table.push_row(vec![Cell::text("b"), Cell::Count(1)]);
        table.push_row(vec![Cell::text("a"), Cell::Count(2)]);
        table.sort_by_column(1).unwrap();
        assert_eq!(table.sort_by_column(0).unwrap(), SortOrder::Ascending);
        assert_eq!(table.column_values(0), vec!["a", "b"]);
    }

    #[test]
    fn test_single_active_indicator() {
        let mut table = Table::new(["Name", "Hits"]);
        table.push_row(vec![Cell::text("a"), Cell::Count(2)]);
        table.sort_by_column(0).unwrap();
        table.sort_by_column(1).unwrap();
        let html = table.render_html();
        assert_eq!(html.matches("class=\"indicator\"").count(), 1);
        assert!(html.contains("<th class=\"sorted-desc\">Hits"));
        assert_eq!(table.header_label(0), "Name");
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut table = Table::new(["Name"]);
        assert!(table.sort_by_column(3).is_err());
    }

    #[test]
    fn test_metric_cell_attributes() {
        let mut table = Table::new(["Name", "Hits", "Branches"]);
        table.push_row(vec![
            Cell::text("<A>"),
            Cell::Count(7),
            Cell::Coverage(Metric::new(1, 2)),
        ]);
        let html = table.render_html();
        assert!(html.contains("<table class=\"sortable\">"));
        assert!(html.contains("<td>&lt;A&gt;</td>"));
        assert!(html.contains("<td class=\"metric\">7</td>"));
        assert!(html.contains(
            "<td class=\"metric coverage\" data-percentage=\"50.00\" data-total=\"2\">50.0% (1/2)</td>"
        ));
    }

    #[test]
    fn test_render_text_aligns_columns() {
        let mut table = Table::new(["Name", "Hits"]);
        table.push_row(vec![Cell::text("alpha"), Cell::Count(3)]);
        let text = table.render_text();
        assert_eq!(text, "Name   Hits\nalpha  3\n");
    }
}
