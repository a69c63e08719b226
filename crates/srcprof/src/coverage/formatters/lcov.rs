//! LCOV Report Formatter
//!
//! Exports line, function and branch data for tools that read LCOV.
//!
//! ## LCOV Format
//!
//! ```text
//! TN:<test name>
//! SF:<source file>
//! FN:<line>,<function name>
//! FNDA:<execution count>,<function name>
//! FNF:<functions found>
//! FNH:<functions hit>
//! BRDA:<line>,<decision>,<side>,<taken>
//! BRF:<branches found>
//! BRH:<branches hit>
//! DA:<line>,<execution count>
//! LF:<lines found>
//! LH:<lines hit>
//! end_of_record
//! ```

use crate::coverage::block::Side;
use crate::coverage::{ClassCoverage, CoverageReport, FileCoverage};
use crate::result::ProfResult;
use std::fmt::Write;
use std::path::Path;

/// LCOV format report generator
#[derive(Debug)]
pub struct LcovFormatter<'a> {
    report: &'a CoverageReport,
    test_name: Option<String>,
}

impl<'a> LcovFormatter<'a> {
    /// Create a new LCOV formatter from coverage data
    #[must_use]
    pub fn new(report: &'a CoverageReport) -> Self {
        Self {
            report,
            test_name: None,
        }
    }

    /// Set the test name for the report
    #[must_use]
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    /// Generate LCOV format report as a string
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "TN:{}", self.test_name.as_deref().unwrap_or(""));

        for file in &self.report.files {
            let classes: Vec<&ClassCoverage> = self
                .report
                .classes()
                .filter(|c| c.file == file.path)
                .collect();
            Self::write_file(&mut output, file, &classes);
        }
        output
    }

    fn write_file(output: &mut String, file: &FileCoverage, classes: &[&ClassCoverage]) {
        let _ = writeln!(output, "SF:{}", file.path.display());

        let mut found = 0;
        let mut hit = 0;
        for class in classes {
            for method in &class.methods {
                let name = format!("{}.{}", class.name, method.name);
                let entries = method.blocks.first().map_or(0, |b| b.hits);
                let _ = writeln!(output, "FN:{},{name}", method.line);
                let _ = writeln!(output, "FNDA:{entries},{name}");
                found += 1;
                if entries > 0 {
                    hit += 1;
                }
            }
        }
        let _ = writeln!(output, "FNF:{found}");
        let _ = writeln!(output, "FNH:{hit}");

        let mut branches_found = 0;
        let mut branches_hit = 0;
        for class in classes {
            for block in class.methods.iter().flat_map(|m| m.blocks.iter()) {
                let Some(decision) = block.decision else {
                    continue;
                };
                let side = match decision.side {
                    Side::True => 0,
                    Side::False => 1,
                };
                let taken = if block.hits > 0 {
                    block.hits.to_string()
                } else {
                    "-".to_string()
                };
                let _ = writeln!(
                    output,
                    "BRDA:{},{},{side},{taken}",
                    block.start_line,
                    decision.id.as_u32()
                );
                branches_found += 1;
                if block.hits > 0 {
                    branches_hit += 1;
                }
            }
        }
        let _ = writeln!(output, "BRF:{branches_found}");
        let _ = writeln!(output, "BRH:{branches_hit}");

        for line in &file.lines {
            let _ = writeln!(output, "DA:{},{}", line.line, line.hits);
        }
        let _ = writeln!(output, "LF:{}", file.totals.lines.total);
        let _ = writeln!(output, "LH:{}", file.totals.lines.covered);
        output.push_str("end_of_record\n");
    }

    /// Save the LCOV report to a file
    pub fn save(&self, path: &Path) -> ProfResult<()> {
        std::fs::write(path, self.generate())?;
        Ok(())
    }
}
