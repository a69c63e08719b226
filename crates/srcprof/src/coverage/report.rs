//! Coverage Report
//!
//! Hierarchical result of aggregating counts against metadata:
//! totals, then packages, classes, methods and blocks, plus per-file line
//! data for annotated source views. Percentages are derived on demand.

use super::block::{BlockId, BlockKind, DecisionRef};
use crate::result::ProfResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Covered-of-total counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Items with at least one hit
    pub covered: usize,
    /// All items
    pub total: usize,
}

impl Metric {
    /// Create a metric
    #[must_use]
    pub const fn new(covered: usize, total: usize) -> Self {
        Self { covered, total }
    }

    /// Count one item
    pub fn record(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.covered += 1;
        }
    }

    /// Items without hits
    #[must_use]
    pub const fn missed(&self) -> usize {
        self.total - self.covered
    }

    /// Coverage in `[0, 100]`
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0; // Vacuously true
        }
        (self.covered as f64 / self.total as f64) * 100.0
    }
}

impl std::ops::AddAssign for Metric {
    fn add_assign(&mut self, rhs: Self) {
        self.covered += rhs.covered;
        self.total += rhs.total;
    }
}

/// Block, branch and line metrics plus hit total of one report node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageTotals {
    /// Non-synthetic blocks entered at least once
    pub blocks: Metric,
    /// Decision sides taken at least once
    pub branches: Metric,
    /// Source lines executed at least once
    pub lines: Metric,
    /// Sum of block counts
    pub hits: u64,
}

impl std::ops::AddAssign for CoverageTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.blocks += rhs.blocks;
        self.branches += rhs.branches;
        self.lines += rhs.lines;
        self.hits = self.hits.saturating_add(rhs.hits);
    }
}

/// One block with its count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCoverage {
    /// Counter id
    pub id: BlockId,
    /// Region kind
    pub kind: BlockKind,
    /// First line
    pub start_line: u32,
    /// Last line
    pub end_line: u32,
    /// Execution count
    pub hits: u64,
    /// Materialised else branch
    #[serde(default)]
    pub synthetic: bool,
    /// Decision side, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionRef>,
}

/// Method-level node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCoverage {
    /// Method name; initializers use `<init>`/`<clinit>`, field-level code `<fields>`
    pub name: String,
    /// First line of the method's first block
    pub line: u32,
    /// Metrics
    pub totals: CoverageTotals,
    /// Blocks in id order
    pub blocks: Vec<BlockCoverage>,
}

/// Class-level node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCoverage {
    /// Class name, nested names joined with `.`
    pub name: String,
    /// Declaring file
    pub file: PathBuf,
    /// Metrics
    pub totals: CoverageTotals,
    /// Methods in document order
    pub methods: Vec<MethodCoverage>,
}

/// Package-level node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageCoverage {
    /// Package name, empty for the default package
    pub name: String,
    /// Metrics
    pub totals: CoverageTotals,
    /// Classes sorted by name
    pub classes: Vec<ClassCoverage>,
}

impl PackageCoverage {
    /// Display name
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(default)"
        } else {
            &self.name
        }
    }
}

/// Count for one source line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCoverage {
    /// 1-based line
    pub line: u32,
    /// Highest count among blocks owning the line
    pub hits: u64,
}

impl LineCoverage {
    /// Whether the line ran
    #[must_use]
    pub const fn is_covered(&self) -> bool {
        self.hits > 0
    }
}

/// Per-file line projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Source path
    pub path: PathBuf,
    /// Declared package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// SHA-256 of the instrumented source
    pub source_hash: String,
    /// Metrics
    pub totals: CoverageTotals,
    /// Executable lines in ascending order
    pub lines: Vec<LineCoverage>,
}

impl FileCoverage {
    /// Line record by number
    #[must_use]
    pub fn line(&self, line: u32) -> Option<&LineCoverage> {
        self.lines
            .binary_search_by_key(&line, |l| l.line)
            .ok()
            .and_then(|i| self.lines.get(i))
    }
}

/// Block ranked by hit count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotBlock {
    /// Counter id
    pub id: BlockId,
    /// Region kind
    pub kind: BlockKind,
    /// Owning class
    pub class_name: String,
    /// Owning method
    pub method_name: String,
    /// Declaring file
    pub file: PathBuf,
    /// First line
    pub line: u32,
    /// Execution count
    pub hits: u64,
}

/// Aggregated coverage of a whole program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Source identity of the metadata the counts were matched against
    pub source_identity: String,
    /// Number of merged snapshots
    pub snapshot_count: usize,
    /// Whole-program metrics
    pub totals: CoverageTotals,
    /// Packages sorted by name
    pub packages: Vec<PackageCoverage>,
    /// Files in metadata order
    pub files: Vec<FileCoverage>,
}

impl CoverageReport {
    /// All classes across packages
    pub fn classes(&self) -> impl Iterator<Item = &ClassCoverage> {
        self.packages.iter().flat_map(|p| p.classes.iter())
    }

    /// Package by name
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&PackageCoverage> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Class by name
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassCoverage> {
        self.classes().find(|c| c.name == name)
    }

    /// File by path
    #[must_use]
    pub fn file(&self, path: &Path) -> Option<&FileCoverage> {
        self.files.iter().find(|f| f.path == path)
    }

    /// The `n` most executed blocks, ties broken by id
    #[must_use]
    pub fn hottest_blocks(&self, n: usize) -> Vec<HotBlock> {
        let mut hot: Vec<HotBlock> = self
            .classes()
            .flat_map(|class| {
                class.methods.iter().flat_map(move |method| {
                    method
                        .blocks
                        .iter()
                        .filter(|b| !b.synthetic && b.hits > 0)
                        .map(move |block| HotBlock {
                            id: block.id,
                            kind: block.kind,
                            class_name: class.name.clone(),
                            method_name: method.name.clone(),
                            file: class.file.clone(),
                            line: block.start_line,
                            hits: block.hits,
                        })
                })
            })
            .collect();
        hot.sort_by(|a, b| b.hits.cmp(&a.hits).then(a.id.cmp(&b.id)));
        hot.truncate(n);
        hot
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> ProfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON form to a file
    pub fn save_json(&self, path: &Path) -> ProfResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
