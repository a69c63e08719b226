//! Report Aggregator
//!
//! Merges counts snapshots against instrumentation metadata and projects
//! the merged counts onto blocks, decision sides and source lines.
//!
//! Each block owns the lines on which it is the innermost region holding
//! code. A line owned by several blocks is covered when any of them ran, and
//! its count is the highest owner count. Lines a block reaches only after a
//! nested jump count the block's hits minus the hits of the jumping blocks.

use super::block::{Block, BlockId};
use super::metadata::{InstrumentationMetadata, UnitMetadata};
use super::report::{
    BlockCoverage, ClassCoverage, CoverageReport, CoverageTotals, FileCoverage, LineCoverage,
    MethodCoverage, PackageCoverage,
};
use super::snapshot::CountsSnapshot;
use crate::result::ProfResult;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Method name for blocks outside any method, such as field-initialiser lambdas
pub const FIELD_LEVEL_METHOD: &str = "<fields>";

/// Accumulates snapshots for one metadata file
#[derive(Debug)]
pub struct ReportAggregator<'a> {
    metadata: &'a InstrumentationMetadata,
    counts: CountsSnapshot,
    snapshots: usize,
}

impl<'a> ReportAggregator<'a> {
    /// Start with all counts at zero
    #[must_use]
    pub fn new(metadata: &'a InstrumentationMetadata) -> Self {
        Self {
            metadata,
            counts: CountsSnapshot::zeroed(metadata.len()),
            snapshots: 0,
        }
    }

    /// Merge one snapshot; a length mismatch leaves the state unchanged
    pub fn add_snapshot(&mut self, snapshot: &CountsSnapshot) -> ProfResult<()> {
        snapshot.validate_against(self.metadata)?;
        self.counts.merge(snapshot)?;
        self.snapshots += 1;
        Ok(())
    }

    /// Load and merge a snapshot file
    pub fn add_snapshot_file(&mut self, path: &Path) -> ProfResult<()> {
        let snapshot = CountsSnapshot::load(path)?;
        self.add_snapshot(&snapshot)?;
        debug!(path = %path.display(), hits = snapshot.total_hits(), "Merged snapshot");
        Ok(())
    }

    /// Merged counts so far
    #[must_use]
    pub fn counts(&self) -> &CountsSnapshot {
        &self.counts
    }

    /// Number of merged snapshots
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots
    }

    /// Build the hierarchical report
    #[must_use]
    pub fn report(&self) -> CoverageReport {
        let mut packages: BTreeMap<String, BTreeMap<String, ClassAcc>> = BTreeMap::new();
        let mut files = Vec::with_capacity(self.metadata.units.len());
        let mut totals = CoverageTotals::default();

        for unit in &self.metadata.units {
            let hits: Vec<u64> = unit
                .blocks
                .iter()
                .map(|b| self.counts.get(b.id.index()))
                .collect();
            let line_hits = unit_line_hits(unit, &hits);
            let file = file_coverage(unit, &hits, &line_hits);
            totals += file.totals;
            files.push(file);

            let classes = packages.entry(unit.package_name().to_string()).or_default();
            for (index, block) in unit.blocks.iter().enumerate() {
                let class = classes
                    .entry(block.class_name.clone())
                    .or_insert_with(|| ClassAcc::new(&unit.path));
                class.add_block(block, hits[index], &line_hits[index]);
            }
        }

        let packages = packages
            .into_iter()
            .map(|(name, classes)| {
                let mut totals = CoverageTotals::default();
                // nested classes share lines with their outer class
                let mut lines: BTreeMap<(PathBuf, u32), u64> = BTreeMap::new();
                let classes: Vec<ClassCoverage> = classes
                    .into_iter()
                    .map(|(name, acc)| {
                        let (class, class_lines) = acc.finish(name);
                        for (line, hits) in class_lines {
                            let entry = lines.entry((class.file.clone(), line)).or_insert(0);
                            *entry = (*entry).max(hits);
                        }
                        totals.blocks += class.totals.blocks;
                        totals.branches += class.totals.branches;
                        totals.hits = totals.hits.saturating_add(class.totals.hits);
                        class
                    })
                    .collect();
                for &hits in lines.values() {
                    totals.lines.record(hits > 0);
                }
                PackageCoverage {
                    name,
                    totals,
                    classes,
                }
            })
            .collect();

        CoverageReport {
            source_identity: self.metadata.source_identity.clone(),
            snapshot_count: self.snapshots,
            totals,
            packages,
            files,
        }
    }
}

/// Per-block `(line, hits)` pairs for every owned line of a unit
fn unit_line_hits(unit: &UnitMetadata, hits: &[u64]) -> Vec<Vec<(u32, u64)>> {
    let base = unit.blocks.first().map_or(0, |b| b.id.as_u32());
    let hits_of = |id: BlockId| {
        id.as_u32()
            .checked_sub(base)
            .and_then(|i| hits.get(i as usize))
            .copied()
            .unwrap_or(0)
    };
    unit.blocks
        .iter()
        .zip(hits)
        .map(|(block, &count)| block.line_hits(count, hits_of).collect())
        .collect()
}

fn file_coverage(unit: &UnitMetadata, hits: &[u64], line_hits: &[Vec<(u32, u64)>]) -> FileCoverage {
    let mut lines: BTreeMap<u32, u64> = BTreeMap::new();
    for &(line, count) in line_hits.iter().flatten() {
        let entry = lines.entry(line).or_insert(0);
        *entry = (*entry).max(count);
    }

    let mut totals = CoverageTotals::default();
    for (block, &count) in unit.blocks.iter().zip(hits) {
        record_block(&mut totals, block, count);
    }
    for &count in lines.values() {
        totals.lines.record(count > 0);
    }

    FileCoverage {
        path: unit.path.clone(),
        package: unit.package.clone(),
        source_hash: unit.source_hash.clone(),
        totals,
        lines: lines
            .into_iter()
            .map(|(line, hits)| LineCoverage { line, hits })
            .collect(),
    }
}

fn record_block(totals: &mut CoverageTotals, block: &Block, hits: u64) {
    if !block.is_synthetic() {
        totals.blocks.record(hits > 0);
    }
    if block.decision.is_some() {
        totals.branches.record(hits > 0);
    }
    totals.hits = totals.hits.saturating_add(hits);
}

#[derive(Debug)]
struct ClassAcc {
    file: PathBuf,
    methods: Vec<MethodAcc>,
}

#[derive(Debug)]
struct MethodAcc {
    name: String,
    line: u32,
    totals: CoverageTotals,
    blocks: Vec<BlockCoverage>,
    lines: BTreeMap<u32, u64>,
}

impl ClassAcc {
    fn new(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            methods: Vec::new(),
        }
    }

    fn add_block(&mut self, block: &Block, hits: u64, line_hits: &[(u32, u64)]) {
        let name = block.method_name.as_deref().unwrap_or(FIELD_LEVEL_METHOD);
        let position = self.methods.iter().position(|m| m.name == name);
        let method = match position {
            Some(i) => &mut self.methods[i],
            None => {
                self.methods.push(MethodAcc {
                    name: name.to_string(),
                    line: block.start_line,
                    totals: CoverageTotals::default(),
                    blocks: Vec::new(),
                    lines: BTreeMap::new(),
                });
                let last = self.methods.len() - 1;
                &mut self.methods[last]
            }
        };

        record_block(&mut method.totals, block, hits);
        for &(line, count) in line_hits {
            let entry = method.lines.entry(line).or_insert(0);
            *entry = (*entry).max(count);
        }
        method.blocks.push(BlockCoverage {
            id: block.id,
            kind: block.kind,
            start_line: block.start_line,
            end_line: block.end_line,
            hits,
            synthetic: block.is_synthetic(),
            decision: block.decision,
        });
    }

    /// Class coverage and the highest count of each line it owns
    fn finish(self, name: String) -> (ClassCoverage, BTreeMap<u32, u64>) {
        let mut totals = CoverageTotals::default();
        let mut class_lines: BTreeMap<u32, u64> = BTreeMap::new();
        let methods = self
            .methods
            .into_iter()
            .map(|mut m| {
                for (&line, &hits) in &m.lines {
                    m.totals.lines.record(hits > 0);
                    let entry = class_lines.entry(line).or_insert(0);
                    *entry = (*entry).max(hits);
                }
                totals.blocks += m.totals.blocks;
                totals.branches += m.totals.branches;
                totals.hits = totals.hits.saturating_add(m.totals.hits);
                MethodCoverage {
                    name: m.name,
                    line: m.line,
                    totals: m.totals,
                    blocks: m.blocks,
                }
            })
            .collect();
        for &hits in class_lines.values() {
            totals.lines.record(hits > 0);
        }
        let class = ClassCoverage {
            name,
            file: self.file,
            totals,
            methods,
        };
        (class, class_lines)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::instrument_source;
    use crate::{InstrumentConfig, ProfError};

    fn metadata(source: &str) -> InstrumentationMetadata {
        let config = InstrumentConfig::default();
        instrument_source(Path::new("A.java"), source, &config)
            .unwrap()
            .into_metadata(&config)
    }

    const ABS: &str = "class A {\n\
                       int abs(int x) {\n\
                         if (x < 0) {\n\
                           x = -x;\n\
                         }\n\
                         return x;\n\
                       }\n\
                       }\n";

    #[test]
    fn test_one_sided_decision_is_half_covered() {
        let metadata = metadata(ABS);
        let mut aggregator = ReportAggregator::new(&metadata);
        aggregator.add_snapshot(&CountsSnapshot::new(vec![1, 0, 1])).unwrap();
        let report = aggregator.report();
        assert_eq!(report.totals.branches.covered, 1);
        assert_eq!(report.totals.branches.total, 2);
        assert_eq!(report.totals.blocks.covered, 1);
        assert_eq!(report.totals.blocks.total, 2);
    }

    #[test]
    fn test_mismatch_leaves_state_unchanged() {
        let metadata = metadata(ABS);
        let mut aggregator = ReportAggregator::new(&metadata);
        let err = aggregator
            .add_snapshot(&CountsSnapshot::new(vec![1, 1]))
            .unwrap_err();
        assert!(matches!(err, ProfError::CountMismatch { expected: 3, actual: 2 }));
        assert_eq!(aggregator.snapshot_count(), 0);
        assert_eq!(aggregator.counts().counts(), &[0, 0, 0]);
    }

    #[test]
    fn test_snapshots_accumulate() {
        let metadata = metadata(ABS);
        let mut aggregator = ReportAggregator::new(&metadata);
        aggregator.add_snapshot(&CountsSnapshot::new(vec![1, 0, 2])).unwrap();
        aggregator.add_snapshot(&CountsSnapshot::new(vec![0, 3, 0])).unwrap();
        assert_eq!(aggregator.counts().counts(), &[1, 3, 2]);
        let report = aggregator.report();
        assert_eq!(report.snapshot_count, 2);
        assert_eq!(report.totals.branches.covered, 2);
        assert_eq!(report.totals.hits, 6);
    }

    #[test]
    fn test_interior_lines_belong_to_child() {
        let metadata = metadata(ABS);
        let mut aggregator = ReportAggregator::new(&metadata);
        aggregator.add_snapshot(&CountsSnapshot::new(vec![1, 0, 1])).unwrap();
        let report = aggregator.report();
        let file = report.file(Path::new("A.java")).unwrap();
        // line 4 holds only code of the if body, which never ran
        assert!(file.line(3).unwrap().is_covered());
        assert!(!file.line(4).unwrap().is_covered());
        assert!(file.line(6).unwrap().is_covered());
        assert!(file.line(8).is_none());
    }

    #[test]
    fn test_line_shared_by_blocks_is_covered_by_any() {
        let metadata = metadata("class A { void f(boolean c) { if (c) a(); else b(); } }");
        let mut aggregator = ReportAggregator::new(&metadata);
        aggregator.add_snapshot(&CountsSnapshot::new(vec![1, 0, 1])).unwrap();
        let report = aggregator.report();
        assert_eq!(report.totals.lines.total, 1);
        assert_eq!(report.totals.lines.covered, 1);
        assert_eq!(report.files[0].lines[0].hits, 1);
    }

    #[test]
    fn test_hierarchy() {
        let metadata = metadata(
            "package p; class A { void f() { } void g() { } class B { void h() { } } }",
        );
        let mut aggregator = ReportAggregator::new(&metadata);
        aggregator.add_snapshot(&CountsSnapshot::new(vec![4, 0, 9])).unwrap();
        let report = aggregator.report();
        let package = report.package("p").unwrap();
        assert_eq!(package.classes.len(), 2);
        let a = report.class("A").unwrap();
        assert_eq!(a.methods.len(), 2);
        assert_eq!(a.methods[0].name, "f");
        assert_eq!(a.totals.blocks.covered, 1);
        let b = report.class("A.B").unwrap();
        assert_eq!(b.methods[0].blocks[0].hits, 9);
        assert_eq!(package.totals.hits, 13);
    }

    #[test]
    fn test_nested_class_lines_counted_once_per_package() {
        let metadata = metadata("package p; class A { void f() { } class B { void h() { } } }");
        let mut aggregator = ReportAggregator::new(&metadata);
        aggregator.add_snapshot(&CountsSnapshot::new(vec![0, 3])).unwrap();
        let report = aggregator.report();
        let file_lines = report.files[0].totals.lines;
        let package = report.package("p").unwrap();
        assert_eq!(file_lines.total, 1);
        assert_eq!(package.totals.lines.total, file_lines.total);
        assert_eq!(package.totals.lines.covered, 1);
        assert_eq!(report.class("A").unwrap().totals.lines.covered, 0);
        assert_eq!(report.class("A.B").unwrap().totals.lines.covered, 1);
    }

    const EARLY_RETURN: &str = "class A {\n\
                                int f(int x) {\n\
                                  if (x > 0) return 1;\n\
                                  int y = 2;\n\
                                  return y;\n\
                                }\n\
                                }\n";

    #[test]
    fn test_code_after_early_return_counts_remaining_runs() {
        let metadata = metadata(EARLY_RETURN);
        let mut aggregator = ReportAggregator::new(&metadata);
        // method entered once and the if branch returned
        aggregator.add_snapshot(&CountsSnapshot::new(vec![1, 1, 0])).unwrap();
        let report = aggregator.report();
        let file = report.file(Path::new("A.java")).unwrap();
        assert_eq!(file.line(3).unwrap().hits, 1);
        assert_eq!(file.line(4).unwrap().hits, 0);
        assert!(!file.line(5).unwrap().is_covered());
        assert_eq!(report.class("A").unwrap().methods[0].totals.lines.covered, 1);

        aggregator.add_snapshot(&CountsSnapshot::new(vec![2, 0, 2])).unwrap();
        let report = aggregator.report();
        let file = report.file(Path::new("A.java")).unwrap();
        assert_eq!(file.line(4).unwrap().hits, 2);
        assert_eq!(file.line(3).unwrap().hits, 3);
    }

    #[test]
    fn test_hottest_blocks() {
        let metadata = metadata("class A { void f() { } void g() { } void h() { } }");
        let mut aggregator = ReportAggregator::new(&metadata);
        aggregator.add_snapshot(&CountsSnapshot::new(vec![5, 50, 5])).unwrap();
        let hot = aggregator.report().hottest_blocks(2);
        assert_eq!(hot.len(), 2);
        assert_eq!(hot[0].method_name, "g");
        assert_eq!(hot[1].method_name, "f");
    }

    #[test]
    fn test_field_level_lambda_grouping() {
        let metadata = metadata("class A { Runnable r = () -> { go(); }; }");
        let report = ReportAggregator::new(&metadata).report();
        let class = report.class("A").unwrap();
        assert_eq!(class.methods[0].name, FIELD_LEVEL_METHOD);
    }

    #[test]
    fn test_empty_metadata() {
        let metadata = metadata("interface I { void f(); }");
        let mut aggregator = ReportAggregator::new(&metadata);
        aggregator.add_snapshot(&CountsSnapshot::new(vec![])).unwrap();
        let report = aggregator.report();
        assert_eq!(report.totals.blocks.total, 0);
        assert_eq!(report.totals.blocks.percentage(), 100.0);
    }
}
