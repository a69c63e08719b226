//! Instrumenter
//!
//! Rewrites source text so that entering any block bumps its counter.
//! Every edit is collected as a [`CodeInsert`] against the original text and
//! applied in one ascending pass, so offsets never need adjusting.
//!
//! Inserts sharing an offset are ordered closers before openers; closers
//! innermost first and openers outermost first. This keeps the braces added
//! for nested braceless bodies, lambdas and synthetic else branches properly
//! nested.

use super::block::{Block, BlockId, BodyShape, Side};
use super::extractor::{extract_blocks, ExtractionOutcome};
use super::metadata::{source_hash, InstrumentationMetadata, UnitMetadata};
use crate::config::InstrumentConfig;
use crate::result::ProfResult;
use crate::syntax;
use std::path::Path;
use tracing::debug;

/// Whether an insert closes or opens a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InsertPhase {
    /// Closes a region (`}`, `;}`, ` else {..}`, `, t, f)`)
    Close,
    /// Opens a region (`{`, counter statement, `branch(`)
    Open,
}

/// Text to insert at an offset of the original source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInsert {
    /// Byte offset into the original text
    pub offset: usize,
    /// Inserted text
    pub text: String,
    /// Open or close
    pub phase: InsertPhase,
    /// Length of the region the insert belongs to
    pub span_len: usize,
    /// Nesting depth of the owning block
    pub depth: u32,
}

impl CodeInsert {
    /// Create an opening insert
    #[must_use]
    pub fn opener(offset: usize, text: impl Into<String>, span_len: usize, depth: u32) -> Self {
        Self {
            offset,
            text: text.into(),
            phase: InsertPhase::Open,
            span_len,
            depth,
        }
    }

    /// Create a closing insert
    #[must_use]
    pub fn closer(offset: usize, text: impl Into<String>, span_len: usize, depth: u32) -> Self {
        Self {
            offset,
            text: text.into(),
            phase: InsertPhase::Close,
            span_len,
            depth,
        }
    }

    fn sort_key(&self, seq: usize) -> (usize, InsertPhase, i64, i64, usize) {
        let span = self.span_len as i64;
        let depth = i64::from(self.depth);
        match self.phase {
            InsertPhase::Close => (self.offset, self.phase, span, -depth, seq),
            InsertPhase::Open => (self.offset, self.phase, -span, depth, seq),
        }
    }
}

/// Apply inserts to the original text in one ascending pass.
///
/// Inserts are ordered by offset, then phase, span and depth; ties keep
/// their input order. Offsets past the end of the text are clamped.
#[must_use]
pub fn apply_inserts(source: &str, inserts: &[CodeInsert]) -> String {
    let mut ordered: Vec<(usize, &CodeInsert)> = inserts.iter().enumerate().collect();
    ordered.sort_by_key(|(seq, insert)| insert.sort_key(*seq));

    let extra: usize = inserts.iter().map(|i| i.text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut prev = 0;
    for (_, insert) in ordered {
        let offset = insert.offset.clamp(prev, source.len());
        out.push_str(source.get(prev..offset).unwrap_or_default());
        out.push_str(&insert.text);
        prev = offset;
    }
    out.push_str(source.get(prev..).unwrap_or_default());
    out
}

/// Produces counter inserts for a block inventory
#[derive(Debug, Clone)]
pub struct Instrumenter<'a> {
    counter_class: &'a str,
}

impl<'a> Instrumenter<'a> {
    /// Create an instrumenter for the configured counter class
    #[must_use]
    pub fn new(config: &'a InstrumentConfig) -> Self {
        Self {
            counter_class: &config.counter_class,
        }
    }

    fn inc(&self, id: BlockId) -> String {
        format!("{}.inc({});", self.counter_class, id.as_u32())
    }

    /// All inserts needed to count every block of a unit
    #[must_use]
    pub fn inserts(&self, outcome: &ExtractionOutcome) -> Vec<CodeInsert> {
        let depths = depths(&outcome.blocks);
        let mut inserts = Vec::with_capacity(outcome.blocks.len() * 2);
        for (block, &depth) in outcome.blocks.iter().zip(&depths) {
            let len = block.end - block.start;
            let inc = self.inc(block.id);
            match block.shape {
                BodyShape::Braced | BodyShape::ColonCase => {
                    inserts.push(CodeInsert::opener(block.insert_at, inc, len, depth));
                }
                BodyShape::Braceless => {
                    inserts.push(CodeInsert::opener(block.start, format!("{{{inc}"), len, depth));
                    inserts.push(CodeInsert::closer(block.end, "}", len, depth));
                }
                BodyShape::LambdaExpression { returns } => {
                    let open = if returns {
                        format!("{{{inc}return ")
                    } else {
                        format!("{{{inc}")
                    };
                    inserts.push(CodeInsert::opener(block.start, open, len, depth));
                    inserts.push(CodeInsert::closer(block.end, ";}", len, depth));
                }
                BodyShape::ArrowCase { yields } => {
                    let open = if yields {
                        format!("{{{inc}yield ")
                    } else {
                        format!("{{{inc}")
                    };
                    inserts.push(CodeInsert::opener(block.start, open, len, depth));
                    inserts.push(CodeInsert::closer(block.end, "}", len, depth));
                }
                BodyShape::SyntheticElse { statement_start } => {
                    let span = block.insert_at.saturating_sub(statement_start);
                    let text = format!(" else {{{inc}}}");
                    inserts.push(CodeInsert::closer(block.insert_at, text, span, depth));
                }
                BodyShape::TernaryOperand { condition } | BodyShape::LoopCondition { condition } => {
                    // the condition is wrapped once, from the true side
                    let false_side = block
                        .decision
                        .filter(|d| d.side == Side::True)
                        .and_then(|_| outcome.decision_of(block))
                        .map(|d| d.false_side);
                    if let Some(false_side) = false_side {
                        let cond_len = condition.len();
                        inserts.push(CodeInsert::opener(
                            condition.start,
                            format!("{}.branch(", self.counter_class),
                            cond_len,
                            depth,
                        ));
                        inserts.push(CodeInsert::closer(
                            condition.end,
                            format!(", {}, {})", block.id.as_u32(), false_side.as_u32()),
                            cond_len,
                            depth,
                        ));
                    }
                }
            }
        }
        inserts
    }

    /// Rewrite a unit's source text
    #[must_use]
    pub fn rewrite(&self, source: &str, outcome: &ExtractionOutcome) -> String {
        apply_inserts(source, &self.inserts(outcome))
    }
}

/// Nesting depth per block; parents always precede children
fn depths(blocks: &[Block]) -> Vec<u32> {
    let base = blocks.first().map_or(0, |b| b.id.as_u32());
    let mut depths: Vec<u32> = Vec::with_capacity(blocks.len());
    for block in blocks {
        let depth = block
            .parent
            .and_then(|p| p.as_u32().checked_sub(base))
            .and_then(|i| depths.get(i as usize))
            .map_or(0, |d| d + 1);
        depths.push(depth);
    }
    depths
}

/// One instrumented compilation unit
#[derive(Debug, Clone)]
pub struct InstrumentedUnit {
    /// Block inventory, ids already final
    pub outcome: ExtractionOutcome,
    /// Rewritten source text
    pub rewritten: String,
    /// SHA-256 of the original text
    pub source_hash: String,
}

impl InstrumentedUnit {
    /// Instrument an already-extracted unit
    #[must_use]
    pub fn from_outcome(source: &str, outcome: ExtractionOutcome, config: &InstrumentConfig) -> Self {
        let rewritten = Instrumenter::new(config).rewrite(source, &outcome);
        Self {
            outcome,
            rewritten,
            source_hash: source_hash(source),
        }
    }

    /// Metadata record for this unit
    #[must_use]
    pub fn unit_metadata(&self) -> UnitMetadata {
        UnitMetadata::from_outcome(&self.outcome, self.source_hash.clone())
    }

    /// Metadata for a program consisting of this unit alone
    #[must_use]
    pub fn into_metadata(self, config: &InstrumentConfig) -> InstrumentationMetadata {
        InstrumentationMetadata::from_units(vec![self.unit_metadata()], &config.counter_class)
    }
}

/// Parse, extract and rewrite one source text with ids starting at zero
pub fn instrument_source(
    path: &Path,
    source: &str,
    config: &InstrumentConfig,
) -> ProfResult<InstrumentedUnit> {
    let unit = syntax::parse(path, source)?;
    let outcome = extract_blocks(&unit, source, &config.lambda_overrides)?;
    debug!(
        file = %path.display(),
        blocks = outcome.blocks.len(),
        decisions = outcome.decisions.len(),
        "Extracted blocks"
    );
    Ok(InstrumentedUnit::from_outcome(source, outcome, config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn rewrite(source: &str) -> String {
        instrument_source(Path::new("T.java"), source, &InstrumentConfig::default())
            .unwrap()
            .rewritten
    }

    fn compact(s: &str) -> String {
        s.replace("auxiliary.__Counter.", "")
    }

    mod insert_order_tests {
        use super::*;

        #[test]
        fn test_single_pass_application() {
            let inserts = vec![
                CodeInsert::opener(3, "[", 1, 0),
                CodeInsert::opener(0, "<", 1, 0),
                CodeInsert::closer(6, "]", 1, 0),
            ];
            assert_eq!(apply_inserts("abcdef", &inserts), "<abc[def]");
        }

        #[test]
        fn test_closers_before_openers() {
            let inserts = vec![
                CodeInsert::opener(2, "(", 4, 0),
                CodeInsert::closer(2, ")", 4, 0),
            ];
            assert_eq!(apply_inserts("abcd", &inserts), "ab)(cd");
        }

        #[test]
        fn test_closers_inner_first_openers_outer_first() {
            let inserts = vec![
                CodeInsert::closer(4, "}a", 10, 1),
                CodeInsert::closer(4, "}b", 4, 2),
                CodeInsert::opener(0, "{a", 10, 1),
                CodeInsert::opener(0, "{b", 4, 2),
            ];
            assert_eq!(apply_inserts("xxxx", &inserts), "{a{bxxxx}b}a");
        }

        #[test]
        fn test_equal_spans_ordered_by_depth() {
            let inserts = vec![
                CodeInsert::closer(1, "}outer", 5, 1),
                CodeInsert::closer(1, "}inner", 5, 2),
                CodeInsert::opener(0, "{outer", 5, 1),
                CodeInsert::opener(0, "{inner", 5, 2),
            ];
            assert_eq!(apply_inserts("x", &inserts), "{outer{innerx}inner}outer");
        }

        #[test]
        fn test_ties_keep_input_order() {
            let inserts = vec![
                CodeInsert::opener(0, "1", 3, 0),
                CodeInsert::opener(0, "2", 3, 0),
            ];
            assert_eq!(apply_inserts("x", &inserts), "12x");
        }
    }

    mod rewrite_tests {
        use super::*;

        #[test]
        fn test_method_counter_is_first_statement() {
            let out = rewrite("class A { void f() { go(); } }");
            assert_eq!(out, "class A { void f() {auxiliary.__Counter.inc(0); go(); } }");
        }

        #[test]
        fn test_braceless_if_gets_braces_and_synthetic_else() {
            let out = compact(&rewrite("class A { void f(int x) { if (x > 0) x--; } }"));
            assert_eq!(
                out,
                "class A { void f(int x) {inc(0); if (x > 0) {inc(1);x--;} else {inc(2);} } }"
            );
        }

        #[test]
        fn test_nested_braceless_ifs() {
            let out = compact(&rewrite("class A { void f() { if (a) if (b) x(); } }"));
            assert_eq!(
                out,
                "class A { void f() {inc(0); if (a) {inc(1);if (b) {inc(2);x();} else {inc(3);}} else {inc(4);} } }"
            );
        }

        #[test]
        fn test_else_if_chain() {
            let out = compact(&rewrite(
                "class A { void f() { if (a) x(); else if (b) y(); else z(); } }",
            ));
            assert_eq!(
                out,
                "class A { void f() {inc(0); if (a) {inc(1);x();} else {inc(2);if (b) {inc(3);y();} else {inc(4);z();}} } }"
            );
        }

        #[test]
        fn test_constructor_counter_after_super() {
            let out = compact(&rewrite("class A extends B { A() { super(); go(); } }"));
            assert_eq!(out, "class A extends B { A() { super();inc(0); go(); } }");
        }

        #[test]
        fn test_lambda_expression_bodies() {
            let out = compact(&rewrite(
                "class A { void f() { xs.map(x -> x + 1).forEach(x -> print(x)); } }",
            ));
            assert!(out.contains("x -> {inc(1);return x + 1;}"));
            assert!(out.contains("x -> {inc(2);print(x);}"));
        }

        #[test]
        fn test_executor_submit_lambda_returns_call() {
            let out = compact(&rewrite(
                "class A { void f() { ex.submit(() -> compute()); ex.execute(() -> run()); } }",
            ));
            assert!(out.contains("() -> {inc(1);return compute();}"));
            assert!(out.contains("() -> {inc(2);run();}"));
        }

        #[test]
        fn test_loop_condition_wrapped_once() {
            let out = compact(&rewrite("class A { void f() { while (more()) { step(); } } }"));
            assert_eq!(
                out,
                "class A { void f() {inc(0); while (branch(more(), 1, 2)) {inc(3); step(); } } }"
            );
        }

        #[test]
        fn test_switch_expression_arrow_cases() {
            let out = compact(&rewrite(
                "class A { int f(int k) { return switch (k) { case 1 -> 10; default -> throw new E(); }; } }",
            ));
            assert!(out.contains("case 1 -> {inc(1);yield 10;}"));
            assert!(out.contains("default -> {inc(2);throw new E();}"));
        }

        #[test]
        fn test_switch_statement_colon_cases() {
            let out = compact(&rewrite(
                "class A { void f(int k) { switch (k) { case 1: a(); break; default: b(); } } }",
            ));
            assert!(out.contains("case 1:inc(1); a(); break;"));
            assert!(out.contains("default:inc(2); b();"));
        }

        #[test]
        fn test_ternary_wraps_condition_once() {
            let out = compact(&rewrite("class A { int f(int x) { return x > 0 ? x : -x; } }"));
            assert_eq!(
                out,
                "class A { int f(int x) {inc(0); return branch(x > 0, 1, 2) ? x : -x; } }"
            );
        }

        #[test]
        fn test_lambda_with_ternary_body() {
            let out = compact(&rewrite("class A { void f() { g(x -> c ? 1 : 2); } }"));
            assert!(out.contains("x -> {inc(1);return branch(c, 2, 3) ? 1 : 2;}"));
        }

        #[test]
        fn test_rewritten_output_reparses() {
            let src = "class A {\n\
                         int f(int k, java.util.List<String> xs) {\n\
                           for (String s : xs) if (s.isEmpty()) continue; else k++;\n\
                           do k--; while (k > 10);\n\
                           xs.forEach(s -> System.out.println(s));\n\
                           Runnable r = () -> k2++;\n\
                           try { k = 1; } catch (Exception e) { } finally { }\n\
                           return switch (k) { case 1 -> k > 0 ? 1 : 0; default -> { yield 2; } };\n\
                         }\n\
                       }";
            let config = InstrumentConfig::default();
            let first = instrument_source(Path::new("A.java"), src, &config).unwrap();
            // rewritten text must still be well-formed
            let again = instrument_source(Path::new("A.java"), &first.rewritten, &config);
            assert!(again.is_ok(), "{}", first.rewritten);
        }

        #[test]
        fn test_custom_counter_class() {
            let config = InstrumentConfig::builder().counter_class("p.Hits").build();
            let unit =
                instrument_source(Path::new("T.java"), "class A { void f() { } }", &config).unwrap();
            assert!(unit.rewritten.contains("p.Hits.inc(0);"));
        }
    }
}
