//! Block Inventory Types
//!
//! Typed identifiers and records describing every instrumentable region of a
//! compilation unit. Block ids double as counter slots, so [`BlockId`] and
//! [`DecisionId`] are intentionally not interchangeable.

use crate::syntax::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Type-safe block identifier
///
/// Identifies one counted region; its value is the counter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new block ID
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner value
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Counter slot index
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Shift by a counter base
    #[inline]
    #[must_use]
    pub const fn offset(self, base: u32) -> Self {
        Self(self.0 + base)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type-safe decision identifier
///
/// Identifies one boolean branch site. Cannot be confused with BlockId.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(u32);

impl DecisionId {
    /// Create a new decision ID
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner value
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Shift by a decision base
    #[inline]
    #[must_use]
    pub const fn offset(self, base: u32) -> Self {
        Self(self.0 + base)
    }
}

/// Kind of counted region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Method body
    Method,
    /// Constructor body
    Constructor,
    /// `static { }`
    StaticInitializer,
    /// Instance initializer `{ }`
    InstanceInitializer,
    /// Body of `while`, `do`, `for` or enhanced `for`
    LoopBody,
    /// Then branch of an `if`
    IfBranch,
    /// Else branch of an `if`, possibly synthetic
    ElseBranch,
    /// `case` or `default` body
    SwitchCase,
    /// `try` body
    Try,
    /// `try` body with resources
    TryWithResources,
    /// `catch` body
    Catch,
    /// `finally` body
    Finally,
    /// Lambda body
    Lambda,
    /// `synchronized` body
    Synchronized,
    /// One operand of a conditional expression
    TernaryBranch,
    /// One outcome of a loop condition
    LoopCondition,
    /// Plain nested `{ }`; part of the vocabulary but never counted
    Block,
}

impl BlockKind {
    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::StaticInitializer => "static initializer",
            Self::InstanceInitializer => "instance initializer",
            Self::LoopBody => "loop body",
            Self::IfBranch => "if branch",
            Self::ElseBranch => "else branch",
            Self::SwitchCase => "switch case",
            Self::Try => "try",
            Self::TryWithResources => "try-with-resources",
            Self::Catch => "catch",
            Self::Finally => "finally",
            Self::Lambda => "lambda",
            Self::Synchronized => "synchronized",
            Self::TernaryBranch => "ternary branch",
            Self::LoopCondition => "loop condition",
            Self::Block => "block",
        }
    }

    /// Whether this kind opens a method-level scope
    #[must_use]
    pub const fn is_member_body(self) -> bool {
        matches!(
            self,
            Self::Method | Self::Constructor | Self::StaticInitializer | Self::InstanceInitializer
        )
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome side of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Condition held
    True,
    /// Condition did not hold
    False,
}

/// Kind of branch site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// `if` statement
    If,
    /// Conditional expression
    Ternary,
    /// `while`, `do` or basic `for` condition
    Loop,
}

/// Membership of a block in a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRef {
    /// Decision
    pub id: DecisionId,
    /// Which outcome the block counts
    pub side: Side,
}

/// How the counter statement is placed into a region's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum BodyShape {
    /// `{ ... }` body; the counter goes at `insert_at`
    Braced,
    /// Single statement without braces; wrapped in a new block
    Braceless,
    /// Expression-bodied lambda; rewritten to a block body
    LambdaExpression {
        /// Whether the rewritten body returns the expression
        returns: bool,
    },
    /// Arrow case with an expression or throw body
    ArrowCase {
        /// Whether the rewritten body yields the expression
        yields: bool,
    },
    /// `case X:` statement group; no braces are added
    ColonCase,
    /// Missing `else`, materialised at the end of the `if`
    SyntheticElse {
        /// Start of the `if` statement
        statement_start: usize,
    },
    /// Ternary operand; counted by wrapping the condition
    TernaryOperand {
        /// Condition operand text
        condition: Span,
    },
    /// Loop condition outcome; counted by wrapping the condition
    LoopCondition {
        /// Condition text
        condition: Span,
    },
}

/// Stretch of a block's code that follows a nested jump.
///
/// Code after a `return`, `break`, `continue`, `throw` or `yield` inside a
/// nested block only runs when that jump was not taken, so its hits are the
/// block's hits minus the hits of the blocks in `minus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRegion {
    /// First byte of the region
    pub start: usize,
    /// 1-based line of `start`
    pub start_line: u32,
    /// Nested blocks that jump past the region
    pub minus: Vec<BlockId>,
    /// Lines of the block that fall in this region
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<u32>,
}

impl CodeRegion {
    /// Execution count of the region given per-block hits
    #[must_use]
    pub fn hits(&self, block_hits: u64, hits_of: impl Fn(BlockId) -> u64) -> u64 {
        let skipped: u64 = self.minus.iter().map(|&id| hits_of(id)).sum();
        block_hits.saturating_sub(skipped)
    }
}

/// One counted region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Counter slot
    pub id: BlockId,
    /// Region kind
    pub kind: BlockKind,
    /// Source file
    pub file: PathBuf,
    /// First byte of the region
    pub start: usize,
    /// End of the region (exclusive)
    pub end: usize,
    /// Where the counter statement is inserted
    pub insert_at: usize,
    /// Enclosing counted region
    pub parent: Option<BlockId>,
    /// Decision this block is a side of
    pub decision: Option<DecisionRef>,
    /// Owning class, nested names joined with `.`
    pub class_name: String,
    /// Owning method; `None` for class-level regions
    pub method_name: Option<String>,
    /// 1-based first line
    pub start_line: u32,
    /// 1-based last line
    pub end_line: u32,
    /// Lines holding code this block owns innermost
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<u32>,
    /// Text placement form
    pub shape: BodyShape,
    /// Code following nested jumps, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<CodeRegion>,
}

impl Block {
    /// Region as a span
    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    /// Whether the block has no source text of its own
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        matches!(
            self.shape,
            BodyShape::SyntheticElse { .. } | BodyShape::LoopCondition { .. }
        )
    }

    /// Whether the block's text is wrapped in new braces when instrumented
    #[must_use]
    pub const fn gets_braces(&self) -> bool {
        matches!(
            self.shape,
            BodyShape::Braceless | BodyShape::LambdaExpression { .. } | BodyShape::ArrowCase { .. }
        )
    }

    /// Whether a line falls inside this block's line range
    #[must_use]
    pub const fn covers_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Shift ids by unit bases
    #[must_use]
    pub fn rebased(mut self, block_base: u32, decision_base: u32) -> Self {
        self.id = self.id.offset(block_base);
        self.parent = self.parent.map(|p| p.offset(block_base));
        if let Some(decision) = self.decision.as_mut() {
            decision.id = decision.id.offset(decision_base);
        }
        for region in &mut self.regions {
            for id in &mut region.minus {
                *id = id.offset(block_base);
            }
        }
        self
    }

    /// Execution count of each owned line given per-block hits.
    ///
    /// Lines inside a [`CodeRegion`] count only the runs that reached it.
    pub fn line_hits<'b>(
        &'b self,
        block_hits: u64,
        hits_of: impl Fn(BlockId) -> u64 + 'b,
    ) -> impl Iterator<Item = (u32, u64)> + 'b {
        self.lines.iter().map(move |&line| {
            let hits = self
                .regions
                .iter()
                .find(|r| r.lines.contains(&line))
                .map_or(block_hits, |r| r.hits(block_hits, &hits_of));
            (line, hits)
        })
    }
}

/// Boolean branch site with two independently counted sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPoint {
    /// Decision id
    pub id: DecisionId,
    /// Branch site kind
    pub kind: DecisionKind,
    /// Block counting the true outcome
    pub true_side: BlockId,
    /// Block counting the false outcome
    pub false_side: BlockId,
    /// 1-based line of the condition
    pub line: u32,
}

impl DecisionPoint {
    /// Block for one side
    #[must_use]
    pub const fn side(&self, side: Side) -> BlockId {
        match side {
            Side::True => self.true_side,
            Side::False => self.false_side,
        }
    }

    /// Shift ids by unit bases
    #[must_use]
    pub const fn rebased(mut self, block_base: u32, decision_base: u32) -> Self {
        self.id = self.id.offset(decision_base);
        self.true_side = self.true_side.offset(block_base);
        self.false_side = self.false_side.offset(block_base);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            id: BlockId::new(2),
            kind: BlockKind::ElseBranch,
            file: PathBuf::from("A.java"),
            start: 40,
            end: 40,
            insert_at: 40,
            parent: Some(BlockId::new(0)),
            decision: Some(DecisionRef {
                id: DecisionId::new(0),
                side: Side::False,
            }),
            class_name: "A".into(),
            method_name: Some("f".into()),
            start_line: 3,
            end_line: 3,
            lines: Vec::new(),
            shape: BodyShape::SyntheticElse { statement_start: 20 },
            regions: Vec::new(),
        }
    }

    #[test]
    fn test_block_id_ordering_and_display() {
        let a = BlockId::new(1);
        let b = BlockId::new(7);
        assert!(a < b);
        assert_eq!(b.index(), 7);
        assert_eq!(a.offset(10), BlockId::new(11));
        assert_eq!(b.to_string(), "#7");
    }

    #[test]
    fn test_synthetic_and_braces() {
        let block = sample_block();
        assert!(block.is_synthetic());
        assert!(!block.gets_braces());
        assert!(block.span().is_empty());
    }

    #[test]
    fn test_rebased_shifts_all_ids() {
        let block = sample_block().rebased(100, 5);
        assert_eq!(block.id, BlockId::new(102));
        assert_eq!(block.parent, Some(BlockId::new(100)));
        assert_eq!(block.decision.unwrap().id, DecisionId::new(5));

        let decision = DecisionPoint {
            id: DecisionId::new(1),
            kind: DecisionKind::If,
            true_side: BlockId::new(1),
            false_side: BlockId::new(2),
            line: 3,
        }
        .rebased(100, 5);
        assert_eq!(decision.id, DecisionId::new(6));
        assert_eq!(decision.side(Side::True), BlockId::new(101));
        assert_eq!(decision.side(Side::False), BlockId::new(102));
    }

    #[test]
    fn test_line_hits_subtract_jumping_blocks() {
        let mut block = sample_block();
        block.lines = vec![3, 4, 5];
        block.regions = vec![CodeRegion {
            start: 50,
            start_line: 5,
            minus: vec![BlockId::new(3), BlockId::new(4)],
            lines: vec![5],
        }];
        let hits = |id: BlockId| u64::from(id.as_u32());
        let lines: Vec<_> = block.line_hits(10, hits).collect();
        assert_eq!(lines, vec![(3, 10), (4, 10), (5, 3)]);

        let rebased = block.rebased(100, 0);
        assert_eq!(rebased.regions[0].minus, vec![BlockId::new(103), BlockId::new(104)]);
        // more jumps than entries never underflows
        assert_eq!(rebased.regions[0].hits(5, |_| 9), 0);
    }

    #[test]
    fn test_loop_condition_is_synthetic() {
        let mut block = sample_block();
        block.kind = BlockKind::LoopCondition;
        block.shape = BodyShape::LoopCondition {
            condition: Span::new(10, 15),
        };
        assert!(block.is_synthetic());
        assert_eq!(block.kind.to_string(), "loop condition");
    }

    #[test]
    fn test_block_serde_shape_tag() {
        let json = serde_json::to_string(&sample_block()).unwrap();
        assert!(json.contains("\"form\":\"synthetic_else\""));
        assert!(json.contains("\"kind\":\"else_branch\""));
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_block());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(BlockKind::TryWithResources.to_string(), "try-with-resources");
        assert!(BlockKind::Constructor.is_member_body());
        assert!(!BlockKind::Lambda.is_member_body());
    }
}
