//! Block Extractor
//!
//! Walks a [`CompilationUnit`] once, in document order, and enumerates every
//! instrumentable region as a [`Block`]. Ids are assigned in pre-order, so a
//! parent always precedes its children and re-extracting unchanged source
//! reproduces identical ids and ranges.

use super::block::{
    Block, BlockId, BlockKind, BodyShape, CodeRegion, DecisionId, DecisionKind, DecisionPoint,
    DecisionRef, Side,
};
use crate::config::LambdaOverrides;
use crate::result::{ProfError, ProfResult};
use crate::syntax::{
    tokenize, Body, CaseBody, CompilationUnit, Expr, Jump, Lambda, LambdaBody, LambdaContext,
    LineIndex, Member, MethodDecl, Span, Stmt, Switch, SyntaxError, Ternary, TypeDecl, TypeKind,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Calls whose functional argument produces a value
const VALUE_CALLS: &[&str] = &[
    "submit",
    "invokeAll",
    "invokeAny",
    "schedule",
    "map",
    "flatMap",
    "mapToInt",
    "mapToLong",
    "mapToDouble",
    "mapToObj",
    "filter",
    "anyMatch",
    "allMatch",
    "noneMatch",
    "takeWhile",
    "dropWhile",
    "reduce",
    "sorted",
    "sort",
    "max",
    "min",
    "comparing",
    "thenComparing",
    "iterate",
    "generate",
    "supplyAsync",
    "thenApply",
    "thenCompose",
    "thenCombine",
    "handle",
    "exceptionally",
    "orElseGet",
    "orElseThrow",
    "computeIfAbsent",
    "computeIfPresent",
    "compute",
    "merge",
    "replaceAll",
    "removeIf",
    "toMap",
    "groupingBy",
    "partitioningBy",
    "mapping",
    "setAll",
    "withInitial",
    "call",
];

/// Calls whose functional argument is run for its effect
const VOID_CALLS: &[&str] = &[
    "forEach",
    "forEachOrdered",
    "forEachRemaining",
    "ifPresent",
    "ifPresentOrElse",
    "peek",
    "execute",
    "run",
    "runAsync",
    "accept",
    "thenAccept",
    "thenRun",
    "whenComplete",
    "invokeLater",
    "scheduleAtFixedRate",
    "scheduleWithFixedDelay",
    "addListener",
    "addActionListener",
    "removeListener",
];

/// Blocks and decisions of one compilation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    /// Source file
    pub path: PathBuf,
    /// Declared package
    pub package: Option<String>,
    /// Blocks in pre-order
    pub blocks: Vec<Block>,
    /// Decisions in pre-order
    pub decisions: Vec<DecisionPoint>,
}

impl ExtractionOutcome {
    /// Number of counters this unit needs
    #[must_use]
    pub fn counter_count(&self) -> usize {
        self.blocks.len()
    }

    /// Block by id
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        let first = self.blocks.first()?.id.as_u32();
        self.blocks.get(id.as_u32().checked_sub(first)? as usize)
    }

    /// Decision a block belongs to
    #[must_use]
    pub fn decision_of(&self, block: &Block) -> Option<&DecisionPoint> {
        let decision = block.decision?;
        self.decisions.iter().find(|d| d.id == decision.id)
    }

    /// Shift all ids by the given bases
    #[must_use]
    pub fn rebased(self, block_base: u32, decision_base: u32) -> Self {
        Self {
            path: self.path,
            package: self.package,
            blocks: self
                .blocks
                .into_iter()
                .map(|b| b.rebased(block_base, decision_base))
                .collect(),
            decisions: self
                .decisions
                .into_iter()
                .map(|d| d.rebased(block_base, decision_base))
                .collect(),
        }
    }

    /// Check ordering, range and containment invariants.
    ///
    /// Ids must be consecutive, every region must lie within the source and
    /// within its parent's region, and decisions must reference two blocks
    /// that point back at them.
    pub fn validate(&self, source_len: usize) -> ProfResult<()> {
        let fail = |message: String| Err(ProfError::extraction(&self.path, message));
        let base = self.blocks.first().map_or(0, |b| b.id.as_u32());
        for (i, block) in self.blocks.iter().enumerate() {
            if block.id.as_u32() != base + i as u32 {
                return fail(format!("block {} out of order at position {i}", block.id));
            }
            if block.start > block.end || block.end > source_len {
                return fail(format!(
                    "block {} has invalid range {}..{}",
                    block.id, block.start, block.end
                ));
            }
            if block.insert_at < block.start || block.insert_at > block.end {
                return fail(format!("block {} inserts outside its range", block.id));
            }
            if let Some(parent_id) = block.parent {
                let Some(parent) = self.block(parent_id).filter(|p| p.id < block.id) else {
                    return fail(format!("block {} has invalid parent {parent_id}", block.id));
                };
                if !parent.span().contains(&block.span()) {
                    return fail(format!(
                        "block {} ({}..{}) escapes parent {} ({}..{})",
                        block.id, block.start, block.end, parent.id, parent.start, parent.end
                    ));
                }
            }
            if let Some(decision) = block.decision {
                let points_back = self
                    .decision_of(block)
                    .is_some_and(|d| d.side(decision.side) == block.id);
                if !points_back {
                    return fail(format!("block {} has dangling decision", block.id));
                }
            }
        }
        for decision in &self.decisions {
            for side in [Side::True, Side::False] {
                let id = decision.side(side);
                let linked = self
                    .block(id)
                    .and_then(|b| b.decision)
                    .is_some_and(|d| d.id == decision.id && d.side == side);
                if !linked {
                    return fail(format!(
                        "decision {} is missing its {side:?} side",
                        decision.id.as_u32()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Extract and validate the block inventory of a parsed unit
pub fn extract_blocks(
    unit: &CompilationUnit,
    source: &str,
    overrides: &LambdaOverrides,
) -> ProfResult<ExtractionOutcome> {
    let mut outcome = BlockExtractor::new(&unit.path, source, overrides).extract(unit);
    outcome.validate(source.len())?;
    assign_lines(&mut outcome.blocks, source).map_err(|e| e.with_path(&unit.path))?;
    Ok(outcome)
}

/// Attribute each code line to the innermost blocks holding its tokens.
///
/// A block without tokens of its own keeps its first line; synthetic blocks
/// own nothing.
fn assign_lines(blocks: &mut [Block], source: &str) -> Result<(), SyntaxError> {
    let mut owner: Vec<Option<u32>> = vec![None; source.len()];
    for (index, block) in blocks.iter().enumerate() {
        if let Some(slots) = owner.get_mut(block.start..block.end) {
            slots.fill(Some(index as u32));
        }
    }
    for token in tokenize(source)? {
        let Some(&Some(index)) = owner.get(token.start) else {
            continue;
        };
        if let Some(block) = blocks.get_mut(index as usize) {
            if block.lines.last() != Some(&token.line) {
                block.lines.push(token.line);
                let region = block.regions.iter_mut().rev().find(|r| r.start <= token.start);
                if let Some(region) = region {
                    region.lines.push(token.line);
                }
            }
        }
    }
    for block in blocks.iter_mut() {
        if block.lines.is_empty() && !block.is_synthetic() {
            block.lines.push(block.start_line);
        }
        block.regions.retain(|r| !r.lines.is_empty());
    }
    Ok(())
}

#[derive(Debug)]
struct ClassFrame {
    name: String,
    anonymous: u32,
    local: u32,
}

/// Statement a jump can leave through
#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetKind {
    /// Method, initializer or lambda body
    Body,
    /// `try` body, which may catch a `throw`
    Try,
    Loop,
    Switch { expression: bool },
    Label(String),
}

#[derive(Debug, Clone)]
struct JumpTarget {
    kind: TargetKind,
    span: Span,
}

/// Single-pass tree walker assigning pre-order ids
#[derive(Debug)]
pub struct BlockExtractor<'a> {
    path: &'a Path,
    source: &'a str,
    lines: LineIndex,
    overrides: &'a LambdaOverrides,
    blocks: Vec<Block>,
    decisions: Vec<DecisionPoint>,
    classes: Vec<ClassFrame>,
    method: Option<String>,
    parents: Vec<BlockId>,
    methods: HashMap<&'a str, Vec<&'a MethodDecl>>,
    interfaces: HashMap<&'a str, &'a str>,
    targets: Vec<JumpTarget>,
    jumped: Vec<Vec<BlockId>>,
}

impl<'a> BlockExtractor<'a> {
    /// Create an extractor for one source text
    #[must_use]
    pub fn new(path: &'a Path, source: &'a str, overrides: &'a LambdaOverrides) -> Self {
        Self {
            path,
            source,
            lines: LineIndex::new(source),
            overrides,
            blocks: Vec::new(),
            decisions: Vec::new(),
            classes: Vec::new(),
            method: None,
            parents: Vec::new(),
            methods: HashMap::new(),
            interfaces: HashMap::new(),
            targets: Vec::new(),
            jumped: Vec::new(),
        }
    }

    /// Walk the unit and return its blocks; ids start at zero
    #[must_use]
    pub fn extract(mut self, unit: &'a CompilationUnit) -> ExtractionOutcome {
        for decl in &unit.types {
            self.collect_signatures(decl);
        }
        for decl in &unit.types {
            self.type_decl(decl, decl.name.clone());
        }
        ExtractionOutcome {
            path: self.path.to_path_buf(),
            package: unit.package.clone(),
            blocks: self.blocks,
            decisions: self.decisions,
        }
    }

    // =========================================================================
    // Bookkeeping
    // =========================================================================

    fn push_block(
        &mut self,
        kind: BlockKind,
        span: Span,
        insert_at: usize,
        shape: BodyShape,
        decision: Option<DecisionRef>,
    ) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        let start_line = self.lines.line_of(span.start);
        let trimmed = self
            .source
            .get(span.start..span.end)
            .map_or(0, |text| text.trim_end().len());
        let end_line = if trimmed > 0 {
            self.lines.line_of(span.start + trimmed - 1)
        } else {
            start_line
        };
        self.blocks.push(Block {
            id,
            kind,
            file: self.path.to_path_buf(),
            start: span.start,
            end: span.end,
            insert_at,
            parent: self.parents.last().copied(),
            decision,
            class_name: self
                .classes
                .last()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            method_name: self.method.clone(),
            start_line,
            end_line,
            lines: Vec::new(),
            shape,
            regions: Vec::new(),
        });
        self.jumped.push(Vec::new());
        id
    }

    fn with_parent(&mut self, id: BlockId, walk: impl FnOnce(&mut Self)) {
        self.parents.push(id);
        walk(self);
        self.parents.pop();
    }

    fn with_target(&mut self, kind: TargetKind, span: Span, walk: impl FnOnce(&mut Self)) {
        self.targets.push(JumpTarget { kind, span });
        walk(self);
        self.targets.pop();
    }

    /// Index methods and single-method interfaces of named member types
    fn collect_signatures(&mut self, decl: &'a TypeDecl) {
        for member in &decl.members {
            match member {
                Member::Method(method) => {
                    self.methods.entry(method.name.as_str()).or_default().push(method);
                }
                Member::Type(nested) => self.collect_signatures(nested),
                Member::EnumConstant {
                    body: Some(body), ..
                } => self.collect_signatures(body),
                _ => {}
            }
        }
        if decl.kind == TypeKind::Interface {
            let mut abstract_methods = decl.members.iter().filter_map(|m| match m {
                Member::Method(method) if method.body.is_none() => Some(method),
                _ => None,
            });
            if let (Some(single), None) = (abstract_methods.next(), abstract_methods.next()) {
                if let Some(returns) = single.return_type.as_deref() {
                    self.interfaces.insert(decl.name.as_str(), returns);
                }
            }
        }
    }

    /// Span a jump leaves, or `None` when it stays inside the current body
    fn jump_target(&self, jump: &Jump) -> Option<Span> {
        for target in self.targets.iter().rev() {
            let found = match (&target.kind, jump) {
                (TargetKind::Body, Jump::Return | Jump::Throw) | (TargetKind::Try, Jump::Throw) => {
                    true
                }
                (TargetKind::Body, _) => return None,
                (TargetKind::Loop, Jump::Break(None) | Jump::Continue(None)) => true,
                (TargetKind::Switch { expression: false }, Jump::Break(None)) => true,
                (TargetKind::Switch { expression: true }, Jump::Yield) => true,
                (TargetKind::Label(name), Jump::Break(Some(label)) | Jump::Continue(Some(label))) => {
                    name == label
                }
                _ => false,
            };
            if found {
                return Some(target.span);
            }
        }
        None
    }

    /// Record that the innermost block jumps out of every enclosing block
    /// it leaves on the way to the jump target
    fn jump(&mut self, jump: &Jump) {
        let Some(target) = self.jump_target(jump) else {
            return;
        };
        let Some(&innermost) = self.parents.last() else {
            return;
        };
        if !target.contains(&self.blocks[innermost.index()].span()) {
            return;
        }
        let mut current = self.blocks[innermost.index()].parent;
        while let Some(ancestor) = current {
            let block = &self.blocks[ancestor.index()];
            if !target.contains(&block.span()) {
                break;
            }
            current = block.parent;
            self.jumped[ancestor.index()].push(innermost);
        }
    }

    /// Start a code region at `at` if a nested block jumped since the last one
    fn open_region(&mut self, at: usize) {
        let Some(&current) = self.parents.last() else {
            return;
        };
        let jumped = &self.jumped[current.index()];
        let block = &mut self.blocks[current.index()];
        let covered = block.regions.last().map_or(0, |r| r.minus.len());
        if jumped.len() > covered {
            block.regions.push(CodeRegion {
                start: at,
                start_line: self.lines.line_of(at),
                minus: jumped.clone(),
                lines: Vec::new(),
            });
        }
    }

    /// Reserve a decision id; sides are filled in once both blocks exist
    fn open_decision(&mut self, kind: DecisionKind, at: usize) -> usize {
        let index = self.decisions.len();
        self.decisions.push(DecisionPoint {
            id: DecisionId::new(index as u32),
            kind,
            true_side: BlockId::new(0),
            false_side: BlockId::new(0),
            line: self.lines.line_of(at),
        });
        index
    }

    fn side(&self, index: usize, side: Side) -> Option<DecisionRef> {
        Some(DecisionRef {
            id: DecisionId::new(index as u32),
            side,
        })
    }

    fn anonymous_name(&mut self) -> String {
        match self.classes.last_mut() {
            Some(frame) => {
                frame.anonymous += 1;
                format!("{}${}", frame.name, frame.anonymous)
            }
            None => "$1".to_string(),
        }
    }

    fn local_name(&mut self, name: &str) -> String {
        match self.classes.last_mut() {
            Some(frame) => {
                frame.local += 1;
                format!("{}${}{name}", frame.name, frame.local)
            }
            None => name.to_string(),
        }
    }

    fn nested_name(&self, name: &str) -> String {
        match self.classes.last() {
            Some(frame) => format!("{}.{name}", frame.name),
            None => name.to_string(),
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn type_decl(&mut self, decl: &TypeDecl, name: String) {
        self.classes.push(ClassFrame {
            name,
            anonymous: 0,
            local: 0,
        });
        let saved = self.method.take();
        let targets = std::mem::take(&mut self.targets);
        for member in &decl.members {
            self.member(member);
        }
        self.targets = targets;
        self.method = saved;
        self.classes.pop();
    }

    fn member(&mut self, member: &Member) {
        match member {
            Member::Method(method) => {
                let Some(body) = &method.body else {
                    return;
                };
                let kind = if method.is_constructor {
                    BlockKind::Constructor
                } else {
                    BlockKind::Method
                };
                let saved = self.method.replace(method.name.clone());
                let inner = body.braces.inner();
                let insert_at = method.explicit_call_end.unwrap_or(inner.start);
                let id = self.push_block(kind, inner, insert_at, BodyShape::Braced, None);
                self.with_target(TargetKind::Body, inner, |this| {
                    this.with_parent(id, |this| this.stmts(&body.stmts));
                });
                self.method = saved;
            }
            Member::Initializer { is_static, body } => {
                let (kind, name) = if *is_static {
                    (BlockKind::StaticInitializer, "<clinit>")
                } else {
                    (BlockKind::InstanceInitializer, "<init>")
                };
                let saved = self.method.replace(name.to_string());
                self.with_target(TargetKind::Body, body.braces.inner(), |this| {
                    this.braced(body, kind, None);
                });
                self.method = saved;
            }
            Member::Field { exprs, .. } => self.exprs(exprs),
            Member::Type(decl) => {
                let name = self.nested_name(&decl.name);
                self.type_decl(decl, name);
            }
            Member::EnumConstant { args, body, .. } => {
                self.exprs(args);
                if let Some(decl) = body {
                    let name = self.anonymous_name();
                    self.type_decl(decl, name);
                }
            }
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.open_region(stmt.span().start);
            self.stmt(stmt);
        }
    }

    fn braced(&mut self, body: &Body, kind: BlockKind, decision: Option<DecisionRef>) -> BlockId {
        let inner = body.braces.inner();
        let id = self.push_block(kind, inner, inner.start, BodyShape::Braced, decision);
        self.with_parent(id, |this| this.stmts(&body.stmts));
        id
    }

    /// Counted statement body, braced or not
    fn body_of(&mut self, stmt: &Stmt, kind: BlockKind, decision: Option<DecisionRef>) -> BlockId {
        match stmt {
            Stmt::Block(body) => self.braced(body, kind, decision),
            other => {
                let span = other.span();
                let id = self.push_block(kind, span, span.start, BodyShape::Braceless, decision);
                self.with_parent(id, |this| this.stmt(other));
                id
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(body) => self.stmts(&body.stmts),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                span,
            } => {
                self.exprs(&cond.exprs);
                let index = self.open_decision(DecisionKind::If, cond.span.start);
                let then_id =
                    self.body_of(then_branch, BlockKind::IfBranch, self.side(index, Side::True));
                let else_id = match else_branch {
                    Some(other) => {
                        self.body_of(other, BlockKind::ElseBranch, self.side(index, Side::False))
                    }
                    None => {
                        let at = then_branch.span().end;
                        self.push_block(
                            BlockKind::ElseBranch,
                            Span::new(at, at),
                            at,
                            BodyShape::SyntheticElse {
                                statement_start: span.start,
                            },
                            self.side(index, Side::False),
                        )
                    }
                };
                self.decisions[index].true_side = then_id;
                self.decisions[index].false_side = else_id;
            }
            Stmt::Loop {
                cond,
                header,
                body,
                span,
            } => {
                if let Some(cond) = cond {
                    self.loop_condition(*cond);
                }
                self.exprs(header);
                self.with_target(TargetKind::Loop, *span, |this| {
                    this.body_of(body, BlockKind::LoopBody, None);
                });
            }
            Stmt::DoWhile { body, cond, span } => {
                self.with_target(TargetKind::Loop, *span, |this| {
                    this.body_of(body, BlockKind::LoopBody, None);
                });
                self.loop_condition(cond.span);
                self.exprs(&cond.exprs);
            }
            Stmt::Switch(switch) => self.switch(switch),
            Stmt::Try {
                resources,
                body,
                catches,
                finally,
                ..
            } => {
                let kind = match resources {
                    Some(exprs) => {
                        self.exprs(exprs);
                        BlockKind::TryWithResources
                    }
                    None => BlockKind::Try,
                };
                self.with_target(TargetKind::Try, body.braces.inner(), |this| {
                    this.braced(body, kind, None);
                });
                for catch in catches {
                    self.braced(catch, BlockKind::Catch, None);
                }
                if let Some(finally) = finally {
                    self.braced(finally, BlockKind::Finally, None);
                }
            }
            Stmt::Synchronized { lock, body, .. } => {
                self.exprs(&lock.exprs);
                self.braced(body, BlockKind::Synchronized, None);
            }
            Stmt::Labeled { label, body, span } => {
                self.with_target(TargetKind::Label(label.clone()), *span, |this| this.stmt(body));
            }
            Stmt::LocalType(decl) => {
                let name = self.local_name(&decl.name);
                self.type_decl(decl, name);
            }
            Stmt::Simple { exprs, jump, .. } => {
                self.exprs(exprs);
                if let Some(jump) = jump {
                    self.jump(jump);
                }
            }
        }
    }

    /// Two synthetic sides counting how a loop condition evaluated.
    ///
    /// A literal `true` condition never evaluates false and is left alone.
    fn loop_condition(&mut self, cond: Span) {
        let text = self.source.get(cond.start..cond.end).unwrap_or_default().trim();
        if text.is_empty() || text == "true" {
            return;
        }
        let index = self.open_decision(DecisionKind::Loop, cond.start);
        let shape = BodyShape::LoopCondition { condition: cond };
        let at = Span::new(cond.start, cond.start);
        let true_id = self.push_block(
            BlockKind::LoopCondition,
            at,
            cond.start,
            shape,
            self.side(index, Side::True),
        );
        let false_id = self.push_block(
            BlockKind::LoopCondition,
            at,
            cond.start,
            shape,
            self.side(index, Side::False),
        );
        self.decisions[index].true_side = true_id;
        self.decisions[index].false_side = false_id;
    }

    fn switch(&mut self, switch: &Switch) {
        self.exprs(&switch.selector.exprs);
        let kind = TargetKind::Switch {
            expression: switch.is_expression,
        };
        self.with_target(kind, switch.span, |this| this.cases(switch));
    }

    fn cases(&mut self, switch: &Switch) {
        for case in &switch.cases {
            match &case.body {
                CaseBody::Colon { region, stmts } => {
                    let id = self.push_block(
                        BlockKind::SwitchCase,
                        *region,
                        region.start,
                        BodyShape::ColonCase,
                        None,
                    );
                    self.with_parent(id, |this| this.stmts(stmts));
                }
                CaseBody::Block(body) => {
                    self.braced(body, BlockKind::SwitchCase, None);
                }
                CaseBody::Expression {
                    span,
                    is_throw,
                    exprs,
                } => {
                    let shape = BodyShape::ArrowCase {
                        yields: switch.is_expression && !is_throw,
                    };
                    let id = self.push_block(BlockKind::SwitchCase, *span, span.start, shape, None);
                    self.with_parent(id, |this| {
                        this.exprs(exprs);
                        if *is_throw {
                            this.jump(&Jump::Throw);
                        }
                    });
                }
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn exprs(&mut self, exprs: &[Expr]) {
        for expr in exprs {
            match expr {
                Expr::Lambda(lambda) => self.lambda(lambda),
                Expr::Ternary(ternary) => self.ternary(ternary),
                Expr::AnonymousClass(decl) => {
                    let name = self.anonymous_name();
                    self.type_decl(decl, name);
                }
                Expr::Switch(switch) => self.switch(switch),
            }
        }
    }

    fn lambda(&mut self, lambda: &Lambda) {
        match &lambda.body {
            LambdaBody::Block(body) => {
                self.with_target(TargetKind::Body, body.braces.inner(), |this| {
                    this.braced(body, BlockKind::Lambda, None);
                });
            }
            LambdaBody::Expression {
                span,
                statement_like,
                callee,
                exprs,
            } => {
                let returns =
                    self.lambda_returns(*statement_like, callee.as_deref(), &lambda.context, *span);
                let shape = BodyShape::LambdaExpression { returns };
                let id = self.push_block(BlockKind::Lambda, *span, span.start, shape, None);
                self.with_target(TargetKind::Body, *span, |this| {
                    this.with_parent(id, |this| this.exprs(exprs));
                });
            }
        }
    }

    /// Whether an expression body must be rewritten with `return`.
    ///
    /// Non-statement bodies always produce a value. Statement-like bodies
    /// (calls, assignments, increments, instance creation) are resolved in
    /// order by the configured overrides, a void method of this unit being
    /// called, the declared target type, the parameter type of an invoked
    /// method of this unit, and the built-in call lists. A body that is
    /// still unresolved is logged and returns only when it calls a
    /// value-returning method of this unit.
    fn lambda_returns(
        &self,
        statement_like: bool,
        callee: Option<&str>,
        context: &LambdaContext,
        body: Span,
    ) -> bool {
        if !statement_like {
            return true;
        }
        let invoked = context.invoked.as_deref();
        if let Some(invoked) = invoked {
            if self.overrides.void_calls.iter().any(|c| c == invoked) {
                return false;
            }
            if self.overrides.value_calls.iter().any(|c| c == invoked) {
                return true;
            }
        }
        let callee_is_void = callee.and_then(|name| self.returns_void(name));
        if callee_is_void == Some(true) {
            return false;
        }
        let declared = context
            .target_type
            .as_deref()
            .and_then(|target| self.functional_returns(target));
        if let Some(returns) = declared.or_else(|| self.parameter_returns(context)) {
            return returns;
        }
        if let Some(invoked) = invoked {
            if VOID_CALLS.contains(&invoked) {
                return false;
            }
            if VALUE_CALLS.contains(&invoked) {
                return true;
            }
        }
        let returns = callee_is_void == Some(false);
        warn!(
            file = %self.path.display(),
            line = self.lines.line_of(body.start),
            invoked = ?invoked,
            "Unresolved lambda target type, treating body as {}",
            if returns { "value" } else { "void" }
        );
        returns
    }

    /// Whether every method of this unit with the given name returns `void`
    fn returns_void(&self, name: &str) -> Option<bool> {
        let mut verdicts = self
            .methods
            .get(name)?
            .iter()
            .filter(|m| !m.is_constructor)
            .map(|m| m.return_type.as_deref() == Some("void"));
        let first = verdicts.next()?;
        verdicts.all(|v| v == first).then_some(first)
    }

    /// Whether a lambda converted to the named functional interface returns
    fn functional_returns(&self, type_name: &str) -> Option<bool> {
        if let Some(returns) = self.interfaces.get(type_name) {
            return Some(*returns != "void");
        }
        if type_name == "Runnable" || type_name.ends_with("Consumer") {
            return Some(false);
        }
        let value = type_name == "Callable"
            || ["Function", "Supplier", "Predicate", "Operator", "Comparator"]
                .iter()
                .any(|suffix| type_name.ends_with(suffix));
        value.then_some(true)
    }

    /// Resolve through the parameter type of an invoked method of this unit;
    /// all overloads taking that argument must agree
    fn parameter_returns(&self, context: &LambdaContext) -> Option<bool> {
        let overloads = self.methods.get(context.invoked.as_deref()?)?;
        let argument = context.argument?;
        let mut verdicts = overloads
            .iter()
            .filter_map(|m| m.param_for_argument(argument))
            .map(|param| self.functional_returns(param));
        let first = verdicts.next()??;
        verdicts.all(|v| v == Some(first)).then_some(first)
    }

    fn ternary(&mut self, ternary: &Ternary) {
        self.exprs(&ternary.cond_exprs);
        let index = self.open_decision(DecisionKind::Ternary, ternary.cond.start);
        let shape = BodyShape::TernaryOperand {
            condition: ternary.cond,
        };

        let then_span = ternary.then_branch;
        let then_id = self.push_block(
            BlockKind::TernaryBranch,
            then_span,
            then_span.start,
            shape,
            self.side(index, Side::True),
        );
        self.with_parent(then_id, |this| this.exprs(&ternary.then_exprs));

        let else_span = ternary.else_branch;
        let else_id = self.push_block(
            BlockKind::TernaryBranch,
            else_span,
            else_span.start,
            shape,
            self.side(index, Side::False),
        );
        self.with_parent(else_id, |this| this.exprs(&ternary.else_exprs));

        self.decisions[index].true_side = then_id;
        self.decisions[index].false_side = else_id;
    }
}
