//! Syntax front-end for Java-like sources.
//!
//! The tree produced here is deliberately shallow: it keeps every construct
//! that opens or delimits an executable region (type bodies, members,
//! control-flow statements, switch cases, lambdas, ternaries, anonymous
//! classes) with exact byte offsets, and treats everything else as opaque
//! token runs. Offsets always refer to the unmodified source text.

mod lexer;
mod parser;

pub use lexer::{tokenize, LineIndex, Token, TokenKind};

use crate::result::{ProfError, ProfResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Half-open byte range `[start, end)` into a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// First byte
    pub start: usize,
    /// One past the last byte
    pub end: usize,
}

impl Span {
    /// Create a new span
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `other` lies entirely within this span
    #[inline]
    #[must_use]
    pub const fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Lexer or parser failure, located by line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-based line
    pub line: u32,
    /// Error message
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    /// Attach a file path, producing a [`ProfError::Parse`]
    #[must_use]
    pub fn with_path(self, path: &Path) -> ProfError {
        ProfError::parse(path, self.line, self.message)
    }
}

/// Parse a complete compilation unit.
///
/// # Errors
///
/// Returns [`ProfError::Parse`] naming `path` and the offending line when the
/// text is not well-formed.
pub fn parse(path: &Path, source: &str) -> ProfResult<CompilationUnit> {
    let tokens = tokenize(source).map_err(|e| e.with_path(path))?;
    let (package, types) = parser::Parser::new(tokens)
        .map_err(|e| e.with_path(path))?
        .compilation_unit()
        .map_err(|e| e.with_path(path))?;
    Ok(CompilationUnit {
        path: path.to_path_buf(),
        package,
        types,
    })
}

/// A parsed source file
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    /// Path the unit was read from
    pub path: PathBuf,
    /// Declared package, if any
    pub package: Option<String>,
    /// Top-level type declarations in document order
    pub types: Vec<TypeDecl>,
}

/// Kind of type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// `class`
    Class,
    /// `interface`
    Interface,
    /// `enum`
    Enum,
    /// `record`
    Record,
    /// `@interface`
    Annotation,
}

/// Offsets of a `{ ... }` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Braces {
    /// Offset of `{`
    pub open: usize,
    /// Offset of `}`
    pub close: usize,
}

impl Braces {
    /// Region strictly between the braces
    #[must_use]
    pub const fn inner(&self) -> Span {
        Span::new(self.open + 1, self.close)
    }

    /// Region including both braces
    #[must_use]
    pub const fn outer(&self) -> Span {
        Span::new(self.open, self.close + 1)
    }
}

/// Class, interface, enum, record or annotation declaration.
///
/// Anonymous class bodies reuse this type with the instantiated type's name.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    /// Declaration kind
    pub kind: TypeKind,
    /// Simple name
    pub name: String,
    /// Whole declaration
    pub span: Span,
    /// Body braces
    pub braces: Braces,
    /// Members in document order
    pub members: Vec<Member>,
}

/// Braced statement list
#[derive(Debug, Clone)]
pub struct Body {
    /// Brace offsets
    pub braces: Braces,
    /// Statements in document order
    pub stmts: Vec<Stmt>,
}

/// Member of a type body
#[derive(Debug, Clone)]
pub enum Member {
    /// Method or constructor
    Method(MethodDecl),
    /// `static { ... }` or `{ ... }`
    Initializer {
        /// Whether the initializer is static
        is_static: bool,
        /// Initializer body
        body: Body,
    },
    /// Field declaration; only nested executable expressions are kept
    Field {
        /// Declared type's simple name
        type_name: Option<String>,
        /// Nested lambdas, ternaries, anonymous classes and switches
        exprs: Vec<Expr>,
    },
    /// Nested type
    Type(TypeDecl),
    /// Enum constant with optional arguments and class body
    EnumConstant {
        /// Constant name
        name: String,
        /// Nested expressions from the argument list
        args: Vec<Expr>,
        /// Constant-specific class body
        body: Option<TypeDecl>,
    },
}

/// Method or constructor declaration
#[derive(Debug, Clone)]
pub struct MethodDecl {
    /// Method name (the class name for constructors)
    pub name: String,
    /// Whether this is a constructor, compact ones included
    pub is_constructor: bool,
    /// Whole declaration
    pub span: Span,
    /// Body; `None` for abstract and native methods
    pub body: Option<Body>,
    /// End offset of a leading `this(...)` or `super(...)` call
    pub explicit_call_end: Option<usize>,
    /// Simple name of the return type; `None` for constructors
    pub return_type: Option<String>,
    /// Simple names of the parameter types
    pub params: Vec<String>,
    /// Whether the last parameter is variable-arity
    pub varargs: bool,
}

impl MethodDecl {
    /// Declared type of the parameter receiving argument `index`
    #[must_use]
    pub fn param_for_argument(&self, index: usize) -> Option<&str> {
        match self.params.get(index) {
            Some(param) => Some(param),
            None if self.varargs => self.params.last().map(String::as_str),
            None => None,
        }
    }
}

/// Parenthesized condition or selector
#[derive(Debug, Clone)]
pub struct Condition {
    /// Text between the parentheses
    pub span: Span,
    /// Nested expressions
    pub exprs: Vec<Expr>,
}

/// Statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Nested `{ ... }` block
    Block(Body),
    /// `if (cond) then [else other]`
    If {
        /// Condition
        cond: Condition,
        /// Then branch
        then_branch: Box<Stmt>,
        /// Else branch
        else_branch: Option<Box<Stmt>>,
        /// Whole statement
        span: Span,
    },
    /// `while`, `for` and enhanced `for`
    Loop {
        /// Boolean condition; `None` for enhanced and condition-less `for`
        cond: Option<Span>,
        /// Expressions from the loop header
        header: Vec<Expr>,
        /// Loop body
        body: Box<Stmt>,
        /// Whole statement
        span: Span,
    },
    /// `do body while (cond);`
    DoWhile {
        /// Loop body
        body: Box<Stmt>,
        /// Condition
        cond: Condition,
        /// Whole statement
        span: Span,
    },
    /// Switch statement
    Switch(Switch),
    /// `try` with optional resources, catch clauses and finally
    Try {
        /// Expressions from the try-with-resources header
        resources: Option<Vec<Expr>>,
        /// Guarded body
        body: Body,
        /// Catch clause bodies
        catches: Vec<Body>,
        /// Finally body
        finally: Option<Body>,
        /// Whole statement
        span: Span,
    },
    /// `synchronized (lock) { ... }`
    Synchronized {
        /// Lock expression
        lock: Condition,
        /// Body
        body: Body,
        /// Whole statement
        span: Span,
    },
    /// `label: stmt`
    Labeled {
        /// Label name
        label: String,
        /// Labeled statement
        body: Box<Stmt>,
        /// Whole statement
        span: Span,
    },
    /// Local class, interface, enum or record
    LocalType(TypeDecl),
    /// Any other statement: expressions, declarations, jumps, empty
    Simple {
        /// Whole statement including the terminating `;`
        span: Span,
        /// Control transfer performed by the statement
        jump: Option<Jump>,
        /// Nested expressions
        exprs: Vec<Expr>,
    },
}

/// Statement that transfers control out of the enclosing code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jump {
    /// `return`
    Return,
    /// `throw`
    Throw,
    /// `yield` out of a switch expression
    Yield,
    /// `break`, optionally labeled
    Break(Option<String>),
    /// `continue`, optionally labeled
    Continue(Option<String>),
}

impl Stmt {
    /// Byte range of the whole statement
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Block(body) => body.braces.outer(),
            Self::Switch(switch) => switch.span,
            Self::LocalType(decl) => decl.span,
            Self::If { span, .. }
            | Self::Loop { span, .. }
            | Self::DoWhile { span, .. }
            | Self::Try { span, .. }
            | Self::Synchronized { span, .. }
            | Self::Labeled { span, .. }
            | Self::Simple { span, .. } => *span,
        }
    }
}

/// Switch statement or expression
#[derive(Debug, Clone)]
pub struct Switch {
    /// Selector
    pub selector: Condition,
    /// Braces around the case list
    pub braces: Braces,
    /// Cases in document order
    pub cases: Vec<SwitchCase>,
    /// Whether the switch is used as an expression
    pub is_expression: bool,
    /// Whole construct
    pub span: Span,
}

/// One `case` or `default` label with its body
#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// From the `case`/`default` keyword through `:` or `->`
    pub label: Span,
    /// Case body
    pub body: CaseBody,
}

/// Body of a switch case
#[derive(Debug, Clone)]
pub enum CaseBody {
    /// `case X:` followed by statements up to the next label
    Colon {
        /// From just after `:` to the end of the last statement
        region: Span,
        /// Statements
        stmts: Vec<Stmt>,
    },
    /// `case X -> { ... }`
    Block(Body),
    /// `case X -> expr;` or `case X -> throw e;`
    Expression {
        /// Expression through the terminating `;`
        span: Span,
        /// Whether the body is a `throw` statement
        is_throw: bool,
        /// Nested expressions
        exprs: Vec<Expr>,
    },
}

/// Expression that opens an executable region
#[derive(Debug, Clone)]
pub enum Expr {
    /// Lambda expression
    Lambda(Lambda),
    /// Conditional `a ? b : c`
    Ternary(Ternary),
    /// `new T(...) { ... }`
    AnonymousClass(TypeDecl),
    /// Switch expression
    Switch(Box<Switch>),
}

impl Expr {
    /// Byte range of the expression
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Lambda(lambda) => lambda.span,
            Self::Ternary(ternary) => Span::new(ternary.cond.start, ternary.else_branch.end),
            Self::AnonymousClass(decl) => decl.span,
            Self::Switch(switch) => switch.span,
        }
    }
}

/// Where a lambda appears, used to decide whether it returns a value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LambdaContext {
    /// Declared type when the lambda initializes a variable or field
    pub target_type: Option<String>,
    /// Name of the method or constructor the lambda is an argument of
    pub invoked: Option<String>,
    /// Position of the lambda in that argument list
    pub argument: Option<usize>,
}

/// Lambda expression
#[derive(Debug, Clone)]
pub struct Lambda {
    /// Whole lambda
    pub span: Span,
    /// Body
    pub body: LambdaBody,
    /// Syntactic context
    pub context: LambdaContext,
}

/// Lambda body
#[derive(Debug, Clone)]
pub enum LambdaBody {
    /// `-> { ... }`
    Block(Body),
    /// `-> expr`
    Expression {
        /// Body expression
        span: Span,
        /// Whether the expression could stand alone as a statement
        statement_like: bool,
        /// Method called by a body of the form `name(...)` or `this.name(...)`
        callee: Option<String>,
        /// Nested expressions
        exprs: Vec<Expr>,
    },
}

/// Conditional expression
#[derive(Debug, Clone)]
pub struct Ternary {
    /// Condition operand
    pub cond: Span,
    /// Operand evaluated when the condition holds
    pub then_branch: Span,
    /// Operand evaluated otherwise
    pub else_branch: Span,
    /// Nested expressions inside the condition
    pub cond_exprs: Vec<Expr>,
    /// Nested expressions inside the then operand
    pub then_exprs: Vec<Expr>,
    /// Nested expressions inside the else operand
    pub else_exprs: Vec<Expr>,
}
