//! Recursive-descent parser producing the shallow syntax tree.
//!
//! Delimiters are paired once up front, so unbalanced input is rejected
//! before any tree is built and opaque regions can be skipped in O(1).

use super::lexer::{Token, TokenKind};
use super::{
    Body, Braces, CaseBody, Condition, Expr, Jump, Lambda, LambdaBody, LambdaContext, Member,
    MethodDecl, Span, Stmt, Switch, SwitchCase, SyntaxError, Ternary, TypeDecl, TypeKind,
};

type SResult<T> = Result<T, SyntaxError>;

/// Name and declared types of a method header
struct Signature {
    name: String,
    is_constructor: bool,
    return_type: Option<String>,
    params: Vec<String>,
    varargs: bool,
}

const NO_PAIR: usize = usize::MAX;

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "abstract",
    "final",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
    "sealed",
];

const ASSIGN_OPS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<="];

/// Token-stream parser
pub(super) struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pairs: Vec<usize>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Pair up delimiters and prepare for parsing
    pub(super) fn new(tokens: Vec<Token<'a>>) -> SResult<Self> {
        let mut pairs = vec![NO_PAIR; tokens.len()];
        let mut stack: Vec<usize> = Vec::new();
        for (i, tok) in tokens.iter().enumerate() {
            if tok.kind != TokenKind::Punct {
                continue;
            }
            match tok.text {
                "(" | "[" | "{" => stack.push(i),
                ")" | "]" | "}" => {
                    let Some(open) = stack.pop() else {
                        return Err(SyntaxError::new(tok.line, format!("unmatched `{}`", tok.text)));
                    };
                    let opener = tokens[open];
                    let expected = match opener.text {
                        "(" => ")",
                        "[" => "]",
                        _ => "}",
                    };
                    if tok.text != expected {
                        return Err(SyntaxError::new(
                            tok.line,
                            format!(
                                "expected `{expected}` to close `{}` from line {}, found `{}`",
                                opener.text, opener.line, tok.text
                            ),
                        ));
                    }
                    pairs[open] = i;
                    pairs[i] = open;
                }
                _ => {}
            }
        }
        if let Some(&open) = stack.last() {
            let opener = tokens[open];
            return Err(SyntaxError::new(
                opener.line,
                format!("unclosed `{}`", opener.text),
            ));
        }
        Ok(Self {
            tokens,
            pairs,
            pos: 0,
        })
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn tok(&self, idx: usize) -> Token<'a> {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens[idx.min(last)]
    }

    fn peek(&self) -> Token<'a> {
        self.tok(self.pos)
    }

    fn nth(&self, n: usize) -> Token<'a> {
        self.tok(self.pos + n)
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is(text)
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn bump(&mut self) -> Token<'a> {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> SResult<Token<'a>> {
        if self.at(text) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(&format!("`{text}`")))
        }
    }

    fn expect_ident(&mut self) -> SResult<String> {
        if self.peek().is_ident() {
            Ok(self.bump().text.to_string())
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn unexpected(&self, wanted: &str) -> SyntaxError {
        let tok = self.peek();
        if tok.kind == TokenKind::Eof {
            SyntaxError::new(tok.line, format!("unexpected end of input, expected {wanted}"))
        } else {
            SyntaxError::new(tok.line, format!("expected {wanted}, found `{}`", tok.text))
        }
    }

    fn prev_end(&self) -> usize {
        self.pos.checked_sub(1).map_or(0, |i| self.tok(i).end)
    }

    /// Jump past the delimiter group opening at the current token
    fn skip_group(&mut self) {
        match self.pairs.get(self.pos) {
            Some(&close) if close != NO_PAIR => self.pos = close + 1,
            _ => {
                self.bump();
            }
        }
    }

    /// Index just past the generic argument list opening at `idx`
    fn angle_end(&self, mut idx: usize) -> usize {
        let mut depth = 0usize;
        loop {
            let tok = self.tok(idx);
            if tok.kind == TokenKind::Eof || tok.is(";") || tok.is("{") || tok.is(")") {
                return idx;
            }
            if tok.is("<") {
                depth += 1;
            } else if tok.is(">") {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return idx + 1;
                }
            }
            idx += 1;
        }
    }

    fn is_assignment(&self, idx: usize) -> bool {
        let tok = self.tok(idx);
        if tok.kind != TokenKind::Punct {
            return false;
        }
        if ASSIGN_OPS.contains(&tok.text) {
            return true;
        }
        // `>>=` and `>>>=` arrive as `>` runs followed by `>=`
        if tok.is(">=") && idx > 0 {
            let prev = self.tok(idx - 1);
            return prev.is(">") && prev.end == tok.start;
        }
        false
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Parse the whole token stream into a package name and type list
    pub(super) fn compilation_unit(mut self) -> SResult<(Option<String>, Vec<TypeDecl>)> {
        let mut package = None;
        let mut types = Vec::new();
        loop {
            if self.at_eof() {
                break;
            }
            if self.eat(";") {
                continue;
            }
            if self.at("import") {
                while !self.eat(";") {
                    if self.at_eof() {
                        return Err(self.unexpected("`;`"));
                    }
                    self.bump();
                }
                continue;
            }
            let start = self.peek().start;
            self.skip_modifiers();
            if self.eat("package") {
                let mut name = String::new();
                while !self.at(";") {
                    if self.at_eof() {
                        return Err(self.unexpected("`;`"));
                    }
                    name.push_str(self.bump().text);
                }
                self.bump();
                package = Some(name);
                continue;
            }
            if self.at("module") || (self.at("open") && self.nth(1).is("module")) {
                return Err(SyntaxError::new(
                    self.peek().line,
                    "module declarations are not supported",
                ));
            }
            if !self.at_type_keyword() {
                return Err(self.unexpected("type declaration"));
            }
            types.push(self.type_declaration(start)?);
        }
        Ok((package, types))
    }

    fn skip_annotation(&mut self) {
        self.bump();
        while self.peek().is_ident() {
            self.bump();
            if !self.eat(".") {
                break;
            }
        }
        if self.at("(") {
            self.skip_group();
        }
    }

    /// Skip annotations and modifiers, reporting whether `static` was seen
    fn skip_modifiers(&mut self) -> bool {
        let mut saw_static = false;
        loop {
            let tok = self.peek();
            if tok.is("@") && !self.nth(1).is("interface") {
                self.skip_annotation();
            } else if tok.is_ident() && MODIFIERS.contains(&tok.text) {
                saw_static |= tok.text == "static";
                self.bump();
            } else if tok.is("non") && self.nth(1).is("-") && self.nth(2).is("sealed") {
                self.pos += 3;
            } else {
                return saw_static;
            }
        }
    }

    fn at_type_keyword(&self) -> bool {
        let tok = self.peek();
        let next = self.nth(1);
        match tok.text {
            "class" | "interface" | "enum" if tok.is_ident() => next.is_ident(),
            "record" if tok.is_ident() => {
                next.is_ident() && (self.nth(2).is("(") || self.nth(2).is("<"))
            }
            "@" => next.is("interface"),
            _ => false,
        }
    }

    fn type_declaration(&mut self, start: usize) -> SResult<TypeDecl> {
        let kind = if self.eat("@") {
            self.expect("interface")?;
            TypeKind::Annotation
        } else {
            match self.bump().text {
                "class" => TypeKind::Class,
                "interface" => TypeKind::Interface,
                "enum" => TypeKind::Enum,
                "record" => TypeKind::Record,
                other => {
                    return Err(SyntaxError::new(
                        self.peek().line,
                        format!("expected type declaration, found `{other}`"),
                    ))
                }
            }
        };
        let name = self.expect_ident()?;
        while !self.at("{") {
            if self.at_eof() || self.at(";") {
                return Err(self.unexpected("`{`"));
            }
            if self.at("(") {
                self.skip_group();
            } else {
                self.bump();
            }
        }
        if kind == TypeKind::Annotation {
            let open = self.peek().start;
            self.skip_group();
            let close = self.tok(self.pos - 1).start;
            return Ok(TypeDecl {
                kind,
                name,
                span: Span::new(start, self.prev_end()),
                braces: Braces { open, close },
                members: Vec::new(),
            });
        }
        let (braces, members) = self.class_body(kind, &name)?;
        Ok(TypeDecl {
            kind,
            name,
            span: Span::new(start, self.prev_end()),
            braces,
            members,
        })
    }

    fn class_body(&mut self, kind: TypeKind, name: &str) -> SResult<(Braces, Vec<Member>)> {
        let open = self.expect("{")?.start;
        let mut members = Vec::new();
        if kind == TypeKind::Enum {
            self.enum_constants(&mut members)?;
        }
        loop {
            if self.at("}") {
                break;
            }
            if self.eat(";") {
                continue;
            }
            self.member(name, &mut members)?;
        }
        let close = self.bump().start;
        Ok((Braces { open, close }, members))
    }

    fn enum_constants(&mut self, members: &mut Vec<Member>) -> SResult<()> {
        loop {
            while self.at("@") {
                self.skip_annotation();
            }
            if self.at("}") || self.eat(";") {
                return Ok(());
            }
            let start = self.peek().start;
            let name = self.expect_ident()?;
            let args = if self.at("(") {
                let ctx = LambdaContext {
                    invoked: Some(name.clone()),
                    ..LambdaContext::default()
                };
                self.arguments(&ctx)?
            } else {
                Vec::new()
            };
            let body = if self.at("{") {
                let (braces, body_members) = self.class_body(TypeKind::Class, &name)?;
                Some(TypeDecl {
                    kind: TypeKind::Class,
                    name: name.clone(),
                    span: Span::new(start, self.prev_end()),
                    braces,
                    members: body_members,
                })
            } else {
                None
            };
            members.push(Member::EnumConstant { name, args, body });
            if self.eat(",") {
                continue;
            }
            if self.eat(";") || self.at("}") {
                return Ok(());
            }
            return Err(self.unexpected("`,`, `;` or `}`"));
        }
    }

    fn member(&mut self, class_name: &str, out: &mut Vec<Member>) -> SResult<()> {
        let start = self.peek().start;
        let is_static = self.skip_modifiers();
        if self.at("{") {
            let body = self.body()?;
            out.push(Member::Initializer { is_static, body });
            return Ok(());
        }
        if self.at_type_keyword() {
            out.push(Member::Type(self.type_declaration(start)?));
            return Ok(());
        }
        if self.at("<") {
            self.pos = self.angle_end(self.pos);
        }

        let tok = self.peek();
        if tok.is_ident()
            && tok.text == class_name
            && (self.nth(1).is("(") || self.nth(1).is("{"))
        {
            self.bump();
            let (params, varargs) = if self.at("(") {
                self.parameters()
            } else {
                (Vec::new(), false)
            };
            let signature = Signature {
                name: class_name.to_string(),
                is_constructor: true,
                return_type: None,
                params,
                varargs,
            };
            let method = self.method_rest(start, signature)?;
            out.push(Member::Method(method));
            return Ok(());
        }

        let type_start = self.pos;
        let mut idx = self.pos;
        loop {
            let tok = self.tok(idx);
            if tok.kind == TokenKind::Eof {
                self.pos = idx;
                return Err(self.unexpected("member declaration"));
            }
            if tok.is("(") {
                if idx == type_start || !self.tok(idx - 1).is_ident() {
                    self.pos = idx;
                    return Err(self.unexpected("method name"));
                }
                let name = self.tok(idx - 1).text.to_string();
                let return_type = self.type_name_in(type_start, idx - 1);
                self.pos = idx;
                let (params, varargs) = self.parameters();
                let signature = Signature {
                    name,
                    is_constructor: false,
                    return_type,
                    params,
                    varargs,
                };
                let method = self.method_rest(start, signature)?;
                out.push(Member::Method(method));
                return Ok(());
            }
            if tok.is("=") || tok.is(";") || tok.is(",") {
                let type_name = self.declared_type(type_start, idx);
                let exprs = self.field_rest(type_name.clone())?;
                out.push(Member::Field { type_name, exprs });
                return Ok(());
            }
            if tok.is("{") || tok.is("}") || tok.is(")") {
                self.pos = idx;
                return Err(self.unexpected("member declaration"));
            }
            idx = if tok.is("<") {
                self.angle_end(idx)
            } else if tok.is("[") {
                self.pairs[idx].saturating_add(1)
            } else {
                idx + 1
            };
        }
    }

    fn field_rest(&mut self, type_name: Option<String>) -> SResult<Vec<Expr>> {
        let ctx = LambdaContext {
            target_type: type_name,
            ..LambdaContext::default()
        };
        let mut exprs = Vec::new();
        loop {
            while !(self.at("=") || self.at(",") || self.at(";")) {
                if self.at_eof() {
                    return Err(self.unexpected("`;`"));
                }
                if self.at("[") {
                    self.skip_group();
                } else {
                    self.bump();
                }
            }
            if self.eat("=") {
                exprs.extend(self.expression(&ctx)?);
            }
            if self.eat(",") {
                continue;
            }
            self.expect(";")?;
            return Ok(exprs);
        }
    }

    fn method_rest(&mut self, start: usize, signature: Signature) -> SResult<MethodDecl> {
        let Signature {
            name,
            is_constructor,
            return_type,
            params,
            varargs,
        } = signature;
        loop {
            if self.at("{") {
                let (body, explicit_call_end) = self.method_body(is_constructor)?;
                return Ok(MethodDecl {
                    name,
                    is_constructor,
                    span: Span::new(start, self.prev_end()),
                    body: Some(body),
                    explicit_call_end,
                    return_type,
                    params,
                    varargs,
                });
            }
            if self.eat(";") {
                return Ok(MethodDecl {
                    name,
                    is_constructor,
                    span: Span::new(start, self.prev_end()),
                    body: None,
                    explicit_call_end: None,
                    return_type,
                    params,
                    varargs,
                });
            }
            if self.at_eof() {
                return Err(self.unexpected("method body or `;`"));
            }
            if self.at("default") {
                // annotation element default value
                self.bump();
                while !self.at(";") {
                    if self.at_eof() {
                        return Err(self.unexpected("`;`"));
                    }
                    if self.at("(") || self.at("{") || self.at("[") {
                        self.skip_group();
                    } else {
                        self.bump();
                    }
                }
            } else if self.at("(") || self.at("[") {
                self.skip_group();
            } else {
                self.bump();
            }
        }
    }

    fn method_body(&mut self, is_constructor: bool) -> SResult<(Body, Option<usize>)> {
        let open = self.expect("{")?.start;
        let mut stmts = Vec::new();
        let mut explicit = None;
        if is_constructor && self.at_explicit_constructor_call() {
            let stmt = self.statement()?;
            explicit = Some(stmt.span().end);
            stmts.push(stmt);
        }
        while !self.at("}") {
            stmts.push(self.statement()?);
        }
        let close = self.bump().start;
        Ok((
            Body {
                braces: Braces { open, close },
                stmts,
            },
            explicit,
        ))
    }

    fn at_explicit_constructor_call(&self) -> bool {
        let mut idx = self.pos;
        if self.tok(idx).is("<") {
            idx = self.angle_end(idx);
        }
        let tok = self.tok(idx);
        if (tok.is("this") || tok.is("super")) && self.tok(idx + 1).is("(") {
            return true;
        }
        // qualified superclass constructor call: `outer.super(...)`
        while self.tok(idx).is_ident() && self.tok(idx + 1).is(".") {
            idx += 2;
            if self.tok(idx).is("super") && self.tok(idx + 1).is("(") {
                return true;
            }
        }
        false
    }

    /// Simple name of the type declared by tokens `[from, eq)`, if they form a declaration
    fn declared_type(&self, from: usize, eq: usize) -> Option<String> {
        let mut idx = from;
        loop {
            let tok = self.tok(idx);
            if tok.is("final") {
                idx += 1;
            } else if tok.is("@") {
                idx += 1;
                while self.tok(idx).is_ident() || self.tok(idx).is(".") {
                    idx += 1;
                }
                if self.tok(idx).is("(") {
                    idx = self.pairs[idx].saturating_add(1);
                }
            } else {
                break;
            }
        }
        let mut last = None;
        while idx < eq && self.tok(idx).is_ident() {
            last = Some(self.tok(idx).text);
            idx += 1;
            if !self.tok(idx).is(".") {
                break;
            }
            idx += 1;
        }
        if idx >= eq {
            return None;
        }
        let after = self.tok(idx);
        let is_declaration =
            after.is_ident() || after.is("<") || (after.is("[") && self.tok(idx + 1).is("]"));
        if is_declaration {
            last.map(str::to_string)
        } else {
            None
        }
    }

    /// Simple name of the type spelled by tokens `[from, to)`
    ///
    /// Annotations, `final` and generic arguments are skipped; qualified
    /// names resolve to their last segment.
    fn type_name_in(&self, from: usize, to: usize) -> Option<String> {
        let mut last = None;
        let mut idx = from;
        while idx < to {
            let tok = self.tok(idx);
            if tok.is("@") {
                idx += 1;
                while idx < to && (self.tok(idx).is_ident() || self.tok(idx).is(".")) {
                    idx += 1;
                }
                if idx < to && self.tok(idx).is("(") {
                    idx = self.pairs[idx].saturating_add(1);
                }
                continue;
            }
            if tok.is("<") {
                idx = self.angle_end(idx);
                continue;
            }
            if tok.is_ident() && !tok.is("final") {
                last = Some(tok.text.to_string());
            }
            idx += 1;
        }
        last
    }

    /// Parameter types of the list opening at the current token, which is consumed
    fn parameters(&mut self) -> (Vec<String>, bool) {
        let open = self.pos;
        let close = match self.pairs.get(open) {
            Some(&close) if close != NO_PAIR => close,
            _ => {
                self.bump();
                return (Vec::new(), false);
            }
        };
        let mut params = Vec::new();
        let mut varargs = false;
        let mut segment = open + 1;
        let mut idx = open + 1;
        let mut angles = 0usize;
        while idx <= close {
            let tok = self.tok(idx);
            if idx == close || (angles == 0 && tok.is(",")) {
                let name = (segment..idx).rev().find(|&i| self.tok(i).is_ident());
                if let Some(name) = name {
                    varargs = (segment..name).any(|i| self.tok(i).is("..."));
                    if let Some(ty) = self.type_name_in(segment, name) {
                        params.push(ty);
                    }
                }
                segment = idx + 1;
                idx += 1;
                continue;
            }
            if tok.is("<") {
                angles += 1;
            } else if tok.is(">") {
                angles = angles.saturating_sub(1);
            }
            idx = match tok.text {
                "(" | "[" if tok.kind == TokenKind::Punct => self.pairs[idx].saturating_add(1),
                _ => idx + 1,
            };
        }
        self.pos = close + 1;
        (params, varargs)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn body(&mut self) -> SResult<Body> {
        let open = self.expect("{")?.start;
        let mut stmts = Vec::new();
        while !self.at("}") {
            stmts.push(self.statement()?);
        }
        let close = self.bump().start;
        Ok(Body {
            braces: Braces { open, close },
            stmts,
        })
    }

    fn condition(&mut self) -> SResult<Condition> {
        let open = self.expect("(")?;
        let exprs = self.expression(&LambdaContext::default())?;
        let close = self.expect(")")?;
        Ok(Condition {
            span: Span::new(open.end, close.start),
            exprs,
        })
    }

    fn statement(&mut self) -> SResult<Stmt> {
        let tok = self.peek();
        let start = tok.start;
        if tok.kind == TokenKind::Eof {
            return Err(self.unexpected("statement"));
        }
        if tok.is("{") {
            return Ok(Stmt::Block(self.body()?));
        }
        if tok.is_ident() {
            match tok.text {
                "if" => return self.if_statement(),
                "while" => {
                    self.bump();
                    let cond = self.condition()?;
                    let body = Box::new(self.statement()?);
                    return Ok(Stmt::Loop {
                        cond: Some(cond.span),
                        header: cond.exprs,
                        body,
                        span: Span::new(start, self.prev_end()),
                    });
                }
                "for" => return self.for_statement(),
                "do" => {
                    self.bump();
                    let body = Box::new(self.statement()?);
                    self.expect("while")?;
                    let cond = self.condition()?;
                    self.expect(";")?;
                    return Ok(Stmt::DoWhile {
                        body,
                        cond,
                        span: Span::new(start, self.prev_end()),
                    });
                }
                "switch" => return Ok(Stmt::Switch(self.switch(false)?)),
                "try" => return self.try_statement(),
                "synchronized" if self.nth(1).is("(") => {
                    self.bump();
                    let lock = self.condition()?;
                    let body = self.body()?;
                    return Ok(Stmt::Synchronized {
                        lock,
                        body,
                        span: Span::new(start, self.prev_end()),
                    });
                }
                _ => {}
            }
            if self.nth(1).is(":") && !matches!(tok.text, "case" | "default") {
                let label = self.bump().text.to_string();
                self.bump();
                let body = Box::new(self.statement()?);
                return Ok(Stmt::Labeled {
                    label,
                    body,
                    span: Span::new(start, self.prev_end()),
                });
            }
        }
        if self.looks_like_local_type() {
            self.skip_modifiers();
            return Ok(Stmt::LocalType(self.type_declaration(start)?));
        }
        self.simple_statement()
    }

    fn looks_like_local_type(&self) -> bool {
        let mut idx = self.pos;
        loop {
            let tok = self.tok(idx);
            if tok.is("@") && !self.tok(idx + 1).is("interface") {
                idx += 1;
                while self.tok(idx).is_ident() || self.tok(idx).is(".") {
                    idx += 1;
                }
                if self.tok(idx).is("(") {
                    idx = self.pairs[idx].saturating_add(1);
                }
            } else if matches!(tok.text, "final" | "abstract" | "static" | "strictfp" | "sealed")
                && tok.is_ident()
            {
                idx += 1;
            } else {
                break;
            }
        }
        let tok = self.tok(idx);
        let next = self.tok(idx + 1);
        match tok.text {
            "class" | "interface" | "enum" if tok.is_ident() => next.is_ident(),
            "record" if tok.is_ident() => {
                next.is_ident() && (self.tok(idx + 2).is("(") || self.tok(idx + 2).is("<"))
            }
            _ => false,
        }
    }

    fn if_statement(&mut self) -> SResult<Stmt> {
        let start = self.bump().start;
        let cond = self.condition()?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.eat("else") {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn for_statement(&mut self) -> SResult<Stmt> {
        let start = self.bump().start;
        if !self.at("(") {
            return Err(self.unexpected("`(`"));
        }
        let close = self.pairs[self.pos];
        self.bump();
        let mut header = Vec::new();
        let mut semicolons = 0usize;
        let mut cond = None;
        while self.pos < close {
            if self.eat(";") {
                semicolons += 1;
                continue;
            }
            if self.eat(",") || self.eat(":") {
                continue;
            }
            let before = self.pos;
            let expr_start = self.peek().start;
            header.extend(self.expression(&LambdaContext::default())?);
            if self.pos == before {
                return Err(self.unexpected("`)`"));
            }
            if semicolons == 1 {
                cond = Some(Span::new(expr_start, self.prev_end()));
            }
        }
        self.expect(")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::Loop {
            cond,
            header,
            body,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn try_statement(&mut self) -> SResult<Stmt> {
        let start = self.bump().start;
        let resources = if self.eat("(") {
            let mut exprs = Vec::new();
            loop {
                if self.at(")") {
                    break;
                }
                exprs.extend(self.expression(&LambdaContext::default())?);
                if !self.eat(";") {
                    break;
                }
            }
            self.expect(")")?;
            Some(exprs)
        } else {
            None
        };
        let body = self.body()?;
        let mut catches = Vec::new();
        while self.eat("catch") {
            if !self.at("(") {
                return Err(self.unexpected("`(`"));
            }
            self.skip_group();
            catches.push(self.body()?);
        }
        let finally = if self.eat("finally") {
            Some(self.body()?)
        } else {
            None
        };
        if resources.is_none() && catches.is_empty() && finally.is_none() {
            return Err(self.unexpected("`catch` or `finally`"));
        }
        Ok(Stmt::Try {
            resources,
            body,
            catches,
            finally,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn simple_statement(&mut self) -> SResult<Stmt> {
        let start = self.peek().start;
        let kw = self.peek();
        let mut jump = None;
        if kw.is_ident() {
            match kw.text {
                "return" | "throw" | "assert" => {
                    jump = match kw.text {
                        "return" => Some(Jump::Return),
                        "throw" => Some(Jump::Throw),
                        _ => None,
                    };
                    self.bump();
                }
                "break" | "continue" => {
                    self.bump();
                    let label = if self.peek().is_ident() {
                        Some(self.bump().text.to_string())
                    } else {
                        None
                    };
                    self.expect(";")?;
                    let jump = if kw.text == "break" {
                        Jump::Break(label)
                    } else {
                        Jump::Continue(label)
                    };
                    return Ok(Stmt::Simple {
                        span: Span::new(start, self.prev_end()),
                        jump: Some(jump),
                        exprs: Vec::new(),
                    });
                }
                "yield"
                    if !self.is_assignment(self.pos + 1)
                        && !matches!(self.nth(1).text, "." | "[" | "++" | "--" | ";") =>
                {
                    jump = Some(Jump::Yield);
                    self.bump();
                }
                _ => {}
            }
        }
        let ctx = LambdaContext::default();
        let mut exprs = Vec::new();
        loop {
            exprs.extend(self.expression(&ctx)?);
            if self.eat(";") {
                break;
            }
            if self.eat(",") || self.eat(":") {
                continue;
            }
            return Err(self.unexpected("`;`"));
        }
        Ok(Stmt::Simple {
            span: Span::new(start, self.prev_end()),
            jump,
            exprs,
        })
    }

    fn switch(&mut self, is_expression: bool) -> SResult<Switch> {
        let start = self.bump().start;
        let selector = self.condition()?;
        let open = self.expect("{")?.start;
        let mut cases = Vec::new();
        while !self.at("}") {
            if !(self.at("case") || self.at("default")) {
                return Err(self.unexpected("`case` or `default`"));
            }
            let label_start = self.bump().start;
            while !(self.at("->") || self.at(":")) {
                if self.at_eof() || self.at("}") || self.at(";") {
                    return Err(self.unexpected("`:` or `->`"));
                }
                if self.at("(") || self.at("[") {
                    self.skip_group();
                } else {
                    self.bump();
                }
            }
            if self.eat(":") {
                let label = Span::new(label_start, self.prev_end());
                let region_start = self.prev_end();
                let mut stmts = Vec::new();
                while !(self.at("case") || self.at("default") || self.at("}")) {
                    stmts.push(self.statement()?);
                }
                let region_end = stmts.last().map_or(region_start, |s| s.span().end);
                cases.push(SwitchCase {
                    label,
                    body: CaseBody::Colon {
                        region: Span::new(region_start, region_end),
                        stmts,
                    },
                });
            } else {
                self.bump();
                let label = Span::new(label_start, self.prev_end());
                let body = if self.at("{") {
                    CaseBody::Block(self.body()?)
                } else {
                    let body_start = self.peek().start;
                    let is_throw = self.eat("throw");
                    let exprs = self.expression(&LambdaContext::default())?;
                    self.expect(";")?;
                    CaseBody::Expression {
                        span: Span::new(body_start, self.prev_end()),
                        is_throw,
                        exprs,
                    }
                };
                cases.push(SwitchCase { label, body });
            }
        }
        let close = self.bump().start;
        Ok(Switch {
            selector,
            braces: Braces { open, close },
            cases,
            is_expression,
            span: Span::new(start, self.prev_end()),
        })
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Scan one expression up to a depth-0 terminator, collecting nested
    /// lambdas, ternaries, anonymous classes and switch expressions.
    ///
    /// The terminator (`;` `,` `)` `]` `}` `:`) is left unconsumed.
    fn expression(&mut self, ctx: &LambdaContext) -> SResult<Vec<Expr>> {
        let mut out = Vec::new();
        let mut ctx = ctx.clone();
        let mut seg_start = self.pos;
        loop {
            let tok = self.peek();
            match tok.kind {
                TokenKind::Eof => return Err(self.unexpected("expression")),
                TokenKind::Literal | TokenKind::Number => {
                    self.bump();
                    continue;
                }
                TokenKind::Ident => {
                    if self.nth(1).is("->") {
                        out.push(Expr::Lambda(self.lambda(&ctx)?));
                    } else if tok.text == "new" {
                        self.creation(&mut out)?;
                    } else if tok.text == "switch" && self.nth(1).is("(") {
                        out.push(Expr::Switch(Box::new(self.switch(true)?)));
                    } else {
                        self.bump();
                    }
                    continue;
                }
                TokenKind::Punct => {}
            }
            match tok.text {
                ";" | "," | ")" | "]" | "}" | ":" => break,
                "?" if !self.is_wildcard() => {
                    let ternary = self.ternary(seg_start, &mut out, &ctx)?;
                    out.push(Expr::Ternary(ternary));
                }
                "(" => {
                    let close = self.pairs[self.pos];
                    if self.tok(close.saturating_add(1)).is("->") {
                        out.push(Expr::Lambda(self.lambda(&ctx)?));
                    } else {
                        let args_ctx = LambdaContext {
                            invoked: self.invoked_name(),
                            ..LambdaContext::default()
                        };
                        out.extend(self.arguments(&args_ctx)?);
                    }
                }
                "[" => {
                    self.bump();
                    out.extend(self.expression(&LambdaContext::default())?);
                    self.expect("]")?;
                }
                "{" => {
                    // array initializer
                    self.bump();
                    while !self.at("}") {
                        out.extend(self.expression(&LambdaContext::default())?);
                        if !self.eat(",") {
                            break;
                        }
                    }
                    self.expect("}")?;
                }
                _ if self.is_assignment(self.pos) => {
                    if ctx.target_type.is_none() {
                        ctx.target_type = self.declared_type(seg_start, self.pos);
                    }
                    self.bump();
                    seg_start = self.pos;
                }
                _ => {
                    self.bump();
                }
            }
        }
        Ok(out)
    }

    fn is_wildcard(&self) -> bool {
        let prev = self.pos.checked_sub(1).map(|i| self.tok(i));
        prev.is_some_and(|p| p.is("<") || p.is(",")) || self.nth(1).is(">")
    }

    fn invoked_name(&self) -> Option<String> {
        let prev = self.tok(self.pos.checked_sub(1)?);
        prev.is_ident().then(|| prev.text.to_string())
    }

    /// Parenthesized argument list at the current token
    fn arguments(&mut self, ctx: &LambdaContext) -> SResult<Vec<Expr>> {
        self.expect("(")?;
        let mut out = Vec::new();
        let mut index = 0usize;
        while !self.at(")") {
            let arg_ctx = LambdaContext {
                argument: Some(index),
                ..ctx.clone()
            };
            out.extend(self.expression(&arg_ctx)?);
            if !self.eat(",") {
                break;
            }
            index += 1;
        }
        self.expect(")")?;
        Ok(out)
    }

    fn ternary(
        &mut self,
        seg_start: usize,
        out: &mut Vec<Expr>,
        ctx: &LambdaContext,
    ) -> SResult<Ternary> {
        if seg_start == self.pos {
            return Err(self.unexpected("condition before `?`"));
        }
        let cond = Span::new(self.tok(seg_start).start, self.prev_end());
        let split = out
            .iter()
            .position(|e| e.span().start >= cond.start)
            .unwrap_or(out.len());
        let cond_exprs = out.split_off(split);
        self.bump();

        let then_idx = self.pos;
        let then_start = self.peek().start;
        let then_exprs = self.expression(ctx)?;
        if self.pos == then_idx {
            return Err(self.unexpected("operand after `?`"));
        }
        let then_branch = Span::new(then_start, self.prev_end());
        self.expect(":")?;

        let else_idx = self.pos;
        let else_start = self.peek().start;
        let else_exprs = self.expression(ctx)?;
        if self.pos == else_idx {
            return Err(self.unexpected("operand after `:`"));
        }
        let else_branch = Span::new(else_start, self.prev_end());

        Ok(Ternary {
            cond,
            then_branch,
            else_branch,
            cond_exprs,
            then_exprs,
            else_exprs,
        })
    }

    fn lambda(&mut self, ctx: &LambdaContext) -> SResult<Lambda> {
        let start = self.peek().start;
        if self.at("(") {
            self.skip_group();
        } else {
            self.bump();
        }
        self.expect("->")?;
        let body = if self.at("{") {
            LambdaBody::Block(self.body()?)
        } else {
            let first = self.pos;
            let body_start = self.peek().start;
            let exprs = self.expression(&LambdaContext::default())?;
            if self.pos == first {
                return Err(self.unexpected("lambda body"));
            }
            LambdaBody::Expression {
                span: Span::new(body_start, self.prev_end()),
                statement_like: self.is_statement_expression(first, self.pos),
                callee: self.local_callee(first, self.pos),
                exprs,
            }
        };
        Ok(Lambda {
            span: Span::new(start, self.prev_end()),
            body,
            context: ctx.clone(),
        })
    }

    /// Instance creation; array creations leave `[`/`{` to the caller
    fn creation(&mut self, out: &mut Vec<Expr>) -> SResult<()> {
        let start = self.bump().start;
        let mut type_name = None;
        loop {
            let tok = self.peek();
            if tok.is("@") {
                self.skip_annotation();
            } else if tok.is_ident() {
                type_name = Some(tok.text.to_string());
                self.bump();
            } else if tok.is(".") {
                self.bump();
            } else if tok.is("<") {
                self.pos = self.angle_end(self.pos);
            } else {
                break;
            }
        }
        if !self.at("(") {
            return Ok(());
        }
        let ctx = LambdaContext {
            invoked: type_name.clone(),
            ..LambdaContext::default()
        };
        out.extend(self.arguments(&ctx)?);
        if self.at("{") {
            let name = type_name.unwrap_or_default();
            let (braces, members) = self.class_body(TypeKind::Class, &name)?;
            out.push(Expr::AnonymousClass(TypeDecl {
                kind: TypeKind::Class,
                name,
                span: Span::new(start, self.prev_end()),
                braces,
                members,
            }));
        }
        Ok(())
    }

    /// Method named by tokens `[from, to)` when they are exactly one
    /// unqualified or `this.`-qualified call
    fn local_callee(&self, from: usize, to: usize) -> Option<String> {
        let name = if self.tok(from).is("this") && self.tok(from + 1).is(".") {
            from + 2
        } else {
            from
        };
        let tok = self.tok(name);
        let open = name + 1;
        let is_call = tok.is_ident()
            && !matches!(tok.text, "new" | "this" | "super" | "switch")
            && self.tok(open).is("(")
            && open < to
            && self.pairs[open] == to - 1;
        is_call.then(|| tok.text.to_string())
    }

    /// Whether tokens `[from, to)` form an expression that is also a valid
    /// statement: assignment, increment, method invocation or instance creation
    fn is_statement_expression(&self, from: usize, to: usize) -> bool {
        let toks = &self.tokens[from..to];
        let (Some(first), Some(last)) = (toks.first(), toks.last()) else {
            return false;
        };
        if first.is("++") || first.is("--") || last.is("++") || last.is("--") {
            return true;
        }
        let mut depth = 0usize;
        let mut type_args = 0usize;
        let mut top_level_bracket = false;
        for (i, tok) in toks.iter().enumerate() {
            if depth == 0 && tok.is("instanceof") {
                return false;
            }
            if tok.kind != TokenKind::Punct {
                continue;
            }
            match tok.text {
                "(" | "[" | "{" => {
                    top_level_bracket |= depth == 0 && tok.text == "[";
                    depth += 1;
                }
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ if depth > 0 => {}
                _ if self.is_assignment(from + i) => return true,
                "." | "::" | "@" => {}
                "<" if i > 0 && toks[i - 1].is(".") => type_args += 1,
                ">" if type_args > 0 => type_args -= 1,
                _ => return false,
            }
        }
        if first.is("new") {
            return last.is(")") || (last.is("}") && !top_level_bracket);
        }
        last.is(")") && !first.is("(")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::super::{parse, CaseBody, Expr, LambdaBody, Member, Stmt, TypeKind};
    use std::path::Path;

    fn parse_ok(source: &str) -> super::super::CompilationUnit {
        parse(Path::new("T.java"), source).unwrap()
    }

    fn first_method_stmts(source: &str) -> Vec<Stmt> {
        let unit = parse_ok(source);
        for member in &unit.types[0].members {
            if let Member::Method(m) = member {
                return m.body.as_ref().unwrap().stmts.clone();
            }
        }
        panic!("no method");
    }

    mod declaration_tests {
        use super::*;

        #[test]
        fn test_package_and_types() {
            let unit = parse_ok(
                "package com.acme.util;\nimport java.util.*;\n\
                 public final class A { }\ninterface B { void f(); }\nenum C { X, Y }\n\
                 record D(int x) { }\n@interface E { int v() default 3; }",
            );
            assert_eq!(unit.package.as_deref(), Some("com.acme.util"));
            let kinds: Vec<_> = unit.types.iter().map(|t| t.kind).collect();
            assert_eq!(
                kinds,
                vec![
                    TypeKind::Class,
                    TypeKind::Interface,
                    TypeKind::Enum,
                    TypeKind::Record,
                    TypeKind::Annotation
                ]
            );
        }

        #[test]
        fn test_members() {
            let unit = parse_ok(
                "class A<T extends Comparable<T>> {\n\
                   private static final Map<String, List<Integer>> M = new HashMap<>();\n\
                   static { init(); }\n\
                   { count = 0; }\n\
                   A(int x) { this(x, 0); }\n\
                   A(int x, int y) { super(); }\n\
                   public <R> R get(Function<T, R> f) throws IOException { return null; }\n\
                   abstract void g();\n\
                   class Inner { }\n\
                 }",
            );
            let members = &unit.types[0].members;
            assert!(matches!(members[0], Member::Field { .. }));
            assert!(matches!(members[1], Member::Initializer { is_static: true, .. }));
            assert!(matches!(members[2], Member::Initializer { is_static: false, .. }));
            let Member::Method(ctor) = &members[3] else {
                panic!("expected constructor")
            };
            assert!(ctor.is_constructor);
            assert!(ctor.explicit_call_end.is_some());
            let Member::Method(get) = &members[5] else {
                panic!("expected method")
            };
            assert_eq!(get.name, "get");
            assert!(!get.is_constructor);
            let Member::Method(g) = &members[6] else {
                panic!("expected method")
            };
            assert!(g.body.is_none());
            assert!(matches!(members[7], Member::Type(_)));
        }

        #[test]
        fn test_enum_constant_bodies() {
            let unit = parse_ok(
                "enum Op { PLUS(\"+\") { int apply(int a, int b) { return a + b; } }, MINUS(\"-\"); \
                 Op(String s) { } }",
            );
            let members = &unit.types[0].members;
            let Member::EnumConstant { name, body, .. } = &members[0] else {
                panic!("expected constant")
            };
            assert_eq!(name, "PLUS");
            assert!(body.is_some());
            assert!(matches!(&members[1], Member::EnumConstant { body: None, .. }));
            assert!(matches!(&members[2], Member::Method(m) if m.is_constructor));
        }

        #[test]
        fn test_field_lambda_gets_declared_type() {
            let unit = parse_ok("class A { Runnable r = () -> go(); }");
            let Member::Field { type_name, exprs } = &unit.types[0].members[0] else {
                panic!("expected field")
            };
            assert_eq!(type_name.as_deref(), Some("Runnable"));
            let Expr::Lambda(lambda) = &exprs[0] else {
                panic!("expected lambda")
            };
            assert_eq!(lambda.context.target_type.as_deref(), Some("Runnable"));
        }

        #[test]
        fn test_method_signatures() {
            let unit = parse_ok(
                "class A {\n\
                   A(final int x, @Named(\"k\") Map<String, List<Integer>> m) { }\n\
                   public <T> java.util.List<T> load(String key, Loader<T> loader) { return null; }\n\
                   void log(String fmt, Object... args) { }\n\
                   int[] none() { return null; }\n\
                 }",
            );
            let methods: Vec<_> = unit.types[0]
                .members
                .iter()
                .filter_map(|m| match m {
                    Member::Method(m) => Some(m),
                    _ => None,
                })
                .collect();
            assert_eq!(methods[0].return_type, None);
            assert_eq!(methods[0].params, vec!["int", "Map"]);
            assert_eq!(methods[1].return_type.as_deref(), Some("List"));
            assert_eq!(methods[1].params, vec!["String", "Loader"]);
            assert_eq!(methods[1].param_for_argument(1), Some("Loader"));
            assert_eq!(methods[1].param_for_argument(2), None);
            assert!(methods[2].varargs);
            assert_eq!(methods[2].return_type.as_deref(), Some("void"));
            assert_eq!(methods[2].param_for_argument(4), Some("Object"));
            assert_eq!(methods[3].return_type.as_deref(), Some("int"));
            assert!(methods[3].params.is_empty());
        }
    }

    mod statement_tests {
        use super::*;
        use super::super::super::Jump;

        #[test]
        fn test_loop_conditions() {
            let src = "class A { void f() { while (x < 3) x++; for (int i = 0; i < n; i++) { } \
                       for (;;) { } for (String s : xs) { } } }";
            let stmts = first_method_stmts(src);
            let conds: Vec<_> = stmts
                .iter()
                .map(|s| match s {
                    Stmt::Loop { cond, .. } => cond.map(|c| &src[c.start..c.end]),
                    other => panic!("unexpected {other:?}"),
                })
                .collect();
            assert_eq!(conds, vec![Some("x < 3"), Some("i < n"), None, None]);
        }

        #[test]
        fn test_jump_statements() {
            let stmts = first_method_stmts(
                "class A { int f() { l: for (;;) { break l; } continue; break; throw e; yield 3; return 1; } }",
            );
            let jumps: Vec<_> = stmts[1..]
                .iter()
                .map(|s| match s {
                    Stmt::Simple { jump, .. } => jump.clone(),
                    other => panic!("unexpected {other:?}"),
                })
                .collect();
            assert_eq!(
                jumps,
                vec![
                    Some(Jump::Continue(None)),
                    Some(Jump::Break(None)),
                    Some(Jump::Throw),
                    Some(Jump::Yield),
                    Some(Jump::Return),
                ]
            );
            let Stmt::Labeled { body, .. } = &stmts[0] else {
                panic!("expected label")
            };
            let Stmt::Loop { body, .. } = body.as_ref() else {
                panic!("expected loop")
            };
            let Stmt::Block(block) = body.as_ref() else {
                panic!("expected block")
            };
            assert!(matches!(
                &block.stmts[0],
                Stmt::Simple { jump: Some(Jump::Break(Some(label))), .. } if label == "l"
            ));
        }

        #[test]
        fn test_if_else_chain() {
            let stmts = first_method_stmts(
                "class A { void f(int x) { if (x > 0) a(); else if (x < 0) { b(); } else c(); } }",
            );
            let Stmt::If { else_branch, .. } = &stmts[0] else {
                panic!("expected if")
            };
            let nested = else_branch.as_ref().unwrap();
            assert!(matches!(nested.as_ref(), Stmt::If { else_branch: Some(_), .. }));
        }

        #[test]
        fn test_loops_and_try() {
            let stmts = first_method_stmts(
                "class A { void f() {\n\
                   for (int i = 0, j = 1; i < n; i++) s += i;\n\
                   for (String s : list) { }\n\
                   while (x) x = step();\n\
                   do { x++; } while (x < 5);\n\
                   try (var in = open()) { read(in); } catch (IOException | RuntimeException e) { } finally { close(); }\n\
                   outer: for (;;) break outer;\n\
                   synchronized (this) { n++; }\n\
                 } }",
            );
            assert!(matches!(stmts[0], Stmt::Loop { .. }));
            assert!(matches!(stmts[1], Stmt::Loop { .. }));
            assert!(matches!(stmts[2], Stmt::Loop { .. }));
            assert!(matches!(stmts[3], Stmt::DoWhile { .. }));
            assert!(
                matches!(&stmts[4], Stmt::Try { resources: Some(_), catches, finally: Some(_), .. } if catches.len() == 1)
            );
            assert!(matches!(stmts[5], Stmt::Labeled { .. }));
            assert!(matches!(stmts[6], Stmt::Synchronized { .. }));
        }

        #[test]
        fn test_switch_forms() {
            let stmts = first_method_stmts(
                "class A { int f(int k) {\n\
                   switch (k) { case 1: case 2: a(); break; default: b(); }\n\
                   int v = switch (k) { case 1 -> 10; case 2 -> { yield 20; } default -> throw new X(); };\n\
                   return v;\n\
                 } }",
            );
            let Stmt::Switch(sw) = &stmts[0] else {
                panic!("expected switch")
            };
            assert!(!sw.is_expression);
            assert_eq!(sw.cases.len(), 3);
            let CaseBody::Colon { region, stmts: s } = &sw.cases[0].body else {
                panic!("expected colon case")
            };
            assert!(region.is_empty());
            assert!(s.is_empty());

            let Stmt::Simple { exprs, .. } = &stmts[1] else {
                panic!("expected declaration")
            };
            let Expr::Switch(expr_switch) = &exprs[0] else {
                panic!("expected switch expression")
            };
            assert!(expr_switch.is_expression);
            assert!(matches!(
                expr_switch.cases[2].body,
                CaseBody::Expression { is_throw: true, .. }
            ));
        }

        #[test]
        fn test_local_class() {
            let stmts =
                first_method_stmts("class A { void f() { final class Local { void g() { } } } }");
            assert!(matches!(&stmts[0], Stmt::LocalType(decl) if decl.name == "Local"));
        }
    }

    mod expression_tests {
        use super::*;

        fn exprs_of(stmt_source: &str) -> Vec<Expr> {
            let source = format!("class A {{ void f() {{ {stmt_source} }} }}");
            let stmts = first_method_stmts(&source);
            match &stmts[0] {
                Stmt::Simple { exprs, .. } => exprs.clone(),
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_ternary_operands() {
            let src = "x = a > 0 ? b : c + d;";
            let exprs = exprs_of(src);
            let Expr::Ternary(t) = &exprs[0] else {
                panic!("expected ternary")
            };
            // offsets are relative to the wrapper text
            let offset = "class A { void f() { ".len();
            let text = |s: super::super::super::Span| &src[s.start - offset..s.end - offset];
            assert_eq!(text(t.cond), "a > 0");
            assert_eq!(text(t.then_branch), "b");
            assert_eq!(text(t.else_branch), "c + d");
        }

        #[test]
        fn test_nested_ternary_is_right_associative() {
            let exprs = exprs_of("return a ? b : c ? d : e;");
            let Expr::Ternary(t) = &exprs[0] else {
                panic!("expected ternary")
            };
            assert!(t.then_exprs.is_empty());
            assert!(matches!(t.else_exprs[0], Expr::Ternary(_)));
        }

        #[test]
        fn test_wildcard_is_not_ternary() {
            let exprs = exprs_of("List<? extends Number> xs = new ArrayList<>();");
            assert!(exprs.is_empty());
        }

        #[test]
        fn test_lambda_forms_and_context() {
            let exprs = exprs_of("items.forEach(x -> log(x));");
            let Expr::Lambda(l) = &exprs[0] else {
                panic!("expected lambda")
            };
            assert_eq!(l.context.invoked.as_deref(), Some("forEach"));
            assert!(matches!(
                l.body,
                LambdaBody::Expression {
                    statement_like: true,
                    ..
                }
            ));

            let exprs = exprs_of("xs.map((a) -> a * 2);");
            let Expr::Lambda(l) = &exprs[0] else {
                panic!("expected lambda")
            };
            assert!(matches!(
                l.body,
                LambdaBody::Expression {
                    statement_like: false,
                    ..
                }
            ));

            let exprs = exprs_of("run(() -> { go(); });");
            assert!(matches!(&exprs[0], Expr::Lambda(l) if matches!(l.body, LambdaBody::Block(_))));
        }

        #[test]
        fn test_lambda_argument_position_and_callee() {
            let exprs = exprs_of("pool.submit(task, () -> compute(k), x -> this.load(x).get());");
            let lambdas: Vec<_> = exprs
                .iter()
                .filter_map(|e| match e {
                    Expr::Lambda(l) => Some(l),
                    _ => None,
                })
                .collect();
            assert_eq!(lambdas[0].context.invoked.as_deref(), Some("submit"));
            assert_eq!(lambdas[0].context.argument, Some(1));
            assert_eq!(lambdas[1].context.argument, Some(2));
            assert!(matches!(
                &lambdas[0].body,
                LambdaBody::Expression { callee: Some(name), .. } if name == "compute"
            ));
            assert!(matches!(
                &lambdas[1].body,
                LambdaBody::Expression { callee: None, .. }
            ));

            let exprs = exprs_of("run(() -> this.step(1));");
            assert!(matches!(
                &exprs[0],
                Expr::Lambda(l) if matches!(&l.body, LambdaBody::Expression { callee: Some(n), .. } if n == "step")
            ));
        }

        #[test]
        fn test_anonymous_class() {
            let exprs = exprs_of("Runnable r = new Runnable() { public void run() { go(); } };");
            let Expr::AnonymousClass(decl) = &exprs[0] else {
                panic!("expected anonymous class")
            };
            assert_eq!(decl.name, "Runnable");
            assert_eq!(decl.members.len(), 1);
        }

        #[test]
        fn test_shift_assignment_resets_segment() {
            let exprs = exprs_of("x >>= c ? 1 : 2;");
            let Expr::Ternary(t) = &exprs[0] else {
                panic!("expected ternary")
            };
            assert_eq!(t.cond.len(), 1);
        }
    }

    mod error_tests {
        use super::*;
        use crate::ProfError;

        #[test]
        fn test_unbalanced_braces() {
            let err = parse(Path::new("Bad.java"), "class A {\n void f() {\n}").unwrap_err();
            assert!(matches!(err, ProfError::Parse { line: 1, .. }));
        }

        #[test]
        fn test_missing_semicolon_names_line() {
            let err =
                parse(Path::new("Bad.java"), "class A {\n void f() {\n  x = 1\n }\n}").unwrap_err();
            let ProfError::Parse { line, path, .. } = err else {
                panic!("expected parse error")
            };
            assert_eq!(line, 4);
            assert_eq!(path, Path::new("Bad.java"));
        }

        #[test]
        fn test_module_declaration_rejected() {
            assert!(parse(Path::new("module-info.java"), "module a.b { }").is_err());
        }
    }
}
