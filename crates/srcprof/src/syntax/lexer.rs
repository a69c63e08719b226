//! Tokenizer for Java-like source text.
//!
//! Produces a flat token vector with byte offsets into the original text.
//! Comments and whitespace are dropped; literals are kept as single tokens
//! so their contents can never be mistaken for delimiters.

use super::SyntaxError;

/// Token categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    Ident,
    /// Numeric literal
    Number,
    /// String, text block or char literal
    Literal,
    /// Operator or delimiter
    Punct,
    /// End of input
    Eof,
}

/// One lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token category
    pub kind: TokenKind,
    /// Source text of the token
    pub text: &'a str,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// 1-based line of the first character
    pub line: u32,
}

impl Token<'_> {
    /// Check whether this token is the given punctuator or keyword
    #[inline]
    #[must_use]
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Literal && self.text == text
    }

    /// Check whether this token is an identifier (keywords included)
    #[inline]
    #[must_use]
    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

/// Multi-character punctuators, longest first.
///
/// `>>` and `>>>` are deliberately absent: generic closers must stay
/// separate tokens. `>=` is kept whole so it is never read as assignment.
const MULTI_PUNCT: &[&str] = &[
    "<<=", "...", "->", "::", "++", "--", "&&", "||", "==", "!=", "<=", ">=", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "<<",
];

const SINGLE_PUNCT: &str = "(){}[];,.@=<>!~?:+-*/&|^%";

/// Byte offset to line number mapping
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    /// Build the index for a source text
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    /// 1-based line containing the byte at `offset`
    #[must_use]
    pub fn line_of(&self, offset: usize) -> u32 {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx as u32 + 1,
            Err(idx) => idx as u32,
        }
    }

    /// Number of lines in the indexed text
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// Tokenize a complete source text.
///
/// The returned vector always ends with a single [`TokenKind::Eof`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            tokens: Vec::with_capacity(source.len() / 4),
        }
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, SyntaxError> {
        loop {
            self.skip_trivia()?;
            let Some(c) = self.current_char() else {
                break;
            };
            let start = self.pos;
            let line = self.line;
            let kind = if c.is_alphabetic() || c == '_' || c == '$' {
                self.ident();
                TokenKind::Ident
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()))
            {
                self.number();
                TokenKind::Number
            } else if c == '"' {
                self.string()?;
                TokenKind::Literal
            } else if c == '\'' {
                self.char_literal()?;
                TokenKind::Literal
            } else {
                self.punct(c)?;
                TokenKind::Punct
            };
            self.tokens.push(Token {
                kind,
                text: &self.source[start..self.pos],
                start,
                end: self.pos,
                line,
            });
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: "",
            start: self.source.len(),
            end: self.source.len(),
            line: self.line,
        });
        Ok(self.tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.line, message)
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.current_char() {
            if c == '\n' {
                self.line += 1;
            }
            self.pos += c.len_utf8();
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match (self.peek_byte(0), self.peek_byte(1)) {
                (Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0c), _) => self.advance_char(),
                (Some(b'/'), Some(b'/')) => {
                    while let Some(b) = self.peek_byte(0) {
                        if b == b'\n' {
                            break;
                        }
                        self.advance_char();
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let line = self.line;
                    self.pos += 2;
                    loop {
                        match (self.peek_byte(0), self.peek_byte(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.advance_char(),
                            (None, _) => {
                                return Err(SyntaxError::new(line, "unterminated block comment"))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn ident(&mut self) {
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn number(&mut self) {
        let mut prev = '\0';
        while let Some(c) = self.current_char() {
            let exponent_sign = (c == '+' || c == '-') && matches!(prev, 'e' | 'E' | 'p' | 'P');
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                // a dot followed by a non-suffix letter is member access
                if c == '.' && self.peek_byte(1).is_some_and(is_member_start) {
                    break;
                }
                prev = c;
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn string(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        if self.source[self.pos..].starts_with("\"\"\"") {
            self.pos += 3;
            loop {
                if self.source[self.pos..].starts_with("\"\"\"") {
                    self.pos += 3;
                    return Ok(());
                }
                match self.peek_byte(0) {
                    Some(b'\\') => {
                        self.pos += 1;
                        self.advance_char();
                    }
                    Some(_) => self.advance_char(),
                    None => return Err(SyntaxError::new(line, "unterminated text block")),
                }
            }
        }
        self.pos += 1;
        loop {
            match self.peek_byte(0) {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.advance_char();
                }
                Some(b'\n') | None => return Err(self.error("unterminated string literal")),
                Some(_) => self.advance_char(),
            }
        }
    }

    fn char_literal(&mut self) -> Result<(), SyntaxError> {
        self.pos += 1;
        loop {
            match self.peek_byte(0) {
                Some(b'\'') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.advance_char();
                }
                Some(b'\n') | None => return Err(self.error("unterminated character literal")),
                Some(_) => self.advance_char(),
            }
        }
    }

    fn punct(&mut self, c: char) -> Result<(), SyntaxError> {
        let rest = &self.source[self.pos..];
        if let Some(op) = MULTI_PUNCT.iter().find(|op| rest.starts_with(**op)) {
            self.pos += op.len();
            return Ok(());
        }
        if SINGLE_PUNCT.contains(c) {
            self.pos += 1;
            return Ok(());
        }
        Err(self.error(format!("unexpected character `{c}`")))
    }
}

fn is_member_start(b: u8) -> bool {
    b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E' | b'f' | b'F' | b'd' | b'D')
}
