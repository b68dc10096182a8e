//! Recursive-descent parser for TextPlan documents.
//!
//! The parser never stops at the first problem. A construct that fails to
//! match is replaced by an error node, a diagnostic is recorded, and parsing
//! resumes at the next recovery point (see `recovery.rs`). A parse call
//! therefore always returns a complete [`Plan`] plus zero or more
//! diagnostics.

use crate::ast::{Expression, Identifier, NumberLiteral, Plan, StringLiteral};
use crate::error::{Diagnostic, ErrorKind, LexError, Severity};
use crate::lexer::{self, Lexer, Token, TokenKind, TriviaKind};
use crate::span::{LineIndex, Span};
use std::fmt;

mod builder;
mod declarations;
mod expressions;
mod recovery;
mod relations;
mod types;

use builder::Marker;

/// Expressions, types and literals may nest at most this deep.
pub const MAX_NESTING: usize = 128;

/// Source name used by [`parse`].
pub const DEFAULT_SOURCE_NAME: &str = "<input>";

/// Why a rule failed to match.
#[derive(Debug)]
pub(crate) enum ParseError {
    /// Recoverable at the enclosing statement.
    Syntax(Diagnostic),
    /// The offending token is a lexer error token; the lexer already
    /// reported it.
    Reported,
    /// Input ended inside a bracketed construct. An enclosing body closes
    /// there; outside any body it unwinds to the top level. `None` when the
    /// truncation is already reported, or was caused by an unterminated
    /// string.
    Eof(Option<Diagnostic>),
}

pub(crate) type PResult<T> = Result<T, ParseError>;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

pub(crate) struct Parser<'src> {
    src: &'src str,
    source_name: &'src str,
    lexer: Lexer<'src>,
    tokens: Vec<Token>,
    pos: usize,
    /// End of the last consumed token.
    prev_end: u32,
    depth: usize,
    /// Set once a body has been cut short by end of input or by the next
    /// declaration. Cleared when the next top-level declaration starts.
    truncated: bool,
    lines: LineIndex,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Parser<'src> {
    fn new(src: &'src str, source_name: &'src str) -> Self {
        let mut lexer = Lexer::new(src);
        let tokens: Vec<Token> = lexer.by_ref().collect();
        Parser {
            src,
            source_name,
            lexer,
            tokens,
            pos: 0,
            prev_end: 0,
            depth: 0,
            truncated: false,
            lines: LineIndex::new(src),
            diagnostics: Vec::new(),
        }
    }

    fn nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn cur(&self) -> &Token {
        self.nth(0)
    }

    fn kind(&self) -> TokenKind {
        self.cur().kind
    }

    fn nth_kind(&self, n: usize) -> TokenKind {
        self.nth(n).kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    fn text(&self) -> &'src str {
        self.cur().span.text(self.src)
    }

    fn nth_is_word(&self, n: usize, word: &str) -> bool {
        let t = self.nth(n);
        matches!(t.kind, TokenKind::Identifier { .. }) && t.span.text(self.src) == word
    }

    fn is_word(&self, word: &str) -> bool {
        self.nth_is_word(0, word)
    }

    fn is_ident(&self) -> bool {
        matches!(self.kind(), TokenKind::Identifier { .. })
    }

    fn advance(&mut self) -> Span {
        let span = self.cur().span;
        if !self.at_eof() {
            self.prev_end = span.end;
            self.pos += 1;
        }
        span
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Span> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(&[what]))
        }
    }

    fn expect_word(&mut self, word: &str) -> PResult<Span> {
        if self.is_word(word) {
            Ok(self.advance())
        } else {
            Err(self.expected(&[&format!("'{word}'")]))
        }
    }

    /// Closing delimiter of a bracketed construct opened at `open`.
    fn expect_close(&mut self, open: Span, close: TokenKind, also: &[&str]) -> PResult<Span> {
        if self.at(close) {
            return Ok(self.advance());
        }
        if self.at_eof() {
            let delimiter = open.text(self.src).chars().next().unwrap_or('{');
            return Err(self.unclosed(open, delimiter));
        }
        let closer = match close {
            TokenKind::RBrace => "'}'",
            TokenKind::RBracket => "']'",
            TokenKind::RParen => "')'",
            _ => "'>'",
        };
        let mut expected = also.to_vec();
        expected.push(closer);
        Err(self.expected(&expected))
    }

    // -- Diagnostics --------------------------------------------

    fn diagnostic(&self, severity: Severity, kind: ErrorKind, span: Span) -> Diagnostic {
        let at = self.lines.line_col(self.src, span.start);
        Diagnostic::new(severity, kind, span, self.source_name, at)
    }

    fn error(&self, kind: ErrorKind, span: Span) -> ParseError {
        ParseError::Syntax(self.diagnostic(Severity::Error, kind, span))
    }

    /// Mismatch at the current token.
    fn expected(&self, expected: &[&str]) -> ParseError {
        let token = self.cur();
        if self.truncated || matches!(token.kind, TokenKind::Error { .. }) {
            return ParseError::Reported;
        }
        let kind = ErrorKind::Expected {
            expected: expected.iter().map(|s| (*s).to_owned()).collect(),
            found: token.describe(self.src),
        };
        self.error(kind, token.span)
    }

    fn warn(&mut self, kind: ErrorKind, span: Span) {
        let d = self.diagnostic(Severity::Warning, kind, span);
        self.diagnostics.push(d);
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            let kind = ErrorKind::NestingTooDeep { limit: MAX_NESTING };
            return Err(self.error(kind, self.cur().span));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // -- Terminals ----------------------------------------------

    fn identifier(&mut self) -> PResult<Identifier> {
        self.identifier_or(&["identifier"])
    }

    fn identifier_or(&mut self, expected: &[&str]) -> PResult<Identifier> {
        match self.kind() {
            TokenKind::Identifier { reserved } => {
                let name = self.text().to_owned();
                let span = self.advance();
                Ok(Identifier {
                    name,
                    reserved,
                    span,
                })
            }
            _ => Err(self.expected(expected)),
        }
    }

    fn number(&mut self) -> PResult<NumberLiteral> {
        if !self.at(TokenKind::Number) {
            return Err(self.expected(&["number"]));
        }
        let text = self.text().to_owned();
        let span = self.advance();
        Ok(NumberLiteral { text, span })
    }

    fn string(&mut self) -> PResult<StringLiteral> {
        let TokenKind::String { style } = self.kind() else {
            return Err(self.expected(&["string"]));
        };
        let value = lexer::string_value(self.src, self.cur()).unwrap_or_default();
        let span = self.advance();
        Ok(StringLiteral { value, style, span })
    }

    // -- Lexer re-scans -----------------------------------------

    /// Re-lex from the current token in URI mode. Tokens after the current
    /// position are rebuilt; earlier ones are untouched.
    fn rescan_as_uri(&mut self) {
        let offset = self.cur().full_start();
        self.tokens.truncate(self.pos);
        self.lexer.reset(offset);
        let uri = self.lexer.next_uri();
        let done = uri.is_eof();
        self.tokens.push(uri);
        if !done {
            self.tokens.extend(self.lexer.by_ref());
        }
    }

    /// Lexer error tokens become diagnostics once, after the final token
    /// list is known.
    fn lex_diagnostics(&self) -> Vec<Diagnostic> {
        self.tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Error { error } => Some(self.diagnostic(
                    Severity::Error,
                    ErrorKind::from(error),
                    t.span,
                )),
                _ => None,
            })
            .collect()
    }

    fn ends_in_unterminated_string(&self) -> bool {
        self.tokens.iter().rev().nth(1).is_some_and(|t| {
            matches!(
                t.kind,
                TokenKind::Error {
                    error: LexError::UnterminatedString { .. }
                }
            )
        })
    }
}

// ──────────────────────────────────────────────
// Public API
// ──────────────────────────────────────────────

/// The tree plus every token it was built from, trivia included.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub root: Plan,
    pub tokens: Vec<Token>,
    source: String,
}

impl SyntaxTree {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Comment texts in source order.
    pub fn comments(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .flat_map(|t| &t.leading_trivia)
            .filter(|t| t.kind == TriviaKind::Comment)
            .map(|t| t.span.text(&self.source))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub tree: SyntaxTree,
    /// Sorted by span start.
    pub diagnostics: Vec<Diagnostic>,
    pub source_name: String,
}

impl ParseResult {
    pub fn plan(&self) -> &Plan {
        &self.tree.root
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// No error-severity diagnostics were produced.
    pub fn successful(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.diagnostics {
            let severity = match d.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            writeln!(
                f,
                "{}:{}:{}: {}: {}",
                d.source_name, d.line, d.column, severity, d
            )?;
        }
        write!(
            f,
            "{}: {} declaration(s), {} error(s), {} warning(s)",
            self.source_name,
            self.tree.root.details.len(),
            self.errors().count(),
            self.warnings().count()
        )
    }
}

/// Parse a TextPlan document. Diagnostics are labelled `<input>`.
pub fn parse(text: &str) -> ParseResult {
    parse_named(text, DEFAULT_SOURCE_NAME)
}

/// Parse a TextPlan document, labelling diagnostics with `source_name`.
pub fn parse_named(text: &str, source_name: &str) -> ParseResult {
    let mut p = Parser::new(text, source_name);
    let root = p.parse_plan();
    let mut diagnostics = p.lex_diagnostics();
    diagnostics.append(&mut p.diagnostics);
    diagnostics.sort_by_key(|d| (d.span.start, d.span.end));

    tracing::debug!(
        source = source_name,
        bytes = text.len(),
        tokens = p.tokens.len(),
        diagnostics = diagnostics.len(),
        "parsed text plan"
    );

    ParseResult {
        tree: SyntaxTree {
            root,
            tokens: p.tokens,
            source: text.to_owned(),
        },
        diagnostics,
        source_name: source_name.to_owned(),
    }
}

/// Parse a single expression, e.g. `a(b, c) AS i32`. The whole input must
/// be consumed.
pub fn parse_expression(text: &str) -> Result<Expression, Vec<Diagnostic>> {
    let mut p = Parser::new(text, DEFAULT_SOURCE_NAME);
    let result = p.expression().and_then(|e| {
        if p.at_eof() {
            Ok(e)
        } else {
            Err(p.expected(&["end of input"]))
        }
    });
    let mut diagnostics = p.lex_diagnostics();
    match result {
        Ok(e) if diagnostics.is_empty() => return Ok(e),
        Ok(_) | Err(ParseError::Reported | ParseError::Eof(None)) => {}
        Err(ParseError::Syntax(d) | ParseError::Eof(Some(d))) => diagnostics.push(d),
    }
    diagnostics.sort_by_key(|d| d.span.start);
    Err(diagnostics)
}

impl Parser<'_> {
    fn start(&self) -> Marker {
        Marker::new(self.cur().span.start)
    }

    fn finish(&self, m: Marker) -> Span {
        m.complete(self.prev_end)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
