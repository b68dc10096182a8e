//! Tokenizer for TextPlan documents.
//!
//! The lexer is lazy: tokens are produced on demand and scanning can be
//! restarted at any character boundary with [`Lexer::reset`]. The parser
//! relies on this to re-scan the text after `EXTENSION_SPACE` in URI mode,
//! where `//` is part of the token rather than the start of a comment.
//!
//! Whitespace and `//` comments never reach the grammar. They are kept as
//! [`Trivia`] on the token that follows them, and whatever trails the last
//! token is attached to the end-of-input token.

use crate::error::LexError;
use crate::span::Span;
use crate::strings::StringStyle;
use serde::Serialize;

/// Words that are identifiers everywhere but double as keywords in some
/// grammar positions.
pub const RESERVED_WORDS: &[&str] = &[
    "FILTER", "ROOT", "SOURCE", "SCHEMA", "NULL", "SORT", "MEASURE", "GROUPING", "COUNT", "TYPE",
    "EMIT", "NAMED", "ALL", "ANY",
];

/// Literal words that end an identifier at the first `_`, leaving the rest
/// for a type suffix (`NULL_i32`).
const SUFFIXABLE_LITERALS: &[&str] = &["NULL", "TRUE", "FALSE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Identifier-shaped word. `reserved` marks the contextual keywords.
    Identifier { reserved: bool },
    Number,
    String { style: StringStyle },
    /// Only produced in URI mode.
    Uri,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Lt,
    Gt,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Eq,
    Question,
    At,
    Underscore,
    Minus,
    Arrow,
    /// Unrecognized input. Covers the offending character, or the rest of
    /// the input for an unterminated string.
    Error { error: LexError },
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriviaKind {
    Whitespace,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub leading_trivia: Vec<Trivia>,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        self.span.text(src)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Start of this token including its leading trivia.
    pub fn full_start(&self) -> u32 {
        self.leading_trivia
            .first()
            .map_or(self.span.start, |t| t.span.start)
    }

    /// Human-readable description used in "found ..." messages.
    pub fn describe(&self, src: &str) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_owned(),
            TokenKind::Identifier { .. } => format!("`{}`", self.text(src)),
            TokenKind::Number => format!("number `{}`", self.text(src)),
            TokenKind::String { .. } => "string literal".to_owned(),
            TokenKind::Uri => format!("URI `{}`", self.text(src)),
            TokenKind::Error { .. } => "invalid input".to_owned(),
            _ => format!("'{}'", self.text(src)),
        }
    }
}

pub struct Lexer<'src> {
    src: &'src str,
    pos: usize,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Lexer {
            src,
            pos: 0,
            finished: false,
        }
    }

    /// Restart scanning at `offset`. Offsets inside a character snap forward
    /// to the next boundary.
    pub fn reset(&mut self, offset: u32) {
        let mut pos = (offset as usize).min(self.src.len());
        while !self.src.is_char_boundary(pos) {
            pos += 1;
        }
        self.pos = pos;
        self.finished = false;
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    fn rest(&self) -> &'src str {
        &self.src[self.pos..]
    }

    fn span_from(&self, start: usize) -> Span {
        Span::from(start..self.pos)
    }

    fn scan_trivia(&mut self) -> Vec<Trivia> {
        let mut trivia = Vec::new();
        loop {
            let start = self.pos;
            match self.peek_byte(0) {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    while matches!(self.peek_byte(0), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                        self.pos += 1;
                    }
                    trivia.push(Trivia {
                        kind: TriviaKind::Whitespace,
                        span: self.span_from(start),
                    });
                }
                Some(b'/') if self.peek_byte(1) == Some(b'/') => {
                    let len = self.rest().find(['\r', '\n']).unwrap_or(self.rest().len());
                    self.pos += len;
                    trivia.push(Trivia {
                        kind: TriviaKind::Comment,
                        span: self.span_from(start),
                    });
                }
                _ => return trivia,
            }
        }
    }

    /// Next token. Returns `Eof` (repeatedly) once the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        let leading_trivia = self.scan_trivia();
        let start = self.pos;
        let kind = self.scan_kind();
        Token {
            kind,
            span: self.span_from(start),
            leading_trivia,
        }
    }

    /// Next token in URI mode: a maximal run of characters other than
    /// whitespace, braces and `;`. Falls back to an ordinary token when no
    /// such run starts here.
    pub fn next_uri(&mut self) -> Token {
        let checkpoint = self.pos;
        let leading_trivia = self.scan_trivia();
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| c.is_whitespace() || matches!(c, '{' | '}' | ';'))
            .unwrap_or(self.rest().len());
        if len == 0 {
            self.pos = checkpoint;
            return self.next_token();
        }
        self.pos += len;
        Token {
            kind: TokenKind::Uri,
            span: self.span_from(start),
            leading_trivia,
        }
    }

    fn scan_kind(&mut self) -> TokenKind {
        let Some(c) = self.rest().chars().next() else {
            return TokenKind::Eof;
        };
        let single = |lexer: &mut Self, kind| {
            lexer.pos += 1;
            kind
        };
        match c {
            '{' => single(self, TokenKind::LBrace),
            '}' => single(self, TokenKind::RBrace),
            '[' => single(self, TokenKind::LBracket),
            ']' => single(self, TokenKind::RBracket),
            '(' => single(self, TokenKind::LParen),
            ')' => single(self, TokenKind::RParen),
            '<' => single(self, TokenKind::Lt),
            '>' => single(self, TokenKind::Gt),
            ',' => single(self, TokenKind::Comma),
            ';' => single(self, TokenKind::Semicolon),
            ':' => single(self, TokenKind::Colon),
            '.' => single(self, TokenKind::Dot),
            '=' => single(self, TokenKind::Eq),
            '?' => single(self, TokenKind::Question),
            '@' => single(self, TokenKind::At),
            '_' => single(self, TokenKind::Underscore),
            '-' | '+' if self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()) => {
                self.scan_number()
            }
            '-' if self.peek_byte(1) == Some(b'>') => {
                self.pos += 2;
                TokenKind::Arrow
            }
            '-' => single(self, TokenKind::Minus),
            '0'..='9' => self.scan_number(),
            '"' => self.scan_quoted(),
            '`' => self.scan_raw(),
            c if c.is_ascii_alphabetic() => self.scan_word(),
            other => {
                self.pos += other.len_utf8();
                TokenKind::Error {
                    error: LexError::InvalidCharacter { character: other },
                }
            }
        }
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    // [-+]?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?
    fn scan_number(&mut self) -> TokenKind {
        if matches!(self.peek_byte(0), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        self.eat_digits();
        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit())
        {
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_byte(1), Some(b'-' | b'+')));
            if self.peek_byte(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1 + sign;
                self.eat_digits();
            }
        }
        TokenKind::Number
    }

    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;
        let is_word_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'$';
        while self.peek_byte(0).is_some_and(is_word_byte) {
            self.pos += 1;
        }
        while self.peek_byte(0) == Some(b'_')
            && self.peek_byte(1).is_some_and(is_word_byte)
            && !SUFFIXABLE_LITERALS.contains(&&self.src[start..self.pos])
        {
            self.pos += 1;
            while self.peek_byte(0).is_some_and(is_word_byte) {
                self.pos += 1;
            }
        }
        let word = &self.src[start..self.pos];
        TokenKind::Identifier {
            reserved: RESERVED_WORDS.contains(&word),
        }
    }

    fn scan_quoted(&mut self) -> TokenKind {
        let bytes = self.src.as_bytes();
        let mut i = self.pos + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'"' => {
                    self.pos = i + 1;
                    return TokenKind::String {
                        style: StringStyle::Quoted,
                    };
                }
                b'\\' => i += 2,
                _ => i += 1,
            }
        }
        self.unterminated(StringStyle::Quoted)
    }

    fn scan_raw(&mut self) -> TokenKind {
        let style = if self.rest().starts_with("```") {
            StringStyle::TripleBacktick
        } else if self.rest().starts_with("``") {
            StringStyle::DoubleBacktick
        } else {
            StringStyle::Backtick
        };
        let delim = style.delimiter();
        let body_start = self.pos + delim.len();
        match self.src[body_start..].find(delim) {
            Some(len) => {
                self.pos = body_start + len + delim.len();
                TokenKind::String { style }
            }
            None => self.unterminated(style),
        }
    }

    fn unterminated(&mut self, style: StringStyle) -> TokenKind {
        self.pos = self.src.len();
        TokenKind::Error {
            error: LexError::UnterminatedString { style },
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token, ending with a single `Eof`.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.is_eof() {
            self.finished = true;
        }
        Some(token)
    }
}

/// Tokenize a whole document. The last token is always `Eof`.
pub fn lex(src: &str) -> Vec<Token> {
    Lexer::new(src).collect()
}

/// Decoded value of a string token.
pub fn string_value(src: &str, token: &Token) -> Option<String> {
    let TokenKind::String { style } = token.kind else {
        return None;
    };
    let text = token.text(src);
    let delim = style.delimiter().len();
    let body = text.get(delim..text.len() - delim)?;
    Some(match style {
        StringStyle::Quoted => crate::strings::unescape(body),
        _ => body.to_owned(),
    })
}
