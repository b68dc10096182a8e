use crate::span::{LineCol, Span};
use crate::strings::StringStyle;
use miette::LabeledSpan;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Which stage detected the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Unrecognized character or unterminated string.
    Lexical,
    /// Expected-construct mismatch.
    Syntax,
    /// Unbalanced delimiters detected at end of input or at the next
    /// declaration.
    Structural,
}

/// A problem found by the lexer. Carried on error tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum LexError {
    InvalidCharacter { character: char },
    UnterminatedString { style: StringStyle },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("invalid character {character:?}")]
    InvalidCharacter { character: char },

    #[error("unterminated {style} string literal")]
    UnterminatedString { style: StringStyle },

    #[error("expected {}, found {found}", one_of(.expected))]
    Expected { expected: Vec<String>, found: String },

    #[error("malformed URI `{uri}`")]
    InvalidUri { uri: String },

    #[error("nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("unclosed '{delimiter}'")]
    Unclosed { delimiter: char },

    #[error("empty braces are a struct literal; a map type suffix does not make them a map")]
    EmptyBracesWithMapType,
}

impl ErrorKind {
    pub fn category(&self) -> Category {
        match self {
            ErrorKind::InvalidCharacter { .. } | ErrorKind::UnterminatedString { .. } => {
                Category::Lexical
            }
            ErrorKind::Unclosed { .. } => Category::Structural,
            ErrorKind::Expected { .. }
            | ErrorKind::InvalidUri { .. }
            | ErrorKind::NestingTooDeep { .. }
            | ErrorKind::EmptyBracesWithMapType => Category::Syntax,
        }
    }

    /// Stable machine-readable code, e.g. `textplan::syntax::expected`.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidCharacter { .. } => "textplan::lexical::invalid_character",
            ErrorKind::UnterminatedString { .. } => "textplan::lexical::unterminated_string",
            ErrorKind::Expected { .. } => "textplan::syntax::expected",
            ErrorKind::InvalidUri { .. } => "textplan::syntax::invalid_uri",
            ErrorKind::NestingTooDeep { .. } => "textplan::syntax::nesting_too_deep",
            ErrorKind::Unclosed { .. } => "textplan::structural::unclosed",
            ErrorKind::EmptyBracesWithMapType => "textplan::syntax::empty_braces",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ErrorKind::InvalidCharacter { .. } => "not valid here",
            ErrorKind::UnterminatedString { .. } => "string starts here",
            ErrorKind::Expected { .. } => "unexpected",
            ErrorKind::InvalidUri { .. } => "URI",
            ErrorKind::NestingTooDeep { .. } => "too deep",
            ErrorKind::Unclosed { .. } => "opened here",
            ErrorKind::EmptyBracesWithMapType => "parsed as a struct literal",
        }
    }
}

impl From<LexError> for ErrorKind {
    fn from(e: LexError) -> Self {
        match e {
            LexError::InvalidCharacter { character } => ErrorKind::InvalidCharacter { character },
            LexError::UnterminatedString { style } => ErrorKind::UnterminatedString { style },
        }
    }
}

fn one_of(items: &[String]) -> String {
    match items {
        [] => "something else".to_owned(),
        [one] => one.clone(),
        [a, b] => format!("{} or {}", a, b),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

/// What the parser did to get going again after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    SkippedToSemicolon,
    SkippedToCloseBrace,
    SkippedToDeclaration,
    SkippedToEnd,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryAction::SkippedToSemicolon => "parsing resumed after the next ';'",
            RecoveryAction::SkippedToCloseBrace => "parsing resumed at the closing '}'",
            RecoveryAction::SkippedToDeclaration => "parsing resumed at the next declaration",
            RecoveryAction::SkippedToEnd => "the rest of the input was skipped",
        };
        f.write_str(s)
    }
}

/// A located problem in a TextPlan document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{kind}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub span: Span,
    pub source_name: String,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery: Option<RecoveryAction>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        kind: ErrorKind,
        span: Span,
        source_name: &str,
        at: LineCol,
    ) -> Self {
        Diagnostic {
            severity,
            kind,
            span,
            source_name: source_name.to_owned(),
            line: at.line,
            column: at.column,
            recovery: None,
        }
    }

    #[must_use]
    pub fn with_recovery(mut self, action: RecoveryAction) -> Self {
        self.recovery = Some(action);
        self
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Constructs that would have been accepted where a syntax error occurred.
    pub fn expected(&self) -> &[String] {
        match &self.kind {
            ErrorKind::Expected { expected, .. } => expected,
            _ => &[],
        }
    }

    /// Flat JSON shape used by tooling; every key is always present.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "category":    self.category(),
            "code":        self.kind.code(),
            "column":      self.column,
            "expected":    self.expected(),
            "line":        self.line,
            "message":     self.message(),
            "recovery":    self.recovery,
            "severity":    self.severity,
            "source_name": self.source_name,
            "span":        self.span,
        })
    }
}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.recovery
            .map(|action| Box::new(action) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some(self.kind.label().to_owned()), self.span);
        Some(Box::new(std::iter::once(label)))
    }
}
