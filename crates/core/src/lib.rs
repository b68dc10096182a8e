#![allow(clippy::result_large_err)]
//! textplan-core: parser for the TextPlan query-plan format.
//!
//! Turns TextPlan text into a typed syntax tree, recovering from errors so
//! that a (possibly partial) tree and a list of diagnostics are always
//! returned.
//!
//! # Public API
//!
//! - [`parse()`] / [`parse_named()`] -- parse a whole document
//! - [`parse_expression()`] -- parse a single expression
//! - [`ParseResult`] -- the [`SyntaxTree`] plus sorted [`Diagnostic`]s
//! - [`lexer::lex()`] -- the token stream on its own
//! - AST types in [`ast`], rooted at [`Plan`]
//!
//! Parsing is synchronous and shares no state between calls; results are
//! `Send + Sync` and can be produced on any number of threads at once.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod strings;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{HasSpan, Parsed, Plan, PlanDetail};
pub use error::{Category, Diagnostic, ErrorKind, RecoveryAction, Severity};
pub use lexer::{Token, TokenKind};
pub use parser::{parse, parse_expression, parse_named, ParseResult, SyntaxTree, MAX_NESTING};
pub use span::{LineCol, LineIndex, Span};
