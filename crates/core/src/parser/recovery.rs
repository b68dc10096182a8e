//! Error recovery.
//!
//! * Inside a `{ ... }` body a failed statement is skipped from the token
//!   where it failed up to the next `;` (consumed) or the `}` closing the
//!   body. Only braces opened after the failure hide a `;`; a `}` may still
//!   close a brace the statement opened before it failed.
//! * A body that runs into end of input, or into a declaration header at
//!   the start of a line, is closed there. Its items are kept and the open
//!   brace is reported once, however deeply the body was nested.
//! * At the top level the broken declaration ends at the next declaration
//!   keyword, or after the `}` that balances its first `{`.

use super::{PResult, ParseError, Parser};
use crate::ast::Parsed;
use crate::error::{ErrorKind, RecoveryAction, Severity};
use crate::lexer::TokenKind;
use crate::span::Span;

impl Parser<'_> {
    /// Parses `item*` up to the `}` closing the body opened at `open`.
    /// Failed items become error nodes.
    pub(super) fn body<T>(
        &mut self,
        open: Span,
        mut item: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<Parsed<T>>> {
        let mut items = Vec::new();
        loop {
            if self.truncated || self.eat(TokenKind::RBrace) {
                return Ok(items);
            }
            if self.at_eof() {
                self.truncate(open, RecoveryAction::SkippedToEnd);
                return Ok(items);
            }
            if self.at_declaration_line() {
                self.truncate(open, RecoveryAction::SkippedToDeclaration);
                return Ok(items);
            }
            let start = self.pos;
            let m = self.start();
            match item(self) {
                Ok(node) => items.push(Parsed::Node(node)),
                Err(err @ ParseError::Eof(_)) => {
                    self.record(err, RecoveryAction::SkippedToEnd, "body");
                    self.truncated = true;
                    items.push(Parsed::Error(m.error_node(self.prev_end)));
                }
                Err(err) => {
                    let action = self.skip_statement(start);
                    self.record(err, action, "body");
                    items.push(Parsed::Error(m.error_node(self.prev_end)));
                }
            }
        }
    }

    pub(super) fn unclosed(&self, open: Span, delimiter: char) -> ParseError {
        if self.truncated || self.ends_in_unterminated_string() {
            return ParseError::Eof(None);
        }
        let kind = ErrorKind::Unclosed { delimiter };
        ParseError::Eof(Some(self.diagnostic(Severity::Error, kind, open)))
    }

    /// Closes the body opened at `open` where it stands. Only the innermost
    /// cut-short body is reported.
    fn truncate(&mut self, open: Span, action: RecoveryAction) {
        let err = self.unclosed(open, '{');
        self.record(err, action, "body");
        self.truncated = true;
    }

    pub(super) fn record(&mut self, err: ParseError, action: RecoveryAction, context: &str) {
        tracing::trace!(
            context,
            resumed_at = self.cur().span.start,
            ?action,
            "recovered from parse error"
        );
        match err {
            ParseError::Syntax(d) | ParseError::Eof(Some(d)) => {
                self.diagnostics.push(d.with_recovery(action));
            }
            ParseError::Reported | ParseError::Eof(None) => {}
        }
    }

    /// Skips the rest of the body statement that started at token `start`
    /// and failed at the current token.
    fn skip_statement(&mut self, start: usize) -> RecoveryAction {
        let failed_at = self.pos.max(start);
        // The failed statement may have run into the next declaration.
        for pos in start + 1..failed_at {
            self.pos = pos;
            if self.at_declaration_line() {
                self.prev_end = self.tokens[pos - 1].span.end;
                return RecoveryAction::SkippedToDeclaration;
            }
        }
        self.pos = failed_at;
        // Braces the statement had opened when it failed.
        let mut opened = self.tokens[start..failed_at]
            .iter()
            .fold(0usize, |open, token| match token.kind {
                TokenKind::LBrace => open + 1,
                TokenKind::RBrace => open.saturating_sub(1),
                _ => open,
            });
        let mut depth = 0usize;
        loop {
            if self.at_declaration_line() {
                return RecoveryAction::SkippedToDeclaration;
            }
            match self.kind() {
                TokenKind::Eof => return RecoveryAction::SkippedToEnd,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return RecoveryAction::SkippedToSemicolon;
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth > 0 => depth -= 1,
                TokenKind::RBrace if opened > 0 => opened -= 1,
                TokenKind::RBrace => return RecoveryAction::SkippedToCloseBrace,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips the top-level declaration starting at token `start`. Always
    /// consumes at least that first token.
    pub(super) fn skip_declaration(&mut self, start: usize) -> RecoveryAction {
        self.pos = start;
        let mut depth = 0usize;
        let mut first = true;
        loop {
            if self.at_eof() {
                return RecoveryAction::SkippedToEnd;
            }
            if !first && depth == 0 && self.at_declaration() {
                return RecoveryAction::SkippedToDeclaration;
            }
            first = false;
            match self.kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return RecoveryAction::SkippedToCloseBrace;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }
}
