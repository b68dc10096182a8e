//! Expressions and literals.
//!
//! An expression is a primary followed by any number of suffixes
//! (`AS type`, `EQ ANY SUBQUERY r`), folded left to right so the result is
//! built without left recursion. The primary is chosen on one token of
//! lookahead: `(` after an identifier means a call, `NULL`/`TRUE`/`FALSE`
//! mean a constant, anything else identifier-shaped is a column.

use super::{PResult, Parser};
use crate::ast::{
    Cast, ComparisonOp, Constant, Expression, FunctionCall, InPredicateSubquery, Literal,
    MapEntry, MapLiteral, Quantifier, SetComparisonSubquery, SetPredicate, SetPredicateSubquery,
    StructLiteral, Subquery, Type,
};
use crate::error::ErrorKind;
use crate::lexer::TokenKind;

impl Parser<'_> {
    pub(super) fn expression(&mut self) -> PResult<Expression> {
        self.nested(Self::expression_suffixes)
    }

    fn expression_suffixes(&mut self) -> PResult<Expression> {
        let m = self.start();
        let mut expr = self.primary()?;
        loop {
            if self.eat_word("AS") {
                let target = self.ty()?;
                expr = Expression::Cast(Cast {
                    expression: Box::new(expr),
                    target,
                    span: self.finish(m),
                });
            } else if let Some(op) = self.set_comparison_op() {
                self.advance();
                let quantifier = if self.eat_word("ALL") {
                    Quantifier::All
                } else {
                    self.advance();
                    Quantifier::Any
                };
                self.expect_word("SUBQUERY")?;
                let relation = self.relation_ref()?;
                expr = Expression::SetComparisonSubquery(SetComparisonSubquery {
                    left: Box::new(expr),
                    op,
                    quantifier,
                    relation,
                    span: self.finish(m),
                });
            } else {
                return Ok(expr);
            }
        }
    }

    /// A comparison keyword directly followed by `ALL` or `ANY`.
    fn set_comparison_op(&self) -> Option<ComparisonOp> {
        if !self.is_ident() || !(self.nth_is_word(1, "ALL") || self.nth_is_word(1, "ANY")) {
            return None;
        }
        ComparisonOp::from_keyword(self.text())
    }

    fn primary(&mut self) -> PResult<Expression> {
        match self.kind() {
            TokenKind::LParen => self.in_predicate().map(Expression::InPredicateSubquery),
            TokenKind::Number | TokenKind::String { .. } | TokenKind::LBrace => {
                self.constant().map(Expression::Constant)
            }
            TokenKind::Identifier { .. } => {
                if self.nth_kind(1) == TokenKind::LParen {
                    return self.function_call().map(Expression::FunctionCall);
                }
                match self.text() {
                    "NULL" | "TRUE" | "FALSE" => self.constant().map(Expression::Constant),
                    "SUBQUERY" if matches!(self.nth_kind(1), TokenKind::Identifier { .. }) => {
                        let m = self.start();
                        self.advance();
                        let relation = self.relation_ref()?;
                        Ok(Expression::Subquery(Subquery {
                            relation,
                            span: self.finish(m),
                        }))
                    }
                    "UNIQUE" | "EXISTS" if self.nth_is_word(1, "IN") => {
                        self.set_predicate().map(Expression::SetPredicateSubquery)
                    }
                    _ => self.column_name().map(Expression::ColumnReference),
                }
            }
            _ => Err(self.expected(&["expression"])),
        }
    }

    /// `name(arg, ...) -> type`; a trailing comma is allowed.
    fn function_call(&mut self) -> PResult<FunctionCall> {
        let m = self.start();
        let name = self.identifier()?;
        let open = self.expect(TokenKind::LParen, "'('")?;
        let mut arguments = Vec::new();
        while !self.at(TokenKind::RParen) {
            arguments.push(self.expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_close(open, TokenKind::RParen, &["','"])?;
        let output_type = if self.eat(TokenKind::Arrow) {
            Some(self.ty()?)
        } else {
            None
        };
        Ok(FunctionCall {
            name,
            arguments,
            output_type,
            span: self.finish(m),
        })
    }

    /// `(a, b) IN SUBQUERY relation`
    fn in_predicate(&mut self) -> PResult<InPredicateSubquery> {
        let m = self.start();
        let open = self.expect(TokenKind::LParen, "'('")?;
        let mut needles = vec![self.expression()?];
        while self.eat(TokenKind::Comma) {
            needles.push(self.expression()?);
        }
        self.expect_close(open, TokenKind::RParen, &["','"])?;
        self.expect_word("IN")?;
        self.expect_word("SUBQUERY")?;
        let relation = self.relation_ref()?;
        Ok(InPredicateSubquery {
            needles,
            relation,
            span: self.finish(m),
        })
    }

    fn set_predicate(&mut self) -> PResult<SetPredicateSubquery> {
        let m = self.start();
        let predicate = if self.eat_word("UNIQUE") {
            SetPredicate::Unique
        } else {
            self.expect_word("EXISTS")?;
            SetPredicate::Exists
        };
        self.expect_word("IN")?;
        self.expect_word("SUBQUERY")?;
        let relation = self.relation_ref()?;
        Ok(SetPredicateSubquery {
            predicate,
            relation,
            span: self.finish(m),
        })
    }

    // -- Literals -----------------------------------------------

    pub(super) fn constant(&mut self) -> PResult<Constant> {
        self.nested(Self::constant_with_suffix)
    }

    fn constant_with_suffix(&mut self) -> PResult<Constant> {
        let m = self.start();
        let word = if self.is_ident() { self.text() } else { "" };
        let value = match (self.kind(), word) {
            (TokenKind::Number, _) => Literal::Number(self.number()?),
            (TokenKind::String { .. }, _) => Literal::String(self.string()?),
            (TokenKind::LBrace, _) => self.brace_literal()?,
            (_, "NULL") => Literal::Null {
                span: self.advance(),
            },
            (_, "TRUE") => Literal::True {
                span: self.advance(),
            },
            (_, "FALSE") => Literal::False {
                span: self.advance(),
            },
            _ => return Err(self.expected(&["constant"])),
        };
        let type_suffix = if self.eat(TokenKind::Underscore) {
            Some(self.ty()?)
        } else {
            None
        };
        if let (Literal::Struct(s), Some(Type::Map(_))) = (&value, &type_suffix) {
            if s.fields.is_empty() {
                self.warn(ErrorKind::EmptyBracesWithMapType, s.span);
            }
        }
        Ok(Constant {
            value,
            type_suffix,
            span: self.finish(m),
        })
    }

    /// `{k: v, ...}` or `{v, ...}`. Decided by a `:` after the first
    /// element; `{}` is an empty struct.
    fn brace_literal(&mut self) -> PResult<Literal> {
        let m = self.start();
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        if self.eat(TokenKind::RBrace) {
            return Ok(Literal::Struct(StructLiteral {
                fields: Vec::new(),
                span: self.finish(m),
            }));
        }
        let first = self.constant()?;
        if !self.eat(TokenKind::Colon) {
            let mut fields = vec![first];
            let mut also: &[&str] = &["','", "':'"];
            while self.eat(TokenKind::Comma) {
                fields.push(self.constant()?);
                also = &["','"];
            }
            self.expect_close(open, TokenKind::RBrace, also)?;
            return Ok(Literal::Struct(StructLiteral {
                fields,
                span: self.finish(m),
            }));
        }
        let value = self.constant()?;
        let mut entries = vec![MapEntry {
            span: first.span.merge(value.span),
            key: first,
            value,
        }];
        while self.eat(TokenKind::Comma) {
            let key = self.constant()?;
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.constant()?;
            entries.push(MapEntry {
                span: key.span.merge(value.span),
                key,
                value,
            });
        }
        self.expect_close(open, TokenKind::RBrace, &["','"])?;
        Ok(Literal::Map(MapLiteral {
            entries,
            span: self.finish(m),
        }))
    }
}
