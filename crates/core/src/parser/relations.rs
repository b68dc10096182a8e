//! Relation blocks and their details.

use super::{PResult, Parser};
use crate::ast::{
    ColumnName, FilterBehavior, MeasureDetail, MeasureDetailKind, Relation, RelationDetail,
    RelationDetailKind, RelationRef, SortField,
};
use crate::lexer::TokenKind;

impl Parser<'_> {
    /// `TYPE RELATION name (SCHEMA s) { detail* }`
    pub(super) fn relation(&mut self) -> PResult<Relation> {
        let m = self.start();
        let relation_type = self.identifier()?;
        self.expect_word("RELATION")?;
        let name = self.relation_ref()?;
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let details = self.body(open, Self::relation_detail)?;
        Ok(Relation {
            relation_type,
            name,
            details,
            span: self.finish(m),
        })
    }

    pub(super) fn relation_ref(&mut self) -> PResult<RelationRef> {
        let m = self.start();
        let name = self.identifier_or(&["relation name"])?;
        let schema = if self.at(TokenKind::LParen) {
            let open = self.advance();
            self.expect_word("SCHEMA")?;
            let schema = self.identifier()?;
            self.expect_close(open, TokenKind::RParen, &[])?;
            Some(schema)
        } else {
            None
        };
        Ok(RelationRef {
            name,
            schema,
            span: self.finish(m),
        })
    }

    pub(super) fn column_name(&mut self) -> PResult<ColumnName> {
        let m = self.start();
        let first = self.identifier_or(&["column name"])?;
        let (relation, column) = if self.eat(TokenKind::Dot) {
            (Some(first), self.identifier_or(&["column name"])?)
        } else {
            (None, first)
        };
        Ok(ColumnName {
            relation,
            column,
            span: self.finish(m),
        })
    }

    fn semicolon(&mut self) -> PResult<()> {
        self.expect(TokenKind::Semicolon, "';'").map(drop)
    }

    fn relation_detail(&mut self) -> PResult<RelationDetail> {
        let m = self.start();
        let keyword = if self.is_ident() { self.text() } else { "" };
        let kind = match keyword {
            "COMMON" => {
                self.advance();
                self.semicolon()?;
                RelationDetailKind::Common
            }
            "BASE_SCHEMA" => {
                self.advance();
                let schema = self.identifier()?;
                self.semicolon()?;
                RelationDetailKind::BaseSchema { schema }
            }
            "FILTER" => {
                self.advance();
                let condition = self.expression()?;
                self.semicolon()?;
                RelationDetailKind::Filter {
                    behavior: None,
                    condition,
                }
            }
            "EXPRESSION" => {
                self.advance();
                let expression = self.expression()?;
                let named = if self.eat_word("NAMED") {
                    Some(self.identifier()?)
                } else if !self.at(TokenKind::Semicolon) {
                    return Err(self.expected(&["'NAMED'", "';'"]));
                } else {
                    None
                };
                self.semicolon()?;
                RelationDetailKind::Expression { expression, named }
            }
            "ADVANCED_EXTENSION" => {
                self.advance();
                self.semicolon()?;
                RelationDetailKind::AdvancedExtension
            }
            "SOURCE" => {
                self.advance();
                let name = self.identifier()?;
                self.semicolon()?;
                RelationDetailKind::Source { name }
            }
            "GROUPING" => {
                self.advance();
                let expression = self.expression()?;
                self.semicolon()?;
                RelationDetailKind::Grouping { expression }
            }
            "MEASURE" => {
                self.advance();
                let open = self.expect(TokenKind::LBrace, "'{'")?;
                let details = self.body(open, Self::measure_detail)?;
                RelationDetailKind::Measure { details }
            }
            "SORT" => RelationDetailKind::Sort(self.sort_field()?),
            "COUNT" => {
                self.advance();
                let count = self.number()?;
                self.semicolon()?;
                RelationDetailKind::Count { count }
            }
            "TYPE" => {
                self.advance();
                let name = self.identifier()?;
                self.semicolon()?;
                RelationDetailKind::Type { name }
            }
            "EMIT" => {
                self.advance();
                let column = self.column_name()?;
                self.semicolon()?;
                RelationDetailKind::Emit { column }
            }
            _ => match self.filter_behavior()? {
                Some(behavior) => {
                    self.expect_word("FILTER")?;
                    let condition = self.expression()?;
                    self.semicolon()?;
                    RelationDetailKind::Filter {
                        behavior: Some(behavior),
                        condition,
                    }
                }
                None => return Err(self.expected(&["relation detail", "'}'"])),
            },
        };
        Ok(RelationDetail {
            kind,
            span: self.finish(m),
        })
    }

    /// One or two words in front of `FILTER`, optionally joined by `-`.
    fn filter_behavior(&mut self) -> PResult<Option<FilterBehavior>> {
        if !self.is_ident() {
            return Ok(None);
        }
        let (len, hyphenated) = if self.nth_is_word(1, "FILTER") {
            (1, false)
        } else if self.nth_kind(1) == TokenKind::Minus && self.nth_is_word(3, "FILTER") {
            (3, true)
        } else if matches!(self.nth_kind(1), TokenKind::Identifier { .. })
            && self.nth_is_word(2, "FILTER")
        {
            (2, false)
        } else {
            return Ok(None);
        };
        let m = self.start();
        let mut words = vec![self.identifier()?];
        if len > 1 {
            if hyphenated {
                self.advance();
            }
            words.push(self.identifier()?);
        }
        Ok(Some(FilterBehavior {
            words,
            hyphenated,
            span: self.finish(m),
        }))
    }

    fn measure_detail(&mut self) -> PResult<MeasureDetail> {
        let m = self.start();
        let keyword = if self.is_ident() { self.text() } else { "" };
        let kind = match keyword {
            "MEASURE" => {
                self.advance();
                let expression = self.expression()?;
                let output_type = if self.eat(TokenKind::Arrow) {
                    Some(self.ty()?)
                } else {
                    None
                };
                let phase = if self.eat(TokenKind::At) {
                    Some(self.identifier()?)
                } else {
                    None
                };
                let named = if self.eat_word("NAMED") {
                    Some(self.identifier()?)
                } else {
                    None
                };
                if !self.at(TokenKind::Semicolon) {
                    let mut expected = Vec::new();
                    if output_type.is_none() && phase.is_none() && named.is_none() {
                        expected.push("'->'");
                    }
                    if phase.is_none() && named.is_none() {
                        expected.push("'@'");
                    }
                    if named.is_none() {
                        expected.push("'NAMED'");
                    }
                    expected.push("';'");
                    return Err(self.expected(&expected));
                }
                self.advance();
                MeasureDetailKind::Measure {
                    expression,
                    output_type,
                    phase,
                    named,
                }
            }
            "FILTER" => {
                self.advance();
                let condition = self.expression()?;
                self.semicolon()?;
                MeasureDetailKind::Filter { condition }
            }
            "INVOCATION" => {
                self.advance();
                let name = self.identifier()?;
                self.semicolon()?;
                MeasureDetailKind::Invocation { name }
            }
            "SORT" => MeasureDetailKind::Sort(self.sort_field()?),
            _ => return Err(self.expected(&["measure detail", "'}'"])),
        };
        Ok(MeasureDetail {
            kind,
            span: self.finish(m),
        })
    }

    /// `SORT expression (BY direction)? ;`
    fn sort_field(&mut self) -> PResult<SortField> {
        let m = self.start();
        self.expect_word("SORT")?;
        let expression = self.expression()?;
        let direction = if self.eat_word("BY") {
            Some(self.identifier()?)
        } else if !self.at(TokenKind::Semicolon) {
            return Err(self.expected(&["'BY'", "';'"]));
        } else {
            None
        };
        self.semicolon()?;
        Ok(SortField {
            expression,
            direction,
            span: self.finish(m),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{
        Expression, Literal, MeasureDetailKind, Parsed, PlanDetail, Relation, RelationDetailKind,
        Type,
    };
    use crate::parser::parse;

    fn relation(src: &str) -> Relation {
        let result = parse(src);
        assert!(result.successful(), "{result}");
        match result.plan().details[0].node() {
            Some(PlanDetail::Relation(r)) => r.clone(),
            other => panic!("expected relation, got {other:?}"),
        }
    }

    fn kinds(r: &Relation) -> Vec<&RelationDetailKind> {
        r.details.iter().filter_map(Parsed::node).map(|d| &d.kind).collect()
    }

    #[test]
    fn header_with_schema() {
        let r = relation("PROJECT RELATION p (SCHEMA s) { COMMON; }");
        assert_eq!(r.relation_type.name, "PROJECT");
        assert_eq!(r.name.name.name, "p");
        assert_eq!(r.name.schema.as_ref().map(|s| s.name.as_str()), Some("s"));
    }

    #[test]
    fn simple_details() {
        let r = relation(
            "READ RELATION r { BASE_SCHEMA s; ADVANCED_EXTENSION; SOURCE src; \
             COUNT 10; TYPE INNER; EMIT t.col; }",
        );
        let k = kinds(&r);
        assert_eq!(k.len(), 6);
        assert!(matches!(k[0], RelationDetailKind::BaseSchema { schema } if schema.name == "s"));
        assert!(matches!(k[1], RelationDetailKind::AdvancedExtension));
        assert!(matches!(k[3], RelationDetailKind::Count { count } if count.as_i64() == Some(10)));
        let RelationDetailKind::Emit { column } = k[5] else {
            panic!("expected emit");
        };
        assert_eq!(column.relation.as_ref().map(|r| r.name.as_str()), Some("t"));
        assert_eq!(column.column.name, "col");
    }

    #[test]
    fn filter_behaviors() {
        let r = relation(
            "FILTER RELATION f { FILTER a; BEST_EFFORT FILTER b; POST-JOIN FILTER c; \
             PRE JOIN FILTER d; }",
        );
        let behaviors: Vec<_> = kinds(&r)
            .into_iter()
            .map(|k| match k {
                RelationDetailKind::Filter { behavior, .. } => behavior.as_ref().map(|b| b.text()),
                other => panic!("expected filter, got {other:?}"),
            })
            .collect();
        assert_eq!(
            behaviors,
            vec![
                None,
                Some("BEST_EFFORT".to_owned()),
                Some("POST-JOIN".to_owned()),
                Some("PRE JOIN".to_owned())
            ]
        );
    }

    #[test]
    fn expression_with_name() {
        let r = relation("PROJECT RELATION p { EXPRESSION add(a, 1) NAMED total; EXPRESSION b; }");
        let k = kinds(&r);
        assert!(
            matches!(k[0], RelationDetailKind::Expression { named: Some(n), .. } if n.name == "total")
        );
        assert!(matches!(k[1], RelationDetailKind::Expression { named: None, .. }));
    }

    #[test]
    fn measures_and_sorts() {
        let r = relation(
            "AGGREGATE RELATION agg { GROUPING region; MEASURE { \
             MEASURE sum(amount) -> i64 @ AGGREGATION_PHASE_INITIAL_TO_RESULT NAMED total; \
             FILTER flag; INVOCATION AGGREGATION_INVOCATION_ALL; SORT amount BY DESC; } \
             SORT region; }",
        );
        let k = kinds(&r);
        assert_eq!(k.len(), 3);
        let RelationDetailKind::Measure { details } = k[1] else {
            panic!("expected measure block");
        };
        let measures: Vec<_> = details.iter().filter_map(Parsed::node).collect();
        assert_eq!(measures.len(), 4);
        let MeasureDetailKind::Measure {
            expression,
            phase,
            named,
            ..
        } = &measures[0].kind
        else {
            panic!("expected measure");
        };
        // the call takes the declared result type
        let Expression::FunctionCall(call) = expression else {
            panic!("expected call");
        };
        assert!(matches!(call.output_type, Some(Type::Simple(_))));
        assert!(phase.is_some());
        assert_eq!(named.as_ref().map(|n| n.name.as_str()), Some("total"));
        assert!(matches!(&measures[3].kind, MeasureDetailKind::Sort(s) if s.direction.is_some()));
        assert!(matches!(k[2], RelationDetailKind::Sort(s) if s.direction.is_none()));
    }

    #[test]
    fn reserved_words_as_columns() {
        let r = relation("PROJECT RELATION p { EXPRESSION COUNT; EMIT SORT; FILTER NAMED; }");
        let k = kinds(&r);
        let RelationDetailKind::Expression {
            expression: Expression::ColumnReference(c),
            ..
        } = k[0]
        else {
            panic!("expected column reference");
        };
        assert_eq!(c.column.name, "COUNT");
        assert!(c.column.reserved);
        assert!(matches!(k[1], RelationDetailKind::Emit { column } if column.column.name == "SORT"));
    }

    #[test]
    fn literal_filter() {
        let r = relation("FILTER RELATION f { FILTER TRUE; }");
        assert!(matches!(
            kinds(&r)[0],
            RelationDetailKind::Filter {
                condition: Expression::Constant(c),
                ..
            } if matches!(c.value, Literal::True { .. })
        ));
    }

    #[test]
    fn unknown_detail_is_reported() {
        let result = parse("READ RELATION r { BOGUS thing; EMIT a; }");
        assert_eq!(result.errors().count(), 1);
        assert_eq!(
            result.diagnostics[0].expected(),
            ["relation detail", "'}'"]
        );
    }
}
