use super::{PResult, Parser};
use crate::ast::{ListType, MapType, SimpleType, StructType, Type};
use crate::lexer::TokenKind;

impl Parser<'_> {
    pub(super) fn ty(&mut self) -> PResult<Type> {
        self.nested(Self::ty_inner)
    }

    fn ty_inner(&mut self) -> PResult<Type> {
        if self.at_compound_anchor() {
            if self.text().eq_ignore_ascii_case("LIST") {
                return self.list_type().map(Type::List);
            }
            if self.text().eq_ignore_ascii_case("MAP") {
                return self.map_type().map(Type::Map);
            }
            return self.struct_type().map(Type::Struct);
        }
        self.simple_type().map(Type::Simple)
    }

    /// `LIST`, `MAP` or `STRUCT` in any case. Anchors only count when a `<`
    /// or `?` follows, so a simple type may still be called `list`.
    fn at_compound_anchor(&self) -> bool {
        self.is_ident()
            && matches!(self.nth_kind(1), TokenKind::Lt | TokenKind::Question)
            && ["LIST", "MAP", "STRUCT"]
                .iter()
                .any(|anchor| self.text().eq_ignore_ascii_case(anchor))
    }

    /// `name?<p, ...>`
    fn simple_type(&mut self) -> PResult<SimpleType> {
        let m = self.start();
        let name = self.identifier_or(&["type"])?;
        let nullable = self.eat(TokenKind::Question);
        let mut parameters = Vec::new();
        if self.eat(TokenKind::Lt) {
            parameters.push(self.number()?);
            while self.eat(TokenKind::Comma) {
                parameters.push(self.number()?);
            }
            self.close_angle(&["','"])?;
        }
        Ok(SimpleType {
            name,
            nullable,
            parameters,
            span: self.finish(m),
        })
    }

    fn list_type(&mut self) -> PResult<ListType> {
        let m = self.start();
        self.advance();
        let nullable = self.eat(TokenKind::Question);
        self.expect(TokenKind::Lt, "'<'")?;
        let element = if self.at(TokenKind::Gt) {
            None
        } else {
            Some(Box::new(self.ty()?))
        };
        self.close_angle(&[])?;
        Ok(ListType {
            nullable,
            element,
            span: self.finish(m),
        })
    }

    /// `MAP<key, value>`; both halves are optional.
    fn map_type(&mut self) -> PResult<MapType> {
        let m = self.start();
        self.advance();
        let nullable = self.eat(TokenKind::Question);
        self.expect(TokenKind::Lt, "'<'")?;
        let key = if self.is_ident() && !self.at_compound_anchor() {
            Some(self.simple_type()?)
        } else {
            None
        };
        self.eat(TokenKind::Comma);
        let value = if self.at(TokenKind::Gt) {
            None
        } else {
            Some(Box::new(self.ty()?))
        };
        self.close_angle(&[])?;
        Ok(MapType {
            nullable,
            key,
            value,
            span: self.finish(m),
        })
    }

    fn struct_type(&mut self) -> PResult<StructType> {
        let m = self.start();
        self.advance();
        let nullable = self.eat(TokenKind::Question);
        self.expect(TokenKind::Lt, "'<'")?;
        let mut fields = Vec::new();
        if !self.at(TokenKind::Gt) {
            fields.push(self.ty()?);
            while self.eat(TokenKind::Comma) {
                fields.push(self.ty()?);
            }
        }
        self.close_angle(&["','"])?;
        Ok(StructType {
            nullable,
            fields,
            span: self.finish(m),
        })
    }

    fn close_angle(&mut self, also: &[&str]) -> PResult<()> {
        if self.eat(TokenKind::Gt) {
            return Ok(());
        }
        let mut expected = also.to_vec();
        expected.push("'>'");
        Err(self.expected(&expected))
    }
}
