//! Top-level declarations: schemas, sources, root, pipelines and extension
//! spaces. Relations live in `relations.rs`.

use super::{PResult, ParseError, Parser};
use crate::ast::{
    ExtensionSpace, ExtensionTable, File, FileDetail, FileLocation, FileLocationKind, Function,
    Identifier, LocalFiles, LocalFilesDetail, NamedTable, NamedTableDetail, Parsed, Pipeline,
    Pipelines, Plan, PlanDetail, ReadType, RootRelation, SchemaDefinition, SchemaItem,
    SourceDefinition, Uri, VirtualTable,
};
use crate::error::{ErrorKind, RecoveryAction};
use crate::lexer::TokenKind;
use crate::span::Span;

const DECLARATION_KEYWORDS: &[&str] = &["schema", "source", "ROOT", "PIPELINES", "EXTENSION_SPACE"];

impl Parser<'_> {
    pub(super) fn parse_plan(&mut self) -> Plan {
        let mut details = Vec::new();
        loop {
            if self.at_eof() {
                break;
            }
            if self.at(TokenKind::Semicolon) && self.nth_kind(1) == TokenKind::Eof {
                self.advance();
                break;
            }
            self.truncated = false;
            let start = self.pos;
            let m = self.start();
            match self.plan_detail() {
                Ok(detail) => details.push(Parsed::Node(detail)),
                Err(err @ ParseError::Eof(_)) => {
                    while !self.at_eof() {
                        self.advance();
                    }
                    self.record(err, RecoveryAction::SkippedToEnd, "plan");
                    details.push(Parsed::Error(m.error_node(self.prev_end)));
                    break;
                }
                Err(err) => {
                    let action = self.skip_declaration(start);
                    self.record(err, action, "plan");
                    details.push(Parsed::Error(m.error_node(self.prev_end)));
                }
            }
        }
        Plan {
            details,
            span: Span::from(0..self.src.len()),
        }
    }

    pub(super) fn at_declaration(&self) -> bool {
        DECLARATION_KEYWORDS.iter().any(|w| self.is_word(w))
            || (self.is_ident() && self.nth_is_word(1, "RELATION"))
    }

    /// A declaration header that begins a line. Ends a body whose `}` is
    /// missing.
    pub(super) fn at_declaration_line(&self) -> bool {
        let token = self.cur();
        let full_start = token.full_start() as usize;
        let line_start =
            full_start == 0 || self.src[full_start..token.span.start as usize].contains('\n');
        if !line_start || !self.is_ident() {
            return false;
        }
        let ident = |n| matches!(self.nth_kind(n), TokenKind::Identifier { .. });
        match self.text() {
            "schema" => ident(1) && self.nth_kind(2) == TokenKind::LBrace,
            "source" => ident(1) && ident(2) && self.nth_kind(3) == TokenKind::LBrace,
            "ROOT" | "PIPELINES" => self.nth_kind(1) == TokenKind::LBrace,
            "EXTENSION_SPACE" => {
                self.nth_kind(1) == TokenKind::LBrace || self.nth_kind(2) == TokenKind::Colon
            }
            _ => {
                self.nth_is_word(1, "RELATION")
                    && matches!(self.nth_kind(3), TokenKind::LBrace | TokenKind::LParen)
            }
        }
    }

    fn plan_detail(&mut self) -> PResult<PlanDetail> {
        if self.is_ident() && self.nth_is_word(1, "RELATION") {
            return Ok(PlanDetail::Relation(self.relation()?));
        }
        match self.text() {
            "schema" if self.is_ident() => Ok(PlanDetail::Schema(self.schema_definition()?)),
            "source" if self.is_ident() => Ok(PlanDetail::Source(self.source_definition()?)),
            "ROOT" if self.is_ident() => Ok(PlanDetail::Root(self.root_relation()?)),
            "PIPELINES" if self.is_ident() => Ok(PlanDetail::Pipelines(self.pipelines()?)),
            "EXTENSION_SPACE" if self.is_ident() => {
                Ok(PlanDetail::ExtensionSpace(self.extension_space()?))
            }
            _ => Err(self.expected(&[
                "'schema'",
                "'source'",
                "relation",
                "'ROOT'",
                "'PIPELINES'",
                "'EXTENSION_SPACE'",
            ])),
        }
    }

    // -- Schemas ------------------------------------------------

    fn schema_definition(&mut self) -> PResult<SchemaDefinition> {
        let m = self.start();
        self.expect_word("schema")?;
        let name = self.identifier()?;
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let items = self.body(open, Self::schema_item)?;
        Ok(SchemaDefinition {
            name,
            items,
            span: self.finish(m),
        })
    }

    fn schema_item(&mut self) -> PResult<SchemaItem> {
        let m = self.start();
        let name = self.identifier()?;
        let ty = self.ty()?;
        let named = if self.eat_word("NAMED") {
            Some(self.identifier()?)
        } else {
            None
        };
        if named.is_none() && !self.at(TokenKind::Semicolon) {
            return Err(self.expected(&["'NAMED'", "';'"]));
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(SchemaItem {
            name,
            ty,
            named,
            span: self.finish(m),
        })
    }

    // -- Sources ------------------------------------------------

    fn source_definition(&mut self) -> PResult<SourceDefinition> {
        let m = self.start();
        self.expect_word("source")?;
        let read = match self.text() {
            "LOCAL_FILES" if self.is_ident() => ReadType::LocalFiles(self.local_files()?),
            "VIRTUAL_TABLE" if self.is_ident() => {
                let (name, span) = self.empty_table("VIRTUAL_TABLE")?;
                ReadType::VirtualTable(VirtualTable { name, span })
            }
            "NAMED_TABLE" if self.is_ident() => ReadType::NamedTable(self.named_table()?),
            "EXTENSION_TABLE" if self.is_ident() => {
                let (name, span) = self.empty_table("EXTENSION_TABLE")?;
                ReadType::ExtensionTable(ExtensionTable { name, span })
            }
            _ => {
                return Err(self.expected(&[
                    "'LOCAL_FILES'",
                    "'VIRTUAL_TABLE'",
                    "'NAMED_TABLE'",
                    "'EXTENSION_TABLE'",
                ]))
            }
        };
        Ok(SourceDefinition {
            read,
            span: self.finish(m),
        })
    }

    /// `KEYWORD name { }`
    fn empty_table(&mut self, keyword: &str) -> PResult<(Identifier, Span)> {
        let m = self.start();
        self.expect_word(keyword)?;
        let name = self.identifier()?;
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        self.expect_close(open, TokenKind::RBrace, &[])?;
        Ok((name, self.finish(m)))
    }

    fn local_files(&mut self) -> PResult<LocalFiles> {
        let m = self.start();
        self.expect_word("LOCAL_FILES")?;
        let name = self.identifier()?;
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let details = self.body(open, Self::local_files_detail)?;
        Ok(LocalFiles {
            name,
            details,
            span: self.finish(m),
        })
    }

    fn local_files_detail(&mut self) -> PResult<LocalFilesDetail> {
        let m = self.start();
        if self.eat_word("ADVANCED_EXTENSION") {
            let name = self.identifier()?;
            return Ok(LocalFilesDetail::AdvancedExtension {
                name,
                span: self.finish(m),
            });
        }
        if !self.eat_word("ITEMS") {
            return Err(self.expected(&["'ADVANCED_EXTENSION'", "'ITEMS'", "'}'"]));
        }
        self.expect(TokenKind::Eq, "'='")?;
        let open = self.expect(TokenKind::LBracket, "'['")?;
        let mut files = Vec::new();
        while self.at(TokenKind::LBrace) {
            files.push(Parsed::Node(self.file()?));
            self.eat(TokenKind::Comma);
        }
        self.expect_close(open, TokenKind::RBracket, &["'{'"])?;
        Ok(LocalFilesDetail::Items {
            files,
            span: self.finish(m),
        })
    }

    fn file(&mut self) -> PResult<File> {
        let m = self.start();
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let details = self.body(open, Self::file_detail)?;
        Ok(File {
            details,
            span: self.finish(m),
        })
    }

    fn file_detail(&mut self) -> PResult<FileDetail> {
        let m = self.start();
        let keyword = self.text();
        let location = FileLocationKind::from_keyword(keyword).filter(|_| self.is_ident());
        match keyword {
            "PARTITION_INDEX" | "START" | "LENGTH" if self.is_ident() => {
                self.advance();
                self.expect(TokenKind::Colon, "':'")?;
                let value = self.number()?;
                let span = self.finish(m);
                Ok(match keyword {
                    "PARTITION_INDEX" => FileDetail::PartitionIndex { value, span },
                    "START" => FileDetail::Start { value, span },
                    _ => FileDetail::Length { value, span },
                })
            }
            "ORC" | "PARQUET" if self.is_ident() => {
                self.advance();
                self.expect(TokenKind::Colon, "':'")?;
                let open = self.expect(TokenKind::LBrace, "'{'")?;
                self.expect_close(open, TokenKind::RBrace, &[])?;
                let span = self.finish(m);
                Ok(if keyword == "ORC" {
                    FileDetail::Orc { span }
                } else {
                    FileDetail::Parquet { span }
                })
            }
            _ => match location {
                Some(kind) => {
                    self.advance();
                    self.expect(TokenKind::Colon, "':'")?;
                    let path = self.string()?;
                    Ok(FileDetail::Location(FileLocation {
                        kind,
                        path,
                        span: self.finish(m),
                    }))
                }
                None => Err(self.expected(&["file detail", "'}'"])),
            },
        }
    }

    fn named_table(&mut self) -> PResult<NamedTable> {
        let m = self.start();
        self.expect_word("NAMED_TABLE")?;
        let name = self.identifier()?;
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let details = self.body(open, Self::named_table_detail)?;
        Ok(NamedTable {
            name,
            details,
            span: self.finish(m),
        })
    }

    fn named_table_detail(&mut self) -> PResult<NamedTableDetail> {
        let m = self.start();
        if self.eat_word("ADVANCED_EXTENSION") {
            let name = self.identifier()?;
            return Ok(NamedTableDetail::AdvancedExtension {
                name,
                span: self.finish(m),
            });
        }
        if !self.eat_word("NAMES") {
            return Err(self.expected(&["'ADVANCED_EXTENSION'", "'NAMES'", "'}'"]));
        }
        self.expect(TokenKind::Eq, "'='")?;
        let open = self.expect(TokenKind::LBracket, "'['")?;
        let mut names = Vec::new();
        while matches!(self.kind(), TokenKind::String { .. }) {
            names.push(self.string()?);
            self.eat(TokenKind::Comma);
        }
        self.expect_close(open, TokenKind::RBracket, &["string"])?;
        Ok(NamedTableDetail::Names {
            names,
            span: self.finish(m),
        })
    }

    // -- Root and pipelines -------------------------------------

    fn root_relation(&mut self) -> PResult<RootRelation> {
        let m = self.start();
        self.expect_word("ROOT")?;
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        self.expect_word("NAMES")?;
        self.expect(TokenKind::Eq, "'='")?;
        let list = self.expect(TokenKind::LBracket, "'['")?;
        let mut names = vec![self.identifier()?];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::RBracket) {
                break;
            }
            names.push(self.identifier()?);
        }
        self.expect_close(list, TokenKind::RBracket, &["','"])?;
        self.expect_close(open, TokenKind::RBrace, &[])?;
        Ok(RootRelation {
            names,
            span: self.finish(m),
        })
    }

    fn pipelines(&mut self) -> PResult<Pipelines> {
        let m = self.start();
        self.expect_word("PIPELINES")?;
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let pipelines = self.body(open, Self::pipeline)?;
        Ok(Pipelines {
            pipelines,
            span: self.finish(m),
        })
    }

    /// `a -> b -> c ;` folded left to right.
    fn pipeline(&mut self) -> PResult<Pipeline> {
        let m = self.start();
        let mut relations = vec![self.relation_ref()?];
        while self.eat(TokenKind::Arrow) {
            relations.push(self.relation_ref()?);
        }
        if !self.eat(TokenKind::Semicolon) {
            return Err(self.expected(&["'->'", "';'"]));
        }
        Ok(Pipeline {
            relations,
            span: self.finish(m),
        })
    }

    // -- Extension spaces ---------------------------------------

    fn extension_space(&mut self) -> PResult<ExtensionSpace> {
        let m = self.start();
        self.expect_word("EXTENSION_SPACE")?;
        if !self.at(TokenKind::LBrace) && !self.at_eof() {
            self.rescan_as_uri();
        }
        let uri = if self.at(TokenKind::Uri) {
            let text = self.text().to_owned();
            let span = self.advance();
            if !is_valid_uri(&text) {
                let kind = ErrorKind::InvalidUri { uri: text.clone() };
                return Err(self.error(kind, span));
            }
            Some(Uri { text, span })
        } else {
            None
        };
        if !self.at(TokenKind::LBrace) {
            let expected: &[&str] = if uri.is_some() { &["'{'"] } else { &["URI", "'{'"] };
            return Err(self.expected(expected));
        }
        let open = self.advance();
        let functions = self.body(open, Self::function)?;
        Ok(ExtensionSpace {
            uri,
            functions,
            span: self.finish(m),
        })
    }

    fn function(&mut self) -> PResult<Function> {
        let m = self.start();
        self.expect_word("FUNCTION")?;
        let name = self.identifier()?;
        let signature = if self.eat(TokenKind::Colon) && self.is_ident() && !self.is_word("AS") {
            Some(self.identifier()?)
        } else {
            None
        };
        let alias = if self.eat_word("AS") {
            Some(self.identifier()?)
        } else {
            None
        };
        if !self.eat(TokenKind::Semicolon) {
            let expected: &[&str] = if alias.is_some() {
                &["';'"]
            } else {
                &["'AS'", "';'"]
            };
            return Err(self.expected(expected));
        }
        Ok(Function {
            name,
            signature,
            alias,
            span: self.finish(m),
        })
    }
}

/// `scheme:[//host/]path` or `[/]path`, where path segments use
/// `[A-Za-z0-9-._~]`.
fn is_valid_uri(text: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "-._~/:".contains(c);
    if text.is_empty() || !text.chars().all(allowed) {
        return false;
    }
    let path = match text.split_once(':') {
        Some((scheme, rest)) => {
            if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
                return false;
            }
            match rest.strip_prefix("//") {
                Some(authority) => match authority.split_once('/') {
                    Some((host, path)) if !host.contains(':') => path,
                    _ => return false,
                },
                None => rest,
            }
        }
        None => text.strip_prefix('/').unwrap_or(text),
    };
    !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && !segment.contains(':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn only(src: &str) -> PlanDetail {
        let result = parse(src);
        assert!(result.successful(), "{result}");
        assert_eq!(result.plan().details.len(), 1);
        result.plan().details[0]
            .node()
            .cloned()
            .expect("declaration")
    }

    #[test]
    fn uri_shapes() {
        assert!(is_valid_uri(
            "https://github.com/substrait-io/substrait/blob/main/extensions/functions.yaml"
        ));
        assert!(is_valid_uri("/extensions/functions_arithmetic.yaml"));
        assert!(is_valid_uri("functions.yaml"));
        assert!(is_valid_uri("file:///tmp/functions.yaml"));
        assert!(is_valid_uri("urn:functions"));
        assert!(!is_valid_uri("http://host"));
        assert!(!is_valid_uri("a//b"));
        assert!(!is_valid_uri("1http:x"));
        assert!(!is_valid_uri("bad#fragment"));
    }

    #[test]
    fn schema_items_with_and_without_names() {
        let PlanDetail::Schema(s) = only("schema s { a i32; b string? NAMED bee; }") else {
            panic!("expected schema");
        };
        assert_eq!(s.name.name, "s");
        let items: Vec<_> = s.items.iter().filter_map(Parsed::node).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].named.is_none());
        assert_eq!(items[1].named.as_ref().map(|n| n.name.as_str()), Some("bee"));
        assert!(items[1].ty.is_nullable());
    }

    #[test]
    fn named_table_names() {
        let src = r#"source NAMED_TABLE t { NAMES = ["db", `tbl`,] }"#;
        let PlanDetail::Source(s) = only(src) else {
            panic!("expected source");
        };
        let ReadType::NamedTable(t) = s.read else {
            panic!("expected named table");
        };
        let Some(NamedTableDetail::Names { names, .. }) = t.details[0].node() else {
            panic!("expected names");
        };
        let values: Vec<_> = names.iter().map(|n| n.value.as_str()).collect();
        assert_eq!(values, vec!["db", "tbl"]);
    }

    #[test]
    fn empty_tables() {
        assert!(matches!(
            only("source VIRTUAL_TABLE v { }"),
            PlanDetail::Source(SourceDefinition {
                read: ReadType::VirtualTable(_),
                ..
            })
        ));
        assert!(matches!(
            only("source EXTENSION_TABLE e {}"),
            PlanDetail::Source(SourceDefinition {
                read: ReadType::ExtensionTable(_),
                ..
            })
        ));
    }

    #[test]
    fn file_details() {
        let src = "source LOCAL_FILES f { ADVANCED_EXTENSION ext ITEMS = [ \
                   { URI_PATH_GLOB: \"/data/*.orc\" ORC: {} START: 0 LENGTH: 1024 PARTITION_INDEX: 3 } ] }";
        let PlanDetail::Source(s) = only(src) else {
            panic!("expected source");
        };
        let ReadType::LocalFiles(lf) = s.read else {
            panic!("expected local files");
        };
        assert_eq!(lf.details.len(), 2);
        let Some(LocalFilesDetail::Items { files, .. }) = lf.details[1].node() else {
            panic!("expected items");
        };
        let file = files[0].node().expect("file");
        assert_eq!(file.details.len(), 5);
        assert!(matches!(
            file.details[0].node(),
            Some(FileDetail::Location(FileLocation {
                kind: FileLocationKind::UriPathGlob,
                ..
            }))
        ));
        assert!(matches!(
            file.details[4].node(),
            Some(FileDetail::PartitionIndex { value, .. }) if value.as_i64() == Some(3)
        ));
    }

    #[test]
    fn root_names_allow_trailing_comma_and_reserved_words() {
        let PlanDetail::Root(r) = only("ROOT { NAMES = [COUNT, total,] }") else {
            panic!("expected root");
        };
        let names: Vec<_> = r.names.iter().map(|n| (n.name.as_str(), n.reserved)).collect();
        assert_eq!(names, vec![("COUNT", true), ("total", false)]);
    }

    #[test]
    fn pipelines_chain_relation_refs() {
        let PlanDetail::Pipelines(p) = only("PIPELINES { read -> filter (SCHEMA s) -> root; solo; }")
        else {
            panic!("expected pipelines");
        };
        let chains: Vec<Vec<&str>> = p
            .pipelines
            .iter()
            .filter_map(Parsed::node)
            .map(|p| p.relations.iter().map(|r| r.name.name.as_str()).collect())
            .collect();
        assert_eq!(chains, vec![vec!["read", "filter", "root"], vec!["solo"]]);
        let first = p.pipelines[0].node().expect("pipeline");
        assert_eq!(
            first.relations[1].schema.as_ref().map(|s| s.name.as_str()),
            Some("s")
        );
    }

    #[test]
    fn extension_space_with_uri_and_functions() {
        let src = "EXTENSION_SPACE https://example.com/ext/functions.yaml {\n\
                   FUNCTION add:i32_i32 AS add_ints;\n\
                   FUNCTION count: ;\n\
                   FUNCTION sum;\n}";
        let PlanDetail::ExtensionSpace(e) = only(src) else {
            panic!("expected extension space");
        };
        assert_eq!(
            e.uri.as_ref().map(|u| u.text.as_str()),
            Some("https://example.com/ext/functions.yaml")
        );
        let fns: Vec<_> = e.functions.iter().filter_map(Parsed::node).collect();
        assert_eq!(fns.len(), 3);
        assert_eq!(fns[0].signature.as_ref().map(|s| s.name.as_str()), Some("i32_i32"));
        assert_eq!(fns[0].alias.as_ref().map(|s| s.name.as_str()), Some("add_ints"));
        assert!(fns[1].signature.is_none());
        assert_eq!(fns[2].span.text(src), "FUNCTION sum;");
    }

    #[test]
    fn empty_signature_before_alias() {
        let PlanDetail::ExtensionSpace(e) = only("EXTENSION_SPACE { FUNCTION f: AS g; }") else {
            panic!("expected extension space");
        };
        let f = e.functions[0].node().expect("function");
        assert!(f.signature.is_none());
        assert_eq!(f.alias.as_ref().map(|a| a.name.as_str()), Some("g"));
    }

    #[test]
    fn extension_space_without_uri() {
        let PlanDetail::ExtensionSpace(e) = only("EXTENSION_SPACE { FUNCTION f; }") else {
            panic!("expected extension space");
        };
        assert!(e.uri.is_none());
    }

    #[test]
    fn malformed_uri_is_a_syntax_error() {
        let result = parse("EXTENSION_SPACE http://x/a#b { }");
        let errors: Vec<_> = result.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, ErrorKind::InvalidUri { .. }));
    }
}
