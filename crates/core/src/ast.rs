//! Syntax tree for TextPlan documents.
//!
//! Every node owns its children and carries the [`Span`] of the text it was
//! built from. A child's span always lies inside its parent's span, and
//! siblings appear in source order without overlapping. Constructs that
//! failed to parse are kept in place as [`ErrorNode`]s through [`Parsed`],
//! so a tree is never silently truncated.

use crate::span::Span;
use crate::strings::StringStyle;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

pub trait HasSpan {
    fn span(&self) -> Span;
}

macro_rules! impl_has_span {
    ($($ty:ty),* $(,)?) => {
        $(impl HasSpan for $ty {
            fn span(&self) -> Span {
                self.span
            }
        })*
    };
}

// ──────────────────────────────────────────────
// Error placeholders
// ──────────────────────────────────────────────

/// Text skipped by error recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNode {
    pub span: Span,
}

/// A list element that either parsed or was replaced by an error node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Parsed<T> {
    Node(T),
    Error(ErrorNode),
}

impl<T> Parsed<T> {
    pub fn node(&self) -> Option<&T> {
        match self {
            Parsed::Node(n) => Some(n),
            Parsed::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Parsed::Error(_))
    }
}

impl<T: HasSpan> HasSpan for Parsed<T> {
    fn span(&self) -> Span {
        match self {
            Parsed::Node(n) => n.span(),
            Parsed::Error(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub name: String,
    /// One of the contextual keywords (`COUNT`, `NAMED`, ...).
    pub reserved: bool,
    pub span: Span,
}

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub details: Vec<Parsed<PlanDetail>>,
    pub span: Span,
}

impl Plan {
    /// Successfully parsed top-level declarations, in source order.
    pub fn declarations(&self) -> impl Iterator<Item = &PlanDetail> {
        self.details.iter().filter_map(Parsed::node)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.declarations().filter_map(|d| match d {
            PlanDetail::Relation(r) => Some(r),
            _ => None,
        })
    }

    pub fn error_count(&self) -> usize {
        self.details.iter().filter(|d| d.is_error()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "declaration", rename_all = "snake_case")]
pub enum PlanDetail {
    Pipelines(Pipelines),
    Relation(Relation),
    Root(RootRelation),
    Schema(SchemaDefinition),
    Source(SourceDefinition),
    ExtensionSpace(ExtensionSpace),
}

impl HasSpan for PlanDetail {
    fn span(&self) -> Span {
        match self {
            PlanDetail::Pipelines(n) => n.span,
            PlanDetail::Relation(n) => n.span,
            PlanDetail::Root(n) => n.span,
            PlanDetail::Schema(n) => n.span,
            PlanDetail::Source(n) => n.span,
            PlanDetail::ExtensionSpace(n) => n.span,
        }
    }
}

// ──────────────────────────────────────────────
// Schemas
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDefinition {
    pub name: Identifier,
    pub items: Vec<Parsed<SchemaItem>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaItem {
    pub name: Identifier,
    pub ty: Type,
    pub named: Option<Identifier>,
    pub span: Span,
}

// ──────────────────────────────────────────────
// Sources
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDefinition {
    pub read: ReadType,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "read_type", rename_all = "snake_case")]
pub enum ReadType {
    LocalFiles(LocalFiles),
    VirtualTable(VirtualTable),
    NamedTable(NamedTable),
    ExtensionTable(ExtensionTable),
}

impl ReadType {
    pub fn name(&self) -> &Identifier {
        match self {
            ReadType::LocalFiles(n) => &n.name,
            ReadType::VirtualTable(n) => &n.name,
            ReadType::NamedTable(n) => &n.name,
            ReadType::ExtensionTable(n) => &n.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalFiles {
    pub name: Identifier,
    pub details: Vec<Parsed<LocalFilesDetail>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum LocalFilesDetail {
    AdvancedExtension { name: Identifier, span: Span },
    Items { files: Vec<Parsed<File>>, span: Span },
}

impl HasSpan for LocalFilesDetail {
    fn span(&self) -> Span {
        match self {
            LocalFilesDetail::AdvancedExtension { span, .. } | LocalFilesDetail::Items { span, .. } => {
                *span
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub details: Vec<Parsed<FileDetail>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum FileDetail {
    PartitionIndex { value: NumberLiteral, span: Span },
    Start { value: NumberLiteral, span: Span },
    Length { value: NumberLiteral, span: Span },
    Orc { span: Span },
    Parquet { span: Span },
    Location(FileLocation),
}

impl HasSpan for FileDetail {
    fn span(&self) -> Span {
        match self {
            FileDetail::PartitionIndex { span, .. }
            | FileDetail::Start { span, .. }
            | FileDetail::Length { span, .. }
            | FileDetail::Orc { span }
            | FileDetail::Parquet { span } => *span,
            FileDetail::Location(l) => l.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileLocationKind {
    UriFile,
    UriPath,
    UriPathGlob,
    UriFolder,
}

impl FileLocationKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "URI_FILE" => Some(FileLocationKind::UriFile),
            "URI_PATH" => Some(FileLocationKind::UriPath),
            "URI_PATH_GLOB" => Some(FileLocationKind::UriPathGlob),
            "URI_FOLDER" => Some(FileLocationKind::UriFolder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileLocation {
    pub kind: FileLocationKind,
    pub path: StringLiteral,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualTable {
    pub name: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedTable {
    pub name: Identifier,
    pub details: Vec<Parsed<NamedTableDetail>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum NamedTableDetail {
    AdvancedExtension { name: Identifier, span: Span },
    Names { names: Vec<StringLiteral>, span: Span },
}

impl HasSpan for NamedTableDetail {
    fn span(&self) -> Span {
        match self {
            NamedTableDetail::AdvancedExtension { span, .. } | NamedTableDetail::Names { span, .. } => {
                *span
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionTable {
    pub name: Identifier,
    pub span: Span,
}

// ──────────────────────────────────────────────
// Relations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    /// Operator kind, e.g. `READ`, `PROJECT`, `AGGREGATE`.
    pub relation_type: Identifier,
    pub name: RelationRef,
    pub details: Vec<Parsed<RelationDetail>>,
    pub span: Span,
}

/// `name` or `name (SCHEMA schema)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationRef {
    pub name: Identifier,
    pub schema: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationDetail {
    pub kind: RelationDetailKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum RelationDetailKind {
    Common,
    BaseSchema {
        schema: Identifier,
    },
    Filter {
        behavior: Option<FilterBehavior>,
        condition: Expression,
    },
    Expression {
        expression: Expression,
        named: Option<Identifier>,
    },
    AdvancedExtension,
    Source {
        name: Identifier,
    },
    Grouping {
        expression: Expression,
    },
    Measure {
        details: Vec<Parsed<MeasureDetail>>,
    },
    Sort(SortField),
    Count {
        count: NumberLiteral,
    },
    Type {
        name: Identifier,
    },
    Emit {
        column: ColumnName,
    },
}

/// Words in front of `FILTER`: `BEST_EFFORT`, `POST-JOIN`, `PRE JOIN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterBehavior {
    pub words: Vec<Identifier>,
    pub hyphenated: bool,
    pub span: Span,
}

impl FilterBehavior {
    pub fn text(&self) -> String {
        let sep = if self.hyphenated { "-" } else { " " };
        self.words
            .iter()
            .map(|w| w.name.as_str())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureDetail {
    pub kind: MeasureDetailKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum MeasureDetailKind {
    Measure {
        expression: Expression,
        output_type: Option<Type>,
        /// Aggregation phase after `@`.
        phase: Option<Identifier>,
        named: Option<Identifier>,
    },
    Filter {
        condition: Expression,
    },
    Invocation {
        name: Identifier,
    },
    Sort(SortField),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortField {
    pub expression: Expression,
    /// Direction after `BY`.
    pub direction: Option<Identifier>,
    pub span: Span,
}

// ──────────────────────────────────────────────
// Root, pipelines, extension spaces
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootRelation {
    pub names: Vec<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipelines {
    pub pipelines: Vec<Parsed<Pipeline>>,
    pub span: Span,
}

/// `a -> b -> c`, relations in the order written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub relations: Vec<RelationRef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionSpace {
    pub uri: Option<Uri>,
    pub functions: Vec<Parsed<Function>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uri {
    pub text: String,
    pub span: Span,
}

/// `FUNCTION add:i32_i32 AS add_ints;`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: Identifier,
    pub signature: Option<Identifier>,
    pub alias: Option<Identifier>,
    pub span: Span,
}

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    FunctionCall(FunctionCall),
    Constant(Constant),
    ColumnReference(ColumnName),
    Cast(Cast),
    Subquery(Subquery),
    InPredicateSubquery(InPredicateSubquery),
    SetPredicateSubquery(SetPredicateSubquery),
    SetComparisonSubquery(SetComparisonSubquery),
}

impl HasSpan for Expression {
    fn span(&self) -> Span {
        match self {
            Expression::FunctionCall(n) => n.span,
            Expression::Constant(n) => n.span,
            Expression::ColumnReference(n) => n.span,
            Expression::Cast(n) => n.span,
            Expression::Subquery(n) => n.span,
            Expression::InPredicateSubquery(n) => n.span,
            Expression::SetPredicateSubquery(n) => n.span,
            Expression::SetComparisonSubquery(n) => n.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub name: Identifier,
    pub arguments: Vec<Expression>,
    /// Declared result type after `->`.
    pub output_type: Option<Type>,
    pub span: Span,
}

/// `(relation.)column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnName {
    pub relation: Option<Identifier>,
    pub column: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cast {
    pub expression: Box<Expression>,
    pub target: Type,
    pub span: Span,
}

/// `SUBQUERY relation`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subquery {
    pub relation: RelationRef,
    pub span: Span,
}

/// `(a, b) IN SUBQUERY relation`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InPredicateSubquery {
    pub needles: Vec<Expression>,
    pub relation: RelationRef,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetPredicate {
    Unique,
    Exists,
}

/// `UNIQUE IN SUBQUERY relation`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetPredicateSubquery {
    pub predicate: SetPredicate,
    pub relation: RelationRef,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ComparisonOp {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "EQ" => Some(ComparisonOp::Eq),
            "NE" => Some(ComparisonOp::Ne),
            "LT" => Some(ComparisonOp::Lt),
            "GT" => Some(ComparisonOp::Gt),
            "LE" => Some(ComparisonOp::Le),
            "GE" => Some(ComparisonOp::Ge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    All,
    Any,
}

/// `left EQ ANY SUBQUERY relation`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetComparisonSubquery {
    pub left: Box<Expression>,
    pub op: ComparisonOp,
    pub quantifier: Quantifier,
    pub relation: RelationRef,
    pub span: Span,
}

// ──────────────────────────────────────────────
// Literals
// ──────────────────────────────────────────────

/// A literal with an optional `_type` suffix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    pub value: Literal,
    pub type_suffix: Option<Type>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "literal", rename_all = "snake_case")]
pub enum Literal {
    Number(NumberLiteral),
    String(StringLiteral),
    Map(MapLiteral),
    Struct(StructLiteral),
    Null { span: Span },
    True { span: Span },
    False { span: Span },
}

impl HasSpan for Literal {
    fn span(&self) -> Span {
        match self {
            Literal::Number(n) => n.span,
            Literal::String(n) => n.span,
            Literal::Map(n) => n.span,
            Literal::Struct(n) => n.span,
            Literal::Null { span } | Literal::True { span } | Literal::False { span } => *span,
        }
    }
}

/// A number as written. Conversions are left to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberLiteral {
    pub text: String,
    pub span: Span,
}

impl NumberLiteral {
    pub fn as_i64(&self) -> Option<i64> {
        self.text.parse().ok()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.text.parse().ok()
    }

    /// Exact decimal value; handles scientific notation.
    pub fn as_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&self.text)
            .or_else(|_| Decimal::from_scientific(&self.text))
            .ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringLiteral {
    /// Decoded value, escapes resolved.
    pub value: String,
    pub style: StringStyle,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLiteral {
    pub entries: Vec<MapEntry>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEntry {
    pub key: Constant,
    pub value: Constant,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructLiteral {
    pub fields: Vec<Constant>,
    pub span: Span,
}

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Type {
    Simple(SimpleType),
    List(ListType),
    Map(MapType),
    Struct(StructType),
}

impl Type {
    pub fn is_nullable(&self) -> bool {
        match self {
            Type::Simple(t) => t.nullable,
            Type::List(t) => t.nullable,
            Type::Map(t) => t.nullable,
            Type::Struct(t) => t.nullable,
        }
    }
}

impl HasSpan for Type {
    fn span(&self) -> Span {
        match self {
            Type::Simple(t) => t.span,
            Type::List(t) => t.span,
            Type::Map(t) => t.span,
            Type::Struct(t) => t.span,
        }
    }
}

/// `name?<p1, p2>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleType {
    pub name: Identifier,
    pub nullable: bool,
    pub parameters: Vec<NumberLiteral>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListType {
    pub nullable: bool,
    pub element: Option<Box<Type>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapType {
    pub nullable: bool,
    pub key: Option<SimpleType>,
    pub value: Option<Box<Type>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructType {
    pub nullable: bool,
    pub fields: Vec<Type>,
    pub span: Span,
}

impl_has_span!(
    ErrorNode,
    Identifier,
    Plan,
    SchemaDefinition,
    SchemaItem,
    SourceDefinition,
    LocalFiles,
    File,
    FileLocation,
    VirtualTable,
    NamedTable,
    ExtensionTable,
    Relation,
    RelationRef,
    RelationDetail,
    FilterBehavior,
    MeasureDetail,
    SortField,
    RootRelation,
    Pipelines,
    Pipeline,
    ExtensionSpace,
    Uri,
    Function,
    FunctionCall,
    ColumnName,
    Cast,
    Subquery,
    InPredicateSubquery,
    SetPredicateSubquery,
    SetComparisonSubquery,
    Constant,
    NumberLiteral,
    StringLiteral,
    MapLiteral,
    MapEntry,
    StructLiteral,
    SimpleType,
    ListType,
    MapType,
    StructType,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn number(text: &str) -> NumberLiteral {
        NumberLiteral {
            text: text.to_owned(),
            span: Span::default(),
        }
    }

    #[test]
    fn number_conversions() {
        assert_eq!(number("-42").as_i64(), Some(-42));
        assert_eq!(number("2.5").as_i64(), None);
        assert_eq!(number("2.5").as_f64(), Some(2.5));
        assert_eq!(number("+7").as_i64(), Some(7));
        assert_eq!(number("1.25").as_decimal(), Decimal::from_str("1.25").ok());
        assert_eq!(number("1.5e2").as_decimal(), Decimal::from_str("150").ok());
    }

    #[test]
    fn filter_behavior_text_keeps_separator() {
        let word = |name: &str| Identifier {
            name: name.to_owned(),
            reserved: false,
            span: Span::default(),
        };
        let hyphen = FilterBehavior {
            words: vec![word("POST"), word("JOIN")],
            hyphenated: true,
            span: Span::default(),
        };
        assert_eq!(hyphen.text(), "POST-JOIN");
    }

    #[test]
    fn pipelines_with_error_nodes_are_eq() {
        fn assert_eq_impl<T: Eq>(a: &T, b: &T) -> bool {
            a == b
        }
        let pipelines = Pipelines {
            pipelines: vec![Parsed::Error(ErrorNode {
                span: Span::new(12, 15),
            })],
            span: Span::new(0, 17),
        };
        assert!(assert_eq_impl(&pipelines, &pipelines.clone()));
    }

    #[test]
    fn read_type_name() {
        let read = ReadType::VirtualTable(VirtualTable {
            name: Identifier {
                name: "vt".to_owned(),
                reserved: false,
                span: Span::default(),
            },
            span: Span::default(),
        });
        assert_eq!(read.name().name, "vt");
    }
}
