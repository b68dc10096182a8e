//! Error recovery: every problem yields one diagnostic, and parsing picks
//! up again at the next statement or declaration.

use textplan_core::ast::{Parsed, RelationDetailKind};
use textplan_core::{parse, parse_named, Category, ErrorKind, PlanDetail, RecoveryAction};

#[test]
fn bad_body_statements_are_skipped_to_semicolon() {
    let result = parse("READ RELATION r { EMIT ; COUNT x; SOURCE s; }");
    assert_eq!(result.errors().count(), 2, "{}", result);
    for d in result.errors() {
        assert_eq!(d.recovery, Some(RecoveryAction::SkippedToSemicolon));
    }

    let relation = result.plan().relations().next().expect("relation");
    let shape: Vec<bool> = relation.details.iter().map(Parsed::is_error).collect();
    assert_eq!(shape, [true, true, false]);
    assert!(matches!(
        relation.details[2].node().map(|d| &d.kind),
        Some(RelationDetailKind::Source { name }) if name.name == "s"
    ));
}

#[test]
fn bad_last_statement_stops_at_closing_brace() {
    let result = parse("schema s { a i32; b }\nROOT { NAMES = [a] }");
    assert_eq!(result.errors().count(), 1, "{}", result);
    let d = result.errors().next().unwrap();
    assert_eq!(d.recovery, Some(RecoveryAction::SkippedToCloseBrace));
    assert_eq!(result.plan().declarations().count(), 2);
}

#[test]
fn garbage_between_declarations() {
    let result = parse("schema s { a i32; }\nbogus stuff here\nROOT { NAMES = [a] }");
    assert_eq!(result.errors().count(), 1, "{}", result);
    let d = result.errors().next().unwrap();
    assert_eq!(d.recovery, Some(RecoveryAction::SkippedToDeclaration));
    assert_eq!((d.line, d.column), (2, 1));

    let details = &result.plan().details;
    assert_eq!(details.len(), 3);
    assert!(details[1].is_error());
    assert!(matches!(details[2].node(), Some(PlanDetail::Root(_))));
}

#[test]
fn broken_declaration_skips_its_braces() {
    let result = parse("ROOT { NAMES = [a b] }\nschema s { a i32; }");
    assert_eq!(result.errors().count(), 1, "{}", result);
    let d = result.errors().next().unwrap();
    assert_eq!(d.expected(), ["','", "']'"]);
    assert_eq!(d.recovery, Some(RecoveryAction::SkippedToCloseBrace));
    assert!(matches!(
        result.plan().details[1].node(),
        Some(PlanDetail::Schema(s)) if s.items.len() == 1
    ));
}

#[test]
fn unclosed_body_reports_the_open_brace() {
    let result = parse_named("schema s { a i32; b i64;\n", "plan.textplan");
    assert_eq!(result.diagnostics().len(), 1, "{}", result);
    let d = &result.diagnostics()[0];
    assert_eq!(d.category(), Category::Structural);
    assert_eq!(d.kind, ErrorKind::Unclosed { delimiter: '{' });
    assert_eq!((d.line, d.column), (1, 10));
    assert_eq!(d.source_name, "plan.textplan");
    assert_eq!(d.recovery, Some(RecoveryAction::SkippedToEnd));

    let details = &result.plan().details;
    assert_eq!(details.len(), 1);
    let Some(PlanDetail::Schema(schema)) = details[0].node() else {
        panic!("expected the schema to survive");
    };
    let names: Vec<_> = schema
        .items
        .iter()
        .filter_map(Parsed::node)
        .map(|i| i.name.name.as_str())
        .collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn unclosed_nested_body_is_one_diagnostic() {
    let result = parse("AGGREGATE RELATION r {\n  MEASURE {\n    MEASURE sum(a);\n");
    assert_eq!(result.diagnostics().len(), 1, "{}", result);
    let d = &result.diagnostics()[0];
    assert_eq!(d.kind, ErrorKind::Unclosed { delimiter: '{' });
    assert_eq!((d.line, d.column), (2, 11));

    let relation = result.plan().relations().next().expect("relation");
    assert!(matches!(
        relation.details[0].node().map(|d| &d.kind),
        Some(RelationDetailKind::Measure { details }) if details.len() == 1
    ));
}

#[test]
fn unbalanced_literal_does_not_swallow_later_declarations() {
    let text = "PROJECT RELATION p { EMIT a; EXPRESSION {1, 2 ; EMIT b; }\n\
                ROOT { NAMES = [z] }\n\
                schema s { c i32; }";
    let result = parse(text);
    assert_eq!(result.errors().count(), 1, "{}", result);
    assert_eq!(
        result.errors().next().unwrap().recovery,
        Some(RecoveryAction::SkippedToSemicolon)
    );

    let details = &result.plan().details;
    assert_eq!(details.len(), 3);
    let Some(PlanDetail::Relation(relation)) = details[0].node() else {
        panic!("expected relation");
    };
    let emitted: Vec<_> = relation
        .details
        .iter()
        .filter_map(|d| match d.node().map(|d| &d.kind) {
            Some(RelationDetailKind::Emit { column }) => Some(column.column.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(emitted, ["a", "b"]);
    assert!(relation.details[1].is_error());
    assert!(matches!(details[1].node(), Some(PlanDetail::Root(_))));
    assert!(matches!(details[2].node(), Some(PlanDetail::Schema(_))));
}

#[test]
fn missing_close_brace_ends_at_next_declaration() {
    let text = "READ RELATION r {\n  EMIT a;\n\nschema s { c i32; }";
    let result = parse(text);
    assert_eq!(result.diagnostics().len(), 1, "{}", result);
    let d = &result.diagnostics()[0];
    assert_eq!(d.kind, ErrorKind::Unclosed { delimiter: '{' });
    assert_eq!(d.recovery, Some(RecoveryAction::SkippedToDeclaration));

    let details = &result.plan().details;
    assert_eq!(details.len(), 2);
    assert!(matches!(details[0].node(), Some(PlanDetail::Relation(r)) if r.details.len() == 1));
    assert!(matches!(details[1].node(), Some(PlanDetail::Schema(_))));
}

#[test]
fn invalid_characters_do_not_cascade() {
    let result = parse("schema s { a ^ ; b i32; }");
    assert_eq!(result.diagnostics().len(), 1, "{}", result);
    assert_eq!(result.diagnostics()[0].category(), Category::Lexical);
    let PlanDetail::Schema(schema) = result.plan().declarations().next().unwrap() else {
        panic!("expected schema");
    };
    assert!(schema.items[0].is_error());
    assert_eq!(schema.items[1].node().unwrap().name.name, "b");
}

#[test]
fn diagnostics_are_sorted_and_located() {
    let text = "READ RELATION r {\n  COUNT x;\n}\nROOT { NAMES = [] }\nschema s { a ~ ; }";
    let result = parse(text);
    let starts: Vec<u32> = result.diagnostics().iter().map(|d| d.span.start).collect();
    let mut sorted = starts.clone();
    sorted.sort_unstable();
    assert_eq!(starts, sorted);
    assert_eq!(result.diagnostics().len(), 3, "{}", result);

    let lines: Vec<u32> = result.diagnostics().iter().map(|d| d.line).collect();
    assert_eq!(lines, [2, 4, 5]);
}

#[test]
fn invalid_uri_is_a_syntax_error() {
    let result = parse("EXTENSION_SPACE http://exa mple.com { FUNCTION f; }");
    assert!(!result.successful());

    let result = parse("EXTENSION_SPACE file:bad|path { FUNCTION f; }\nROOT { NAMES = [a] }");
    let d = result.errors().next().expect("uri error");
    assert!(matches!(&d.kind, ErrorKind::InvalidUri { uri } if uri == "file:bad|path"));
    assert!(matches!(
        result.plan().details.last().and_then(Parsed::node),
        Some(PlanDetail::Root(_))
    ));
}

#[test]
fn comment_like_uri_text_is_not_a_comment() {
    let result = parse("EXTENSION_SPACE file:///tmp/ext.yaml { FUNCTION f; }");
    assert!(result.successful(), "{}", result);
    assert!(result.tree.comments().is_empty());
    let Some(PlanDetail::ExtensionSpace(space)) = result.plan().declarations().next() else {
        panic!("expected extension space");
    };
    assert_eq!(
        space.uri.as_ref().map(|u| u.text.as_str()),
        Some("file:///tmp/ext.yaml")
    );
}
