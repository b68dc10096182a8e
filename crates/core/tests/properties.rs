//! Property tests: the lexer and parser accept any input without
//! panicking, and layout never changes the tree.

use proptest::prelude::*;
use serde_json::Value;
use textplan_core::lexer::{lex, string_value};
use textplan_core::strings::{emit, StringStyle};
use textplan_core::{parse, ParseResult, SyntaxTree, TokenKind};

const DOCUMENTS: &[&str] = &[
    "schema s { a i32 NAMED x; b LIST?<STRUCT<i32, string?>>; }",
    r#"source LOCAL_FILES f { ITEMS = [ { URI_FILE: "a.parquet" PARQUET: {} }, ] }"#,
    "READ RELATION r1 { EMIT col1 ; BASE_SCHEMA s; }",
    "PROJECT RELATION p { EXPRESSION a(b, c) AS i32; POST-JOIN FILTER eq(x, 1_i8) -> bool; }",
    "AGGREGATE RELATION a (SCHEMA s) { MEASURE { MEASURE sum(x) @ PHASE NAMED t; } }",
    "ROOT { NAMES = [a, b] } PIPELINES { a -> b -> c; }",
    "EXTENSION_SPACE https://example.com/f.yaml { FUNCTION add:i32_i32 AS plus; }",
    "PROJECT RELATION q { EXPRESSION {1: `one`, 2: ``two``}_map<i32, string>; EXPRESSION NULL_i64; }",
];

fn all_styles() -> impl Strategy<Value = StringStyle> {
    prop_oneof![
        Just(StringStyle::Quoted),
        Just(StringStyle::Backtick),
        Just(StringStyle::DoubleBacktick),
        Just(StringStyle::TripleBacktick),
    ]
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(" "),
        Just("  "),
        Just("\n"),
        Just("\t\n  "),
        Just(" // note\n"),
        Just("\n// a longer comment { ; }\n"),
    ]
}

/// JSON of the plan with every `span` removed.
fn shape(result: &ParseResult) -> Value {
    fn strip(v: &mut Value) {
        match v {
            Value::Object(map) => {
                map.remove("span");
                map.values_mut().for_each(strip);
            }
            Value::Array(items) => items.iter_mut().for_each(strip),
            _ => {}
        }
    }
    let mut v = serde_json::to_value(result.plan()).expect("plan serializes");
    strip(&mut v);
    v
}

proptest! {
    #[test]
    fn never_panics_on_arbitrary_text(text in "\\PC{0,200}") {
        let result = parse(&text);
        prop_assert_eq!(result.plan().span.end as usize, text.len());
    }

    #[test]
    fn never_panics_on_plan_like_text(
        text in "[A-Za-z_ {}\\[\\]();:,.<>?@=\"`/\\n-]{0,200}"
    ) {
        let result = parse(&text);
        for d in result.diagnostics() {
            prop_assert!(d.span.end as usize <= text.len());
            prop_assert!(d.line >= 1 && d.column >= 1);
        }
        let starts: Vec<u32> = result.diagnostics().iter().map(|d| d.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        prop_assert_eq!(starts, sorted);
    }

    #[test]
    fn token_spans_are_ordered_and_in_bounds(text in "\\PC{0,200}") {
        let tokens = lex(&text);
        let mut prev_end = 0;
        for token in &tokens {
            for trivia in &token.leading_trivia {
                prop_assert!(trivia.span.start >= prev_end);
                prev_end = trivia.span.end;
            }
            prop_assert!(token.span.start >= prev_end);
            prop_assert!(token.span.end as usize <= text.len());
            prev_end = token.span.end;
        }
        let last = tokens.last().expect("always ends with eof");
        prop_assert_eq!(last.kind, TokenKind::Eof);
        prop_assert_eq!(last.span.start as usize, text.len());
        prop_assert_eq!(tokens.iter().filter(|t| t.is_eof()).count(), 1);
    }

    #[test]
    fn string_literals_round_trip(value in "\\PC{0,40}", style in all_styles()) {
        let written = emit(&value, style);
        let tokens = lex(&written);
        prop_assert_eq!(tokens.len(), 2, "{:?} lexed as {:?}", written, tokens);
        let is_string = matches!(tokens[0].kind, TokenKind::String { .. });
        prop_assert!(is_string, "{:?} is not a string token", tokens[0].kind);
        prop_assert_eq!(string_value(&written, &tokens[0]), Some(value));
    }

    #[test]
    fn layout_does_not_change_the_tree(
        index in 0..DOCUMENTS.len(),
        seps in prop::collection::vec(separator(), 64),
    ) {
        let original = parse(DOCUMENTS[index]);
        prop_assert!(original.successful(), "{}", original);

        let src = original.tree.source();
        let mut reformatted = String::new();
        for (i, token) in original.tree.tokens.iter().enumerate() {
            reformatted.push_str(seps[i % seps.len()]);
            reformatted.push_str(token.text(src));
        }

        let again = parse(&reformatted);
        prop_assert!(again.successful(), "{}\n{}", reformatted, again);
        prop_assert_eq!(shape(&original), shape(&again));
    }
}

#[test]
fn results_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ParseResult>();
    assert_send_sync::<SyntaxTree>();

    let handles: Vec<_> = DOCUMENTS
        .iter()
        .map(|doc| std::thread::spawn(move || parse(doc)))
        .collect();
    for (handle, doc) in handles.into_iter().zip(DOCUMENTS) {
        let result = handle.join().expect("parser thread");
        assert!(result.successful(), "{doc}: {result}");
    }
}
