use std::path::Path;

use serde::Serialize;
use textplan_core::lexer::{Trivia, TriviaKind};
use textplan_core::{LineIndex, Span, Token, TokenKind};

use crate::commands::{load_or_exit, to_pretty_json};
use crate::source::SourceProvider;
use crate::OutputFormat;

#[derive(Serialize)]
struct TokenRow<'a> {
    kind: TokenKind,
    span: Span,
    line: u32,
    column: u32,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    trivia: Option<Vec<TriviaRow<'a>>>,
}

#[derive(Serialize)]
struct TriviaRow<'a> {
    kind: TriviaKind,
    span: Span,
    text: &'a str,
}

/// Print the token stream the parser saw, URI tokens included.
pub(crate) fn cmd_tokens(
    provider: &dyn SourceProvider,
    file: &Path,
    trivia: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let source = load_or_exit(provider, file, output, quiet);
    let result = textplan_core::parse_named(&source.text, &source.name);
    let src = result.tree.source();
    let lines = LineIndex::new(src);

    match output {
        OutputFormat::Text => {
            for token in &result.tree.tokens {
                if trivia {
                    for t in &token.leading_trivia {
                        let at = lines.line_col(src, t.span.start);
                        println!(
                            "{}:{} {} {:?}",
                            at.line,
                            at.column,
                            trivia_name(t),
                            t.span.text(src)
                        );
                    }
                }
                let at = lines.line_col(src, token.span.start);
                println!(
                    "{}:{} {} {:?}",
                    at.line,
                    at.column,
                    kind_name(token.kind),
                    token.text(src)
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<TokenRow<'_>> = result
                .tree
                .tokens
                .iter()
                .map(|token| row(token, src, &lines, trivia))
                .collect();
            println!("{}", to_pretty_json(&rows));
        }
    }
}

fn row<'a>(token: &Token, src: &'a str, lines: &LineIndex, trivia: bool) -> TokenRow<'a> {
    let at = lines.line_col(src, token.span.start);
    TokenRow {
        kind: token.kind,
        span: token.span,
        line: at.line,
        column: at.column,
        text: token.text(src),
        trivia: trivia.then(|| {
            token
                .leading_trivia
                .iter()
                .map(|t| TriviaRow {
                    kind: t.kind,
                    span: t.span,
                    text: t.span.text(src),
                })
                .collect()
        }),
    }
}

fn trivia_name(trivia: &Trivia) -> &'static str {
    match trivia.kind {
        TriviaKind::Whitespace => "WHITESPACE",
        TriviaKind::Comment => "COMMENT",
    }
}

fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Identifier { reserved: true } => "RESERVED",
        TokenKind::Identifier { reserved: false } => "IDENTIFIER",
        TokenKind::Number => "NUMBER",
        TokenKind::String { .. } => "STRING",
        TokenKind::Uri => "URI",
        TokenKind::Error { .. } => "ERROR",
        TokenKind::Eof => "EOF",
        _ => "PUNCT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        let tokens = textplan_core::lexer::lex("ROOT x 1 \"a\" ; #");
        let names: Vec<_> = tokens.iter().map(|t| kind_name(t.kind)).collect();
        assert_eq!(
            names,
            ["RESERVED", "IDENTIFIER", "NUMBER", "STRING", "PUNCT", "ERROR", "EOF"]
        );
    }

    #[test]
    fn json_rows_include_trivia_on_request() {
        let src = "// c\nx";
        let tokens = textplan_core::lexer::lex(src);
        let lines = LineIndex::new(src);

        let with = row(&tokens[0], src, &lines, true);
        let kinds: Vec<_> = with.trivia.unwrap().iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [TriviaKind::Comment, TriviaKind::Whitespace]);
        assert_eq!(with.line, 2);

        assert!(row(&tokens[0], src, &lines, false).trivia.is_none());
    }
}
