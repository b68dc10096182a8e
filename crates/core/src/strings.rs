//! String literal surface forms: decoding what the lexer sees and emitting
//! text that lexes back to the same value.

use serde::Serialize;
use std::fmt;

/// The four surface forms of a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StringStyle {
    /// `"..."` with backslash escapes.
    Quoted,
    /// `` `...` ``, no escapes, no embedded backtick.
    Backtick,
    /// ``` ``...`` ```, terminated only by a double backtick.
    DoubleBacktick,
    /// ```` ```...``` ````, terminated only by a triple backtick.
    TripleBacktick,
}

impl StringStyle {
    /// Opening (and closing) delimiter.
    pub const fn delimiter(self) -> &'static str {
        match self {
            StringStyle::Quoted => "\"",
            StringStyle::Backtick => "`",
            StringStyle::DoubleBacktick => "``",
            StringStyle::TripleBacktick => "```",
        }
    }

    /// Whether `value` can be written in this form and lex back unchanged.
    pub fn can_represent(self, value: &str) -> bool {
        match self {
            StringStyle::Quoted => true,
            // `` opens a double-backtick string, so the empty single form is unreachable
            StringStyle::Backtick => !value.is_empty() && !value.contains('`'),
            // four backticks open a triple-backtick string
            StringStyle::DoubleBacktick => {
                !value.is_empty()
                    && !value.contains("``")
                    && !value.starts_with('`')
                    && !value.ends_with('`')
            }
            StringStyle::TripleBacktick => !value.contains("```") && !value.ends_with('`'),
        }
    }
}

impl fmt::Display for StringStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StringStyle::Quoted => "double-quoted",
            StringStyle::Backtick => "backtick",
            StringStyle::DoubleBacktick => "double-backtick",
            StringStyle::TripleBacktick => "triple-backtick",
        };
        f.write_str(name)
    }
}

/// Writes `value` as a double-quoted literal, escaping as needed.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Decodes the body of a double-quoted literal (without the quotes).
///
/// Unknown escapes stand for the escaped character itself; a malformed
/// `\u` escape keeps its characters verbatim.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let mut code = String::new();
                while code.len() < 4 {
                    match chars.peek() {
                        Some(d) if d.is_ascii_hexdigit() => {
                            code.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if code.len() == 4 => out.push(decoded),
                    _ => {
                        out.push('u');
                        out.push_str(&code);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Writes `value` in the requested form. Falls back to the quoted form when
/// the raw form cannot hold the value.
pub fn emit(value: &str, style: StringStyle) -> String {
    if style == StringStyle::Quoted || !style.can_represent(value) {
        return escape(value);
    }
    let delim = style.delimiter();
    format!("{delim}{value}{delim}")
}
