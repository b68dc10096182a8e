pub(crate) mod check;
pub(crate) mod parse;
pub(crate) mod tokens;

use std::io::IsTerminal;
use std::path::Path;
use std::process;

use miette::{GraphicalReportHandler, GraphicalTheme, NamedSource, Report};
use textplan_core::Diagnostic;

use crate::source::{Source, SourceProvider};
use crate::{report_error, OutputFormat};

/// Load `path` or exit with status 1.
pub(crate) fn load_or_exit(
    provider: &dyn SourceProvider,
    path: &Path,
    output: OutputFormat,
    quiet: bool,
) -> Source {
    match provider.load(path) {
        Ok(source) => source,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Render one diagnostic with a source snippet. Colour is used only when
/// stderr is a terminal.
pub(crate) fn render_diagnostic(diagnostic: &Diagnostic, source: &Source) -> String {
    let theme = if std::io::stderr().is_terminal() {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::unicode_nocolor()
    };
    render_with_theme(diagnostic, source, theme)
}

fn render_with_theme(diagnostic: &Diagnostic, source: &Source, theme: GraphicalTheme) -> String {
    let report = Report::new(diagnostic.clone())
        .with_source_code(NamedSource::new(&source.name, source.text.clone()));
    let mut out = String::new();
    if GraphicalReportHandler::new_themed(theme)
        .render_report(&mut out, &*report)
        .is_err()
    {
        // fall back to the one-line form
        out = format!(
            "{}:{}:{}: {}\n",
            diagnostic.source_name,
            diagnostic.line,
            diagnostic.column,
            diagnostic.message()
        );
    }
    out
}

/// Pretty JSON, or an error object if serialization fails.
pub(crate) fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization error: {}\"}}", e))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;
    use crate::source::InMemoryProvider;

    #[test]
    fn rendered_report_names_the_source_and_code() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("plan.textplan"), "ROOT { NAMES = [a }".to_owned());
        let provider = InMemoryProvider::new(files);
        let src = load_or_exit(&provider, Path::new("plan.textplan"), OutputFormat::Text, true);

        let result = textplan_core::parse_named(&src.text, &src.name);
        let diagnostic = &result.diagnostics()[0];

        let out = render_with_theme(diagnostic, &src, GraphicalTheme::unicode_nocolor());
        assert!(out.contains("plan.textplan"), "{out}");
        assert!(out.contains(diagnostic.kind.code()), "{out}");
        assert!(out.contains("expected"), "{out}");
    }
}
