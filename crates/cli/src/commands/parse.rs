use std::path::Path;
use std::process;

use crate::commands::{load_or_exit, render_diagnostic, to_pretty_json};
use crate::source::SourceProvider;
use crate::OutputFormat;

/// Parse one document and print its tree. Diagnostics go to stderr; the
/// tree is printed even when the document has errors.
pub(crate) fn cmd_parse(
    provider: &dyn SourceProvider,
    file: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let source = load_or_exit(provider, file, output, quiet);
    let result = textplan_core::parse_named(&source.text, &source.name);

    match output {
        OutputFormat::Text => {
            println!("{:#?}", result.plan());
            if !quiet {
                for diagnostic in result.diagnostics() {
                    eprint!("{}", render_diagnostic(diagnostic, &source));
                }
            }
        }
        OutputFormat::Json => {
            let diagnostics: Vec<_> = result
                .diagnostics()
                .iter()
                .map(|d| d.to_json_value())
                .collect();
            println!("{}", to_pretty_json(result.plan()));
            if !diagnostics.is_empty() {
                eprintln!("{}", to_pretty_json(&diagnostics));
            }
        }
    }

    if !result.successful() {
        process::exit(1);
    }
}
