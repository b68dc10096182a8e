use std::path::PathBuf;
use std::process;

use textplan_core::ParseResult;

use crate::commands::{render_diagnostic, to_pretty_json};
use crate::source::SourceProvider;
use crate::{report_error, OutputFormat};

/// Per-file diagnostic limit used when `--max-errors` is not given.
pub(crate) const DEFAULT_MAX_ERRORS: usize = 10;

/// Parse every file and report its diagnostics. Exits 1 if any file failed
/// to load or produced an error.
pub(crate) fn cmd_check(
    provider: &dyn SourceProvider,
    files: &[PathBuf],
    max_errors: usize,
    output: OutputFormat,
    quiet: bool,
) {
    let mut failed = false;
    let mut json_diagnostics = Vec::new();

    for file in files {
        let source = match provider.load(file) {
            Ok(source) => source,
            Err(e) => {
                let msg = format!("error reading file '{}': {}", file.display(), e);
                report_error(&msg, output, quiet);
                failed = true;
                continue;
            }
        };

        let result = textplan_core::parse_named(&source.text, &source.name);
        if !result.successful() {
            failed = true;
        }
        tracing::debug!(
            file = %source.name,
            errors = result.errors().count(),
            warnings = result.warnings().count(),
            "checked"
        );

        match output {
            OutputFormat::Text => {
                let shown = result.diagnostics().iter().take(max_errors);
                for diagnostic in shown {
                    eprint!("{}", render_diagnostic(diagnostic, &source));
                }
                let hidden = result.diagnostics().len().saturating_sub(max_errors);
                if hidden > 0 {
                    eprintln!("{}: {} more diagnostic(s) not shown", source.name, hidden);
                }
                if !quiet {
                    println!("{}", summary(&result));
                }
            }
            OutputFormat::Json => json_diagnostics.extend(
                result
                    .diagnostics()
                    .iter()
                    .take(max_errors)
                    .map(|d| d.to_json_value()),
            ),
        }
    }

    if output == OutputFormat::Json {
        println!("{}", to_pretty_json(&json_diagnostics));
    }
    if failed {
        process::exit(1);
    }
}

fn summary(result: &ParseResult) -> String {
    let errors = result.errors().count();
    let warnings = result.warnings().count();
    if errors == 0 && warnings == 0 {
        format!("{}: ok", result.source_name)
    } else {
        format!(
            "{}: {} error(s), {} warning(s)",
            result.source_name, errors, warnings
        )
    }
}
