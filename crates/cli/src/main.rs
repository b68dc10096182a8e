mod commands;
mod source;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::check::DEFAULT_MAX_ERRORS;
use crate::source::FileSystemProvider;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// TextPlan parser toolchain.
#[derive(Parser)]
#[command(name = "textplan", version, about = "TextPlan parser toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a TextPlan file and print its syntax tree
    Parse {
        /// Path to the TextPlan file, or `-` for stdin
        file: PathBuf,
    },

    /// Report diagnostics for one or more TextPlan files
    Check {
        /// Paths to the TextPlan files, or `-` for stdin
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Maximum diagnostics shown per file
        #[arg(long, default_value_t = DEFAULT_MAX_ERRORS)]
        max_errors: usize,
    },

    /// List the tokens of a TextPlan file
    Tokens {
        /// Path to the TextPlan file, or `-` for stdin
        file: PathBuf,
        /// Also list whitespace and comments
        #[arg(long)]
        trivia: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let provider = FileSystemProvider;
    match cli.command {
        Commands::Parse { file } => {
            commands::parse::cmd_parse(&provider, &file, cli.output, cli.quiet);
        }
        Commands::Check { files, max_errors } => {
            commands::check::cmd_check(&provider, &files, max_errors, cli.output, cli.quiet);
        }
        Commands::Tokens { file, trivia } => {
            commands::tokens::cmd_tokens(&provider, &file, trivia, cli.output, cli.quiet);
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn directive_for_verbosity(v: u8) -> &'static str {
    // targets are module paths: the binary is `textplan`, the library
    // `textplan_core`
    match v {
        0 => "warn",
        1 => "textplan=debug,textplan_core=debug",
        _ => "textplan=trace,textplan_core=trace",
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
