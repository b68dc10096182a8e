//! Source provider abstraction for the CLI commands.
//!
//! Commands read documents through [`SourceProvider`] rather than `std::fs`
//! so that a path of `-` can mean standard input and tests can supply text
//! without touching the filesystem.

use std::io::{self, Read};
use std::path::Path;

/// Path that selects standard input.
pub(crate) const STDIN_PATH: &str = "-";

/// A document loaded for parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Source {
    /// Name used in diagnostics.
    pub(crate) name: String,
    pub(crate) text: String,
}

pub(crate) trait SourceProvider {
    /// Read the source text for a given path.
    fn read_source(&self, path: &Path) -> Result<String, io::Error>;

    /// Name shown in diagnostics for `path`.
    fn display_name(&self, path: &Path) -> String {
        path.display().to_string()
    }

    fn load(&self, path: &Path) -> Result<Source, io::Error> {
        let text = self.read_source(path)?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "loaded source");
        Ok(Source {
            name: self.display_name(path),
            text,
        })
    }
}

/// Reads files from disk, or standard input for `-`.
pub(crate) struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, io::Error> {
        if path == Path::new(STDIN_PATH) {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            return Ok(text);
        }
        std::fs::read_to_string(path)
    }

    fn display_name(&self, path: &Path) -> String {
        if path == Path::new(STDIN_PATH) {
            "<stdin>".to_owned()
        } else {
            path.display().to_string()
        }
    }
}

/// Maps paths to source text, for tests that run commands without files.
#[cfg(test)]
pub(crate) struct InMemoryProvider {
    files: std::collections::HashMap<std::path::PathBuf, String>,
}

#[cfg(test)]
impl InMemoryProvider {
    pub(crate) fn new(files: std::collections::HashMap<std::path::PathBuf, String>) -> Self {
        Self { files }
    }
}

#[cfg(test)]
impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, io::Error> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )
        })
    }
}
