use std::fmt::Display;
use std::io;
use std::path::Path;

use pdfbridge::{Document, OpenOptions};
use tracing_subscriber::EnvFilter;

use crate::page_range::parse_page_range;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` selects the level, defaulting to `warn`; `verbose` forces
/// `debug`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Open a PDF file with user-friendly error messages.
///
/// Returns `Err(1)` with a message printed to stderr if the file is not found
/// or cannot be parsed as a valid PDF.
pub fn open_document(file: &Path, password: Option<&str>) -> Result<Document, i32> {
    if !file.exists() {
        eprintln!("Error: file not found: {}", file.display());
        return Err(1);
    }

    let mut options = OpenOptions::new();
    if let Some(password) = password {
        options = options.password(password);
    }
    Document::open_file(file, Some(options)).map_err(|e| {
        eprintln!("Error: failed to open PDF: {e}");
        1
    })
}

/// Print an error to stderr and return the failure exit code.
pub fn fail(err: impl Display) -> i32 {
    eprintln!("Error: {err}");
    1
}

/// Resolve an optional page range string into 0-indexed page indices.
///
/// If `pages` is `None`, returns all pages (0..page_count).
/// If `pages` is `Some`, parses the range string and validates against page_count.
pub fn resolve_pages(pages: Option<&str>, page_count: usize) -> Result<Vec<usize>, i32> {
    match pages {
        Some(range) => parse_page_range(range, page_count).map_err(fail),
        None => Ok((0..page_count).collect()),
    }
}

/// Print a JSON value as one line on stdout.
pub fn print_json(value: &serde_json::Value) {
    println!("{value}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_document_file_not_found() {
        let result = open_document(Path::new("/nonexistent/file.pdf"), None);
        assert_eq!(result.unwrap_err(), 1);
    }

    #[test]
    fn resolve_pages_none_returns_all() {
        let pages = resolve_pages(None, 5).unwrap();
        assert_eq!(pages, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn resolve_pages_with_range() {
        let pages = resolve_pages(Some("1,3"), 5).unwrap();
        assert_eq!(pages, vec![0, 2]);
    }

    #[test]
    fn resolve_pages_invalid_range() {
        let result = resolve_pages(Some("0"), 5);
        assert_eq!(result.unwrap_err(), 1);
    }
}
