pub mod asciidoc;
pub mod elements;
pub mod markdown;
pub mod outline;
pub mod rope;
pub mod slug;

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Document, DocumentFormat};

pub use asciidoc::AsciidocParser;
pub use markdown::MarkdownParser;
pub use slug::slugify;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Turns the text of one file into a [`Document`].
pub trait StructureParser {
    /// Reads `path` as UTF-8 and parses it. Fails only when the file cannot
    /// be read; everything else is reported through the document.
    fn parse_file(&self, path: &Path) -> Result<Document, ParseError>;

    /// Parses `content` as if it had been read from `path`.
    fn parse_str(&self, path: &Path, content: &str) -> Document;
}

pub(crate) fn read_source(path: &Path) -> Result<String, ParseError> {
    if !path.exists() {
        return Err(ParseError::FileNotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a file with the parser matching its extension.
///
/// `base_path` anchors relative AsciiDoc includes; Markdown ignores both
/// include settings.
pub fn parse_file(
    path: &Path,
    base_path: Option<&Path>,
    max_include_depth: usize,
) -> Result<Document, ParseError> {
    match DocumentFormat::from_path(path) {
        Some(DocumentFormat::Asciidoc) => {
            let mut parser = AsciidocParser::new().with_max_include_depth(max_include_depth);
            if let Some(base) = base_path {
                parser = parser.with_base_path(base);
            }
            parser.parse_file(path)
        }
        Some(DocumentFormat::Markdown) => MarkdownParser::new().parse_file(path),
        None => Err(ParseError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_docs_dir, create_test_file};

    #[test]
    fn dispatches_on_extension() {
        // Given one file of each format
        let dir = create_test_docs_dir();
        let adoc = create_test_file(&dir, "guide.adoc", "= Guide\n\n== Setup\n");
        let md = create_test_file(&dir, "notes.md", "# Notes\n\n## Setup\n");

        // When parsing both through the dispatcher
        let adoc_doc = parse_file(&adoc, Some(dir.path()), 20).unwrap();
        let md_doc = parse_file(&md, None, 20).unwrap();

        // Then each gets its own format details
        assert_eq!(adoc_doc.format(), DocumentFormat::Asciidoc);
        assert_eq!(md_doc.format(), DocumentFormat::Markdown);
        assert_eq!(adoc_doc.title, "Guide");
        assert_eq!(md_doc.title, "Notes");
    }

    #[test]
    fn rejects_unknown_extensions() {
        let dir = create_test_docs_dir();
        let txt = create_test_file(&dir, "readme.txt", "= Not parsed\n");
        assert!(matches!(
            parse_file(&txt, None, 20),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_not_an_io_error() {
        let dir = create_test_docs_dir();
        let result = read_source(&dir.path().join("gone.adoc"));
        assert!(matches!(result, Err(ParseError::FileNotFound(_))));
    }
}
