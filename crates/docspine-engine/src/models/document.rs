use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{Element, Section, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Asciidoc,
    Markdown,
}

impl DocumentFormat {
    pub const ASCIIDOC_EXTENSIONS: [&'static str; 2] = ["adoc", "asciidoc"];
    pub const MARKDOWN_EXTENSIONS: [&'static str; 2] = ["md", "markdown"];

    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if Self::ASCIIDOC_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocumentFormat::Asciidoc)
        } else if Self::MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            Some(DocumentFormat::Markdown)
        } else {
            None
        }
    }

    /// Heading marker line for a section at `level`.
    pub fn heading_line(self, level: usize, title: &str) -> String {
        let marker = match self {
            DocumentFormat::Asciidoc => "=",
            DocumentFormat::Markdown => "#",
        };
        format!("{} {}", marker.repeat(level + 1), title)
    }
}

/// One `include::` directive, whether or not its target exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeInfo {
    pub source_location: SourceLocation,
    pub target_path: PathBuf,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossReference {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub source_location: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseWarningKind {
    UnclosedBlock,
    UnclosedTable,
    MalformedTable,
    UnclosedConditional,
    UnmatchedEndif,
    IncludeDepthExceeded,
}

impl ParseWarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseWarningKind::UnclosedBlock => "unclosed_block",
            ParseWarningKind::UnclosedTable => "unclosed_table",
            ParseWarningKind::MalformedTable => "malformed_table",
            ParseWarningKind::UnclosedConditional => "unclosed_conditional",
            ParseWarningKind::UnmatchedEndif => "unmatched_endif",
            ParseWarningKind::IncludeDepthExceeded => "include_depth_exceeded",
        }
    }
}

impl fmt::Display for ParseWarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    #[serde(rename = "type")]
    pub kind: ParseWarningKind,
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

/// An include chain that came back to a file already being expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircularInclude {
    /// The file that issued the offending include.
    pub file: PathBuf,
    pub message: String,
    /// Chain from the root document down to and including the repeated target.
    pub include_chain: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AsciidocDetails {
    pub includes: Vec<IncludeInfo>,
    pub cross_references: Vec<CrossReference>,
    pub circular_includes: Vec<CircularInclude>,
}

/// Format-specific data carried alongside the common document fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum FormatDetails {
    Asciidoc(AsciidocDetails),
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub file_path: PathBuf,
    pub title: String,
    pub sections: Vec<Section>,
    pub elements: Vec<Element>,
    pub parse_warnings: Vec<ParseWarning>,
    pub attributes: BTreeMap<String, String>,
    pub details: FormatDetails,
}

impl Document {
    pub fn format(&self) -> DocumentFormat {
        match self.details {
            FormatDetails::Asciidoc(_) => DocumentFormat::Asciidoc,
            FormatDetails::Markdown => DocumentFormat::Markdown,
        }
    }

    pub fn asciidoc(&self) -> Option<&AsciidocDetails> {
        match &self.details {
            FormatDetails::Asciidoc(details) => Some(details),
            FormatDetails::Markdown => None,
        }
    }

    /// Include directives; always empty for Markdown.
    pub fn includes(&self) -> &[IncludeInfo] {
        self.asciidoc()
            .map(|d| d.includes.as_slice())
            .unwrap_or_default()
    }

    pub fn cross_references(&self) -> &[CrossReference] {
        self.asciidoc()
            .map(|d| d.cross_references.as_slice())
            .unwrap_or_default()
    }

    pub fn circular_includes(&self) -> &[CircularInclude] {
        self.asciidoc()
            .map(|d| d.circular_includes.as_slice())
            .unwrap_or_default()
    }

    /// Every section of the document in pre-order.
    pub fn all_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().flat_map(Section::walk)
    }
}
