use serde::Serialize;
use std::path::{Path, PathBuf};

/// Where a section or element lives on disk. Lines are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
            end_line: None,
        }
    }

    /// Location covering `line..=end_line`. An end before the start collapses
    /// to a single line so `end_line >= line` always holds.
    pub fn spanning(file: impl Into<PathBuf>, line: usize, end_line: usize) -> Self {
        Self {
            file: file.into(),
            line,
            end_line: Some(end_line.max(line)),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// One heading-delimited region of a document.
///
/// Children are owned by value; parent relationships are derived from the
/// dotted `path` rather than stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub level: usize,
    pub path: String,
    pub source_location: SourceLocation,
    pub children: Vec<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

impl Section {
    /// Pre-order walk over this section and all of its descendants.
    pub fn walk(&self) -> SectionWalk<'_> {
        SectionWalk { stack: vec![self] }
    }

    /// The deepest section reached by repeatedly following the last child.
    pub fn last_descendant(&self) -> &Section {
        let mut current = self;
        while let Some(last) = current.children.last() {
            current = last;
        }
        current
    }

    pub fn line(&self) -> usize {
        self.source_location.line
    }
}

pub struct SectionWalk<'a> {
    stack: Vec<&'a Section>,
}

impl<'a> Iterator for SectionWalk<'a> {
    type Item = &'a Section;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}
