//! Section-level edits on top of the structure index.
//!
//! Line numbers come from the index and are not refreshed after a write, so
//! callers rebuild the index before editing the same file again.

use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use xi_rope::Rope;

use crate::index::{SectionRef, StructureIndex};
use crate::io::{FileStore, IoError, splice_lines};
use crate::models::{DocumentFormat, Section};
use crate::parsing::asciidoc::syntax as asciidoc_syntax;
use crate::parsing::markdown::syntax as markdown_syntax;
use crate::parsing::rope::{LineRef, line_count, lines_with_spans};

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("Section not found: {0}")]
    SectionNotFound(String),
    #[error(
        "Heading level mismatch: section has heading level {expected}, new content starts with heading level {actual}"
    )]
    HeadingLevelMismatch { expected: usize, actual: usize },
    #[error("Failed to read document: {0}")]
    Read(#[source] IoError),
    #[error("Failed to write document: {0}")]
    Write(#[source] IoError),
}

/// Last line of the section's own content.
///
/// Parsers always set `end_line`. Without it the file's line count is used,
/// and if the file cannot be read, `line + 10` is a rough guess.
pub fn section_end_line(section: &Section, store: &dyn FileStore) -> usize {
    let location = &section.source_location;
    if let Some(end_line) = location.end_line {
        return end_line;
    }
    match store.read_file(location.file()) {
        Ok(content) => line_count(&Rope::from(content.as_str())).max(location.line),
        Err(err) => {
            warn!("Guessing where section '{}' ends: {err}", section.path);
            location.line + 10
        }
    }
}

/// Last line of the section including its whole subtree: the end of the
/// deepest last descendant. Children pulled in from other files do not count
/// since their lines belong to a different file.
pub fn section_end_with_descendants(section: &Section, store: &dyn FileStore) -> usize {
    let own_end = section_end_line(section, store);
    let last_local_child = section
        .children
        .iter()
        .rev()
        .find(|child| child.source_location.file == section.source_location.file);
    match last_local_child {
        Some(child) => section_end_with_descendants(child, store).max(own_end),
        None => own_end,
    }
}

/// Replacement content may only bring a heading of the section's own level.
pub fn validate_heading_level_change(
    original: &Section,
    new_level: usize,
) -> Result<(), MutationError> {
    if original.level == new_level {
        Ok(())
    } else {
        Err(MutationError::HeadingLevelMismatch {
            expected: original.level,
            actual: new_level,
        })
    }
}

/// Level of the heading on the first non-blank line of `content`, if that
/// line is a heading.
pub fn first_heading_level(content: &str, format: DocumentFormat) -> Option<usize> {
    let first = content.lines().find(|line| !line.trim().is_empty())?;
    heading_level(first, format)
}

fn heading_level(line: &str, format: DocumentFormat) -> Option<usize> {
    let markers = match format {
        DocumentFormat::Asciidoc => asciidoc_syntax::heading(line)?.0,
        DocumentFormat::Markdown => markdown_syntax::heading(line)?.markers,
    };
    Some(markers.saturating_sub(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    /// Directly above the section heading.
    Before,
    /// Below the section and all of its descendants.
    After,
    /// At the end of the section's own content, above its children.
    Append,
}

impl InsertPosition {
    pub const ALL: [InsertPosition; 3] = [
        InsertPosition::Before,
        InsertPosition::After,
        InsertPosition::Append,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InsertPosition::Before => "before",
            InsertPosition::After => "after",
            InsertPosition::Append => "append",
        }
    }
}

impl fmt::Display for InsertPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown insert position '{0}' (expected before, after or append)")]
pub struct UnknownInsertPosition(pub String);

impl FromStr for InsertPosition {
    type Err = UnknownInsertPosition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InsertPosition::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownInsertPosition(s.to_string()))
    }
}

/// Where an edit landed: the lines now holding the caller's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    pub path: String,
    pub file: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

/// Rewrites document files section by section.
///
/// Every edit reads the whole file, splices it in memory and writes it back
/// through the store, so a failed edit leaves the file as it was.
pub struct ContentEditor<'a> {
    index: &'a StructureIndex,
    store: &'a dyn FileStore,
}

impl<'a> ContentEditor<'a> {
    pub fn new(index: &'a StructureIndex, store: &'a dyn FileStore) -> Self {
        Self { index, store }
    }

    fn target(&self, path: &str) -> Result<SectionRef<'a>, MutationError> {
        self.index
            .locate(path)
            .ok_or_else(|| MutationError::SectionNotFound(path.to_string()))
    }

    /// Replaces the section's own lines, from its heading to `end_line`.
    /// Children are left alone.
    ///
    /// With `preserve_title`, content without a heading gets the original
    /// heading line put back in front of it. Content that brings its own
    /// heading must keep the section's level.
    pub fn update_section(
        &self,
        path: &str,
        content: &str,
        preserve_title: bool,
    ) -> Result<EditOutcome, MutationError> {
        let target = self.target(path)?;
        let section = target.section;
        let format = section_format(&target);
        let file = section.source_location.file();
        let start = section.source_location.line;

        let original = self.store.read_file(file).map_err(MutationError::Read)?;
        let lines = file_lines(&original);
        let heading = lines
            .get(start - 1)
            .map(LineRef::content)
            .filter(|line| heading_level(line, format).is_some());

        let replacement = match first_heading_level(content, format) {
            Some(level) => {
                // Included sections may sit at a shifted level; compare with
                // what is written in their own file.
                let written_level = heading.and_then(|line| heading_level(line, format));
                match written_level {
                    Some(expected) if expected != section.level && level != expected => {
                        return Err(MutationError::HeadingLevelMismatch {
                            expected,
                            actual: level,
                        });
                    }
                    Some(expected) if expected != section.level => {}
                    _ => validate_heading_level_change(section, level)?,
                }
                content.to_string()
            }
            None if preserve_title => {
                let heading = heading.map_or_else(
                    || format.heading_line(section.level, &section.title),
                    str::to_string,
                );
                format!("{heading}\n\n{}", content.trim_start_matches(['\r', '\n']))
            }
            None => content.to_string(),
        };
        let mut replacement = with_single_newline(&replacement);
        let written = replacement.lines().count();

        let end = section_end_line(section, self.store);
        if lines
            .get(end)
            .is_some_and(|next| heading_level(next.content(), format).is_some())
        {
            replacement.push('\n');
        }

        let updated =
            splice_lines(file, &original, start, end, &replacement).map_err(MutationError::Write)?;
        self.store
            .write_file(file, &updated)
            .map_err(MutationError::Write)?;
        debug!(
            "Replaced lines {start}-{end} of {} for '{}'",
            file.display(),
            target.key
        );

        Ok(EditOutcome {
            path: target.key.to_string(),
            file: file.to_path_buf(),
            start_line: start,
            end_line: start + written.saturating_sub(1),
        })
    }

    /// Inserts `content` relative to the section. Blank lines are added
    /// around it where needed to keep headings separated from the text
    /// next to them.
    pub fn insert_content(
        &self,
        path: &str,
        position: InsertPosition,
        content: &str,
    ) -> Result<EditOutcome, MutationError> {
        let target = self.target(path)?;
        let section = target.section;
        let format = section_format(&target);
        let file = section.source_location.file();

        let original = self.store.read_file(file).map_err(MutationError::Read)?;
        let lines = file_lines(&original);
        let at = match position {
            InsertPosition::Before => section.source_location.line,
            InsertPosition::After => section_end_with_descendants(section, self.store) + 1,
            InsertPosition::Append => {
                let end = section_end_line(section, self.store);
                let trailing_blank = end > section.source_location.line
                    && lines.get(end - 1).is_some_and(LineRef::is_blank);
                if trailing_blank { end } else { end + 1 }
            }
        }
        .min(lines.len() + 1);

        let body = with_single_newline(content);
        let written = body.lines().count();
        let mut text = body;
        let mut start_line = at;

        let preceding = at.checked_sub(2).and_then(|idx| lines.get(idx));
        let starts_with_heading = text
            .lines()
            .next()
            .is_some_and(|line| heading_level(line, format).is_some());
        if starts_with_heading && preceding.is_some_and(|line| !line.is_blank()) {
            text.insert(0, '\n');
            start_line += 1;
        }
        let following = lines.get(at - 1);
        if following.is_some_and(|line| heading_level(line.content(), format).is_some())
            && !ends_with_blank_line(&text)
        {
            text.push('\n');
        }

        let updated =
            splice_lines(file, &original, at, at - 1, &text).map_err(MutationError::Write)?;
        self.store
            .write_file(file, &updated)
            .map_err(MutationError::Write)?;
        debug!(
            "Inserted {written} lines {position} '{}' at {}:{at}",
            target.key,
            file.display()
        );

        Ok(EditOutcome {
            path: target.key.to_string(),
            file: file.to_path_buf(),
            start_line,
            end_line: start_line + written.saturating_sub(1),
        })
    }
}

fn section_format(target: &SectionRef<'_>) -> DocumentFormat {
    DocumentFormat::from_path(target.source_location.file())
        .unwrap_or_else(|| target.document.format())
}

fn file_lines(content: &str) -> Vec<LineRef> {
    lines_with_spans(&Rope::from(content)).collect()
}

fn with_single_newline(text: &str) -> String {
    format!("{}\n", text.trim_end_matches(['\r', '\n']))
}

fn ends_with_blank_line(text: &str) -> bool {
    text.lines().last().is_some_and(|line| line.trim().is_empty())
}
