use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::models::{Element, ElementType, SourceLocation};

static ADOC_UNORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\*{1,5}|-)\s+(\S.*)$").expect("list regex"));
static ADOC_ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\.{1,5}|\d{1,9}\.)\s+\S").expect("list regex"));
static MD_UNORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(\S.*)$").expect("list regex"));
static MD_ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,9}[.)]\s+\S").expect("list regex"));
static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[ xX*]\](?:\s|$)").expect("task regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    Ordered,
    Unordered,
    Task,
}

impl ListType {
    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Ordered => "ordered",
            ListType::Unordered => "unordered",
            ListType::Task => "task",
        }
    }
}

/// List item marker for AsciiDoc: `*`..`*****`, `-`, `.`..`.....`, `1.`.
pub fn asciidoc_list_item(line: &str) -> Option<ListType> {
    list_item(line, &ADOC_UNORDERED_RE, &ADOC_ORDERED_RE)
}

/// List item marker for Markdown: `-`, `*`, `+`, `1.`, `1)`.
pub fn markdown_list_item(line: &str) -> Option<ListType> {
    list_item(line, &MD_UNORDERED_RE, &MD_ORDERED_RE)
}

// A checkbox straight after the bullet makes a task item.
fn list_item(line: &str, unordered: &Regex, ordered: &Regex) -> Option<ListType> {
    if let Some(caps) = unordered.captures(line) {
        let rest = caps.get(1).map_or("", |m| m.as_str());
        return Some(if TASK_RE.is_match(rest) {
            ListType::Task
        } else {
            ListType::Unordered
        });
    }
    ordered.is_match(line).then_some(ListType::Ordered)
}

/// An element whose extent is still growing line by line.
#[derive(Debug, Clone)]
pub struct PendingElement {
    element: Element,
    file: PathBuf,
    lines: Vec<String>,
    items: usize,
    /// A blank line was seen since the last content line.
    pub after_blank: bool,
}

impl PendingElement {
    pub fn new(element_type: ElementType, file: &Path, line: usize, parent: &str) -> Self {
        Self {
            element: Element::new(
                element_type,
                SourceLocation::spanning(file, line, line),
                parent,
            ),
            file: file.to_path_buf(),
            lines: Vec::new(),
            items: 0,
            after_blank: false,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.element = self.element.with_attribute(key, value);
        self
    }

    pub fn element_type(&self) -> ElementType {
        self.element.element_type
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.element.attribute(key)
    }

    /// Adds a content line and extends the element to cover `line`.
    pub fn push_line(&mut self, line: usize, text: &str) {
        self.lines.push(text.to_string());
        self.extend_to(line);
        self.after_blank = false;
    }

    pub fn push_item(&mut self, line: usize, text: &str) {
        self.items += 1;
        self.push_line(line, text);
    }

    pub fn extend_to(&mut self, line: usize) {
        let loc = &mut self.element.source_location;
        loc.end_line = Some(loc.end_line.unwrap_or(loc.line).max(line));
    }

    pub fn finish(mut self) -> Element {
        if !self.element.attributes.contains_key("content") {
            self.element
                .attributes
                .insert("content".to_string(), self.lines.join("\n"));
        }
        if self.element.element_type == ElementType::List {
            self.element
                .attributes
                .insert("items".to_string(), self.items.to_string());
        }
        self.element
    }
}
