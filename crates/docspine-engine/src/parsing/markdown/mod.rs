//! Markdown structure parser.
//!
//! One pass over the rope's lines. Front matter, fenced code and multi-line
//! HTML comments are consumed first so their contents never reach heading or
//! element recognition.

pub mod fence;
pub mod syntax;

use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use xi_rope::Rope;

use crate::models::{
    Document, Element, ElementType, FormatDetails, ParseWarning, ParseWarningKind, SourceLocation,
};

use super::elements::{PendingElement, markdown_list_item};
use super::outline::{Heading, OutlineBuilder};
use super::rope::{LineRef, line_count, lines_with_spans};
use super::{ParseError, StructureParser, read_source};
use fence::{CodeFence, info_language};

#[derive(Debug, Clone, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }
}

impl StructureParser for MarkdownParser {
    fn parse_file(&self, path: &Path) -> Result<Document, ParseError> {
        let content = read_source(path)?;
        Ok(self.parse_str(path, &content))
    }

    fn parse_str(&self, path: &Path, content: &str) -> Document {
        let rope = Rope::from(content);
        let lines: Vec<LineRef> = lines_with_spans(&rope).collect();
        let texts: Vec<&str> = lines.iter().map(LineRef::content).collect();

        let (skip, attributes) = syntax::front_matter(texts.as_slice()).unwrap_or_default();

        let mut extractor = Extractor::new(path);
        let mut idx = skip;
        while idx < texts.len() {
            idx = extractor.line(&texts, idx);
        }
        let extracted = extractor.finish();

        let line_counts = HashMap::from([(path.to_path_buf(), line_count(&rope))]);
        let outline = extracted.outline.finish(&line_counts);
        let title = if outline.title.is_empty() {
            attributes.get("title").cloned().unwrap_or_default()
        } else {
            outline.title
        };

        debug!(
            "Parsed {}: {} top-level sections, {} elements",
            path.display(),
            outline.sections.len(),
            extracted.elements.len()
        );

        Document {
            file_path: path.to_path_buf(),
            title,
            sections: outline.sections,
            elements: extracted.elements,
            parse_warnings: extracted.warnings,
            attributes,
            details: FormatDetails::Markdown,
        }
    }
}

struct Extracted {
    outline: OutlineBuilder,
    elements: Vec<Element>,
    warnings: Vec<ParseWarning>,
}

struct OpenFence {
    fence: CodeFence,
    line: usize,
    language: Option<String>,
    body: Vec<String>,
}

struct Extractor {
    file: PathBuf,
    out: Extracted,
    fence: Option<OpenFence>,
    in_comment: bool,
    leaf: Option<PendingElement>,
}

impl Extractor {
    fn new(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            out: Extracted {
                outline: OutlineBuilder::new(),
                elements: Vec::new(),
                warnings: Vec::new(),
            },
            fence: None,
            in_comment: false,
            leaf: None,
        }
    }

    /// Handles the line at `idx` and returns the index of the next line to
    /// look at. Tables consume their rows in one go.
    fn line(&mut self, texts: &[&str], idx: usize) -> usize {
        let text = texts[idx];
        let number = idx + 1;

        if let Some(open) = &mut self.fence {
            if open.fence.closes(text) {
                self.close_fence(number);
            } else {
                open.body.push(text.to_string());
            }
            return idx + 1;
        }

        if self.in_comment {
            if let Some(close) = text.find("-->") {
                self.in_comment = syntax::ends_inside_comment(&text[close + 3..]);
            }
            return idx + 1;
        }
        if text.trim_start().starts_with("<!--") && syntax::ends_inside_comment(text) {
            self.flush_leaf();
            self.in_comment = true;
            return idx + 1;
        }
        if syntax::is_comment_only(text) {
            return idx + 1;
        }

        if let Some((fence, info)) = CodeFence::open(text) {
            self.flush_leaf();
            self.fence = Some(OpenFence {
                fence,
                line: number,
                language: info_language(info).map(str::to_string),
                body: Vec::new(),
            });
            return idx + 1;
        }

        let next = self.content_line(texts, idx);
        if syntax::ends_inside_comment(text) {
            self.flush_leaf();
            self.in_comment = true;
        }
        next
    }

    fn content_line(&mut self, texts: &[&str], idx: usize) -> usize {
        let text = texts[idx];
        let number = idx + 1;

        if text.trim().is_empty() {
            let resumable = self
                .leaf
                .as_ref()
                .is_some_and(|leaf| continues_after_blank(leaf.element_type()));
            if resumable && let Some(leaf) = &mut self.leaf {
                leaf.after_blank = true;
            } else {
                self.flush_leaf();
            }
            return idx + 1;
        }

        if let Some(heading) = syntax::heading(text) {
            self.flush_leaf();
            self.out.outline.push(Heading {
                title: heading.title,
                level: heading.markers - 1,
                file: self.file.clone(),
                line: number,
                anchor: heading.anchor,
            });
            return idx + 1;
        }

        self.collect_images(text, number);

        if let Some(body) = syntax::quote_body(text) {
            self.quote_line(body, number);
            return idx + 1;
        }

        if let Some(list_type) = markdown_list_item(text) {
            let same_list = self.leaf.as_ref().is_some_and(|leaf| {
                leaf.element_type() == ElementType::List
                    && leaf.attribute("list_type") == Some(list_type.as_str())
            });
            if same_list && let Some(list) = &mut self.leaf {
                list.push_item(number, text);
            } else {
                self.flush_leaf();
                let mut list = self
                    .start(ElementType::List, number)
                    .with_attribute("list_type", list_type.as_str());
                list.push_item(number, text);
                self.leaf = Some(list);
            }
            return idx + 1;
        }

        if let Some(leaf) = &mut self.leaf {
            let indented = text.starts_with("  ") || text.starts_with('\t');
            if leaf.element_type() == ElementType::List && (!leaf.after_blank || indented) {
                leaf.push_line(number, text);
                return idx + 1;
            }
            self.flush_leaf();
        }

        if text.contains('|')
            && let Some(separator) = texts.get(idx + 1)
            && syntax::is_table_separator(separator)
        {
            return self.table(texts, idx);
        }

        idx + 1
    }

    fn quote_line(&mut self, body: &str, number: usize) {
        if let Some(leaf) = &mut self.leaf
            && is_quote(leaf.element_type())
        {
            leaf.push_line(number, body);
            return;
        }
        self.flush_leaf();
        let leaf = match syntax::alert(body) {
            Some(kind) => {
                let mut leaf = self
                    .start(ElementType::Admonition, number)
                    .with_attribute("admonition_type", kind);
                leaf.extend_to(number);
                leaf
            }
            None => {
                let mut leaf = self.start(ElementType::Blockquote, number);
                leaf.push_line(number, body);
                leaf
            }
        };
        self.leaf = Some(leaf);
    }

    fn table(&mut self, texts: &[&str], header: usize) -> usize {
        let columns = syntax::table_cells(texts[header]);
        let separator_cells = syntax::table_cells(texts[header + 1]);
        if separator_cells != columns {
            self.out.warnings.push(ParseWarning {
                kind: ParseWarningKind::MalformedTable,
                file: self.file.clone(),
                line: header + 2,
                message: format!(
                    "Table separator has {separator_cells} cells but the header has {columns}"
                ),
            });
        }

        let mut end = header + 2;
        while end < texts.len() && !texts[end].trim().is_empty() && texts[end].contains('|') {
            end += 1;
        }
        let rows = end - header - 1;

        let element = Element::new(
            ElementType::Table,
            SourceLocation::spanning(&self.file, header + 1, end),
            self.out.outline.current_path(),
        )
        .with_attribute("columns", columns.to_string())
        .with_attribute("rows", rows.to_string())
        .with_attribute("content", texts[header..end].join("\n"));
        self.out.elements.push(element);
        end
    }

    fn collect_images(&mut self, text: &str, number: usize) {
        for (alt, target) in syntax::images(text) {
            let element = Element::new(
                ElementType::Image,
                SourceLocation::spanning(&self.file, number, number),
                self.out.outline.current_path(),
            )
            .with_attribute("target", target)
            .with_attribute("alt", alt);
            self.out.elements.push(element);
        }
    }

    fn close_fence(&mut self, close_line: usize) {
        if let Some(open) = self.fence.take() {
            self.push_fence(open, close_line);
        }
    }

    fn push_fence(&mut self, open: OpenFence, last_line: usize) {
        let is_plantuml = matches!(open.language.as_deref(), Some("plantuml" | "puml"));
        let element_type = if is_plantuml {
            ElementType::Plantuml
        } else {
            ElementType::Code
        };
        let mut element = Element::new(
            element_type,
            SourceLocation::spanning(&self.file, open.line, last_line),
            self.out.outline.current_path(),
        );
        if !is_plantuml && let Some(language) = open.language {
            element = element.with_attribute("language", language);
        }
        self.out
            .elements
            .push(element.with_attribute("content", open.body.join("\n")));
    }

    fn start(&self, element_type: ElementType, line: usize) -> PendingElement {
        PendingElement::new(element_type, &self.file, line, self.out.outline.current_path())
    }

    fn flush_leaf(&mut self) {
        if let Some(leaf) = self.leaf.take() {
            self.out.elements.push(leaf.finish());
        }
    }

    fn finish(mut self) -> Extracted {
        self.flush_leaf();
        if let Some(open) = self.fence.take() {
            let last_line = open.line + open.body.len();
            self.out.warnings.push(ParseWarning {
                kind: ParseWarningKind::UnclosedBlock,
                file: self.file.clone(),
                line: open.line,
                message: format!(
                    "Unclosed code fence opened at line {} runs to the end of the file",
                    open.line
                ),
            });
            self.push_fence(open, last_line);
        }
        self.out
    }
}

fn is_quote(element_type: ElementType) -> bool {
    matches!(element_type, ElementType::Blockquote | ElementType::Admonition)
}

// Lists and quotes may resume after a blank line; the next line decides.
fn continues_after_blank(element_type: ElementType) -> bool {
    element_type == ElementType::List || is_quote(element_type)
}
