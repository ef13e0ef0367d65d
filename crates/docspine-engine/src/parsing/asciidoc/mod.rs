//! AsciiDoc structure parser.
//!
//! Three passes over the input:
//! 1. [`preprocess`]: attributes, conditionals and includes produce a flat
//!    stream of visible lines.
//! 2. [`blocks`]: delimited blocks are located so their contents can be
//!    suppressed.
//! 3. Extraction: headings feed the outline builder, and elements and cross
//!    references are collected from the unsuppressed lines.

pub mod blocks;
pub mod conditional;
pub mod directive;
pub mod preprocess;
pub mod syntax;

use log::debug;
use std::path::{Path, PathBuf};

use crate::models::{
    AsciidocDetails, CrossReference, Document, Element, ElementType, FormatDetails, ParseWarning,
    ParseWarningKind, SourceLocation,
};

use super::elements::{PendingElement, asciidoc_list_item};
use super::outline::{Heading, OutlineBuilder};
use super::{ParseError, StructureParser, read_source};
use blocks::{BlockKind, BlockMap, DelimitedBlock, scan_blocks};
use preprocess::{Preprocessed, Preprocessor, SourceLine, effective_level};

#[derive(Debug, Clone)]
pub struct AsciidocParser {
    base_path: Option<PathBuf>,
    max_include_depth: usize,
}

impl Default for AsciidocParser {
    fn default() -> Self {
        Self {
            base_path: None,
            max_include_depth: Self::DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl AsciidocParser {
    pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 20;

    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors includes of files given by relative path.
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}

impl StructureParser for AsciidocParser {
    fn parse_file(&self, path: &Path) -> Result<Document, ParseError> {
        let content = read_source(path)?;
        Ok(self.parse_str(path, &content))
    }

    fn parse_str(&self, path: &Path, content: &str) -> Document {
        let pre = Preprocessor::new(self.base_path.as_deref(), self.max_include_depth)
            .run(path, content);
        let texts: Vec<&str> = pre.lines.iter().map(|l| l.text.as_str()).collect();
        let blocks = scan_blocks(&texts);

        let extracted = Extractor::new(&pre).run(&blocks);
        let outline = extracted.outline.finish(&pre.line_counts);

        let mut parse_warnings = pre.warnings;
        parse_warnings.extend(extracted.warnings);

        debug!(
            "Parsed {}: {} top-level sections, {} elements, {} includes",
            path.display(),
            outline.sections.len(),
            extracted.elements.len(),
            pre.includes.len()
        );

        Document {
            file_path: path.to_path_buf(),
            title: outline.title,
            sections: outline.sections,
            elements: extracted.elements,
            parse_warnings,
            attributes: pre.attributes,
            details: FormatDetails::Asciidoc(AsciidocDetails {
                includes: pre.includes,
                cross_references: extracted.cross_references,
                circular_includes: pre.circular_includes,
            }),
        }
    }
}

struct Extracted {
    outline: OutlineBuilder,
    elements: Vec<Element>,
    cross_references: Vec<CrossReference>,
    warnings: Vec<ParseWarning>,
}

struct Extractor<'p> {
    pre: &'p Preprocessed,
    out: Extracted,
    leaf: Option<PendingElement>,
    pending_anchor: Option<String>,
    pending_attribute: Option<String>,
}

impl<'p> Extractor<'p> {
    fn new(pre: &'p Preprocessed) -> Self {
        Self {
            pre,
            out: Extracted {
                outline: OutlineBuilder::new(),
                elements: Vec::new(),
                cross_references: Vec::new(),
                warnings: Vec::new(),
            },
            leaf: None,
            pending_anchor: None,
            pending_attribute: None,
        }
    }

    fn run(mut self, blocks: &BlockMap) -> Extracted {
        let pre = self.pre;
        for (idx, line) in pre.lines.iter().enumerate() {
            if blocks.is_suppressed(idx) {
                if let Some(block) = blocks.opening_at(idx) {
                    self.flush_leaf();
                    self.pending_anchor = None;
                    self.pending_attribute = None;
                    self.block(block);
                }
                continue;
            }
            self.line(line);
        }
        self.flush_leaf();
        self.out
    }

    fn line(&mut self, sl: &SourceLine) {
        let pre = self.pre;
        let text = sl.text.as_str();
        let file = pre.file(sl.file);

        if self.leaf.as_ref().is_some_and(|leaf| leaf.file() != file) {
            self.flush_leaf();
        }

        if text.trim().is_empty() {
            match self.open_list() {
                Some(list) => list.after_blank = true,
                None => self.flush_leaf(),
            }
            self.pending_anchor = None;
            self.pending_attribute = None;
            return;
        }
        if syntax::is_comment(text) {
            return;
        }

        self.collect_cross_references(sl);

        if let Some(id) = syntax::anchor(text) {
            self.flush_leaf();
            self.pending_anchor = Some(id.to_string());
            return;
        }
        if let Some(attribute) = syntax::block_attribute(text) {
            self.flush_leaf();
            self.pending_attribute = Some(attribute.to_string());
            return;
        }
        if let Some((markers, raw_title)) = syntax::heading(text) {
            self.flush_leaf();
            let title = syntax::substitute(raw_title, &pre.attributes).into_owned();
            self.out.outline.push(Heading {
                title,
                level: effective_level(markers, sl.level_offset),
                file: file.to_path_buf(),
                line: sl.line,
                anchor: self.pending_anchor.take(),
            });
            self.pending_attribute = None;
            return;
        }
        self.pending_anchor = None;

        if let Some((target, alt)) = syntax::image(text) {
            self.flush_leaf();
            let target = syntax::substitute(target, &pre.attributes).into_owned();
            let element = Element::new(
                ElementType::Image,
                SourceLocation::spanning(file, sl.line, sl.line),
                self.out.outline.current_path(),
            )
            .with_attribute("target", target)
            .with_attribute("alt", alt);
            self.out.elements.push(element);
            self.pending_attribute = None;
            return;
        }

        if let Some(list_type) = asciidoc_list_item(text) {
            let same_list = self
                .leaf
                .as_ref()
                .is_some_and(|leaf| leaf.attribute("list_type") == Some(list_type.as_str()));
            if same_list && let Some(list) = self.open_list() {
                list.push_item(sl.line, text);
            } else {
                self.flush_leaf();
                let mut list = self
                    .start(ElementType::List, file, sl.line)
                    .with_attribute("list_type", list_type.as_str());
                list.push_item(sl.line, text);
                self.leaf = Some(list);
            }
            self.pending_attribute = None;
            return;
        }

        if let Some(leaf) = &mut self.leaf {
            if !(leaf.element_type() == ElementType::List && leaf.after_blank) {
                leaf.push_line(sl.line, text);
                return;
            }
            self.flush_leaf();
        }

        if let Some((kind, body)) = syntax::admonition(text) {
            let mut leaf = self
                .start(ElementType::Admonition, file, sl.line)
                .with_attribute("admonition_type", kind);
            leaf.push_line(sl.line, body);
            self.leaf = Some(leaf);
            return;
        }

        if let Some(attribute) = self.pending_attribute.take() {
            let leaf = if let Some(kind) = syntax::admonition_style(&attribute) {
                Some(
                    self.start(ElementType::Admonition, file, sl.line)
                        .with_attribute("admonition_type", kind),
                )
            } else if syntax::block_style(&attribute) == "quote" {
                Some(self.start(ElementType::Blockquote, file, sl.line))
            } else {
                None
            };
            if let Some(mut leaf) = leaf {
                leaf.push_line(sl.line, text);
                self.leaf = Some(leaf);
            }
        }
    }

    fn block(&mut self, block: &DelimitedBlock) {
        let pre = self.pre;
        let lines = &pre.lines;
        let Some(open) = lines.get(block.open) else {
            return;
        };
        let file = pre.file(open.file);

        let (body_end, last_line) = match block.close {
            Some(close) => {
                let end = lines
                    .get(close)
                    .filter(|l| l.file == open.file)
                    .map_or(open.line, |l| l.line);
                (close, end)
            }
            None => {
                let (kind, noun) = if block.kind == BlockKind::Table {
                    (ParseWarningKind::UnclosedTable, "table")
                } else {
                    (ParseWarningKind::UnclosedBlock, block.kind.name())
                };
                self.out.warnings.push(ParseWarning {
                    kind,
                    file: file.to_path_buf(),
                    line: open.line,
                    message: format!(
                        "Unclosed {noun} block: '{}' opened at line {} has no closing delimiter",
                        open.text.trim(),
                        open.line
                    ),
                });
                let end = lines[block.open..]
                    .iter()
                    .rev()
                    .find(|l| l.file == open.file)
                    .map_or(open.line, |l| l.line);
                (lines.len(), end)
            }
        };
        let body: Vec<&str> = lines[block.open + 1..body_end]
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        let content = body.join("\n");

        let attribute = block.attribute.as_deref().unwrap_or("");
        let style = syntax::block_style(attribute);
        let location = SourceLocation::spanning(file, open.line, last_line);
        let parent = self.out.outline.current_path();

        let element = match block.kind {
            BlockKind::Listing | BlockKind::Literal if style == "plantuml" => {
                Some(Element::new(ElementType::Plantuml, location, parent))
            }
            BlockKind::Listing | BlockKind::Literal
                if block.kind == BlockKind::Listing || style == "source" =>
            {
                let mut element = Element::new(ElementType::Code, location, parent);
                if let Some(language) = syntax::source_language(attribute) {
                    element = element.with_attribute("language", language);
                }
                Some(element)
            }
            BlockKind::Table => {
                let (columns, rows) = table_shape(attribute, &body);
                Some(
                    Element::new(ElementType::Table, location, parent)
                        .with_attribute("columns", columns.to_string())
                        .with_attribute("rows", rows.to_string()),
                )
            }
            BlockKind::Quote => Some(Element::new(ElementType::Blockquote, location, parent)),
            BlockKind::Example | BlockKind::Open | BlockKind::Sidebar => {
                syntax::admonition_style(attribute).map(|kind| {
                    Element::new(ElementType::Admonition, location, parent)
                        .with_attribute("admonition_type", kind)
                })
            }
            _ => None,
        };

        if let Some(element) = element {
            self.out.elements.push(element.with_attribute("content", content));
        }
    }

    fn open_list(&mut self) -> Option<&mut PendingElement> {
        self.leaf
            .as_mut()
            .filter(|leaf| leaf.element_type() == ElementType::List)
    }

    fn start(&self, element_type: ElementType, file: &Path, line: usize) -> PendingElement {
        PendingElement::new(element_type, file, line, self.out.outline.current_path())
    }

    fn flush_leaf(&mut self) {
        if let Some(leaf) = self.leaf.take() {
            self.out.elements.push(leaf.finish());
        }
    }

    fn collect_cross_references(&mut self, sl: &SourceLine) {
        let pre = self.pre;
        let file = pre.file(sl.file);
        for (target, text) in syntax::cross_references(&sl.text) {
            self.out.cross_references.push(CrossReference {
                target: target.to_string(),
                text: text.map(str::to_string),
                source_location: SourceLocation::new(file, sl.line),
            });
        }
    }
}

/// Column and row counts of a `|===` table body. Columns come from a `cols`
/// attribute when present, otherwise from the cells on the first row.
fn table_shape(attribute: &str, body: &[&str]) -> (usize, usize) {
    let cells_per_line: Vec<usize> = body
        .iter()
        .map(|line| line.trim())
        .filter(|line| line.starts_with('|'))
        .map(|line| line.split('|').count() - 1)
        .collect();
    let total: usize = cells_per_line.iter().sum();

    let columns = cols_attribute(attribute)
        .or_else(|| cells_per_line.first().copied())
        .unwrap_or(0);
    let rows = if columns == 0 {
        0
    } else {
        total.div_ceil(columns)
    };
    (columns, rows)
}

fn cols_attribute(attribute: &str) -> Option<usize> {
    let start = attribute.find("cols=")? + "cols=".len();
    let rest = attribute[start..].trim_start_matches('"');
    let spec = rest.split('"').next()?;
    if let Ok(n) = spec.trim().parse::<usize>() {
        return Some(n);
    }
    let count = spec
        .split(',')
        .map(|entry| match entry.split_once('*') {
            Some((n, _)) => n.trim().parse::<usize>().unwrap_or(1),
            None => 1,
        })
        .sum();
    Some(count)
}
