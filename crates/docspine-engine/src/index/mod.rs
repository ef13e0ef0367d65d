//! The process-wide structure index.
//!
//! Documents are owned by the index; sections are addressed by a
//! document number plus the child indices leading from its root, so no
//! references into the section trees are stored.

use log::warn;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::io::relative_doc_path;
use crate::models::{
    CircularInclude, Document, DocumentFormat, Element, ElementType, ParseWarning, Section,
};

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Document has an empty file path")]
    EmptyFilePath,
    #[error(
        "Section '{path}' in {} has level {level}, not deeper than its parent's level {parent_level}",
        .file.display()
    )]
    LevelOrder {
        file: PathBuf,
        path: String,
        level: usize,
        parent_level: usize,
    },
}

/// Position of a section: owning document and child indices from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SectionId {
    doc: usize,
    steps: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    id: SectionId,
}

/// A section resolved through the index, with its composite key and the
/// document it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct SectionRef<'a> {
    pub key: &'a str,
    pub section: &'a Section,
    pub document: &'a Document,
}

impl Deref for SectionRef<'_> {
    type Target = Section;

    fn deref(&self) -> &Section {
        self.section
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Title,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub path: String,
    pub title: String,
    pub level: usize,
    pub file: PathBuf,
    pub line: usize,
    pub match_type: MatchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionView {
    pub path: String,
    pub title: String,
    pub level: usize,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    /// Number of direct children, including any cut off by a depth limit.
    pub child_count: usize,
    pub children: Vec<SectionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentView {
    pub key: String,
    pub file: PathBuf,
    pub title: String,
    pub format: DocumentFormat,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureView {
    pub documents: Vec<DocumentView>,
    pub total_sections: usize,
}

const CONTEXT_RADIUS: usize = 40;

#[derive(Debug, Default)]
pub struct StructureIndex {
    root: Option<PathBuf>,
    documents: Vec<Document>,
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    file_sections: BTreeMap<PathBuf, Vec<usize>>,
    circular_include_errors: Vec<CircularInclude>,
    parse_warnings: Vec<ParseWarning>,
}

impl StructureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document keys become paths relative to `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Replaces the indexed content with `documents`.
    ///
    /// Input is checked before anything is replaced, so a failed build leaves
    /// the previous state in place.
    pub fn build_from_documents(&mut self, documents: Vec<Document>) -> Result<(), IndexError> {
        for doc in &documents {
            check_document(doc)?;
        }

        self.documents = documents;
        self.entries.clear();
        self.by_key.clear();
        self.file_sections.clear();
        self.circular_include_errors.clear();
        self.parse_warnings.clear();

        for doc_idx in 0..self.documents.len() {
            self.index_document(doc_idx);
        }
        Ok(())
    }

    fn index_document(&mut self, doc_idx: usize) {
        let doc = &self.documents[doc_idx];
        let doc_key = self.document_key(&doc.file_path);
        let title_path = title_path(doc).map(str::to_string);

        let mut ids = Vec::new();
        for (root_idx, root) in doc.sections.iter().enumerate() {
            collect_ids(root, vec![root_idx], &mut ids);
        }

        let mut top_level = Vec::new();
        for (steps, path) in ids {
            let key = composite_key(&doc_key, &path, title_path.as_deref());
            let entry_idx = self.entries.len();
            if steps.len() == 1 {
                top_level.push(entry_idx);
            }
            if let Some(&existing) = self.by_key.get(&key) {
                let first = &self.documents[self.entries[existing].id.doc].file_path;
                warn!(
                    "Duplicate section path '{key}' in {}; keeping the one from {}",
                    doc.file_path.display(),
                    first.display()
                );
            } else {
                self.by_key.insert(key.clone(), entry_idx);
            }
            self.entries.push(Entry {
                key,
                id: SectionId {
                    doc: doc_idx,
                    steps,
                },
            });
        }

        self.file_sections
            .entry(doc.file_path.clone())
            .or_default()
            .extend(top_level);

        for warning in &doc.parse_warnings {
            warn!(
                "{}:{}: {} ({})",
                warning.file.display(),
                warning.line,
                warning.message,
                warning.kind
            );
        }
        for circular in doc.circular_includes() {
            warn!("{}: {}", circular.file.display(), circular.message);
        }
        self.parse_warnings.extend(doc.parse_warnings.iter().cloned());
        self.circular_include_errors
            .extend(doc.circular_includes().iter().cloned());
    }

    /// Key of a document: its path relative to the root without extension,
    /// or the bare file stem.
    pub fn document_key(&self, file: &Path) -> String {
        if let Some(root) = &self.root
            && let Some(relative) = relative_doc_path(root, file)
        {
            let full = relative.as_str();
            return match relative.extension() {
                Some(ext) => full
                    .strip_suffix(ext)
                    .and_then(|s| s.strip_suffix('.'))
                    .unwrap_or(full)
                    .to_string(),
                None => full.to_string(),
            };
        }
        file.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Exact lookup by composite path. `doc:` with nothing after the colon
    /// addresses the document root like the bare key.
    pub fn get_section(&self, path: &str) -> Option<&Section> {
        self.locate(path).map(|found| found.section)
    }

    /// Like [`get_section`](Self::get_section), but also returns the key and
    /// owning document.
    pub fn locate(&self, path: &str) -> Option<SectionRef<'_>> {
        let path = path.trim();
        let path = path.strip_suffix(':').unwrap_or(path);
        let &entry_idx = self.by_key.get(path)?;
        self.entry_ref(entry_idx)
    }

    fn entry_ref(&self, entry_idx: usize) -> Option<SectionRef<'_>> {
        let entry = self.entries.get(entry_idx)?;
        let document = self.documents.get(entry.id.doc)?;
        let section = resolve(document, &entry.id.steps)?;
        Some(SectionRef {
            key: &entry.key,
            section,
            document,
        })
    }

    /// Sections in index order, each under the key it is reachable by.
    fn reachable(&self) -> impl Iterator<Item = SectionRef<'_>> {
        (0..self.entries.len())
            .filter(|&idx| self.by_key.get(&self.entries[idx].key) == Some(&idx))
            .filter_map(|idx| self.entry_ref(idx))
    }

    /// Case-insensitive substring search over section titles and the text of
    /// elements inside each section. An empty query or a zero limit finds
    /// nothing.
    pub fn search(&self, query: &str, scope: Option<&str>, limit: usize) -> Vec<SearchResult> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }

        self.reachable()
            .filter(|found| scope.is_none_or(|scope| in_scope(found.key, scope)))
            .filter_map(|found| {
                let (match_type, context) = if found.title.to_lowercase().contains(&needle) {
                    (MatchType::Title, None)
                } else {
                    let text = found
                        .document
                        .elements
                        .iter()
                        .filter(|e| e.parent_section == found.path)
                        .filter_map(Element::content)
                        .find(|content| content.to_lowercase().contains(&needle))?;
                    (MatchType::Content, Some(snippet(text, &needle)))
                };
                Some(SearchResult {
                    path: found.key.to_string(),
                    title: found.title.clone(),
                    level: found.level,
                    file: found.source_location.file.clone(),
                    line: found.line(),
                    match_type,
                    context,
                })
            })
            .take(limit)
            .collect()
    }

    /// Whether any section falls under `scope`, using the same rule as
    /// [`search`](Self::search).
    pub fn scope_exists(&self, scope: &str) -> bool {
        self.reachable().any(|found| in_scope(found.key, scope))
    }

    /// Composite keys of the direct children of `found`.
    pub fn child_keys(&self, found: &SectionRef<'_>) -> Vec<String> {
        let doc_key = self.document_key(&found.document.file_path);
        let title_path = title_path(found.document);
        found
            .children
            .iter()
            .map(|child| composite_key(&doc_key, &child.path, title_path))
            .collect()
    }

    /// Every section, across all documents, at exactly `level`.
    pub fn sections_at_level(&self, level: usize) -> Vec<SectionRef<'_>> {
        self.reachable().filter(|s| s.level == level).collect()
    }

    /// Serializable outline. `max_depth` counts from each document's root
    /// sections, which sit at depth 0.
    pub fn get_structure(&self, max_depth: Option<usize>) -> StructureView {
        let mut total_sections = 0;
        let mut documents = Vec::with_capacity(self.documents.len());
        for doc in &self.documents {
            let doc_key = self.document_key(&doc.file_path);
            let title_path = title_path(doc);
            let keys = KeyScheme {
                doc_key: &doc_key,
                title_path,
            };
            let sections = doc
                .sections
                .iter()
                .map(|root| section_view(root, &keys, 0, max_depth, &mut total_sections))
                .collect();
            documents.push(DocumentView {
                key: doc_key.clone(),
                file: doc.file_path.clone(),
                title: doc.title.clone(),
                format: doc.format(),
                sections,
            });
        }
        StructureView {
            documents,
            total_sections,
        }
    }

    /// Elements of every document, optionally of one type only.
    pub fn elements(&self, element_type: Option<ElementType>) -> Vec<&Element> {
        self.documents
            .iter()
            .flat_map(|doc| doc.elements.iter())
            .filter(|e| element_type.is_none_or(|t| e.element_type == t))
            .collect()
    }

    /// Top-level sections owned by `file`.
    pub fn sections_for_file(&self, file: &Path) -> Vec<&Section> {
        self.file_sections
            .get(file)
            .into_iter()
            .flatten()
            .filter_map(|&idx| self.entry_ref(idx))
            .map(|found| found.section)
            .collect()
    }

    /// Files that own indexed documents.
    pub fn indexed_files(&self) -> impl Iterator<Item = &Path> {
        self.file_sections.keys().map(PathBuf::as_path)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn circular_include_errors(&self) -> &[CircularInclude] {
        &self.circular_include_errors
    }

    pub fn parse_warnings(&self) -> &[ParseWarning] {
        &self.parse_warnings
    }

    pub fn section_count(&self) -> usize {
        self.by_key.len()
    }
}

fn check_document(doc: &Document) -> Result<(), IndexError> {
    if doc.file_path.as_os_str().is_empty() {
        return Err(IndexError::EmptyFilePath);
    }
    fn check_children(file: &Path, parent: &Section) -> Result<(), IndexError> {
        for child in &parent.children {
            if child.level <= parent.level {
                return Err(IndexError::LevelOrder {
                    file: file.to_path_buf(),
                    path: child.path.clone(),
                    level: child.level,
                    parent_level: parent.level,
                });
            }
            check_children(file, child)?;
        }
        Ok(())
    }
    doc.sections
        .iter()
        .try_for_each(|root| check_children(&doc.file_path, root))
}

struct KeyScheme<'a> {
    doc_key: &'a str,
    title_path: Option<&'a str>,
}

fn title_path(doc: &Document) -> Option<&str> {
    doc.sections
        .first()
        .filter(|s| s.level == 0)
        .map(|s| s.path.as_str())
}

fn section_view(
    section: &Section,
    keys: &KeyScheme<'_>,
    depth: usize,
    max_depth: Option<usize>,
    total: &mut usize,
) -> SectionView {
    *total += 1;
    let expand = max_depth.is_none_or(|max| depth < max);
    let children = if expand {
        section
            .children
            .iter()
            .map(|child| section_view(child, keys, depth + 1, max_depth, total))
            .collect()
    } else {
        Vec::new()
    };
    SectionView {
        path: composite_key(keys.doc_key, &section.path, keys.title_path),
        title: section.title.clone(),
        level: section.level,
        line: section.line(),
        end_line: section.source_location.end_line,
        child_count: section.children.len(),
        children,
    }
}

// Pre-order, matching document order.
fn collect_ids(section: &Section, steps: Vec<usize>, out: &mut Vec<(Vec<usize>, String)>) {
    out.push((steps.clone(), section.path.clone()));
    for (idx, child) in section.children.iter().enumerate() {
        let mut child_steps = steps.clone();
        child_steps.push(idx);
        collect_ids(child, child_steps, out);
    }
}

fn resolve<'a>(document: &'a Document, steps: &[usize]) -> Option<&'a Section> {
    let (first, rest) = steps.split_first()?;
    let mut section = document.sections.get(*first)?;
    for &idx in rest {
        section = section.children.get(idx)?;
    }
    Some(section)
}

/// Composite key of a section. The title section maps to the bare document
/// key and sections below it drop the title's segment.
fn composite_key(doc_key: &str, section_path: &str, title_path: Option<&str>) -> String {
    match title_path {
        Some(title) if section_path == title => doc_key.to_string(),
        Some(title) => match section_path
            .strip_prefix(title)
            .and_then(|rest| rest.strip_prefix('.'))
        {
            Some(rest) => format!("{doc_key}:{rest}"),
            None => format!("{doc_key}:{section_path}"),
        },
        None => format!("{doc_key}:{section_path}"),
    }
}

/// Whether `key` is `scope` itself or lies beneath it.
fn in_scope(key: &str, scope: &str) -> bool {
    let scope = scope.trim().trim_end_matches(':');
    if key == scope {
        return true;
    }
    let separator = if scope.contains(':') { '.' } else { ':' };
    key.strip_prefix(scope)
        .is_some_and(|rest| rest.starts_with(separator))
}

fn snippet(text: &str, needle: &str) -> String {
    let lower = text.to_lowercase();
    let Some(pos) = lower.find(needle) else {
        return text.chars().take(CONTEXT_RADIUS * 2).collect();
    };
    // Lowercasing can shift byte offsets for some scripts; fall back to
    // the start of the text when the position is not a char boundary.
    let pos = if text.is_char_boundary(pos) { pos } else { 0 };
    let start = text[..pos]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS)
        .map_or(0, |(i, _)| i);
    let tail = &text[pos..];
    let end = tail
        .char_indices()
        .nth(needle.chars().count() + CONTEXT_RADIUS)
        .map_or(text.len(), |(i, _)| pos + i);
    text[start..end].replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormatDetails, SourceLocation};
    use crate::parsing::{AsciidocParser, MarkdownParser, StructureParser};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn adoc(path: &str, content: &str) -> Document {
        AsciidocParser::new().parse_str(Path::new(path), content)
    }

    fn md(path: &str, content: &str) -> Document {
        MarkdownParser::new().parse_str(Path::new(path), content)
    }

    fn index_of(documents: Vec<Document>) -> StructureIndex {
        let mut index = StructureIndex::new();
        index.build_from_documents(documents).unwrap();
        index
    }

    fn guide() -> Document {
        adoc(
            "docs/guide.adoc",
            "= Guide\n\n== Installation\n\nRun the installer.\n\n=== Linux\n\n----\napt install docspine\n----\n\n== Usage\n\nNOTE: Authentication is required.\n",
        )
    }

    #[test]
    fn keys_drop_the_title_segment() {
        // Given an indexed guide
        let index = index_of(vec![guide()]);

        // Then the title maps to the bare stem and the rest hang below it
        let keys: Vec<_> = index.reachable().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec!["guide", "guide:installation", "guide:installation.linux", "guide:usage"]
        );
        assert_eq!(index.get_section("guide").unwrap().title, "Guide");
        assert_eq!(index.get_section("guide:").unwrap().title, "Guide");
        assert_eq!(index.get_section("guide:installation.linux").unwrap().level, 2);
        assert!(index.get_section("guide:missing").is_none());
        assert!(index.get_section("installation").is_none());
    }

    #[test]
    fn untitled_documents_keep_full_paths() {
        let index = index_of(vec![md("notes.md", "## One\n\n### Deep\n\n## Two\n")]);
        assert!(index.get_section("notes:one.deep").is_some());
        assert!(index.get_section("notes:two").is_some());
        assert!(index.get_section("notes").is_none());
    }

    #[test]
    fn root_makes_keys_relative_paths() {
        let mut index = StructureIndex::with_root("docs");
        index.build_from_documents(vec![guide()]).unwrap();
        assert_eq!(index.document_key(Path::new("docs/api/ref.adoc")), "api/ref");
        assert!(index.get_section("guide:usage").is_some());
        assert_eq!(index.document_key(Path::new("/elsewhere/x.md")), "x");
    }

    #[test]
    fn duplicate_keys_keep_the_first_document() {
        // Given two files with the same stem
        let first = adoc("a/readme.adoc", "= First\n\n== Shared\n");
        let second = md("b/readme.md", "# Second\n\n## Shared\n");

        // When indexing both
        let index = index_of(vec![first, second]);

        // Then the first one wins the shared keys
        assert_eq!(index.get_section("readme").unwrap().title, "First");
        let shared = index.locate("readme:shared").unwrap();
        assert_eq!(shared.document.file_path, PathBuf::from("a/readme.adoc"));
        assert_eq!(index.section_count(), 2);
    }

    #[test]
    fn rebuild_replaces_previous_state() {
        let mut index = index_of(vec![guide()]);
        index
            .build_from_documents(vec![md("other.md", "# Other\n")])
            .unwrap();
        assert!(index.get_section("guide").is_none());
        assert!(index.get_section("other").is_some());
        assert_eq!(index.documents().len(), 1);
    }

    #[test]
    fn malformed_documents_are_rejected_without_touching_state() {
        // Given an index holding the guide
        let mut index = index_of(vec![guide()]);

        // When a document with a child no deeper than its parent arrives
        let mut broken = md("broken.md", "# Top\n\n## Child\n");
        broken.sections[0].children[0].level = 0;
        let err = index.build_from_documents(vec![broken]).unwrap_err();

        // Then the build fails and the guide is still there
        assert!(matches!(err, IndexError::LevelOrder { level: 0, parent_level: 0, .. }));
        assert!(index.get_section("guide").is_some());
    }

    #[test]
    fn empty_file_path_is_rejected() {
        let doc = Document {
            file_path: PathBuf::new(),
            title: String::new(),
            sections: vec![],
            elements: vec![],
            parse_warnings: vec![],
            attributes: BTreeMap::new(),
            details: FormatDetails::Markdown,
        };
        let mut index = StructureIndex::new();
        assert!(matches!(
            index.build_from_documents(vec![doc]),
            Err(IndexError::EmptyFilePath)
        ));
    }

    #[test]
    fn search_matches_titles_and_element_content() {
        let index = index_of(vec![guide()]);

        let results = index.search("AUTHENTICATION", None, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "guide:usage");
        assert_eq!(results[0].match_type, MatchType::Content);
        assert!(results[0].context.as_deref().unwrap().contains("Authentication"));

        let results = index.search("linux", None, 10);
        assert_eq!(results[0].path, "guide:installation.linux");
        assert_eq!(results[0].match_type, MatchType::Title);
    }

    #[rstest]
    #[case::whole_document(Some("guide"), 3)]
    #[case::subtree(Some("guide:installation"), 2)]
    #[case::leaf(Some("guide:installation.linux"), 1)]
    #[case::unknown(Some("nowhere"), 0)]
    #[case::unscoped(None, 3)]
    fn search_scope_restricts_to_subtree(#[case] scope: Option<&str>, #[case] expected: usize) {
        // Given titles that all contain an "i"
        let index = index_of(vec![guide()]);

        // When searching for it within a scope
        let results: Vec<_> = index.search("i", scope, 50);

        // Then only sections at or below the scope are found
        let titled = results
            .iter()
            .filter(|r| r.match_type == MatchType::Title)
            .count();
        assert_eq!(titled, expected);
    }

    #[test]
    fn search_respects_limit_and_empty_queries() {
        let index = index_of(vec![guide()]);
        assert_eq!(index.search("n", None, 1).len(), 1);
        assert!(index.search("n", None, 0).is_empty());
        assert!(index.search("   ", None, 10).is_empty());
    }

    #[rstest]
    #[case("guide", true)]
    #[case("guide:", true)]
    #[case("guide:installation.linux", true)]
    #[case("guide:install", false)]
    #[case("gui", false)]
    fn scope_exists_matches_whole_segments(#[case] scope: &str, #[case] expected: bool) {
        let index = index_of(vec![guide()]);
        assert_eq!(index.scope_exists(scope), expected);
    }

    #[test]
    fn child_keys_use_composite_paths() {
        let index = index_of(vec![guide()]);

        let root = index.locate("guide").unwrap();
        assert_eq!(
            index.child_keys(&root),
            vec!["guide:installation", "guide:usage"]
        );
        let leaf = index.locate("guide:installation.linux").unwrap();
        assert!(index.child_keys(&leaf).is_empty());
    }

    #[test]
    fn sections_at_level_span_documents() {
        let index = index_of(vec![guide(), md("notes.md", "# Notes\n\n## Todo\n")]);
        let level_one: Vec<_> = index.sections_at_level(1).iter().map(|s| s.key).collect();
        assert_eq!(level_one, vec!["guide:installation", "guide:usage", "notes:todo"]);
        assert!(index.sections_at_level(5).is_empty());
    }

    #[test]
    fn structure_can_be_truncated() {
        let index = index_of(vec![guide()]);

        let full = index.get_structure(None);
        assert_eq!(full.total_sections, 4);
        let root = &full.documents[0].sections[0];
        assert_eq!(root.path, "guide");
        assert_eq!(root.children[0].children[0].path, "guide:installation.linux");

        let shallow = index.get_structure(Some(0));
        let root = &shallow.documents[0].sections[0];
        assert!(root.children.is_empty());
        assert_eq!(root.child_count, 2);
        assert_eq!(shallow.total_sections, 1);
    }

    #[test]
    fn structure_renders_as_expected() {
        let index = index_of(vec![guide()]);
        let outline: Vec<String> = index
            .reachable()
            .map(|s| format!("{}{} [{}]", "  ".repeat(s.level), s.title, s.key))
            .collect();
        insta::assert_snapshot!(outline.join("\n"), @r"
        Guide [guide]
          Installation [guide:installation]
            Linux [guide:installation.linux]
          Usage [guide:usage]
        ");
    }

    #[test]
    fn elements_filter_by_type() {
        let index = index_of(vec![guide()]);
        assert_eq!(index.elements(None).len(), 2);
        let code = index.elements(Some(ElementType::Code));
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].parent_section, "guide.installation.linux");
    }

    #[test]
    fn file_map_lists_top_level_sections() {
        let index = index_of(vec![guide()]);
        let sections = index.sections_for_file(Path::new("docs/guide.adoc"));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Guide");
        assert_eq!(index.indexed_files().count(), 1);
    }

    #[test]
    fn warnings_and_cycles_are_aggregated() {
        // Given a document carrying a parse warning and a cycle record
        let mut doc = adoc("a.adoc", "= A\n\n----\nunclosed\n");
        if let FormatDetails::Asciidoc(details) = &mut doc.details {
            details.circular_includes.push(CircularInclude {
                file: PathBuf::from("a.adoc"),
                message: "Circular include detected: a.adoc -> a.adoc".to_string(),
                include_chain: vec![PathBuf::from("a.adoc"), PathBuf::from("a.adoc")],
            });
        }

        // When indexing it
        let index = index_of(vec![doc]);

        // Then both surface at index level
        assert_eq!(index.parse_warnings().len(), 1);
        assert_eq!(index.circular_include_errors().len(), 1);
    }

    #[test]
    fn section_ref_derefs_to_section() {
        let index = index_of(vec![guide()]);
        let found = index.locate("guide:usage").unwrap();
        assert_eq!(found.title, "Usage");
        assert_eq!(found.source_location, SourceLocation::spanning("docs/guide.adoc", 13, 15));
    }

    #[rstest]
    #[case("doc", "title", Some("title"), "doc")]
    #[case("doc", "title.a", Some("title"), "doc:a")]
    #[case("doc", "title.a.b", Some("title"), "doc:a.b")]
    #[case("doc", "other", Some("title"), "doc:other")]
    #[case("doc", "a", None, "doc:a")]
    fn builds_composite_keys(
        #[case] doc: &str,
        #[case] path: &str,
        #[case] title: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(composite_key(doc, path, title), expected);
    }

    #[test]
    fn snippet_centres_on_match() {
        let text = format!("{}needle{}", "a".repeat(100), "b".repeat(100));
        let context = snippet(&text, "needle");
        assert!(context.contains("needle"));
        assert!(context.len() < text.len());
    }
}
