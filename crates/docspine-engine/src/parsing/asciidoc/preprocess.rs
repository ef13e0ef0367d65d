//! First pass over AsciiDoc input: header attributes, conditional regions
//! and include expansion. Produces the flat stream of visible lines that the
//! block and section passes work on, each line remembering where it came from.

use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use xi_rope::Rope;

use crate::models::{CircularInclude, IncludeInfo, ParseWarning, ParseWarningKind, SourceLocation};
use crate::parsing::rope::{line_count, lines_with_spans};

use super::blocks::BlockKind;
use super::conditional::ConditionStack;
use super::directive::{Directive, apply_level_offset, parse_include_options};
use super::syntax;

/// A visible line after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Index into [`Preprocessed::files`].
    pub file: usize,
    pub line: usize,
    pub text: String,
    /// Heading level shift from `leveloffset` on the enclosing includes.
    pub level_offset: i32,
}

#[derive(Debug, Default)]
pub struct Preprocessed {
    pub files: Vec<PathBuf>,
    pub line_counts: HashMap<PathBuf, usize>,
    pub lines: Vec<SourceLine>,
    pub attributes: BTreeMap<String, String>,
    pub includes: Vec<IncludeInfo>,
    pub circular_includes: Vec<CircularInclude>,
    pub warnings: Vec<ParseWarning>,
}

impl Preprocessed {
    pub fn file(&self, id: usize) -> &Path {
        self.files.get(id).map_or(Path::new(""), PathBuf::as_path)
    }
}

pub struct Preprocessor<'a> {
    base_path: Option<&'a Path>,
    max_include_depth: usize,
    out: Preprocessed,
    header_open: bool,
    /// Closing delimiter of a verbatim block opened inside the header.
    header_block: Option<String>,
    /// Canonical paths of the files currently being expanded.
    chain: Vec<PathBuf>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(base_path: Option<&'a Path>, max_include_depth: usize) -> Self {
        Self {
            base_path,
            max_include_depth,
            out: Preprocessed::default(),
            header_open: true,
            header_block: None,
            chain: Vec::new(),
        }
    }

    pub fn run(mut self, file: &Path, content: &str) -> Preprocessed {
        self.expand(file, content, 0, 0);
        self.out
    }

    fn expand(&mut self, file: &Path, content: &str, depth: usize, level_offset: i32) {
        let rope = Rope::from(content);
        let file_id = self.out.files.len();
        self.out.files.push(file.to_path_buf());
        self.out
            .line_counts
            .insert(file.to_path_buf(), line_count(&rope));
        self.chain.push(canonical_or_same(file));

        let mut conditions = ConditionStack::default();
        for lr in lines_with_spans(&rope) {
            let text = lr.content();
            match Directive::parse(text) {
                Some(Directive::Conditional { condition, inline }) => {
                    let holds = condition.evaluate(&self.out.attributes);
                    match inline {
                        Some(inline) => {
                            if conditions.is_visible() && holds {
                                self.visible_line(file_id, lr.number, inline, depth, level_offset);
                            }
                        }
                        None => conditions.open(lr.number, holds),
                    }
                }
                Some(Directive::Ifeval) => conditions.open(lr.number, true),
                Some(Directive::Endif) => {
                    if !conditions.close() {
                        self.warn(
                            ParseWarningKind::UnmatchedEndif,
                            file,
                            lr.number,
                            format!("'{text}' has no matching ifdef or ifndef"),
                        );
                    }
                }
                _ if !conditions.is_visible() => {}
                _ => self.visible_line(file_id, lr.number, text, depth, level_offset),
            }
        }

        let unclosed: Vec<usize> = conditions.unclosed_lines().collect();
        for line in unclosed {
            self.warn(
                ParseWarningKind::UnclosedConditional,
                file,
                line,
                format!("Conditional opened at line {line} is never closed with endif"),
            );
        }
        self.chain.pop();
    }

    fn visible_line(
        &mut self,
        file_id: usize,
        line: usize,
        text: &str,
        depth: usize,
        level_offset: i32,
    ) {
        let directive = Directive::parse(text);
        if let Some(Directive::Include { target, options }) = directive {
            self.include(file_id, line, target, options, depth, level_offset);
            return;
        }
        if self.header_open && self.verbatim_in_header(text) {
            self.emit(file_id, line, text, level_offset);
            return;
        }

        match directive {
            Some(Directive::AttributeEntry { name, value, unset }) if self.header_open => {
                if unset {
                    self.out.attributes.remove(name);
                } else {
                    let value = syntax::substitute(value, &self.out.attributes).into_owned();
                    self.out.attributes.insert(name.to_string(), value);
                }
                return;
            }
            Some(Directive::Escaped(literal)) => {
                self.emit(file_id, line, literal, level_offset);
                return;
            }
            _ => {}
        }

        if self.header_open
            && let Some((markers, _)) = syntax::heading(text)
            && effective_level(markers, level_offset) >= 1
        {
            self.header_open = false;
        }
        self.emit(file_id, line, text, level_offset);
    }

    /// Whether `text` belongs to a verbatim block inside the header,
    /// delimiters included. Such lines neither set attributes nor close the
    /// header.
    fn verbatim_in_header(&mut self, text: &str) -> bool {
        if let Some(token) = &self.header_block {
            if text.trim_end() == token {
                self.header_block = None;
            }
            return true;
        }
        match BlockKind::from_delimiter(text) {
            Some((kind, token)) if kind.is_verbatim() => {
                self.header_block = Some(token.to_string());
                true
            }
            _ => false,
        }
    }

    fn include(
        &mut self,
        file_id: usize,
        line: usize,
        target: &str,
        options: &str,
        depth: usize,
        level_offset: i32,
    ) {
        let including = self.out.file(file_id).to_path_buf();
        let target = syntax::substitute(target, &self.out.attributes).into_owned();
        let options = parse_include_options(options);
        let resolved = self.resolve(&including, &target);
        let exists = resolved.is_file();
        let target_path = if exists {
            canonical_or_same(&resolved)
        } else {
            resolved
        };

        self.out.includes.push(IncludeInfo {
            source_location: SourceLocation::new(&including, line),
            target_path: target_path.clone(),
            options: options.clone(),
        });

        if depth + 1 > self.max_include_depth {
            self.warn(
                ParseWarningKind::IncludeDepthExceeded,
                &including,
                line,
                format!(
                    "Include of '{target}' exceeds the maximum include depth of {}",
                    self.max_include_depth
                ),
            );
            return;
        }

        if self.chain.contains(&target_path) {
            let mut include_chain = self.chain.clone();
            include_chain.push(target_path.clone());
            let message = format!(
                "Circular include detected: {}",
                include_chain
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );
            warn!("{message}");
            self.out.circular_includes.push(CircularInclude {
                file: including,
                message,
                include_chain,
            });
            return;
        }

        if !exists {
            debug!(
                "Include target {} not found (from {}:{line})",
                target_path.display(),
                including.display()
            );
            return;
        }

        match fs::read_to_string(&target_path) {
            Ok(content) => {
                debug!("Expanding include {}", target_path.display());
                let offset =
                    apply_level_offset(level_offset, options.get("leveloffset").map(String::as_str));
                self.expand(&target_path, &content, depth + 1, offset);
            }
            Err(e) => warn!("Could not read include {}: {e}", target_path.display()),
        }
    }

    /// Include targets are relative to the including file's directory. A
    /// relative directory is further anchored at the configured base path.
    fn resolve(&self, including: &Path, target: &str) -> PathBuf {
        let target = Path::new(target);
        if target.is_absolute() {
            return target.to_path_buf();
        }
        let dir = including.parent().unwrap_or(Path::new(""));
        match self.base_path {
            Some(base) if dir.is_relative() => base.join(dir).join(target),
            _ => dir.join(target),
        }
    }

    fn emit(&mut self, file: usize, line: usize, text: &str, level_offset: i32) {
        self.out.lines.push(SourceLine {
            file,
            line,
            text: text.to_string(),
            level_offset,
        });
    }

    fn warn(&mut self, kind: ParseWarningKind, file: &Path, line: usize, message: String) {
        warn!("{}:{line}: {message}", file.display());
        self.out.warnings.push(ParseWarning {
            kind,
            file: file.to_path_buf(),
            line,
            message,
        });
    }
}

/// Heading level after applying an include level offset, never below zero.
pub fn effective_level(markers: usize, level_offset: i32) -> usize {
    let level = markers as i64 - 1 + i64::from(level_offset);
    usize::try_from(level.max(0)).unwrap_or(0)
}

fn canonical_or_same(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_docs_dir, create_test_file};
    use pretty_assertions::assert_eq;

    fn run(content: &str) -> Preprocessed {
        Preprocessor::new(None, 20).run(Path::new("doc.adoc"), content)
    }

    fn texts(pre: &Preprocessed) -> Vec<&str> {
        pre.lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn collects_header_attributes_and_drops_entries() {
        let pre = run("= Title\n:product: Docspine\n:toc:\n\n== Intro\n:late: ignored\n");

        assert_eq!(pre.attributes.get("product").map(String::as_str), Some("Docspine"));
        assert_eq!(pre.attributes.get("toc").map(String::as_str), Some(""));
        assert!(!pre.attributes.contains_key("late"));
        assert_eq!(texts(&pre), vec!["= Title", "", "== Intro", ":late: ignored"]);
    }

    #[test]
    fn header_closes_at_first_section_heading() {
        // Given attribute entries exactly before and after the first section
        let pre = run(":before: yes\n== First\n:after: no\n");

        // Then only the entry before the heading is a document attribute
        assert!(pre.attributes.contains_key("before"));
        assert!(!pre.attributes.contains_key("after"));
    }

    #[test]
    fn listing_in_header_does_not_close_it() {
        // Given a header whose listing block shows a heading and an entry
        let pre = run(
            "= Title\n:before: yes\n----\n== Example\n:inside: no\n----\n:after: yes\n\n== First\n",
        );

        // Then the header stays open around the block and ignores its lines
        assert!(pre.attributes.contains_key("before"));
        assert!(pre.attributes.contains_key("after"));
        assert!(!pre.attributes.contains_key("inside"));
        assert_eq!(
            texts(&pre),
            vec!["= Title", "----", "== Example", ":inside: no", "----", "", "== First"]
        );
    }

    #[test]
    fn unset_entry_removes_attribute() {
        let pre = run(":draft:\n:draft!:\n");
        assert!(!pre.attributes.contains_key("draft"));
    }

    #[test]
    fn nested_conditionals_use_and_semantics() {
        // Given A defined and B undefined
        let pre = run(
            ":A:\n\nifdef::A[]\nouter\nifdef::B[]\ninner\nendif::[]\nstill outer\nendif::[]\nafter\n",
        );

        // Then the inner region is hidden and everything else shows
        assert_eq!(texts(&pre), vec!["", "outer", "still outer", "after"]);
    }

    #[test]
    fn single_line_conditional_defines_attribute() {
        let pre = run("= Title\nifndef::imagesdir[:imagesdir: ./images]\nifdef::nope[hidden]\n");
        assert_eq!(
            pre.attributes.get("imagesdir").map(String::as_str),
            Some("./images")
        );
        assert_eq!(texts(&pre), vec!["= Title"]);
    }

    #[test]
    fn stray_and_unclosed_conditionals_warn() {
        let pre = run("endif::[]\nifdef::x[]\ntext\n");
        let kinds: Vec<_> = pre.warnings.iter().map(|w| (w.kind, w.line)).collect();
        assert_eq!(
            kinds,
            vec![
                (ParseWarningKind::UnmatchedEndif, 1),
                (ParseWarningKind::UnclosedConditional, 2),
            ]
        );
    }

    #[test]
    fn escaped_directive_is_literal_text() {
        let pre = run("\\ifdef::x[]\n\\include::a.adoc[]\n");
        assert_eq!(texts(&pre), vec!["ifdef::x[]", "include::a.adoc[]"]);
        assert!(pre.includes.is_empty());
    }

    #[test]
    fn expands_includes_relative_to_including_file() {
        // Given main.adoc including chapters/one.adoc which includes two.adoc beside it
        let dir = create_test_docs_dir();
        std::fs::create_dir(dir.path().join("chapters")).unwrap();
        create_test_file(&dir, "chapters/one.adoc", "== One\ninclude::two.adoc[]\n");
        create_test_file(&dir, "chapters/two.adoc", "== Two\n");
        let main = create_test_file(&dir, "main.adoc", "= Main\ninclude::chapters/one.adoc[]\n");

        // When preprocessing
        let content = std::fs::read_to_string(&main).unwrap();
        let pre = Preprocessor::new(None, 20).run(&main, &content);

        // Then both files are spliced in order with their own line numbers
        assert_eq!(texts(&pre), vec!["= Main", "== One", "== Two"]);
        let origins: Vec<_> = pre
            .lines
            .iter()
            .map(|l| (pre.file(l.file).file_name().unwrap().to_owned(), l.line))
            .collect();
        assert_eq!(origins[1], ("one.adoc".into(), 1));
        assert_eq!(origins[2], ("two.adoc".into(), 1));
        assert_eq!(pre.includes.len(), 2);
    }

    #[test]
    fn includes_in_false_conditionals_are_not_expanded() {
        let dir = create_test_docs_dir();
        create_test_file(&dir, "part.adoc", "== Part\n");
        let main = create_test_file(&dir, "main.adoc", "ifdef::never[]\ninclude::part.adoc[]\nendif::[]\n");

        let content = std::fs::read_to_string(&main).unwrap();
        let pre = Preprocessor::new(None, 20).run(&main, &content);

        assert!(pre.includes.is_empty());
        assert!(pre.lines.is_empty());
    }

    #[test]
    fn missing_include_is_recorded_without_warning() {
        let dir = create_test_docs_dir();
        let main = create_test_file(&dir, "main.adoc", "include::missing.adoc[]\n");

        let content = std::fs::read_to_string(&main).unwrap();
        let pre = Preprocessor::new(None, 20).run(&main, &content);

        assert_eq!(pre.includes.len(), 1);
        assert!(pre.includes[0].target_path.ends_with("missing.adoc"));
        assert!(pre.warnings.is_empty());
        assert!(pre.circular_includes.is_empty());
    }

    #[test]
    fn detects_self_include() {
        let dir = create_test_docs_dir();
        let file = create_test_file(&dir, "self.adoc", "= Self\ninclude::self.adoc[]\n");
        let file = std::fs::canonicalize(file).unwrap();

        let content = std::fs::read_to_string(&file).unwrap();
        let pre = Preprocessor::new(None, 20).run(&file, &content);

        assert_eq!(pre.circular_includes.len(), 1);
        let circular = &pre.circular_includes[0];
        assert_eq!(circular.file, file);
        assert_eq!(circular.include_chain, vec![file.clone(), file.clone()]);
        assert!(circular.message.contains("Circular include"));
    }

    #[test]
    fn depth_limit_stops_expansion() {
        let dir = create_test_docs_dir();
        create_test_file(&dir, "c.adoc", "== C\n");
        create_test_file(&dir, "b.adoc", "== B\ninclude::c.adoc[]\n");
        let main = create_test_file(&dir, "a.adoc", "= A\ninclude::b.adoc[]\n");

        let content = std::fs::read_to_string(&main).unwrap();
        let pre = Preprocessor::new(None, 1).run(&main, &content);

        assert_eq!(texts(&pre), vec!["= A", "== B"]);
        assert_eq!(pre.warnings.len(), 1);
        assert_eq!(pre.warnings[0].kind, ParseWarningKind::IncludeDepthExceeded);
    }

    #[test]
    fn level_offset_applies_to_included_lines() {
        let dir = create_test_docs_dir();
        create_test_file(&dir, "part.adoc", "= Part Title\n");
        let main = create_test_file(&dir, "main.adoc", "= Main\ninclude::part.adoc[leveloffset=+1]\n");

        let content = std::fs::read_to_string(&main).unwrap();
        let pre = Preprocessor::new(None, 20).run(&main, &content);

        assert_eq!(pre.lines[1].level_offset, 1);
        assert_eq!(effective_level(1, pre.lines[1].level_offset), 1);
    }

    #[test]
    fn attribute_references_resolve_in_include_targets() {
        let dir = create_test_docs_dir();
        std::fs::create_dir(dir.path().join("parts")).unwrap();
        create_test_file(&dir, "parts/x.adoc", "== X\n");
        let main = create_test_file(&dir, "main.adoc", ":partsdir: parts\n\ninclude::{partsdir}/x.adoc[]\n");

        let content = std::fs::read_to_string(&main).unwrap();
        let pre = Preprocessor::new(None, 20).run(&main, &content);

        assert_eq!(texts(&pre), vec!["", "== X"]);
    }
}
