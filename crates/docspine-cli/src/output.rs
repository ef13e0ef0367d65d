use anyhow::Result;
use docspine_engine::{
    EditOutcome, Element, SearchResult, SectionRef, SectionView, StructureIndex, StructureView,
    ValidationIssue, ValidationReport,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct SectionOutput<'a> {
    path: &'a str,
    title: &'a str,
    level: usize,
    file: &'a Path,
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anchor: Option<&'a str>,
    children: Vec<String>,
    content: &'a str,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    results: &'a [SearchResult],
    total_results: usize,
}

#[derive(Serialize)]
struct LevelEntry<'a> {
    path: &'a str,
    title: &'a str,
    level: usize,
    file: &'a Path,
    line: usize,
}

/// Renders command results as pretty JSON or as plain text on stdout.
pub struct Printer<'a> {
    json: bool,
    index: &'a StructureIndex,
}

impl<'a> Printer<'a> {
    pub fn new(json: bool, index: &'a StructureIndex) -> Self {
        Self { json, index }
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", text());
        }
        Ok(())
    }

    /// Path for display: relative to the docs root where possible.
    fn shown(&self, file: &Path) -> PathBuf {
        self.index
            .root()
            .and_then(|root| file.strip_prefix(root).ok())
            .unwrap_or(file)
            .to_path_buf()
    }

    pub fn structure(&self, view: &StructureView) -> Result<()> {
        self.emit(view, || {
            let mut out = String::new();
            for document in &view.documents {
                let file = self.shown(&document.file);
                let _ = writeln!(out, "{} ({})", document.key, file.display());
                for section in &document.sections {
                    outline(&mut out, section, 1);
                }
            }
            let _ = writeln!(out, "{} sections", view.total_sections);
            out
        })
    }

    pub fn section(&self, found: &SectionRef<'_>, content: &str) -> Result<()> {
        let output = SectionOutput {
            path: found.key,
            title: &found.title,
            level: found.level,
            file: found.source_location.file(),
            line: found.source_location.line,
            end_line: found.source_location.end_line,
            anchor: found.anchor.as_deref(),
            children: self.index.child_keys(found),
            content,
        };
        self.emit(&output, || {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "{} [level {}] {}:{}",
                output.path,
                output.level,
                self.shown(output.file).display(),
                output.line
            );
            for child in &output.children {
                let _ = writeln!(out, "  child: {child}");
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "{content}");
            out
        })
    }

    pub fn search(&self, query: &str, results: &[SearchResult]) -> Result<()> {
        let output = SearchOutput {
            query,
            results,
            total_results: results.len(),
        };
        self.emit(&output, || {
            let mut out = String::new();
            for result in results {
                let _ = writeln!(
                    out,
                    "{} ({:?}) {}:{}",
                    result.path,
                    result.match_type,
                    self.shown(&result.file).display(),
                    result.line
                );
                if let Some(context) = &result.context {
                    let _ = writeln!(out, "    {context}");
                }
            }
            let _ = writeln!(out, "{} results for '{query}'", results.len());
            out
        })
    }

    pub fn sections(&self, sections: &[SectionRef<'_>]) -> Result<()> {
        let entries: Vec<_> = sections
            .iter()
            .map(|found| LevelEntry {
                path: found.key,
                title: &found.title,
                level: found.level,
                file: found.source_location.file(),
                line: found.source_location.line,
            })
            .collect();
        self.emit(&entries, || {
            let mut out = String::new();
            for entry in &entries {
                let _ = writeln!(
                    out,
                    "{}  {}  {}:{}",
                    entry.path,
                    entry.title,
                    self.shown(entry.file).display(),
                    entry.line
                );
            }
            out
        })
    }

    pub fn elements(&self, elements: &[&Element]) -> Result<()> {
        self.emit(&elements, || {
            let mut out = String::new();
            for element in elements {
                let _ = write!(
                    out,
                    "{} {}:{} in {}",
                    element.element_type.as_str(),
                    self.shown(element.source_location.file()).display(),
                    element.source_location.line,
                    element.parent_section
                );
                for (key, value) in element.attributes.iter().filter(|(k, _)| *k != "content") {
                    let _ = write!(out, " {key}={value}");
                }
                let _ = writeln!(out);
            }
            out
        })
    }

    pub fn report(&self, report: &ValidationReport) -> Result<()> {
        self.emit(report, || {
            let mut out = String::new();
            for error in &report.errors {
                issue(&mut out, "error", error);
            }
            for warning in &report.warnings {
                issue(&mut out, "warning", warning);
            }
            let verdict = if report.valid { "valid" } else { "invalid" };
            let _ = writeln!(
                out,
                "{verdict}: {} errors, {} warnings ({} ms)",
                report.errors.len(),
                report.warnings.len(),
                report.validation_time_ms
            );
            out
        })
    }

    pub fn outcome(&self, outcome: &EditOutcome) -> Result<()> {
        self.emit(outcome, || {
            format!(
                "{}: wrote lines {}-{} of {}\n",
                outcome.path,
                outcome.start_line,
                outcome.end_line,
                self.shown(&outcome.file).display()
            )
        })
    }
}

fn outline(out: &mut String, section: &SectionView, depth: usize) {
    let end = section
        .end_line
        .map(|end| format!("-{end}"))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "{}{} ({}{end})",
        "  ".repeat(depth),
        section.path,
        section.line
    );
    for child in &section.children {
        outline(out, child, depth + 1);
    }
    let hidden = section.child_count - section.children.len();
    if hidden > 0 {
        let _ = writeln!(out, "{}... {hidden} more", "  ".repeat(depth + 1));
    }
}

fn issue(out: &mut String, severity: &str, issue: &ValidationIssue) {
    let _ = writeln!(
        out,
        "{severity}: [{}] {}: {}",
        issue.kind.as_str(),
        issue.path,
        issue.message
    );
    if !issue.include_chain.is_empty() {
        let _ = writeln!(out, "    chain: {}", issue.include_chain.join(" -> "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docspine_engine::{AsciidocParser, StructureParser};
    use pretty_assertions::assert_eq;

    fn view() -> SectionView {
        let mut index = StructureIndex::new();
        let doc = AsciidocParser::new().parse_str(
            Path::new("guide.adoc"),
            "= Guide\n\n== Install\n\n=== Linux\n\n== Usage\n",
        );
        index.build_from_documents(vec![doc]).unwrap();
        index.get_structure(Some(1)).documents.remove(0).sections.remove(0)
    }

    #[test]
    fn outline_marks_hidden_children() {
        let mut out = String::new();
        outline(&mut out, &view(), 0);

        assert_eq!(
            out,
            "guide (1-2)\n  guide:install (3-4)\n    ... 1 more\n  guide:usage (7-7)\n"
        );
    }

    #[test]
    fn issue_lists_include_chain() {
        let mut out = String::new();
        let mut error = ValidationIssue {
            kind: docspine_engine::IssueKind::CircularInclude,
            path: "a.adoc".to_string(),
            message: "Circular include".to_string(),
            include_path: None,
            include_chain: vec!["a.adoc".to_string(), "b.adoc".to_string()],
        };
        issue(&mut out, "error", &error);
        error.include_chain.clear();
        issue(&mut out, "error", &error);

        assert_eq!(
            out,
            "error: [circular_include] a.adoc: Circular include\n    chain: a.adoc -> b.adoc\n\
             error: [circular_include] a.adoc: Circular include\n"
        );
    }
}
