//! Structural checks over a built index.

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::index::StructureIndex;
use crate::models::ParseWarningKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    CircularInclude,
    UnresolvedInclude,
    OrphanedFile,
    Parse(ParseWarningKind),
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::CircularInclude => "circular_include",
            IssueKind::UnresolvedInclude => "unresolved_include",
            IssueKind::OrphanedFile => "orphaned_file",
            IssueKind::Parse(kind) => kind.as_str(),
        }
    }
}

impl Serialize for IssueKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    /// Docs-root relative file, with `:line` where the issue has one.
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_chain: Vec<String>,
}

impl ValidationIssue {
    fn new(kind: IssueKind, path: String, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
            include_path: None,
            include_chain: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub validation_time_ms: u64,
}

/// Checks the index against the files found under `docs_root`.
///
/// Errors are circular and unresolved includes. Warnings are orphaned files
/// and every parse warning. `doc_files` lists the document files on disk,
/// typically from [`scan_doc_files`](crate::io::scan_doc_files).
pub fn validate_structure(
    index: &StructureIndex,
    docs_root: &Path,
    doc_files: &[PathBuf],
) -> ValidationReport {
    let started = Instant::now();
    let root = canonical(docs_root);
    let display = |path: &Path| display_path(&root, path);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut in_cycles = BTreeSet::new();
    for cycle in index.circular_include_errors() {
        in_cycles.insert(canonical(&cycle.file));
        in_cycles.extend(cycle.include_chain.iter().map(|p| canonical(p)));

        let mut issue = ValidationIssue::new(
            IssueKind::CircularInclude,
            display(&cycle.file),
            cycle.message.clone(),
        );
        issue.include_chain = cycle.include_chain.iter().map(|p| display(p)).collect();
        errors.push(issue);
    }

    let mut reported = BTreeSet::new();
    for include in index.documents().iter().flat_map(|doc| doc.includes()) {
        if include.target_path.exists() {
            continue;
        }
        let source = &include.source_location;
        let path = format!("{}:{}", display(source.file()), source.line);
        let target = display(&include.target_path);
        if !reported.insert((path.clone(), target.clone())) {
            continue;
        }
        let mut issue = ValidationIssue::new(
            IssueKind::UnresolvedInclude,
            path,
            format!("Include file '{target}' not found"),
        );
        issue.include_path = Some(target);
        errors.push(issue);
    }

    let covered: BTreeSet<PathBuf> = index
        .documents()
        .iter()
        .flat_map(|doc| {
            std::iter::once(doc.file_path.as_path())
                .chain(doc.includes().iter().map(|i| i.target_path.as_path()))
        })
        .chain(index.indexed_files())
        .map(canonical)
        .collect();
    for file in doc_files {
        let resolved = canonical(file);
        if covered.contains(&resolved) || in_cycles.contains(&resolved) {
            continue;
        }
        warnings.push(ValidationIssue::new(
            IssueKind::OrphanedFile,
            display(file),
            "File is not included in any document",
        ));
    }

    for warning in index.parse_warnings() {
        warnings.push(ValidationIssue::new(
            IssueKind::Parse(warning.kind),
            format!("{}:{}", display(&warning.file), warning.line),
            warning.message.clone(),
        ));
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        validation_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

/// Canonical form of `path`. Missing trailing components are resolved
/// through their nearest existing ancestor.
fn canonical(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(resolved) = fs::canonicalize(current) {
            return missing.iter().rev().fold(resolved, |acc, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn display_path(root: &Path, path: &Path) -> String {
    let resolved = canonical(path);
    resolved
        .strip_prefix(root)
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.display().to_string())
}
