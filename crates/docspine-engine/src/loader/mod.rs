//! Builds a [`StructureIndex`] from a docs directory.
//!
//! Every document file is parsed, but only root documents are indexed: files
//! that no other file includes. Files caught in an include cycle that no root
//! reaches are indexed as well so their sections stay addressable.

use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::index::{IndexError, StructureIndex};
use crate::io::{IoError, compile_excludes, scan_doc_files};
use crate::models::Document;
use crate::parsing::{AsciidocParser, ParseError, parse_file};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub max_include_depth: usize,
    /// Glob patterns matched against docs-root relative paths.
    pub exclude: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_include_depth: AsciidocParser::DEFAULT_MAX_INCLUDE_DEPTH,
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct LoadedTree {
    pub index: StructureIndex,
    /// Every document file found under the root, sorted.
    pub files: Vec<PathBuf>,
    /// Files that could not be parsed. They are left out of the index.
    pub failures: Vec<(PathBuf, ParseError)>,
}

pub fn load_tree(root: &Path, options: &LoadOptions) -> Result<LoadedTree, LoadError> {
    let exclude = compile_excludes(&options.exclude);
    let files = scan_doc_files(root, &exclude)?;
    debug!("Found {} document files under {}", files.len(), root.display());

    let mut documents = Vec::new();
    let mut failures = Vec::new();
    for file in &files {
        match parse_file(file, Some(root), options.max_include_depth) {
            Ok(doc) => {
                debug!("Parsed {} ({} sections)", file.display(), doc.sections.len());
                documents.push(doc);
            }
            Err(err) => {
                warn!("Skipping {}: {err}", file.display());
                failures.push((file.clone(), err));
            }
        }
    }

    let selected = root_documents(documents);
    let mut index = StructureIndex::with_root(root);
    index.build_from_documents(selected)?;
    info!(
        "Indexed {} sections from {} documents",
        index.section_count(),
        index.documents().len()
    );

    Ok(LoadedTree {
        index,
        files,
        failures,
    })
}

/// Keeps documents nothing includes, then adds cycle members that none of
/// those roots reach.
fn root_documents(documents: Vec<Document>) -> Vec<Document> {
    let include_targets = |doc: &Document| -> BTreeSet<PathBuf> {
        let own = canonical(&doc.file_path);
        doc.includes()
            .iter()
            .filter(|include| include.target_path.is_file())
            .map(|include| canonical(&include.target_path))
            .filter(|target| *target != own)
            .collect()
    };

    let included: BTreeSet<PathBuf> = documents.iter().flat_map(include_targets).collect();
    let (roots, rest): (Vec<Document>, Vec<Document>) = documents
        .into_iter()
        .partition(|doc| !included.contains(&canonical(&doc.file_path)));

    let reached: BTreeSet<PathBuf> = roots.iter().flat_map(include_targets).collect();
    let mut selected = roots;
    for doc in rest {
        if doc.circular_includes().is_empty() || reached.contains(&canonical(&doc.file_path)) {
            debug!("{} is indexed through its includer", doc.file_path.display());
            continue;
        }
        debug!(
            "Indexing {} on its own: it is part of an include cycle",
            doc.file_path.display()
        );
        selected.push(doc);
    }
    selected.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    selected
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
