use glob::Pattern;
use log::{debug, warn};
use relative_path::RelativePathBuf;
use std::fs;
use std::path::{Path, PathBuf};
use xi_rope::Rope;

use crate::models::DocumentFormat;
use crate::parsing::rope::{line_count, line_range_span};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid docs directory: {0}")]
    InvalidDocsRoot(String),
    #[error("Lines {start}-{end} are outside {} ({line_count} lines)", .path.display())]
    LineRange {
        path: PathBuf,
        start: usize,
        end: usize,
        line_count: usize,
    },
}

/// Reads and writes document files on behalf of the editing layer.
pub trait FileStore {
    fn read_file(&self, path: &Path) -> Result<String, IoError>;

    fn write_file(&self, path: &Path, content: &str) -> Result<(), IoError>;
}

/// Returns `content` with lines `start..=end` replaced by `replacement`.
///
/// Inserting after the last line of a file without a trailing newline adds
/// one first so the inserted text starts on its own line.
pub fn splice_lines(
    path: &Path,
    content: &str,
    start: usize,
    end: usize,
    replacement: &str,
) -> Result<String, IoError> {
    let mut rope = Rope::from(content);
    let span = line_range_span(&rope, start, end).ok_or_else(|| IoError::LineRange {
        path: path.to_path_buf(),
        start,
        end,
        line_count: line_count(&rope),
    })?;

    let at_unterminated_end =
        span.start == rope.len() && !rope.is_empty() && rope.byte_at(rope.len() - 1) != b'\n';
    if at_unterminated_end && !replacement.is_empty() {
        rope.edit(span.range(), format!("\n{replacement}"));
    } else {
        rope.edit(span.range(), replacement);
    }
    Ok(String::from(&rope))
}

/// [`FileStore`] over the local file system. Writes go to a temporary file
/// beside the target and are renamed into place.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemStore;

impl FileStore for FileSystemStore {
    fn read_file(&self, path: &Path) -> Result<String, IoError> {
        if !path.exists() {
            return Err(IoError::NotFound(path.to_path_buf()));
        }
        fs::read_to_string(path).map_err(IoError::Io)
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), IoError> {
        atomic_write(path, content)
    }
}

fn atomic_write(path: &Path, content: &str) -> Result<(), IoError> {
    let file_name = path.file_name().ok_or_else(|| {
        IoError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        ))
    })?;

    // Create parent directories if they don't exist
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    let temp = path.with_file_name(format!(".{}.docspine-tmp", file_name.to_string_lossy()));
    fs::write(&temp, content).map_err(IoError::Io)?;
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(IoError::Io(err));
    }
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Compiles exclude globs, skipping (and logging) invalid ones.
pub fn compile_excludes(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                warn!("Ignoring invalid exclude pattern '{raw}': {err}");
                None
            }
        })
        .collect()
}

/// Path of `path` relative to `root` with `/` separators.
pub fn relative_doc_path(root: &Path, path: &Path) -> Option<RelativePathBuf> {
    let stripped = path.strip_prefix(root).ok()?;
    RelativePathBuf::from_path(stripped).ok()
}

/// Scan for AsciiDoc and Markdown files under the docs root, skipping hidden
/// directories and anything matching an exclude pattern.
pub fn scan_doc_files(docs_root: &Path, exclude: &[Pattern]) -> Result<Vec<PathBuf>, IoError> {
    validate_docs_root(docs_root)?;

    let mut files = Vec::new();
    scan_directory_recursive(docs_root, docs_root, exclude, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(
    root: &Path,
    dir: &Path,
    exclude: &[Pattern],
    files: &mut Vec<PathBuf>,
) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if is_excluded(root, &path, exclude) {
            debug!("Excluded {}", path.display());
            continue;
        }
        if path.is_dir() {
            let hidden = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with('.'));
            if !hidden {
                scan_directory_recursive(root, &path, exclude, files)?;
            }
        } else if DocumentFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }

    Ok(())
}

fn is_excluded(root: &Path, path: &Path, exclude: &[Pattern]) -> bool {
    if exclude.is_empty() {
        return false;
    }
    let Some(relative) = relative_doc_path(root, path) else {
        return false;
    };
    exclude.iter().any(|p| p.matches(relative.as_str()))
}

pub fn validate_docs_root(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidDocsRoot(format!(
            "docs directory not found: {}",
            path.display()
        )));
    }

    Ok(())
}
