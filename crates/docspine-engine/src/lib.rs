pub mod editing;
pub mod index;
pub mod io;
pub mod loader;
pub mod models;
pub mod parsing;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::{
    ContentEditor, EditOutcome, InsertPosition, MutationError, first_heading_level,
    section_end_line, section_end_with_descendants, validate_heading_level_change,
};
pub use index::{
    DocumentView, IndexError, MatchType, SearchResult, SectionRef, SectionView, StructureIndex,
    StructureView,
};
pub use io::{FileStore, FileSystemStore, IoError};
pub use loader::{LoadError, LoadOptions, LoadedTree, load_tree};
pub use models::*;
pub use parsing::{
    AsciidocParser, MarkdownParser, ParseError, StructureParser, parse_file, slugify,
};
pub use validation::{IssueKind, ValidationIssue, ValidationReport, validate_structure};
