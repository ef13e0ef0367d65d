pub mod document;
pub mod element;
pub mod section;

pub use document::*;
pub use element::{Element, ElementType, UnknownElementType};
pub use section::{Section, SectionWalk, SourceLocation};
