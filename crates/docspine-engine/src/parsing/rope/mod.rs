pub mod lines;
pub mod span;

pub use lines::{LineRef, line_count, line_range_span, lines_with_spans};
pub use span::Span;
