use xi_rope::{LinesMetric, Rope};

use super::span::Span;

/// A single numbered line of the rope.
#[derive(Debug, Clone)]
pub struct LineRef {
    /// 1-based line number.
    pub number: usize,
    /// Byte span of this line in the rope (includes newline if present).
    pub span: Span,
    /// Raw line text including its line ending.
    pub text: String,
}

impl LineRef {
    /// Line text without the trailing `\n` / `\r\n`.
    pub fn content(&self) -> &str {
        self.text.trim_end_matches(['\r', '\n'])
    }

    pub fn is_blank(&self) -> bool {
        self.content().trim().is_empty()
    }
}

/// Iterates lines with 1-based numbers and byte spans.
///
/// A trailing newline does not produce an extra empty line, and an empty rope
/// yields nothing.
pub fn lines_with_spans(rope: &Rope) -> impl Iterator<Item = LineRef> + '_ {
    let mut offset = 0usize;
    rope.lines_raw(..).enumerate().map(move |(idx, line)| {
        let start = offset;
        offset += line.len();
        LineRef {
            number: idx + 1,
            span: Span { start, end: offset },
            text: line.into_owned(),
        }
    })
}

/// Number of lines as seen by [`lines_with_spans`].
pub fn line_count(rope: &Rope) -> usize {
    let newlines = rope.measure::<LinesMetric>();
    if rope.is_empty() {
        0
    } else if rope.byte_at(rope.len() - 1) == b'\n' {
        newlines
    } else {
        newlines + 1
    }
}

/// Byte span covering the 1-based inclusive line range `first..=last`.
///
/// `last == first - 1` is an empty range positioned at the start of `first`,
/// which is how insertions are expressed. Returns `None` when the range does
/// not fit the rope.
pub fn line_range_span(rope: &Rope, first: usize, last: usize) -> Option<Span> {
    let count = line_count(rope);
    if first == 0 || last + 1 < first || last > count {
        return None;
    }
    Some(Span {
        start: rope.offset_of_line(first - 1),
        end: rope.offset_of_line(last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", 0)]
    #[case("one", 1)]
    #[case("one\n", 1)]
    #[case("one\ntwo", 2)]
    #[case("one\ntwo\n", 2)]
    #[case("\n\n", 2)]
    #[case("one\r\ntwo\r\n", 2)]
    fn counts_lines_like_the_iterator(#[case] text: &str, #[case] expected: usize) {
        let rope = Rope::from(text);
        assert_eq!(line_count(&rope), expected);
        assert_eq!(lines_with_spans(&rope).count(), expected);
    }

    #[test]
    fn numbers_lines_from_one_and_trims_endings() {
        let rope = Rope::from("= Title\r\n\nbody");
        let lines: Vec<_> = lines_with_spans(&rope).collect();

        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].content(), "= Title");
        assert_eq!(lines[0].span, Span { start: 0, end: 9 });
        assert!(lines[1].is_blank());
        assert_eq!(lines[2].number, 3);
        assert_eq!(lines[2].content(), "body");
    }

    #[test]
    fn range_span_covers_inclusive_lines() {
        let rope = Rope::from("a\nbb\nccc\n");
        let span = line_range_span(&rope, 2, 3).unwrap();
        assert_eq!(rope.slice_to_cow(span.start..span.end), "bb\nccc\n");
    }

    #[test]
    fn range_span_reaches_end_without_trailing_newline() {
        let rope = Rope::from("a\nbb");
        let span = line_range_span(&rope, 2, 2).unwrap();
        assert_eq!(rope.slice_to_cow(span.start..span.end), "bb");
    }

    #[test]
    fn empty_range_marks_insertion_point() {
        let rope = Rope::from("a\nbb\n");
        let span = line_range_span(&rope, 2, 1).unwrap();
        assert!(span.is_empty());
        assert_eq!(span.start, 2);

        let at_end = line_range_span(&rope, 3, 2).unwrap();
        assert_eq!(at_end.start, rope.len());
    }

    #[rstest]
    #[case(0, 1)]
    #[case(2, 5)]
    #[case(4, 2)]
    fn rejects_ranges_outside_the_rope(#[case] first: usize, #[case] last: usize) {
        let rope = Rope::from("a\nb\nc\n");
        assert_eq!(line_range_span(&rope, first, last), None);
    }
}
