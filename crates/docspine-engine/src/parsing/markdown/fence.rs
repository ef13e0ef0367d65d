#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    Backticks,
    Tildes,
}

/// An open fenced code block: the marker character and how many of them
/// opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFence {
    pub kind: FenceKind,
    pub len: usize,
}

impl CodeFence {
    pub const BACKTICKS: &'static str = "```";
    pub const TILDES: &'static str = "~~~";

    /// Opening fence and its info string. Up to three spaces of indent are
    /// allowed; a backtick fence whose info string holds a backtick is not a
    /// fence.
    pub fn open(line: &str) -> Option<(CodeFence, &str)> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let indent = trimmed.len() - trimmed.trim_start_matches(' ').len();
        if indent > 3 {
            return None;
        }
        let rest = &trimmed[indent..];
        let kind = if rest.starts_with(Self::BACKTICKS) {
            FenceKind::Backticks
        } else if rest.starts_with(Self::TILDES) {
            FenceKind::Tildes
        } else {
            return None;
        };
        let marker = kind.marker();
        let len = rest.len() - rest.trim_start_matches(marker).len();
        let info = rest[len..].trim();
        if kind == FenceKind::Backticks && info.contains('`') {
            return None;
        }
        Some((CodeFence { kind, len }, info))
    }

    /// A closing fence uses the same marker, at least as many of them, and
    /// nothing else on the line.
    pub fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let indent = trimmed.len() - trimmed.trim_start_matches(' ').len();
        if indent > 3 {
            return false;
        }
        let rest = &trimmed[indent..];
        let run = rest.len() - rest.trim_start_matches(self.kind.marker()).len();
        run >= self.len && rest[run..].trim().is_empty()
    }
}

impl FenceKind {
    fn marker(self) -> char {
        match self {
            FenceKind::Backticks => '`',
            FenceKind::Tildes => '~',
        }
    }
}

/// Language from a fence info string: its first word, if any.
pub fn info_language(info: &str) -> Option<&str> {
    info.split_whitespace()
        .next()
        .map(|word| word.trim_start_matches('{').trim_start_matches('.'))
        .map(|word| word.trim_end_matches('}'))
        .filter(|word| !word.is_empty())
}
