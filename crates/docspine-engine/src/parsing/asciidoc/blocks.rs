//! Delimited block tracking.
//!
//! A delimiter opens a block that stays open until a line with exactly the
//! same delimiter appears. Verbatim blocks (listing, literal, passthrough,
//! comment, table) ignore every other line; compound blocks (example,
//! sidebar, quote, open) may nest further blocks. Every line from an
//! outermost opening delimiter to its closing delimiter is suppressed for
//! heading and element recognition.

use regex::Regex;
use std::sync::LazyLock;

use super::syntax;

static DELIMITER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-{4,}|\.{4,}|\+{4,}|/{4,}|\*{4,}|={4,}|_{4,}|--|\|={3,})\s*$")
        .expect("delimiter regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Listing,
    Literal,
    Passthrough,
    Comment,
    Table,
    Sidebar,
    Example,
    Quote,
    Open,
}

impl BlockKind {
    /// Kind and exact closing token of a delimiter line.
    pub fn from_delimiter(line: &str) -> Option<(BlockKind, &str)> {
        let token = DELIMITER_RE.captures(line)?.get(1)?.as_str();
        let kind = match token.as_bytes().first()? {
            b'-' if token.len() == 2 => BlockKind::Open,
            b'-' => BlockKind::Listing,
            b'.' => BlockKind::Literal,
            b'+' => BlockKind::Passthrough,
            b'/' => BlockKind::Comment,
            b'|' => BlockKind::Table,
            b'*' => BlockKind::Sidebar,
            b'=' => BlockKind::Example,
            b'_' => BlockKind::Quote,
            _ => return None,
        };
        Some((kind, token))
    }

    pub fn is_verbatim(self) -> bool {
        matches!(
            self,
            BlockKind::Listing
                | BlockKind::Literal
                | BlockKind::Passthrough
                | BlockKind::Comment
                | BlockKind::Table
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Listing => "listing",
            BlockKind::Literal => "literal",
            BlockKind::Passthrough => "passthrough",
            BlockKind::Comment => "comment",
            BlockKind::Table => "table",
            BlockKind::Sidebar => "sidebar",
            BlockKind::Example => "example",
            BlockKind::Quote => "quote",
            BlockKind::Open => "open",
        }
    }
}

/// An outermost delimited block. Indices point into the scanned line slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedBlock {
    pub kind: BlockKind,
    pub open: usize,
    pub close: Option<usize>,
    /// Block attribute line preceding the opening delimiter, without brackets.
    pub attribute: Option<String>,
}

#[derive(Debug, Default)]
pub struct BlockMap {
    pub blocks: Vec<DelimitedBlock>,
    suppressed: Vec<bool>,
}

impl BlockMap {
    pub fn is_suppressed(&self, idx: usize) -> bool {
        self.suppressed.get(idx).copied().unwrap_or(false)
    }

    pub fn opening_at(&self, idx: usize) -> Option<&DelimitedBlock> {
        self.blocks.iter().find(|b| b.open == idx)
    }
}

/// Scans lines for delimited blocks using a stack keyed on the opening token.
pub fn scan_blocks<S: AsRef<str>>(lines: &[S]) -> BlockMap {
    let mut stack: Vec<(BlockKind, &str)> = Vec::new();
    let mut map = BlockMap {
        blocks: Vec::new(),
        suppressed: vec![false; lines.len()],
    };

    for (idx, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let delimiter = BlockKind::from_delimiter(line);

        match stack.last() {
            None => {
                if let Some((kind, token)) = delimiter {
                    stack.push((kind, token));
                    map.suppressed[idx] = true;
                    map.blocks.push(DelimitedBlock {
                        kind,
                        open: idx,
                        close: None,
                        attribute: attribute_before(lines, idx),
                    });
                }
            }
            Some(&(top_kind, top_token)) => {
                map.suppressed[idx] = true;
                match delimiter {
                    Some((_, token)) if token == top_token => {
                        stack.pop();
                        if stack.is_empty()
                            && let Some(block) = map.blocks.last_mut()
                        {
                            block.close = Some(idx);
                        }
                    }
                    Some((kind, token)) if !top_kind.is_verbatim() => stack.push((kind, token)),
                    _ => {}
                }
            }
        }
    }

    map
}

// Looks back over a block title (`.Title`) to the attribute line, if any.
fn attribute_before<S: AsRef<str>>(lines: &[S], open: usize) -> Option<String> {
    let mut idx = open;
    while idx > 0 {
        idx -= 1;
        let line = lines[idx].as_ref();
        if is_block_title(line) || syntax::anchor(line).is_some() {
            continue;
        }
        return syntax::block_attribute(line).map(str::to_string);
    }
    None
}

fn is_block_title(line: &str) -> bool {
    line.strip_prefix('.')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_whitespace() && c != '.')
}
