use std::collections::BTreeMap;

use super::directive::{Combinator, Condition};

impl Condition<'_> {
    /// `ifdef` holds when a name is present in the attribute map (an empty
    /// value still counts); `ifndef` is the negation of the same per-name
    /// test before combining.
    pub fn evaluate(&self, attributes: &BTreeMap<String, String>) -> bool {
        let test = |name: &&str| attributes.contains_key(*name) != self.negated;
        match self.combinator {
            Combinator::Any => self.names.iter().any(test),
            Combinator::All => self.names.iter().all(test),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    line: usize,
    active: bool,
}

/// Stack of open conditional regions for one file. Content is visible only
/// while every frame on the stack is active.
#[derive(Debug, Default)]
pub struct ConditionStack {
    frames: Vec<Frame>,
}

impl ConditionStack {
    pub fn is_visible(&self) -> bool {
        self.frames.iter().all(|f| f.active)
    }

    pub fn open(&mut self, line: usize, active: bool) {
        self.frames.push(Frame { line, active });
    }

    /// Closes the innermost region. Returns `false` for a stray `endif`.
    pub fn close(&mut self) -> bool {
        self.frames.pop().is_some()
    }

    /// Lines of regions still open at end of input, outermost first.
    pub fn unclosed_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.frames.iter().map(|f| f.line)
    }
}
