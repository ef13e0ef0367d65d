use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::models::{Section, SourceLocation};

use super::slug::slugify;

/// A recognised heading, in document order.
#[derive(Debug, Clone)]
pub struct Heading {
    pub title: String,
    pub level: usize,
    pub file: PathBuf,
    pub line: usize,
    pub anchor: Option<String>,
}

/// Builds the section tree from a linear stream of headings.
///
/// Open sections sit on a stack; a new heading closes every open section
/// whose level is greater than or equal to its own, then nests under
/// whatever remains on top.
#[derive(Debug, Default)]
pub struct OutlineBuilder {
    open: Vec<Section>,
    roots: Vec<Section>,
    marks: Vec<(PathBuf, usize)>,
    used_paths: HashSet<String>,
    title: Option<String>,
}

#[derive(Debug, Default)]
pub struct Outline {
    pub title: String,
    pub sections: Vec<Section>,
}

impl OutlineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a heading and returns the path assigned to it.
    pub fn push(&mut self, heading: Heading) -> &str {
        while self.open.last().is_some_and(|top| top.level >= heading.level) {
            self.close_top();
        }

        let slug = slugify(&heading.title);
        let base = match self.open.last() {
            Some(parent) => format!("{}.{}", parent.path, slug),
            None => slug,
        };
        let path = self.claim_path(base);

        if heading.level == 0 && self.title.is_none() {
            self.title = Some(heading.title.clone());
        }
        self.marks.push((heading.file.clone(), heading.line));

        self.open.push(Section {
            title: heading.title,
            level: heading.level,
            path,
            source_location: SourceLocation::new(heading.file, heading.line),
            children: vec![],
            anchor: heading.anchor,
        });
        self.current_path()
    }

    /// Path of the innermost open section, or `""` before the first heading.
    pub fn current_path(&self) -> &str {
        self.open.last().map_or("", |s| s.path.as_str())
    }

    /// Closes all sections and fills in `end_line`.
    ///
    /// A section ends on the line before the next heading from the same file,
    /// or on the last line of that file.
    pub fn finish(mut self, line_counts: &HashMap<PathBuf, usize>) -> Outline {
        while !self.open.is_empty() {
            self.close_top();
        }

        let mut ends = vec![0; self.marks.len()];
        let mut next_in_file: HashMap<&PathBuf, usize> = HashMap::new();
        for (idx, (file, line)) in self.marks.iter().enumerate().rev() {
            let end = match next_in_file.get(file) {
                Some(&next) if next > *line => next - 1,
                _ => line_counts.get(file).copied().unwrap_or(*line),
            };
            ends[idx] = end.max(*line);
            next_in_file.insert(file, *line);
        }

        let mut ends = ends.into_iter();
        assign_end_lines(&mut self.roots, &mut ends);

        Outline {
            title: self.title.unwrap_or_default(),
            sections: self.roots,
        }
    }

    fn close_top(&mut self) {
        if let Some(done) = self.open.pop() {
            match self.open.last_mut() {
                Some(parent) => parent.children.push(done),
                None => self.roots.push(done),
            }
        }
    }

    fn claim_path(&mut self, base: String) -> String {
        if self.used_paths.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used_paths.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

// Pre-order over the finished tree matches push order.
fn assign_end_lines(sections: &mut [Section], ends: &mut impl Iterator<Item = usize>) {
    for section in sections {
        if let Some(end) = ends.next() {
            section.source_location.end_line = Some(end);
        }
        assign_end_lines(&mut section.children, ends);
    }
}
