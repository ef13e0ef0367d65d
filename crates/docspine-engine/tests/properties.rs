use docspine_engine::{
    AsciidocParser, Document, MarkdownParser, Section, SectionView, StructureIndex,
    StructureParser, slugify,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::Path;

fn asciidoc(content: &str) -> Document {
    AsciidocParser::new().parse_str(Path::new("doc.adoc"), content)
}

fn parents(sections: &[Section], parent: Option<&str>, out: &mut Vec<(String, Option<String>)>) {
    for section in sections {
        out.push((section.title.clone(), parent.map(str::to_string)));
        parents(&section.children, Some(&section.title), out);
    }
}

/// Parent of every heading by the stack rule: the nearest earlier heading
/// with a smaller level.
fn expected_parents(levels: &[usize]) -> Vec<(String, Option<String>)> {
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut out = Vec::new();
    for (i, &level) in levels.iter().enumerate() {
        while stack.last().is_some_and(|(top, _)| *top >= level) {
            stack.pop();
        }
        let title = format!("S{i}");
        out.push((title.clone(), stack.last().map(|(_, t)| t.clone())));
        stack.push((level, title));
    }
    out
}

fn collect_paths(sections: &[SectionView], out: &mut Vec<String>) {
    for section in sections {
        out.push(section.path.clone());
        collect_paths(&section.children, out);
    }
}

proptest! {
    #[test]
    fn asciidoc_nesting_follows_the_heading_stack(levels in prop::collection::vec(1usize..=5, 1..40)) {
        let content: String = levels
            .iter()
            .enumerate()
            .map(|(i, &level)| format!("{} S{i}\n\ntext\n\n", "=".repeat(level + 1)))
            .collect();

        let mut actual = Vec::new();
        parents(&asciidoc(&content).sections, None, &mut actual);

        prop_assert_eq!(actual, expected_parents(&levels));
    }

    #[test]
    fn markdown_nesting_follows_the_heading_stack(levels in prop::collection::vec(1usize..=5, 1..40)) {
        let content: String = levels
            .iter()
            .enumerate()
            .map(|(i, &level)| format!("{} S{i}\n\n", "#".repeat(level + 1)))
            .collect();

        let doc = MarkdownParser::new().parse_str(Path::new("doc.md"), &content);
        let mut actual = Vec::new();
        parents(&doc.sections, None, &mut actual);

        prop_assert_eq!(actual, expected_parents(&levels));
    }

    #[test]
    fn composite_paths_are_unique(
        headings in prop::collection::vec((1usize..=3, "[ab ]{1,3}"), 1..30),
    ) {
        // Repeated short titles force slug collisions
        let content: String = headings
            .iter()
            .map(|(level, title)| format!("{} {title}\n\n", "=".repeat(level + 1)))
            .collect();
        let documents = vec![
            AsciidocParser::new().parse_str(Path::new("one.adoc"), &format!("= Doc\n\n{content}")),
            AsciidocParser::new().parse_str(Path::new("two.adoc"), &content),
        ];
        let mut index = StructureIndex::new();
        index.build_from_documents(documents).unwrap();

        let mut paths = Vec::new();
        for document in index.get_structure(None).documents {
            collect_paths(&document.sections, &mut paths);
        }
        let unique: HashSet<_> = paths.iter().collect();
        prop_assert_eq!(unique.len(), paths.len());
        for path in &paths {
            prop_assert!(index.get_section(path).is_some(), "{} is not addressable", path);
        }
    }

    #[test]
    fn headings_inside_delimited_blocks_are_suppressed(
        fake in "[A-Za-z][A-Za-z ]{0,12}",
        delimiter in prop::sample::select(vec!["----", "....", "****", "====", "____", "////", "++++"]),
    ) {
        let content = format!("= Doc\n\n== Real\n\n{delimiter}\n== {fake}\n{delimiter}\n\n== Real2\n");
        let doc = asciidoc(&content);
        let titles: Vec<_> = doc.all_sections().map(|s| s.title.as_str()).collect();
        prop_assert_eq!(titles, vec!["Doc", "Real", "Real2"]);
        prop_assert!(doc.elements.iter().all(|e| e.source_location.line != 6));
    }

    #[test]
    fn nested_conditionals_need_every_attribute(a in any::<bool>(), b in any::<bool>()) {
        let mut content = String::from("= Doc\n");
        if a {
            content.push_str(":a:\n");
        }
        if b {
            content.push_str(":b:\n");
        }
        content.push_str("\nifdef::a[]\nifdef::b[]\n== Inner\nendif::[]\nendif::[]\n\n== After\n");

        let doc = asciidoc(&content);
        let titles: Vec<_> = doc.all_sections().map(|s| s.title.as_str()).collect();
        let expected = if a && b {
            vec!["Doc", "Inner", "After"]
        } else {
            vec!["Doc", "After"]
        };
        prop_assert_eq!(titles, expected);
        prop_assert!(doc.parse_warnings.is_empty());
    }

    #[test]
    fn slugs_are_deterministic_and_restricted(title in "\\PC{0,40}") {
        let slug = slugify(&title);
        prop_assert_eq!(&slug, &slugify(&title));
        prop_assert!(!slug.is_empty());
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }
}

#[test]
fn scenario_title_with_nested_sections() {
    let doc = asciidoc("= Title\n\n== A\n\n=== A.1\n\n== B\n");
    let paths: Vec<_> = doc.all_sections().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, vec!["title", "title.a", "title.a.a-1", "title.b"]);
}

#[test]
fn slug_of_punctuated_unicode_title() {
    let slug = slugify("Kapitel 2: Über uns!");
    assert_eq!(slug, "kapitel-2-ber-uns");
}
