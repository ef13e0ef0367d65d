// Shared by several bench targets; each one uses a different subset.
#[allow(dead_code)]
pub fn generate_asciidoc(chapters: usize, depth: usize) -> String {
    let mut content = String::from("= Benchmark Book\n:product: Docspine\n\n");
    for chapter in 0..chapters {
        content.push_str(&format!("== Chapter {chapter}\n\n"));
        content.push_str("Intro paragraph for {product} with a <<ref,link>>.\n\n");
        for level in 2..(2 + depth).min(6) {
            content.push_str(&format!("{} Level {level} of {chapter}\n\n", "=".repeat(level + 1)));
            content.push_str("[source,rust]\n----\nfn main() {}\n== not a heading\n----\n\n");
            content.push_str("* first\n* second\n\nNOTE: Keep it short.\n\n");
        }
        content.push_str("ifdef::draft[]\n== Draft only\nendif::[]\n\n");
    }
    content
}

#[allow(dead_code)]
pub fn generate_markdown(sections: usize, depth: usize) -> String {
    let mut content = String::from("---\ntitle: Benchmark Guide\n---\n\n# Benchmark Guide\n\n");
    for section in 0..sections {
        content.push_str(&format!("## Section {section}\n\n"));
        for level in 3..(3 + depth).min(7) {
            content.push_str(&format!("{} Level {level} of {section}\n\n", "#".repeat(level)));
            content.push_str("```python\nprint('hi')\n# not a heading\n```\n\n");
            content.push_str("| a | b |\n|---|---|\n| 1 | 2 |\n\n- one\n- two\n\n");
        }
    }
    content
}
