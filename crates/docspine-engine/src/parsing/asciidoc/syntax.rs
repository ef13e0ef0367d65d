use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(={1,6})\s+(.+?)(?:\s+=*)?$").expect("heading regex"));
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\[\[([A-Za-z_][\w:.-]*)(?:,[^\]]*)?\]\]|\[#([A-Za-z_][\w:-]*)[^\]]*\])\s*$")
        .expect("anchor regex")
});
static BLOCK_ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\[\]#][^\]]*)?\]\s*$").expect("block attribute regex"));
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^image::([^\[\s][^\[]*)\[(.*)\]\s*$").expect("image regex"));
static ADMONITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(NOTE|TIP|IMPORTANT|WARNING|CAUTION):\s+(.*)$").expect("admonition regex")
});
static XREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<<([^,>\s]+)(?:,\s*([^>]+?))?\s*>>|xref:([^\[\s]+)\[([^\]]*)\]").expect("xref regex")
});
static ATTRIBUTE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_][A-Za-z0-9_-]*)\}").expect("attribute ref regex"));

pub const ADMONITION_TYPES: [&str; 5] = ["NOTE", "TIP", "IMPORTANT", "WARNING", "CAUTION"];

/// `(marker count, raw title)` of a section heading line.
pub fn heading(line: &str) -> Option<(usize, &str)> {
    let caps = HEADING_RE.captures(line)?;
    Some((caps.get(1)?.len(), caps.get(2)?.as_str().trim()))
}

/// Id from a block anchor line: `[[id]]`, `[[id,label]]` or `[#id.role]`.
pub fn anchor(line: &str) -> Option<&str> {
    let caps = ANCHOR_RE.captures(line)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Contents of a block attribute line such as `[source,rust]` or `[NOTE]`.
pub fn block_attribute(line: &str) -> Option<&str> {
    if anchor(line).is_some() {
        return None;
    }
    let caps = BLOCK_ATTRIBUTE_RE.captures(line)?;
    Some(caps.get(1).map_or("", |m| m.as_str().trim()))
}

/// First positional entry of a block attribute list, e.g. `source` in
/// `source,rust,linenums`.
pub fn block_style(attribute: &str) -> &str {
    attribute.split(',').next().unwrap_or("").trim()
}

/// Second positional entry, which carries the language for `source` blocks.
pub fn source_language(attribute: &str) -> Option<&str> {
    attribute
        .split(',')
        .nth(1)
        .map(str::trim)
        .filter(|lang| !lang.is_empty() && !lang.contains('='))
}

pub fn admonition_style(attribute: &str) -> Option<&'static str> {
    let style = block_style(attribute);
    ADMONITION_TYPES.into_iter().find(|t| *t == style)
}

/// `(target, alt)` of a block image macro.
pub fn image(line: &str) -> Option<(&str, &str)> {
    let caps = IMAGE_RE.captures(line)?;
    let target = caps.get(1)?.as_str().trim();
    let alt = caps.get(2).map_or("", |m| m.as_str());
    let alt = alt.split(',').next().unwrap_or("").trim().trim_matches('"');
    Some((target, alt))
}

/// `(type, text)` of an admonition paragraph like `NOTE: Mind the gap`.
pub fn admonition(line: &str) -> Option<(&str, &str)> {
    let caps = ADMONITION_RE.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Single-line comments. `////` opens a comment block instead.
pub fn is_comment(line: &str) -> bool {
    line.starts_with("//") && !line.starts_with("///")
}

/// Cross references in a line: `(target, text)`.
pub fn cross_references(line: &str) -> Vec<(&str, Option<&str>)> {
    XREF_RE
        .captures_iter(line)
        .filter_map(|caps| {
            if let Some(target) = caps.get(1) {
                Some((target.as_str(), caps.get(2).map(|m| m.as_str())))
            } else {
                let target = caps.get(3)?.as_str();
                let text = caps.get(4).map(|m| m.as_str()).filter(|t| !t.is_empty());
                Some((target, text))
            }
        })
        .collect()
}

/// Replaces `{name}` references with attribute values in a single pass.
/// Unknown names are left as written.
pub fn substitute<'a>(text: &'a str, attributes: &BTreeMap<String, String>) -> Cow<'a, str> {
    if !text.contains('{') {
        return Cow::Borrowed(text);
    }
    ATTRIBUTE_REF_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        attributes
            .get(name)
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("= Document Title", Some((1, "Document Title")))]
    #[case("== Section", Some((2, "Section")))]
    #[case("=== Symmetric ===", Some((3, "Symmetric")))]
    #[case("====== Deepest", Some((6, "Deepest")))]
    #[case("======= Too deep", None)]
    #[case("==NoSpace", None)]
    #[case("====", None)]
    #[case("Paragraph == not heading", None)]
    fn recognises_headings(#[case] line: &str, #[case] expected: Option<(usize, &str)>) {
        assert_eq!(heading(line), expected);
    }

    #[rstest]
    #[case("[[install]]", Some("install"))]
    #[case("[[install,Installation]]", Some("install"))]
    #[case("[#setup.lead]", Some("setup"))]
    #[case("[source,rust]", None)]
    #[case("[[broken", None)]
    fn recognises_anchors(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(anchor(line), expected);
    }

    #[rstest]
    #[case("[source,python]", Some("source,python"))]
    #[case("[NOTE]", Some("NOTE"))]
    #[case("[]", Some(""))]
    #[case("[[anchor]]", None)]
    #[case("[#id]", None)]
    #[case("[link text](url)", None)]
    fn recognises_block_attributes(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(block_attribute(line), expected);
    }

    #[test]
    fn splits_positional_block_attributes() {
        assert_eq!(block_style("source,rust,linenums"), "source");
        assert_eq!(source_language("source,rust,linenums"), Some("rust"));
        assert_eq!(source_language("source"), None);
        assert_eq!(source_language("source,subs=attributes"), None);
        assert_eq!(admonition_style("WARNING"), Some("WARNING"));
        assert_eq!(admonition_style("quote"), None);
    }

    #[rstest]
    #[case("image::diagram.png[Architecture]", Some(("diagram.png", "Architecture")))]
    #[case("image::{imagesdir}/a.svg[]", Some(("{imagesdir}/a.svg", "")))]
    #[case(r#"image::logo.png["Company logo",200,100]"#, Some(("logo.png", "Company logo")))]
    #[case("image:inline.png[icon]", None)]
    fn recognises_block_images(#[case] line: &str, #[case] expected: Option<(&str, &str)>) {
        assert_eq!(image(line), expected);
    }

    #[test]
    fn recognises_admonition_paragraphs() {
        assert_eq!(
            admonition("WARNING: Do not run as root."),
            Some(("WARNING", "Do not run as root."))
        );
        assert_eq!(admonition("Note: lowercase is prose"), None);
    }

    #[test]
    fn collects_cross_references() {
        let refs = cross_references("See <<install>>, <<usage,Usage guide>> and xref:faq[the FAQ].");
        assert_eq!(
            refs,
            vec![
                ("install", None),
                ("usage", Some("Usage guide")),
                ("faq", Some("the FAQ")),
            ]
        );
    }

    #[test]
    fn substitutes_known_attributes_once() {
        let mut attributes = BTreeMap::new();
        attributes.insert("product".to_string(), "Docspine".to_string());
        attributes.insert("loop".to_string(), "{loop}".to_string());

        assert_eq!(
            substitute("{product} Guide for {unknown}", &attributes),
            "Docspine Guide for {unknown}"
        );
        assert_eq!(substitute("{loop}", &attributes), "{loop}");
        assert!(matches!(substitute("plain", &attributes), Cow::Borrowed(_)));
    }

    #[rstest]
    #[case("// a comment", true)]
    #[case("////", false)]
    #[case("/// not a comment", false)]
    #[case("http://example.com", false)]
    fn recognises_comment_lines(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_comment(line), expected);
    }
}
