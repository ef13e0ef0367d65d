use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("heading regex"));
static INLINE_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--.*?(?:-->|$)").expect("comment regex"));
static CLOSING_HASHES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)#+\s*$").expect("closing sequence regex"));
static HEADING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\{#([A-Za-z_][\w:.-]*)\}\s*$").expect("heading id regex"));
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).expect("image regex")
});
static QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}> ?(.*)$").expect("blockquote regex"));
static ALERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[!(NOTE|TIP|IMPORTANT|WARNING|CAUTION)\]\s*$").expect("alert regex")
});
static TABLE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?\s*:?-+:?\s*(?:\|\s*:?-+:?\s*)*\|?\s*$").expect("table separator regex")
});

/// A parsed ATX heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtxHeading {
    pub markers: usize,
    pub title: String,
    pub anchor: Option<String>,
}

/// Recognises `## Title`, dropping inline HTML comments, a closing `#`
/// sequence and a trailing `{#id}`.
pub fn heading(line: &str) -> Option<AtxHeading> {
    let caps = HEADING_RE.captures(line)?;
    let markers = caps.get(1)?.len();
    let raw = caps.get(2)?.as_str();

    let without_comments = INLINE_COMMENT_RE.replace_all(raw, "");
    let mut title = without_comments.trim().to_string();
    let mut anchor = None;
    if let Some(id) = HEADING_ID_RE.captures(&title) {
        anchor = id.get(1).map(|m| m.as_str().to_string());
        let cut = id.get(0).map_or(title.len(), |m| m.start());
        title.truncate(cut);
    }
    let title = CLOSING_HASHES_RE.replace(&title, "").trim().to_string();

    Some(AtxHeading {
        markers,
        title,
        anchor,
    })
}

/// `(alt, target)` for every image in a line.
pub fn images(line: &str) -> Vec<(&str, &str)> {
    IMAGE_RE
        .captures_iter(line)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect()
}

/// Text after the `>` marker of a blockquote line.
pub fn quote_body(line: &str) -> Option<&str> {
    QUOTE_RE.captures(line)?.get(1).map(|m| m.as_str())
}

/// Admonition type of a GitHub alert marker such as `[!NOTE]`.
pub fn alert(body: &str) -> Option<&str> {
    ALERT_RE.captures(body.trim())?.get(1).map(|m| m.as_str())
}

pub fn is_table_separator(line: &str) -> bool {
    line.contains('|') && TABLE_SEPARATOR_RE.is_match(line)
}

/// Number of cells in a pipe table row. Escaped pipes do not split cells.
pub fn table_cells(line: &str) -> usize {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_suffix('|')
        .filter(|rest| !rest.ends_with('\\'))
        .unwrap_or(trimmed);
    let mut cells = 1;
    let mut escaped = false;
    for ch in trimmed.chars() {
        match ch {
            '\\' if !escaped => escaped = true,
            '|' if !escaped => cells += 1,
            _ => escaped = false,
        }
    }
    cells
}

/// Where HTML comments leave a line: inside an unterminated comment or not.
pub fn ends_inside_comment(line: &str) -> bool {
    match line.rfind("<!--") {
        Some(open) => !line[open + 4..].contains("-->"),
        None => false,
    }
}

/// A line holding nothing but complete HTML comments.
pub fn is_comment_only(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("<!--")
        && !ends_inside_comment(trimmed)
        && INLINE_COMMENT_RE.replace_all(trimmed, "").trim().is_empty()
}

/// Splits YAML front matter off the start of `lines`. Returns the number of
/// lines it occupies, including both delimiters, and its top-level scalar
/// keys.
pub fn front_matter<S: AsRef<str>>(lines: &[S]) -> Option<(usize, BTreeMap<String, String>)> {
    if lines.first()?.as_ref().trim_end() != "---" {
        return None;
    }
    let close = lines
        .iter()
        .skip(1)
        .position(|l| matches!(l.as_ref().trim_end(), "---" | "..."))?
        + 1;
    let yaml = lines[1..close]
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");

    let attributes = match serde_yaml::from_str::<serde_yaml::Value>(&yaml) {
        Ok(serde_yaml::Value::Mapping(map)) => map
            .iter()
            .filter_map(|(key, value)| Some((key.as_str()?.to_string(), scalar(value)?)))
            .collect(),
        Ok(_) => BTreeMap::new(),
        Err(err) => {
            debug!("Ignoring unparsable front matter: {err}");
            BTreeMap::new()
        }
    };
    Some((close + 1, attributes))
}

fn scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
