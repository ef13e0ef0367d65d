//! Recognition of preprocessor lines: conditionals, includes and attribute
//! entries. Only whole-line directives are recognised.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static CONDITIONAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(ifdef|ifndef)::([^\[\s]*)\[(.*)\]\s*$").expect("conditional regex")
});
static IFEVAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ifeval::\[(.*)\]\s*$").expect("ifeval regex"));
static ENDIF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^endif::([^\[\s]*)\[\]\s*$").expect("endif regex"));
static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^include::([^\[]+)\[(.*)\]\s*$").expect("include regex"));
static ATTRIBUTE_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:(!)?([A-Za-z0-9_][A-Za-z0-9_-]*)(!)?:\s*(.*?)\s*$")
        .expect("attribute entry regex")
});

const DIRECTIVE_PREFIXES: [&str; 5] = ["ifdef::", "ifndef::", "ifeval::", "endif::", "include::"];

/// How several attribute names in one conditional combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a+b`: every attribute must satisfy the test.
    All,
    /// `a,b`: any attribute may satisfy the test.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition<'a> {
    pub negated: bool,
    pub names: Vec<&'a str>,
    pub combinator: Combinator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `ifdef::a[]`, `ifndef::a[]` or their single-line `[content]` forms.
    Conditional {
        condition: Condition<'a>,
        inline: Option<&'a str>,
    },
    /// Treated as an always-true opener so its `endif` balances.
    Ifeval,
    Endif,
    Include {
        target: &'a str,
        options: &'a str,
    },
    AttributeEntry {
        name: &'a str,
        value: &'a str,
        unset: bool,
    },
    /// A backslash-escaped directive, with the backslash removed.
    Escaped(&'a str),
}

impl<'a> Directive<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        if let Some(rest) = line.strip_prefix('\\') {
            return DIRECTIVE_PREFIXES
                .iter()
                .any(|p| rest.starts_with(p))
                .then_some(Directive::Escaped(rest));
        }

        if let Some(caps) = CONDITIONAL_RE.captures(line) {
            let (_, [keyword, names, inline]) = caps.extract();
            let (names, combinator) = split_names(names);
            return Some(Directive::Conditional {
                condition: Condition {
                    negated: keyword == "ifndef",
                    names,
                    combinator,
                },
                inline: (!inline.is_empty()).then_some(inline),
            });
        }
        if IFEVAL_RE.is_match(line) {
            return Some(Directive::Ifeval);
        }
        if ENDIF_RE.is_match(line) {
            return Some(Directive::Endif);
        }
        if let Some(caps) = INCLUDE_RE.captures(line) {
            let (_, [target, options]) = caps.extract();
            return Some(Directive::Include {
                target: target.trim(),
                options,
            });
        }
        if let Some(caps) = ATTRIBUTE_ENTRY_RE.captures(line) {
            let name = caps.get(2)?.as_str();
            let unset = caps.get(1).is_some() || caps.get(3).is_some();
            let value = caps.get(4).map_or("", |m| m.as_str());
            return Some(Directive::AttributeEntry { name, value, unset });
        }
        None
    }
}

fn split_names(raw: &str) -> (Vec<&str>, Combinator) {
    let (separator, combinator) = if raw.contains('+') {
        ('+', Combinator::All)
    } else {
        (',', Combinator::Any)
    };
    let names = raw
        .split(separator)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    (names, combinator)
}

/// Parses include options such as `leveloffset=+1,lines=5..10,opts=optional`.
/// Bare keys map to the empty string; surrounding quotes are removed.
pub fn parse_include_options(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            ),
            None => (part.to_string(), String::new()),
        })
        .collect()
}

/// Applies a `leveloffset` option to the current offset. `+N`/`-N` are
/// relative, a bare number is absolute.
pub fn apply_level_offset(current: i32, option: Option<&str>) -> i32 {
    let Some(raw) = option.map(str::trim) else {
        return current;
    };
    let relative = raw.starts_with('+') || raw.starts_with('-');
    match raw.trim_start_matches('+').parse::<i32>() {
        Ok(n) if relative => current + n,
        Ok(n) => n,
        Err(_) => current,
    }
}
