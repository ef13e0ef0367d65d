use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Code,
    Table,
    Image,
    List,
    Plantuml,
    Admonition,
    Blockquote,
}

impl ElementType {
    pub const ALL: [ElementType; 7] = [
        ElementType::Code,
        ElementType::Table,
        ElementType::Image,
        ElementType::List,
        ElementType::Plantuml,
        ElementType::Admonition,
        ElementType::Blockquote,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Code => "code",
            ElementType::Table => "table",
            ElementType::Image => "image",
            ElementType::List => "list",
            ElementType::Plantuml => "plantuml",
            ElementType::Admonition => "admonition",
            ElementType::Blockquote => "blockquote",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown element type '{0}' (expected one of code, table, image, list, plantuml, admonition, blockquote)")]
pub struct UnknownElementType(pub String);

impl FromStr for ElementType {
    type Err = UnknownElementType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownElementType(s.to_string()))
    }
}

/// A block-level element found inside a section. Elements form a flat list
/// per document and point back at their section by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub attributes: BTreeMap<String, String>,
    pub source_location: SourceLocation,
    pub parent_section: String,
}

impl Element {
    pub fn new(
        element_type: ElementType,
        source_location: SourceLocation,
        parent_section: impl Into<String>,
    ) -> Self {
        Self {
            element_type,
            attributes: BTreeMap::new(),
            source_location,
            parent_section: parent_section.into(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Text body of the element, when it has one.
    pub fn content(&self) -> Option<&str> {
        self.attribute("content")
    }
}
