#![forbid(unsafe_code)]

//! Role selectors.
//!
//! A [`Selector`] is the identification rule for one structural role
//! (group, panel, toggle, content). Four forms are recognized:
//!
//! | Text            | Matches                                    |
//! |-----------------|--------------------------------------------|
//! | `.name`         | nodes carrying class `name`                |
//! | `#name`         | the node whose `id` is `name`              |
//! | `[attr]`        | nodes with attribute `attr`                |
//! | `[attr=value]`  | nodes whose `attr` equals `value`          |
//! | anything else   | tag name, case-insensitive                 |
//!
//! Quotes around attribute values are stripped, so `[data-role="toggle"]`
//! and `[data-role=toggle]` are equivalent.

use core::fmt;
use core::str::FromStr;

use crate::tree::{NodeId, PresentationTree};

/// Parsed identification rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Class(String),
    Id(String),
    Attribute { name: String, value: Option<String> },
    Tag(String),
}

/// Error parsing a selector string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Empty or whitespace-only selector.
    Empty,
    /// A `.` or `#` prefix with nothing after it.
    MissingName(char),
    /// `[` without a closing `]`, or `[]` / `[=x]`.
    MalformedAttribute(String),
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::MissingName(prefix) => write!(f, "selector `{prefix}` has no name"),
            Self::MalformedAttribute(raw) => write!(f, "malformed attribute selector `{raw}`"),
        }
    }
}

impl std::error::Error for SelectorError {}

impl Selector {
    /// Parse selector text.
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let text = raw.trim();
        let mut chars = text.chars();
        match chars.next() {
            None => Err(SelectorError::Empty),
            Some(prefix @ ('.' | '#')) => {
                let name = chars.as_str();
                if name.is_empty() {
                    return Err(SelectorError::MissingName(prefix));
                }
                Ok(if prefix == '.' {
                    Self::Class(name.to_string())
                } else {
                    Self::Id(name.to_string())
                })
            }
            Some('[') => {
                let inner = text
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or_else(|| SelectorError::MalformedAttribute(text.to_string()))?;
                let (name, value) = match inner.split_once('=') {
                    Some((name, value)) => {
                        (name.trim(), Some(value.trim().replace(['"', '\''], "")))
                    }
                    None => (inner.trim(), None),
                };
                if name.is_empty() {
                    return Err(SelectorError::MalformedAttribute(text.to_string()));
                }
                Ok(Self::Attribute {
                    name: name.to_string(),
                    value,
                })
            }
            Some(_) => Ok(Self::Tag(text.to_ascii_lowercase())),
        }
    }

    /// Whether `node` satisfies this rule.
    pub fn matches<T: PresentationTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        match self {
            Self::Class(class) => tree.has_class(node, class),
            Self::Id(id) => tree.element_id(node) == Some(id.as_str()),
            Self::Attribute { name, value: None } => tree.attribute(node, name).is_some(),
            Self::Attribute {
                name,
                value: Some(value),
            } => tree.attribute(node, name) == Some(value.as_str()),
            Self::Tag(tag) => tree
                .tag_name(node)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(tag)),
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, ".{class}"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::Attribute { name, value: None } => write!(f, "[{name}]"),
            Self::Attribute {
                name,
                value: Some(value),
            } => write!(f, "[{name}=\"{value}\"]"),
            Self::Tag(tag) => f.write_str(tag),
        }
    }
}
