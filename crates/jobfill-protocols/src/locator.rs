//! Structural element queries.
//!
//! A [`Locator`] describes the container element of a form field: its tag,
//! attribute predicates, and which descendants it must (or must not)
//! contain. It covers the subset of XPath that field discovery needs and
//! renders itself in that notation for logs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AttributeMatch {
    /// `[@name]`
    Present { name: String },
    /// `[@name='value']`
    Equals { name: String, value: String },
    /// `[starts-with(@name, 'prefix')]`
    StartsWith { name: String, prefix: String },
}

impl AttributeMatch {
    /// Check the predicate against an attribute value (`None` = absent).
    pub fn test(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (_, None) => false,
            (AttributeMatch::Present { .. }, Some(_)) => true,
            (AttributeMatch::Equals { value: expected, .. }, Some(actual)) => actual == expected,
            (AttributeMatch::StartsWith { prefix, .. }, Some(actual)) => actual.starts_with(prefix),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AttributeMatch::Present { name }
            | AttributeMatch::Equals { name, .. }
            | AttributeMatch::StartsWith { name, .. } => name,
        }
    }
}

impl fmt::Display for AttributeMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeMatch::Present { name } => write!(f, "[@{}]", name),
            AttributeMatch::Equals { name, value } => write!(f, "[@{}='{}']", name, value),
            AttributeMatch::StartsWith { name, prefix } => {
                write!(f, "[starts-with(@{}, '{}')]", name, prefix)
            }
        }
    }
}

/// Structural query matched against descendants of a scope node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Tag name, or `*` for any element.
    #[serde(default = "any_tag")]
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<AttributeMatch>,
    /// Each entry must match at least one descendant.
    #[serde(default)]
    pub has: Vec<Locator>,
    /// No entry may match any descendant.
    #[serde(default)]
    pub has_not: Vec<Locator>,
}

fn any_tag() -> String {
    "*".to_string()
}

impl Locator {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            has: Vec::new(),
            has_not: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self::tag(any_tag())
    }

    pub fn attr_present(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(AttributeMatch::Present { name: name.into() });
        self
    }

    pub fn attr_eq(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(AttributeMatch::Equals {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn attr_starts_with(mut self, name: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.attributes.push(AttributeMatch::StartsWith {
            name: name.into(),
            prefix: prefix.into(),
        });
        self
    }

    pub fn containing(mut self, descendant: Locator) -> Self {
        self.has.push(descendant);
        self
    }

    pub fn not_containing(mut self, descendant: Locator) -> Self {
        self.has_not.push(descendant);
        self
    }

    /// Whether `tag` satisfies this locator's tag test.
    pub fn tag_matches(&self, tag: &str) -> bool {
        self.tag == "*" || self.tag.eq_ignore_ascii_case(tag)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".//{}", self.tag)?;
        for attribute in &self.attributes {
            write!(f, "{}", attribute)?;
        }
        for descendant in &self.has {
            write!(f, "[{}]", descendant)?;
        }
        for descendant in &self.has_not {
            write!(f, "[not({})]", descendant)?;
        }
        Ok(())
    }
}
