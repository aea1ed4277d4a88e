//! Field identity model.
//!
//! A [`FieldPath`] names a logical answer slot. It is independent of any
//! document element: the same labelled field re-rendered on a later page
//! load resolves to the same path and therefore the same stored answer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Answer payload. Each field kind narrows this to its own shape
/// (string for text inputs, boolean for checkboxes, ...).
pub type Answer = serde_json::Value;

/// Logical position of a form field.
///
/// All four components are always present; `section` is empty when the
/// page has no repeating groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPath {
    /// Page heading the field appears under.
    pub page: String,
    /// Repeating group (e.g. one entry of a work history), or empty.
    pub section: String,
    /// Stable tag of the field kind that owns the element.
    pub field_type: String,
    /// Label text of the field.
    pub field_name: String,
}

impl FieldPath {
    pub fn new(
        page: impl Into<String>,
        section: impl Into<String>,
        field_type: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            page: page.into(),
            section: section.into(),
            field_type: field_type.into(),
            field_name: field_name.into(),
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Key under which the answer store files this path.
    ///
    /// Encoded as a JSON array of the four components, so string escaping
    /// keeps distinct paths from ever producing the same key.
    pub fn store_key(&self) -> String {
        serde_json::json!([
            self.page,
            self.section,
            self.field_type,
            self.field_name
        ])
        .to_string()
    }

    /// Attach a value to this path.
    pub fn snapshot(&self, answer: Option<Answer>) -> FieldSnapshot {
        FieldSnapshot {
            path: self.clone(),
            answer,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.section.is_empty() {
            write!(f, "{} > {} ({})", self.page, self.field_name, self.field_type)
        } else {
            write!(
                f,
                "{} > {} > {} ({})",
                self.page, self.section, self.field_name, self.field_type
            )
        }
    }
}

/// A field path together with a value.
///
/// Used both for the live value captured from the page and for the answer
/// held by the store. Built fresh on every read and never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    #[serde(flatten)]
    pub path: FieldPath,
    #[serde(default)]
    pub answer: Option<Answer>,
}

impl FieldSnapshot {
    pub fn new(path: FieldPath, answer: Option<Answer>) -> Self {
        Self { path, answer }
    }

    pub fn store_key(&self) -> String {
        self.path.store_key()
    }
}

#[cfg(test)]
#[path = "field_tests.rs"]
mod tests;
