use serde_json::Value;

use jobfill_protocols::{Answer, FieldError, Locator};

use super::{expect_string, find_input, require_input};
use crate::document::{DocumentTree, NodeId, Page};
use crate::kind::FieldKind;

/// Single-line text input.
pub struct TextInput {
    locator: Locator,
    section_attribute: Option<String>,
}

impl TextInput {
    pub const FIELD_TYPE: &'static str = "TextInput";

    pub fn new() -> Self {
        Self {
            locator: Self::default_locator(),
            section_attribute: None,
        }
    }

    /// `.//div[starts-with(@data-automation-id, 'formField-')][.//input[@type='text']][not(.//*[@aria-haspopup])]`
    pub fn default_locator() -> Locator {
        Locator::tag("div")
            .attr_starts_with("data-automation-id", "formField-")
            .containing(Locator::tag("input").attr_eq("type", "text"))
            .not_containing(Locator::any().attr_present("aria-haspopup"))
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    /// Take the section from the nearest ancestor carrying `attribute`.
    pub fn with_section_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.section_attribute = Some(attribute.into());
        self
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldKind for TextInput {
    fn field_type(&self) -> &str {
        Self::FIELD_TYPE
    }

    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn listen_for_changes(&self, tree: &DocumentTree, element: NodeId) -> Vec<NodeId> {
        find_input(tree, element, "text").into_iter().collect()
    }

    fn current_value(&self, tree: &DocumentTree, element: NodeId) -> Option<Answer> {
        let input = find_input(tree, element, "text")?;
        tree.value(input).map(|v| Value::String(v.to_string()))
    }

    fn answer(&self, stored: &Answer) -> Result<Answer, FieldError> {
        expect_string(Self::FIELD_TYPE, stored).map(Value::String)
    }

    fn fill(&self, page: &Page, element: NodeId, answer: &Answer) -> Result<(), FieldError> {
        let value = expect_string(Self::FIELD_TYPE, answer)?;
        let input = page.read(|tree| require_input(tree, element, Self::FIELD_TYPE, "text"))?;
        page.set_value(input, value)
    }

    fn section(&self, tree: &DocumentTree, element: NodeId) -> String {
        let Some(attribute) = &self.section_attribute else {
            return String::new();
        };
        tree.ancestors(element)
            .into_iter()
            .find_map(|node| tree.attribute(node, attribute).map(str::to_string))
            .unwrap_or_default()
    }
}
