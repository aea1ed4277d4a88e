use serde_json::Value;

use jobfill_protocols::{Answer, FieldError, Locator};

use super::{expect_string, find_input, require_input};
use crate::document::{DocumentTree, NodeId, Page};
use crate::kind::FieldKind;

/// Password input. Values are persisted like text but never logged.
pub struct PasswordInput {
    locator: Locator,
}

impl PasswordInput {
    pub const FIELD_TYPE: &'static str = "PasswordInput";

    pub fn new() -> Self {
        Self {
            locator: Self::default_locator(),
        }
    }

    pub fn default_locator() -> Locator {
        Locator::tag("div")
            .attr_starts_with("data-automation-id", "formField-")
            .containing(Locator::tag("input").attr_eq("type", "password"))
            .not_containing(Locator::any().attr_present("aria-haspopup"))
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }
}

impl Default for PasswordInput {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldKind for PasswordInput {
    fn field_type(&self) -> &str {
        Self::FIELD_TYPE
    }

    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn listen_for_changes(&self, tree: &DocumentTree, element: NodeId) -> Vec<NodeId> {
        find_input(tree, element, "password").into_iter().collect()
    }

    fn current_value(&self, tree: &DocumentTree, element: NodeId) -> Option<Answer> {
        let input = find_input(tree, element, "password")?;
        tree.value(input).map(|v| Value::String(v.to_string()))
    }

    fn answer(&self, stored: &Answer) -> Result<Answer, FieldError> {
        expect_string(Self::FIELD_TYPE, stored).map(Value::String)
    }

    fn fill(&self, page: &Page, element: NodeId, answer: &Answer) -> Result<(), FieldError> {
        let value = expect_string(Self::FIELD_TYPE, answer)?;
        let input = page.read(|tree| require_input(tree, element, Self::FIELD_TYPE, "password"))?;
        page.set_value(input, value)
    }

    fn is_sensitive(&self) -> bool {
        true
    }
}
