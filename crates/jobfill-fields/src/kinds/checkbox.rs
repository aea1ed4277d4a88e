use serde_json::Value;

use jobfill_protocols::{Answer, FieldError, Locator};

use super::{find_input, require_input};
use crate::document::{DocumentTree, NodeId, Page};
use crate::kind::FieldKind;

/// Single checkbox with a boolean answer.
pub struct Checkbox {
    locator: Locator,
}

impl Checkbox {
    pub const FIELD_TYPE: &'static str = "Checkbox";

    pub fn new() -> Self {
        Self {
            locator: Self::default_locator(),
        }
    }

    pub fn default_locator() -> Locator {
        Locator::tag("div")
            .attr_starts_with("data-automation-id", "formField-")
            .containing(Locator::tag("input").attr_eq("type", "checkbox"))
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }
}

impl Default for Checkbox {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldKind for Checkbox {
    fn field_type(&self) -> &str {
        Self::FIELD_TYPE
    }

    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn listen_for_changes(&self, tree: &DocumentTree, element: NodeId) -> Vec<NodeId> {
        find_input(tree, element, "checkbox").into_iter().collect()
    }

    fn current_value(&self, tree: &DocumentTree, element: NodeId) -> Option<Answer> {
        let input = find_input(tree, element, "checkbox")?;
        Some(Value::Bool(tree.checked(input)))
    }

    fn answer(&self, stored: &Answer) -> Result<Answer, FieldError> {
        stored
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| FieldError::AnswerType {
                field_type: Self::FIELD_TYPE.to_string(),
                expected: "boolean",
            })
    }

    fn fill(&self, page: &Page, element: NodeId, answer: &Answer) -> Result<(), FieldError> {
        let checked = self.answer(answer)?.as_bool().unwrap_or_default();
        let input = page.read(|tree| require_input(tree, element, Self::FIELD_TYPE, "checkbox"))?;
        page.set_checked(input, checked)
    }
}
