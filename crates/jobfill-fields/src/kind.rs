//! Field kind capabilities and their registry.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use jobfill_protocols::{Answer, FieldError, Locator};

use crate::document::{DocumentTree, NodeId, Page};

/// Behaviour a concrete kind of form field supplies to the framework.
///
/// `element` is always the container matched by [`FieldKind::locator`]; the
/// kind decides which of its descendants hold the live value.
pub trait FieldKind: Send + Sync {
    /// Stable tag stored in every field path this kind produces.
    fn field_type(&self) -> &str;

    /// Query matching the container elements this kind automates.
    fn locator(&self) -> &Locator;

    /// Nodes whose value changes should trigger a refresh.
    fn listen_for_changes(&self, tree: &DocumentTree, element: NodeId) -> Vec<NodeId>;

    /// Live value shown by the field, `None` when it cannot be read.
    fn current_value(&self, tree: &DocumentTree, element: NodeId) -> Option<Answer>;

    /// Narrow a stored answer to this kind's shape.
    fn answer(&self, stored: &Answer) -> Result<Answer, FieldError>;

    /// Write `answer` into the live field.
    fn fill(&self, page: &Page, element: NodeId, answer: &Answer) -> Result<(), FieldError>;

    /// Repeating group the element belongs to.
    fn section(&self, _tree: &DocumentTree, _element: NodeId) -> String {
        String::new()
    }

    /// Text of the first `label` inside the element.
    fn field_name(&self, tree: &DocumentTree, element: NodeId) -> String {
        match tree.find_first(element, "label") {
            Some(label) => tree.inner_text(label),
            None => {
                debug!("{} field {} has no label", self.field_type(), element);
                String::new()
            }
        }
    }

    /// Sensitive kinds never have their values logged.
    fn is_sensitive(&self) -> bool {
        false
    }
}

/// Field kinds keyed by their type tag.
pub struct KindRegistry {
    kinds: DashMap<String, Arc<dyn FieldKind>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self {
            kinds: DashMap::new(),
        }
    }

    /// Register a kind.
    ///
    /// Fails with [`FieldError::Contract`] when the tag is empty or already
    /// taken.
    pub fn register(&self, kind: Arc<dyn FieldKind>) -> Result<(), FieldError> {
        let tag = kind.field_type().to_string();
        if tag.trim().is_empty() {
            return Err(FieldError::Contract("field kind with empty type tag".into()));
        }

        match self.kinds.entry(tag.clone()) {
            Entry::Occupied(_) => Err(FieldError::Contract(format!(
                "duplicate field type '{}'",
                tag
            ))),
            Entry::Vacant(slot) => {
                debug!("Registered field kind {} ({})", tag, kind.locator());
                slot.insert(kind);
                Ok(())
            }
        }
    }

    pub fn get(&self, field_type: &str) -> Option<Arc<dyn FieldKind>> {
        self.kinds.get(field_type).map(|kind| kind.clone())
    }

    pub fn contains(&self, field_type: &str) -> bool {
        self.kinds.contains_key(field_type)
    }

    /// All kinds, ordered by tag.
    pub fn kinds(&self) -> Vec<Arc<dyn FieldKind>> {
        let mut kinds: Vec<Arc<dyn FieldKind>> =
            self.kinds.iter().map(|entry| entry.value().clone()).collect();
        kinds.sort_by(|a, b| a.field_type().cmp(b.field_type()));
        kinds
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.kinds().iter().map(|k| k.field_type().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "kind_tests.rs"]
mod tests;
