//! Locator evaluation against a [`DocumentTree`].

use jobfill_protocols::Locator;

use crate::document::{DocumentTree, NodeId};

impl DocumentTree {
    /// Descendants of `scope` (not `scope` itself) matching `locator`, in
    /// document order.
    pub fn query(&self, locator: &Locator, scope: NodeId) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| self.matches(*node, locator))
            .collect()
    }

    /// Whether `node` itself satisfies `locator`.
    pub fn matches(&self, node: NodeId, locator: &Locator) -> bool {
        let Some(element) = self.element(node) else {
            return false;
        };
        if !locator.tag_matches(&element.tag_name) {
            return false;
        }
        let attributes_ok = locator
            .attributes
            .iter()
            .all(|predicate| predicate.test(self.attribute(node, predicate.name())));
        if !attributes_ok {
            return false;
        }
        let has_ok = locator
            .has
            .iter()
            .all(|inner| self.contains_match(node, inner));
        has_ok
            && !locator
                .has_not
                .iter()
                .any(|inner| self.contains_match(node, inner))
    }

    fn contains_match(&self, scope: NodeId, locator: &Locator) -> bool {
        self.descendants(scope)
            .into_iter()
            .any(|node| self.matches(node, locator))
    }
}
