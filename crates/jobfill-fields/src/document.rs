//! In-memory document model.
//!
//! [`DocumentTree`] is an arena of nodes addressed by [`NodeId`]. Slots are
//! never reused, so an id held by a field automation keeps pointing at the
//! same node even after that node is detached. [`Page`] wraps a tree with
//! a lock and a mutation event stream, standing in for the live page the
//! automations observe.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use jobfill_protocols::FieldError;

/// Handle to a node in a [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag_name: String,
    pub attrs: BTreeMap<String, String>,
    /// Live value of form controls.
    pub value: String,
    pub checked: bool,
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    node_type: NodeType,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }
}

/// Arena-backed element tree.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DocumentTree {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    fn check(&self, id: NodeId) -> Result<(), FieldError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(FieldError::NodeNotFound(id.to_string()))
        }
    }

    pub fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: impl Into<String>,
        attrs: BTreeMap<String, String>,
    ) -> Result<NodeId, FieldError> {
        self.check(parent)?;
        let value = attrs.get("value").cloned().unwrap_or_default();
        let checked = attrs.contains_key("checked");
        let element = Element {
            tag_name: tag_name.into(),
            attrs,
            value,
            checked,
        };
        Ok(self.create_node(Some(parent), NodeType::Element(element)))
    }

    pub fn create_text(&mut self, parent: NodeId, text: impl Into<String>) -> Result<NodeId, FieldError> {
        self.check(parent)?;
        Ok(self.create_node(Some(parent), NodeType::Text(text.into())))
    }

    /// Build `spec` under `parent` and return the id of its top node.
    pub fn append_spec(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId, FieldError> {
        let id = self.create_element(parent, spec.tag.clone(), spec.attributes.clone())?;
        if let Some(element) = self.element_mut(id) {
            if let Some(value) = &spec.value {
                element.value = value.clone();
            }
            if spec.checked {
                element.checked = true;
            }
        }
        if let Some(text) = &spec.text {
            self.create_text(id, text.clone())?;
        }
        for child in &spec.children {
            self.append_spec(id, child)?;
        }
        Ok(id)
    }

    /// Detach `id` from its parent. Returns the detached node followed by
    /// its descendants.
    pub fn detach(&mut self, id: NodeId) -> Result<Vec<NodeId>, FieldError> {
        self.check(id)?;
        if id == self.root {
            return Err(FieldError::InvalidDocument("cannot remove the document root".into()));
        }
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
        let mut removed = vec![id];
        removed.extend(self.descendants(id));
        Ok(removed)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_or_err(&mut self, id: NodeId) -> Result<&mut Element, FieldError> {
        self.element_mut(id)
            .ok_or_else(|| FieldError::NodeNotFound(format!("element {}", id)))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether `id` is still reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).last().copied() == Some(self.root)
    }

    /// All nodes below `id`, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), FieldError> {
        self.element_or_err(id)?.attrs.insert(name.into(), value.into());
        Ok(())
    }

    /// Rendered text below `id`: text nodes trimmed, blanks dropped, and
    /// the rest joined with single spaces.
    pub fn inner_text(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match &self.nodes[node.0].node_type {
                NodeType::Text(text) => Some(text.trim()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.value.as_str())
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> Result<(), FieldError> {
        self.element_or_err(id)?.value = value.into();
        Ok(())
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|e| e.checked)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), FieldError> {
        self.element_or_err(id)?.checked = checked;
        Ok(())
    }

    /// First descendant of `scope` with the given tag.
    pub fn find_first(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(scope).into_iter().find(|node| {
            self.tag_name(*node)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
        })
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Declarative element description used to build documents.
///
/// ```json
/// {"tag": "div", "attributes": {"data-automation-id": "formField-email"},
///  "children": [{"tag": "label", "text": "Email"}, {"tag": "input"}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// Structural or value change on a [`Page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    NodesInserted { parent: NodeId, nodes: Vec<NodeId> },
    NodesRemoved { nodes: Vec<NodeId> },
    ValueChanged { node: NodeId },
    AttributeChanged { node: NodeId, name: String },
}

/// Live document shared by the automations on it.
///
/// Mutations take the write lock only for the change itself; the matching
/// [`DocumentEvent`] goes out after the lock is released.
pub struct Page {
    tree: RwLock<DocumentTree>,
    events: broadcast::Sender<DocumentEvent>,
}

impl Page {
    pub fn new() -> Self {
        Self::from_tree(DocumentTree::new())
    }

    pub fn from_tree(tree: DocumentTree) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            tree: RwLock::new(tree),
            events,
        }
    }

    /// Build a page whose root holds `specs`, in order.
    pub fn from_specs(specs: &[NodeSpec]) -> Result<Self, FieldError> {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        for spec in specs {
            tree.append_spec(root, spec)?;
        }
        Ok(Self::from_tree(tree))
    }

    /// Parse a JSON document: either a single [`NodeSpec`] or an array.
    pub fn load_json(json: &str) -> Result<Self, FieldError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DocumentSpec {
            Many(Vec<NodeSpec>),
            One(NodeSpec),
        }

        let spec: DocumentSpec =
            serde_json::from_str(json).map_err(|e| FieldError::InvalidDocument(e.to_string()))?;
        match spec {
            DocumentSpec::Many(specs) => Self::from_specs(&specs),
            DocumentSpec::One(spec) => Self::from_specs(std::slice::from_ref(&spec)),
        }
    }

    pub fn root(&self) -> NodeId {
        self.tree.read().root()
    }

    /// Run `f` against a consistent view of the tree.
    pub fn read<R>(&self, f: impl FnOnce(&DocumentTree) -> R) -> R {
        f(&self.tree.read())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DocumentEvent) {
        trace!("document event: {:?}", event);
        let _ = self.events.send(event);
    }

    pub fn insert(&self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId, FieldError> {
        let id = self.tree.write().append_spec(parent, spec)?;
        self.emit(DocumentEvent::NodesInserted {
            parent,
            nodes: vec![id],
        });
        Ok(id)
    }

    pub fn remove(&self, node: NodeId) -> Result<Vec<NodeId>, FieldError> {
        let removed = self.tree.write().detach(node)?;
        self.emit(DocumentEvent::NodesRemoved {
            nodes: removed.clone(),
        });
        Ok(removed)
    }

    pub fn set_value(&self, node: NodeId, value: impl Into<String>) -> Result<(), FieldError> {
        self.tree.write().set_value(node, value)?;
        self.emit(DocumentEvent::ValueChanged { node });
        Ok(())
    }

    pub fn set_checked(&self, node: NodeId, checked: bool) -> Result<(), FieldError> {
        self.tree.write().set_checked(node, checked)?;
        self.emit(DocumentEvent::ValueChanged { node });
        Ok(())
    }

    pub fn set_attribute(
        &self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), FieldError> {
        let name = name.into();
        self.tree.write().set_attribute(node, name.clone(), value)?;
        self.emit(DocumentEvent::AttributeChanged { node, name });
        Ok(())
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
