#![forbid(unsafe_code)]

//! In-memory [`PresentationTree`] with a replayable patch journal.
//!
//! `MemoryTree` backs every test in this workspace and the web runner. Hosts
//! that mirror a real document drain [`TreePatch`] values with
//! [`MemoryTree::take_patches`] and replay them onto their own nodes.
//!
//! Only real changes are journaled: adding a class that is already present,
//! or writing the value a property already holds, records nothing.

use core::fmt;

use ahash::AHashMap;

use crate::tree::{
    HostCapabilities, NodeId, PresentationTree, StyleProperty, StyleValue, TransitionEventName,
};

/// One recorded tree mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum TreePatch {
    AddClass { node: NodeId, class: String },
    RemoveClass { node: NodeId, class: String },
    SetStyle { node: NodeId, property: StyleProperty, value: StyleValue },
    ClearStyle { node: NodeId, property: StyleProperty },
}

impl TreePatch {
    /// Node the patch applies to.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        match self {
            Self::AddClass { node, .. }
            | Self::RemoveClass { node, .. }
            | Self::SetStyle { node, .. }
            | Self::ClearStyle { node, .. } => *node,
        }
    }
}

/// Description of a node to insert.
#[derive(Debug, Clone, Default)]
pub struct Element {
    tag: String,
    element_id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    natural_height: f64,
}

impl Element {
    /// Create an element with the given tag name.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Add a class.
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set the `id` attribute.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.element_id = Some(id.into());
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Set the measured content height.
    #[must_use]
    pub fn natural_height(mut self, px: f64) -> Self {
        self.natural_height = px;
        self
    }
}

#[derive(Debug, Clone)]
struct MemoryNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tag: String,
    element_id: Option<String>,
    classes: Vec<String>,
    attributes: AHashMap<String, String>,
    styles: AHashMap<StyleProperty, StyleValue>,
    natural_height: f64,
}

impl MemoryNode {
    fn from_element(parent: Option<NodeId>, element: Element) -> Self {
        let mut classes: Vec<String> = Vec::with_capacity(element.classes.len());
        for class in element.classes {
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
        Self {
            parent,
            children: Vec::new(),
            tag: element.tag,
            element_id: element.element_id,
            classes,
            attributes: element.attributes.into_iter().collect(),
            styles: AHashMap::new(),
            natural_height: element.natural_height,
        }
    }
}

/// Error inserting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTreeError {
    /// A node with this id already exists.
    DuplicateNode(NodeId),
    /// The parent id is not in the tree.
    UnknownParent(NodeId),
}

impl fmt::Display for MemoryTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode(id) => write!(f, "duplicate node: {id}"),
            Self::UnknownParent(id) => write!(f, "unknown parent: {id}"),
        }
    }
}

impl std::error::Error for MemoryTreeError {}

/// In-memory presentation tree.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    nodes: AHashMap<NodeId, MemoryNode>,
    root: NodeId,
    next_id: u32,
    capabilities: HostCapabilities,
    transition_event: Option<TransitionEventName>,
    journal: Vec<TreePatch>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Create a fully capable tree holding only an `html` root with id 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(NodeId::new(0), Element::new("html"))
    }

    /// Create a tree whose root has a host-chosen id.
    #[must_use]
    pub fn with_root(root: NodeId, element: Element) -> Self {
        let mut nodes = AHashMap::new();
        nodes.insert(root, MemoryNode::from_element(None, element));
        Self {
            nodes,
            root,
            next_id: root.get().saturating_add(1),
            capabilities: HostCapabilities::all(),
            transition_event: Some(TransitionEventName::TransitionEnd),
            journal: Vec::new(),
        }
    }

    /// Override advertised capabilities (builder pattern).
    #[must_use]
    pub fn capabilities_override(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Override the supported completion event (builder pattern).
    #[must_use]
    pub fn transition_event_override(mut self, event: Option<TransitionEventName>) -> Self {
        self.transition_event = event;
        self
    }

    /// Append `element` under `parent` with the next free id.
    ///
    /// Appending under an unknown parent attaches to the root.
    pub fn append(&mut self, parent: NodeId, element: Element) -> NodeId {
        let parent = if self.nodes.contains_key(&parent) {
            parent
        } else {
            self.root
        };
        while self.nodes.contains_key(&NodeId::new(self.next_id)) {
            self.next_id = self.next_id.saturating_add(1);
        }
        let id = NodeId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.link(id, parent, element);
        id
    }

    /// Insert `element` under `parent` with a host-chosen id.
    pub fn insert(
        &mut self,
        id: NodeId,
        parent: NodeId,
        element: Element,
    ) -> Result<(), MemoryTreeError> {
        if self.nodes.contains_key(&id) {
            return Err(MemoryTreeError::DuplicateNode(id));
        }
        if !self.nodes.contains_key(&parent) {
            return Err(MemoryTreeError::UnknownParent(parent));
        }
        self.link(id, parent, element);
        if id.get() >= self.next_id {
            self.next_id = id.get().saturating_add(1);
        }
        Ok(())
    }

    fn link(&mut self, id: NodeId, parent: NodeId, element: Element) {
        self.nodes
            .insert(id, MemoryNode::from_element(Some(parent), element));
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
    }

    /// Whether `node` exists.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Number of nodes including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Classes of `node` in insertion order.
    #[must_use]
    pub fn classes(&self, node: NodeId) -> &[String] {
        self.nodes
            .get(&node)
            .map(|n| n.classes.as_slice())
            .unwrap_or(&[])
    }

    /// Update the measured content height (e.g. after reflow).
    pub fn set_natural_height(&mut self, node: NodeId, px: f64) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.natural_height = px;
        }
    }

    /// Recorded patches since the last drain.
    #[must_use]
    pub fn patches(&self) -> &[TreePatch] {
        &self.journal
    }

    /// Drain recorded patches.
    pub fn take_patches(&mut self) -> Vec<TreePatch> {
        std::mem::take(&mut self.journal)
    }
}

impl PresentationTree for MemoryTree {
    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn transition_event(&self) -> Option<TransitionEventName> {
        self.transition_event
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.tag.as_str())
    }

    fn element_id(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).and_then(|n| n.element_id.as_deref())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        let n = self.nodes.get(&node)?;
        if name == "id" {
            return n.element_id.as_deref();
        }
        n.attributes.get(name).map(String::as_str)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        let Some(n) = self.nodes.get_mut(&node) else {
            return;
        };
        if n.classes.iter().any(|c| c == class) {
            return;
        }
        n.classes.push(class.to_string());
        self.journal.push(TreePatch::AddClass {
            node,
            class: class.to_string(),
        });
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(n) = self.nodes.get_mut(&node) else {
            return;
        };
        let before = n.classes.len();
        n.classes.retain(|c| c != class);
        if n.classes.len() != before {
            self.journal.push(TreePatch::RemoveClass {
                node,
                class: class.to_string(),
            });
        }
    }

    fn style(&self, node: NodeId, property: StyleProperty) -> Option<StyleValue> {
        self.nodes
            .get(&node)
            .and_then(|n| n.styles.get(&property).copied())
    }

    fn set_style(&mut self, node: NodeId, property: StyleProperty, value: StyleValue) {
        let Some(n) = self.nodes.get_mut(&node) else {
            return;
        };
        if n.styles.get(&property) == Some(&value) {
            return;
        }
        n.styles.insert(property, value);
        self.journal.push(TreePatch::SetStyle {
            node,
            property,
            value,
        });
    }

    fn clear_style(&mut self, node: NodeId, property: StyleProperty) {
        let Some(n) = self.nodes.get_mut(&node) else {
            return;
        };
        if n.styles.remove(&property).is_some() {
            self.journal
                .push(TreePatch::ClearStyle { node, property });
        }
    }

    fn natural_height(&self, node: NodeId) -> f64 {
        self.nodes.get(&node).map_or(0.0, |n| n.natural_height)
    }
}
