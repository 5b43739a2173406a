#![forbid(unsafe_code)]

//! JSON tree snapshots.
//!
//! A JS host serializes the part of its document the accordion cares about
//! and hands it over once per page:
//!
//! ```json
//! {
//!   "capabilities": ["treeQuery", "eventSubscription", "classList", "computedStyle"],
//!   "transitionEvent": "transitionend",
//!   "nodes": [
//!     { "id": 0, "parent": null, "tag": "html" },
//!     { "id": 1, "parent": 0, "tag": "div", "classes": ["accordion"] },
//!     { "id": 2, "parent": 1, "tag": "div", "classes": ["accordion-panel", "is-active"] },
//!     { "id": 3, "parent": 2, "tag": "button", "classes": ["accordion-toggle"] },
//!     { "id": 4, "parent": 2, "tag": "div", "classes": ["accordion-content"], "naturalHeight": 120 }
//!   ]
//! }
//! ```
//!
//! Nodes are listed parents-first. The first node is the document root and
//! is the only one with a `null` parent. Omitting `capabilities` means a
//! fully capable host; omitting `transitionEvent` means `transitionend`,
//! while an explicit `null` means the host has no completion event.

use core::fmt;
use std::collections::BTreeMap;

use accordion_core::{
    Element, HostCapabilities, MemoryTree, MemoryTreeError, NodeId, TransitionEventName,
};
use serde::{Deserialize, Serialize};

/// Serialized document subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
    #[serde(default = "default_transition_event")]
    pub transition_event: Option<String>,
    pub nodes: Vec<NodeSnapshot>,
}

fn default_transition_event() -> Option<String> {
    Some(TransitionEventName::TransitionEnd.as_str().to_string())
}

/// One serialized node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: u32,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub element_id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub natural_height: f64,
}

fn default_tag() -> String {
    "div".to_string()
}

impl NodeSnapshot {
    fn element(&self) -> Element {
        let mut element =
            Element::new(self.tag.clone()).natural_height(sanitize_height(self.natural_height));
        if let Some(id) = &self.element_id {
            element = element.id(id.clone());
        }
        for class in &self.classes {
            element = element.class(class.clone());
        }
        for (name, value) in &self.attributes {
            element = element.attr(name.clone(), value.clone());
        }
        element
    }
}

/// Clamp host measurements to finite, non-negative pixels.
pub(crate) fn sanitize_height(px: f64) -> f64 {
    if px.is_finite() && px > 0.0 { px } else { 0.0 }
}

/// Snapshot decoding failure.
#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    /// No nodes, or the first node has a parent.
    MissingRoot,
    /// A node other than the first has a `null` parent.
    ExtraRoot(u32),
    DuplicateNode(u32),
    /// A parent id not seen earlier in the list.
    UnknownParent { node: u32, parent: u32 },
    UnknownCapability(String),
    UnknownTransitionEvent(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "snapshot JSON error: {e}"),
            Self::MissingRoot => write!(f, "snapshot has no root node"),
            Self::ExtraRoot(id) => write!(f, "node {id} has no parent but is not the root"),
            Self::DuplicateNode(id) => write!(f, "duplicate node id {id}"),
            Self::UnknownParent { node, parent } => {
                write!(f, "node {node} references unknown parent {parent}")
            }
            Self::UnknownCapability(name) => write!(f, "unknown capability {name:?}"),
            Self::UnknownTransitionEvent(name) => write!(f, "unknown transition event {name:?}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl TreeSnapshot {
    /// Parse snapshot JSON.
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(SnapshotError::Json)
    }

    /// Build the in-memory tree.
    pub fn into_tree(self) -> Result<MemoryTree, SnapshotError> {
        let capabilities = match &self.capabilities {
            None => HostCapabilities::all(),
            Some(names) => names.iter().try_fold(HostCapabilities::empty(), |acc, name| {
                HostCapabilities::from_host_name(name)
                    .map(|flag| acc | flag)
                    .ok_or_else(|| SnapshotError::UnknownCapability(name.clone()))
            })?,
        };
        let transition_event = match &self.transition_event {
            None => None,
            Some(name) => Some(
                TransitionEventName::from_name(name)
                    .ok_or_else(|| SnapshotError::UnknownTransitionEvent(name.clone()))?,
            ),
        };

        let mut nodes = self.nodes.iter();
        let root = match nodes.next() {
            Some(root) if root.parent.is_none() => root,
            _ => return Err(SnapshotError::MissingRoot),
        };
        let mut tree = MemoryTree::with_root(NodeId::new(root.id), root.element())
            .capabilities_override(capabilities)
            .transition_event_override(transition_event);

        for node in nodes {
            let Some(parent) = node.parent else {
                return Err(SnapshotError::ExtraRoot(node.id));
            };
            tree.insert(NodeId::new(node.id), NodeId::new(parent), node.element())
                .map_err(|err| match err {
                    MemoryTreeError::DuplicateNode(id) => SnapshotError::DuplicateNode(id.get()),
                    MemoryTreeError::UnknownParent(id) => SnapshotError::UnknownParent {
                        node: node.id,
                        parent: id.get(),
                    },
                })?;
        }
        Ok(tree)
    }
}

/// Parse snapshot JSON straight into a tree.
pub fn parse_tree(json: &str) -> Result<MemoryTree, SnapshotError> {
    TreeSnapshot::from_json_str(json)?.into_tree()
}
