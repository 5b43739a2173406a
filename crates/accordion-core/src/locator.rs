#![forbid(unsafe_code)]

//! Target resolution.
//!
//! [`locate`] answers "which element with role R does this raw event
//! target belong to?" by walking from the origin node up through its
//! ancestors, inclusive. The document root is the subscription target, not
//! an element, so it never matches.
//!
//! [`query_all`] is the downward counterpart used during discovery.

use crate::selector::Selector;
use crate::tree::{NodeId, PresentationTree};

/// Nearest node at or above `origin` satisfying `predicate`.
///
/// Returns `None` when the walk reaches the document root without a match.
/// A non-root node without a parent is unknown to the tree (or detached),
/// so the walk stops there too and the predicate never sees it.
pub fn locate<T, P>(tree: &T, origin: NodeId, mut predicate: P) -> Option<NodeId>
where
    T: PresentationTree + ?Sized,
    P: FnMut(NodeId) -> bool,
{
    let root = tree.root();
    let mut node = origin;
    loop {
        if node == root {
            return None;
        }
        let parent = tree.parent(node)?;
        if predicate(node) {
            return Some(node);
        }
        node = parent;
    }
}

/// [`locate`] with a role selector.
pub fn closest<T>(tree: &T, origin: NodeId, selector: &Selector) -> Option<NodeId>
where
    T: PresentationTree + ?Sized,
{
    locate(tree, origin, |node| selector.matches(tree, node))
}

/// All descendants of `scope` (exclusive) matching `selector`, in document order.
pub fn query_all<T>(tree: &T, scope: NodeId, selector: &Selector) -> Vec<NodeId>
where
    T: PresentationTree + ?Sized,
{
    let mut found = Vec::new();
    let mut stack: Vec<NodeId> = tree.children(scope).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        if selector.matches(tree, node) {
            found.push(node);
        }
        stack.extend(tree.children(node).into_iter().rev());
    }
    found
}

/// First descendant of `scope` matching `selector` whose nearest `owner`
/// ancestor is `scope` itself.
///
/// Used to pair a panel with its own toggle and content region without
/// picking up those of a nested accordion.
pub fn owned_descendant<T>(
    tree: &T,
    scope: NodeId,
    selector: &Selector,
    owner: &Selector,
) -> Option<NodeId>
where
    T: PresentationTree + ?Sized,
{
    query_all(tree, scope, selector).into_iter().find(|&node| {
        tree.parent(node)
            .and_then(|parent| closest(tree, parent, owner))
            == Some(scope)
    })
}
