#![forbid(unsafe_code)]

//! Presentation-tree seam.
//!
//! The controller never owns markup. It reads structure and writes classes
//! and inline styles through [`PresentationTree`], which a host implements
//! over its real document (a browser DOM mirror, a retained UI tree, or
//! [`MemoryTree`](crate::memory::MemoryTree) in tests).
//!
//! # Capabilities
//!
//! Hosts advertise what they support through [`HostCapabilities`]. The
//! controller refuses to initialize unless every flag in
//! [`HostCapabilities::REQUIRED`] is present, so a half-capable host never
//! ends up with a half-initialized widget.

use core::fmt;

use bitflags::bitflags;

/// Opaque handle to one node of the presentation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw host node id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw host node id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

bitflags! {
    /// Host capabilities the controller depends on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostCapabilities: u8 {
        /// Ancestor/descendant traversal and attribute reads.
        const TREE_QUERY         = 0b0001;
        /// Click, resize, and transition-completion delivery.
        const EVENT_SUBSCRIPTION = 0b0010;
        /// Class add/remove/contains.
        const CLASS_LIST         = 0b0100;
        /// Inline style writes and natural-size measurement.
        const COMPUTED_STYLE     = 0b1000;
    }
}

impl HostCapabilities {
    /// Minimum set required for initialization.
    pub const REQUIRED: Self = Self::TREE_QUERY
        .union(Self::EVENT_SUBSCRIPTION)
        .union(Self::CLASS_LIST)
        .union(Self::COMPUTED_STYLE);

    /// Required capabilities this host lacks.
    #[must_use]
    pub const fn missing(self) -> Self {
        Self::REQUIRED.difference(self)
    }

    /// Look up a capability by its host-facing name.
    #[must_use]
    pub fn from_host_name(name: &str) -> Option<Self> {
        match name {
            "treeQuery" => Some(Self::TREE_QUERY),
            "eventSubscription" => Some(Self::EVENT_SUBSCRIPTION),
            "classList" => Some(Self::CLASS_LIST),
            "computedStyle" => Some(Self::COMPUTED_STYLE),
            _ => None,
        }
    }
}

/// Name of the transition-completion event the host fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionEventName {
    /// Standard `transitionend`.
    TransitionEnd,
    /// Legacy WebKit `webkitTransitionEnd`.
    WebkitTransitionEnd,
    /// Legacy Presto `oTransitionEnd`.
    OTransitionEnd,
}

impl TransitionEventName {
    /// DOM event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransitionEnd => "transitionend",
            Self::WebkitTransitionEnd => "webkitTransitionEnd",
            Self::OTransitionEnd => "oTransitionEnd",
        }
    }

    /// Parse a DOM event name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "transitionend" => Some(Self::TransitionEnd),
            "webkitTransitionEnd" => Some(Self::WebkitTransitionEnd),
            "oTransitionEnd" => Some(Self::OTransitionEnd),
            _ => None,
        }
    }
}

/// Inline style properties the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleProperty {
    Height,
    Opacity,
    Overflow,
}

impl StyleProperty {
    /// CSS property name.
    #[must_use]
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Opacity => "opacity",
            Self::Overflow => "overflow",
        }
    }
}

/// CSS `overflow` values the controller uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overflow {
    /// Clip content (closed or animating).
    Hidden,
    /// Let content grow freely (fully open).
    Visible,
}

/// Value written to a [`StyleProperty`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleValue {
    /// Length in CSS pixels.
    Px(f64),
    /// Unitless number (opacity).
    Number(f64),
    /// Overflow keyword.
    Overflow(Overflow),
}

impl StyleValue {
    /// CSS text for this value.
    #[must_use]
    pub fn css_value(&self) -> String {
        match self {
            Self::Px(px) => format!("{px}px"),
            Self::Number(n) => format!("{n}"),
            Self::Overflow(Overflow::Hidden) => "hidden".to_string(),
            Self::Overflow(Overflow::Visible) => "visible".to_string(),
        }
    }
}

/// Capabilities consumed from the presentation layer.
///
/// Reads on unknown nodes return `None`/`false`/`0.0`; writes on unknown
/// nodes are no-ops. Implementations must not panic on stale ids.
pub trait PresentationTree {
    /// Capabilities this host supports.
    fn capabilities(&self) -> HostCapabilities;

    /// Transition-completion event the host fires, if any.
    fn transition_event(&self) -> Option<TransitionEventName>;

    /// Document root. Events are subscribed here; it never matches a role.
    fn root(&self) -> NodeId;

    /// Parent of `node`, `None` for the root or unknown nodes.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Children of `node` in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Lower- or upper-case tag name.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    /// Value of the `id` attribute.
    fn element_id(&self, node: NodeId) -> Option<&str>;

    /// Value of an arbitrary attribute.
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&mut self, node: NodeId, class: &str);

    fn remove_class(&mut self, node: NodeId, class: &str);

    /// Current inline value of `property`.
    fn style(&self, node: NodeId, property: StyleProperty) -> Option<StyleValue>;

    fn set_style(&mut self, node: NodeId, property: StyleProperty, value: StyleValue);

    /// Remove the inline override for `property`.
    fn clear_style(&mut self, node: NodeId, property: StyleProperty);

    /// Natural rendered height of the node's content (DOM `scrollHeight`).
    fn natural_height(&self, node: NodeId) -> f64;
}
