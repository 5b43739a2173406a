#![forbid(unsafe_code)]

//! Panel and group registry types.
//!
//! # State machine
//!
//! ```text
//!            click                 transition end
//!   Closed ────────► TransitioningOpen ────────► Open
//!     ▲  │                                        │
//!     │  └─ reset (Closed → Closed)          click│ or sibling opens
//!     │                                           ▼
//!     └──────────────────────────────── TransitioningClosed
//!                  transition end
//! ```
//!
//! Within one [`PanelGroup`] at most one panel is in
//! `{Open, TransitioningOpen}`.

use core::fmt;

use crate::tree::NodeId;

/// Lifecycle state of one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Open,
    TransitioningOpen,
    TransitioningClosed,
}

impl PanelState {
    /// Whether `self → next` is a legal edge.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Closed, Self::Closed | Self::TransitioningOpen)
                | (Self::TransitioningOpen, Self::Open)
                | (Self::Open, Self::TransitioningClosed)
                | (Self::TransitioningClosed, Self::Closed)
        )
    }

    /// `Open` or `TransitioningOpen`.
    #[must_use]
    pub const fn is_open_or_opening(self) -> bool {
        matches!(self, Self::Open | Self::TransitioningOpen)
    }

    #[must_use]
    pub const fn is_transitioning(self) -> bool {
        matches!(self, Self::TransitioningOpen | Self::TransitioningClosed)
    }

    /// Stable lowercase name used in logs and host snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::TransitioningOpen => "transitioning_open",
            Self::TransitioningClosed => "transitioning_closed",
        }
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Panel identity: the panel container node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub NodeId);

/// Group identity: the group container node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub NodeId);

impl PanelId {
    #[must_use]
    pub const fn node(self) -> NodeId {
        self.0
    }
}

impl GroupId {
    #[must_use]
    pub const fn node(self) -> NodeId {
        self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel@{}", self.0.get())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group@{}", self.0.get())
    }
}

/// One collapsible unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub id: PanelId,
    /// Toggle control owned by this panel.
    pub toggle: NodeId,
    /// Content region whose height/opacity/overflow is driven.
    pub content: NodeId,
    pub state: PanelState,
}

/// Ordered panels sharing the mutual-exclusion policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelGroup {
    pub id: GroupId,
    pub panels: Vec<Panel>,
}

impl PanelGroup {
    /// The panel in `{Open, TransitioningOpen}`, if any.
    #[must_use]
    pub fn open_panel(&self) -> Option<&Panel> {
        self.panels.iter().find(|p| p.state.is_open_or_opening())
    }

    /// Number of panels in `{Open, TransitioningOpen}`. Never exceeds 1.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.panels
            .iter()
            .filter(|p| p.state.is_open_or_opening())
            .count()
    }

    #[must_use]
    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }
}
