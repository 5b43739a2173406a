#![forbid(unsafe_code)]

//! `accordion-core` drives collapsible panel groups over a host-owned
//! presentation tree.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedder pushes clicks, resizes, and transition
//!   completions; the controller answers with class and style writes.
//! - **Deterministic time**: every time-dependent entry point takes `now`
//!   from a [`Clock`] the host advances.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! The [`locator`] resolves raw event targets to role nodes; the
//! [`controller`] owns the panel state machine and the transition token.

pub mod clock;
pub mod controller;
pub mod debounce;
pub mod event;
pub mod locator;
pub mod memory;
pub mod panel;
pub mod selector;
pub mod settings;
pub mod tree;

pub use clock::{Clock, DeterministicClock, MonotonicClock};
pub use controller::{
    AccordionController, AccordionLogEntry, AccordionLogOutcome, AccordionLogPhase,
    ClickDispatch, ClickIgnoredReason, ClickListener, ClickOutcome, EventDispatch, InitOutcome,
    ListenerCommand, PendingTransition, TickReport, TransitionDirection, TransitionEndDispatch,
    TransitionEndIgnoredReason, TransitionEndOutcome,
};
pub use event::{ClickEvent, HostEvent, Modifiers, MouseButton};
pub use locator::{closest, locate, query_all};
pub use memory::{Element, MemoryTree, MemoryTreeError, TreePatch};
pub use panel::{GroupId, Panel, PanelGroup, PanelId, PanelState};
pub use selector::{Selector, SelectorError};
pub use settings::{AccordionSettings, SettingsError};
pub use tree::{
    HostCapabilities, NodeId, Overflow, PresentationTree, StyleProperty, StyleValue,
    TransitionEventName,
};
