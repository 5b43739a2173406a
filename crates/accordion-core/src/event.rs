#![forbid(unsafe_code)]

//! Canonical host events consumed by the accordion controller.
//!
//! The embedding host (a browser shim, a test, or a native UI) translates its
//! own input into these values and pushes them into
//! [`AccordionController::handle_event`](crate::AccordionController::handle_event).
//! All events are `Copy` so they can be queued and replayed cheaply.
//!
//! # Design Notes
//!
//! - Click targets are raw tree nodes; resolving the toggle is the locator's job.
//! - `Modifiers` use bitflags with the same bit layout JS hosts send
//!   (`shift=1, alt=2, ctrl=4, meta=8`).
//! - Resize carries the new viewport size for logging only; re-measurement
//!   reads natural heights from the tree.

use bitflags::bitflags;

use crate::tree::NodeId;

/// Canonical host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// A pointer click somewhere in the document.
    Click(ClickEvent),

    /// The viewport was resized.
    Resize {
        /// New viewport width in CSS pixels.
        width: u32,
        /// New viewport height in CSS pixels.
        height: u32,
    },

    /// A style transition finished on `node`.
    TransitionEnd {
        /// Node the completion event fired on.
        node: NodeId,
    },
}

/// A pointer click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    /// Innermost node under the pointer.
    pub target: NodeId,

    /// Button that produced the click.
    pub button: MouseButton,

    /// Modifier keys held during the click.
    pub modifiers: Modifiers,
}

impl ClickEvent {
    /// Create a primary-button click with no modifiers.
    #[must_use]
    pub const fn new(target: NodeId) -> Self {
        Self {
            target,
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        }
    }

    /// Create a click with a specific button.
    #[must_use]
    pub const fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    /// Create a click with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Check if Ctrl modifier is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Check if Super/Meta/Cmd modifier is held.
    #[must_use]
    pub const fn super_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SUPER)
    }
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left (primary) mouse button.
    Left,

    /// Right (secondary) mouse button.
    Right,

    /// Middle mouse button (scroll wheel click).
    Middle,
}

impl MouseButton {
    /// Map a DOM `MouseEvent.button` value.
    ///
    /// Returns `None` for the auxiliary back/forward buttons.
    #[must_use]
    pub const fn from_dom_button(button: u16) -> Option<Self> {
        match button {
            0 => Some(Self::Left),
            1 => Some(Self::Middle),
            2 => Some(Self::Right),
            _ => None,
        }
    }
}

bitflags! {
    /// Modifier keys that can be held during a click.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}
