#![forbid(unsafe_code)]

//! Accordion controller.
//!
//! [`AccordionController`] owns the panel registry of every discovered group
//! and turns host events into style and class writes on the tree. It never
//! blocks: a transition writes its target styles, records a
//! [`PendingTransition`] keyed by panel, and returns. The host reports
//! completion through [`on_transition_end`](AccordionController::on_transition_end).
//!
//! # Transition token
//!
//! Clicks are serialized for the whole controller. While any transition is
//! pending the click listener is [`ClickListener::Detached`] and clicks are
//! dropped, not queued. The listener is reattached when the last pending
//! transition settles, whether by completion event or by the
//! `transitionTimeoutMs` fallback in [`tick`](AccordionController::tick).
//!
//! # Invariants
//!
//! 1. Within a group at most one panel is `Open` or `TransitioningOpen`.
//! 2. Every `Transitioning*` panel has exactly one pending entry, and vice versa.
//! 3. `click_listener() == Detached` iff a pending entry exists.
//! 4. Resize re-measures only settled `Open` panels. An opening panel caught
//!    by a resize is re-measured when it settles.
//!
//! # Example
//!
//! ```rust
//! use core::time::Duration;
//! use accordion_core::{
//!     AccordionController, AccordionSettings, ClickEvent, Element, InitOutcome, MemoryTree,
//!     PanelState, PresentationTree,
//! };
//!
//! let mut tree = MemoryTree::new();
//! let group = tree.append(tree.root(), Element::new("div").class("accordion"));
//! let panel = tree.append(group, Element::new("div").class("accordion-panel"));
//! let toggle = tree.append(panel, Element::new("button").class("accordion-toggle"));
//! let content = tree.append(panel, Element::new("div").class("accordion-content").natural_height(80.0));
//!
//! let InitOutcome::Ready(mut accordion) =
//!     AccordionController::init(tree, AccordionSettings::default())?
//! else {
//!     unreachable!("memory trees are fully capable");
//! };
//!
//! accordion.on_click(ClickEvent::new(toggle), Duration::ZERO);
//! accordion.on_transition_end(content, Duration::from_millis(300));
//! assert_eq!(accordion.panel_state(panel.into()), Some(PanelState::Open));
//! # Ok::<(), accordion_core::SettingsError>(())
//! ```

use core::time::Duration;
use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, debug_span, info, info_span, warn};

use crate::debounce::Debouncer;
use crate::event::{ClickEvent, HostEvent, MouseButton};
use crate::locator::{closest, owned_descendant, query_all};
use crate::panel::{GroupId, Panel, PanelGroup, PanelId, PanelState};
use crate::settings::{AccordionSettings, RoleSelectors, SettingsError};
use crate::tree::{HostCapabilities, NodeId, Overflow, PresentationTree, StyleProperty, StyleValue};

/// Maximum retained log entries between drains.
const LOG_CAPACITY: usize = 512;

impl From<NodeId> for PanelId {
    fn from(node: NodeId) -> Self {
        Self(node)
    }
}

impl From<NodeId> for GroupId {
    fn from(node: NodeId) -> Self {
        Self(node)
    }
}

/// Whether the document-level click subscription is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickListener {
    Attached,
    Detached,
}

/// Subscription change the host must apply to its click listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerCommand {
    Attach,
    Detach,
}

/// Direction of an in-flight transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionDirection {
    Opening,
    Closing,
}

impl TransitionDirection {
    /// State the panel settles into.
    #[must_use]
    pub const fn settled_state(self) -> PanelState {
        match self {
            Self::Opening => PanelState::Open,
            Self::Closing => PanelState::Closed,
        }
    }
}

/// One awaited completion, keyed by panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub panel: PanelId,
    pub group: GroupId,
    pub direction: TransitionDirection,
    pub started_at: Duration,
}

/// Why a click was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickIgnoredReason {
    /// The transition token is held; the listener is detached.
    TransitionInFlight,
    /// Secondary, middle, or auxiliary button.
    NotPrimaryButton,
    /// Ctrl or Super held (native open-in-new-tab gestures).
    ModifierHeld,
    /// No toggle at or above the target.
    NoToggle,
    /// The toggle does not belong to a registered panel.
    UnregisteredPanel,
}

/// Why a completion event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEndIgnoredReason {
    /// The node is not a registered content region.
    NotAContentRegion,
    /// The panel has no transition awaiting completion.
    NoPendingTransition,
}

/// Dispatch phase recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccordionLogPhase {
    Init,
    Click,
    TransitionEnd,
    Timeout,
    Resize,
    Teardown,
}

/// Outcome category for one log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccordionLogOutcome {
    Initialized { groups: usize, panels: usize },
    Started(TransitionDirection),
    Settled(PanelState),
    ClickIgnored(ClickIgnoredReason),
    TransitionEndIgnored(TransitionEndIgnoredReason),
    Remeasured,
    /// Panel was still opening; it is re-measured when the transition settles.
    Deferred,
    TornDown,
}

/// Structured record of one controller decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccordionLogEntry {
    pub sequence: u64,
    pub at: Duration,
    pub phase: AccordionLogPhase,
    pub group: Option<GroupId>,
    pub panel: Option<PanelId>,
    pub listener_command: Option<ListenerCommand>,
    pub outcome: AccordionLogOutcome,
}

/// Outcome of one click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Started {
        group: GroupId,
        panel: PanelId,
        direction: TransitionDirection,
        /// Siblings that began closing alongside an opening panel.
        closing: Vec<PanelId>,
    },
    Ignored(ClickIgnoredReason),
}

/// Result of [`AccordionController::on_click`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickDispatch {
    pub outcome: ClickOutcome,
    pub listener_command: Option<ListenerCommand>,
    pub log: AccordionLogEntry,
}

/// Outcome of one completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEndOutcome {
    Settled { panel: PanelId, state: PanelState },
    Ignored(TransitionEndIgnoredReason),
}

/// Result of [`AccordionController::on_transition_end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEndDispatch {
    pub outcome: TransitionEndOutcome,
    pub listener_command: Option<ListenerCommand>,
    pub log: AccordionLogEntry,
}

/// Work performed by [`AccordionController::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Open panels whose height was re-measured, including deferred ones
    /// whose opening settled during this tick.
    pub resized: Vec<PanelId>,
    /// Transitions settled by the timeout fallback.
    pub timed_out: Vec<PanelId>,
    pub listener_command: Option<ListenerCommand>,
}

impl TickReport {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.resized.is_empty() && self.timed_out.is_empty() && self.listener_command.is_none()
    }
}

/// Result of [`AccordionController::handle_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDispatch {
    Click(ClickDispatch),
    TransitionEnd(TransitionEndDispatch),
    /// Resize debounce armed; [`tick`](AccordionController::tick) at or after
    /// `deadline` performs the re-measure.
    ResizeScheduled { deadline: Duration },
}

/// Result of [`AccordionController::init`].
#[allow(clippy::large_enum_variant)]
pub enum InitOutcome<T: PresentationTree> {
    Ready(AccordionController<T>),
    /// The host lacks required capabilities. The tree is returned untouched.
    Unsupported { tree: T, missing: HostCapabilities },
}

impl<T: PresentationTree> InitOutcome<T> {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The controller, or `None` when the host was unsupported.
    #[must_use]
    pub fn ready(self) -> Option<AccordionController<T>> {
        match self {
            Self::Ready(controller) => Some(controller),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionMode {
    /// The host fires a completion event per transition.
    Event,
    /// No completion event; transitions settle inside the click.
    Immediate,
}

#[derive(Debug, Clone, Copy)]
struct PanelSlot {
    group: usize,
    panel: usize,
}

/// Accordion state machine over a [`PresentationTree`].
#[derive(Debug)]
pub struct AccordionController<T: PresentationTree> {
    tree: T,
    settings: AccordionSettings,
    roles: RoleSelectors,
    groups: Vec<PanelGroup>,
    slots: AHashMap<PanelId, PanelSlot>,
    content_owner: AHashMap<NodeId, PanelId>,
    pending: AHashMap<PanelId, PendingTransition>,
    listener: ClickListener,
    completion: CompletionMode,
    resize: Debouncer,
    /// Opening panels that missed a resize re-measure.
    deferred_remeasure: AHashSet<PanelId>,
    logs: VecDeque<AccordionLogEntry>,
    next_sequence: u64,
    last_now: Duration,
}

impl<T: PresentationTree> AccordionController<T> {
    /// Discover panel groups in `tree` and apply their resting styles.
    ///
    /// Returns [`InitOutcome::Unsupported`] without touching the tree when a
    /// required capability is missing, and a validation error when
    /// `settings` are unusable.
    pub fn init(mut tree: T, settings: AccordionSettings) -> Result<InitOutcome<T>, SettingsError> {
        let _span = info_span!("accordion.init").entered();

        let missing = tree.capabilities().missing();
        if !missing.is_empty() {
            debug!(?missing, "host lacks required capabilities; accordion disabled");
            return Ok(InitOutcome::Unsupported { tree, missing });
        }

        let errors = settings.validate();
        if !errors.is_empty() {
            return Err(SettingsError::Validation(errors));
        }
        let roles = settings
            .role_selectors()
            .map_err(|err| SettingsError::Validation(vec![err.to_string()]))?;

        let completion = match tree.transition_event() {
            Some(event) => {
                debug!(event = event.as_str(), "transition completion event detected");
                CompletionMode::Event
            }
            None => {
                debug!("no transition completion event; transitions settle immediately");
                CompletionMode::Immediate
            }
        };

        let root = tree.root();
        tree.add_class(root, &settings.init_class_name);

        let groups = discover_groups(&mut tree, &roles, &settings);
        let mut slots = AHashMap::new();
        let mut content_owner = AHashMap::new();
        for (gi, group) in groups.iter().enumerate() {
            for (pi, panel) in group.panels.iter().enumerate() {
                slots.insert(panel.id, PanelSlot { group: gi, panel: pi });
                content_owner.insert(panel.content, panel.id);
            }
        }

        let panel_count = slots.len();
        info!(groups = groups.len(), panels = panel_count, "accordion initialized");

        let mut controller = Self {
            tree,
            resize: Debouncer::new(settings.resize_debounce()),
            settings,
            roles,
            groups,
            slots,
            content_owner,
            pending: AHashMap::new(),
            listener: ClickListener::Attached,
            completion,
            deferred_remeasure: AHashSet::new(),
            logs: VecDeque::new(),
            next_sequence: 0,
            last_now: Duration::ZERO,
        };
        let groups = controller.groups.len();
        controller.push_log(
            AccordionLogPhase::Init,
            None,
            None,
            None,
            AccordionLogOutcome::Initialized {
                groups,
                panels: panel_count,
            },
        );
        Ok(InitOutcome::Ready(controller))
    }

    // -----------------------------------------------------------------------
    // Event entry points
    // -----------------------------------------------------------------------

    /// Route a canonical host event.
    pub fn handle_event(&mut self, event: HostEvent, now: Duration) -> EventDispatch {
        match event {
            HostEvent::Click(click) => EventDispatch::Click(self.on_click(click, now)),
            HostEvent::TransitionEnd { node } => {
                EventDispatch::TransitionEnd(self.on_transition_end(node, now))
            }
            HostEvent::Resize { width, height } => {
                debug!(width, height, "viewport resized");
                EventDispatch::ResizeScheduled {
                    deadline: self.on_resize(now),
                }
            }
        }
    }

    /// Handle a click anywhere in the document.
    pub fn on_click(&mut self, click: ClickEvent, now: Duration) -> ClickDispatch {
        let _span = debug_span!("accordion.click", node = click.target.get()).entered();
        self.observe(now);

        if self.listener == ClickListener::Detached {
            return self.click_ignored(ClickIgnoredReason::TransitionInFlight, None, None);
        }
        if click.button != MouseButton::Left {
            return self.click_ignored(ClickIgnoredReason::NotPrimaryButton, None, None);
        }
        if click.ctrl() || click.super_key() {
            return self.click_ignored(ClickIgnoredReason::ModifierHeld, None, None);
        }
        let Some(toggle) = closest(&self.tree, click.target, &self.roles.toggle) else {
            return self.click_ignored(ClickIgnoredReason::NoToggle, None, None);
        };
        let owner = self
            .tree
            .parent(toggle)
            .and_then(|parent| closest(&self.tree, parent, &self.roles.panel))
            .map(PanelId);
        let Some((panel_id, slot)) = owner.and_then(|id| self.slots.get(&id).map(|s| (id, *s)))
        else {
            return self.click_ignored(ClickIgnoredReason::UnregisteredPanel, None, None);
        };
        let group_id = self.groups[slot.group].id;

        // Acquire the token.
        self.listener = ClickListener::Detached;
        let mut listener_command = Some(ListenerCommand::Detach);

        let mut closing = Vec::new();
        let direction = if self.groups[slot.group].panels[slot.panel].state == PanelState::Open {
            self.begin_close(slot.group, slot.panel, now);
            TransitionDirection::Closing
        } else {
            for pi in 0..self.groups[slot.group].panels.len() {
                if pi == slot.panel {
                    continue;
                }
                match self.groups[slot.group].panels[pi].state {
                    PanelState::Open => {
                        self.begin_close(slot.group, pi, now);
                        let sibling = self.groups[slot.group].panels[pi].id;
                        self.push_log(
                            AccordionLogPhase::Click,
                            Some(group_id),
                            Some(sibling),
                            None,
                            AccordionLogOutcome::Started(TransitionDirection::Closing),
                        );
                        closing.push(sibling);
                    }
                    PanelState::Closed => self.reset_closed(slot.group, pi),
                    PanelState::TransitioningOpen | PanelState::TransitioningClosed => {}
                }
            }
            self.begin_open(slot.group, slot.panel, now);
            TransitionDirection::Opening
        };

        if self.completion == CompletionMode::Immediate {
            // No completion event will arrive; the token is released before returning.
            self.settle_all(AccordionLogPhase::Click);
            listener_command = None;
        }

        debug!(
            panel = panel_id.node().get(),
            group = group_id.node().get(),
            ?direction,
            closing = closing.len(),
            "transition started"
        );
        let log = self.push_log(
            AccordionLogPhase::Click,
            Some(group_id),
            Some(panel_id),
            listener_command,
            AccordionLogOutcome::Started(direction),
        );
        ClickDispatch {
            outcome: ClickOutcome::Started {
                group: group_id,
                panel: panel_id,
                direction,
                closing,
            },
            listener_command,
            log,
        }
    }

    /// Handle a transition-completion event fired on `node`.
    pub fn on_transition_end(&mut self, node: NodeId, now: Duration) -> TransitionEndDispatch {
        let _span = debug_span!("accordion.transition_end", node = node.get()).entered();
        self.observe(now);

        let Some(&panel) = self.content_owner.get(&node) else {
            return self.transition_end_ignored(TransitionEndIgnoredReason::NotAContentRegion, None);
        };
        if !self.pending.contains_key(&panel) {
            return self
                .transition_end_ignored(TransitionEndIgnoredReason::NoPendingTransition, Some(panel));
        }
        let (state, listener_command, log) = self.settle(panel, AccordionLogPhase::TransitionEnd);
        TransitionEndDispatch {
            outcome: TransitionEndOutcome::Settled { panel, state },
            listener_command,
            log,
        }
    }

    /// Note a viewport resize. Returns the debounce deadline.
    pub fn on_resize(&mut self, now: Duration) -> Duration {
        self.observe(now);
        self.resize.notify(now);
        let deadline = self.resize.deadline().unwrap_or(now);
        debug!(deadline_ms = millis(deadline), "resize debounce armed");
        deadline
    }

    /// Advance host time: fire the resize debounce and the completion
    /// timeout fallback when due.
    pub fn tick(&mut self, now: Duration) -> TickReport {
        let _span = debug_span!("accordion.tick", now_ms = millis(now)).entered();
        self.observe(now);
        let mut report = TickReport::default();

        if let Some(timeout) = self.settings.transition_timeout() {
            let mut expired: Vec<PanelId> = self
                .pending
                .values()
                .filter(|p| now.saturating_sub(p.started_at) >= timeout)
                .map(|p| p.panel)
                .collect();
            expired.sort_unstable();
            for panel in expired {
                warn!(
                    panel = panel.node().get(),
                    timeout_ms = self.settings.transition_timeout_ms,
                    "transition completion not received; settling"
                );
                let remeasure = self.deferred_remeasure.contains(&panel);
                let (_, command, _) = self.settle(panel, AccordionLogPhase::Timeout);
                if command.is_some() {
                    report.listener_command = command;
                }
                report.timed_out.push(panel);
                if remeasure {
                    report.resized.push(panel);
                }
            }
        }

        if let Some(coalesced) = self.resize.poll(now) {
            for panel in self.remeasure_open_panels(now, coalesced) {
                if !report.resized.contains(&panel) {
                    report.resized.push(panel);
                }
            }
        }
        report
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let timeout = self.settings.transition_timeout().and_then(|timeout| {
            self.pending
                .values()
                .map(|p| p.started_at.saturating_add(timeout))
                .min()
        });
        match (self.resize.deadline(), timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Shut the controller down and hand the tree back.
    ///
    /// Pending transitions are settled, the resize debounce is cancelled,
    /// and the init marker class is removed from the root.
    pub fn teardown(self) -> T {
        self.teardown_with_logs().0
    }

    /// [`teardown`](Self::teardown), also returning every undrained log
    /// entry including the ones teardown itself records.
    pub fn teardown_with_logs(mut self) -> (T, Vec<AccordionLogEntry>) {
        let _span = info_span!("accordion.teardown").entered();
        self.settle_all(AccordionLogPhase::Teardown);
        self.resize.cancel();
        self.listener = ClickListener::Detached;
        let root = self.tree.root();
        self.tree.remove_class(root, &self.settings.init_class_name);
        self.push_log(
            AccordionLogPhase::Teardown,
            None,
            None,
            Some(ListenerCommand::Detach),
            AccordionLogOutcome::TornDown,
        );
        info!("accordion torn down");
        let logs = self.logs.drain(..).collect();
        (self.tree, logs)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn panel_state(&self, panel: PanelId) -> Option<PanelState> {
        self.panel(panel).map(|p| p.state)
    }

    #[must_use]
    pub fn panel(&self, panel: PanelId) -> Option<&Panel> {
        let slot = self.slots.get(&panel)?;
        self.groups.get(slot.group)?.panels.get(slot.panel)
    }

    /// Discovered groups in document order.
    #[must_use]
    pub fn groups(&self) -> &[PanelGroup] {
        &self.groups
    }

    /// Open or opening panel of `group`.
    #[must_use]
    pub fn open_panel(&self, group: GroupId) -> Option<PanelId> {
        self.groups
            .iter()
            .find(|g| g.id == group)
            .and_then(PanelGroup::open_panel)
            .map(|p| p.id)
    }

    /// Panels awaiting completion, sorted.
    #[must_use]
    pub fn pending_panels(&self) -> Vec<PanelId> {
        let mut panels: Vec<PanelId> = self.pending.keys().copied().collect();
        panels.sort_unstable();
        panels
    }

    #[must_use]
    pub fn pending(&self, panel: PanelId) -> Option<&PendingTransition> {
        self.pending.get(&panel)
    }

    /// Whether the transition token is held.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        !self.pending.is_empty()
    }

    #[must_use]
    pub fn click_listener(&self) -> ClickListener {
        self.listener
    }

    /// Whether transitions settle inside `on_click` (host has no completion event).
    #[must_use]
    pub fn settles_synchronously(&self) -> bool {
        self.completion == CompletionMode::Immediate
    }

    #[must_use]
    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Mutable tree access for host-side updates such as new measurements.
    ///
    /// Structural edits are not rediscovered.
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    #[must_use]
    pub fn settings(&self) -> &AccordionSettings {
        &self.settings
    }

    /// Drain accumulated log entries.
    pub fn take_logs(&mut self) -> Vec<AccordionLogEntry> {
        self.logs.drain(..).collect()
    }

    // -----------------------------------------------------------------------
    // Transition algorithm
    // -----------------------------------------------------------------------

    fn set_state(&mut self, gi: usize, pi: usize, next: PanelState) {
        let panel = &mut self.groups[gi].panels[pi];
        debug_assert!(
            panel.state.can_transition_to(next),
            "illegal panel transition {} -> {next}",
            panel.state
        );
        panel.state = next;
    }

    fn begin_close(&mut self, gi: usize, pi: usize, now: Duration) {
        self.set_state(gi, pi, PanelState::TransitioningClosed);
        let Panel { id, content, .. } = self.groups[gi].panels[pi];
        self.tree.remove_class(id.node(), &self.settings.active_class_name);
        self.tree
            .add_class(id.node(), &self.settings.transitioning_class_name);
        write_closed_style(&mut self.tree, content);
        self.pending.insert(
            id,
            PendingTransition {
                panel: id,
                group: self.groups[gi].id,
                direction: TransitionDirection::Closing,
                started_at: now,
            },
        );
    }

    fn begin_open(&mut self, gi: usize, pi: usize, now: Duration) {
        self.set_state(gi, pi, PanelState::TransitioningOpen);
        let Panel { id, content, .. } = self.groups[gi].panels[pi];
        self.tree.add_class(id.node(), &self.settings.active_class_name);
        self.tree
            .add_class(id.node(), &self.settings.transitioning_class_name);
        let height = self.tree.natural_height(content);
        self.tree.set_style(
            content,
            StyleProperty::Overflow,
            StyleValue::Overflow(Overflow::Hidden),
        );
        self.tree
            .set_style(content, StyleProperty::Height, StyleValue::Px(height));
        self.tree
            .set_style(content, StyleProperty::Opacity, StyleValue::Number(1.0));
        self.pending.insert(
            id,
            PendingTransition {
                panel: id,
                group: self.groups[gi].id,
                direction: TransitionDirection::Opening,
                started_at: now,
            },
        );
    }

    /// Closed → Closed: force the resting style without animating.
    fn reset_closed(&mut self, gi: usize, pi: usize) {
        self.set_state(gi, pi, PanelState::Closed);
        let Panel { id, content, .. } = self.groups[gi].panels[pi];
        self.tree.remove_class(id.node(), &self.settings.active_class_name);
        write_closed_style(&mut self.tree, content);
    }

    fn settle(
        &mut self,
        panel: PanelId,
        phase: AccordionLogPhase,
    ) -> (PanelState, Option<ListenerCommand>, AccordionLogEntry) {
        let pending = self.pending.remove(&panel);
        let slot = self.slots.get(&panel).copied();
        let mut state = self.panel_state(panel).unwrap_or_default();
        if let (Some(pending), Some(slot)) = (pending, slot) {
            state = pending.direction.settled_state();
            self.set_state(slot.group, slot.panel, state);
            let content = self.groups[slot.group].panels[slot.panel].content;
            if pending.direction == TransitionDirection::Opening {
                self.tree.set_style(
                    content,
                    StyleProperty::Overflow,
                    StyleValue::Overflow(Overflow::Visible),
                );
            }
            self.tree
                .remove_class(panel.node(), &self.settings.transitioning_class_name);
        }

        let mut command = None;
        if self.pending.is_empty() && self.listener == ClickListener::Detached {
            self.listener = ClickListener::Attached;
            command = Some(ListenerCommand::Attach);
            debug!("transition token released");
        }
        let group = slot.map(|s| self.groups[s.group].id);
        let log = self.push_log(
            phase,
            group,
            Some(panel),
            command,
            AccordionLogOutcome::Settled(state),
        );
        if self.deferred_remeasure.remove(&panel)
            && state == PanelState::Open
            && let Some(slot) = slot
        {
            debug!(panel = panel.node().get(), "applying deferred re-measure");
            self.remeasure(slot.group, slot.panel);
        }
        (state, command, log)
    }

    fn settle_all(&mut self, phase: AccordionLogPhase) {
        for panel in self.pending_panels() {
            self.settle(panel, phase);
        }
    }

    fn remeasure_open_panels(&mut self, now: Duration, coalesced: u32) -> Vec<PanelId> {
        let _span = info_span!("accordion.resize", coalesced, now_ms = millis(now)).entered();
        debug!(coalesced, "re-measuring open panels");
        let mut resized = Vec::new();
        for gi in 0..self.groups.len() {
            let group = self.groups[gi].id;
            let Some(&Panel { id, state, .. }) = self.groups[gi].open_panel() else {
                continue;
            };
            if state != PanelState::Open {
                debug!(panel = id.node().get(), "deferring re-measure of opening panel");
                self.deferred_remeasure.insert(id);
                self.push_log(
                    AccordionLogPhase::Resize,
                    Some(group),
                    Some(id),
                    None,
                    AccordionLogOutcome::Deferred,
                );
                continue;
            }
            let Some(slot) = self.slots.get(&id).copied() else {
                continue;
            };
            self.remeasure(slot.group, slot.panel);
            resized.push(id);
        }
        resized
    }

    /// Re-read the natural height of an open panel's content region.
    fn remeasure(&mut self, gi: usize, pi: usize) {
        let group = self.groups[gi].id;
        let Panel { id, content, .. } = self.groups[gi].panels[pi];
        self.tree.clear_style(content, StyleProperty::Height);
        let height = self.tree.natural_height(content);
        self.tree
            .set_style(content, StyleProperty::Height, StyleValue::Px(height));
        self.push_log(
            AccordionLogPhase::Resize,
            Some(group),
            Some(id),
            None,
            AccordionLogOutcome::Remeasured,
        );
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    fn observe(&mut self, now: Duration) {
        self.last_now = self.last_now.max(now);
    }

    fn click_ignored(
        &mut self,
        reason: ClickIgnoredReason,
        group: Option<GroupId>,
        panel: Option<PanelId>,
    ) -> ClickDispatch {
        debug!(?reason, "click ignored");
        let log = self.push_log(
            AccordionLogPhase::Click,
            group,
            panel,
            None,
            AccordionLogOutcome::ClickIgnored(reason),
        );
        ClickDispatch {
            outcome: ClickOutcome::Ignored(reason),
            listener_command: None,
            log,
        }
    }

    fn transition_end_ignored(
        &mut self,
        reason: TransitionEndIgnoredReason,
        panel: Option<PanelId>,
    ) -> TransitionEndDispatch {
        debug!(?reason, "transition end ignored");
        let group = panel
            .and_then(|p| self.slots.get(&p))
            .map(|slot| self.groups[slot.group].id);
        let log = self.push_log(
            AccordionLogPhase::TransitionEnd,
            group,
            panel,
            None,
            AccordionLogOutcome::TransitionEndIgnored(reason),
        );
        TransitionEndDispatch {
            outcome: TransitionEndOutcome::Ignored(reason),
            listener_command: None,
            log,
        }
    }

    fn push_log(
        &mut self,
        phase: AccordionLogPhase,
        group: Option<GroupId>,
        panel: Option<PanelId>,
        listener_command: Option<ListenerCommand>,
        outcome: AccordionLogOutcome,
    ) -> AccordionLogEntry {
        let entry = AccordionLogEntry {
            sequence: self.next_sequence,
            at: self.last_now,
            phase,
            group,
            panel,
            listener_command,
            outcome,
        };
        self.next_sequence = self.next_sequence.saturating_add(1);
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);
        entry
    }
}

/// Height 0, opacity 0, overflow hidden.
fn write_closed_style<T: PresentationTree>(tree: &mut T, content: NodeId) {
    tree.set_style(
        content,
        StyleProperty::Overflow,
        StyleValue::Overflow(Overflow::Hidden),
    );
    tree.set_style(content, StyleProperty::Height, StyleValue::Px(0.0));
    tree.set_style(content, StyleProperty::Opacity, StyleValue::Number(0.0));
}

fn discover_groups<T: PresentationTree>(
    tree: &mut T,
    roles: &RoleSelectors,
    settings: &AccordionSettings,
) -> Vec<PanelGroup> {
    let root = tree.root();
    let mut groups = Vec::new();
    for group_node in query_all(tree, root, &roles.group) {
        let mut panels = Vec::new();
        let mut opened = false;
        for panel_node in query_all(tree, group_node, &roles.panel) {
            let owner = tree
                .parent(panel_node)
                .and_then(|parent| closest(tree, parent, &roles.group));
            if owner != Some(group_node) {
                continue;
            }
            let toggle = owned_descendant(tree, panel_node, &roles.toggle, &roles.panel);
            let content = owned_descendant(tree, panel_node, &roles.content, &roles.panel);
            let (Some(toggle), Some(content)) = (toggle, content) else {
                warn!(
                    panel = panel_node.get(),
                    has_toggle = toggle.is_some(),
                    has_content = content.is_some(),
                    "panel skipped: missing toggle or content region"
                );
                continue;
            };

            let active = tree.has_class(panel_node, &settings.active_class_name);
            let state = if active && !opened {
                opened = true;
                let height = tree.natural_height(content);
                tree.set_style(content, StyleProperty::Height, StyleValue::Px(height));
                tree.set_style(content, StyleProperty::Opacity, StyleValue::Number(1.0));
                tree.set_style(
                    content,
                    StyleProperty::Overflow,
                    StyleValue::Overflow(Overflow::Visible),
                );
                PanelState::Open
            } else {
                if active {
                    warn!(
                        panel = panel_node.get(),
                        group = group_node.get(),
                        "extra active panel in group normalized to closed"
                    );
                    tree.remove_class(panel_node, &settings.active_class_name);
                }
                write_closed_style(tree, content);
                PanelState::Closed
            };
            panels.push(Panel {
                id: PanelId(panel_node),
                toggle,
                content,
                state,
            });
        }
        groups.push(PanelGroup {
            id: GroupId(group_node),
            panels,
        });
    }
    groups
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Modifiers;
    use crate::memory::{Element, MemoryTree, TreePatch};
    use crate::tree::TransitionEventName;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[derive(Debug, Clone, Copy)]
    struct Fixture {
        panel: NodeId,
        toggle: NodeId,
        label: NodeId,
        content: NodeId,
    }

    /// One group; panel `i` has content height `100 * (i + 1)`.
    fn build_group(tree: &mut MemoryTree, parent: NodeId, active: &[bool]) -> (NodeId, Vec<Fixture>) {
        let group = tree.append(parent, Element::new("div").class("accordion"));
        let fixtures = active
            .iter()
            .enumerate()
            .map(|(i, &is_active)| {
                let mut el = Element::new("div").class("accordion-panel");
                if is_active {
                    el = el.class("is-active");
                }
                let panel = tree.append(group, el);
                let toggle = tree.append(panel, Element::new("button").class("accordion-toggle"));
                let label = tree.append(toggle, Element::new("span"));
                let height = 100.0 * (i as f64 + 1.0);
                let content = tree.append(
                    panel,
                    Element::new("div")
                        .class("accordion-content")
                        .natural_height(height),
                );
                Fixture {
                    panel,
                    toggle,
                    label,
                    content,
                }
            })
            .collect();
        (group, fixtures)
    }

    fn ready(tree: MemoryTree, settings: AccordionSettings) -> AccordionController<MemoryTree> {
        AccordionController::init(tree, settings)
            .expect("valid settings")
            .ready()
            .expect("capable host")
    }

    fn single(active: &[bool]) -> (AccordionController<MemoryTree>, Vec<Fixture>) {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let (_, fixtures) = build_group(&mut tree, root, active);
        (ready(tree, AccordionSettings::default()), fixtures)
    }

    fn styles(
        c: &AccordionController<MemoryTree>,
        content: NodeId,
    ) -> (Option<StyleValue>, Option<StyleValue>, Option<StyleValue>) {
        let tree = c.tree();
        (
            tree.style(content, StyleProperty::Height),
            tree.style(content, StyleProperty::Opacity),
            tree.style(content, StyleProperty::Overflow),
        )
    }

    fn closed_style() -> (Option<StyleValue>, Option<StyleValue>, Option<StyleValue>) {
        (
            Some(StyleValue::Px(0.0)),
            Some(StyleValue::Number(0.0)),
            Some(StyleValue::Overflow(Overflow::Hidden)),
        )
    }

    fn state(c: &AccordionController<MemoryTree>, f: Fixture) -> PanelState {
        c.panel_state(PanelId(f.panel)).expect("registered panel")
    }

    // --- init -----------------------------------------------------------

    #[test]
    fn init_marks_root_and_closes_inactive_panels() {
        let (c, f) = single(&[false, false]);
        assert!(c.tree().has_class(c.tree().root(), "js-accordion"));
        assert_eq!(c.groups().len(), 1);
        for fx in &f {
            assert_eq!(state(&c, *fx), PanelState::Closed);
            assert_eq!(styles(&c, fx.content), closed_style());
        }
        assert_eq!(c.click_listener(), ClickListener::Attached);
        assert!(!c.is_transitioning());
    }

    #[test]
    fn init_opens_pre_active_panel_without_animation() {
        let (c, f) = single(&[false, true]);
        assert_eq!(state(&c, f[1]), PanelState::Open);
        assert_eq!(
            styles(&c, f[1].content),
            (
                Some(StyleValue::Px(200.0)),
                Some(StyleValue::Number(1.0)),
                Some(StyleValue::Overflow(Overflow::Visible)),
            )
        );
        assert!(c.pending_panels().is_empty());
        assert!(!c.tree().has_class(f[1].panel, "is-transitioning"));
    }

    #[test]
    fn init_keeps_only_first_active_panel_open() {
        let (c, f) = single(&[true, true]);
        assert_eq!(state(&c, f[0]), PanelState::Open);
        assert_eq!(state(&c, f[1]), PanelState::Closed);
        assert!(!c.tree().has_class(f[1].panel, "is-active"));
        assert_eq!(c.groups()[0].open_count(), 1);
    }

    #[test]
    fn missing_capability_leaves_tree_untouched() {
        let mut tree = MemoryTree::new()
            .capabilities_override(HostCapabilities::TREE_QUERY | HostCapabilities::CLASS_LIST);
        let root = tree.root();
        build_group(&mut tree, root, &[true]);
        let outcome =
            AccordionController::init(tree, AccordionSettings::default()).expect("no error");
        let InitOutcome::Unsupported { tree, missing } = outcome else {
            panic!("expected unsupported host");
        };
        assert_eq!(
            missing,
            HostCapabilities::EVENT_SUBSCRIPTION | HostCapabilities::COMPUTED_STYLE
        );
        assert!(tree.patches().is_empty());
        assert!(!tree.has_class(tree.root(), "js-accordion"));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = AccordionSettings {
            toggle_role: "[broken".into(),
            ..AccordionSettings::default()
        };
        let err = AccordionController::init(MemoryTree::new(), settings)
            .err()
            .expect("validation error");
        assert!(matches!(err, SettingsError::Validation(ref e) if e.len() == 1));
    }

    #[test]
    fn panels_missing_parts_are_skipped() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let group = tree.append(root, Element::new("div").class("accordion"));
        let no_content = tree.append(group, Element::new("div").class("accordion-panel"));
        tree.append(no_content, Element::new("button").class("accordion-toggle"));
        let no_toggle = tree.append(group, Element::new("div").class("accordion-panel"));
        tree.append(no_toggle, Element::new("div").class("accordion-content"));

        let c = ready(tree, AccordionSettings::default());
        assert!(c.groups()[0].panels.is_empty());
        assert_eq!(c.panel_state(PanelId(no_content)), None);
    }

    #[test]
    fn nested_groups_own_their_panels() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let (outer, outer_f) = build_group(&mut tree, root, &[false]);
        let (inner, inner_f) = build_group(&mut tree, outer_f[0].content, &[false, false]);

        let c = ready(tree, AccordionSettings::default());
        let ids: Vec<_> = c.groups().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![GroupId(outer), GroupId(inner)]);
        assert_eq!(c.groups()[0].panels.len(), 1);
        assert_eq!(c.groups()[1].panels.len(), 2);
        assert_eq!(c.groups()[0].panels[0].toggle, outer_f[0].toggle);
        assert_eq!(c.groups()[1].panels[1].content, inner_f[1].content);
    }

    // --- click ----------------------------------------------------------

    #[test]
    fn click_closed_panel_swaps_with_open_sibling() {
        let (mut c, f) = single(&[false, true]);
        let (a, b) = (f[0], f[1]);

        let dispatch = c.on_click(ClickEvent::new(a.toggle), ms(0));
        assert_eq!(
            dispatch.outcome,
            ClickOutcome::Started {
                group: c.groups()[0].id,
                panel: PanelId(a.panel),
                direction: TransitionDirection::Opening,
                closing: vec![PanelId(b.panel)],
            }
        );
        assert_eq!(dispatch.listener_command, Some(ListenerCommand::Detach));
        assert_eq!(state(&c, a), PanelState::TransitioningOpen);
        assert_eq!(state(&c, b), PanelState::TransitioningClosed);
        assert_eq!(
            styles(&c, a.content),
            (
                Some(StyleValue::Px(100.0)),
                Some(StyleValue::Number(1.0)),
                Some(StyleValue::Overflow(Overflow::Hidden)),
            )
        );
        assert_eq!(styles(&c, b.content), closed_style());
        assert!(c.tree().has_class(a.panel, "is-active"));
        assert!(c.tree().has_class(a.panel, "is-transitioning"));
        assert!(!c.tree().has_class(b.panel, "is-active"));

        let end_b = c.on_transition_end(b.content, ms(300));
        assert_eq!(
            end_b.outcome,
            TransitionEndOutcome::Settled {
                panel: PanelId(b.panel),
                state: PanelState::Closed
            }
        );
        assert_eq!(end_b.listener_command, None);
        assert_eq!(c.click_listener(), ClickListener::Detached);

        let end_a = c.on_transition_end(a.content, ms(310));
        assert_eq!(end_a.listener_command, Some(ListenerCommand::Attach));
        assert_eq!(state(&c, a), PanelState::Open);
        assert_eq!(state(&c, b), PanelState::Closed);
        assert_eq!(
            c.tree().style(a.content, StyleProperty::Overflow),
            Some(StyleValue::Overflow(Overflow::Visible))
        );
        assert!(!c.tree().has_class(a.panel, "is-transitioning"));
        assert_eq!(c.groups()[0].open_count(), 1);
        assert_eq!(c.click_listener(), ClickListener::Attached);
    }

    #[test]
    fn click_open_panel_closes_it() {
        let (mut c, f) = single(&[true]);
        let a = f[0];
        let dispatch = c.on_click(ClickEvent::new(a.toggle), ms(0));
        assert!(matches!(
            dispatch.outcome,
            ClickOutcome::Started {
                direction: TransitionDirection::Closing,
                ref closing,
                ..
            } if closing.is_empty()
        ));
        assert_eq!(state(&c, a), PanelState::TransitioningClosed);
        c.on_transition_end(a.content, ms(250));
        assert_eq!(state(&c, a), PanelState::Closed);
        assert_eq!(c.open_panel(c.groups()[0].id), None);
        assert_eq!(styles(&c, a.content), closed_style());
    }

    #[test]
    fn second_click_in_flight_is_dropped() {
        let (mut c, f) = single(&[false, false]);
        c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        let second = c.on_click(ClickEvent::new(f[1].toggle), ms(10));
        assert_eq!(
            second.outcome,
            ClickOutcome::Ignored(ClickIgnoredReason::TransitionInFlight)
        );
        assert_eq!(state(&c, f[1]), PanelState::Closed);

        c.on_transition_end(f[0].content, ms(300));
        // Not queued: nothing happens for the dropped click.
        assert_eq!(state(&c, f[1]), PanelState::Closed);
        assert!(!c.is_transitioning());
    }

    #[test]
    fn lock_spans_groups() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let (_, g1) = build_group(&mut tree, root, &[false]);
        let (_, g2) = build_group(&mut tree, root, &[false]);
        let mut c = ready(tree, AccordionSettings::default());

        c.on_click(ClickEvent::new(g1[0].toggle), ms(0));
        let other = c.on_click(ClickEvent::new(g2[0].toggle), ms(5));
        assert_eq!(
            other.outcome,
            ClickOutcome::Ignored(ClickIgnoredReason::TransitionInFlight)
        );
    }

    #[test]
    fn filtered_clicks_never_take_the_token() {
        let (mut c, f) = single(&[false]);
        let t = f[0].toggle;
        let cases = [
            (
                ClickEvent::new(t).with_button(MouseButton::Right),
                ClickIgnoredReason::NotPrimaryButton,
            ),
            (
                ClickEvent::new(t).with_button(MouseButton::Middle),
                ClickIgnoredReason::NotPrimaryButton,
            ),
            (
                ClickEvent::new(t).with_modifiers(Modifiers::CTRL),
                ClickIgnoredReason::ModifierHeld,
            ),
            (
                ClickEvent::new(t).with_modifiers(Modifiers::SUPER),
                ClickIgnoredReason::ModifierHeld,
            ),
            (
                ClickEvent::new(f[0].content),
                ClickIgnoredReason::NoToggle,
            ),
        ];
        for (click, reason) in cases {
            let dispatch = c.on_click(click, ms(0));
            assert_eq!(dispatch.outcome, ClickOutcome::Ignored(reason));
            assert_eq!(dispatch.listener_command, None);
            assert_eq!(c.click_listener(), ClickListener::Attached);
        }
        assert_eq!(state(&c, f[0]), PanelState::Closed);
    }

    #[test]
    fn shift_click_is_accepted() {
        let (mut c, f) = single(&[false]);
        let click = ClickEvent::new(f[0].toggle).with_modifiers(Modifiers::SHIFT | Modifiers::ALT);
        assert!(matches!(
            c.on_click(click, ms(0)).outcome,
            ClickOutcome::Started { .. }
        ));
    }

    #[test]
    fn click_inside_toggle_resolves_toggle() {
        let (mut c, f) = single(&[false]);
        let dispatch = c.on_click(ClickEvent::new(f[0].label), ms(0));
        assert!(matches!(
            dispatch.outcome,
            ClickOutcome::Started { panel, .. } if panel == PanelId(f[0].panel)
        ));
    }

    #[test]
    fn stray_toggle_does_not_lock_widget() {
        let (mut c, _) = single(&[false]);
        let root = c.tree().root();
        let stray = c
            .tree_mut()
            .append(root, Element::new("button").class("accordion-toggle"));
        let dispatch = c.on_click(ClickEvent::new(stray), ms(0));
        assert_eq!(
            dispatch.outcome,
            ClickOutcome::Ignored(ClickIgnoredReason::UnregisteredPanel)
        );
        assert_eq!(c.click_listener(), ClickListener::Attached);
    }

    #[test]
    fn closed_siblings_are_reset_regardless_of_prior_style() {
        let (mut c, f) = single(&[false, false, false]);
        let sibling = f[2].content;
        c.tree_mut()
            .set_style(sibling, StyleProperty::Height, StyleValue::Px(37.0));
        c.tree_mut()
            .set_style(sibling, StyleProperty::Opacity, StyleValue::Number(0.4));
        c.tree_mut().set_style(
            sibling,
            StyleProperty::Overflow,
            StyleValue::Overflow(Overflow::Visible),
        );

        let dispatch = c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        assert!(matches!(
            dispatch.outcome,
            ClickOutcome::Started { ref closing, .. } if closing.is_empty()
        ));
        assert_eq!(styles(&c, sibling), closed_style());
        assert_eq!(state(&c, f[2]), PanelState::Closed);
        assert_eq!(c.pending_panels(), vec![PanelId(f[0].panel)]);
    }

    #[test]
    fn open_then_close_restores_initial_style() {
        let (mut c, f) = single(&[false]);
        let a = f[0];
        let initial = styles(&c, a.content);
        let initial_classes = c.tree().classes(a.panel).to_vec();

        c.on_click(ClickEvent::new(a.toggle), ms(0));
        c.on_transition_end(a.content, ms(300));
        c.on_click(ClickEvent::new(a.toggle), ms(400));
        c.on_transition_end(a.content, ms(700));

        assert_eq!(styles(&c, a.content), initial);
        assert_eq!(c.tree().classes(a.panel), initial_classes.as_slice());
        assert_eq!(state(&c, a), PanelState::Closed);
    }

    // --- completion -----------------------------------------------------

    #[test]
    fn stray_completion_events_are_ignored() {
        let (mut c, f) = single(&[false]);
        let unrelated = c.on_transition_end(f[0].label, ms(0));
        assert_eq!(
            unrelated.outcome,
            TransitionEndOutcome::Ignored(TransitionEndIgnoredReason::NotAContentRegion)
        );
        let idle = c.on_transition_end(f[0].content, ms(0));
        assert_eq!(
            idle.outcome,
            TransitionEndOutcome::Ignored(TransitionEndIgnoredReason::NoPendingTransition)
        );

        c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        c.on_transition_end(f[0].content, ms(300));
        // A second property's completion for the same transition.
        let duplicate = c.on_transition_end(f[0].content, ms(301));
        assert_eq!(
            duplicate.outcome,
            TransitionEndOutcome::Ignored(TransitionEndIgnoredReason::NoPendingTransition)
        );
        assert_eq!(duplicate.listener_command, None);
    }

    #[test]
    fn host_without_completion_event_settles_in_click() {
        let mut tree = MemoryTree::new().transition_event_override(None);
        let root = tree.root();
        let (_, f) = build_group(&mut tree, root, &[true, false]);
        let mut c = ready(tree, AccordionSettings::default());
        assert!(c.settles_synchronously());

        let dispatch = c.on_click(ClickEvent::new(f[1].toggle), ms(0));
        assert_eq!(dispatch.listener_command, None);
        assert_eq!(state(&c, f[0]), PanelState::Closed);
        assert_eq!(state(&c, f[1]), PanelState::Open);
        assert!(!c.is_transitioning());
        assert_eq!(c.click_listener(), ClickListener::Attached);
    }

    #[test]
    fn legacy_completion_event_names_use_event_mode() {
        let tree = MemoryTree::new()
            .transition_event_override(Some(TransitionEventName::WebkitTransitionEnd));
        let c = ready(tree, AccordionSettings::default());
        assert!(!c.settles_synchronously());
    }

    // --- timeout --------------------------------------------------------

    #[test]
    fn timeout_settles_stuck_transition() {
        let (mut c, f) = single(&[true, false]);
        c.on_click(ClickEvent::new(f[1].toggle), ms(50));
        assert_eq!(c.next_deadline(), Some(ms(1_050)));

        assert!(c.tick(ms(1_049)).is_idle());
        let report = c.tick(ms(1_050));
        assert_eq!(
            report.timed_out,
            vec![PanelId(f[0].panel), PanelId(f[1].panel)]
        );
        assert_eq!(report.listener_command, Some(ListenerCommand::Attach));
        assert_eq!(state(&c, f[1]), PanelState::Open);

        let next = c.on_click(ClickEvent::new(f[1].toggle), ms(1_100));
        assert!(matches!(next.outcome, ClickOutcome::Started { .. }));
    }

    #[test]
    fn zero_timeout_keeps_waiting() {
        let settings = AccordionSettings {
            transition_timeout_ms: 0,
            ..AccordionSettings::default()
        };
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let (_, f) = build_group(&mut tree, root, &[false]);
        let mut c = ready(tree, settings);

        c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        assert_eq!(c.next_deadline(), None);
        assert!(c.tick(ms(3_600_000)).is_idle());
        assert_eq!(c.click_listener(), ClickListener::Detached);
    }

    // --- resize ---------------------------------------------------------

    #[test]
    fn resize_burst_remeasures_once() {
        let (mut c, f) = single(&[true]);
        c.tree_mut().take_patches();
        c.tree_mut().set_natural_height(f[0].content, 140.0);

        for t in [0, 30, 60] {
            c.on_resize(ms(t));
        }
        assert!(c.tick(ms(100)).resized.is_empty());
        let report = c.tick(ms(160));
        assert_eq!(report.resized, vec![PanelId(f[0].panel)]);
        assert_eq!(
            c.tree_mut().take_patches(),
            vec![
                TreePatch::ClearStyle {
                    node: f[0].content,
                    property: StyleProperty::Height
                },
                TreePatch::SetStyle {
                    node: f[0].content,
                    property: StyleProperty::Height,
                    value: StyleValue::Px(140.0)
                },
            ]
        );
        assert!(c.tick(ms(500)).resized.is_empty());
    }

    #[test]
    fn resize_continues_past_groups_without_open_panel() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let (_, g1) = build_group(&mut tree, root, &[false, false]);
        let (_, g2) = build_group(&mut tree, root, &[false, true]);
        let mut c = ready(tree, AccordionSettings::default());

        c.on_resize(ms(0));
        let report = c.tick(ms(100));
        assert_eq!(report.resized, vec![PanelId(g2[1].panel)]);
        assert_eq!(styles(&c, g1[0].content), closed_style());
    }

    #[test]
    fn resize_during_open_is_applied_when_settled() {
        let (mut c, f) = single(&[false]);
        let panel = PanelId(f[0].panel);
        c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        c.tree_mut().take_patches();
        c.take_logs();

        c.tree_mut().set_natural_height(f[0].content, 160.0);
        c.on_resize(ms(10));
        assert!(c.tick(ms(110)).resized.is_empty());
        assert!(c.tree().patches().is_empty());
        assert_eq!(
            c.tree().style(f[0].content, StyleProperty::Height),
            Some(StyleValue::Px(100.0))
        );

        let end = c.on_transition_end(f[0].content, ms(300));
        assert_eq!(
            end.outcome,
            TransitionEndOutcome::Settled {
                panel,
                state: PanelState::Open
            }
        );
        assert_eq!(
            c.tree().style(f[0].content, StyleProperty::Height),
            Some(StyleValue::Px(160.0))
        );
        let outcomes: Vec<_> = c.take_logs().iter().map(|l| l.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                AccordionLogOutcome::Deferred,
                AccordionLogOutcome::Settled(PanelState::Open),
                AccordionLogOutcome::Remeasured,
            ]
        );

        // Applied once; later ticks have nothing left to do.
        assert!(c.tick(ms(5_000)).is_idle());
        assert_eq!(
            c.tree().style(f[0].content, StyleProperty::Height),
            Some(StyleValue::Px(160.0))
        );
    }

    #[test]
    fn deferred_resize_follows_timeout_settle() {
        let (mut c, f) = single(&[false]);
        let panel = PanelId(f[0].panel);
        c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        c.tree_mut().set_natural_height(f[0].content, 250.0);
        c.on_resize(ms(10));
        assert!(c.tick(ms(110)).resized.is_empty());

        let report = c.tick(ms(1_000));
        assert_eq!(report.timed_out, vec![panel]);
        assert_eq!(report.resized, vec![panel]);
        assert_eq!(report.listener_command, Some(ListenerCommand::Attach));
        assert_eq!(
            c.tree().style(f[0].content, StyleProperty::Height),
            Some(StyleValue::Px(250.0))
        );
    }

    #[test]
    fn closing_panel_is_not_deferred() {
        let (mut c, f) = single(&[true]);
        c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        c.on_resize(ms(10));
        assert!(c.tick(ms(110)).resized.is_empty());
        c.tree_mut().take_patches();
        c.on_transition_end(f[0].content, ms(300));
        assert_eq!(state(&c, f[0]), PanelState::Closed);
        assert!(
            !c.tree()
                .patches()
                .iter()
                .any(|p| matches!(p, TreePatch::SetStyle { property: StyleProperty::Height, .. }))
        );
    }

    // --- routing, logs, teardown -----------------------------------------

    #[test]
    fn handle_event_routes_each_kind() {
        let (mut c, f) = single(&[false]);
        let click = c.handle_event(HostEvent::Click(ClickEvent::new(f[0].toggle)), ms(0));
        assert!(matches!(click, EventDispatch::Click(_)));
        let end = c.handle_event(HostEvent::TransitionEnd { node: f[0].content }, ms(200));
        assert!(matches!(end, EventDispatch::TransitionEnd(_)));
        let resize = c.handle_event(
            HostEvent::Resize {
                width: 800,
                height: 600,
            },
            ms(300),
        );
        assert_eq!(resize, EventDispatch::ResizeScheduled { deadline: ms(400) });
    }

    #[test]
    fn logs_are_sequenced_and_drained() {
        let (mut c, f) = single(&[false]);
        c.on_click(ClickEvent::new(f[0].toggle), ms(5));
        c.on_transition_end(f[0].content, ms(305));
        let logs = c.take_logs();
        let phases: Vec<_> = logs.iter().map(|l| l.phase).collect();
        assert_eq!(
            phases,
            vec![
                AccordionLogPhase::Init,
                AccordionLogPhase::Click,
                AccordionLogPhase::TransitionEnd
            ]
        );
        assert!(logs.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert_eq!(logs[2].at, ms(305));
        assert_eq!(logs[2].listener_command, Some(ListenerCommand::Attach));
        assert!(c.take_logs().is_empty());
    }

    #[test]
    fn teardown_settles_and_unmarks_root() {
        let (mut c, f) = single(&[false]);
        c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        c.on_resize(ms(10));
        let tree = c.teardown();
        assert!(!tree.has_class(tree.root(), "js-accordion"));
        assert!(!tree.has_class(f[0].panel, "is-transitioning"));
        assert!(tree.has_class(f[0].panel, "is-active"));
    }

    #[test]
    fn teardown_with_logs_returns_undrained_entries() {
        let (mut c, f) = single(&[false]);
        c.take_logs();
        c.on_click(ClickEvent::new(f[0].toggle), ms(0));
        let (_, logs) = c.teardown_with_logs();
        let outcomes: Vec<_> = logs.iter().map(|l| l.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                AccordionLogOutcome::Started(TransitionDirection::Opening),
                AccordionLogOutcome::Settled(PanelState::Open),
                AccordionLogOutcome::TornDown,
            ]
        );
        assert_eq!(logs[2].phase, AccordionLogPhase::Teardown);
    }
}
