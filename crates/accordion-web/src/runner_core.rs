#![forbid(unsafe_code)]

//! Platform-independent runner logic.
//!
//! This module is compiled unconditionally (no `cfg(target_arch)` gate) so
//! that its logic can be tested on native targets. The wasm-bindgen wrapper
//! in `wasm.rs` delegates to `RunnerCore`.

use core::time::Duration;

use accordion_core::{
    AccordionController, AccordionLogEntry, AccordionLogOutcome, AccordionLogPhase,
    AccordionSettings, ClickDispatch, ClickEvent, ClickIgnoredReason, ClickListener, Clock,
    DeterministicClock, EventDispatch, GroupId, HostEvent, InitOutcome, ListenerCommand,
    MemoryTree, Modifiers, MouseButton, NodeId, PanelId, PanelState, TickReport,
    TransitionDirection, TransitionEndDispatch, TransitionEndIgnoredReason, TreePatch,
};

use crate::snapshot::{parse_tree, sanitize_height};

/// Host-facing state of one registered panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelStatus {
    pub group: GroupId,
    pub panel: PanelId,
    pub state: PanelState,
}

/// Accordion runner that owns the settings, the clock, and at most one live
/// controller over a host snapshot.
pub struct RunnerCore {
    settings: AccordionSettings,
    clock: DeterministicClock,
    controller: Option<AccordionController<MemoryTree>>,
    /// Patches left behind by a controller that was torn down.
    orphan_patches: Vec<TreePatch>,
    /// Runner-level log lines (configuration and snapshot errors).
    cached_logs: Vec<String>,
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
impl RunnerCore {
    /// Create a runner from settings JSON.
    ///
    /// Invalid settings fall back to the defaults and leave a
    /// `runner_config_error` log line. An empty string means defaults.
    pub fn new(config_json: &str) -> Self {
        let mut cached_logs = Vec::new();
        let settings = if config_json.trim().is_empty() {
            AccordionSettings::default()
        } else {
            AccordionSettings::from_json_str(config_json).unwrap_or_else(|err| {
                cached_logs.push(format!("runner_config_error: {err}"));
                AccordionSettings::default()
            })
        };
        Self {
            settings,
            clock: DeterministicClock::new(),
            controller: None,
            orphan_patches: Vec::new(),
            cached_logs,
        }
    }

    /// Replace the current document with a snapshot and initialize over it.
    ///
    /// Any live controller is torn down first. Returns `true` when a
    /// controller is running afterwards.
    pub fn load_tree(&mut self, snapshot_json: &str) -> bool {
        self.destroy();
        let tree = match parse_tree(snapshot_json) {
            Ok(tree) => tree,
            Err(err) => {
                self.cached_logs.push(format!("runner_snapshot_error: {err}"));
                return false;
            }
        };
        match AccordionController::init(tree, self.settings.clone()) {
            Ok(InitOutcome::Ready(controller)) => {
                self.controller = Some(controller);
                true
            }
            Ok(InitOutcome::Unsupported { missing, .. }) => {
                self.cached_logs
                    .push(format!("runner_unsupported_host: missing={missing:?}"));
                false
            }
            Err(err) => {
                self.cached_logs.push(format!("runner_init_error: {err}"));
                false
            }
        }
    }

    /// Whether a controller is live.
    pub fn is_loaded(&self) -> bool {
        self.controller.is_some()
    }

    /// Record a new layout measurement for `node`.
    pub fn set_natural_height(&mut self, node: u32, px: f64) -> bool {
        let Some(controller) = self.controller.as_mut() else {
            return false;
        };
        let node = NodeId::new(node);
        if !controller.tree().contains(node) {
            return false;
        }
        controller
            .tree_mut()
            .set_natural_height(node, sanitize_height(px));
        true
    }

    /// Dispatch a DOM click. `button` is `MouseEvent.button`; `modifiers`
    /// uses the [`Modifiers`] bit layout.
    ///
    /// Returns `None` without a controller or for the back/forward buttons,
    /// which never reach the document click listener.
    pub fn click(&mut self, node: u32, button: u16, modifiers: u8) -> Option<ClickDispatch> {
        let controller = self.controller.as_mut()?;
        let Some(button) = MouseButton::from_dom_button(button) else {
            self.cached_logs
                .push(format!("runner_click_error: unsupported button {button}"));
            return None;
        };
        let click = ClickEvent::new(NodeId::new(node))
            .with_button(button)
            .with_modifiers(Modifiers::from_bits_truncate(modifiers));
        Some(controller.on_click(click, self.clock.now_mono()))
    }

    /// Dispatch a transition-completion event fired on `node`.
    pub fn transition_end(&mut self, node: u32) -> Option<TransitionEndDispatch> {
        let now = self.clock.now_mono();
        let controller = self.controller.as_mut()?;
        Some(controller.on_transition_end(NodeId::new(node), now))
    }

    /// Note a viewport resize. Returns the debounce deadline in milliseconds.
    pub fn resize(&mut self, width: u32, height: u32) -> Option<f64> {
        let now = self.clock.now_mono();
        let controller = self.controller.as_mut()?;
        match controller.handle_event(HostEvent::Resize { width, height }, now) {
            EventDispatch::ResizeScheduled { deadline } => Some(duration_ms(deadline)),
            _ => None,
        }
    }

    /// Advance the deterministic clock by `dt_ms` milliseconds and run due
    /// timers.
    pub fn advance_time_ms(&mut self, dt_ms: f64) -> Option<TickReport> {
        // Host input can be noisy (NaN/inf/negative spikes). Clamp to a
        // finite non-negative duration; bad input only runs due timers.
        if dt_ms.is_finite() && dt_ms > 0.0 {
            let max_secs = Duration::MAX.as_secs_f64();
            let secs = (dt_ms / 1000.0).min(max_secs);
            let duration = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
            self.clock.advance(duration);
        }
        let now = self.clock.now_mono();
        let controller = self.controller.as_mut()?;
        Some(controller.tick(now))
    }

    /// Current deterministic time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        duration_ms(self.clock.now_mono())
    }

    /// Next timer deadline in milliseconds, if any.
    pub fn next_deadline_ms(&self) -> Option<f64> {
        self.controller
            .as_ref()
            .and_then(AccordionController::next_deadline)
            .map(duration_ms)
    }

    /// Whether the host's document click listener should be attached.
    pub fn click_listener_attached(&self) -> bool {
        self.controller
            .as_ref()
            .is_some_and(|c| c.click_listener() == ClickListener::Attached)
    }

    /// Drain tree writes for the host to apply, oldest first.
    pub fn take_patches(&mut self) -> Vec<TreePatch> {
        let mut patches = std::mem::take(&mut self.orphan_patches);
        if let Some(controller) = self.controller.as_mut() {
            patches.append(&mut controller.tree_mut().take_patches());
        }
        patches
    }

    /// Take accumulated log lines.
    pub fn take_logs(&mut self) -> Vec<String> {
        let mut logs = std::mem::take(&mut self.cached_logs);
        if let Some(controller) = self.controller.as_mut() {
            logs.extend(controller.take_logs().into_iter().map(format_log_entry));
        }
        logs
    }

    /// Every registered panel in document order.
    pub fn panel_states(&self) -> Vec<PanelStatus> {
        let Some(controller) = self.controller.as_ref() else {
            return Vec::new();
        };
        controller
            .groups()
            .iter()
            .flat_map(|group| {
                group.panels.iter().map(move |panel| PanelStatus {
                    group: group.id,
                    panel: panel.id,
                    state: panel.state,
                })
            })
            .collect()
    }

    /// Tear down the live controller, keeping its final patches and logs for
    /// the next drain.
    pub fn destroy(&mut self) {
        let Some(controller) = self.controller.take() else {
            return;
        };
        let (mut tree, logs) = controller.teardown_with_logs();
        self.orphan_patches.append(&mut tree.take_patches());
        self.cached_logs
            .extend(logs.into_iter().map(format_log_entry));
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

fn format_phase(phase: AccordionLogPhase) -> &'static str {
    match phase {
        AccordionLogPhase::Init => "init",
        AccordionLogPhase::Click => "click",
        AccordionLogPhase::TransitionEnd => "transition_end",
        AccordionLogPhase::Timeout => "timeout",
        AccordionLogPhase::Resize => "resize",
        AccordionLogPhase::Teardown => "teardown",
    }
}

pub(crate) fn format_listener_command(command: Option<ListenerCommand>) -> &'static str {
    match command {
        Some(ListenerCommand::Attach) => "attach",
        Some(ListenerCommand::Detach) => "detach",
        None => "-",
    }
}

pub(crate) fn format_direction(direction: TransitionDirection) -> &'static str {
    match direction {
        TransitionDirection::Opening => "opening",
        TransitionDirection::Closing => "closing",
    }
}

pub(crate) fn format_click_ignored(reason: ClickIgnoredReason) -> &'static str {
    match reason {
        ClickIgnoredReason::TransitionInFlight => "transition_in_flight",
        ClickIgnoredReason::NotPrimaryButton => "not_primary_button",
        ClickIgnoredReason::ModifierHeld => "modifier_held",
        ClickIgnoredReason::NoToggle => "no_toggle",
        ClickIgnoredReason::UnregisteredPanel => "unregistered_panel",
    }
}

pub(crate) fn format_transition_end_ignored(reason: TransitionEndIgnoredReason) -> &'static str {
    match reason {
        TransitionEndIgnoredReason::NotAContentRegion => "not_a_content_region",
        TransitionEndIgnoredReason::NoPendingTransition => "no_pending_transition",
    }
}

fn format_log_entry(log: AccordionLogEntry) -> String {
    let phase = format_phase(log.phase);
    let sequence = log.sequence;
    let at_ms = duration_ms(log.at);
    let group = log
        .group
        .map_or_else(|| "-".to_owned(), |id| id.node().get().to_string());
    let panel = log
        .panel
        .map_or_else(|| "-".to_owned(), |id| id.node().get().to_string());
    let command = format_listener_command(log.listener_command);
    let outcome = match log.outcome {
        AccordionLogOutcome::Initialized { groups, panels } => {
            format!("initialized:groups={groups},panels={panels}")
        }
        AccordionLogOutcome::Started(direction) => {
            format!("started:{}", format_direction(direction))
        }
        AccordionLogOutcome::Settled(state) => format!("settled:{}", state.as_str()),
        AccordionLogOutcome::ClickIgnored(reason) => {
            format!("ignored:{}", format_click_ignored(reason))
        }
        AccordionLogOutcome::TransitionEndIgnored(reason) => {
            format!("ignored:{}", format_transition_end_ignored(reason))
        }
        AccordionLogOutcome::Remeasured => "remeasured".to_owned(),
        AccordionLogOutcome::Deferred => "deferred".to_owned(),
        AccordionLogOutcome::TornDown => "torn_down".to_owned(),
    };
    format!(
        "accordion phase={phase} seq={sequence} at_ms={at_ms} group={group} panel={panel} command={command} outcome={outcome}"
    )
}
