#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the AccordionRunner.
//!
//! This module wraps [`super::runner_core::RunnerCore`] with JS-friendly types.
//! Only compiled on `wasm32` targets.

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::runner_core::{
    RunnerCore, format_click_ignored, format_direction, format_listener_command,
    format_transition_end_ignored,
};
use accordion_core::{
    ClickDispatch, ClickOutcome, ListenerCommand, PanelId, TickReport, TransitionEndDispatch,
    TransitionEndOutcome, TreePatch,
};

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<js_sys::Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn node_js(id: PanelId) -> JsValue {
    JsValue::from_f64(f64::from(id.node().get()))
}

fn panel_ids_js(ids: &[PanelId]) -> Array {
    let arr = Array::new();
    for &id in ids {
        arr.push(&node_js(id));
    }
    arr
}

fn command_js(obj: &Object, command: Option<ListenerCommand>) {
    match command {
        Some(_) => set_js(
            obj,
            "listener_command",
            JsValue::from_str(format_listener_command(command)),
        ),
        None => set_js(obj, "listener_command", JsValue::NULL),
    }
}

fn click_dispatch_to_js(dispatch: &ClickDispatch) -> JsValue {
    let obj = Object::new();
    match &dispatch.outcome {
        ClickOutcome::Started {
            group,
            panel,
            direction,
            closing,
        } => {
            set_js(&obj, "accepted", JsValue::TRUE);
            set_js(&obj, "outcome", JsValue::from_str("started"));
            set_js(&obj, "ignored_reason", JsValue::NULL);
            set_js(&obj, "group", JsValue::from_f64(f64::from(group.node().get())));
            set_js(&obj, "panel", node_js(*panel));
            set_js(&obj, "direction", JsValue::from_str(format_direction(*direction)));
            set_js(&obj, "closing", panel_ids_js(closing).into());
        }
        ClickOutcome::Ignored(reason) => {
            set_js(&obj, "accepted", JsValue::FALSE);
            set_js(&obj, "outcome", JsValue::from_str("ignored"));
            set_js(
                &obj,
                "ignored_reason",
                JsValue::from_str(format_click_ignored(*reason)),
            );
            set_js(&obj, "group", JsValue::NULL);
            set_js(&obj, "panel", JsValue::NULL);
            set_js(&obj, "direction", JsValue::NULL);
            set_js(&obj, "closing", Array::new().into());
        }
    }
    command_js(&obj, dispatch.listener_command);
    set_js(
        &obj,
        "sequence",
        JsValue::from_f64(dispatch.log.sequence as f64),
    );
    obj.into()
}

fn transition_end_dispatch_to_js(dispatch: &TransitionEndDispatch) -> JsValue {
    let obj = Object::new();
    match dispatch.outcome {
        TransitionEndOutcome::Settled { panel, state } => {
            set_js(&obj, "accepted", JsValue::TRUE);
            set_js(&obj, "panel", node_js(panel));
            set_js(&obj, "state", JsValue::from_str(state.as_str()));
            set_js(&obj, "ignored_reason", JsValue::NULL);
        }
        TransitionEndOutcome::Ignored(reason) => {
            set_js(&obj, "accepted", JsValue::FALSE);
            set_js(&obj, "panel", JsValue::NULL);
            set_js(&obj, "state", JsValue::NULL);
            set_js(
                &obj,
                "ignored_reason",
                JsValue::from_str(format_transition_end_ignored(reason)),
            );
        }
    }
    command_js(&obj, dispatch.listener_command);
    obj.into()
}

fn tick_report_to_js(report: &TickReport) -> JsValue {
    let obj = Object::new();
    set_js(&obj, "resized", panel_ids_js(&report.resized).into());
    set_js(&obj, "timed_out", panel_ids_js(&report.timed_out).into());
    command_js(&obj, report.listener_command);
    obj.into()
}

fn patch_to_js(patch: &TreePatch) -> JsValue {
    let obj = Object::new();
    set_js(
        &obj,
        "node",
        JsValue::from_f64(f64::from(patch.node().get())),
    );
    match patch {
        TreePatch::AddClass { class, .. } => {
            set_js(&obj, "op", JsValue::from_str("add_class"));
            set_js(&obj, "class", JsValue::from_str(class));
        }
        TreePatch::RemoveClass { class, .. } => {
            set_js(&obj, "op", JsValue::from_str("remove_class"));
            set_js(&obj, "class", JsValue::from_str(class));
        }
        TreePatch::SetStyle {
            property, value, ..
        } => {
            set_js(&obj, "op", JsValue::from_str("set_style"));
            set_js(&obj, "property", JsValue::from_str(property.css_name()));
            set_js(&obj, "value", JsValue::from_str(&value.css_value()));
        }
        TreePatch::ClearStyle { property, .. } => {
            set_js(&obj, "op", JsValue::from_str("clear_style"));
            set_js(&obj, "property", JsValue::from_str(property.css_name()));
        }
    }
    obj.into()
}

/// Called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

/// Accordion controller exported to JavaScript.
///
/// The host snapshots its document with `loadTree`, forwards DOM events,
/// drives time with `advanceTime`, and applies `takePatches` to real nodes.
#[wasm_bindgen]
pub struct AccordionRunner {
    inner: RunnerCore,
}

#[wasm_bindgen]
impl AccordionRunner {
    /// Create a runner from settings JSON (empty string for defaults).
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Self {
        install_panic_hook();
        Self {
            inner: RunnerCore::new(config_json),
        }
    }

    /// Load a document snapshot and initialize. Returns `true` when a
    /// controller is running.
    #[wasm_bindgen(js_name = loadTree)]
    pub fn load_tree(&mut self, snapshot_json: &str) -> bool {
        self.inner.load_tree(snapshot_json)
    }

    #[wasm_bindgen(js_name = isLoaded)]
    pub fn is_loaded(&self) -> bool {
        self.inner.is_loaded()
    }

    /// Report a fresh layout measurement for `node`.
    #[wasm_bindgen(js_name = setNaturalHeight)]
    pub fn set_natural_height(&mut self, node: u32, px: f64) -> bool {
        self.inner.set_natural_height(node, px)
    }

    /// Forward a document click. Returns a dispatch object or `null`.
    pub fn click(&mut self, node: u32, button: u16, modifiers: u8) -> JsValue {
        match self.inner.click(node, button, modifiers) {
            Some(dispatch) => click_dispatch_to_js(&dispatch),
            None => JsValue::NULL,
        }
    }

    /// Forward a transition-completion event. Returns a dispatch object or `null`.
    #[wasm_bindgen(js_name = transitionEnd)]
    pub fn transition_end(&mut self, node: u32) -> JsValue {
        match self.inner.transition_end(node) {
            Some(dispatch) => transition_end_dispatch_to_js(&dispatch),
            None => JsValue::NULL,
        }
    }

    /// Forward a window resize. Returns the debounce deadline (ms) or `null`.
    pub fn resize(&mut self, width: u32, height: u32) -> Option<f64> {
        self.inner.resize(width, height)
    }

    /// Advance the deterministic clock by `dt_ms` milliseconds and run due
    /// timers. Returns `{ resized, timed_out, listener_command }` or `null`.
    #[wasm_bindgen(js_name = advanceTime)]
    pub fn advance_time(&mut self, dt_ms: f64) -> JsValue {
        match self.inner.advance_time_ms(dt_ms) {
            Some(report) => tick_report_to_js(&report),
            None => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = nowMs)]
    pub fn now_ms(&self) -> f64 {
        self.inner.now_ms()
    }

    /// Next timer deadline (ms), or `null` when nothing is scheduled.
    #[wasm_bindgen(js_name = nextDeadline)]
    pub fn next_deadline(&self) -> Option<f64> {
        self.inner.next_deadline_ms()
    }

    /// Whether the host's document click listener should be attached.
    #[wasm_bindgen(js_name = clickListenerAttached)]
    pub fn click_listener_attached(&self) -> bool {
        self.inner.click_listener_attached()
    }

    /// Drain tree writes. Returns `Array<{ op, node, class?, property?, value? }>`.
    #[wasm_bindgen(js_name = takePatches)]
    pub fn take_patches(&mut self) -> Array {
        let arr = Array::new();
        for patch in self.inner.take_patches() {
            arr.push(&patch_to_js(&patch));
        }
        arr
    }

    /// Drain accumulated log lines. Returns `Array<string>`.
    #[wasm_bindgen(js_name = takeLogs)]
    pub fn take_logs(&mut self) -> Array {
        let logs = self.inner.take_logs();
        let arr = Array::new();
        for log in logs {
            arr.push(&JsValue::from_str(&log));
        }
        arr
    }

    /// Registered panels. Returns `Array<{ group, panel, state }>`.
    #[wasm_bindgen(js_name = panelStates)]
    pub fn panel_states(&self) -> Array {
        let arr = Array::new();
        for status in self.inner.panel_states() {
            let obj = Object::new();
            set_js(
                &obj,
                "group",
                JsValue::from_f64(f64::from(status.group.node().get())),
            );
            set_js(&obj, "panel", node_js(status.panel));
            set_js(&obj, "state", JsValue::from_str(status.state.as_str()));
            arr.push(&obj);
        }
        arr
    }

    /// Tear the controller down. Final patches and logs stay drainable.
    pub fn destroy(&mut self) {
        self.inner.destroy();
    }
}
