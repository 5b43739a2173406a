#![forbid(unsafe_code)]

//! Tracing span and event checks for the accordion controller.
//!
//! Run:
//!   cargo test -p accordion-core --test tracing_controller_spans

use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use accordion_core::{
    AccordionController, AccordionSettings, ClickEvent, Element, MemoryTree, NodeId,
    PresentationTree,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Capture layer
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
    parent_name: Option<String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
    parent_span_name: Option<String>,
}

#[derive(Default, Clone)]
struct Capture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl Capture {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn span(&self, name: &str) -> Option<CapturedSpan> {
        self.spans().into_iter().find(|s| s.name == name)
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let parent_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span| span.name().to_string());
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
            parent_name,
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let message = visitor
            .0
            .iter()
            .find(|(k, _)| k == "message")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let parent_span_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span| span.name().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            parent_span_name,
        });
    }
}

fn with_capture<F: FnOnce()>(f: F) -> Capture {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    capture
}

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    tree: MemoryTree,
    toggles: Vec<NodeId>,
    contents: Vec<NodeId>,
}

fn fixture(active: &[bool]) -> Fixture {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let group = tree.append(root, Element::new("div").class("accordion"));
    let mut toggles = Vec::new();
    let mut contents = Vec::new();
    for &is_active in active {
        let mut el = Element::new("div").class("accordion-panel");
        if is_active {
            el = el.class("is-active");
        }
        let panel = tree.append(group, el);
        toggles.push(tree.append(panel, Element::new("button").class("accordion-toggle")));
        contents.push(tree.append(
            panel,
            Element::new("div")
                .class("accordion-content")
                .natural_height(90.0),
        ));
    }
    Fixture {
        tree,
        toggles,
        contents,
    }
}

fn init(tree: MemoryTree) -> AccordionController<MemoryTree> {
    AccordionController::init(tree, AccordionSettings::default())
        .expect("valid settings")
        .ready()
        .expect("capable host")
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn init_emits_span_and_summary() {
    let Fixture { tree, .. } = fixture(&[false, true]);
    let capture = with_capture(|| {
        let _ = init(tree);
    });
    assert!(capture.span("accordion.init").is_some());
    let summary = capture
        .events()
        .into_iter()
        .find(|e| e.message == "accordion initialized")
        .expect("init summary event");
    assert_eq!(summary.level, tracing::Level::INFO);
    assert_eq!(summary.parent_span_name.as_deref(), Some("accordion.init"));
}

#[test]
fn click_span_records_target() {
    let Fixture { tree, toggles, .. } = fixture(&[false]);
    let target = toggles[0];
    let capture = with_capture(|| {
        let mut c = init(tree);
        c.on_click(ClickEvent::new(target), Duration::ZERO);
    });
    let span = capture.span("accordion.click").expect("click span");
    assert_eq!(span.fields.get("node"), Some(&target.get().to_string()));
    assert!(span.parent_name.is_none());
    assert!(
        capture
            .events()
            .iter()
            .any(|e| e.message == "transition started"
                && e.parent_span_name.as_deref() == Some("accordion.click"))
    );
}

#[test]
fn timeout_fallback_warns() {
    let Fixture { tree, toggles, .. } = fixture(&[false]);
    let capture = with_capture(|| {
        let mut c = init(tree);
        c.on_click(ClickEvent::new(toggles[0]), Duration::ZERO);
        c.tick(Duration::from_secs(5));
    });
    let warning = capture
        .events()
        .into_iter()
        .find(|e| e.level == tracing::Level::WARN)
        .expect("timeout warning");
    assert_eq!(warning.parent_span_name.as_deref(), Some("accordion.tick"));
}

#[test]
fn resize_span_nests_under_tick() {
    let Fixture { tree, .. } = fixture(&[true]);
    let capture = with_capture(|| {
        let mut c = init(tree);
        c.on_resize(Duration::ZERO);
        c.on_resize(Duration::from_millis(40));
        c.tick(Duration::from_millis(140));
    });
    let span = capture.span("accordion.resize").expect("resize span");
    assert_eq!(span.parent_name.as_deref(), Some("accordion.tick"));
    assert_eq!(span.fields.get("coalesced").map(String::as_str), Some("2"));
}

#[test]
fn ignored_completion_is_debug_only() {
    let Fixture { tree, contents, .. } = fixture(&[false]);
    let capture = with_capture(|| {
        let mut c = init(tree);
        c.on_transition_end(contents[0], Duration::ZERO);
    });
    let ignored: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| e.message == "transition end ignored")
        .collect();
    assert_eq!(ignored.len(), 1);
    assert_eq!(ignored[0].level, tracing::Level::DEBUG);
}

#[test]
fn skipped_panel_warns_during_init() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let group = tree.append(root, Element::new("div").class("accordion"));
    tree.append(group, Element::new("div").class("accordion-panel"));
    let capture = with_capture(|| {
        let _ = init(tree);
    });
    assert!(capture.events().iter().any(|e| e.level == tracing::Level::WARN
        && e.message == "panel skipped: missing toggle or content region"
        && e.parent_span_name.as_deref() == Some("accordion.init")));
}
