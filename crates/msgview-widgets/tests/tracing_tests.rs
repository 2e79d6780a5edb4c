#![forbid(unsafe_code)]

//! Tracing integration tests for the progressive list.
//!
//!   cargo test -p msgview-widgets --test tracing_tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use msgview_runtime::{CommandRegistry, SampleLog};
use msgview_widgets::progressive::{
    Capture, GeometryObserver, ListConfig, ListItem, NavCommand, ProgressiveList, Unsupported,
};

use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn message(&self) -> &str {
        self.fields.get("message").map_or("", String::as_str)
    }
}

#[derive(Default)]
struct Captured {
    spans: Vec<CapturedSpan>,
    events: Vec<CapturedEvent>,
}

struct Capturing {
    captured: Arc<Mutex<Captured>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Capturing {
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.captured.lock().unwrap().spans.push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.captured.lock().unwrap().events.push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured<F: FnOnce()>(f: F) -> Captured {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let subscriber = tracing_subscriber::registry().with(Capturing {
        captured: captured.clone(),
    });
    tracing::subscriber::with_default(subscriber, f);
    std::mem::take(&mut *captured.lock().unwrap())
}

struct Message(u32);

impl ListItem for Message {
    type Id = u32;
    fn id(&self) -> u32 {
        self.0
    }
}

fn messages(n: u32) -> Arc<[Message]> {
    (0..n).map(Message).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn render_runs_inside_widget_span() {
    let captured = with_captured(|| {
        let config = ListConfig::default().with_component_name("SearchResults");
        let mut list = ProgressiveList::new(messages(120), config);
        let registry = CommandRegistry::new();
        let _handle = list
            .attach(&registry, Box::new(GeometryObserver::new()))
            .unwrap();
        list.on_frame();
    });

    let span = captured
        .spans
        .iter()
        .find(|s| s.name == "widget_render")
        .expect("widget_render span");
    assert_eq!(span.fields.get("widget").map(String::as_str), Some("SearchResults"));
    assert_eq!(span.fields.get("materialized").map(String::as_str), Some("50"));
}

#[test]
fn one_span_per_coalesced_frame() {
    let captured = with_captured(|| {
        let mut list = ProgressiveList::new(messages(500), ListConfig::default());
        let registry = CommandRegistry::new();
        let _handle = list.attach(&registry, Box::new(Unsupported)).unwrap();
        for _ in 0..10 {
            list.execute(NavCommand::Next);
        }
        list.on_frame();
        list.on_frame();
    });

    let renders = captured
        .spans
        .iter()
        .filter(|s| s.name == "widget_render")
        .count();
    assert_eq!(renders, 1);
}

#[test]
fn missing_visibility_primitive_warns_once() {
    let captured = with_captured(|| {
        let mut list = ProgressiveList::new(messages(500), ListConfig::default());
        let registry = CommandRegistry::new();
        let handle = list.attach(&registry, Box::new(Unsupported)).unwrap();
        list.detach(handle);
        let _handle = list.attach(&registry, Box::new(Unsupported)).unwrap();
        list.execute(NavCommand::JumpToLast);
        list.on_frame();
    });

    let warnings: Vec<_> = captured
        .events
        .iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message().contains("visibility observation unavailable"));
}

#[test]
fn reset_is_logged_with_lengths() {
    let captured = with_captured(|| {
        let mut list = ProgressiveList::new(messages(500), ListConfig::default());
        list.replace_items(messages(505));
        list.replace_items(messages(40));
    });

    let resets: Vec<_> = captured
        .events
        .iter()
        .filter(|e| e.message() == "list reset after significant change")
        .collect();
    assert_eq!(resets.len(), 1);
    assert_eq!(resets[0].fields.get("old_len").map(String::as_str), Some("505"));
    assert_eq!(resets[0].fields.get("new_len").map(String::as_str), Some("40"));
}

#[test]
fn suppressed_command_is_logged() {
    let captured = with_captured(|| {
        let mut list = ProgressiveList::new(messages(10), ListConfig::default())
            .with_input_capture(|| Capture::Modal);
        list.execute(NavCommand::Next);
        assert_eq!(list.focused_index(), None);
    });

    let event = captured
        .events
        .iter()
        .find(|e| e.message() == "command suppressed while input is captured")
        .expect("suppression logged");
    assert_eq!(event.level, tracing::Level::DEBUG);
    assert_eq!(event.fields.get("command").map(String::as_str), Some("next"));
    assert_eq!(event.fields.get("capture").map(String::as_str), Some("Modal"));
}

#[test]
fn instrumented_render_feeds_sink() {
    let log = SampleLog::new();
    let captured = with_captured(|| {
        let config = ListConfig::default().with_instrumentation(true);
        let mut list = ProgressiveList::new(messages(80), config)
            .with_sample_sink(Arc::new(log.clone()));
        let registry = CommandRegistry::new();
        let _handle = list.attach(&registry, Box::new(Unsupported)).unwrap();
        list.on_frame();
        list.load_more();
        list.on_frame();
    });

    let counts: Vec<usize> = log.samples().iter().map(|s| s.materialized).collect();
    assert_eq!(counts, vec![50, 80]);
    assert!(
        !captured
            .events
            .iter()
            .any(|e| e.message() == "render sample dropped")
    );
}

#[test]
fn attach_and_detach_are_logged() {
    let captured = with_captured(|| {
        let mut list = ProgressiveList::new(messages(10), ListConfig::default());
        let registry = CommandRegistry::new();
        let handle = list
            .attach(&registry, Box::new(GeometryObserver::new()))
            .unwrap();
        list.detach(handle);
    });

    let attached = captured
        .events
        .iter()
        .find(|e| e.message() == "list attached")
        .expect("attach logged");
    assert_eq!(attached.fields.get("observing").map(String::as_str), Some("true"));
    let detached = captured
        .events
        .iter()
        .find(|e| e.message() == "list detached")
        .expect("detach logged");
    assert_eq!(detached.fields.get("commands").map(String::as_str), Some("5"));
}
