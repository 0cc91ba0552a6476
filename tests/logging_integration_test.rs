//! Integration tests for logging functionality

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use veil::anonymization::{Anonymizer, RuleRegistry};
use veil::config::LoggingConfig;
use veil::domain::{FieldRule, Record, Value};

/// Collects `(entity_type, field)` of every ERROR event
#[derive(Clone, Default)]
struct ErrorCapture {
    events: Arc<Mutex<Vec<(String, String)>>>,
}

#[derive(Default)]
struct FieldVisitor {
    entity_type: String,
    field: String,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "entity_type" => self.entity_type = format!("{value:?}"),
            "field" => self.field = format!("{value:?}"),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for ErrorCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap()
            .push((visitor.entity_type, visitor.field));
    }
}

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.level, "info");
}

#[test]
fn test_one_error_per_field_without_rule() {
    let capture = ErrorCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());

    let rules = RuleRegistry::new()
        .field("Customer", "nickname")
        .field("Customer", "aliases")
        .rule("Customer", "note", FieldRule::clear());
    let anonymizer = Anonymizer::new(rules);

    let customer = Record::new("Customer")
        .with("nickname", "JJ")
        .with(
            "aliases",
            vec![Value::from("Jay"), Value::from("J"), Value::from("Jo")],
        )
        .with("note", "VIP")
        .into_ref();

    tracing::subscriber::with_default(subscriber, || {
        anonymizer.anonymize(&customer).unwrap();
    });

    let events = capture.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            ("Customer".to_string(), "nickname".to_string()),
            ("Customer".to_string(), "aliases".to_string()),
        ]
    );
    assert_eq!(customer.borrow().get("nickname"), Some(Value::from("JJ")));
    assert_eq!(customer.borrow().get("note"), Some(Value::Null));
}

#[test]
fn test_fields_with_rules_log_no_errors() {
    let capture = ErrorCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());

    let rules = RuleRegistry::new()
        .rule("Customer", "name", FieldRule::fixed("anon").unwrap())
        .rule("Customer", "tags", FieldRule::fixed("x").unwrap());
    let anonymizer = Anonymizer::new(rules);

    let customer = Record::new("Customer")
        .with("name", "Jane")
        .with("tags", vec![Value::from("vip")])
        .into_ref();

    tracing::subscriber::with_default(subscriber, || {
        anonymizer.anonymize(&customer).unwrap();
    });

    assert!(capture.events.lock().unwrap().is_empty());
}
