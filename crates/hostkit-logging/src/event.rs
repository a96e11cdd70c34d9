//! Log records as seen by enrichers and sinks.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Level};

/// Field name tracing uses for the formatted message.
const MESSAGE_FIELD: &str = "message";

/// A single emitted log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    /// Category the record was emitted under (the tracing target).
    pub target: String,
    pub message: String,
    properties: BTreeMap<String, Value>,
}

impl LogEvent {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            target: target.into(),
            message: message.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Capture a tracing event: its message and every recorded field.
    pub fn from_tracing(event: &Event<'_>) -> Self {
        let metadata = event.metadata();
        let mut log_event = Self::new(*metadata.level(), metadata.target(), String::new());
        event.record(&mut FieldVisitor(&mut log_event));
        log_event
    }

    /// Add a property unless one with the same name is already set.
    ///
    /// Returns `true` if the property was added.
    pub fn add_property_if_absent(&mut self, name: &str, value: impl Into<Value>) -> bool {
        if self.properties.contains_key(name) {
            return false;
        }
        self.properties.insert(name.to_string(), value.into());
        true
    }

    /// Set a property, replacing any existing value.
    pub fn add_or_update_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Property value if it is a string.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }
}

/// Display name of a level, as written to the indexing backend.
pub fn level_name(level: Level) -> &'static str {
    match level.as_str() {
        "TRACE" => "Verbose",
        "DEBUG" => "Debug",
        "INFO" => "Information",
        "WARN" => "Warning",
        _ => "Error",
    }
}

struct FieldVisitor<'a>(&'a mut LogEvent);

impl FieldVisitor<'_> {
    fn record_value(&mut self, field: &Field, value: Value) {
        let name = field.name();
        // Fields bridged from the `log` crate carry metadata, not data.
        if name.starts_with("log.") {
            return;
        }
        if name == MESSAGE_FIELD {
            self.0.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.0.properties.insert(name.to_string(), value);
        }
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, Value::from(format!("{:?}", value)));
    }
}
