//! Enrichers attach properties to every log event before it reaches a sink.

use std::fmt::Debug;

use serde_json::Value;

use crate::event::LogEvent;
use crate::trace_context::TraceContext;

/// Property carrying the current span id.
pub const SPAN_ID_PROPERTY: &str = "SpanId";
/// Property carrying the current trace id.
pub const TRACE_ID_PROPERTY: &str = "TraceId";
/// Property carrying the parent span id.
pub const PARENT_ID_PROPERTY: &str = "ParentId";

/// Adds properties to a log event.
///
/// Enrichers run on whichever thread emits the event and must not
/// overwrite properties that are already present.
pub trait LogEventEnricher: Send + Sync + Debug {
    /// Enrich `event`. `trace` is the trace context active when the event
    /// was emitted, if any.
    fn enrich(&self, event: &mut LogEvent, trace: Option<&TraceContext>);
}

/// Attaches a fixed property to every event.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEnricher {
    pub name: String,
    pub value: Value,
}

impl PropertyEnricher {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl LogEventEnricher for PropertyEnricher {
    fn enrich(&self, event: &mut LogEvent, _trace: Option<&TraceContext>) {
        event.add_property_if_absent(&self.name, self.value.clone());
    }
}

/// Attaches `SpanId`, `TraceId` and `ParentId` from the active trace context.
///
/// Without a context, or with an id format it does not understand, all
/// three are the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceContextEnricher;

impl LogEventEnricher for TraceContextEnricher {
    fn enrich(&self, event: &mut LogEvent, trace: Option<&TraceContext>) {
        let (span_id, trace_id, parent_id) = match trace {
            Some(ctx) => (ctx.span_id(), ctx.trace_id(), ctx.parent_id()),
            None => Default::default(),
        };

        event.add_property_if_absent(SPAN_ID_PROPERTY, span_id);
        event.add_property_if_absent(TRACE_ID_PROPERTY, trace_id);
        event.add_property_if_absent(PARENT_ID_PROPERTY, parent_id);
    }
}
