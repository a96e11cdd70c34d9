//! The tracing layer that turns events into enriched [`LogEvent`]s and fans
//! them out to sinks.

use std::sync::Arc;

use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::enricher::LogEventEnricher;
use crate::event::LogEvent;
use crate::sinks::LogSink;
use crate::trace_context::{find_in_scope, TraceContext};

/// Enrich every event in registration order, then hand it to each sink
/// whose minimum level admits it.
#[derive(Debug, Clone, Default)]
pub struct PipelineLayer {
    enrichers: Vec<Arc<dyn LogEventEnricher>>,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl PipelineLayer {
    pub fn new(enrichers: Vec<Arc<dyn LogEventEnricher>>, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { enrichers, sinks }
    }

    /// Run enrichers and sinks for an already captured event.
    pub fn dispatch(&self, mut event: LogEvent, trace: Option<&TraceContext>) {
        for enricher in &self.enrichers {
            enricher.enrich(&mut event, trace);
        }
        for sink in &self.sinks {
            if event.level <= sink.minimum_level() {
                sink.emit(&event);
            }
        }
    }
}

impl<S> Layer<S> for PipelineLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let trace = find_in_scope(&ctx, event);
        self.dispatch(LogEvent::from_tracing(event), trace.as_ref());
    }
}
