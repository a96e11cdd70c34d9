//! Log sinks: destinations for enriched log events.

mod console;
mod elasticsearch;

pub use console::{render_line, ConsoleSink};
pub use elasticsearch::{
    render_index_name, ElasticsearchSink, ElasticsearchSinkOptions, ElasticsearchWorker,
    TemplateVersion, DEFAULT_INDEX_FORMAT, DEFAULT_TEMPLATE_NAME, SOURCE_CONTEXT_PROPERTY,
};

use std::fmt::Debug;

use tracing::level_filters::LevelFilter;

use crate::event::LogEvent;

/// A destination for log events.
///
/// `emit` is called concurrently from any thread logging an event and must
/// not block on I/O. Delivery is best-effort: failures are reported on
/// stderr and never propagated to the call site.
pub trait LogSink: Send + Sync + Debug {
    /// Most verbose level this sink accepts.
    fn minimum_level(&self) -> LevelFilter {
        LevelFilter::TRACE
    }

    fn emit(&self, event: &LogEvent);

    /// Block until buffered events have been handed off.
    fn flush(&self) {}
}
