//! # HostKit Logging
//!
//! Logging bootstrap for host applications: category level rules,
//! trace-correlation enrichment, a console sink and an Elasticsearch sink.
//!
//! ```text
//! tracing event
//!     │
//!     ▼
//! level rules ──▶ PipelineLayer ──▶ enrichers ──▶ sinks
//!                  (trace context     (properties,   (console,
//!                   from span scope)   SpanId/...)    Elasticsearch)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use hostkit_logging::{configure_logger_for, HostEnvironment};
//!
//! let env = HostEnvironment::from_env("billing-api");
//! let _guard = configure_logger_for(&env, config.get("IndexFormat").as_deref()).init()?;
//! ```

mod bootstrap;
mod enricher;
mod environment;
mod error;
mod event;
mod layer;
mod levels;
pub mod sinks;
mod trace_context;

pub use bootstrap::{
    application_category, configure_logger, configure_logger_for, configure_logger_with_endpoint,
    LoggerConfiguration, LoggerGuard, SinkConfiguration, APPLICATION_NAME_PROPERTY,
    DEFAULT_ELASTICSEARCH_URL, ENVIRONMENT_NAME_PROPERTY, FRAMEWORK_CATEGORY,
    HOSTING_LIFETIME_CATEGORY, HTTP_CLIENT_CATEGORY, INDEX_FORMAT_KEY,
};
pub use enricher::{
    LogEventEnricher, PropertyEnricher, TraceContextEnricher, PARENT_ID_PROPERTY,
    SPAN_ID_PROPERTY, TRACE_ID_PROPERTY,
};
pub use environment::{HostEnvironment, DEVELOPMENT, ENVIRONMENT_VARIABLE, PRODUCTION, STAGING};
pub use error::LoggingError;
pub use event::{level_name, LogEvent};
pub use layer::PipelineLayer;
pub use levels::LevelRules;
pub use sinks::{
    ConsoleSink, ElasticsearchSink, ElasticsearchSinkOptions, LogSink, TemplateVersion,
};
pub use trace_context::{find_in_scope, TraceContext, TraceContextExt};
