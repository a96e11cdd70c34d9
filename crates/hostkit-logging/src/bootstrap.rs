//! Logger assembly and installation.
//!
//! [`configure_logger`] is pure: it returns a [`LoggerConfiguration`]
//! describing levels, enrichers and sinks without touching global state.
//! The host installs it once at startup with [`LoggerConfiguration::init`]
//! and keeps the returned [`LoggerGuard`] alive for the life of the process.

use std::sync::Arc;

use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::enricher::{LogEventEnricher, PropertyEnricher, TraceContextEnricher};
use crate::environment::HostEnvironment;
use crate::error::LoggingError;
use crate::layer::PipelineLayer;
use crate::levels::LevelRules;
use crate::sinks::{
    ConsoleSink, ElasticsearchSink, ElasticsearchSinkOptions, ElasticsearchWorker, LogSink,
    TemplateVersion,
};

// =============================================================================
// Constants
// =============================================================================

/// Node the Elasticsearch sink writes to.
pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";

/// Configuration key holding the index name format.
pub const INDEX_FORMAT_KEY: &str = "IndexFormat";

pub const FRAMEWORK_CATEGORY: &str = "Microsoft";
pub const HTTP_CLIENT_CATEGORY: &str = "System.Net.Http.HttpClient";
pub const HOSTING_LIFETIME_CATEGORY: &str = "Microsoft.Hosting.Lifetime";

pub const APPLICATION_NAME_PROPERTY: &str = "ApplicationName";
pub const ENVIRONMENT_NAME_PROPERTY: &str = "EnvironmentName";

// =============================================================================
// Assembly
// =============================================================================

/// Standard logger for a host application.
///
/// Information and above by default, framework noise reduced to warnings,
/// the application's own category at Debug in development. Events carry
/// `ApplicationName`, `EnvironmentName` and the trace correlation ids, and
/// go to the console and to Elasticsearch at [`DEFAULT_ELASTICSEARCH_URL`].
pub fn configure_logger(
    application_name: &str,
    environment_name: &str,
    index_format: Option<&str>,
    is_development: bool,
) -> LoggerConfiguration {
    configure_logger_with_endpoint(
        application_name,
        environment_name,
        index_format,
        is_development,
        DEFAULT_ELASTICSEARCH_URL,
    )
}

/// [`configure_logger`] with an explicit Elasticsearch node. An empty
/// endpoint leaves the Elasticsearch sink out.
pub fn configure_logger_with_endpoint(
    application_name: &str,
    environment_name: &str,
    index_format: Option<&str>,
    is_development: bool,
    elasticsearch_endpoint: &str,
) -> LoggerConfiguration {
    let mut config = LoggerConfiguration::new()
        .with_minimum_level(LevelFilter::INFO)
        .override_level(FRAMEWORK_CATEGORY, LevelFilter::WARN)
        .override_level(HTTP_CLIENT_CATEGORY, LevelFilter::WARN)
        .override_level(HOSTING_LIFETIME_CATEGORY, LevelFilter::INFO);

    if is_development {
        config = config.override_level(application_category(application_name), LevelFilter::DEBUG);
    }

    config = config
        .enrich_with_property(APPLICATION_NAME_PROPERTY, application_name)
        .enrich_with_property(ENVIRONMENT_NAME_PROPERTY, environment_name)
        .enrich_with(TraceContextEnricher)
        .write_to_console();

    if !elasticsearch_endpoint.is_empty() {
        let mut options = ElasticsearchSinkOptions::new(elasticsearch_endpoint);
        options.auto_register_template = true;
        options.template_version = TemplateVersion::ESv7;
        options.index_format = index_format.map(str::to_string);
        options.minimum_level = LevelFilter::DEBUG;
        config = config.write_to_elasticsearch(options);
    }

    config
}

/// [`configure_logger`] driven by the host environment.
pub fn configure_logger_for(
    environment: &HostEnvironment,
    index_format: Option<&str>,
) -> LoggerConfiguration {
    configure_logger(
        &environment.application_name,
        &environment.environment_name,
        index_format,
        environment.is_development(),
    )
}

/// Tracing target under which an application logs. Crate names use `-`,
/// their targets use `_`.
pub fn application_category(application_name: &str) -> String {
    application_name.replace('-', "_")
}

// =============================================================================
// LoggerConfiguration
// =============================================================================

/// Where events go.
#[derive(Debug, Clone)]
pub enum SinkConfiguration {
    Console,
    Elasticsearch(ElasticsearchSinkOptions),
    Custom(Arc<dyn LogSink>),
}

/// Declarative description of a logger.
#[derive(Debug, Clone)]
pub struct LoggerConfiguration {
    levels: LevelRules,
    properties: Vec<(String, Value)>,
    enrichers: Vec<Arc<dyn LogEventEnricher>>,
    sinks: Vec<SinkConfiguration>,
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerConfiguration {
    /// Empty configuration at Information, no enrichers, no sinks.
    pub fn new() -> Self {
        Self {
            levels: LevelRules::new(LevelFilter::INFO),
            properties: Vec::new(),
            enrichers: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn with_minimum_level(mut self, level: LevelFilter) -> Self {
        self.levels.set_minimum_level(level);
        self
    }

    pub fn override_level(mut self, category: impl Into<String>, level: LevelFilter) -> Self {
        self.levels.set_override(category, level);
        self
    }

    /// Attach a fixed property to every event.
    pub fn enrich_with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.properties.push((name, value)),
        }
        self
    }

    pub fn enrich_with(mut self, enricher: impl LogEventEnricher + 'static) -> Self {
        self.enrichers.push(Arc::new(enricher));
        self
    }

    pub fn write_to_console(mut self) -> Self {
        self.sinks.push(SinkConfiguration::Console);
        self
    }

    pub fn write_to_elasticsearch(mut self, options: ElasticsearchSinkOptions) -> Self {
        self.sinks.push(SinkConfiguration::Elasticsearch(options));
        self
    }

    pub fn write_to(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(SinkConfiguration::Custom(sink));
        self
    }

    // ===== Inspection =====

    pub fn minimum_level(&self) -> LevelFilter {
        self.levels.minimum_level()
    }

    pub fn overrides(&self) -> &[(String, LevelFilter)] {
        self.levels.overrides()
    }

    /// Effective minimum level of a category.
    pub fn level_for(&self, category: &str) -> LevelFilter {
        self.levels.level_for(category)
    }

    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn enrichers(&self) -> &[Arc<dyn LogEventEnricher>] {
        &self.enrichers
    }

    pub fn sinks(&self) -> &[SinkConfiguration] {
        &self.sinks
    }

    pub fn has_console_sink(&self) -> bool {
        self.sinks
            .iter()
            .any(|s| matches!(s, SinkConfiguration::Console))
    }

    /// Options of the first Elasticsearch sink, if any.
    pub fn elasticsearch_options(&self) -> Option<&ElasticsearchSinkOptions> {
        self.sinks.iter().find_map(|s| match s {
            SinkConfiguration::Elasticsearch(options) => Some(options),
            _ => None,
        })
    }

    // ===== Installation =====

    /// Start the sinks and compose a subscriber without installing it.
    ///
    /// Spans always pass the level filter so that trace context attached to
    /// them stays reachable; events are filtered per category.
    pub fn build(
        &self,
    ) -> Result<
        (
            impl Subscriber + Send + Sync + for<'a> LookupSpan<'a>,
            LoggerGuard,
        ),
        LoggingError,
    > {
        let mut guard = LoggerGuard::default();
        let mut sinks: Vec<Arc<dyn LogSink>> = Vec::with_capacity(self.sinks.len());

        for sink in &self.sinks {
            match sink {
                SinkConfiguration::Console => {
                    let (console, worker) = ConsoleSink::stdout();
                    guard.console_workers.push(worker);
                    sinks.push(Arc::new(console));
                }
                SinkConfiguration::Elasticsearch(options) => {
                    let (elasticsearch, worker) = ElasticsearchSink::start(options.clone())?;
                    guard.elasticsearch_workers.push(worker);
                    sinks.push(Arc::new(elasticsearch));
                }
                SinkConfiguration::Custom(custom) => sinks.push(Arc::clone(custom)),
            }
        }
        guard.sinks = sinks.clone();

        let mut enrichers: Vec<Arc<dyn LogEventEnricher>> = self
            .properties
            .iter()
            .map(|(name, value)| {
                Arc::new(PropertyEnricher::new(name.clone(), value.clone()))
                    as Arc<dyn LogEventEnricher>
            })
            .collect();
        enrichers.extend(self.enrichers.iter().cloned());

        let levels = self.levels.clone();
        let layer = PipelineLayer::new(enrichers, sinks)
            .with_filter(filter_fn(move |metadata| {
                metadata.is_span() || levels.enabled(metadata)
            }));

        let subscriber = tracing_subscriber::registry().with(layer);
        Ok((subscriber, guard))
    }

    /// Build and install as the global default subscriber.
    pub fn init(&self) -> Result<LoggerGuard, LoggingError> {
        let (subscriber, guard) = self.build()?;
        tracing::subscriber::set_global_default(subscriber)?;

        tracing::debug!(
            "[Logging] Installed logger with {} sink(s), minimum level {}",
            self.sinks.len(),
            self.minimum_level()
        );
        Ok(guard)
    }
}

// =============================================================================
// LoggerGuard
// =============================================================================

/// Keeps sink workers alive. Dropping it drains the Elasticsearch queue
/// and then flushes the console writer.
#[derive(Default)]
pub struct LoggerGuard {
    elasticsearch_workers: Vec<ElasticsearchWorker>,
    console_workers: Vec<WorkerGuard>,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl LoggerGuard {
    /// Ask every sink to hand off what it has buffered.
    pub fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}

impl std::fmt::Debug for LoggerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerGuard")
            .field("elasticsearch_workers", &self.elasticsearch_workers.len())
            .field("console_workers", &self.console_workers.len())
            .field("sinks", &self.sinks)
            .finish()
    }
}
