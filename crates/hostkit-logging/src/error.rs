//! Errors raised while assembling or installing the logging pipeline.

/// Failure while building or installing the logging pipeline.
///
/// Delivery failures of a running sink are never reported here; sinks
/// are best-effort.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The indexing endpoint is not a valid absolute URL.
    #[error("invalid log sink endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client for the indexing sink could not be created.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A sink worker thread could not be started.
    #[error("failed to start log worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// A global subscriber is already installed.
    #[error("failed to install logger: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// A W3C `traceparent` value could not be parsed.
    #[error("invalid traceparent '{0}'")]
    InvalidTraceParent(String),
}
