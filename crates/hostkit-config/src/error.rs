//! Errors raised while loading configuration.

use std::path::PathBuf;

/// Failure while loading a configuration provider.
///
/// Every variant is fatal to startup: providers never retry and never
/// expose a partially loaded snapshot.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The connection string was empty or could not be understood.
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// The store could not be reached or opened.
    #[error("failed to open configuration database: {source}")]
    Connect {
        #[source]
        source: rusqlite::Error,
    },

    /// The configuration table could not be read.
    #[error("failed to read configuration table: {source}")]
    Query {
        #[source]
        source: rusqlite::Error,
    },

    /// A connector other than SQLite reported a failure.
    #[error("configuration connection failed: {0}")]
    Connection(String),

    /// Two rows share the same key.
    #[error("duplicate configuration key '{key}'")]
    DuplicateKey { key: String },

    /// A configuration file could not be read.
    #[error("failed to read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid JSON.
    #[error("failed to parse configuration file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
