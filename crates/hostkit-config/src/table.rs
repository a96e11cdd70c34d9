//! Configuration loaded from a relational table.
//!
//! The table is read in full on every load:
//!
//! ```sql
//! SELECT * FROM tblConfig
//! ```
//!
//! Each row contributes one `(Key, value)` entry. A duplicate key, an
//! unreachable database or a missing table aborts the load; the error is
//! printed to stderr (logging is usually not up yet) and returned.

use std::sync::Arc;

use tracing::info;

use crate::builder::ConfigurationBuilder;
use crate::connection::{ConfigConnector, ConfigRow, SqliteConnector};
use crate::data::ConfigData;
use crate::error::LoadError;
use crate::provider::{ConfigurationProvider, ConfigurationSource};

/// Table holding configuration rows.
pub const CONFIG_TABLE: &str = "tblConfig";

/// Fixed, unparameterized read of the whole configuration table.
pub const SELECT_CONFIG: &str = "SELECT * FROM tblConfig";

/// Reads the configuration table into a [`ConfigData`] snapshot.
#[derive(Clone)]
pub struct ConfigTableLoader {
    connector: Arc<dyn ConfigConnector>,
}

impl ConfigTableLoader {
    /// Create a loader over any connector.
    pub fn new(connector: Arc<dyn ConfigConnector>) -> Self {
        Self { connector }
    }

    /// Create a loader for a SQLite connection string.
    pub fn sqlite(connection_string: impl Into<String>) -> Self {
        Self::new(Arc::new(SqliteConnector::new(connection_string)))
    }

    /// Load every row of the configuration table.
    ///
    /// The connection is acquired for the duration of this call only.
    pub fn load(&self) -> Result<ConfigData, LoadError> {
        self.read_table().map_err(|e| {
            eprintln!("[Config] Failed to load {}: {}", CONFIG_TABLE, e);
            e
        })
    }

    fn read_table(&self) -> Result<ConfigData, LoadError> {
        let mut connection = self.connector.connect()?;
        let mut data = ConfigData::new();

        connection.for_each_row(SELECT_CONFIG, &mut |row: ConfigRow| {
            data.insert_unique(row.key, row.value)
        })?;

        info!("[Config] Loaded {} entries from {}", data.len(), CONFIG_TABLE);
        Ok(data)
    }
}

// =============================================================================
// Configuration source
// =============================================================================

/// [`ConfigurationSource`] backed by the configuration table.
#[derive(Clone)]
pub struct SqlTableConfigurationSource {
    connector: Arc<dyn ConfigConnector>,
}

impl SqlTableConfigurationSource {
    /// Source for a SQLite connection string.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self::with_connector(Arc::new(SqliteConnector::new(connection_string)))
    }

    /// Source over any connector.
    pub fn with_connector(connector: Arc<dyn ConfigConnector>) -> Self {
        Self { connector }
    }
}

impl ConfigurationSource for SqlTableConfigurationSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Box<dyn ConfigurationProvider> {
        Box::new(SqlTableConfigurationProvider::new(ConfigTableLoader::new(
            self.connector.clone(),
        )))
    }
}

/// Provider holding the last snapshot read from the configuration table.
pub struct SqlTableConfigurationProvider {
    loader: ConfigTableLoader,
    data: ConfigData,
}

impl SqlTableConfigurationProvider {
    pub fn new(loader: ConfigTableLoader) -> Self {
        Self {
            loader,
            data: ConfigData::new(),
        }
    }
}

impl ConfigurationProvider for SqlTableConfigurationProvider {
    fn load(&mut self) -> Result<(), LoadError> {
        match self.loader.load() {
            Ok(data) => {
                self.data = data;
                Ok(())
            }
            Err(e) => {
                self.data = ConfigData::new();
                Err(e)
            }
        }
    }

    fn data(&self) -> &ConfigData {
        &self.data
    }

    fn name(&self) -> &str {
        CONFIG_TABLE
    }
}

/// Registers the configuration table on a [`ConfigurationBuilder`].
pub trait SqlConfigurationBuilderExt {
    /// Add the SQLite configuration table as the next (higher priority) source.
    fn add_custom_configuration(&mut self, connection_string: impl Into<String>) -> &mut Self;
}

impl SqlConfigurationBuilderExt for ConfigurationBuilder {
    fn add_custom_configuration(&mut self, connection_string: impl Into<String>) -> &mut Self {
        self.add(SqlTableConfigurationSource::new(connection_string))
    }
}
