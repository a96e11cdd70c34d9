//! Connections to the relational store holding the configuration table.
//!
//! A [`ConfigConnector`] hands out one [`ConfigConnection`] per load. The
//! connection is released when the boxed value is dropped, so every exit
//! path of a load (including `?` on a failed row) closes it exactly once.

use std::str::FromStr;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::LoadError;

/// Column holding the configuration key.
pub const KEY_COLUMN: &str = "Key";
/// Column holding the configuration value.
pub const VALUE_COLUMN: &str = "value";

/// A single `(Key, value)` row read from the configuration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRow {
    pub key: String,
    pub value: String,
}

impl ConfigRow {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Opens connections to the configuration store.
pub trait ConfigConnector: Send + Sync {
    /// Acquire a fresh connection. The caller owns it exclusively.
    fn connect(&self) -> Result<Box<dyn ConfigConnection>, LoadError>;
}

/// An open connection to the configuration store.
pub trait ConfigConnection {
    /// Run `query` and feed every row to `on_row`, stopping at the first error.
    fn for_each_row(
        &mut self,
        query: &str,
        on_row: &mut dyn FnMut(ConfigRow) -> Result<(), LoadError>,
    ) -> Result<(), LoadError>;
}

// =============================================================================
// Connection string
// =============================================================================

/// How the SQLite database is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    ReadOnly,
    ReadWrite,
    ReadWriteCreate,
}

impl OpenMode {
    fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            OpenMode::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadWriteCreate => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        }
    }
}

/// Parsed SQLite connection string.
///
/// Accepted forms:
/// - a plain file path (`/var/lib/app/config.db`)
/// - a `file:` URI (`file:config.db?mode=ro`)
/// - key/value pairs (`Data Source=config.db;Mode=ReadOnly`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConnectionString {
    pub data_source: String,
    pub mode: OpenMode,
}

impl FromStr for SqliteConnectionString {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LoadError::InvalidConnectionString(
                "connection string is empty".to_string(),
            ));
        }

        if trimmed.starts_with("file:") || !trimmed.contains('=') {
            return Ok(Self {
                data_source: trimmed.to_string(),
                mode: OpenMode::default(),
            });
        }

        let mut data_source = None;
        let mut mode = OpenMode::default();

        for pair in trimmed.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                LoadError::InvalidConnectionString(format!("expected key=value, got '{}'", pair))
            })?;
            let key: String = key
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "datasource" | "filename" => data_source = Some(value.to_string()),
                "mode" => {
                    mode = match value.to_ascii_lowercase().as_str() {
                        "readonly" => OpenMode::ReadOnly,
                        "readwrite" => OpenMode::ReadWrite,
                        "readwritecreate" => OpenMode::ReadWriteCreate,
                        other => {
                            return Err(LoadError::InvalidConnectionString(format!(
                                "unsupported mode '{}'",
                                other
                            )))
                        }
                    }
                }
                _ => debug!("[Config] Ignoring connection string keyword '{}'", key),
            }
        }

        match data_source {
            Some(data_source) if !data_source.is_empty() => Ok(Self { data_source, mode }),
            _ => Err(LoadError::InvalidConnectionString(
                "missing 'Data Source'".to_string(),
            )),
        }
    }
}

// =============================================================================
// SQLite
// =============================================================================

/// Connector for SQLite databases.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    connection_string: String,
}

impl SqliteConnector {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }
}

impl ConfigConnector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn ConfigConnection>, LoadError> {
        let parsed: SqliteConnectionString = self.connection_string.parse()?;

        let conn = Connection::open_with_flags(&parsed.data_source, parsed.mode.flags())
            .map_err(|source| LoadError::Connect { source })?;

        debug!("[Config] Opened configuration database {}", parsed.data_source);

        Ok(Box::new(SqliteConnection { conn }))
    }
}

struct SqliteConnection {
    conn: Connection,
}

impl ConfigConnection for SqliteConnection {
    fn for_each_row(
        &mut self,
        query: &str,
        on_row: &mut dyn FnMut(ConfigRow) -> Result<(), LoadError>,
    ) -> Result<(), LoadError> {
        let query_err = |source| LoadError::Query { source };

        let mut stmt = self.conn.prepare(query).map_err(query_err)?;
        let mut rows = stmt.query([]).map_err(query_err)?;

        while let Some(row) = rows.next().map_err(query_err)? {
            let key = cell_to_string(row.get_ref(KEY_COLUMN).map_err(query_err)?);
            let value = cell_to_string(row.get_ref(VALUE_COLUMN).map_err(query_err)?);
            on_row(ConfigRow { key, value })?;
        }

        Ok(())
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        debug!("[Config] Closing configuration database");
    }
}

/// Render a cell as text. NULL becomes the empty string, blobs are hex.
fn cell_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => hex::encode(b),
    }
}
