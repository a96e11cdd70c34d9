//! Shared test utilities and fixtures for HostKit integration tests.

pub use mocks::TrackingConnector;

/// Database test helpers
pub mod db {
    use std::path::{Path, PathBuf};

    use anyhow::Result;
    use rusqlite::{params, Connection};
    use tempfile::TempDir;

    /// Database file name
    const DB_FILE: &str = "config.db";

    /// A SQLite database with a `tblConfig` table in a temporary directory
    pub struct TestConfigDatabase {
        _temp_dir: TempDir,
        db_path: PathBuf,
    }

    impl TestConfigDatabase {
        /// Create an empty configuration table
        pub fn new() -> Self {
            let db = Self::without_table();
            db.execute("CREATE TABLE tblConfig (\"Key\" TEXT, value TEXT)")
                .expect("Failed to create tblConfig");
            db
        }

        /// Create a table seeded with `rows`
        pub fn with_rows(rows: &[(&str, &str)]) -> Self {
            let db = Self::new();
            for (key, value) in rows {
                db.insert(key, value).expect("Failed to seed tblConfig");
            }
            db
        }

        /// Create a database file that has no configuration table
        pub fn without_table() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let db_path = temp_dir.path().join(DB_FILE);
            Connection::open(&db_path).expect("Failed to create test database");
            Self {
                _temp_dir: temp_dir,
                db_path,
            }
        }

        /// Insert a row
        pub fn insert(&self, key: &str, value: &str) -> Result<()> {
            self.connection()?.execute(
                "INSERT INTO tblConfig (\"Key\", value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(())
        }

        /// Run arbitrary SQL against the database
        pub fn execute(&self, sql: &str) -> Result<()> {
            self.connection()?.execute_batch(sql)?;
            Ok(())
        }

        /// `Data Source=...` connection string for this database
        pub fn connection_string(&self) -> String {
            format!("Data Source={}", self.db_path.display())
        }

        /// Get the full database file path
        pub fn db_path(&self) -> &Path {
            &self.db_path
        }

        /// Get the database directory path
        pub fn dir(&self) -> &Path {
            self._temp_dir.path()
        }

        fn connection(&self) -> Result<Connection> {
            Ok(Connection::open(&self.db_path)?)
        }
    }

    impl Default for TestConfigDatabase {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Log sinks for asserting on emitted events
pub mod sinks {
    use std::sync::Mutex;

    use hostkit_logging::{LogEvent, LogSink};
    use tracing::level_filters::LevelFilter;

    /// Records every event it receives
    #[derive(Debug)]
    pub struct CapturingSink {
        minimum_level: LevelFilter,
        events: Mutex<Vec<LogEvent>>,
    }

    impl CapturingSink {
        pub fn new() -> Self {
            Self::with_minimum_level(LevelFilter::TRACE)
        }

        pub fn with_minimum_level(minimum_level: LevelFilter) -> Self {
            Self {
                minimum_level,
                events: Mutex::new(Vec::new()),
            }
        }

        /// Snapshot of captured events
        pub fn events(&self) -> Vec<LogEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Messages of captured events, in order
        pub fn messages(&self) -> Vec<String> {
            self.events().into_iter().map(|e| e.message).collect()
        }

        /// First captured event with this message
        pub fn find(&self, message: &str) -> Option<LogEvent> {
            self.events().into_iter().find(|e| e.message == message)
        }
    }

    impl Default for CapturingSink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl LogSink for CapturingSink {
        fn minimum_level(&self) -> LevelFilter {
            self.minimum_level
        }

        fn emit(&self, event: &LogEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}

/// Elasticsearch mock helpers
pub mod elasticsearch {
    use serde_json::Value;
    use wiremock::Request;

    /// Split an NDJSON bulk body into `(action, document)` pairs
    pub fn bulk_items(request: &Request) -> Vec<(Value, Value)> {
        let body = String::from_utf8_lossy(&request.body);
        let lines: Vec<Value> = body
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).expect("bulk line is not JSON"))
            .collect();
        lines
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect()
    }

    /// All bulk items across the given requests
    pub fn all_bulk_items(requests: &[Request]) -> Vec<(Value, Value)> {
        requests
            .iter()
            .filter(|r| r.url.path() == "/_bulk")
            .flat_map(bulk_items)
            .collect()
    }
}
