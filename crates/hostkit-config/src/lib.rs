//! # HostKit Configuration
//!
//! Layered key/value configuration with a provider that reads settings from
//! a relational table instead of a file.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            Configuration (root)              │
//! │        last registered source wins           │
//! ├──────────────┬──────────────┬────────────────┤
//! │  JSON file   │ Environment  │ tblConfig      │
//! │  provider    │ provider     │ (SQLite)       │
//! └──────────────┴──────────────┴────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use hostkit_config::{ConfigurationBuilder, SqlConfigurationBuilderExt, StandardSourcesExt};
//!
//! let config = ConfigurationBuilder::new()
//!     .add_json_file("appsettings.json", true)
//!     .add_environment_variables("APP_")
//!     .add_custom_configuration("Data Source=/var/lib/app/config.db")
//!     .build()?;
//!
//! let index_format = config.get("IndexFormat");
//! ```

mod builder;
pub mod connection;
mod data;
mod error;
mod provider;
pub mod sources;
mod table;

pub use builder::{Configuration, ConfigurationBuilder, KEY_DELIMITER};
pub use connection::{
    ConfigConnection, ConfigConnector, ConfigRow, OpenMode, SqliteConnectionString,
    SqliteConnector,
};
pub use data::ConfigData;
pub use error::LoadError;
pub use provider::{ConfigurationProvider, ConfigurationSource};
pub use sources::{
    EnvironmentVariablesSource, JsonFileConfigurationSource, MemoryConfigurationSource,
    StandardSourcesExt,
};
pub use table::{
    ConfigTableLoader, SqlConfigurationBuilderExt, SqlTableConfigurationProvider,
    SqlTableConfigurationSource, CONFIG_TABLE, SELECT_CONFIG,
};
