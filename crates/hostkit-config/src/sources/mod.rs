//! Standard sources layered alongside the configuration table.

mod environment;
mod json_file;
mod memory;

pub use environment::{EnvironmentVariablesProvider, EnvironmentVariablesSource};
pub use json_file::{flatten_json, JsonFileConfigurationProvider, JsonFileConfigurationSource};
pub use memory::{MemoryConfigurationProvider, MemoryConfigurationSource};

use std::path::PathBuf;

use crate::builder::ConfigurationBuilder;

/// Convenience registration methods for the standard sources.
pub trait StandardSourcesExt {
    /// Add fixed in-memory values.
    fn add_in_memory<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>;

    /// Add a JSON file. A missing file is an error unless `optional`.
    fn add_json_file(&mut self, path: impl Into<PathBuf>, optional: bool) -> &mut Self;

    /// Add process environment variables starting with `prefix`.
    fn add_environment_variables(&mut self, prefix: impl Into<String>) -> &mut Self;
}

impl StandardSourcesExt for ConfigurationBuilder {
    fn add_in_memory<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.add(MemoryConfigurationSource::new(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())),
        ))
    }

    fn add_json_file(&mut self, path: impl Into<PathBuf>, optional: bool) -> &mut Self {
        self.add(JsonFileConfigurationSource::new(path, optional))
    }

    fn add_environment_variables(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.add(EnvironmentVariablesSource::new(prefix))
    }
}
