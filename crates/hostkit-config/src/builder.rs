//! Builder-style configuration pipeline and the layered configuration root.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::debug;

use crate::error::LoadError;
use crate::provider::{ConfigurationProvider, ConfigurationSource};

/// Separator between segments of hierarchical keys (`Logging:Level`).
pub const KEY_DELIMITER: &str = ":";

/// Ordered collection of configuration sources.
///
/// Sources added later take precedence over sources added earlier.
///
/// # Example
/// ```ignore
/// let config = ConfigurationBuilder::new()
///     .add_json_file("appsettings.json", true)
///     .add_environment_variables("APP_")
///     .add_custom_configuration("Data Source=config.db")
///     .build()?;
/// ```
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source.
    pub fn add(&mut self, source: impl ConfigurationSource + 'static) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Build every provider and load them in registration order.
    ///
    /// The first failing provider aborts the build.
    pub fn build(&self) -> Result<Configuration, LoadError> {
        let providers = self
            .sources
            .iter()
            .map(|source| source.build(self))
            .collect();

        let mut configuration = Configuration { providers };
        configuration.reload()?;
        Ok(configuration)
    }
}

/// Layered configuration: lookups walk the providers from last to first.
pub struct Configuration {
    providers: Vec<Box<dyn ConfigurationProvider>>,
}

impl Configuration {
    /// Reload every provider in registration order.
    pub fn reload(&mut self) -> Result<(), LoadError> {
        for provider in &mut self.providers {
            provider.load()?;
            debug!(
                "[Config] Provider '{}' loaded {} entries",
                provider.name(),
                provider.data().len()
            );
        }
        Ok(())
    }

    /// Value for `key` from the highest-priority provider that has it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.providers
            .iter()
            .rev()
            .find_map(|provider| provider.try_get(key))
    }

    /// Value for `key` parsed into `T`. Missing or unparsable values yield `None`.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|value| value.parse().ok())
    }

    /// Effective `(key, value)` pairs after layering, sorted by lower-cased key.
    pub fn entries(&self) -> BTreeMap<String, (String, String)> {
        let mut merged = BTreeMap::new();
        for provider in &self.providers {
            for (key, value) in provider.data().iter() {
                merged.insert(
                    key.to_ascii_lowercase(),
                    (key.to_string(), value.to_string()),
                );
            }
        }
        merged
    }

    /// Effective keys after layering.
    pub fn keys(&self) -> Vec<String> {
        self.entries().into_values().map(|(key, _)| key).collect()
    }

    /// Entries under `prefix:`, with the prefix stripped.
    pub fn section(&self, prefix: &str) -> BTreeMap<String, String> {
        let needle = format!("{}{}", prefix.to_ascii_lowercase(), KEY_DELIMITER);
        self.entries()
            .into_iter()
            .filter(|(normalized, _)| normalized.starts_with(&needle))
            .map(|(_, (key, value))| (key[needle.len()..].to_string(), value))
            .collect()
    }

    /// The loaded providers, lowest priority first.
    pub fn providers(&self) -> &[Box<dyn ConfigurationProvider>] {
        &self.providers
    }
}
