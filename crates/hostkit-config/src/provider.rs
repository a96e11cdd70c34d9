//! Pluggable configuration sources and providers.

use crate::builder::ConfigurationBuilder;
use crate::data::ConfigData;
use crate::error::LoadError;

/// Factory for a [`ConfigurationProvider`], registered on a [`ConfigurationBuilder`].
pub trait ConfigurationSource: Send + Sync {
    /// Create the provider for this source.
    fn build(&self, builder: &ConfigurationBuilder) -> Box<dyn ConfigurationProvider>;
}

/// Supplies a flat key/value snapshot to the layered configuration.
pub trait ConfigurationProvider: Send + Sync {
    /// (Re)load the snapshot. On failure the provider exposes no partial data.
    fn load(&mut self) -> Result<(), LoadError>;

    /// The most recently loaded snapshot.
    fn data(&self) -> &ConfigData;

    /// Look up a single key.
    fn try_get(&self, key: &str) -> Option<&str> {
        self.data().get(key)
    }

    /// Short name used in diagnostics.
    fn name(&self) -> &str;
}
