use crate::builder::ConfigurationBuilder;
use crate::data::ConfigData;
use crate::error::LoadError;
use crate::provider::{ConfigurationProvider, ConfigurationSource};

/// Fixed key/value pairs, typically defaults registered first.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigurationSource {
    data: ConfigData,
}

impl MemoryConfigurationSource {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            data: pairs.into_iter().collect(),
        }
    }
}

impl ConfigurationSource for MemoryConfigurationSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Box<dyn ConfigurationProvider> {
        Box::new(MemoryConfigurationProvider {
            data: self.data.clone(),
        })
    }
}

pub struct MemoryConfigurationProvider {
    data: ConfigData,
}

impl ConfigurationProvider for MemoryConfigurationProvider {
    fn load(&mut self) -> Result<(), LoadError> {
        Ok(())
    }

    fn data(&self) -> &ConfigData {
        &self.data
    }

    fn name(&self) -> &str {
        "memory"
    }
}
