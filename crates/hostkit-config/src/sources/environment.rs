use std::ffi::OsString;

use tracing::debug;

use crate::builder::{ConfigurationBuilder, KEY_DELIMITER};
use crate::data::ConfigData;
use crate::error::LoadError;
use crate::provider::{ConfigurationProvider, ConfigurationSource};

/// Process environment variables starting with a prefix.
///
/// The prefix is stripped and `__` becomes the `:` key separator, so
/// `APP_Logging__Level=Debug` with prefix `APP_` yields `Logging:Level`.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentVariablesSource {
    prefix: String,
}

impl EnvironmentVariablesSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl ConfigurationSource for EnvironmentVariablesSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Box<dyn ConfigurationProvider> {
        Box::new(EnvironmentVariablesProvider {
            prefix: self.prefix.clone(),
            data: ConfigData::new(),
        })
    }
}

pub struct EnvironmentVariablesProvider {
    prefix: String,
    data: ConfigData,
}

impl EnvironmentVariablesProvider {
    /// Variables whose name or value is not valid UTF-8 are skipped.
    fn collect<I>(prefix: &str, vars: I) -> ConfigData
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        vars.into_iter()
            .filter_map(|(name, value)| {
                let (name, value) = match (name.into_string(), value.into_string()) {
                    (Ok(name), Ok(value)) => (name, value),
                    (name, _) => {
                        debug!(
                            "[Config] Skipping non UTF-8 environment variable {:?}",
                            name.unwrap_or_else(|n| n.to_string_lossy().into_owned())
                        );
                        return None;
                    }
                };
                let stripped = strip_prefix_ignore_case(&name, prefix)?;
                if stripped.is_empty() {
                    return None;
                }
                Some((stripped.replace("__", KEY_DELIMITER), value))
            })
            .collect()
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &name[prefix.len()..])
}

impl ConfigurationProvider for EnvironmentVariablesProvider {
    fn load(&mut self) -> Result<(), LoadError> {
        self.data = Self::collect(&self.prefix, std::env::vars_os());
        Ok(())
    }

    fn data(&self) -> &ConfigData {
        &self.data
    }

    fn name(&self) -> &str {
        "environment"
    }
}
