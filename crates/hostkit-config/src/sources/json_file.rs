use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::builder::{ConfigurationBuilder, KEY_DELIMITER};
use crate::data::ConfigData;
use crate::error::LoadError;
use crate::provider::{ConfigurationProvider, ConfigurationSource};

/// A JSON document flattened into `section:key` entries.
#[derive(Debug, Clone)]
pub struct JsonFileConfigurationSource {
    path: PathBuf,
    optional: bool,
}

impl JsonFileConfigurationSource {
    pub fn new(path: impl Into<PathBuf>, optional: bool) -> Self {
        Self {
            path: path.into(),
            optional,
        }
    }
}

impl ConfigurationSource for JsonFileConfigurationSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Box<dyn ConfigurationProvider> {
        Box::new(JsonFileConfigurationProvider {
            source: self.clone(),
            name: self.path.display().to_string(),
            data: ConfigData::new(),
        })
    }
}

pub struct JsonFileConfigurationProvider {
    source: JsonFileConfigurationSource,
    name: String,
    data: ConfigData,
}

impl JsonFileConfigurationProvider {
    fn read(path: &Path, optional: bool) -> Result<ConfigData, LoadError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if optional && e.kind() == std::io::ErrorKind::NotFound => {
                debug!("[Config] Optional file {:?} not found", path);
                return Ok(ConfigData::new());
            }
            Err(source) => {
                return Err(LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let document: Value = serde_json::from_str(&raw).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(flatten_json(&document).into_iter().collect())
    }
}

impl ConfigurationProvider for JsonFileConfigurationProvider {
    fn load(&mut self) -> Result<(), LoadError> {
        match Self::read(&self.source.path, self.source.optional) {
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
        &self.name
    }
}

/// Flatten a JSON value into `(key, value)` pairs.
///
/// Objects and arrays become `:`-joined paths (arrays by index), scalars
/// their text form, `null` the empty string.
pub fn flatten_json(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, path: String, out: &mut Vec<(String, String)>) {
    let child = |segment: &str| {
        if path.is_empty() {
            segment.to_string()
        } else {
            format!("{}{}{}", path, KEY_DELIMITER, segment)
        }
    };

    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(nested, child(key), out);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(nested, child(&index.to_string()), out);
            }
        }
        Value::Null => out.push((path, String::new())),
        Value::String(s) => out.push((path, s.clone())),
        Value::Bool(b) => out.push((path, b.to_string())),
        Value::Number(n) => out.push((path, n.to_string())),
    }
}
