//! Flat key/value snapshot produced by a provider load.

use std::collections::HashMap;

use crate::error::LoadError;

/// Key/value snapshot with ASCII case-insensitive keys.
///
/// The casing of the first insertion is kept for enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigData {
    // normalized key -> (original key, value)
    entries: HashMap<String, (String, String)>,
}

fn normalize(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl ConfigData {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry, failing if the key is already present.
    pub fn insert_unique(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), LoadError> {
        let key = key.into();
        let normalized = normalize(&key);
        if self.entries.contains_key(&normalized) {
            return Err(LoadError::DuplicateKey { key });
        }
        self.entries.insert(normalized, (key, value.into()));
        Ok(())
    }

    /// Insert or replace an entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.get_mut(&normalize(&key)) {
            Some(entry) => entry.1 = value,
            None => {
                self.entries.insert(normalize(&key), (key, value));
            }
        }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize(key)).map(|(_, v)| v.as_str())
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert into a plain map keyed by the original key casing.
    pub fn into_map(self) -> HashMap<String, String> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<(String, String)> for ConfigData {
    /// Later pairs replace earlier ones.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut data = ConfigData::new();
        for (key, value) in iter {
            data.set(key, value);
        }
        data
    }
}
