//! Per-category minimum levels.
//!
//! Categories are hierarchical names. An override for `Microsoft` applies to
//! `Microsoft`, `Microsoft.Hosting` and `Microsoft::Hosting`, but not to
//! `MicrosoftExtras`. When several overrides match, the longest wins.

use tracing::level_filters::LevelFilter;
use tracing::Metadata;

/// Minimum level plus category overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRules {
    minimum_level: LevelFilter,
    overrides: Vec<(String, LevelFilter)>,
}

impl LevelRules {
    pub fn new(minimum_level: LevelFilter) -> Self {
        Self {
            minimum_level,
            overrides: Vec::new(),
        }
    }

    pub fn minimum_level(&self) -> LevelFilter {
        self.minimum_level
    }

    pub fn set_minimum_level(&mut self, level: LevelFilter) {
        self.minimum_level = level;
    }

    /// Set the level for `category`, replacing an earlier override of the
    /// same category.
    pub fn set_override(&mut self, category: impl Into<String>, level: LevelFilter) {
        let category = category.into();
        match self.overrides.iter_mut().find(|(c, _)| *c == category) {
            Some(existing) => existing.1 = level,
            None => self.overrides.push((category, level)),
        }
    }

    pub fn overrides(&self) -> &[(String, LevelFilter)] {
        &self.overrides
    }

    /// Effective level of `category`.
    pub fn level_for(&self, category: &str) -> LevelFilter {
        self.overrides
            .iter()
            .filter(|(prefix, _)| category_matches(prefix, category))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, level)| *level)
            .unwrap_or(self.minimum_level)
    }

    /// Whether an event with this metadata passes.
    pub fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        *metadata.level() <= self.level_for(metadata.target())
    }
}

fn category_matches(prefix: &str, category: &str) -> bool {
    match category.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('.') || rest.starts_with("::"),
        None => false,
    }
}
