//! Settings file loading.
//!
//! ```toml
//! [settings]
//! number_of_threads = 4
//! simple_x_min = 3
//! simple_x_max = 5
//! ```
//!
//! Values must be integers. Loaded settings are written into a `Store`,
//! which is where the generator and the pool read them from.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::app::NUMBER_OF_THREADS;
use crate::domain::{ConfigError, ExtraKind, MazeType};
use crate::ports::Store;

#[derive(Deserialize)]
struct SettingsFile {
    #[serde(default)]
    settings: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, i64>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small catalogue for every maze type and four threads.
    pub fn defaults() -> Self {
        let mut settings = Self::new();
        settings.set(NUMBER_OF_THREADS, 4);
        for maze_type in MazeType::ALL {
            let prefix = maze_type.as_str();
            for (field, min, max) in [("x", 2, 3), ("y", 1, 3), ("endpoint", 1, 2), ("barrier", 0, 2)] {
                settings.set(format!("{prefix}_{field}_min"), min);
                settings.set(format!("{prefix}_{field}_max"), max);
            }
        }
        for kind in ExtraKind::ALL {
            let max = if kind == ExtraKind::Bridge { 2 } else { 1 };
            settings.set(format!("{}_min", kind.as_str()), 1);
            settings.set(format!("{}_max", kind.as_str()), max);
        }
        settings
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: SettingsFile = toml::from_str(text)?;
        let mut settings = Self::new();
        for (name, value) in file.settings {
            let Some(number) = value.as_integer() else {
                return Err(ConfigError::NotNumeric {
                    name,
                    value: value.to_string(),
                });
            };
            settings.values.insert(name, number);
        }
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_toml_str(&text)?;
        debug!(path = %path.as_ref().display(), count = settings.len(), "loaded settings");
        Ok(settings)
    }

    pub fn set(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    /// `other` wins on conflicts.
    pub fn merge(mut self, other: Settings) -> Self {
        self.values.extend(other.values);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Writes every value into the store.
    pub fn apply_to(&self, store: &dyn Store) -> Result<(), ConfigError> {
        for (name, value) in self.iter() {
            store.update_setting(name, value)?;
        }
        Ok(())
    }
}
