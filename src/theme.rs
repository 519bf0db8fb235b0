//! Dark/light theme preference
//!
//! The theme is read from a durable key-value store once at load and
//! written back on every toggle.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{Error, Result};

/// Store key holding the theme
pub const THEME_KEY: &str = "theme";

/// Visual theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Interpret a stored value; anything but `"dark"` is light
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Self::Dark,
            _ => Self::Light,
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub const fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable string key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be read
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be written
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|e| Error::Store(e.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a flat JSON object file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_all().unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "preference file unreadable, starting fresh"
            );
            BTreeMap::new()
        });
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Theme preference bound to its store
pub struct ThemePreference<S> {
    theme: Theme,
    store: S,
}

impl<S: KeyValueStore> ThemePreference<S> {
    /// Read the persisted theme once
    ///
    /// Unreadable storage falls back to the light theme.
    pub fn load(store: S) -> Self {
        let stored = store.get(THEME_KEY).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read theme preference");
            None
        });
        let theme = Theme::from_stored(stored.as_deref());
        tracing::debug!(%theme, "theme loaded");
        Self { theme, store }
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Flip the theme and persist it
    ///
    /// The in-memory theme flips even if the write fails.
    pub fn toggle(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        if let Err(e) = self.store.set(THEME_KEY, self.theme.as_str()) {
            tracing::warn!(error = %e, "failed to persist theme preference");
        }
        self.theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_value_is_light() {
        let preference = ThemePreference::load(MemoryStore::new());
        assert_eq!(preference.theme(), Theme::Light);
    }

    #[test]
    fn unknown_value_is_light() {
        assert_eq!(Theme::from_stored(Some("solarized")), Theme::Light);
        assert_eq!(Theme::from_stored(Some("dark")), Theme::Dark);
    }

    #[test]
    fn toggle_twice_restores() {
        let mut preference = ThemePreference::load(MemoryStore::new());
        assert_eq!(preference.toggle(), Theme::Dark);
        assert_eq!(preference.store().get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(preference.toggle(), Theme::Light);
        assert_eq!(preference.store().get(THEME_KEY).unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn file_store_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let mut preference = ThemePreference::load(JsonFileStore::new(&path));
        preference.toggle();

        let reloaded = ThemePreference::load(JsonFileStore::new(&path));
        assert_eq!(reloaded.theme(), Theme::Dark);
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("preferences.json"));
        store.set("volume", "loud").unwrap();
        store.set(THEME_KEY, "dark").unwrap();

        assert_eq!(store.get("volume").unwrap().as_deref(), Some("loud"));
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_file_reads_as_error_and_loads_light() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get(THEME_KEY).is_err());
        assert_eq!(ThemePreference::load(store).theme(), Theme::Light);
    }
}
