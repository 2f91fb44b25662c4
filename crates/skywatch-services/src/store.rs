//! Persistence for the favorite set and user preferences.
//!
//! Loads never fail: a missing or unreadable file yields defaults. Saves
//! report a [`StorageError`] which coordinators log and swallow.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use skywatch_core::{Preferences, StorageError};

use crate::favorites::FavoriteCity;

pub trait FavoritesStore: Send + Sync {
    /// Stored favorites in order, or empty.
    fn load(&self) -> Vec<FavoriteCity>;

    fn save(&self, favorites: &[FavoriteCity]) -> Result<(), StorageError>;
}

pub trait SettingsStore: Send + Sync {
    /// Stored preferences, or defaults.
    fn load(&self) -> Preferences;

    fn save(&self, preferences: &Preferences) -> Result<(), StorageError>;
}

/// Favorites as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFavoritesStore {
    path: PathBuf,
}

impl JsonFavoritesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoritesStore for JsonFavoritesStore {
    fn load(&self) -> Vec<FavoriteCity> {
        read_json(&self.path).unwrap_or_default()
    }

    fn save(&self, favorites: &[FavoriteCity]) -> Result<(), StorageError> {
        write_json(&self.path, favorites)?;
        tracing::debug!(count = favorites.len(), "Saved favorites");
        Ok(())
    }
}

/// Preferences as `{"units": "...", "lang": "..."}`.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Preferences {
        read_json(&self.path).unwrap_or_default()
    }

    fn save(&self, preferences: &Preferences) -> Result<(), StorageError> {
        write_json(&self.path, preferences)
    }
}

/// `None` when the file is absent or does not parse.
fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring corrupt {}: {}", path.display(), e);
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| StorageError::io(path, e))
}
