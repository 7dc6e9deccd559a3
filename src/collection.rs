//! History, favorites and the style lock, persisted as JSON in a
//! key-value store.

use crate::{
    error::{Result, SpriteGenError},
    models::Asset,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MAX_HISTORY_SIZE: usize = 8;

pub const HISTORY_KEY: &str = "pixel-art-history";
pub const FAVORITES_KEY: &str = "pixel-art-favorites";
pub const STYLE_LOCK_KEY: &str = "pixel-art-style-lock";

/// String-keyed, string-valued persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory. Writes go to a
/// sibling `.tmp` file that is then renamed over the target.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            SpriteGenError::StorageError(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json.tmp", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let temp = self.temp_path_for(key);
        fs::write(&temp, value)?;
        if let Err(e) = fs::rename(&temp, self.path_for(key)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| SpriteGenError::StorageError("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// The user's asset collections. Assets are shared by value and never
/// modified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    history: Vec<Asset>,
    favorites: Vec<Asset>,
    style_lock: Option<Asset>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all three collections. Unreadable entries are logged, dropped
    /// from the store and start out empty.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let mut history: Vec<Asset> = load_entry(store, HISTORY_KEY)?.unwrap_or_default();
        history.truncate(MAX_HISTORY_SIZE);
        let favorites: Vec<Asset> = load_entry(store, FAVORITES_KEY)?.unwrap_or_default();
        let style_lock = load_entry::<Option<Asset>>(store, STYLE_LOCK_KEY)?.flatten();

        log::debug!(
            "Loaded {} history item(s), {} favorite(s), style lock: {}",
            history.len(),
            favorites.len(),
            style_lock.is_some()
        );

        Ok(Self {
            history,
            favorites,
            style_lock,
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let history = &self.history[..self.history.len().min(MAX_HISTORY_SIZE)];
        save_entry(store, HISTORY_KEY, history)?;
        save_entry(store, FAVORITES_KEY, &self.favorites)?;
        save_entry(store, STYLE_LOCK_KEY, &self.style_lock)?;
        Ok(())
    }

    pub fn history(&self) -> &[Asset] {
        &self.history
    }

    pub fn favorites(&self) -> &[Asset] {
        &self.favorites
    }

    pub fn style_lock(&self) -> Option<&Asset> {
        self.style_lock.as_ref()
    }

    pub fn style_lock_prompt(&self) -> Option<&str> {
        self.style_lock.as_ref().map(Asset::prompt)
    }

    /// Newest first; the oldest entries fall off past [`MAX_HISTORY_SIZE`].
    pub fn record(&mut self, assets: impl IntoIterator<Item = Asset>) {
        let mut updated: Vec<Asset> = assets.into_iter().collect();
        updated.append(&mut self.history);
        updated.truncate(MAX_HISTORY_SIZE);
        self.history = updated;
    }

    /// Favorites and the style lock are left alone.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Returns whether the asset is a favorite afterwards.
    pub fn toggle_favorite(&mut self, asset: &Asset) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|fav| fav.id() != asset.id());
        if self.favorites.len() == before {
            self.favorites.insert(0, asset.clone());
            true
        } else {
            false
        }
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|fav| fav.id() == id)
    }

    pub fn set_style_lock(&mut self, asset: &Asset) {
        self.style_lock = Some(asset.clone());
    }

    pub fn clear_style_lock(&mut self) {
        self.style_lock = None;
    }

    /// Looks in history first, then favorites.
    pub fn find(&self, id: &str) -> Option<&Asset> {
        self.history
            .iter()
            .chain(self.favorites.iter())
            .find(|asset| asset.id() == id)
    }

    /// History followed by favorites, duplicates included.
    pub fn all(&self) -> impl Iterator<Item = &Asset> {
        self.history.iter().chain(self.favorites.iter())
    }
}

fn load_entry<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::warn!("Failed to load {} from store, discarding it: {}", key, e);
            store.remove(key)?;
            Ok(None)
        }
    }
}

fn save_entry<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| SpriteGenError::SerializationError(e.to_string()))?;
    store.set(key, &json)
}
