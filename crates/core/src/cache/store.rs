use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::window::WindowKey;
use crate::models::CatalogItem;

const KEY_FORMAT: &str = "%Y-%m-%d";

/// One cached catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Items as fetched.
    pub items: Vec<CatalogItem>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

/// Storage for cached windows, owned by the hosting session.
pub trait CacheStore: Send + Sync {
    /// Entry stored under `key`, if any.
    fn load(&self, key: &WindowKey) -> Result<Option<CacheEntry>>;
    /// Insert or replace the entry for `key`.
    fn store(&self, key: WindowKey, entry: CacheEntry) -> Result<()>;
    /// Drop the entry for `key`; missing keys are ignored.
    fn remove(&self, key: &WindowKey) -> Result<()>;
    /// Keys currently stored.
    fn keys(&self) -> Result<Vec<WindowKey>>;
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<RwLock<BTreeMap<WindowKey, CacheEntry>>>,
}

impl MemoryCacheStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, key: &WindowKey) -> Result<Option<CacheEntry>> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn store(&self, key: WindowKey, entry: CacheEntry) -> Result<()> {
        self.inner.write().insert(key, entry);
        Ok(())
    }

    fn remove(&self, key: &WindowKey) -> Result<()> {
        self.inner.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<WindowKey>> {
        Ok(self.inner.read().keys().copied().collect())
    }
}

/// One JSON file per window, named after the window date.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    root: PathBuf,
}

impl FileCacheStore {
    /// Store rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &WindowKey) -> PathBuf {
        self.root.join(format!("{}.json", key.format(KEY_FORMAT)))
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self, key: &WindowKey) -> Result<Option<CacheEntry>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let entry = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(entry))
    }

    fn store(&self, key: WindowKey, entry: CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.path_for(&key);
        let serialised = serde_json::to_vec(&entry).context("failed to serialise cache entry")?;
        fs::write(&path, serialised).with_context(|| format!("failed to write {}", path.display()))
    }

    fn remove(&self, key: &WindowKey) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<WindowKey>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root).context("failed to read cache directory")? {
            let path = entry?.path();
            match key_from_path(&path) {
                Some(key) => keys.push(key),
                None => warn!("ignoring unexpected cache file {}", path.display()),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn key_from_path(path: &Path) -> Option<WindowKey> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, KEY_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn entry(name: &str) -> CacheEntry {
        CacheEntry {
            items: vec![CatalogItem::named(Some(1), name)],
            fetched_at: Utc.with_ymd_and_hms(2024, 1, 10, 19, 30, 0).unwrap(),
        }
    }

    fn day(d: u32) -> WindowKey {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn memory_store_clones_share_entries() -> Result<()> {
        let store = MemoryCacheStore::new();
        let handle = store.clone();
        store.store(day(10), entry("Celeste"))?;
        assert_eq!(handle.load(&day(10))?, Some(entry("Celeste")));
        handle.remove(&day(10))?;
        assert!(store.keys()?.is_empty());
        Ok(())
    }

    #[test]
    fn file_store_round_trips_and_lists_keys() -> Result<()> {
        let dir = tempdir()?;
        let store = FileCacheStore::new(dir.path().join("cache"));
        assert!(store.keys()?.is_empty());
        assert_eq!(store.load(&day(9))?, None);

        store.store(day(10), entry("Celeste"))?;
        store.store(day(9), entry("Hades"))?;
        fs::write(dir.path().join("cache/notes.txt"), "ignored")?;

        assert_eq!(store.keys()?, vec![day(9), day(10)]);
        assert_eq!(store.load(&day(10))?, Some(entry("Celeste")));

        store.remove(&day(9))?;
        store.remove(&day(9))?;
        assert_eq!(store.keys()?, vec![day(10)]);
        Ok(())
    }

    #[test]
    fn corrupt_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let store = FileCacheStore::new(dir.path());
        fs::write(dir.path().join("2024-01-10.json"), "{")?;
        assert!(store.load(&day(10)).is_err());
        Ok(())
    }
}
