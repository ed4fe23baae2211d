use std::{collections::HashMap, fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use parking_lot::RwLock;

/// String-keyed storage for serialized curation state.
pub trait KeyValueStore: Send + Sync {
    /// Stored value for `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Insert or replace the value for `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Store rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .with_context(|| format!("failed to read {}", path.display()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("failed to replace {}", path.display()))
    }
}

fn sanitize_key(input: &str) -> String {
    let result: String = input
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        .collect();
    if result.is_empty() {
        "value".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_values() -> Result<()> {
        let dir = tempdir()?;
        let store = FileKeyValueStore::new(dir.path().join("curation"));
        assert_eq!(store.get("steam_tracker_favorites")?, None);

        store.set("steam_tracker_favorites", "[]")?;
        store.set("steam_tracker_favorites", r#"[{"id":"570"}]"#)?;
        assert_eq!(
            store.get("steam_tracker_favorites")?.as_deref(),
            Some(r#"[{"id":"570"}]"#)
        );
        assert!(dir
            .path()
            .join("curation/steam_tracker_favorites.json")
            .is_file());
        Ok(())
    }

    #[test]
    fn keys_are_sanitized_into_file_names() {
        let store = FileKeyValueStore::new("/tmp/x");
        assert_eq!(store.path_for("../evil key"), PathBuf::from("/tmp/x/evilkey.json"));
        assert_eq!(store.path_for("//"), PathBuf::from("/tmp/x/value.json"));
    }

    #[test]
    fn memory_clones_share_state() -> Result<()> {
        let store = MemoryKeyValueStore::new();
        let other = store.clone();
        store.set("k", "v")?;
        assert_eq!(other.get("k")?.as_deref(), Some("v"));
        Ok(())
    }
}
