//! User favorites and named lists, keyed by [`ItemKey`].

/// Key-value backends for curation state.
pub mod storage;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, warn};

pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

use crate::{error::CurationError, models::ItemKey, pipeline::Membership};

/// Storage key holding the favorites array.
pub const FAVORITES_KEY: &str = "steam_tracker_favorites";
/// Storage key holding the lists object.
pub const LISTS_KEY: &str = "steam_tracker_lists";

/// One curated item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurationEntry {
    /// Identity of the curated item.
    pub id: ItemKey,
    /// Name at the time the item was curated.
    pub name: String,
    /// When the item was curated.
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
}

impl CurationEntry {
    fn new(id: &ItemKey, name: &str) -> Self {
        Self {
            id: id.clone(),
            name: name.to_string(),
            added_at: Utc::now(),
        }
    }
}

/// Favorites and named lists, written through to a [`KeyValueStore`] after
/// every mutation.
///
/// A failed write is logged and the in-memory state stays authoritative.
pub struct CurationStore<S> {
    storage: S,
    favorites: Vec<CurationEntry>,
    lists: BTreeMap<String, Vec<CurationEntry>>,
}

impl<S: KeyValueStore> CurationStore<S> {
    /// Restore state from `storage`. Missing or unreadable values start empty.
    pub fn load(storage: S) -> Self {
        let favorites: Vec<CurationEntry> = read_value(&storage, FAVORITES_KEY);
        let lists: BTreeMap<String, Vec<CurationEntry>> = read_value(&storage, LISTS_KEY);
        info!(
            favorites = favorites.len(),
            lists = lists.len(),
            "loaded curation state"
        );
        Self {
            storage,
            favorites,
            lists,
        }
    }

    /// Flip the favorite flag for `key`. Returns whether it is now a favorite.
    pub fn toggle_favorite(&mut self, key: &ItemKey, name: &str) -> bool {
        let now_favorite = match self.favorites.iter().position(|entry| &entry.id == key) {
            Some(index) => {
                self.favorites.remove(index);
                false
            }
            None => {
                self.favorites.push(CurationEntry::new(key, name));
                true
            }
        };
        self.persist_favorites();
        now_favorite
    }

    /// Whether `key` is a favorite.
    pub fn is_favorite(&self, key: &ItemKey) -> bool {
        self.favorites.iter().any(|entry| &entry.id == key)
    }

    /// Favorites in the order they were added.
    pub fn favorites(&self) -> &[CurationEntry] {
        &self.favorites
    }

    /// Create an empty list. List names are trimmed by every list operation.
    pub fn create_list(&mut self, name: &str) -> Result<(), CurationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CurationError::InvalidName);
        }
        if self.lists.contains_key(name) {
            return Err(CurationError::AlreadyExists(name.to_string()));
        }
        self.lists.insert(name.to_string(), Vec::new());
        self.persist_lists();
        Ok(())
    }

    /// Delete a list and its entries.
    pub fn delete_list(&mut self, name: &str) -> Result<(), CurationError> {
        let name = name.trim();
        if self.lists.remove(name).is_none() {
            return Err(CurationError::UnknownList(name.to_string()));
        }
        self.persist_lists();
        Ok(())
    }

    /// Add `key` to `list`. Returns false when it was already a member.
    pub fn add_to_list(&mut self, list: &str, key: &ItemKey, name: &str) -> Result<bool, CurationError> {
        let list = list.trim();
        let entries = self
            .lists
            .get_mut(list)
            .ok_or_else(|| CurationError::UnknownList(list.to_string()))?;
        if entries.iter().any(|entry| &entry.id == key) {
            return Ok(false);
        }
        entries.push(CurationEntry::new(key, name));
        self.persist_lists();
        Ok(true)
    }

    /// Remove `key` from `list`. Returns false when it was not a member.
    pub fn remove_from_list(&mut self, list: &str, key: &ItemKey) -> Result<bool, CurationError> {
        let list = list.trim();
        let entries = self
            .lists
            .get_mut(list)
            .ok_or_else(|| CurationError::UnknownList(list.to_string()))?;
        let before = entries.len();
        entries.retain(|entry| &entry.id != key);
        if entries.len() == before {
            return Ok(false);
        }
        self.persist_lists();
        Ok(true)
    }

    /// Whether `key` is in `list`. Unknown lists contain nothing.
    pub fn is_in_list(&self, list: &str, key: &ItemKey) -> bool {
        self.lists
            .get(list.trim())
            .is_some_and(|entries| entries.iter().any(|entry| &entry.id == key))
    }

    /// All lists by name.
    pub fn lists(&self) -> &BTreeMap<String, Vec<CurationEntry>> {
        &self.lists
    }

    /// List names in sorted order.
    pub fn list_names(&self) -> Vec<&str> {
        self.lists.keys().map(String::as_str).collect()
    }

    fn persist_favorites(&self) {
        write_value(&self.storage, FAVORITES_KEY, &self.favorites);
    }

    fn persist_lists(&self) {
        write_value(&self.storage, LISTS_KEY, &self.lists);
    }
}

impl<S: KeyValueStore> Membership for CurationStore<S> {
    fn is_favorite(&self, key: &ItemKey) -> bool {
        CurationStore::is_favorite(self, key)
    }

    fn is_in_list(&self, list: &str, key: &ItemKey) -> bool {
        CurationStore::is_in_list(self, list, key)
    }
}

fn read_value<T: DeserializeOwned + Default>(storage: &impl KeyValueStore, key: &str) -> T {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            warn!(key, "failed to read curation state: {err:#}");
            return T::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(key, "discarding corrupt curation state: {err}");
        T::default()
    })
}

fn write_value<T: Serialize>(storage: &impl KeyValueStore, key: &str, value: &T) {
    let serialised = match serde_json::to_string(value) {
        Ok(serialised) => serialised,
        Err(err) => {
            warn!(key, "failed to serialise curation state: {err}");
            return;
        }
    };
    if let Err(err) = storage.set(key, &serialised) {
        warn!(key, "failed to persist curation state: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogItem;
    use anyhow::{anyhow, Result};
    use serde_json::Value;
    use tempfile::tempdir;

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[test]
    fn toggling_favorite_flips_and_persists() -> Result<()> {
        let storage = MemoryKeyValueStore::new();
        let mut store = CurationStore::load(storage.clone());
        let dota = ItemKey::AppId(570);

        assert!(store.toggle_favorite(&dota, "Dota 2"));
        assert!(store.is_favorite(&dota));
        let raw = storage.get(FAVORITES_KEY)?.expect("favorites persisted");
        let value: Value = serde_json::from_str(&raw)?;
        assert_eq!(value[0]["id"], "570");
        assert_eq!(value[0]["name"], "Dota 2");
        assert!(value[0]["addedAt"].is_string());

        assert!(!store.toggle_favorite(&dota, "Dota 2"));
        assert!(!store.is_favorite(&dota));
        assert_eq!(storage.get(FAVORITES_KEY)?.as_deref(), Some("[]"));
        Ok(())
    }

    #[test]
    fn favorite_survives_catalog_refresh() -> Result<()> {
        let dir = tempdir()?;
        let before = CatalogItem::named(Some(570), "Dota 2");
        {
            let mut store = CurationStore::load(FileKeyValueStore::new(dir.path()));
            store.toggle_favorite(&before.key, &before.name);
        }

        let mut refreshed = CatalogItem::named(Some(570), "Dota 2");
        refreshed.short_description = Some("Updated blurb".into());
        let store = CurationStore::load(FileKeyValueStore::new(dir.path()));
        assert!(store.is_favorite(&refreshed.key));
        Ok(())
    }

    #[test]
    fn list_lifecycle() {
        let mut store = CurationStore::load(MemoryKeyValueStore::new());
        let portal = ItemKey::AppId(620);

        store.create_list(" Wishlist ").unwrap();
        assert_eq!(
            store.create_list("Wishlist"),
            Err(CurationError::AlreadyExists("Wishlist".into()))
        );
        assert_eq!(store.create_list("   "), Err(CurationError::InvalidName));

        assert_eq!(store.add_to_list("Wishlist", &portal, "Portal 2"), Ok(true));
        assert_eq!(store.add_to_list("Wishlist", &portal, "Portal 2"), Ok(false));
        assert_eq!(store.lists()["Wishlist"].len(), 1);
        assert!(store.is_in_list("Wishlist", &portal));
        assert!(!store.is_in_list("Backlog", &portal));
        assert_eq!(
            store.add_to_list("Backlog", &portal, "Portal 2"),
            Err(CurationError::UnknownList("Backlog".into()))
        );

        assert_eq!(store.remove_from_list("Wishlist", &portal), Ok(true));
        assert_eq!(store.remove_from_list("Wishlist", &portal), Ok(false));

        store.delete_list("Wishlist").unwrap();
        assert!(store.list_names().is_empty());
        assert_eq!(
            store.delete_list("Wishlist"),
            Err(CurationError::UnknownList("Wishlist".into()))
        );
    }

    #[test]
    fn list_names_are_trimmed_everywhere() {
        let mut store = CurationStore::load(MemoryKeyValueStore::new());
        let hades = ItemKey::AppId(1_145_360);

        store.create_list(" Wishlist ").unwrap();
        assert_eq!(store.add_to_list(" Wishlist ", &hades, "Hades"), Ok(true));
        assert!(store.is_in_list("Wishlist ", &hades));
        assert_eq!(store.remove_from_list("  Wishlist", &hades), Ok(true));
        assert_eq!(store.delete_list(" Wishlist "), Ok(()));
        assert!(store.list_names().is_empty());
    }

    #[test]
    fn lists_reload_from_storage() -> Result<()> {
        let storage = MemoryKeyValueStore::new();
        let mut store = CurationStore::load(storage.clone());
        store.create_list("Backlog").unwrap();
        store.create_list("Co-op").unwrap();
        store
            .add_to_list("Co-op", &ItemKey::from_name("Untitled Game"), "Untitled Game")
            .unwrap();

        let reloaded = CurationStore::load(storage);
        assert_eq!(reloaded.list_names(), vec!["Backlog", "Co-op"]);
        assert!(reloaded.is_in_list("Co-op", &ItemKey::from_name("Untitled Game")));
        Ok(())
    }

    #[test]
    fn corrupt_payload_starts_empty() -> Result<()> {
        let storage = MemoryKeyValueStore::new();
        storage.set(FAVORITES_KEY, "{not json")?;
        storage.set(LISTS_KEY, r#"{"Old":[{"id":570,"name":"Dota 2","addedAt":"2024-01-01T00:00:00Z"}]}"#)?;

        let store = CurationStore::load(storage);
        assert!(store.favorites().is_empty());
        assert!(store.is_in_list("Old", &ItemKey::AppId(570)));
        Ok(())
    }

    #[test]
    fn failed_write_keeps_mutation() {
        let mut store = CurationStore::load(ReadOnlyStore);
        assert!(store.toggle_favorite(&ItemKey::AppId(1), "One"));
        assert!(store.is_favorite(&ItemKey::AppId(1)));
        assert!(store.create_list("Later").is_ok());
    }
}
