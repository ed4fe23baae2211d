//! Catalog cache partitioned by a daily cutover.

/// Storage backends for cached windows.
pub mod store;
/// Cutover clock and window keys.
pub mod window;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub use store::{CacheEntry, CacheStore, FileCacheStore, MemoryCacheStore};
pub use window::{CutoverClock, WindowKey};

use crate::models::CatalogItem;

/// Decides whether the cached catalog is still current and keeps at most two windows.
///
/// Storage failures are logged and treated as cache misses so a broken cache
/// never prevents a fetch.
pub struct WindowedCache<S> {
    clock: CutoverClock,
    store: S,
}

impl<S: CacheStore> WindowedCache<S> {
    /// Cache over `store` using `clock` to derive window keys.
    pub fn new(clock: CutoverClock, store: S) -> Self {
        Self { clock, store }
    }

    /// Clock in use.
    pub fn clock(&self) -> &CutoverClock {
        &self.clock
    }

    /// True when nothing was fetched yet or the last fetch predates the latest cutover.
    pub fn should_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.last_fetched_at() {
            Some(fetched_at) => fetched_at < self.clock.last_boundary(now),
            None => true,
        }
    }

    /// Current-window entry when no refresh is due, found with a single pass
    /// over the stored windows.
    pub fn fresh_entry(&self, now: DateTime<Utc>) -> Option<CacheEntry> {
        let (key, entry) = self.latest_window()?;
        let current = entry.fetched_at >= self.clock.last_boundary(now)
            && key == self.clock.window_key(now);
        current.then_some(entry)
    }

    /// Entry for the window containing `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<CacheEntry> {
        self.entry(&self.clock.window_key(now))
    }

    /// Entry stored for `key`.
    pub fn entry(&self, key: &WindowKey) -> Option<CacheEntry> {
        match self.store.load(key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%key, "failed to read cached window: {err:#}");
                None
            }
        }
    }

    /// Most recently fetched entry across retained windows, current or not.
    pub fn latest(&self) -> Option<CacheEntry> {
        self.latest_window().map(|(_, entry)| entry)
    }

    /// Like [`latest`](Self::latest), with the window the entry is stored under.
    pub fn latest_window(&self) -> Option<(WindowKey, CacheEntry)> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.entry(&key).map(|entry| (key, entry)))
            .max_by_key(|(_, entry)| entry.fetched_at)
    }

    /// Timestamp of the most recent recorded fetch.
    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.latest().map(|entry| entry.fetched_at)
    }

    /// Store `items` for the window containing `now`, then evict every window
    /// other than the current one and the one before it.
    pub fn put(&self, now: DateTime<Utc>, items: Vec<CatalogItem>) {
        let key = self.clock.window_key(now);
        let count = items.len();
        let entry = CacheEntry {
            items,
            fetched_at: now,
        };
        if let Err(err) = self.store.store(key, entry) {
            warn!(%key, "failed to store cached window: {err:#}");
            return;
        }
        info!(%key, items = count, "cached catalog window");
        self.evict(key);
    }

    fn evict(&self, current: WindowKey) {
        let previous = self.clock.previous(current);
        for key in self.keys() {
            if key == current || key == previous {
                continue;
            }
            match self.store.remove(&key) {
                Ok(()) => info!(%key, "evicted cached window"),
                Err(err) => warn!(%key, "failed to evict cached window: {err:#}"),
            }
        }
    }

    fn keys(&self) -> Vec<WindowKey> {
        self.store.keys().unwrap_or_else(|err| {
            warn!("failed to list cached windows: {err:#}");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone};

    /// Memory store that counts entry reads.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryCacheStore,
        loads: Arc<AtomicUsize>,
    }

    impl CacheStore for CountingStore {
        fn load(&self, key: &WindowKey) -> Result<Option<CacheEntry>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(key)
        }

        fn store(&self, key: WindowKey, entry: CacheEntry) -> Result<()> {
            self.inner.store(key, entry)
        }

        fn remove(&self, key: &WindowKey) -> Result<()> {
            self.inner.remove(key)
        }

        fn keys(&self) -> Result<Vec<WindowKey>> {
            self.inner.keys()
        }
    }

    fn utc(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, min, 0).unwrap()
    }

    fn catalog(name: &str) -> Vec<CatalogItem> {
        vec![CatalogItem::named(Some(570), name)]
    }

    fn cache() -> WindowedCache<MemoryCacheStore> {
        WindowedCache::new(CutoverClock::default(), MemoryCacheStore::new())
    }

    #[test]
    fn refresh_needed_until_first_put() {
        let cache = cache();
        let now = utc(1, 10, 12, 0);
        assert!(cache.should_refresh(now));
        assert!(cache.get(now).is_none());

        cache.put(now, catalog("Dota 2"));
        assert!(!cache.should_refresh(now));
        let entry = cache.get(now).expect("entry after put");
        assert_eq!(entry.fetched_at, now);
        assert_eq!(entry.items, catalog("Dota 2"));
    }

    #[test]
    fn refresh_due_after_crossing_cutover() {
        let cache = cache();
        cache.put(utc(1, 10, 12, 0), catalog("Dota 2"));

        // Winter cutover is 19:00 UTC.
        assert!(!cache.should_refresh(utc(1, 10, 18, 59)));
        assert!(cache.should_refresh(utc(1, 10, 19, 0)));
        assert!(cache.get(utc(1, 10, 19, 0)).is_none());
        assert!(cache.latest().is_some());
    }

    #[test]
    fn fetch_just_after_cutover_stays_valid_all_window() {
        let cache = cache();
        let fetched = utc(1, 10, 19, 0);
        cache.put(fetched, catalog("Dota 2"));
        assert!(!cache.should_refresh(utc(1, 11, 9, 0)));
        assert!(!cache.should_refresh(utc(1, 11, 18, 59)));
        assert!(cache.should_refresh(utc(1, 11, 19, 0)));
    }

    #[test]
    fn put_evicts_windows_older_than_previous() {
        let cache = cache();
        let w1 = utc(1, 10, 20, 0);
        let w2 = utc(1, 11, 20, 0);
        let w3 = utc(1, 12, 20, 0);
        let key = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();

        cache.put(w1, catalog("first"));
        cache.put(w3, catalog("third"));
        assert!(cache.get(w1).is_none());
        assert!(cache.entry(&key(10)).is_none());
        assert!(cache.get(w3).is_some());

        cache.put(w2, catalog("second"));
        cache.put(w3, catalog("third again"));
        assert!(cache.entry(&key(11)).is_some());
        assert_eq!(cache.get(w3).unwrap().items, catalog("third again"));
    }

    #[test]
    fn latest_prefers_newest_fetch() {
        let cache = cache();
        cache.put(utc(1, 10, 20, 0), catalog("older"));
        cache.put(utc(1, 11, 20, 0), catalog("newer"));
        assert_eq!(cache.latest().unwrap().items, catalog("newer"));
        assert_eq!(cache.last_fetched_at(), Some(utc(1, 11, 20, 0)));
    }

    #[test]
    fn fresh_entry_reads_each_window_once() {
        let store = CountingStore::default();
        let loads = Arc::clone(&store.loads);
        let cache = WindowedCache::new(CutoverClock::default(), store);
        cache.put(utc(1, 10, 20, 0), catalog("older"));
        cache.put(utc(1, 11, 20, 0), catalog("newer"));
        loads.store(0, Ordering::SeqCst);

        let entry = cache.fresh_entry(utc(1, 11, 22, 0)).expect("current window");
        assert_eq!(entry.items, catalog("newer"));
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        assert!(cache.fresh_entry(utc(1, 12, 19, 0)).is_none());
    }
}
