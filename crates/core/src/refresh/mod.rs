//! Fetch-or-cache orchestration.

/// Background worker driving a [`CatalogRefresher`].
pub mod task;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub use task::{RefreshEvent, RefreshHandle};

use crate::{
    cache::{CacheStore, WindowedCache},
    catalog::CatalogFetcher,
    error::FetchError,
    models::CatalogItem,
};

/// How current the catalog handed to the renderer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fetched during this call.
    Fetched,
    /// Served from the current cache window without fetching.
    Cached,
    /// Fetch failed; an older cached catalog is served instead.
    Stale,
    /// Fetch failed and no cached catalog was usable.
    Unavailable,
}

/// Result of one load cycle.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Catalog to browse; empty when unavailable.
    pub items: Vec<CatalogItem>,
    /// When `items` were fetched.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Provenance of `items`.
    pub freshness: Freshness,
    /// User-facing description of a fetch failure.
    pub error: Option<String>,
}

impl LoadOutcome {
    /// Warning to show next to the data, if any.
    pub fn warning(&self) -> Option<String> {
        let error = self.error.as_deref()?;
        Some(match (self.freshness, self.fetched_at) {
            (Freshness::Stale, Some(at)) => format!(
                "Showing cached data from {}; refresh failed: {error}",
                at.format("%Y-%m-%d %H:%M UTC")
            ),
            _ => format!("No data available: {error}"),
        })
    }

    fn unavailable(error: &FetchError) -> Self {
        Self {
            items: Vec::new(),
            fetched_at: None,
            freshness: Freshness::Unavailable,
            error: Some(error.to_string()),
        }
    }
}

/// Combines the fetcher with the windowed cache.
pub struct CatalogRefresher<S> {
    fetcher: CatalogFetcher,
    cache: WindowedCache<S>,
}

impl<S: CacheStore> CatalogRefresher<S> {
    /// Refresher fetching through `fetcher` and caching in `cache`.
    pub fn new(fetcher: CatalogFetcher, cache: WindowedCache<S>) -> Self {
        Self { fetcher, cache }
    }

    /// Underlying cache.
    pub fn cache(&self) -> &WindowedCache<S> {
        &self.cache
    }

    /// Serve the current window when valid, otherwise fetch. `now` is read once
    /// by the caller and used for every window computation in this cycle.
    pub fn load(&self, now: DateTime<Utc>) -> LoadOutcome {
        if let Some(entry) = self.cache.fresh_entry(now) {
            return LoadOutcome {
                items: entry.items,
                fetched_at: Some(entry.fetched_at),
                freshness: Freshness::Cached,
                error: None,
            };
        }
        self.fetch(now)
    }

    /// Fetch regardless of cache state, falling back as [`load`](Self::load) does.
    pub fn fetch(&self, now: DateTime<Utc>) -> LoadOutcome {
        match self.fetcher.fetch() {
            Ok(items) => {
                self.cache.put(now, items.clone());
                LoadOutcome {
                    items,
                    fetched_at: Some(now),
                    freshness: Freshness::Fetched,
                    error: None,
                }
            }
            Err(err) => self.fallback(err),
        }
    }

    fn fallback(&self, err: FetchError) -> LoadOutcome {
        if !err.allows_fallback() {
            warn!("catalog source missing, serving empty catalog: {err}");
            return LoadOutcome::unavailable(&err);
        }
        match self.cache.latest() {
            Some(entry) => {
                info!(
                    fetched_at = %entry.fetched_at,
                    items = entry.items.len(),
                    "fetch failed, serving cached catalog: {err}"
                );
                LoadOutcome {
                    items: entry.items,
                    fetched_at: Some(entry.fetched_at),
                    freshness: Freshness::Stale,
                    error: Some(err.to_string()),
                }
            }
            None => {
                warn!("fetch failed with nothing cached: {err}");
                LoadOutcome::unavailable(&err)
            }
        }
    }
}
