#![warn(clippy::all, missing_docs)]

//! Core logic for the game catalog browser.
//!
//! This crate hosts the catalog fetcher, the cutover-windowed cache, the
//! filter/sort/pagination pipeline and the curation store used by the
//! terminal UI and any future frontends.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod curation;
pub mod display;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod refresh;

pub use crate::config::AppConfig;
pub use cache::{CutoverClock, FileCacheStore, MemoryCacheStore, WindowedCache};
pub use catalog::CatalogFetcher;
pub use curation::{CurationStore, FileKeyValueStore, MemoryKeyValueStore};
pub use error::{CurationError, FetchError};
pub use models::{CatalogItem, ItemKey, ReleaseStatus};
pub use pipeline::{build_view, CatalogQuery, CatalogView, PaginationWindow, SortOption, ViewState};
pub use refresh::{CatalogRefresher, Freshness, LoadOutcome, RefreshEvent, RefreshHandle};
