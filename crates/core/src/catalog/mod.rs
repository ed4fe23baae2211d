//! Catalog retrieval and row normalisation.

/// Raw row coercion helpers.
pub mod normalize;
/// Backing stores the catalog can be read from.
pub mod source;

use tracing::{debug, info, warn};

pub use normalize::{normalize_row, RawRow};
pub use source::{CatalogSource, SheetCredentials, SheetsSource, SnapshotSource};

use crate::{config::SourceConfig, error::FetchError, models::CatalogItem};

/// Pulls rows from a [`CatalogSource`] and normalises them into [`CatalogItem`]s.
pub struct CatalogFetcher {
    source: Box<dyn CatalogSource>,
}

impl CatalogFetcher {
    /// Wrap an arbitrary source.
    pub fn new(source: impl CatalogSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Build the source selected by configuration: a local snapshot when one is
    /// configured, otherwise the Sheets API.
    ///
    /// A misconfigured source is reported by every later [`fetch`](Self::fetch)
    /// so the caller can still fall back to a cached catalog.
    pub fn from_config(config: &SourceConfig) -> Self {
        if let Some(path) = &config.snapshot_path {
            return Self::new(SnapshotSource::new(path));
        }
        match SheetsSource::from_config(config) {
            Ok(source) => Self::new(source),
            Err(err) => {
                warn!("catalog source unusable: {err}");
                Self::new(UnusableSource(err))
            }
        }
    }

    /// Fetch and normalise the whole catalog. An empty sheet yields an empty catalog.
    pub fn fetch(&self) -> Result<Vec<CatalogItem>, FetchError> {
        let rows = self.source.fetch_rows()?;
        let total = rows.len();
        let items: Vec<CatalogItem> = rows.iter().filter_map(normalize_row).collect();
        if items.len() < total {
            debug!(skipped = total - items.len(), "skipped rows without a name");
        }
        info!(items = items.len(), "catalog fetched");
        Ok(items)
    }
}

struct UnusableSource(FetchError);

impl CatalogSource for UnusableSource {
    fn fetch_rows(&self) -> Result<Vec<RawRow>, FetchError> {
        Err(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKey;
    use serde_json::json;

    struct StaticSource {
        rows: Vec<RawRow>,
        missing: bool,
    }

    impl StaticSource {
        fn ok(rows: Vec<RawRow>) -> Self {
            Self {
                rows,
                missing: false,
            }
        }
    }

    impl CatalogSource for StaticSource {
        fn fetch_rows(&self) -> Result<Vec<RawRow>, FetchError> {
            if self.missing {
                return Err(FetchError::NotFound("Steam_Master".into()));
            }
            Ok(self.rows.clone())
        }
    }

    fn rows(value: serde_json::Value) -> Vec<RawRow> {
        serde_json::from_value(value).expect("fixture rows")
    }

    #[test]
    fn fetch_normalises_and_skips_nameless_rows() {
        let fetcher = CatalogFetcher::new(StaticSource::ok(rows(json!([
            { "AppID": 570, "Name": "Dota 2" },
            { "AppID": 1, "Name": "" },
            { "AppID": "bad", "Name": "No Id" }
        ]))));

        let items = fetcher.fetch().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, ItemKey::AppId(570));
        assert!(!items[1].key.is_stable());
    }

    #[test]
    fn repeated_fetches_yield_identical_keys() {
        let fetcher = CatalogFetcher::new(StaticSource::ok(rows(json!([
            { "AppID": "", "Name": "Untitled Goose Game" }
        ]))));
        let first = fetcher.fetch().unwrap();
        let second = fetcher.fetch().unwrap();
        assert_eq!(first[0].key, second[0].key);
    }

    #[test]
    fn empty_sheet_is_not_an_error() {
        let fetcher = CatalogFetcher::new(StaticSource::ok(Vec::new()));
        assert!(fetcher.fetch().unwrap().is_empty());
    }

    #[test]
    fn misconfigured_source_fails_on_fetch() {
        let fetcher = CatalogFetcher::from_config(&SourceConfig::default());
        assert!(matches!(fetcher.fetch(), Err(FetchError::Credential(_))));
    }

    #[test]
    fn source_errors_propagate() {
        let fetcher = CatalogFetcher::new(StaticSource {
            rows: Vec::new(),
            missing: true,
        });
        assert!(matches!(fetcher.fetch(), Err(FetchError::NotFound(_))));
    }
}
